//! Delayed recreation of failed items.
//!
//! Each pending retry is a timer task keyed by item id. When it fires it
//! sends [`Command::RetryDue`] with the ticket it was scheduled under; the
//! manager only acts on a ticket that [`RetryScheduler::take_due`] still
//! recognises, so a retry cancelled (or replaced) after its timer fired but
//! before the manager processed it is ignored.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::WeakSender;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::item::ItemId;
use crate::manager::command::Command;

pub(crate) struct RetryScheduler {
    pending: HashMap<ItemId, (u64, JoinHandle<()>)>,
    next_ticket: u64,
    delay: Duration,
}

impl RetryScheduler {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            next_ticket: 0,
            delay,
        }
    }

    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm a retry for `id`, replacing any retry already pending for it.
    pub(crate) fn schedule(&mut self, id: &ItemId, commands: WeakSender<Command>) {
        self.cancel(id);

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let delay = self.delay;
        let item_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = commands.upgrade() {
                let _ = sender.send(Command::RetryDue { item_id, ticket }).await;
            }
        });

        trace!(item_id = %id, ticket, "Retry scheduled in {:?}", delay);
        self.pending.insert(id.clone(), (ticket, timer));
    }

    /// Cancel the pending retry for `id`. Returns `true` if one was pending.
    pub(crate) fn cancel(&mut self, id: &ItemId) -> bool {
        match self.pending.remove(id) {
            Some((ticket, timer)) => {
                timer.abort();
                trace!(item_id = %id, ticket, "Retry cancelled");
                true
            }
            None => false,
        }
    }

    /// Consume a fired retry. Returns `false` for tickets that were cancelled
    /// or superseded.
    pub(crate) fn take_due(&mut self, id: &ItemId, ticket: u64) -> bool {
        match self.pending.get(id) {
            Some((pending, _)) if *pending == ticket => {
                self.pending.remove(id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn cancel_all(&mut self) {
        for (_, (_, timer)) in self.pending.drain() {
            timer.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self, id: &ItemId) -> bool {
        self.pending.contains_key(id)
    }

    /// Items with a retry pending, sorted.
    pub(crate) fn pending_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.pending.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_retry_fires_after_delay() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut scheduler = RetryScheduler::new(Duration::from_secs(1));
        let id = ItemId::new("a");

        let started = tokio::time::Instant::now();
        scheduler.schedule(&id, tx.downgrade());

        match rx.recv().await {
            Some(Command::RetryDue { item_id, ticket }) => {
                assert_eq!(item_id, id);
                assert!(started.elapsed() >= Duration::from_secs(1));
                assert!(scheduler.take_due(&id, ticket));
                assert!(!scheduler.take_due(&id, ticket));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_retry_never_fires() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut scheduler = RetryScheduler::new(Duration::from_secs(1));
        let id = ItemId::new("a");

        scheduler.schedule(&id, tx.downgrade());
        assert!(scheduler.cancel(&id));
        assert!(!scheduler.is_pending(&id));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rescheduling_supersedes_ticket() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut scheduler = RetryScheduler::new(Duration::from_secs(1));
        let id = ItemId::new("a");

        scheduler.schedule(&id, tx.downgrade());
        scheduler.schedule(&id, tx.downgrade());
        assert_eq!(scheduler.pending_ids(), vec![id.clone()]);

        let Some(Command::RetryDue { ticket, .. }) = rx.recv().await else {
            panic!("expected a retry");
        };
        assert!(scheduler.take_due(&id, ticket));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
