//! Host lifecycle wiring.

use std::sync::Arc;

use bridge_traits::{LifecycleEvent, LifecycleObserver, LifecycleState};
use tokio::sync::mpsc::WeakSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::manager::command::Command;

/// Forward the observer's events to the manager until either side goes away.
///
/// The host's current state is applied first, so a manager started while the
/// app is already in the background does not begin playing.
pub(crate) fn spawn_forwarder(
    observer: Arc<dyn LifecycleObserver>,
    commands: WeakSender<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = match observer.get_state().await {
            Ok(LifecycleState::Foreground) => None,
            Ok(LifecycleState::Background) => Some(LifecycleEvent::EnteredBackground),
            Ok(LifecycleState::Suspended) => Some(LifecycleEvent::Suspended),
            Err(err) => {
                warn!("Failed to read lifecycle state: {}", err);
                None
            }
        };
        if let Some(event) = initial {
            if !forward(&commands, event).await {
                return;
            }
        }

        let mut events = match observer.subscribe().await {
            Ok(events) => events,
            Err(err) => {
                warn!("Failed to subscribe to lifecycle events: {}", err);
                return;
            }
        };
        info!("Lifecycle observer attached");

        while let Some(event) = events.next().await {
            if !forward(&commands, event).await {
                break;
            }
        }
        debug!("Lifecycle forwarding stopped");
    })
}

async fn forward(commands: &WeakSender<Command>, event: LifecycleEvent) -> bool {
    let Some(sender) = commands.upgrade() else {
        return false;
    };
    sender
        .send(Command::Lifecycle { event, reply: None })
        .await
        .is_ok()
}
