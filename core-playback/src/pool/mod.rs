//! Handle pools.
//!
//! [`ActivePool`] holds promoted handles and is owned by the manager task.
//! [`PreloadPool`] holds warmed handles and is shared with the preload worker.

mod active;
mod preload;

pub(crate) use active::ActivePool;
pub(crate) use preload::{PreloadPool, PreloadRequest, PreloadWorker};
