//! Background task execution: a polling/LISTEN-NOTIFY worker pool that
//! claims tasks from the database queue and dispatches them to handlers
//! registered by the API layer.

pub mod context;
pub mod queue;

pub use context::TaskHandlerContext;
pub use queue::{TaskQueue, TaskQueueConfig};
