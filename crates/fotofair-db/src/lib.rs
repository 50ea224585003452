//! Database repositories for the fotofair data access layer.
//!
//! `CatalogRepository` owns the event → flow → speech → member → media
//! hierarchy; `TaskRepository` owns the background job table workers claim
//! from. Both are thin `PgPool` wrappers constructed once at startup and
//! cloned into handlers.

pub mod db;

pub use db::catalog::{CatalogRepository, EventPage, UpdateEvent};
pub use db::task::{TaskRepository, TASK_NOTIFY_CHANNEL};
