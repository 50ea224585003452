pub mod event;
pub mod ingest;
pub mod media;
pub mod tasks;
