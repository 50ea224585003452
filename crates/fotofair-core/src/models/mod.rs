pub mod catalog;
pub mod task;

pub use catalog::{
    Event, Flow, Media, Member, NewEvent, NewFlow, NewMedia, NewSpeech, Speech,
};
pub use task::{ArchiveIngestPayload, Priority, Task, TaskPayload, TaskStatus, TaskType};
