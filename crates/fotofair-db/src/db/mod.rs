pub mod catalog;
pub mod task;

pub use catalog::CatalogRepository;
pub use task::TaskRepository;
