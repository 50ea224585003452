//! Bulk media ingestion for fotofair.
//!
//! An uploaded ZIP archive follows a fixed path convention,
//! `{event}/{flow}/{speech}/{member}/{file}`. The pipeline streams entries
//! out of the archive, classifies their paths, assembles an in-memory
//! hierarchy, then persists catalog rows top-down while pushing each photo
//! through the watermark/upload pipeline. Entries that do not match the
//! convention are skipped with a warning; the job never aborts over stray
//! operator files.

pub mod archive;
pub mod classify;
pub mod hierarchy;
pub mod orchestrator;

pub use archive::{ArchiveEntryMeta, ArchiveError, ZipArchiveReader};
pub use classify::{classify, ParsedPath, Rejected};
pub use hierarchy::{EventNode, HierarchyTree, MediaRef};
pub use orchestrator::{CatalogWriter, IngestOrchestrator, IngestReport, TempArchiveGuard};
