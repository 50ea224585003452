//! Ingestion orchestrator: drives one archive from temp file to catalog rows.
//!
//! The run opens the archive, classifies every entry, builds the in-memory
//! hierarchy, then persists it top-down. Each photo is pulled out of the
//! archive lazily and pushed through the media pipeline; only a successful
//! upload consumes an order slot, so per-member orders stay 1-based and
//! gapless even when individual photos are skipped.
//!
//! Cleanup is unconditional: the archive handle is closed and the temporary
//! file removed on success and failure alike, so a retried job that finds
//! the file gone fails fast instead of reprocessing stale state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use fotofair_core::models::{NewEvent, NewFlow, NewMedia, NewSpeech};
use fotofair_processing::{MediaPipeline, PipelineError, RawUpload};

use crate::archive::ZipArchiveReader;
use crate::classify::classify;
use crate::hierarchy::HierarchyTree;

/// Persistence seam for the catalog hierarchy. Implemented by the database
/// layer; faked in tests.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> anyhow::Result<Uuid>;
    async fn create_flow(&self, flow: NewFlow) -> anyhow::Result<Uuid>;
    async fn create_speech(&self, speech: NewSpeech) -> anyhow::Result<Uuid>;
    async fn create_member(&self, speech_id: Uuid) -> anyhow::Result<Uuid>;
    async fn create_media(&self, media: NewMedia) -> anyhow::Result<Uuid>;
}

/// Counters summarizing one ingestion run, for the completion log line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub events: usize,
    pub flows: usize,
    pub speeches: usize,
    pub members: usize,
    pub media_ingested: usize,
    /// Entries whose paths did not match the upload convention.
    pub entries_skipped: usize,
    /// Well-placed entries whose bytes could not be decoded as an image.
    pub media_skipped: usize,
}

/// Removes the temporary archive file exactly once, on drop or on an
/// explicit [`cleanup`](TempArchiveGuard::cleanup) call, whichever comes
/// first. Removal is best-effort; a missing file is not an error.
pub struct TempArchiveGuard {
    path: PathBuf,
    done: bool,
}

impl TempArchiveGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            done: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and return the path, leaving the file in place.
    /// Used when ownership of the archive passes to a queued task.
    pub fn keep(mut self) -> PathBuf {
        self.done = true;
        std::mem::take(&mut self.path)
    }

    pub fn cleanup(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed temporary archive");
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Failed to remove temporary archive"
                );
            }
        }
    }
}

impl Drop for TempArchiveGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Drives archive ingestion end to end against pluggable catalog and media
/// pipeline collaborators.
pub struct IngestOrchestrator {
    catalog: Arc<dyn CatalogWriter>,
    pipeline: Arc<dyn MediaPipeline>,
}

impl IngestOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogWriter>, pipeline: Arc<dyn MediaPipeline>) -> Self {
        Self { catalog, pipeline }
    }

    /// Ingest one uploaded archive. The file at `archive_path` is consumed:
    /// it is deleted before this returns, on every path.
    #[tracing::instrument(skip(self), fields(archive = %archive_path.display()))]
    pub async fn run(
        &self,
        archive_path: &Path,
        order_deadline: Option<DateTime<Utc>>,
    ) -> anyhow::Result<IngestReport> {
        let mut guard = TempArchiveGuard::new(archive_path);

        let mut reader = match ZipArchiveReader::open(archive_path) {
            Ok(reader) => reader,
            Err(err) => {
                guard.cleanup();
                return Err(err.into());
            }
        };

        let outcome = self.ingest(&mut reader, order_deadline).await;

        reader.close();
        guard.cleanup();

        match &outcome {
            Ok(report) => {
                tracing::info!(
                    events = report.events,
                    media = report.media_ingested,
                    entries_skipped = report.entries_skipped,
                    media_skipped = report.media_skipped,
                    "Archive ingestion completed"
                );
            }
            Err(err) => {
                tracing::error!(error = %err, "Archive ingestion failed");
            }
        }

        outcome
    }

    async fn ingest(
        &self,
        reader: &mut ZipArchiveReader,
        order_deadline: Option<DateTime<Utc>>,
    ) -> anyhow::Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut tree = HierarchyTree::new();

        for meta in reader.entries()? {
            match classify(&meta.path) {
                Ok(parsed) => tree.insert(parsed, meta.index, order_deadline),
                Err(rejected) => {
                    tracing::warn!(
                        path = %rejected.path,
                        reason = %rejected.reason,
                        "Skipping archive entry"
                    );
                    report.entries_skipped += 1;
                }
            }
        }

        for event in &tree.events {
            let event_id = self
                .catalog
                .create_event(NewEvent {
                    name: event.name.clone(),
                    date: Utc::now(),
                    order_deadline: event.order_deadline,
                })
                .await?;
            report.events += 1;
            tracing::info!(event = %event.name, %event_id, "Created event");

            for flow in &event.flows {
                // The archive carries no schedule; the window is filled in
                // at ingestion time and edited afterwards.
                let now = Utc::now();
                let flow_id = self
                    .catalog
                    .create_flow(NewFlow {
                        name: flow.name.clone(),
                        from: now,
                        to: now,
                        event_id,
                    })
                    .await?;
                report.flows += 1;

                for speech in &flow.speeches {
                    let speech_id = self
                        .catalog
                        .create_speech(NewSpeech {
                            name: speech.name.clone(),
                            flow_id,
                        })
                        .await?;
                    report.speeches += 1;

                    for member in &speech.members {
                        let member_id = self.catalog.create_member(speech_id).await?;
                        report.members += 1;

                        let mut order: i32 = 1;
                        for media in &member.media {
                            let buffer = reader.entry_bytes(media.entry_index)?;
                            let upload = RawUpload {
                                buffer,
                                original_filename: media.file_name.clone(),
                            };

                            match self.pipeline.upload_file(member_id, order, upload).await {
                                Ok(uploaded) => {
                                    self.catalog
                                        .create_media(NewMedia {
                                            filename: uploaded.filename,
                                            preview: uploaded.preview,
                                            full_version: uploaded.full_version,
                                            order,
                                            member_id,
                                        })
                                        .await?;
                                    report.media_ingested += 1;
                                    order += 1;
                                }
                                Err(PipelineError::Decode(reason)) => {
                                    tracing::warn!(
                                        file = %media.file_name,
                                        %reason,
                                        "Skipping undecodable media"
                                    );
                                    report.media_skipped += 1;
                                }
                                Err(err) => return Err(err.into()),
                            }
                        }
                    }
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveError;
    use fotofair_processing::UploadedMedia;
    use std::io::Write;
    use std::sync::Mutex;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_test_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("upload.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ZipWriter::new(file);
        for (name, bytes) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(bytes).unwrap();
            }
        }
        writer.finish().unwrap();
        path
    }

    #[derive(Default)]
    struct Recorded {
        events: Vec<NewEvent>,
        flows: Vec<NewFlow>,
        speeches: Vec<NewSpeech>,
        members: Vec<Uuid>,
        media: Vec<NewMedia>,
    }

    #[derive(Default)]
    struct RecordingCatalog {
        state: Mutex<Recorded>,
    }

    #[async_trait]
    impl CatalogWriter for RecordingCatalog {
        async fn create_event(&self, event: NewEvent) -> anyhow::Result<Uuid> {
            self.state.lock().unwrap().events.push(event);
            Ok(Uuid::new_v4())
        }

        async fn create_flow(&self, flow: NewFlow) -> anyhow::Result<Uuid> {
            self.state.lock().unwrap().flows.push(flow);
            Ok(Uuid::new_v4())
        }

        async fn create_speech(&self, speech: NewSpeech) -> anyhow::Result<Uuid> {
            self.state.lock().unwrap().speeches.push(speech);
            Ok(Uuid::new_v4())
        }

        async fn create_member(&self, speech_id: Uuid) -> anyhow::Result<Uuid> {
            self.state.lock().unwrap().members.push(speech_id);
            Ok(Uuid::new_v4())
        }

        async fn create_media(&self, media: NewMedia) -> anyhow::Result<Uuid> {
            self.state.lock().unwrap().media.push(media);
            Ok(Uuid::new_v4())
        }
    }

    /// Pipeline stand-in: succeeds unless the filename contains
    /// `decode_fail` (decode error) or `hard_fail` (transient error).
    #[derive(Default)]
    struct FakePipeline {
        uploads: Mutex<Vec<(Uuid, i32, String)>>,
    }

    #[async_trait]
    impl MediaPipeline for FakePipeline {
        async fn upload_file(
            &self,
            owner_id: Uuid,
            order: i32,
            file: RawUpload,
        ) -> Result<UploadedMedia, PipelineError> {
            if file.original_filename.contains("decode_fail") {
                return Err(PipelineError::Decode("not an image".to_string()));
            }
            if file.original_filename.contains("hard_fail") {
                return Err(PipelineError::Internal("storage unavailable".to_string()));
            }
            self.uploads
                .lock()
                .unwrap()
                .push((owner_id, order, file.original_filename.clone()));
            Ok(UploadedMedia {
                filename: file.original_filename.clone(),
                preview: format!("http://files/preview/{}/{}", owner_id, file.original_filename),
                full_version: format!(
                    "http://files/original/{}/{}",
                    owner_id, file.original_filename
                ),
                order,
            })
        }
    }

    fn orchestrator() -> (Arc<RecordingCatalog>, Arc<FakePipeline>, IngestOrchestrator) {
        let catalog = Arc::new(RecordingCatalog::default());
        let pipeline = Arc::new(FakePipeline::default());
        let orchestrator =
            IngestOrchestrator::new(catalog.clone() as Arc<dyn CatalogWriter>, pipeline.clone());
        (catalog, pipeline, orchestrator)
    }

    #[tokio::test]
    async fn ingests_valid_entries_and_skips_junk() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(
            dir.path(),
            &[
                ("Gala/Morning/Opening/Jane/a.jpg", b"a".as_slice()),
                ("Gala/Morning/Opening/Jane/b.jpg", b"b".as_slice()),
                ("Gala/Morning/Opening/Bob/c.jpg", b"c".as_slice()),
                ("readme.txt", b"hi".as_slice()),
                ("__MACOSX/Gala/._a.jpg", b"junk".as_slice()),
                ("Gala/Morning/Opening/Jane/", b"".as_slice()),
            ],
        );

        let (catalog, pipeline, orchestrator) = orchestrator();
        let report = orchestrator.run(&path, None).await.unwrap();

        assert_eq!(report.events, 1);
        assert_eq!(report.flows, 1);
        assert_eq!(report.speeches, 1);
        assert_eq!(report.members, 2);
        assert_eq!(report.media_ingested, 3);
        assert_eq!(report.entries_skipped, 2);
        assert_eq!(report.media_skipped, 0);

        let state = catalog.state.lock().unwrap();
        assert_eq!(state.events[0].name, "Gala");
        assert_eq!(state.flows[0].name, "Morning");
        assert_eq!(state.speeches[0].name, "Opening");
        assert_eq!(state.media.len(), 3);

        // Jane's photos got orders 1 and 2; Bob's got 1.
        let jane: Vec<i32> = state
            .media
            .iter()
            .filter(|m| m.filename.starts_with("a.") || m.filename.starts_with("b."))
            .map(|m| m.order)
            .collect();
        assert_eq!(jane, vec![1, 2]);
        let bob = state.media.iter().find(|m| m.filename == "c.jpg").unwrap();
        assert_eq!(bob.order, 1);

        // Every recorded media row names the member it was uploaded for.
        let uploads = pipeline.uploads.lock().unwrap();
        for media in &state.media {
            assert!(uploads
                .iter()
                .any(|(owner, order, name)| *owner == media.member_id
                    && *order == media.order
                    && *name == media.filename));
        }

        assert!(!path.exists(), "temporary archive should be removed");
    }

    #[tokio::test]
    async fn order_deadline_lands_on_created_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(dir.path(), &[("E/F/S/M/a.jpg", b"a".as_slice())]);
        let deadline = Utc::now() + chrono::Duration::days(14);

        let (catalog, _pipeline, orchestrator) = orchestrator();
        orchestrator.run(&path, Some(deadline)).await.unwrap();

        let state = catalog.state.lock().unwrap();
        assert_eq!(state.events[0].order_deadline, Some(deadline));
    }

    #[tokio::test]
    async fn undecodable_media_is_skipped_without_consuming_an_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(
            dir.path(),
            &[
                ("E/F/S/M/a.jpg", b"a".as_slice()),
                ("E/F/S/M/decode_fail.jpg", b"x".as_slice()),
                ("E/F/S/M/c.jpg", b"c".as_slice()),
            ],
        );

        let (catalog, _pipeline, orchestrator) = orchestrator();
        let report = orchestrator.run(&path, None).await.unwrap();

        assert_eq!(report.media_ingested, 2);
        assert_eq!(report.media_skipped, 1);

        let state = catalog.state.lock().unwrap();
        let orders: Vec<(String, i32)> = state
            .media
            .iter()
            .map(|m| (m.filename.clone(), m.order))
            .collect();
        assert_eq!(
            orders,
            vec![("a.jpg".to_string(), 1), ("c.jpg".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn transient_pipeline_failure_propagates_and_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_zip(
            dir.path(),
            &[("E/F/S/M/hard_fail.jpg", b"x".as_slice())],
        );

        let (_catalog, _pipeline, orchestrator) = orchestrator();
        let err = orchestrator.run(&path, None).await.unwrap_err();

        assert!(err.to_string().contains("storage unavailable"));
        assert!(!path.exists(), "temporary archive should be removed on failure");
    }

    #[tokio::test]
    async fn missing_archive_fails_fast_with_source_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("already-gone.zip");

        let (catalog, _pipeline, orchestrator) = orchestrator();
        let err = orchestrator.run(&path, None).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ArchiveError>(),
            Some(ArchiveError::SourceMissing(_))
        ));
        assert!(catalog.state.lock().unwrap().events.is_empty());
    }

    #[tokio::test]
    async fn guard_cleanup_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmp.zip");
        std::fs::write(&path, b"bytes").unwrap();

        let mut guard = TempArchiveGuard::new(&path);
        guard.cleanup();
        assert!(!path.exists());
        guard.cleanup();
        drop(guard);
    }

    #[test]
    fn guard_keep_leaves_the_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("handed-off.zip");
        std::fs::write(&path, b"bytes").unwrap();

        let kept = TempArchiveGuard::new(&path).keep();
        assert_eq!(kept, path);
        assert!(path.exists());
    }
}
