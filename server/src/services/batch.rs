//! Chunked batch generation.
//!
//! A [`BatchPipeline`] holds at most one validated [`InputBatch`] and runs it
//! as a strictly sequential render → zip → deliver → cooldown loop, one chunk
//! at a time. Progress is published as [`BatchRun`] snapshots on a `watch`
//! channel and mirrored as JSON events on the WebSocket broadcast channel.
//!
//! Archives delivered before a failure are not rolled back, and the final
//! summary does not mention them.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Duration;

use code_formats::FormatDescriptor;
use code_render::{
    BarcodeJob, BarcodeOptions, QrJob, QrStyle, Rasterizer, RenderError, RenderJob, Symbology,
    UnknownSymbology,
};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, watch};

use super::archive::{self, ArchiveError, DownloadSink, DownloadTicket, RenderedItem};
use super::input::{InputBatch, ValidationError};
use super::integrity;

/// Items per archive.
pub const CHUNK_SIZE: usize = 2000;

/// Pause between two archives.
pub const CHUNK_COOLDOWN: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchKind {
    Barcode,
    Qr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Validating,
    Ready,
    Processing,
    Cooling,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}

/// Half-open index range `[start, end)` of one chunk, plus its 1-indexed
/// inclusive display form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRange {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub display_start: usize,
    pub display_end: usize,
}

impl ChunkRange {
    pub fn new(index: usize, start: usize, end: usize) -> Self {
        Self {
            index,
            start,
            end,
            display_start: start + 1,
            display_end: end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `total` items into consecutive chunks of at most `chunk_size`.
pub fn plan_chunks(total: usize, chunk_size: usize) -> Vec<ChunkRange> {
    let size = chunk_size.max(1);
    (0..total.div_ceil(size))
        .map(|i| ChunkRange::new(i, i * size, ((i + 1) * size).min(total)))
        .collect()
}

/// Order two digit strings by numeric value, without a size limit.
pub fn compare_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Progress record of one pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRun {
    pub kind: BatchKind,
    pub phase: RunPhase,
    /// Format id of the loaded batch.
    pub format: Option<&'static str>,
    pub total_items: usize,
    pub chunk_size: usize,
    pub total_chunks: usize,
    pub current_chunk: Option<ChunkRange>,
    pub message: String,
    pub error: Option<String>,
    pub downloads: Vec<DownloadTicket>,
    pub updated_at: String,
}

impl BatchRun {
    fn idle(kind: BatchKind, chunk_size: usize) -> Self {
        Self {
            kind,
            phase: RunPhase::Idle,
            format: None,
            total_items: 0,
            chunk_size,
            total_chunks: 0,
            current_chunk: None,
            message: String::new(),
            error: None,
            downloads: Vec::new(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("A batch is already being generated")]
    Busy,

    #[error("No batch loaded; upload a file first")]
    NoBatch,

    #[error("A password is required to generate QR codes")]
    MissingSecret,

    #[error(transparent)]
    UnknownFormat(#[from] UnknownSymbology),

    #[error("Failed to generate code for value {value:?}: {source}")]
    Render {
        value: String,
        #[source]
        source: RenderError,
    },

    #[error("Failed to build archive: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Tunables shared by all pipelines.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chunk_size: usize,
    pub cooldown: Duration,
    pub payload_host: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            cooldown: CHUNK_COOLDOWN,
            payload_host: integrity::DEFAULT_PAYLOAD_HOST.into(),
        }
    }
}

/// Collaborators a pipeline renders, delivers and reports through.
#[derive(Clone)]
pub struct PipelineDeps {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub sink: Arc<dyn DownloadSink>,
    pub events: Option<broadcast::Sender<String>>,
    pub settings: PipelineSettings,
}

/// Parameters for [`BatchPipeline::start`].
///
/// Barcode runs use `options`; QR runs use `secret`.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub options: BarcodeOptions,
    pub secret: String,
}

enum Target {
    Barcode {
        symbology: Symbology,
        format_name: &'static str,
        options: BarcodeOptions,
    },
    Qr {
        secret: String,
        host: String,
    },
}

impl Target {
    fn job_for(&self, value: &str) -> (RenderJob, String, Option<String>) {
        match self {
            Target::Barcode {
                symbology, options, ..
            } => (
                RenderJob::Barcode(BarcodeJob {
                    symbology: *symbology,
                    value: value.to_string(),
                    options: options.clone(),
                }),
                archive::barcode_entry_name(value),
                None,
            ),
            Target::Qr { secret, host } => {
                let payload = integrity::payload_url(host, value, secret);
                let job = RenderJob::Qr(QrJob {
                    payload: payload.clone(),
                    caption: Some(value.to_string()),
                    style: QrStyle::default(),
                    logo: None,
                });
                (job, archive::qr_entry_name(value), Some(payload))
            }
        }
    }

    fn label(&self, range: &ChunkRange) -> String {
        match self {
            Target::Barcode { format_name, .. } => archive::barcode_label(format_name, range),
            Target::Qr { .. } => archive::qr_label(range),
        }
    }
}

struct RunPlan {
    batch: Arc<InputBatch>,
    target: Target,
}

/// One generator instance: a loaded batch plus at most one active run.
#[derive(Clone)]
pub struct BatchPipeline {
    inner: Arc<Inner>,
}

struct Inner {
    id: String,
    kind: BatchKind,
    deps: PipelineDeps,
    busy: AtomicBool,
    batch: Mutex<Option<Arc<InputBatch>>>,
    run_tx: watch::Sender<BatchRun>,
}

impl BatchPipeline {
    pub fn new(kind: BatchKind, deps: PipelineDeps) -> Self {
        let (run_tx, _) = watch::channel(BatchRun::idle(kind, deps.settings.chunk_size.max(1)));
        Self {
            inner: Arc::new(Inner {
                id: uuid::Uuid::new_v4().to_string(),
                kind,
                deps,
                busy: AtomicBool::new(false),
                batch: Mutex::new(None),
                run_tx,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> BatchKind {
        self.inner.kind
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchRun> {
        self.inner.run_tx.subscribe()
    }

    pub fn snapshot(&self) -> BatchRun {
        self.inner.run_tx.borrow().clone()
    }

    /// Whether a load or run currently holds the pipeline.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(AtomicOrdering::SeqCst)
    }

    pub async fn loaded_format(&self) -> Option<&'static FormatDescriptor> {
        self.inner.batch.lock().await.as_ref().map(|b| b.format())
    }

    /// Replace the loaded batch with `text` validated under `format`.
    ///
    /// Rejected with [`ValidationError::Busy`] while a run is active. On any
    /// validation failure the previous batch is gone too.
    pub async fn load(
        &self,
        text: &str,
        format: &'static FormatDescriptor,
        limit: Option<usize>,
    ) -> Result<usize, ValidationError> {
        if !self.inner.try_acquire() {
            return Err(ValidationError::Busy);
        }
        let result = self.inner.load(text, format, limit).await;
        self.inner.release();
        result
    }

    /// Drop the loaded batch and return to `Idle`.
    pub async fn reset(&self) -> Result<(), PipelineError> {
        if !self.inner.try_acquire() {
            return Err(PipelineError::Busy);
        }
        *self.inner.batch.lock().await = None;
        let chunk_size = self.inner.chunk_size();
        self.inner
            .publish(|run| *run = BatchRun::idle(run.kind, chunk_size));
        self.inner.release();
        Ok(())
    }

    /// Start generating the loaded batch in the background.
    pub async fn start(&self, request: RunRequest) -> Result<(), PipelineError> {
        if !self.inner.try_acquire() {
            return Err(PipelineError::Busy);
        }
        match self.inner.prepare(request).await {
            Ok(plan) => {
                let inner = self.inner.clone();
                tokio::spawn(async move { inner.run(plan).await });
                Ok(())
            }
            Err(e) => {
                self.inner.release();
                Err(e)
            }
        }
    }
}

impl Inner {
    fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, AtomicOrdering::SeqCst, AtomicOrdering::SeqCst)
            .is_ok()
    }

    fn release(&self) {
        self.busy.store(false, AtomicOrdering::SeqCst);
    }

    fn chunk_size(&self) -> usize {
        self.deps.settings.chunk_size.max(1)
    }

    fn publish(&self, update: impl FnOnce(&mut BatchRun)) {
        self.run_tx.send_modify(|run| {
            update(run);
            run.updated_at = chrono::Utc::now().to_rfc3339();
        });
    }

    fn emit(&self, event_type: &str, mut data: Value) {
        let Some(tx) = &self.deps.events else {
            return;
        };
        if let Some(obj) = data.as_object_mut() {
            obj.insert("pipelineId".into(), json!(self.id));
            obj.insert("kind".into(), json!(self.kind));
            obj.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        }
        let msg = json!({ "type": event_type, "data": data });
        let _ = tx.send(msg.to_string());
    }

    fn emit_progress(&self) {
        let run = self.run_tx.borrow().clone();
        self.emit(
            "batch_progress",
            json!({
                "phase": run.phase,
                "chunk": run.current_chunk,
                "totalChunks": run.total_chunks,
                "totalItems": run.total_items,
                "message": run.message,
            }),
        );
    }

    async fn load(
        &self,
        text: &str,
        format: &'static FormatDescriptor,
        limit: Option<usize>,
    ) -> Result<usize, ValidationError> {
        let mut slot = self.batch.lock().await;
        *slot = None;
        let chunk_size = self.chunk_size();
        self.publish(|run| {
            *run = BatchRun::idle(run.kind, chunk_size);
            run.phase = RunPhase::Validating;
            run.message = "Validating file...".into();
        });

        match InputBatch::parse(text, format, limit) {
            Ok(batch) => {
                let total = batch.len();
                self.publish(|run| {
                    run.phase = RunPhase::Ready;
                    run.format = Some(format.id);
                    run.total_items = total;
                    run.total_chunks = total.div_ceil(chunk_size);
                    run.message = format!(
                        "File loaded with {total} line(s). Start generation to create the codes."
                    );
                });
                *slot = Some(Arc::new(batch));
                tracing::info!(kind = ?self.kind, format = format.id, total, "Batch loaded");
                Ok(total)
            }
            Err(e) => {
                self.publish(|run| {
                    run.phase = RunPhase::Failed;
                    run.message = e.to_string();
                    run.error = Some(e.to_string());
                });
                tracing::warn!(kind = ?self.kind, format = format.id, error = %e, "Batch rejected");
                Err(e)
            }
        }
    }

    async fn prepare(&self, request: RunRequest) -> Result<RunPlan, PipelineError> {
        let batch = self
            .batch
            .lock()
            .await
            .clone()
            .ok_or(PipelineError::NoBatch)?;

        let target = match self.kind {
            BatchKind::Barcode => Target::Barcode {
                symbology: batch.format().format.parse()?,
                format_name: batch.format().name,
                options: request.options,
            },
            BatchKind::Qr => {
                if request.secret.is_empty() {
                    return Err(PipelineError::MissingSecret);
                }
                Target::Qr {
                    secret: request.secret,
                    host: self.deps.settings.payload_host.clone(),
                }
            }
        };
        Ok(RunPlan { batch, target })
    }

    async fn run(self: Arc<Self>, plan: RunPlan) {
        let total = plan.batch.len();
        let chunks = plan_chunks(total, self.chunk_size());
        tracing::info!(kind = ?self.kind, total, chunks = chunks.len(), "Batch run started");

        self.publish(|run| {
            run.phase = RunPhase::Processing;
            run.total_items = total;
            run.total_chunks = chunks.len();
            run.current_chunk = None;
            run.error = None;
            run.downloads.clear();
        });

        let outcome = self.process(&plan, &chunks).await;
        self.release();

        match outcome {
            Ok(()) => {
                let message = format!(
                    "Done. All {total} codes were generated and delivered in {} archive(s).",
                    chunks.len()
                );
                self.publish(|run| {
                    run.phase = RunPhase::Completed;
                    run.current_chunk = None;
                    run.message = message.clone();
                });
                self.emit(
                    "batch_completed",
                    json!({ "totalItems": total, "totalChunks": chunks.len(), "message": message }),
                );
                tracing::info!(kind = ?self.kind, total, chunks = chunks.len(), "Batch run completed");
            }
            Err(e) => {
                let message = e.to_string();
                self.publish(|run| {
                    run.phase = RunPhase::Failed;
                    run.message = message.clone();
                    run.error = Some(message.clone());
                });
                self.emit("batch_failed", json!({ "error": message }));
                tracing::error!(kind = ?self.kind, error = %e, "Batch run failed");
            }
        }
    }

    async fn process(&self, plan: &RunPlan, chunks: &[ChunkRange]) -> Result<(), PipelineError> {
        let total_chunks = chunks.len();
        for range in chunks {
            let n = range.index + 1;
            self.publish(|run| {
                run.phase = RunPhase::Processing;
                run.current_chunk = Some(*range);
                run.message = format!(
                    "Processing chunk {n}/{total_chunks}: codes {} to {}",
                    range.display_start, range.display_end
                );
            });
            self.emit_progress();

            let mut items = self.render_chunk(plan, range).await?;
            if self.kind == BatchKind::Qr {
                items.sort_by(|a, b| compare_numeric(&a.value, &b.value));
            }

            self.publish(|run| {
                run.message = format!(
                    "Packing chunk {n}/{total_chunks}: codes {} to {}",
                    range.display_start, range.display_end
                );
            });
            let label = plan.target.label(range);
            let sink = self.deps.sink.clone();
            let ticket = tokio::task::spawn_blocking(move || -> Result<DownloadTicket, ArchiveError> {
                let archive = archive::pack(&items, &label)?;
                sink.deliver(archive)
            })
            .await??;

            tracing::info!(
                chunk = n,
                start = range.display_start,
                end = range.display_end,
                file = ticket.file_name(),
                "Chunk delivered"
            );
            self.publish(|run| run.downloads.push(ticket.clone()));
            self.emit(
                "batch_archive_ready",
                json!({ "chunk": range, "download": ticket }),
            );

            if n < total_chunks {
                let cooldown = self.deps.settings.cooldown;
                self.publish(|run| {
                    run.phase = RunPhase::Cooling;
                    run.message = format!(
                        "Chunk {n} done. Waiting {} seconds before the next chunk...",
                        cooldown.as_secs()
                    );
                });
                self.emit_progress();
                tokio::time::sleep(cooldown).await;
            }
        }
        Ok(())
    }

    /// Render every item of `range`, one at a time.
    async fn render_chunk(
        &self,
        plan: &RunPlan,
        range: &ChunkRange,
    ) -> Result<Vec<RenderedItem>, PipelineError> {
        let mut items = Vec::with_capacity(range.len());
        for value in &plan.batch.entries()[range.start..range.end] {
            let (job, entry_name, payload) = plan.target.job_for(value);
            let rasterizer = self.deps.rasterizer.clone();
            let png = tokio::task::spawn_blocking(move || rasterizer.rasterize(&job))
                .await?
                .map_err(|source| PipelineError::Render {
                    value: value.clone(),
                    source,
                })?;
            items.push(RenderedItem {
                value: value.clone(),
                entry_name,
                png,
                payload,
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::archive::Archive;
    use code_formats::{QR_SERIAL, find_format};
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Instant;

    /// Returns the job subject as PNG bytes; fails on one chosen value.
    #[derive(Default)]
    struct FakeRasterizer {
        fail_on: Option<String>,
        seen: StdMutex<Vec<RenderJob>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
            let now = self.in_flight.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, AtomicOrdering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            self.seen.lock().unwrap().push(job.clone());
            self.in_flight.fetch_sub(1, AtomicOrdering::SeqCst);

            if self.fail_on.as_deref() == Some(job.subject()) {
                return Err(RenderError::Qr("boom".into()));
            }
            Ok(job.subject().as_bytes().to_vec())
        }
    }

    impl FakeRasterizer {
        fn subjects(&self) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|j| j.subject().to_string())
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        archives: StdMutex<Vec<Archive>>,
    }

    impl DownloadSink for RecordingSink {
        fn deliver(&self, archive: Archive) -> Result<DownloadTicket, ArchiveError> {
            let ticket = DownloadTicket::Saved {
                file_name: archive.file_name.clone(),
                path: archive.file_name.clone().into(),
            };
            self.archives.lock().unwrap().push(archive);
            Ok(ticket)
        }
    }

    impl RecordingSink {
        fn file_names(&self) -> Vec<String> {
            self.archives
                .lock()
                .unwrap()
                .iter()
                .map(|a| a.file_name.clone())
                .collect()
        }

        fn entries(&self, index: usize) -> Vec<String> {
            let bytes = self.archives.lock().unwrap()[index].bytes.clone();
            let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
            (0..zip.len())
                .map(|i| zip.by_index(i).unwrap().name().to_string())
                .filter(|n| n.ends_with(".png"))
                .collect()
        }
    }

    struct Harness {
        pipeline: BatchPipeline,
        rasterizer: Arc<FakeRasterizer>,
        sink: Arc<RecordingSink>,
    }

    fn harness(kind: BatchKind, chunk_size: usize, cooldown: Duration) -> Harness {
        harness_with(kind, chunk_size, cooldown, FakeRasterizer::default())
    }

    fn harness_with(
        kind: BatchKind,
        chunk_size: usize,
        cooldown: Duration,
        rasterizer: FakeRasterizer,
    ) -> Harness {
        let rasterizer = Arc::new(rasterizer);
        let sink = Arc::new(RecordingSink::default());
        let deps = PipelineDeps {
            rasterizer: rasterizer.clone(),
            sink: sink.clone(),
            events: None,
            settings: PipelineSettings {
                chunk_size,
                cooldown,
                payload_host: "https://check.vant.plus".into(),
            },
        };
        Harness {
            pipeline: BatchPipeline::new(kind, deps),
            rasterizer,
            sink,
        }
    }

    async fn finish(pipeline: &BatchPipeline) -> BatchRun {
        pipeline
            .subscribe()
            .wait_for(|run| run.phase.is_terminal())
            .await
            .unwrap()
            .clone()
    }

    fn itf() -> &'static FormatDescriptor {
        find_format("ITF").unwrap()
    }

    fn qr_request(secret: &str) -> RunRequest {
        RunRequest {
            secret: secret.into(),
            ..RunRequest::default()
        }
    }

    #[test]
    fn chunks_cover_input_contiguously() {
        for total in [0, 1, 1999, 2000, 2001, 4500, 6000] {
            let chunks = plan_chunks(total, CHUNK_SIZE);
            assert_eq!(chunks.len(), total.div_ceil(CHUNK_SIZE), "total {total}");

            let mut expected_start = 1;
            for (i, c) in chunks.iter().enumerate() {
                assert_eq!(c.index, i);
                assert_eq!(c.display_start, expected_start);
                assert!(c.display_end >= c.display_start);
                assert!(c.len() <= CHUNK_SIZE);
                expected_start = c.display_end + 1;
            }
            assert_eq!(expected_start, total + 1);
        }
    }

    #[test]
    fn display_range_is_one_indexed_inclusive() {
        let chunks = plan_chunks(4500, 2000);
        assert_eq!(
            chunks[2],
            ChunkRange {
                index: 2,
                start: 4000,
                end: 4500,
                display_start: 4001,
                display_end: 4500
            }
        );
    }

    #[test]
    fn numeric_comparison_handles_big_values_and_leading_zeros() {
        assert_eq!(compare_numeric("9", "10"), Ordering::Less);
        assert_eq!(compare_numeric("007", "7"), Ordering::Equal);
        assert_eq!(compare_numeric("0", "000"), Ordering::Equal);
        assert_eq!(
            compare_numeric("123456789012345678901234567890", "99999999999999999999"),
            Ordering::Greater
        );
    }

    #[tokio::test]
    async fn itf_batch_produces_single_archive() {
        let h = harness(BatchKind::Barcode, CHUNK_SIZE, Duration::ZERO);
        let n = h
            .pipeline
            .load("000000000001\n000000000002\n000000000003", itf(), Some(10))
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(h.pipeline.snapshot().phase, RunPhase::Ready);
        assert_eq!(h.pipeline.snapshot().total_chunks, 1);

        h.pipeline.start(RunRequest::default()).await.unwrap();
        let run = finish(&h.pipeline).await;

        assert_eq!(run.phase, RunPhase::Completed);
        assert!(run.message.contains('3'));
        assert_eq!(h.sink.file_names(), ["ITF 1 - 3.zip"]);
        assert_eq!(
            h.sink.entries(0),
            [
                "ITF 1 - 3/000000000001.png",
                "ITF 1 - 3/000000000002.png",
                "ITF 1 - 3/000000000003.png"
            ]
        );
        assert_eq!(run.downloads.len(), 1);
    }

    #[tokio::test]
    async fn over_limit_upload_creates_no_batch() {
        let h = harness(BatchKind::Barcode, CHUNK_SIZE, Duration::ZERO);
        let text: String = (1..=11).map(|i| format!("{i:012}\n")).collect();

        let err = h.pipeline.load(&text, itf(), Some(10)).await.unwrap_err();
        assert_eq!(err, ValidationError::LimitExceeded { limit: 10, count: 11 });

        let run = h.pipeline.snapshot();
        assert_eq!(run.phase, RunPhase::Failed);
        assert!(run.error.unwrap().contains("11"));
        assert!(matches!(
            h.pipeline.start(RunRequest::default()).await,
            Err(PipelineError::NoBatch)
        ));
    }

    #[tokio::test]
    async fn repeated_code_upload_creates_no_batch() {
        let h = harness(BatchKind::Barcode, CHUNK_SIZE, Duration::ZERO);
        let err = h
            .pipeline
            .load("000000000001\n000000000001", itf(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateLine { .. }));

        let run = h.pipeline.snapshot();
        assert_eq!(run.phase, RunPhase::Failed);
        assert!(run.error.unwrap().contains("000000000001"));
        assert!(matches!(
            h.pipeline.start(RunRequest::default()).await,
            Err(PipelineError::NoBatch)
        ));
        assert!(h.sink.file_names().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_discards_previous_batch() {
        let h = harness(BatchKind::Barcode, CHUNK_SIZE, Duration::ZERO);
        h.pipeline.load("000000000001", itf(), None).await.unwrap();
        assert!(h.pipeline.load("nope", itf(), None).await.is_err());
        assert!(h.pipeline.loaded_format().await.is_none());
    }

    #[tokio::test]
    async fn barcodes_keep_upload_order_across_chunks() {
        let h = harness(BatchKind::Barcode, 2, Duration::ZERO);
        let msi = find_format("MSI").unwrap();
        h.pipeline.load("5\n3\n9\n1\n7", msi, None).await.unwrap();
        h.pipeline.start(RunRequest::default()).await.unwrap();
        let run = finish(&h.pipeline).await;

        assert_eq!(run.phase, RunPhase::Completed);
        assert_eq!(h.rasterizer.subjects(), ["5", "3", "9", "1", "7"]);
        assert_eq!(
            h.sink.file_names(),
            ["MSI 1 - 2.zip", "MSI 3 - 4.zip", "MSI 5 - 5.zip"]
        );
        assert_eq!(h.sink.entries(0), ["MSI 1 - 2/5.png", "MSI 1 - 2/3.png"]);
    }

    #[tokio::test]
    async fn rendering_is_strictly_sequential() {
        let h = harness(BatchKind::Barcode, 3, Duration::ZERO);
        let text: String = (1..=7).map(|i| format!("{i}\n")).collect();
        h.pipeline
            .load(&text, find_format("MSI").unwrap(), None)
            .await
            .unwrap();
        h.pipeline.start(RunRequest::default()).await.unwrap();
        finish(&h.pipeline).await;

        assert_eq!(h.rasterizer.subjects().len(), 7);
        assert_eq!(h.rasterizer.max_in_flight.load(AtomicOrdering::SeqCst), 1);
    }

    #[tokio::test]
    async fn qr_entries_are_sorted_numerically_within_chunk() {
        let h = harness(BatchKind::Qr, CHUNK_SIZE, Duration::ZERO);
        h.pipeline
            .load("100\n9\n25\n3", &QR_SERIAL, None)
            .await
            .unwrap();
        h.pipeline.start(qr_request("pw")).await.unwrap();
        finish(&h.pipeline).await;

        // rendered in upload order, packed in numeric order
        assert_eq!(h.rasterizer.subjects(), ["100", "9", "25", "3"]);
        assert_eq!(h.sink.file_names(), ["QR Codes 1 - 4.zip"]);
        assert_eq!(
            h.sink.entries(0),
            [
                "QR Codes 1 - 4/qrcode_3.png",
                "QR Codes 1 - 4/qrcode_9.png",
                "QR Codes 1 - 4/qrcode_25.png",
                "QR Codes 1 - 4/qrcode_100.png"
            ]
        );
    }

    #[tokio::test]
    async fn qr_payload_embeds_integrity_tag() {
        let h = harness(BatchKind::Qr, CHUNK_SIZE, Duration::ZERO);
        h.pipeline.load("4 2", &QR_SERIAL, None).await.unwrap();
        h.pipeline.start(qr_request("pw")).await.unwrap();
        finish(&h.pipeline).await;

        let jobs = h.rasterizer.seen.lock().unwrap().clone();
        match &jobs[0] {
            RenderJob::Qr(job) => {
                assert_eq!(
                    job.payload,
                    format!("https://check.vant.plus/42-{}", integrity::tag("42", "pw"))
                );
                assert_eq!(job.caption.as_deref(), Some("42"));
            }
            other => panic!("unexpected job: {other:?}"),
        }
    }

    #[tokio::test]
    async fn qr_run_requires_secret() {
        let h = harness(BatchKind::Qr, CHUNK_SIZE, Duration::ZERO);
        h.pipeline.load("1", &QR_SERIAL, None).await.unwrap();
        assert!(matches!(
            h.pipeline.start(qr_request("")).await,
            Err(PipelineError::MissingSecret)
        ));
        assert!(!h.pipeline.is_busy());
        assert_eq!(h.pipeline.snapshot().phase, RunPhase::Ready);
    }

    #[tokio::test]
    async fn render_failure_aborts_without_rollback() {
        let rasterizer = FakeRasterizer {
            fail_on: Some("3".into()),
            ..FakeRasterizer::default()
        };
        let h = harness_with(BatchKind::Barcode, 2, Duration::ZERO, rasterizer);
        h.pipeline
            .load("1\n2\n3\n4", find_format("MSI").unwrap(), None)
            .await
            .unwrap();
        h.pipeline.start(RunRequest::default()).await.unwrap();
        let run = finish(&h.pipeline).await;

        assert_eq!(run.phase, RunPhase::Failed);
        assert!(run.error.unwrap().contains("\"3\""));
        assert_eq!(h.sink.file_names(), ["MSI 1 - 2.zip"]);
        assert_eq!(h.rasterizer.subjects(), ["1", "2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_pipeline_rejects_start_load_and_reset() {
        let h = harness(BatchKind::Barcode, 1, Duration::from_secs(10));
        let msi = find_format("MSI").unwrap();
        h.pipeline.load("1\n2", msi, None).await.unwrap();
        h.pipeline.start(RunRequest::default()).await.unwrap();

        assert!(matches!(
            h.pipeline.start(RunRequest::default()).await,
            Err(PipelineError::Busy)
        ));
        assert_eq!(
            h.pipeline.load("3", msi, None).await.unwrap_err(),
            ValidationError::Busy
        );
        assert!(matches!(h.pipeline.reset().await, Err(PipelineError::Busy)));

        finish(&h.pipeline).await;
        assert!(!h.pipeline.is_busy());
        h.pipeline.reset().await.unwrap();
        assert_eq!(h.pipeline.snapshot().phase, RunPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn next_chunk_waits_for_delivery_and_cooldown() {
        let cooldown = Duration::from_secs(10);
        let h = harness(BatchKind::Barcode, 2, cooldown);
        h.pipeline
            .load("1\n2\n3\n4\n5", find_format("MSI").unwrap(), None)
            .await
            .unwrap();

        let mut rx = h.pipeline.subscribe();
        let started = Instant::now();
        h.pipeline.start(RunRequest::default()).await.unwrap();

        let mut cooling_at = Vec::new();
        let mut chunk_started_at = Vec::new();
        loop {
            rx.changed().await.unwrap();
            let run = rx.borrow_and_update().clone();
            match (run.phase, run.current_chunk) {
                (RunPhase::Cooling, Some(c)) if cooling_at.len() == c.index => {
                    assert_eq!(h.sink.file_names().len(), c.index + 1);
                    cooling_at.push(Instant::now());
                }
                (RunPhase::Processing, Some(c)) if chunk_started_at.len() == c.index => {
                    chunk_started_at.push(Instant::now());
                }
                _ => {}
            }
            if run.phase.is_terminal() {
                assert_eq!(run.phase, RunPhase::Completed);
                break;
            }
        }

        assert_eq!(cooling_at.len(), 2);
        assert_eq!(chunk_started_at.len(), 3);
        for i in 0..2 {
            assert!(chunk_started_at[i + 1] - cooling_at[i] >= cooldown);
        }
        assert!(started.elapsed() >= cooldown * 2);
        assert_eq!(h.sink.file_names().len(), 3);
    }

    #[tokio::test]
    async fn progress_events_use_type_data_envelope() {
        let (tx, mut rx) = broadcast::channel(64);
        let deps = PipelineDeps {
            rasterizer: Arc::new(FakeRasterizer::default()),
            sink: Arc::new(RecordingSink::default()),
            events: Some(tx),
            settings: PipelineSettings {
                cooldown: Duration::ZERO,
                ..PipelineSettings::default()
            },
        };
        let pipeline = BatchPipeline::new(BatchKind::Barcode, deps);
        pipeline
            .load("000000000001", itf(), None)
            .await
            .unwrap();
        pipeline.start(RunRequest::default()).await.unwrap();
        finish(&pipeline).await;

        let mut types = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            let v: Value = serde_json::from_str(&msg).unwrap();
            assert_eq!(v["data"]["pipelineId"], pipeline.id());
            types.push(v["type"].as_str().unwrap().to_string());
        }
        assert_eq!(types, ["batch_progress", "batch_archive_ready", "batch_completed"]);
    }
}
