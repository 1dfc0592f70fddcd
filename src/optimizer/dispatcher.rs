//! # Media Compressor Main Orchestrator
//!
//! Orchestratore del batch: valida la configurazione, crea la cartella di output,
//! scansiona l'albero sorgente e sottomette un job per ogni file idoneo a un pool
//! di worker limitato da un `Semaphore`.
//!
//! ## Flusso:
//! 1. `MediaCompressor::new` valida la configurazione (errore = batch annullato)
//! 2. `start_batch` crea la cartella di output e scansiona l'albero
//! 3. Le immagini con compressione disabilitata diventano subito `SkippedDisabled`
//! 4. Ogni altro file diventa un task che attende il proprio permesso
//! 5. L'aggregatore somma gli outcome; il batch finisce quando tutti i mittenti sono chiusi
//!
//! La sottomissione non blocca mai: i task vengono creati tutti subito e ciascuno
//! aspetta un permesso prima di iniziare.

use crate::{
    config::Config,
    error::CompressError,
    file_manager::{FileManager, MediaKind},
    image_processor::{ImageCodec, WebpCodec},
    optimizer::{aggregator::Aggregator, task::JobRunner},
    outcome::{Job, Outcome},
    progress::BatchProgress,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Batch orchestrator
pub struct MediaCompressor {
    config: Arc<Config>,
    codec: Arc<dyn ImageCodec>,
}

impl MediaCompressor {
    /// Validate `config` and build the orchestrator
    pub fn new(config: Config) -> Result<Self, CompressError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            codec: Arc::new(WebpCodec),
        })
    }

    /// Replace the image codec
    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan the source tree and submit every eligible file
    pub async fn start_batch(&self) -> Result<BatchHandle, CompressError> {
        let config = self.config.clone();

        tokio::fs::create_dir_all(&config.output_root).await?;
        self.log_configuration();

        let (source_root, output_root) = (config.source_root.clone(), config.output_root.clone());
        let scan = tokio::task::spawn_blocking(move || FileManager::find_media_files(&source_root, &output_root))
            .await
            .map_err(|e| CompressError::WorkerPanic(e.to_string()))??;

        info!(
            "Found {} media files ({} images, {} videos), ignoring {} other files",
            scan.media.len(),
            scan.count(MediaKind::Image),
            scan.count(MediaKind::Video),
            scan.ignored.len()
        );
        for path in &scan.ignored {
            debug!("Ignoring unsupported file: {}", path.display());
        }

        let progress = BatchProgress::new(scan.media.len(), scan.ignored.len());
        let (aggregator, snapshot_receiver, outcome_receiver) = Aggregator::new(progress);
        let (outcome_sender, worker_receiver) = mpsc::unbounded_channel();
        let aggregator_handle = tokio::spawn(aggregator.run(worker_receiver));

        let (stop_sender, _) = broadcast::channel(1);
        let semaphore = Arc::new(Semaphore::new(config.workers));
        let runner = JobRunner::new(config.clone(), self.codec.clone());

        for (path, kind) in scan.media {
            let job = Job::new(path, kind);

            if kind == MediaKind::Image && !config.compress_images {
                let size = FileManager::get_file_size(&job.source_path).await.unwrap_or(0);
                let _ = outcome_sender.send(Outcome::skipped_disabled(&job, size));
                continue;
            }

            let semaphore = semaphore.clone();
            let runner = runner.clone();
            let sender = outcome_sender.clone();
            let mut stop_receiver = stop_sender.subscribe();

            tokio::spawn(async move {
                // The semaphore is never closed, so this only waits
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = runner.run(job, &mut stop_receiver).await;
                let _ = sender.send(outcome);
            });
        }

        // Workers now hold the only senders; the aggregator stops after the last one reports
        drop(outcome_sender);

        Ok(BatchHandle {
            snapshot_receiver,
            outcome_receiver,
            aggregator: aggregator_handle,
            stop_sender,
        })
    }

    fn log_configuration(&self) {
        let config = &self.config;
        info!("Starting media compression in: {}", config.source_root.display());
        info!("Output directory: {}", config.output_root.display());
        info!("Workers: {}", config.workers);

        if config.compress_images {
            info!(
                "Images: WebP (lossless, lossy fallback), metadata {}",
                if config.remove_image_metadata { "removed" } else { "kept" }
            );
            if config.enable_resize {
                info!(
                    "Resize: -{}% when larger side exceeds {}px",
                    config.resize_percentage, config.resize_threshold
                );
            }
        } else {
            info!("Images: compression disabled");
        }

        info!(
            "Videos: MP4 via {}, audio {}, metadata {}",
            config.video_encoder.display(),
            if config.remove_video_audio { "removed" } else { "kept" },
            if config.remove_video_metadata { "removed" } else { "kept" }
        );
    }
}

/// Validate `config` and start a batch with the default codec
pub async fn start_batch(config: Config) -> Result<BatchHandle, CompressError> {
    MediaCompressor::new(config)?.start_batch().await
}

/// Observer side of a running batch
pub struct BatchHandle {
    snapshot_receiver: watch::Receiver<BatchProgress>,
    outcome_receiver: mpsc::UnboundedReceiver<Outcome>,
    aggregator: JoinHandle<BatchProgress>,
    stop_sender: broadcast::Sender<()>,
}

impl BatchHandle {
    /// Current snapshot; never blocks
    pub fn progress(&self) -> BatchProgress {
        self.snapshot_receiver.borrow().clone()
    }

    /// Wait for the next snapshot change; `None` once the batch is over and the last change was seen
    pub async fn changed(&mut self) -> Option<BatchProgress> {
        self.snapshot_receiver.changed().await.ok()?;
        Some(self.snapshot_receiver.borrow_and_update().clone())
    }

    /// Next folded outcome in completion order; `None` after the last one
    pub async fn next_outcome(&mut self) -> Option<Outcome> {
        self.outcome_receiver.recv().await
    }

    /// Ask jobs that have not started yet to report `Cancelled` instead of running
    pub fn cancel(&self) {
        info!("Cancellation requested");
        let _ = self.stop_sender.send(());
    }

    /// Wait until every outcome is folded and return the final totals
    pub async fn wait(self) -> Result<BatchProgress, CompressError> {
        self.aggregator
            .await
            .map_err(|e| CompressError::WorkerPanic(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processor::{DecodedImage, EncodeMode};
    use crate::outcome::OutcomeStatus;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Encodes every image to half its source size
    struct HalvingCodec;

    impl ImageCodec for HalvingCodec {
        fn decode(&self, path: &Path) -> Result<DecodedImage, CompressError> {
            let len = std::fs::metadata(path)?.len();
            Ok(DecodedImage {
                image: DynamicImage::new_rgb8(len as u32, 1),
                exif: None,
            })
        }

        fn encode(
            &self,
            image: &DynamicImage,
            _mode: EncodeMode,
            _exif: Option<&[u8]>,
        ) -> Result<Vec<u8>, CompressError> {
            Ok(vec![0u8; (image.width() / 2) as usize])
        }
    }

    fn root_of(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().canonicalize().unwrap()
    }

    fn write(path: &Path, len: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![9u8; len]).unwrap();
    }

    async fn collect(handle: &mut BatchHandle) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = handle.next_outcome().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    #[tokio::test]
    async fn test_empty_source_completes_immediately() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::new(root_of(&temp_dir));
        let output_root = config.output_root.clone();

        let handle = start_batch(config).await.unwrap();
        let progress = handle.wait().await.unwrap();

        assert_eq!(progress.total_jobs, 0);
        assert_eq!(progress.completed_jobs, 0);
        assert!(progress.is_complete());
        assert!(output_root.is_dir());
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_submission() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::new(root_of(&temp_dir));
        config.enable_resize = true;
        config.resize_percentage = 0.0;

        let result = start_batch(config).await;
        assert!(matches!(result, Err(CompressError::Validation(_))));
        assert!(!root_of(&temp_dir).join("compressed").exists());
    }

    #[tokio::test]
    async fn test_every_job_reports_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = root_of(&temp_dir);
        write(&root.join("a.png"), 100);
        write(&root.join("nested/b.JPG"), 200);
        write(&root.join("nested/deeper/c.tif"), 300);
        write(&root.join("clip.mov"), 50);
        write(&root.join("nested/trip.mp4"), 70);
        write(&root.join("notes.txt"), 10);
        // Output of a previous run
        write(&root.join("compressed/old.png"), 400);

        let mut config = Config::new(&root);
        config.workers = 2;
        config.video_encoder = PathBuf::from("/nonexistent/ffmpeg");

        let compressor = MediaCompressor::new(config).unwrap().with_codec(Arc::new(HalvingCodec));
        let mut handle = compressor.start_batch().await.unwrap();
        let outcomes = collect(&mut handle).await;
        let progress = handle.wait().await.unwrap();

        assert_eq!(progress.total_jobs, 5);
        assert_eq!(progress.completed_jobs, 5);
        assert_eq!(progress.ignored_files, 1);
        assert_eq!(outcomes.len(), 5);

        let sources: HashSet<PathBuf> = outcomes.iter().map(|o| o.source_path.clone()).collect();
        assert_eq!(sources.len(), 5);
        assert!(!sources.contains(&root.join("compressed/old.png")));

        // Missing encoder: same message for every video of the batch
        let videos: Vec<&Outcome> = outcomes.iter().filter(|o| o.kind == MediaKind::Video).collect();
        assert_eq!(videos.len(), 2);
        assert!(videos.iter().all(|v| v.status == OutcomeStatus::Failed));
        assert!(videos[0].message.contains("ffmpeg not found"));
        assert_eq!(videos[0].message, videos[1].message);

        for image in outcomes.iter().filter(|o| o.kind == MediaKind::Image) {
            assert_eq!(image.status, OutcomeStatus::Success, "{}", image.message);
            assert_eq!(image.compressed_size, image.original_size / 2);
        }
        assert!(root.join("compressed/nested/deeper/c.webp").is_file());

        // Failed video still counts toward the original total
        assert_eq!(progress.total_original_bytes, 720);
        assert_eq!(progress.total_compressed_bytes, 300);
        assert_eq!(progress.bytes_saved(), 420);
    }

    #[tokio::test]
    async fn test_disabled_images_skip_without_workers() {
        let temp_dir = TempDir::new().unwrap();
        let root = root_of(&temp_dir);
        write(&root.join("a.png"), 100);
        write(&root.join("b.bmp"), 200);

        let mut config = Config::new(&root);
        config.compress_images = false;

        let mut handle = start_batch(config).await.unwrap();
        let outcomes = collect(&mut handle).await;
        let progress = handle.wait().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::SkippedDisabled));
        assert_eq!(progress.skipped, 2);
        assert_eq!(progress.total_original_bytes, 300);
        assert_eq!(progress.total_compressed_bytes, 0);
    }

    #[tokio::test]
    async fn test_snapshots_increase_monotonically() {
        let temp_dir = TempDir::new().unwrap();
        let root = root_of(&temp_dir);
        for i in 0..6 {
            write(&root.join(format!("img_{}.png", i)), 64);
        }

        let mut config = Config::new(&root);
        config.workers = 3;
        let compressor = MediaCompressor::new(config).unwrap().with_codec(Arc::new(HalvingCodec));
        let mut handle = compressor.start_batch().await.unwrap();

        let mut seen = vec![handle.progress().completed_jobs];
        while let Some(snapshot) = handle.changed().await {
            seen.push(snapshot.completed_jobs);
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 6);
        assert_eq!(handle.progress().completed_jobs, 6);
    }

    #[tokio::test]
    async fn test_cancel_keeps_exactly_once() {
        let temp_dir = TempDir::new().unwrap();
        let root = root_of(&temp_dir);
        for i in 0..8 {
            write(&root.join(format!("img_{}.png", i)), 64);
        }

        let mut config = Config::new(&root);
        config.workers = 1;
        let compressor = MediaCompressor::new(config).unwrap().with_codec(Arc::new(HalvingCodec));
        let mut handle = compressor.start_batch().await.unwrap();
        handle.cancel();

        let outcomes = collect(&mut handle).await;
        let progress = handle.wait().await.unwrap();

        assert_eq!(outcomes.len(), 8);
        assert_eq!(progress.completed_jobs, 8);
        for outcome in &outcomes {
            assert!(
                outcome.status == OutcomeStatus::Success
                    || outcome.message.ends_with("Cancelled before start")
            );
        }
    }

    #[tokio::test]
    async fn test_rerun_produces_identical_output() {
        let temp_dir = TempDir::new().unwrap();
        let root = root_of(&temp_dir);
        let source = root.join("photos/gradient.bmp");
        std::fs::create_dir_all(source.parent().unwrap()).unwrap();
        RgbImage::from_fn(48, 48, |x, y| Rgb([(x * 5) as u8, (y * 5) as u8, 60]))
            .save(&source)
            .unwrap();

        let output = root.join("compressed/photos/gradient.webp");

        let handle = start_batch(Config::new(&root)).await.unwrap();
        handle.wait().await.unwrap();
        let first = std::fs::read(&output).unwrap();

        std::fs::remove_dir_all(root.join("compressed")).unwrap();
        let handle = start_batch(Config::new(&root)).await.unwrap();
        let progress = handle.wait().await.unwrap();

        assert_eq!(progress.total_jobs, 1);
        assert_eq!(std::fs::read(&output).unwrap(), first);
    }
}
