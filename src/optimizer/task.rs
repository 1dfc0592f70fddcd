//! # Job Runner Module
//!
//! Worker per l'elaborazione di un singolo job.
//! Controlla la cancellazione prima di iniziare, poi delega al processore immagini
//! (sul thread pool bloccante) o video (processo figlio asincrono).
//! Un worker che va in panic produce comunque un `Outcome` fallito.

use crate::{
    config::Config,
    error::CompressError,
    file_manager::{FileManager, MediaKind},
    image_processor::{ImageCodec, ImageProcessor},
    outcome::{Job, Outcome},
    video_processor::VideoProcessor,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Executes one job to completion
#[derive(Clone)]
pub struct JobRunner {
    image_processor: Arc<ImageProcessor>,
    video_processor: Arc<VideoProcessor>,
}

impl JobRunner {
    pub fn new(config: Arc<Config>, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            image_processor: Arc::new(ImageProcessor::with_codec(config.clone(), codec)),
            video_processor: Arc::new(VideoProcessor::new(config)),
        }
    }

    /// Run `job`, always producing exactly one outcome
    pub async fn run(&self, job: Job, stop_receiver: &mut broadcast::Receiver<()>) -> Outcome {
        if should_stop(stop_receiver) {
            debug!("Stop signal received, not starting {}", job.source_path.display());
            let size = FileManager::get_file_size(&job.source_path).await.unwrap_or(0);
            return Outcome::failed(&job, size, &CompressError::Cancelled);
        }

        let result = match job.kind {
            MediaKind::Image => {
                let processor = self.image_processor.clone();
                let job = job.clone();
                tokio::task::spawn_blocking(move || processor.compress(&job)).await
            }
            MediaKind::Video => {
                let processor = self.video_processor.clone();
                let job = job.clone();
                tokio::spawn(async move { processor.compress(&job).await }).await
            }
            MediaKind::Unsupported => {
                let error = CompressError::UnsupportedFormat(job.source_path.display().to_string());
                return Outcome::failed(&job, 0, &error);
            }
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Worker for {} crashed: {}", job.source_path.display(), e);
                let size = FileManager::get_file_size(&job.source_path).await.unwrap_or(0);
                Outcome::failed(&job, size, &CompressError::WorkerPanic(e.to_string()))
            }
        }
    }
}

/// Checks if a stop signal has been received
fn should_stop(receiver: &mut broadcast::Receiver<()>) -> bool {
    match receiver.try_recv() {
        Ok(_) => true,
        // Signal was sent but we missed it
        Err(broadcast::error::TryRecvError::Lagged(_)) => true,
        Err(broadcast::error::TryRecvError::Empty) => false,
        // Handle dropped, nobody can cancel anymore
        Err(broadcast::error::TryRecvError::Closed) => false,
    }
}
