//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per consumatori programmatici.
//!
//! ## Responsabilità:
//! - Emette un evento JSON per riga su stdout
//! - Riusa `Outcome` e `BatchProgress` senza duplicarne i campi
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch, con configurazione e numero di job
//! - `file_complete`: Un outcome è stato aggregato
//! - `progress`: Snapshot dei totali dopo ogni outcome
//! - `complete`: Fine del batch con statistiche finali
//! - `error`: Errore che impedisce l'avvio del batch

use crate::config::Config;
use crate::file_manager::MediaKind;
use crate::outcome::{Outcome, OutcomeStatus};
use crate::progress::BatchProgress;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    /// Inizio del batch
    #[serde(rename = "start")]
    Start {
        source_dir: PathBuf,
        output_dir: PathBuf,
        total_files: usize,
        ignored_files: usize,
        config: JsonConfig,
    },

    /// Fine elaborazione di un file
    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        kind: MediaKind,
        status: OutcomeStatus,
        original_size: u64,
        compressed_size: u64,
        output_path: Option<PathBuf>,
        message: String,
    },

    /// Progresso corrente
    #[serde(rename = "progress")]
    Progress {
        current: usize,
        total: usize,
        percentage: f64,
        bytes_saved: u64,
        percent_saved: f64,
    },

    /// Batch completato
    #[serde(rename = "complete")]
    Complete {
        files_processed: usize,
        files_succeeded: usize,
        files_succeeded_lossy: usize,
        files_skipped: usize,
        errors: usize,
        total_original_size: u64,
        total_compressed_size: u64,
        total_bytes_saved: u64,
        percent_saved: f64,
        duration_seconds: f64,
    },

    /// Errore generale
    #[serde(rename = "error")]
    Error {
        message: String,
        details: Option<String>,
    },
}

/// Configurazione per output JSON
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonConfig {
    pub compress_images: bool,
    pub remove_image_metadata: bool,
    pub enable_resize: bool,
    pub resize_percentage: f64,
    pub resize_threshold: u32,
    pub remove_video_audio: bool,
    pub remove_video_metadata: bool,
    pub workers: usize,
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Crea un messaggio di inizio
    pub fn start(config: &Config, progress: &BatchProgress) -> Self {
        Self::Start {
            source_dir: config.source_root.clone(),
            output_dir: config.output_root.clone(),
            total_files: progress.total_jobs,
            ignored_files: progress.ignored_files,
            config: JsonConfig::from(config),
        }
    }

    /// Crea un messaggio di completamento file
    pub fn file_complete(outcome: &Outcome) -> Self {
        Self::FileComplete {
            path: outcome.source_path.clone(),
            kind: outcome.kind,
            status: outcome.status,
            original_size: outcome.original_size,
            compressed_size: outcome.compressed_size,
            output_path: outcome.output_path.clone(),
            message: outcome.message.clone(),
        }
    }

    /// Crea un messaggio di progresso
    pub fn progress(progress: &BatchProgress) -> Self {
        let percentage = if progress.total_jobs > 0 {
            (progress.completed_jobs as f64 / progress.total_jobs as f64) * 100.0
        } else {
            100.0
        };

        Self::Progress {
            current: progress.completed_jobs,
            total: progress.total_jobs,
            percentage,
            bytes_saved: progress.bytes_saved(),
            percent_saved: progress.percent_saved(),
        }
    }

    /// Crea un messaggio di completamento generale
    pub fn complete(progress: &BatchProgress) -> Self {
        Self::Complete {
            files_processed: progress.completed_jobs,
            files_succeeded: progress.succeeded,
            files_succeeded_lossy: progress.succeeded_lossy,
            files_skipped: progress.skipped,
            errors: progress.failed,
            total_original_size: progress.total_original_bytes,
            total_compressed_size: progress.total_compressed_bytes,
            total_bytes_saved: progress.bytes_saved(),
            percent_saved: progress.percent_saved(),
            duration_seconds: progress.elapsed().as_secs_f64(),
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

impl From<&Config> for JsonConfig {
    fn from(config: &Config) -> Self {
        Self {
            compress_images: config.compress_images,
            remove_image_metadata: config.remove_image_metadata,
            enable_resize: config.enable_resize,
            resize_percentage: config.resize_percentage,
            resize_threshold: config.resize_threshold,
            remove_video_audio: config.remove_video_audio,
            remove_video_metadata: config.remove_video_metadata,
            workers: config.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Job;

    #[test]
    fn test_file_complete_shape() {
        let job = Job::new(PathBuf::from("/media/a.png"), MediaKind::Image);
        let outcome = Outcome::skipped_size_increase(&job, 10, "Skipped a.png".to_string());
        let json = serde_json::to_value(JsonMessage::file_complete(&outcome)).unwrap();

        assert_eq!(json["type"], "file_complete");
        assert_eq!(json["kind"], "image");
        assert_eq!(json["status"], "skipped_size_increase");
        assert_eq!(json["original_size"], 10);
        assert!(json["output_path"].is_null());
    }

    #[test]
    fn test_progress_of_empty_batch() {
        let json = serde_json::to_value(JsonMessage::progress(&BatchProgress::new(0, 0))).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percentage"], 100.0);
        assert_eq!(json["percent_saved"], 0.0);
    }
}
