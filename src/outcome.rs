//! # Job and Outcome Types
//!
//! Un `Job` descrive un file da elaborare; un `Outcome` è il risultato immutabile
//! prodotto esattamente una volta per ogni job e consumato esattamente una volta
//! dall'aggregatore.

use crate::error::CompressError;
use crate::file_manager::{FileManager, MediaKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unit of work submitted to the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub source_path: PathBuf,
    pub kind: MediaKind,
}

impl Job {
    pub fn new(source_path: PathBuf, kind: MediaKind) -> Self {
        Self { source_path, kind }
    }
}

/// Final status of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Lossless re-encode (or video transcode) kept
    Success,
    /// Lossless rejected, lossy fallback kept
    SuccessLossy,
    /// Image compression disabled for this batch
    SkippedDisabled,
    /// Neither encode beat the original; original left untouched
    SkippedSizeIncrease,
    Failed,
}

impl OutcomeStatus {
    /// Whether an output file was produced
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessLossy)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedDisabled | Self::SkippedSizeIncrease)
    }

    /// Log prefix
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "[SUCCESS]",
            Self::SuccessLossy => "[SUCCESS - LOSSY]",
            Self::SkippedDisabled | Self::SkippedSizeIncrease => "[SKIPPED]",
            Self::Failed => "[FAILED]",
        }
    }
}

/// Result of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub source_path: PathBuf,
    pub kind: MediaKind,
    pub original_size: u64,
    /// Size of the kept output; 0 unless the status is a success
    pub compressed_size: u64,
    pub status: OutcomeStatus,
    pub message: String,
    /// Final output location, present only on success
    pub output_path: Option<PathBuf>,
}

impl Outcome {
    pub fn success(
        job: &Job,
        status: OutcomeStatus,
        original_size: u64,
        compressed_size: u64,
        output_path: PathBuf,
        message: String,
    ) -> Self {
        debug_assert!(status.is_success());
        Self {
            source_path: job.source_path.clone(),
            kind: job.kind,
            original_size,
            compressed_size,
            status,
            message,
            output_path: Some(output_path),
        }
    }

    pub fn skipped_disabled(job: &Job, original_size: u64) -> Self {
        Self {
            source_path: job.source_path.clone(),
            kind: job.kind,
            original_size,
            compressed_size: 0,
            status: OutcomeStatus::SkippedDisabled,
            message: format!(
                "Skipped {} (Image compression disabled).",
                FileManager::display_name(&job.source_path)
            ),
            output_path: None,
        }
    }

    pub fn skipped_size_increase(job: &Job, original_size: u64, message: String) -> Self {
        Self {
            source_path: job.source_path.clone(),
            kind: job.kind,
            original_size,
            compressed_size: 0,
            status: OutcomeStatus::SkippedSizeIncrease,
            message,
            output_path: None,
        }
    }

    /// Failed outcome carrying the error text
    pub fn failed(job: &Job, original_size: u64, error: &CompressError) -> Self {
        Self {
            source_path: job.source_path.clone(),
            kind: job.kind,
            original_size,
            compressed_size: 0,
            status: OutcomeStatus::Failed,
            message: Self::failure_message(job, error),
            output_path: None,
        }
    }

    fn failure_message(job: &Job, error: &CompressError) -> String {
        let name = FileManager::display_name(&job.source_path);
        match error {
            // Identical for every job of the batch
            CompressError::EncoderMissing { .. } => error.to_string(),
            CompressError::Decode { .. } => error.to_string(),
            CompressError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                format!("Error: File not found {}", name)
            }
            _ => format!("Error processing {} {}: {}", job.kind.as_str(), name, error),
        }
    }

    /// Bytes saved by this file alone
    pub fn bytes_saved(&self) -> u64 {
        if self.status.is_success() {
            self.original_size.saturating_sub(self.compressed_size)
        } else {
            0
        }
    }
}
