//! # Progress Tracking and Statistics Module
//!
//! Questo modulo gestisce lo stato di avanzamento di un batch e la sua visualizzazione.
//!
//! ## Responsabilità:
//! - `BatchProgress`: totali cumulativi del batch, modificati solo dall'aggregatore
//! - Calcolo on demand di byte risparmiati e percentuale (mai memorizzati)
//! - `ProgressManager`: progress bar `indicatif` per la CLI
//!
//! ## Regole di accumulo:
//! - `Success` / `SuccessLossy`: dimensione originale e compressa
//! - `SkippedDisabled` / `SkippedSizeIncrease` / `Failed`: solo dimensione originale
//!
//! La percentuale risparmiata è calcolata sui totali di tutti i file elaborati,
//! inclusi skip e fallimenti.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================================] 150/150 (100%) [SUCCESS] photo.jpg
//! ```

use crate::file_manager::FileManager;
use crate::outcome::{Outcome, OutcomeStatus};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Running totals of one batch
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub total_original_bytes: u64,
    /// Sum over successful outcomes only
    pub total_compressed_bytes: u64,
    pub succeeded: usize,
    pub succeeded_lossy: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Unsupported files seen during the walk; never part of `total_jobs`
    pub ignored_files: usize,
    pub started_at: Instant,
    /// Set once the last outcome is folded
    pub elapsed: Option<Duration>,
}

impl BatchProgress {
    pub fn new(total_jobs: usize, ignored_files: usize) -> Self {
        Self {
            total_jobs,
            completed_jobs: 0,
            total_original_bytes: 0,
            total_compressed_bytes: 0,
            succeeded: 0,
            succeeded_lossy: 0,
            skipped: 0,
            failed: 0,
            ignored_files,
            started_at: Instant::now(),
            elapsed: None,
        }
    }

    /// Fold one outcome into the totals
    pub fn fold(&mut self, outcome: &Outcome) {
        debug_assert!(self.completed_jobs < self.total_jobs, "outcome folded after completion");

        self.completed_jobs += 1;
        self.total_original_bytes += outcome.original_size;

        match outcome.status {
            OutcomeStatus::Success => {
                self.succeeded += 1;
                self.total_compressed_bytes += outcome.compressed_size;
            }
            OutcomeStatus::SuccessLossy => {
                self.succeeded_lossy += 1;
                self.total_compressed_bytes += outcome.compressed_size;
            }
            OutcomeStatus::SkippedDisabled | OutcomeStatus::SkippedSizeIncrease => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }

        if self.is_complete() {
            self.finish();
        }
    }

    /// Freeze the elapsed time
    pub fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started_at.elapsed());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_jobs >= self.total_jobs
    }

    /// `max(0, original - compressed)`
    pub fn bytes_saved(&self) -> u64 {
        self.total_original_bytes.saturating_sub(self.total_compressed_bytes)
    }

    /// Saved bytes as a percentage of the original total, 0 when nothing was scanned
    pub fn percent_saved(&self) -> f64 {
        if self.total_original_bytes == 0 {
            0.0
        } else {
            self.bytes_saved() as f64 / self.total_original_bytes as f64 * 100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started_at.elapsed())
    }

    /// Multi-line statistics block
    pub fn format_summary(&self) -> String {
        format!(
            "Files Processed: {} / {}\n\
             Total Original Size (from {} files): {}\n\
             Total Compressed Size (from successful): {}\n\
             Data Saved: {} ({:.1}%)\n\
             Succeeded: {} | Lossy: {} | Skipped: {} | Failed: {} | Ignored: {}\n\
             Elapsed: {:.1}s",
            self.completed_jobs,
            self.total_jobs,
            self.completed_jobs,
            FileManager::format_size(self.total_original_bytes),
            FileManager::format_size(self.total_compressed_bytes),
            FileManager::format_size(self.bytes_saved()),
            self.percent_saved(),
            self.succeeded,
            self.succeeded_lossy,
            self.skipped,
            self.failed,
            self.ignored_files,
            self.elapsed().as_secs_f64()
        )
    }
}

/// Manages the terminal progress bar
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Move the bar to `completed` and show a message
    pub fn update(&self, completed: usize, message: &str) {
        self.bar.set_position(completed as u64);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();

        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));

        spinner
    }
}
