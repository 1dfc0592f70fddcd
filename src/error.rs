//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi, riusati come messaggi degli `Outcome`
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Decode`: Immagine corrotta o illeggibile (fatale solo per quel file)
//! - `Encode`: Fallimento del codec durante il tentativo lossless o lossy
//! - `Move`: Spostamento finale del file temporaneo fallito
//! - `EncoderMissing`: ffmpeg non presente nel sistema
//! - `EncoderFailure`: ffmpeg terminato con errore o output vuoto
//! - `Validation`: Configurazione non valida, blocca l'intero batch
//! - `WorkerPanic`: Il task del worker è terminato in modo anomalo
//!
//! ## Politica:
//! Solo `Validation` (e gli errori I/O prima del walk) interrompono il batch.
//! Tutti gli altri vengono convertiti in un `Outcome` fallito al confine del job.

use std::path::PathBuf;

/// Custom error types for media compression
#[derive(thiserror::Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot identify image file {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("{mode} save failed - {reason}")]
    Encode { mode: &'static str, reason: String },

    #[error("Error renaming/moving temporary file to {}: {source}", .path.display())]
    Move {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Error: {program} not found. Please ensure it's installed and in your system's PATH.")]
    EncoderMissing { program: String },

    #[error("{program} failed with code {}.{}", .code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()), diagnostics_suffix(.diagnostics))]
    EncoderFailure {
        program: String,
        code: Option<i32>,
        diagnostics: String,
    },

    #[error("Output file not created or is empty.{}", diagnostics_suffix(.diagnostics))]
    EmptyOutput { diagnostics: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Validation(String),

    #[error("Cancelled before start")]
    Cancelled,

    #[error("Worker crashed: {0}")]
    WorkerPanic(String),
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    let trimmed = diagnostics.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nffmpeg output:\n{}", trimmed)
    }
}
