//! # Configuration Management Module
//!
//! Questo modulo gestisce la configurazione di un batch di compressione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione dei parametri prima che qualsiasi job venga sottomesso
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `source_root`: Cartella sorgente da scansionare
//! - `output_root`: Cartella di output (default: `<source_root>/compressed`)
//! - `compress_images`: Ricodifica immagini in WebP (default: true)
//! - `remove_image_metadata`: Rimuove EXIF dalle immagini (default: false)
//! - `enable_resize`: Ridimensiona immagini grandi (default: false)
//! - `resize_percentage`: Riduzione percentuale, in (0, 100) (default: 15.0)
//! - `resize_threshold`: Soglia in pixel sul lato maggiore (default: 2000)
//! - `remove_video_audio`: Rimuove la traccia audio dai video (default: false)
//! - `remove_video_metadata`: Rimuove i metadata del container (default: false)
//! - `workers`: Numero di worker paralleli (default: core disponibili)
//! - `video_encoder`: Programma usato per la transcodifica (default: ffmpeg)
//!
//! La configurazione è immutabile per tutta la durata del batch e condivisa tra i worker
//! tramite `Arc`. Non esiste un formato file: arriva in memoria per ogni batch.
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     enable_resize: true,
//!     resize_percentage: 20.0,
//!     ..Config::new("/photos")
//! };
//! config.validate()?;
//! ```

use crate::error::CompressError;
use crate::platform::PlatformCommands;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the output folder created under the source root
pub const OUTPUT_DIR_NAME: &str = "compressed";

pub const DEFAULT_RESIZE_PERCENTAGE: f64 = 15.0;
pub const DEFAULT_RESIZE_THRESHOLD: u32 = 2000;

/// Configuration for one compression batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Folder scanned for media
    pub source_root: PathBuf,
    /// Folder receiving compressed files, mirroring the source layout
    pub output_root: PathBuf,
    /// Re-encode images to WebP
    pub compress_images: bool,
    /// Drop EXIF from WebP output
    pub remove_image_metadata: bool,
    /// Shrink images whose larger side exceeds `resize_threshold`
    pub enable_resize: bool,
    /// Percentage removed from each dimension when resizing
    pub resize_percentage: f64,
    /// Larger-side pixel count above which an image is resized
    pub resize_threshold: u32,
    /// Drop the audio stream from videos
    pub remove_video_audio: bool,
    /// Strip container metadata from videos
    pub remove_video_metadata: bool,
    /// Number of parallel workers
    pub workers: usize,
    /// External encoder program for videos
    pub video_encoder: PathBuf,
}

impl Config {
    /// Default configuration for a source folder
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        let output_root = source_root.join(OUTPUT_DIR_NAME);

        Self {
            source_root,
            output_root,
            compress_images: true,
            remove_image_metadata: false,
            enable_resize: false,
            resize_percentage: DEFAULT_RESIZE_PERCENTAGE,
            resize_threshold: DEFAULT_RESIZE_THRESHOLD,
            remove_video_audio: false,
            remove_video_metadata: false,
            workers: default_workers(),
            video_encoder: PlatformCommands::instance().ffmpeg_program(),
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), CompressError> {
        if !self.source_root.exists() {
            return Err(CompressError::Validation(format!(
                "Source folder does not exist: {}",
                self.source_root.display()
            )));
        }

        if !self.source_root.is_dir() {
            return Err(CompressError::Validation(format!(
                "Source path is not a directory: {}",
                self.source_root.display()
            )));
        }

        if self.workers == 0 {
            return Err(CompressError::Validation(
                "Number of workers must be greater than 0".to_string(),
            ));
        }

        // Resize values are inert while resizing is off
        if self.enable_resize {
            if !is_valid_resize_percentage(self.resize_percentage) {
                return Err(CompressError::Validation(
                    "Resize percentage must be between 0 and 100.".to_string(),
                ));
            }

            if self.resize_threshold == 0 {
                return Err(CompressError::Validation(
                    "Resize threshold must be a positive integer.".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Percentage strictly inside (0, 100)
pub fn is_valid_resize_percentage(percentage: f64) -> bool {
    percentage > 0.0 && percentage < 100.0
}

/// Number of available processor cores, at least 1
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
