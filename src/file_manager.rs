//! # File Management Module
//!
//! Questo modulo gestisce la classificazione dei file e la discovery dei media.
//!
//! ## Responsabilità:
//! - Classificazione per estensione (immagine, video, non supportato)
//! - Discovery ricorsiva dei file nella cartella sorgente, escludendo la cartella di output
//! - Utilità per dimensioni e percentuali
//! - Formattazione human-readable delle dimensioni
//!
//! ## Formati supportati:
//! - **Immagini**: JPG, JPEG, PNG, BMP, TIFF, TIF
//! - **Video**: MP4, MOV, AVI, MKV, WebM
//!
//! ## Esclusione output:
//! La cartella di output vive dentro la sorgente (`<sorgente>/compressed`), quindi il walk
//! pota l'intero sottoalbero di output per non rielaborare i risultati di un run precedente.
//!
//! ## Esempio:
//! ```rust,ignore
//! let scan = FileManager::find_media_files(&source, &output)?;
//! for (path, kind) in scan.media {
//!     // submit job
//! }
//! ```

use crate::error::CompressError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions re-encoded to WebP.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Extensions transcoded with the external video encoder.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Classification of a file by its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Result of walking the source tree
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Supported media files in walk order
    pub media: Vec<(PathBuf, MediaKind)>,
    /// Files seen during the walk with an unsupported extension
    pub ignored: Vec<PathBuf>,
}

impl ScanResult {
    pub fn count(&self, kind: MediaKind) -> usize {
        self.media.iter().filter(|(_, k)| *k == kind).count()
    }
}

/// Manages file classification and discovery
pub struct FileManager;

impl FileManager {
    /// Classify a path by case-insensitive extension match. No I/O.
    pub fn classify(path: &Path) -> MediaKind {
        let Some(ext) = path.extension() else {
            return MediaKind::Unsupported;
        };
        let ext_lower = ext.to_string_lossy().to_lowercase();

        if IMAGE_EXTENSIONS.contains(&ext_lower.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&ext_lower.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Unsupported
        }
    }

    /// Get the size of a file in bytes
    pub async fn get_file_size(path: &Path) -> Result<u64, CompressError> {
        Ok(tokio::fs::metadata(path).await?.len())
    }

    /// Walk `source_root` once and classify every regular file, skipping anything under
    /// `output_root`.
    ///
    /// Both roots are made absolute before comparison, so the exclusion holds no matter how
    /// the caller spelled them. Entries are sorted by file name to keep the walk order stable.
    pub fn find_media_files(source_root: &Path, output_root: &Path) -> Result<ScanResult, CompressError> {
        let source_abs = Self::absolute(source_root)?;
        let output_abs = Self::absolute(output_root)?;
        debug!("Scanning {} (excluding {})", source_abs.display(), output_abs.display());

        let mut scan = ScanResult::default();

        let walker = WalkDir::new(&source_abs)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !entry.path().starts_with(&output_abs));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry during scan: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            match Self::classify(&path) {
                MediaKind::Unsupported => scan.ignored.push(path),
                kind => scan.media.push((path, kind)),
            }
        }

        Ok(scan)
    }

    /// Canonicalize when the path exists, otherwise anchor it at the current directory.
    pub fn absolute(path: &Path) -> Result<PathBuf, CompressError> {
        if let Ok(canonical) = path.canonicalize() {
            return Ok(canonical);
        }
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(std::env::current_dir()?.join(path))
        }
    }

    /// File name for log messages
    pub fn display_name(path: &Path) -> String {
        path.file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }

    /// Same as `format_size` but renders a missing size as "N/A"
    pub fn format_optional_size(size: Option<u64>) -> String {
        size.map(Self::format_size).unwrap_or_else(|| "N/A".to_string())
    }

    /// Calculate percentage reduction
    pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
        if original_size == 0 {
            0.0
        } else {
            ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
        }
    }
}
