//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di output.
//! Il path relativo alla sorgente viene replicato sotto la cartella di output,
//! cambiando solo l'estensione.

use crate::error::CompressError;
use crate::file_manager::FileManager;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Utility per calcolare i path di output in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// Output path for `input_path`: its path relative to `source_root`, rooted at
    /// `output_root`, with the extension replaced by `extension`.
    pub fn get_output_path(
        input_path: &Path,
        source_root: &Path,
        output_root: &Path,
        extension: &str,
    ) -> Result<PathBuf, CompressError> {
        let relative_path = Self::relative_to_source(input_path, source_root)?;
        let result = output_root.join(relative_path).with_extension(extension);
        debug!("Resolved output path: {} -> {}", input_path.display(), result.display());
        Ok(result)
    }

    /// Path of `input_path` relative to `source_root`
    fn relative_to_source(input_path: &Path, source_root: &Path) -> Result<PathBuf, CompressError> {
        if let Ok(rel) = input_path.strip_prefix(source_root) {
            return Ok(rel.to_path_buf());
        }

        // Canonicalize to get past symlinks or relative spellings
        let canonical_input = FileManager::absolute(input_path)?;
        let canonical_base = FileManager::absolute(source_root)?;

        canonical_input
            .strip_prefix(&canonical_base)
            .map(Path::to_path_buf)
            .map_err(|_| {
                CompressError::Validation(format!(
                    "{} is not inside source folder {}",
                    input_path.display(),
                    source_root.display()
                ))
            })
    }

    /// Crea le directory parent se necessario
    pub fn ensure_parent_dirs(path: &Path) -> Result<(), CompressError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
