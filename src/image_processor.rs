//! # Image Processing Module
//!
//! Questo modulo decide, per ogni immagine, se tenere una ricodifica WebP lossless,
//! una ricodifica lossy, oppure nessun output.
//!
//! ## Pipeline di compressione
//!
//! 1. **Compressione disabilitata**: `SkippedDisabled`, viene registrata solo la dimensione originale
//! 2. **Decodifica**: file mancante o corrotto → `Failed`, nessun output parziale su disco
//! 3. **Resize** (opzionale): vedi [`crate::resize`]; un errore non è fatale
//! 4. **Normalizzazione colore**: palette, grayscale, CMYK e RGB vengono portati a RGBA
//! 5. **Tentativo lossless**: WebP lossless a massima qualità
//! 6. **Fallback**:
//!    - lossless < originale → tenuto, `Success`
//!    - altrimenti lossy (Q=85) < originale → tenuto, `SuccessLossy`
//!    - altrimenti nessun output, originale intatto, `SkippedSizeIncrease`
//! 7. **Spostamento atomico**: il candidato accettato viene rinominato nel path finale
//!
//! ## Area temporanea
//!
//! I candidati vengono scritti come file temporanei nascosti dentro la cartella di output
//! (stesso filesystem, quindi il rename finale è atomico). Un candidato scartato viene
//! eliminato al drop del `NamedTempFile`, su qualsiasi percorso d'uscita.
//!
//! ## Codec
//!
//! Decodifica, resize e conversione colore passano dal crate `image`; la codifica WebP
//! da `libwebp` tramite il crate `webp`. Il trait [`ImageCodec`] isola queste operazioni
//! così che la logica di fallback resti indipendente dal codec.

use crate::config::Config;
use crate::error::CompressError;
use crate::file_manager::FileManager;
use crate::metadata;
use crate::optimizer::path_resolver::PathResolver;
use crate::outcome::{Job, Outcome, OutcomeStatus};
use crate::resize::{self, ResizePlan};
use image::DynamicImage;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Extension of every image output
pub const TARGET_EXTENSION: &str = "webp";

/// Quality used when the lossless encode is not smaller than the original
pub const WEBP_LOSSY_FALLBACK_QUALITY: u8 = 85;

/// Quality passed to the encoder in lossless mode (maximum effort)
const WEBP_LOSSLESS_QUALITY: f32 = 100.0;

/// A decoded image plus the EXIF block found in its source bytes
pub struct DecodedImage {
    pub image: DynamicImage,
    pub exif: Option<Vec<u8>>,
}

/// Encoding attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Lossless,
    Lossy { quality: u8 },
}

impl EncodeMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Lossless => "Lossless",
            Self::Lossy { .. } => "Lossy",
        }
    }

    fn temp_suffix(&self) -> &'static str {
        match self {
            Self::Lossless => "lossless",
            Self::Lossy { .. } => "lossy",
        }
    }
}

/// Image codec operations requested by the decision engine
pub trait ImageCodec: Send + Sync {
    /// Open and decode `path`
    fn decode(&self, path: &Path) -> Result<DecodedImage, CompressError>;

    /// Encode to WebP, embedding `exif` when given
    fn encode(
        &self,
        image: &DynamicImage,
        mode: EncodeMode,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, CompressError>;

    /// High-quality resample to exactly `width` x `height`
    fn resize(&self, image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, CompressError> {
        resize::apply(image, width, height)
    }

    /// Bring any pixel layout to 8-bit RGBA
    fn normalize(&self, image: DynamicImage) -> DynamicImage {
        normalize_color(image)
    }
}

/// Convert every non-RGBA8 layout (palette, L, LA, RGB, 16-bit, float) to RGBA8.
///
/// CMYK JPEGs are already expanded to RGB by the decoder.
pub fn normalize_color(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) => image,
        other => DynamicImage::ImageRgba8(other.to_rgba8()),
    }
}

/// Codec backed by the `image` crate for decoding and libwebp for encoding
#[derive(Debug, Default, Clone, Copy)]
pub struct WebpCodec;

impl ImageCodec for WebpCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, CompressError> {
        let data = std::fs::read(path)?;

        let image = image::io::Reader::new(Cursor::new(&data))
            .with_guessed_format()?
            .decode()
            .map_err(|e| CompressError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(DecodedImage {
            image,
            exif: metadata::extract_exif(&data),
        })
    }

    fn encode(
        &self,
        image: &DynamicImage,
        mode: EncodeMode,
        exif: Option<&[u8]>,
    ) -> Result<Vec<u8>, CompressError> {
        let encode_error = |reason: String| CompressError::Encode {
            mode: mode.label(),
            reason,
        };

        let encoder = webp::Encoder::from_image(image).map_err(|e| encode_error(e.to_string()))?;

        let memory = match mode {
            EncodeMode::Lossless => encoder.encode_simple(true, WEBP_LOSSLESS_QUALITY),
            EncodeMode::Lossy { quality } => encoder.encode_simple(false, quality as f32),
        }
        .map_err(|e| encode_error(format!("{:?}", e)))?;

        match exif {
            Some(exif) => metadata::embed_exif(&memory, exif),
            None => Ok(memory.to_vec()),
        }
    }
}

/// An encoded candidate staged in the output folder
struct Candidate {
    file: NamedTempFile,
    size: u64,
}

/// Handles image compression decisions for single files
pub struct ImageProcessor {
    config: Arc<Config>,
    codec: Arc<dyn ImageCodec>,
}

impl ImageProcessor {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_codec(config, Arc::new(WebpCodec))
    }

    pub fn with_codec(config: Arc<Config>, codec: Arc<dyn ImageCodec>) -> Self {
        Self { config, codec }
    }

    /// Compress one image. Never fails: every error becomes a `Failed` outcome.
    pub fn compress(&self, job: &Job) -> Outcome {
        if !self.config.compress_images {
            let original_size = std::fs::metadata(&job.source_path).map(|m| m.len()).unwrap_or(0);
            return Outcome::skipped_disabled(job, original_size);
        }

        let original_size = match std::fs::metadata(&job.source_path) {
            Ok(metadata) => metadata.len(),
            Err(e) => return Outcome::failed(job, 0, &e.into()),
        };

        match self.compress_file(job, original_size) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Image compression failed for {}: {}", job.source_path.display(), e);
                Outcome::failed(job, original_size, &e)
            }
        }
    }

    fn compress_file(&self, job: &Job, original_size: u64) -> Result<Outcome, CompressError> {
        let name = FileManager::display_name(&job.source_path);
        let output_path = PathResolver::get_output_path(
            &job.source_path,
            &self.config.source_root,
            &self.config.output_root,
            TARGET_EXTENSION,
        )?;

        // The decoded buffer is dropped on every return path below
        let DecodedImage { image, exif } = self.codec.decode(&job.source_path)?;
        let (image, resized_from) = self.resize_step(image, &name);
        let image = self.codec.normalize(image);
        let exif = if self.config.remove_image_metadata { None } else { exif };

        std::fs::create_dir_all(&self.config.output_root)?;
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let resized_note = resized_from
            .map(|(w, h)| format!(" (resized from {}x{})", w, h))
            .unwrap_or_default();

        debug!("Trying lossless WEBP for {}", name);
        let lossless_size = match self.encode_candidate(&image, EncodeMode::Lossless, exif.as_deref(), &stem) {
            Ok(candidate) if candidate.size < original_size => {
                let compressed_size = candidate.size;
                let message = format!(
                    "Compressed {} to lossless WEBP{} ({} -> {})",
                    name,
                    resized_note,
                    FileManager::format_size(original_size),
                    FileManager::format_size(compressed_size)
                );
                return self.accept(job, candidate, &output_path, OutcomeStatus::Success, original_size, message);
            }
            Ok(candidate) => Some(candidate.size),
            Err(e) => {
                warn!("Lossless save failed for {}: {}", name, e);
                None
            }
        };

        debug!(
            "Lossless size {} >= original {} for {}. Trying lossy WEBP (Q={})",
            FileManager::format_optional_size(lossless_size),
            FileManager::format_size(original_size),
            name,
            WEBP_LOSSY_FALLBACK_QUALITY
        );

        let lossy_mode = EncodeMode::Lossy {
            quality: WEBP_LOSSY_FALLBACK_QUALITY,
        };
        let candidate = self.encode_candidate(&image, lossy_mode, exif.as_deref(), &stem)?;

        if candidate.size < original_size {
            let compressed_size = candidate.size;
            let message = format!(
                "Compressed {} to lossy WEBP (Q={}){} ({} -> {})",
                name,
                WEBP_LOSSY_FALLBACK_QUALITY,
                resized_note,
                FileManager::format_size(original_size),
                FileManager::format_size(compressed_size)
            );
            return self.accept(job, candidate, &output_path, OutcomeStatus::SuccessLossy, original_size, message);
        }

        let message = format!(
            "Skipped {} (Both lossless and lossy WEBP ({}) resulted in larger file than original ({})).",
            name,
            FileManager::format_size(candidate.size),
            FileManager::format_size(original_size)
        );
        Ok(Outcome::skipped_size_increase(job, original_size, message))
    }

    /// Apply the resize plan; failures leave the image untouched
    fn resize_step(&self, image: DynamicImage, name: &str) -> (DynamicImage, Option<(u32, u32)>) {
        match ResizePlan::for_dimensions(image.width(), image.height(), &self.config) {
            ResizePlan::Keep => (image, None),
            ResizePlan::InvalidPercentage(percentage) => {
                warn!("Invalid resize percentage {} for {}, skipping resize", percentage, name);
                (image, None)
            }
            ResizePlan::Shrink { from, to } => match self.codec.resize(&image, to.0, to.1) {
                Ok(resized) => {
                    debug!("Resized {} from {}x{} to {}x{}", name, from.0, from.1, to.0, to.1);
                    (resized, Some(from))
                }
                Err(e) => {
                    warn!("Error during resize of {}: {}, skipping resize", name, e);
                    (image, None)
                }
            },
        }
    }

    /// Encode and stage the result as a hidden temp file in the output folder
    fn encode_candidate(
        &self,
        image: &DynamicImage,
        mode: EncodeMode,
        exif: Option<&[u8]>,
        stem: &str,
    ) -> Result<Candidate, CompressError> {
        let bytes = self.codec.encode(image, mode, exif)?;

        let mut file = tempfile::Builder::new()
            .prefix(&format!(".{}_{}", stem, mode.temp_suffix()))
            .suffix(&format!(".{}", TARGET_EXTENSION))
            .tempfile_in(&self.config.output_root)?;
        file.write_all(&bytes)?;
        file.flush()?;

        Ok(Candidate {
            file,
            size: bytes.len() as u64,
        })
    }

    /// Move the accepted candidate to its final path
    fn accept(
        &self,
        job: &Job,
        candidate: Candidate,
        output_path: &Path,
        status: OutcomeStatus,
        original_size: u64,
        message: String,
    ) -> Result<Outcome, CompressError> {
        let move_error = |source: std::io::Error| CompressError::Move {
            path: output_path.to_path_buf(),
            source,
        };

        PathResolver::ensure_parent_dirs(output_path).map_err(|e| match e {
            CompressError::Io(io) => move_error(io),
            other => other,
        })?;

        // On failure the PersistError owns the temp file and removes it when dropped
        candidate
            .file
            .persist(output_path)
            .map_err(|e| move_error(e.error))?;

        Ok(Outcome::success(
            job,
            status,
            original_size,
            candidate.size,
            output_path.to_path_buf(),
            message,
        ))
    }
}
