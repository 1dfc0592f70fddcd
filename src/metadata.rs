//! # Image Metadata Module
//!
//! EXIF carry-over for WebP output. The WebP encoder writes a bare `VP8 `/`VP8L` container
//! without metadata; when metadata is kept, the EXIF block of the source is read with
//! `img_parts` and stored as an `EXIF` chunk, which turns the output into an extended
//! (`VP8X`) container.
//!
//! Sources handled: JPEG (APP1 `Exif`), PNG (`eXIf`), WebP (`EXIF`). Anything else yields
//! no EXIF and the output is written as encoded.

use crate::error::CompressError;
use img_parts::webp::WebP;
use img_parts::{Bytes, DynImage, ImageEXIF};

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Extract the raw EXIF (TIFF-structured) block from an encoded image
pub fn extract_exif(data: &[u8]) -> Option<Vec<u8>> {
    let exif = match DynImage::from_bytes(Bytes::copy_from_slice(data)).ok()?? {
        DynImage::Jpeg(jpeg) => jpeg.exif(),
        DynImage::Png(png) => png.exif(),
        DynImage::WebP(webp) => webp.exif(),
    }?;

    // Some writers keep the JPEG `Exif\0\0` prefix inside PNG/WebP chunks
    let exif = exif.strip_prefix(EXIF_HEADER).unwrap_or(&exif[..]);
    (!exif.is_empty()).then(|| exif.to_vec())
}

/// Return a copy of `webp` carrying `exif`; existing `EXIF` chunks are replaced
pub fn embed_exif(webp: &[u8], exif: &[u8]) -> Result<Vec<u8>, CompressError> {
    let mut container = WebP::from_bytes(Bytes::copy_from_slice(webp))
        .map_err(|e| CompressError::Metadata(format!("invalid WebP container: {}", e)))?;

    container.set_exif(Some(Bytes::copy_from_slice(exif)));
    Ok(container.encoder().bytes().to_vec())
}
