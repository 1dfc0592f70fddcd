//! # Image Resize Module
//!
//! Questo modulo decide se e come ridimensionare un'immagine prima della codifica WebP.
//!
//! ## Regola
//! - Solo se `enable_resize` è attivo e il lato maggiore supera `resize_threshold`
//! - Entrambe le dimensioni vengono scalate di `(1 - percentuale / 100)`
//! - Ogni dimensione viene troncata all'intero inferiore, minimo 1
//! - Filtro Lanczos3 per la massima qualità
//!
//! Un fallimento del resize non è fatale: il chiamante registra una nota e prosegue
//! con l'immagine originale.
//!
//! ## Esempio
//! ```text
//! threshold 2000, percentuale 15
//! 3000x2000 -> 2550x1700
//! 1000x800  -> invariata
//! ```

use crate::config::{is_valid_resize_percentage, Config};
use crate::error::CompressError;
use image::imageops::FilterType;
use image::DynamicImage;

/// Filter used for every resize
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Outcome of resize planning for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizePlan {
    /// Resizing disabled or image within the threshold
    Keep,
    /// Shrink from the original to the target dimensions
    Shrink {
        from: (u32, u32),
        to: (u32, u32),
    },
    /// Percentage outside (0, 100) at call time; resize skipped
    InvalidPercentage(f64),
}

impl ResizePlan {
    /// Plan the resize for an image of `width` x `height`
    pub fn for_dimensions(width: u32, height: u32, config: &Config) -> Self {
        if !config.enable_resize || width.max(height) <= config.resize_threshold {
            return Self::Keep;
        }

        if !is_valid_resize_percentage(config.resize_percentage) {
            return Self::InvalidPercentage(config.resize_percentage);
        }

        Self::Shrink {
            from: (width, height),
            to: scaled_dimensions(width, height, config.resize_percentage),
        }
    }
}

/// Scale both dimensions by `(1 - percentage / 100)`, flooring each to at least 1
pub fn scaled_dimensions(width: u32, height: u32, percentage: f64) -> (u32, u32) {
    let scale_factor = 1.0 - (percentage / 100.0);
    let scale = |dimension: u32| ((dimension as f64 * scale_factor).floor() as u32).max(1);
    (scale(width), scale(height))
}

/// Resample `image` to exactly `width` x `height`
pub fn apply(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, CompressError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CompressError::Validation("cannot resize an empty image".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(CompressError::Validation(format!(
            "invalid target size {}x{}",
            width, height
        )));
    }

    Ok(image.resize_exact(width, height, RESIZE_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resize_config(percentage: f64, threshold: u32) -> Config {
        Config {
            enable_resize: true,
            resize_percentage: percentage,
            resize_threshold: threshold,
            ..Config::new("/media")
        }
    }

    #[test]
    fn test_large_image_is_shrunk() {
        let config = resize_config(15.0, 2000);
        assert_eq!(
            ResizePlan::for_dimensions(3000, 2000, &config),
            ResizePlan::Shrink { from: (3000, 2000), to: (2550, 1700) }
        );
    }

    #[test]
    fn test_small_image_is_kept() {
        let config = resize_config(15.0, 2000);
        assert_eq!(ResizePlan::for_dimensions(1000, 800, &config), ResizePlan::Keep);
        // Threshold is exclusive
        assert_eq!(ResizePlan::for_dimensions(2000, 1500, &config), ResizePlan::Keep);
    }

    #[test]
    fn test_disabled_resize_keeps_everything() {
        let config = Config::new("/media");
        assert_eq!(ResizePlan::for_dimensions(9000, 9000, &config), ResizePlan::Keep);
    }

    #[test]
    fn test_invalid_percentage_is_reported_not_applied() {
        let config = resize_config(120.0, 100);
        assert_eq!(
            ResizePlan::for_dimensions(500, 500, &config),
            ResizePlan::InvalidPercentage(120.0)
        );
    }

    #[test]
    fn test_scaled_dimensions_never_reach_zero() {
        assert_eq!(scaled_dimensions(3000, 1, 50.0), (1500, 1));
        assert_eq!(scaled_dimensions(1, 1, 99.0), (1, 1));
    }

    #[test]
    fn test_apply_resizes_exactly() {
        let image = DynamicImage::new_rgb8(40, 20);
        let resized = apply(&image, 34, 17).unwrap();
        assert_eq!((resized.width(), resized.height()), (34, 17));
        assert!(apply(&image, 0, 10).is_err());
    }
}
