//! Image preprocessing ahead of layout analysis and recognition.

use image::GrayImage;

/// Pure image-to-image preprocessing step. Implementations must be cheap to
/// share across worker threads; heavyweight cleanup backends plug in behind
/// this trait.
pub trait Preprocessor: Send + Sync {
    fn process(&self, image: GrayImage) -> GrayImage;
}

/// Baseline preprocessor: global binarization around the mean luma. Keeps
/// downstream layout analysis stable on noisy scans without pulling in a
/// full image-processing backend.
pub struct ImagePreprocessor {
    /// Offset subtracted from the mean when picking the threshold; positive
    /// values bias towards keeping more ink
    pub threshold_bias: i16,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self { threshold_bias: 10 }
    }
}

impl Preprocessor for ImagePreprocessor {
    fn process(&self, mut image: GrayImage) -> GrayImage {
        let pixels = image.as_raw();
        if pixels.is_empty() {
            return image;
        }
        let sum: u64 = pixels.iter().map(|&p| p as u64).sum();
        let mean = (sum / pixels.len() as u64) as i16;
        let threshold = (mean - self.threshold_bias).clamp(0, 255) as u8;

        for pixel in image.iter_mut() {
            *pixel = if *pixel < threshold { 0 } else { 255 };
        }
        image
    }
}
