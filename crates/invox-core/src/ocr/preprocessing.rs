//! Image preprocessing: alternative raster renderings for OCR.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
use imageproc::contrast::{ThresholdType, adaptive_threshold, equalize_histogram, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::geometry::min_area_rect;
use imageproc::morphology;
use imageproc::point::Point;
use tracing::debug;

use crate::error::OcrError;

/// The recipe that produced a preprocessed variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Technique {
    /// Median denoise + adaptive threshold + morphological close.
    Denoised,
    /// Histogram equalization + Otsu binarization.
    Equalized,
    /// Gaussian blur + Otsu binarization.
    Blurred,
    /// Grayscale morphological close + adaptive mean threshold.
    Closed,
    /// Rotation estimated from foreground mass, then Otsu binarization.
    Deskewed,
    /// Single-pass grayscale + Otsu degrade path.
    Fallback,
}

impl Technique {
    /// Short tag used in engine result identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            Technique::Denoised => "denoised",
            Technique::Equalized => "equalized",
            Technique::Blurred => "blurred",
            Technique::Closed => "closed",
            Technique::Deskewed => "deskewed",
            Technique::Fallback => "fallback",
        }
    }
}

/// One preprocessed rendering of the source image. Discarded after
/// extraction.
#[derive(Debug, Clone)]
pub struct PreprocessedVariant {
    pub technique: Technique,
    pub image: GrayImage,
}

/// Produces a fixed set of alternative raster renderings of a source image.
pub struct ImagePreprocessor {
    max_size: u32,
    deskew_min_foreground: u32,
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self {
            max_size: 2048,
            deskew_min_foreground: 100,
        }
    }

    /// Set maximum image dimension (longer side).
    pub fn with_max_size(mut self, size: u32) -> Self {
        self.max_size = size;
        self
    }

    /// Set the foreground pixel count below which deskewing is skipped.
    pub fn with_deskew_min_foreground(mut self, count: u32) -> Self {
        self.deskew_min_foreground = count;
        self
    }

    /// Decode raw bytes into an image. Failure is `InvalidImage`; callers
    /// degrade to `fallback_variant` rather than aborting the pipeline.
    pub fn decode(data: &[u8]) -> Result<DynamicImage, OcrError> {
        image::load_from_memory(data).map_err(|e| OcrError::InvalidImage(e.to_string()))
    }

    /// Produce the preprocessed variants, in fixed order. Four always; a
    /// fifth deskewed variant when the first variant has enough foreground
    /// mass for a reliable orientation estimate.
    pub fn variants(&self, image: &DynamicImage) -> Vec<PreprocessedVariant> {
        let gray = self.grayscale(image);

        let denoised = median_filter(&gray, 1, 1);
        let adaptive = adaptive_threshold(&denoised, 5);
        let v1 = morphology::close(&adaptive, Norm::LInf, 1);

        let v2 = binarize_otsu(&equalize_histogram(&gray));

        let v3 = binarize_otsu(&gaussian_blur_f32(&gray, 1.1));

        let v4 = adaptive_threshold(&grayscale_close(&gray), 7);

        let mut variants = vec![
            PreprocessedVariant { technique: Technique::Denoised, image: v1 },
            PreprocessedVariant { technique: Technique::Equalized, image: v2 },
            PreprocessedVariant { technique: Technique::Blurred, image: v3 },
            PreprocessedVariant { technique: Technique::Closed, image: v4 },
        ];

        if let Some(deskewed) = self.deskew(&gray, &variants[0].image) {
            variants.push(PreprocessedVariant {
                technique: Technique::Deskewed,
                image: deskewed,
            });
        }

        debug!("Produced {} preprocessed variants", variants.len());
        variants
    }

    /// Single grayscale + Otsu pass. When decoding already failed there is
    /// nothing to binarize, so a small blank raster keeps the downstream
    /// stages alive.
    pub fn fallback_variant(&self, image: Option<&DynamicImage>) -> PreprocessedVariant {
        let image = match image {
            Some(img) => binarize_otsu(&self.grayscale(img)),
            None => blank_raster(),
        };
        PreprocessedVariant {
            technique: Technique::Fallback,
            image,
        }
    }

    /// Bounded grayscale rendering of the source, as fed to secondary-class
    /// engines.
    pub fn grayscale(&self, image: &DynamicImage) -> GrayImage {
        let image = if image.width() > self.max_size || image.height() > self.max_size {
            image.resize(
                self.max_size,
                self.max_size,
                image::imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };
        image.to_luma8()
    }

    fn deskew(&self, gray: &GrayImage, binary: &GrayImage) -> Option<GrayImage> {
        let points: Vec<Point<i32>> = binary
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] > 0)
            .map(|(x, y, _)| Point::new(x as i32, y as i32))
            .collect();

        if points.len() <= self.deskew_min_foreground as usize {
            debug!(
                "Skipping deskew: {} foreground pixels below threshold {}",
                points.len(),
                self.deskew_min_foreground
            );
            return None;
        }

        let corners = min_area_rect(&points);
        let angle = skew_angle_degrees(&corners);
        debug!("Estimated skew angle: {:.2} degrees", angle);

        let rotated = rotate_about_center(
            gray,
            (-angle).to_radians(),
            Interpolation::Bicubic,
            Luma([255u8]),
        );
        Some(binarize_otsu(&rotated))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Binarize with a global Otsu threshold.
pub fn binarize_otsu(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::Binary)
}

/// Angle of the minimum-area rectangle's long edge, folded into (-45, 45].
fn skew_angle_degrees(corners: &[Point<i32>; 4]) -> f32 {
    let edge = |a: Point<i32>, b: Point<i32>| {
        let dx = (b.x - a.x) as f32;
        let dy = (b.y - a.y) as f32;
        (dx, dy, dx * dx + dy * dy)
    };

    let (dx1, dy1, sq1) = edge(corners[0], corners[1]);
    let (dx2, dy2, sq2) = edge(corners[1], corners[2]);
    let (dx, dy) = if sq1 >= sq2 { (dx1, dy1) } else { (dx2, dy2) };

    let mut angle = dy.atan2(dx).to_degrees();
    while angle > 45.0 {
        angle -= 90.0;
    }
    while angle <= -45.0 {
        angle += 90.0;
    }
    angle
}

/// 3x3 grayscale morphological close (dilate then erode).
fn grayscale_close(image: &GrayImage) -> GrayImage {
    neighborhood_extreme(&neighborhood_extreme(image, u8::max), u8::min)
}

fn neighborhood_extreme(image: &GrayImage, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let mut value = image.get_pixel(x, y)[0];
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height {
                    value = pick(value, image.get_pixel(nx as u32, ny as u32)[0]);
                }
            }
        }
        Luma([value])
    })
}

fn blank_raster() -> GrayImage {
    ImageBuffer::from_pixel(10, 10, Luma([255u8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(size: u32) -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(size, size, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Luma([30u8])
            } else {
                Luma([220u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = ImagePreprocessor::decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn produces_four_or_five_variants_in_fixed_order() {
        let pre = ImagePreprocessor::new();
        let variants = pre.variants(&checkerboard(64));
        assert!((4..=5).contains(&variants.len()));
        assert_eq!(variants[0].technique, Technique::Denoised);
        assert_eq!(variants[1].technique, Technique::Equalized);
        assert_eq!(variants[2].technique, Technique::Blurred);
        assert_eq!(variants[3].technique, Technique::Closed);
        if let Some(fifth) = variants.get(4) {
            assert_eq!(fifth.technique, Technique::Deskewed);
        }
    }

    #[test]
    fn tiny_image_skips_deskew() {
        // An 8x8 image has at most 64 foreground pixels, below the 100 gate.
        let pre = ImagePreprocessor::new();
        let variants = pre.variants(&checkerboard(8));
        assert_eq!(variants.len(), 4);
    }

    #[test]
    fn binarize_is_two_level() {
        let gray = checkerboard(32).to_luma8();
        let binary = binarize_otsu(&gray);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn fallback_without_image_is_blank_raster() {
        let pre = ImagePreprocessor::new();
        let fb = pre.fallback_variant(None);
        assert_eq!(fb.technique, Technique::Fallback);
        assert_eq!(fb.image.dimensions(), (10, 10));
    }

    #[test]
    fn fallback_with_image_preserves_dimensions() {
        let pre = ImagePreprocessor::new();
        let fb = pre.fallback_variant(Some(&checkerboard(32)));
        assert_eq!(fb.image.dimensions(), (32, 32));
        assert!(fb.image.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn oversized_image_is_bounded() {
        let pre = ImagePreprocessor::new().with_max_size(256);
        let gray = pre.grayscale(&checkerboard(1024));
        assert!(gray.width() <= 256 && gray.height() <= 256);
    }

    #[test]
    fn skew_angle_of_level_rectangle_is_zero() {
        let corners = [
            Point::new(0, 0),
            Point::new(100, 0),
            Point::new(100, 10),
            Point::new(0, 10),
        ];
        assert!(skew_angle_degrees(&corners).abs() < 0.01);
    }

    #[test]
    fn skew_angle_folds_into_quarter_range() {
        // Long edge at ~60 degrees folds to -30.
        let corners = [
            Point::new(0, 0),
            Point::new(50, 87),
            Point::new(41, 92),
            Point::new(-9, 5),
        ];
        let angle = skew_angle_degrees(&corners);
        assert!(angle > -45.0 && angle <= 45.0);
        assert!((angle + 30.0).abs() < 2.0, "angle was {angle}");
    }

    #[test]
    fn grayscale_close_fills_pinholes() {
        let mut img: GrayImage = ImageBuffer::from_pixel(9, 9, Luma([255u8]));
        img.put_pixel(4, 4, Luma([0u8]));
        let closed = grayscale_close(&img);
        assert_eq!(closed.get_pixel(4, 4)[0], 255);
    }
}
