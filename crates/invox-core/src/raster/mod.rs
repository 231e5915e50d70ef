//! Rasterization of paged documents.

mod pdf;

pub use pdf::PdfRasterizer;

use std::io::Write;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::RasterError;

/// Capability interface for converting page one of a paged document into a
/// raster buffer. Absence of a backend surfaces as `UnsupportedFormat` for
/// paged inputs, never a crash.
pub trait RasterizerBackend: Send + Sync {
    /// Rasterize the first page of `data` at the backend's fixed zoom.
    fn rasterize_first_page(&self, data: &[u8]) -> Result<TempRaster, RasterError>;
}

/// A rasterized page persisted as a scoped temporary artifact.
///
/// The backing file is deleted when the guard drops, on every exit path;
/// deletion failure is logged but never propagated.
#[derive(Debug)]
pub struct TempRaster {
    image: DynamicImage,
    path: PathBuf,
}

impl TempRaster {
    /// Persist `image` as a temporary PNG and wrap it in a guard.
    pub fn create(image: DynamicImage) -> Result<Self, RasterError> {
        let mut file = tempfile::Builder::new()
            .prefix("invox-raster-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| RasterError::Artifact(e.to_string()))?;

        let mut encoded = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| RasterError::Artifact(e.to_string()))?;
        file.write_all(&encoded)
            .map_err(|e| RasterError::Artifact(e.to_string()))?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| RasterError::Artifact(e.to_string()))?;

        debug!("Persisted page raster to {}", path.display());
        Ok(Self { image, path })
    }

    /// The rasterized page.
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Location of the temporary artifact.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempRaster {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(
                "Failed to remove temporary raster {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};

    fn tiny_image() -> DynamicImage {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn temp_raster_persists_and_cleans_up() {
        let raster = TempRaster::create(tiny_image()).unwrap();
        let path = raster.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(raster.image().width(), 4);
        drop(raster);
        assert!(!path.exists());
    }
}
