//! PDF page rasterization using lopdf.

use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{RasterizerBackend, TempRaster};
use crate::error::RasterError;

/// Rasterizes page one of a PDF by extracting its embedded scan image and
/// scaling it by a fixed zoom factor.
pub struct PdfRasterizer {
    zoom: f32,
}

impl PdfRasterizer {
    pub fn new() -> Self {
        Self { zoom: 2.0 }
    }

    /// Set the zoom factor applied to the extracted raster.
    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    fn load(&self, data: &[u8]) -> Result<Document, RasterError> {
        let mut doc = Document::load_mem(data).map_err(|e| RasterError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption.
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(RasterError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        if doc.get_pages().is_empty() {
            return Err(RasterError::NoPages);
        }
        Ok(doc)
    }

    fn first_page_image(&self, doc: &Document) -> Option<DynamicImage> {
        let pages = doc.get_pages();
        let page_id = *pages.get(&1)?;

        // Look for image XObjects among the page resources first.
        if let Some(resources) = self.page_resources(doc, page_id) {
            if let Ok(xobjects) = resources.get(b"XObject") {
                if let Ok((_, Object::Dictionary(xobj_dict))) = doc.dereference(xobjects) {
                    for (_name, obj_ref) in xobj_dict.iter() {
                        if let Ok((_, obj)) = doc.dereference(obj_ref) {
                            if let Some(img) = self.image_from_object(doc, obj) {
                                return Some(img);
                            }
                        }
                    }
                }
            }
        }

        // Scanned single-page PDFs sometimes store the image elsewhere in the
        // object table.
        debug!("No XObject image on page 1, scanning all objects");
        doc.objects
            .values()
            .find_map(|obj| self.image_from_object(doc, obj))
    }

    fn image_from_object(&self, doc: &Document, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        let subtype = dict.get(b"Subtype").ok()?;
        if subtype.as_name().ok()? != b"Image" {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        let data = match stream.decompressed_content() {
            Ok(d) => d,
            Err(_) => stream.content.clone(),
        };

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) if !arr.is_empty() => {
                    arr.first().and_then(|o| o.as_name().ok())
                }
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    trace!("Decoding JPEG image");
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter, skipping");
                    return None;
                }
                _ => {}
            }
        }

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
                _ => None,
            })
            .unwrap_or(b"DeviceRGB");

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8) as u8;

        raw_to_image(&data, width, height, color_space, bits)
    }

    /// Resources dictionary for a page, following Parent inheritance.
    fn page_resources(&self, doc: &Document, node_id: ObjectId) -> Option<lopdf::Dictionary> {
        let node = doc.get_object(node_id).ok()?;
        let Object::Dictionary(dict) = node else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        if let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") {
            return self.page_resources(doc, *parent_id);
        }
        None
    }
}

impl Default for PdfRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterizerBackend for PdfRasterizer {
    fn rasterize_first_page(&self, data: &[u8]) -> Result<TempRaster, RasterError> {
        let doc = self.load(data)?;
        let image = self
            .first_page_image(&doc)
            .ok_or(RasterError::NoImage(1))?;

        let image = if (self.zoom - 1.0).abs() > f32::EPSILON {
            let w = ((image.width() as f32) * self.zoom).round().max(1.0) as u32;
            let h = ((image.height() as f32) * self.zoom).round().max(1.0) as u32;
            image.resize_exact(w, h, image::imageops::FilterType::Lanczos3)
        } else {
            image
        };

        debug!(
            "Rasterized page 1 at zoom {}: {}x{}",
            self.zoom,
            image.width(),
            image.height()
        );
        TempRaster::create(image)
    }
}

fn raw_to_image(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: u8,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }

    let expected_rgb = (width * height * 3) as usize;
    let expected_gray = (width * height) as usize;

    if (color_space == b"DeviceRGB" || color_space == b"RGB") && data.len() >= expected_rgb {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for chunk in data[..expected_rgb].chunks(3) {
            rgba.extend_from_slice(chunk);
            rgba.push(255);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }

    if (color_space == b"DeviceGray" || color_space == b"G") && data.len() >= expected_gray {
        let mut rgba = Vec::with_capacity((width * height * 4) as usize);
        for &gray in &data[..expected_gray] {
            rgba.extend_from_slice(&[gray, gray, gray, 255]);
        }
        return ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
            .map(DynamicImage::ImageRgba8);
    }

    trace!(
        "Could not decode raw image: data_len={}, colorspace={:?}",
        data.len(),
        String::from_utf8_lossy(color_space)
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_a_parse_error() {
        let rasterizer = PdfRasterizer::new();
        let err = rasterizer.rasterize_first_page(b"not a pdf").unwrap_err();
        assert!(matches!(err, RasterError::Parse(_)));
    }

    #[test]
    fn raw_gray_decodes() {
        let data = vec![128u8; 4];
        let img = raw_to_image(&data, 2, 2, b"DeviceGray", 8).unwrap();
        assert_eq!(img.width(), 2);
        assert_eq!(img.height(), 2);
    }

    #[test]
    fn raw_rejects_unsupported_depth() {
        assert!(raw_to_image(&[0u8; 16], 2, 2, b"DeviceGray", 1).is_none());
    }
}
