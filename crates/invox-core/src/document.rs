//! Input document types - the boundary between callers and the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InvoxError, RasterError};

/// Declared format of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Png,
    Jpg,
    Jpeg,
    Tiff,
    Bmp,
}

impl DocumentFormat {
    /// Parse a format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "tiff" | "tif" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Whether the format is a paged document that must be rasterized first.
    pub fn is_paged(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
        };
        write!(f, "{s}")
    }
}

/// Source of document bytes. The pipeline reads bytes by reference and never
/// takes ownership of the underlying storage.
pub trait DocumentSource {
    /// Raw document bytes.
    fn bytes(&self) -> &[u8];

    /// Declared format of the bytes.
    fn format(&self) -> DocumentFormat;
}

/// An in-memory document: raw bytes plus their declared format.
///
/// Ephemeral - owned by a single pipeline invocation.
#[derive(Debug, Clone)]
pub struct DocumentImage {
    bytes: Vec<u8>,
    format: DocumentFormat,
}

impl DocumentImage {
    pub fn new(bytes: Vec<u8>, format: DocumentFormat) -> Self {
        Self { bytes, format }
    }

    /// Read a document from disk, deriving the format from the extension.
    pub fn from_path(path: &Path) -> Result<Self, InvoxError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let format = DocumentFormat::from_extension(ext)
            .ok_or_else(|| RasterError::UnsupportedFormat(ext.to_string()))?;
        let bytes = std::fs::read(path)?;
        Ok(Self { bytes, format })
    }
}

impl DocumentSource for DocumentImage {
    fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn format(&self) -> DocumentFormat {
        self.format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("jpeg"), Some(DocumentFormat::Jpeg));
        assert_eq!(DocumentFormat::from_extension("tif"), Some(DocumentFormat::Tiff));
        assert_eq!(DocumentFormat::from_extension("docx"), None);
    }

    #[test]
    fn only_pdf_is_paged() {
        assert!(DocumentFormat::Pdf.is_paged());
        assert!(!DocumentFormat::Png.is_paged());
        assert!(!DocumentFormat::Bmp.is_paged());
    }

    #[test]
    fn from_path_rejects_unknown_extension() {
        let err = DocumentImage::from_path(Path::new("invoice.docx"));
        assert!(matches!(
            err,
            Err(InvoxError::Raster(RasterError::UnsupportedFormat(_)))
        ));
    }
}
