//! PDF Core - Low-level PDF, font and overlay plumbing
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents and reading page geometry
//! - Loading and validating TrueType/OpenType fonts
//! - Shaping complex-script text (conjuncts, ligatures) with rustybuzz
//! - Rasterizing shaped runs onto transparent page-sized layers
//! - Compositing those layers onto pages as soft-masked image XObjects
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{shape_text, Color, FontData, OverlayLayer, PdfDocument};
//!
//! let mut doc = PdfDocument::open("template.pdf")?;
//! let font = FontData::from_file("NotoSansGujarati.ttf")?;
//! let (width, height) = doc.page_size(0)?;
//!
//! let run = shape_text(&font, "શ્રી રાજેશભાઈ પટેલ")?;
//! let mut layer = OverlayLayer::new(width, height, 2.0)?;
//! layer.draw_run(&font, &run, 120.0, 340.0, 20.0, Color::black())?;
//!
//! doc.insert_overlay(0, layer.image())?;
//! doc.save("output.pdf")?;
//! ```

mod document;
mod font;
mod image;
mod raster;
mod shape;

pub mod testing;

pub use document::{PageBox, PdfDocument};
pub use font::FontData;
pub use image::ImageXObject;
pub use raster::{Color, OverlayLayer};
pub use shape::{shape_text, ShapedGlyph, ShapedRun};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Text shaping failed: {0}")]
    ShapingError(String),

    #[error("Invalid page index: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_page_message() {
        let err = PdfError::InvalidPage(4, 2);
        assert_eq!(
            err.to_string(),
            "Invalid page index: 4 (document has 2 pages)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PdfError = io.into();
        assert!(matches!(err, PdfError::IoError(_)));
    }
}
