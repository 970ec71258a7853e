//! PDF Core - Canvas-style PDF writing
//!
//! This crate provides functionality for:
//! - Building a PDF document page by page from scratch
//! - Embedding TrueType fonts (standalone or from a collection) as subsetted CID fonts
//! - Drawing strings at absolute coordinates with left/center/right anchoring
//! - Writing document metadata and saving with compressed streams
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::{Canvas, PageSize};
//!
//! let mut canvas = Canvas::new(PageSize::A4);
//! canvas.register_font("wqy", &std::fs::read("wqy-microhei.ttc")?, 0)?;
//! canvas.set_font("wqy", 24.0)?;
//! canvas.draw_string(100.0, 700.0, "测试第一页")?;
//! canvas.show_page();
//! canvas.save("zh_multi.pdf")?;
//! ```

mod canvas;
mod font;
mod info;
mod text;

pub use canvas::{Canvas, Color};
pub use font::{FontData, FontObjects};
pub use info::DocumentInfo;
pub use text::{generate_text_operators, TextRenderContext};

use thiserror::Error;

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("Font already exists: {0}")]
    FontAlreadyExists(String),

    #[error("Failed to parse font: {0}")]
    FontParseError(String),

    #[error("Font subset error: {0}")]
    FontSubsetError(String),

    #[error("No font selected on page {0}; call set_font before drawing")]
    NoFontSelected(usize),

    #[error("Invalid font size: {0}")]
    InvalidFontSize(f32),

    #[error("Invalid page size: {0} x {1}")]
    InvalidPageSize(f64, f64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Anchor of a drawn string relative to its x coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub const A5: PageSize = PageSize {
        width: 419.53,
        height: 595.28,
    };

    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// Create a custom page size
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite() {
            return Err(PdfError::InvalidPageSize(width, height));
        }
        Ok(Self { width, height })
    }

    /// Same size with width and height swapped so that width >= height
    pub fn landscape(self) -> Self {
        if self.width >= self.height {
            self
        } else {
            Self {
                width: self.height,
                height: self.width,
            }
        }
    }

    /// Look up a named paper size (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            "letter" => Some(Self::LETTER),
            _ => None,
        }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_page_size_default_is_a4() {
        assert_eq!(PageSize::default(), PageSize::A4);
    }

    #[test]
    fn test_page_size_landscape() {
        let landscape = PageSize::A4.landscape();
        assert_eq!(landscape.width, 841.89);
        assert_eq!(landscape.height, 595.28);

        // Already landscape stays as is
        assert_eq!(landscape.landscape(), landscape);
    }

    #[test]
    fn test_page_size_from_name() {
        assert_eq!(PageSize::from_name("A4"), Some(PageSize::A4));
        assert_eq!(PageSize::from_name("letter"), Some(PageSize::LETTER));
        assert_eq!(PageSize::from_name("tabloid"), None);
    }

    #[test]
    fn test_page_size_rejects_non_positive() {
        assert!(PageSize::new(0.0, 100.0).is_err());
        assert!(PageSize::new(100.0, -1.0).is_err());
        assert!(PageSize::new(f64::NAN, 100.0).is_err());
        assert!(PageSize::new(100.0, 200.0).is_ok());
    }
}
