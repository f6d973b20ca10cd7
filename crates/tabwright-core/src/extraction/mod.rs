pub mod json;
pub mod pdftotext;

use crate::error::TabwrightError;
use crate::geometry::TextPiece;
use serde::{Deserialize, Serialize};

/// Word fragments of a single page, in the order the text source emitted them.
#[derive(Debug, Clone)]
pub struct PageWords {
    /// 1-based.
    pub page_number: usize,
    pub words: Vec<TextPiece>,
}

impl PageWords {
    pub fn new(page_number: usize, words: Vec<TextPiece>) -> Self {
        PageWords { page_number, words }
    }
}

/// Trait for text extraction backends.
pub trait TextSource: Send + Sync {
    /// Extract positioned words from document bytes, one entry per page.
    fn load_pages(&self, bytes: &[u8]) -> Result<Vec<PageWords>, TabwrightError>;

    /// Name of this extraction backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Serialized form of one word fragment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordRecord {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_of_space: Option<f32>,
}

impl From<WordRecord> for TextPiece {
    fn from(r: WordRecord) -> Self {
        let mut piece = TextPiece::new(r.text, r.x, r.y, r.width, r.height, r.font_size);
        if r.x_scale.is_some() || r.y_scale.is_some() {
            piece = piece.with_scales(
                r.x_scale.unwrap_or(r.font_size),
                r.y_scale.unwrap_or(r.font_size),
            );
        }
        if let Some(space) = r.width_of_space {
            piece = piece.with_space_width(space);
        }
        piece
    }
}

impl From<&TextPiece> for WordRecord {
    fn from(p: &TextPiece) -> Self {
        WordRecord {
            text: p.text.clone(),
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
            font_size: p.font_size,
            x_scale: Some(p.x_scale),
            y_scale: Some(p.y_scale),
            width_of_space: Some(p.width_of_space),
        }
    }
}
