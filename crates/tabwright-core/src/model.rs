use crate::calibrate::DocStats;
use crate::candidate::{Rejection, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the caption sits relative to the table body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionLocation {
    Above,
    Below,
}

impl fmt::Display for CaptionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionLocation::Above => write!(f, "above"),
            CaptionLocation::Below => write!(f, "below"),
        }
    }
}

/// How header cells line up with the cells they head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    Center,
    Top,
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Left => write!(f, "left"),
            Alignment::Right => write!(f, "right"),
            Alignment::Center => write!(f, "center"),
            Alignment::Top => write!(f, "top"),
        }
    }
}

/// Horizontal extent of one inferred column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnBand {
    pub left: f32,
    pub right: f32,
}

/// One header cell in a [`HeaderTree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderNode {
    pub text: String,
    pub x: f32,
    pub end_x: f32,
    pub y: f32,
    pub end_y: f32,
    /// Header level, 0 being the outermost.
    pub level: usize,
    /// Index of the parent node; lookup only.
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Header hierarchy stored as an arena. Parents own their children through
/// index lists, children point back with a plain index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderTree {
    pub alignment: Alignment,
    pub nodes: Vec<HeaderNode>,
}

impl HeaderTree {
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.level == 0)
            .map(|(i, _)| i)
    }

    pub fn children_of(&self, node: usize) -> &[usize] {
        self.nodes
            .get(node)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, node: usize) -> Option<usize> {
        self.nodes.get(node).and_then(|n| n.parent)
    }

    /// Texts of the children of the first node whose text is `text`.
    pub fn child_texts(&self, text: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .find(|n| n.text == text)
            .map(|n| {
                n.children
                    .iter()
                    .map(|&c| self.nodes[c].text.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A sentence elsewhere in the document that mentions the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub page: usize,
    pub text: String,
}

/// Finalized, detached snapshot of one detected table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// 1-based page number.
    pub page: usize,
    pub caption: String,
    pub keyword: String,
    pub caption_location: CaptionLocation,
    pub wide: bool,
    /// Index of the last header row.
    pub heading_line_number: usize,
    pub head_column_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    /// Header cells joined top to bottom, one entry per column.
    pub column_headings: Vec<String>,
    /// Head-column cells of the data rows.
    pub row_headings: Vec<String>,
    pub stub: Vec<String>,
    /// Data rows with cells joined by `;`.
    pub body_rows: Vec<String>,
    /// Footnote rows with fragments joined by tabs.
    pub footnote: Vec<String>,
    pub reference_text: String,
    pub references: Vec<Reference>,
    pub columns: Vec<ColumnBand>,
    pub cells: Vec<Vec<String>>,
    /// `crossed[row][column]` marks a spanning value shared by neighbours.
    pub crossed: Vec<Vec<bool>>,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_header_tree: Option<HeaderTree>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_header_tree: Option<HeaderTree>,
}

impl Table {
    pub fn spanning_cell_count(&self) -> usize {
        self.crossed.iter().flatten().filter(|c| **c).count()
    }
}

/// Why a whole document was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnprocessableReason {
    NoText,
    TooLarge { pages: usize, limit: usize },
    UnknownEncoding { mean_scale: f32 },
    HtmlEncoded,
}

impl fmt::Display for UnprocessableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnprocessableReason::NoText => write!(f, "no text could be extracted"),
            UnprocessableReason::TooLarge { pages, limit } => {
                write!(f, "document too large: {pages} pages (limit {limit})")
            }
            UnprocessableReason::UnknownEncoding { mean_scale } => write!(
                f,
                "unknown text encoding: mean glyph scale {mean_scale:.2} on the first page"
            ),
            UnprocessableReason::HtmlEncoded => write!(f, "text is HTML-like glyph codes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DocumentStatus {
    Processed,
    Unprocessable { reason: UnprocessableReason },
}

/// A candidate that was dropped, with the stage that dropped it.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedCandidate {
    pub page: usize,
    pub caption: String,
    pub stage: Stage,
    pub reason: Rejection,
}

/// Everything found in one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub status: DocumentStatus,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DocStats>,
    pub tables: Vec<Table>,
    pub rejected: Vec<RejectedCandidate>,
}

impl DocumentResult {
    pub fn unprocessable(page_count: usize, reason: UnprocessableReason) -> Self {
        DocumentResult {
            status: DocumentStatus::Unprocessable { reason },
            page_count,
            stats: None,
            tables: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == DocumentStatus::Processed
    }
}
