//! Working state for one table under detection.
//!
//! Each stage is a pure function returning either its substructure or a
//! [`Rejection`]. [`TableCandidate::run`] is the only way a stage executes and
//! the only place a rejection is recorded; nothing clears a rejection, so once
//! a candidate is invalid every later stage is skipped.

use crate::geometry::TextPiece;
use crate::model::{CaptionLocation, HeaderTree, Reference};
use crate::structure::columns::ColumnLayout;
use serde::Serialize;
use std::fmt;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Created,
    ScanCaption,
    ClassifyLocation,
    GrowBody,
    ClusterRows,
    EstimateHeadings,
    InferColumns,
    AssignCells,
    ResolveHeadings,
    BuildHierarchy,
    Finalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "created",
            Stage::ScanCaption => "scan caption",
            Stage::ClassifyLocation => "classify location",
            Stage::GrowBody => "grow body",
            Stage::ClusterRows => "cluster rows",
            Stage::EstimateHeadings => "estimate headings",
            Stage::InferColumns => "infer columns",
            Stage::AssignCells => "assign cells",
            Stage::ResolveHeadings => "resolve headings",
            Stage::BuildHierarchy => "build hierarchy",
            Stage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Why a candidate stopped being a table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Rejection {
    ReversedText,
    CaptionTooLong { lines: usize },
    TableOfContents,
    TooFewBodyLines { lines: usize },
    CaptionBodyDisjoint,
    TooFewRows { rows: usize },
    TooManyColumns { columns: usize },
    TooFewColumns { columns: usize },
    ColumnGapTooSmall { gap: f32 },
    NoDataRows { footnote_begin_row: usize },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ReversedText => write!(f, "reversed or rotated caption text"),
            Rejection::CaptionTooLong { lines } => write!(f, "caption spans {lines} lines"),
            Rejection::TableOfContents => write!(f, "caption is a table of contents"),
            Rejection::TooFewBodyLines { lines } => write!(f, "only {lines} body lines"),
            Rejection::CaptionBodyDisjoint => {
                write!(f, "caption and body do not overlap horizontally")
            }
            Rejection::TooFewRows { rows } => write!(f, "only {rows} rows"),
            Rejection::TooManyColumns { columns } => write!(f, "{columns} columns inferred"),
            Rejection::TooFewColumns { columns } => write!(f, "only {columns} columns inferred"),
            Rejection::ColumnGapTooSmall { gap } => {
                write!(f, "gaps between columns are not large enough ({gap:.1})")
            }
            Rejection::NoDataRows { footnote_begin_row } => {
                write!(f, "footnote starts at row {footnote_begin_row}, no data rows")
            }
        }
    }
}

/// Caption line span and its horizontal extent.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSpan {
    pub start_line: usize,
    pub end_line: usize,
    /// Folded caption text; every absorbed line contributes its text and a space.
    pub text: String,
    pub keyword: String,
    pub x: f32,
    pub end_x: f32,
    pub wide: bool,
}

impl CaptionSpan {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    pub fn width(&self) -> f32 {
        self.end_x - self.x
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// Body line span. Disjoint from the caption span.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpan {
    pub start_line: usize,
    pub end_line: usize,
    pub x: f32,
    pub end_x: f32,
}

impl BodySpan {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    pub fn contains_line(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// Fragments sharing one vertical cluster, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub y: f32,
    pub superscript: bool,
    pub cells: Vec<TextPiece>,
}

/// One fragment per row for a column band, `None` where the row is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub cells: Vec<Option<TextPiece>>,
}

impl Column {
    pub fn populated(&self) -> impl Iterator<Item = &TextPiece> {
        self.cells.iter().flatten()
    }
}

/// Cell texts per row and column, with spanning flags.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    pub cells: Vec<Vec<String>>,
    pub crossed: Vec<Vec<bool>>,
}

/// Position of a fragment inside [`TableCandidate::rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceId {
    pub row: usize,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headings {
    /// Index of the last header row.
    pub heading_line_number: usize,
    pub footnote_begin_row: usize,
    /// Largest fragment count among rows above the footnote.
    pub max_row_cells: usize,
    pub head_columns: usize,
    pub stub: Vec<PieceId>,
}

/// Accumulated detection state for one caption keyword hit.
#[derive(Debug, Clone)]
pub struct TableCandidate {
    pub page: usize,
    stage: Stage,
    rejection: Option<(Stage, Rejection)>,
    pub caption: Option<CaptionSpan>,
    pub location: Option<CaptionLocation>,
    pub body: Option<BodySpan>,
    pub references: Vec<Reference>,
    pub rows: Vec<Row>,
    pub layout: Option<ColumnLayout>,
    pub grid: Option<CellGrid>,
    pub columns: Vec<Column>,
    pub headings: Option<Headings>,
    pub column_tree: Option<HeaderTree>,
    pub row_tree: Option<HeaderTree>,
}

impl TableCandidate {
    pub fn new(page: usize) -> Self {
        TableCandidate {
            page,
            stage: Stage::Created,
            rejection: None,
            caption: None,
            location: None,
            body: None,
            references: Vec::new(),
            rows: Vec::new(),
            layout: None,
            grid: None,
            columns: Vec::new(),
            headings: None,
            column_tree: None,
            row_tree: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_valid(&self) -> bool {
        self.rejection.is_none()
    }

    /// The rejection and the stage that raised it.
    pub fn rejection(&self) -> Option<(Stage, &Rejection)> {
        self.rejection.as_ref().map(|(s, r)| (*s, r))
    }

    /// Execute `stage`. Returns `None` without calling `f` when the candidate
    /// is already invalid or `stage` does not move forward; records the
    /// rejection when `f` fails.
    pub fn run<T>(&mut self, stage: Stage, f: impl FnOnce() -> Result<T, Rejection>) -> Option<T> {
        if !self.is_valid() || stage <= self.stage {
            return None;
        }
        self.stage = stage;
        match f() {
            Ok(value) => Some(value),
            Err(reason) => {
                tracing::debug!(page = self.page, %stage, %reason, "candidate rejected");
                self.rejection = Some((stage, reason));
                None
            }
        }
    }

    pub fn caption_text(&self) -> &str {
        self.caption.as_ref().map(|c| c.text.as_str()).unwrap_or("")
    }
}
