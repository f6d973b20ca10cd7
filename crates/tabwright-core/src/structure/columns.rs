//! Column boundary inference.
//!
//! Boundaries are kept as two parallel lists of left and right edges. Every
//! fragment either opens a new column (when it clears its neighbours by more
//! than the gap threshold) or widens the column it partially covers. A
//! fragment bridging two columns changes nothing, which keeps spanning header
//! cells from merging data columns.

use crate::calibrate::DocStats;
use crate::candidate::{Column, Rejection, Row};
use crate::config::schema::Thresholds;
use crate::geometry::TextPiece;
use crate::model::ColumnBand;

/// Ordered, non-overlapping column bands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnLayout {
    lefts: Vec<f32>,
    rights: Vec<f32>,
}

impl ColumnLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lefts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lefts.is_empty()
    }

    pub fn left(&self, column: usize) -> f32 {
        self.lefts[column]
    }

    pub fn right(&self, column: usize) -> f32 {
        self.rights[column]
    }

    pub fn bands(&self) -> Vec<ColumnBand> {
        self.lefts
            .iter()
            .zip(&self.rights)
            .map(|(&left, &right)| ColumnBand { left, right })
            .collect()
    }

    /// Narrowest gap between adjacent columns, `None` with fewer than two.
    pub fn min_gap(&self) -> Option<f32> {
        (1..self.len())
            .map(|i| self.lefts[i] - self.rights[i - 1])
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Fold the fragment extent `[b, e)` into the layout.
    pub fn absorb(&mut self, b: f32, e: f32, threshold: f32) {
        if e <= b {
            return;
        }
        let n = self.len();
        if n == 0 || b - self.rights[n - 1] > threshold {
            self.lefts.push(b);
            self.rights.push(e);
            return;
        }
        if self.lefts[0] - e > threshold {
            self.insert(0, b, e);
            return;
        }
        if let Some(i) = (1..n)
            .find(|&i| b - self.rights[i - 1] > threshold && self.lefts[i] - e > threshold)
        {
            self.insert(i, b, e);
            return;
        }
        self.widen(b, e);
    }

    fn insert(&mut self, at: usize, b: f32, e: f32) {
        self.lefts.insert(at, b);
        self.rights.insert(at, e);
    }

    fn widen(&mut self, b: f32, e: f32) {
        let n = self.len();
        for i in 0..n {
            let a = if i == 0 { f32::NEG_INFINITY } else { self.rights[i - 1] };
            let f = if i + 1 < n { self.lefts[i + 1] } else { f32::INFINITY };
            let (c, d) = (self.lefts[i], self.rights[i]);

            if a < b && b <= c && d <= e && e < f {
                self.lefts[i] = b;
                self.rights[i] = e;
            } else if a < b && b < c && c < e && e < d {
                self.lefts[i] = b;
            } else if c < b && b < d && d < e && e < f {
                self.rights[i] = e;
            } else {
                continue;
            }
            return;
        }
    }
}

/// Infer column bands from the data rows, then let header rows widen them.
///
/// Only data rows with the full fragment count seed the layout, so rows with
/// missing cells cannot split a column; when no row is full, every data row
/// seeds.
pub fn infer_columns(
    rows: &[Row],
    heading_line_number: usize,
    footnote_begin_row: usize,
    max_row_cells: usize,
    stats: &DocStats,
    t: &Thresholds,
) -> Result<ColumnLayout, Rejection> {
    let threshold = stats.avg_x_gap * t.column_gap_factor;
    let heads = (heading_line_number + 1).min(rows.len());
    let footnote = footnote_begin_row.clamp(heads, rows.len());
    let data = &rows[heads..footnote];

    let full_row_exists = data.iter().any(|r| r.cells.len() == max_row_cells);
    let mut layout = ColumnLayout::new();
    for row in data {
        if full_row_exists && row.cells.len() != max_row_cells {
            continue;
        }
        for piece in &row.cells {
            layout.absorb(piece.x, piece.end_x, threshold);
        }
    }
    for row in &rows[..heads] {
        for piece in &row.cells {
            layout.absorb(piece.x, piece.end_x, threshold);
        }
    }

    let columns = layout.len();
    if columns > t.max_columns {
        return Err(Rejection::TooManyColumns { columns });
    }
    if columns < t.min_columns {
        return Err(Rejection::TooFewColumns { columns });
    }
    match layout.min_gap() {
        Some(gap) if gap <= 0.0 => Err(Rejection::ColumnGapTooSmall { gap }),
        _ => Ok(layout),
    }
}

/// Slice the rows into per-band columns. Fragments in one row that overlap
/// the same band are merged into a single cell fragment.
pub fn build_columns(rows: &[Row], layout: &ColumnLayout) -> Vec<Column> {
    (0..layout.len())
        .map(|c| {
            let (left, right) = (layout.left(c), layout.right(c));
            let cells = rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .filter(|p| p.overlaps_band(left, right))
                        .fold(None, |acc: Option<TextPiece>, p| {
                            Some(match acc {
                                Some(cell) => cell.merged(p),
                                None => p.clone(),
                            })
                        })
                })
                .collect();
            Column { cells }
        })
        .collect()
}
