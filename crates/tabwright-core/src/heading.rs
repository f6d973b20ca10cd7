//! Heading row and heading column detection.
//!
//! The geometric rules here are authoritative. A [`HeadingClassifier`] can
//! override the row or column count; when it declines (returns `None`) or is
//! the [`NullClassifier`], the rules stand.

use crate::candidate::{CellGrid, Column, Headings, PieceId, Row};
use crate::config::schema::{ExtractorConfig, Markers, Thresholds};
use crate::structure::columns::ColumnLayout;
use serde::Serialize;

/// Which header direction a feature table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Rows,
    Columns,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Rows => write!(f, "rows"),
            Axis::Columns => write!(f, "columns"),
        }
    }
}

/// Geometric and lexical features of one row or one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub index: usize,
    pub fragment_count: usize,
    pub populated_cells: usize,
    /// Share of fragments that are mostly digits.
    pub numeric_ratio: f32,
    pub mean_height: f32,
    pub has_unit: bool,
    pub superscript: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingLabel {
    Header,
    Data,
}

/// Pluggable heading model. Implementations are shared read-only across
/// documents, so they must be `Send + Sync`.
pub trait HeadingClassifier: Send + Sync {
    /// One label per feature row, or `None` to defer to the rules.
    fn classify(&self, axis: Axis, features: &[FeatureRow]) -> Option<Vec<HeadingLabel>>;
}

/// Classifier that always defers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullClassifier;

impl HeadingClassifier for NullClassifier {
    fn classify(&self, _axis: Axis, _features: &[FeatureRow]) -> Option<Vec<HeadingLabel>> {
        None
    }
}

/// First row that opens the footnote region, or `rows.len()`. The
/// superscript marker only counts within the last `tail_rows` rows.
pub fn footnote_begin_row(rows: &[Row], markers: &Markers, tail_rows: usize) -> usize {
    let n = rows.len();
    rows.iter()
        .enumerate()
        .position(|(i, row)| {
            let Some(first) = row.cells.first() else {
                return false;
            };
            let text = first.text.trim_start();
            markers.starts_footnote(text)
                || (row.superscript
                    && i + tail_rows >= n
                    && !markers.superscript_footnote.is_empty()
                    && text.starts_with(markers.superscript_footnote.as_str()))
        })
        .unwrap_or(n)
}

/// Rule-based heading estimate: leading rows with fewer fragments than the
/// fullest row are headers, minus one because the first column of a data
/// row is often blank. The row right under that block is a header too when
/// it carries a unit token, as long as a data row remains after it.
pub fn estimate_headings(rows: &[Row], config: &ExtractorConfig) -> Headings {
    let markers = &config.markers;
    let footnote = footnote_begin_row(rows, markers, config.thresholds.superscript_footnote_rows);
    let body = &rows[..footnote];
    let max_row_cells = body.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let short_rows = body
        .iter()
        .take_while(|r| r.cells.len() < max_row_cells)
        .count();

    let mut heading = short_rows.saturating_sub(1);
    let next = heading + 1;
    if next + 1 < footnote && body[next].cells.iter().any(|p| markers.has_unit(&p.text)) {
        tracing::trace!(row = next, "unit row joins the header");
        heading = next;
    }

    Headings {
        heading_line_number: heading,
        footnote_begin_row: footnote,
        max_row_cells,
        head_columns: 0,
        stub: Vec::new(),
    }
}

/// Apply the classifier to the rows, count head columns and find the stub.
pub fn resolve_headings(
    estimate: &Headings,
    rows: &[Row],
    grid: &CellGrid,
    columns: &[Column],
    layout: &ColumnLayout,
    config: &ExtractorConfig,
    classifier: &dyn HeadingClassifier,
) -> Headings {
    let markers = &config.markers;
    let mut headings = estimate.clone();

    let row_features = row_features(rows, grid, headings.footnote_begin_row, markers);
    if let Some(first_data) = first_data_index(classifier, Axis::Rows, &row_features) {
        let heading = first_data.saturating_sub(1);
        if heading != headings.heading_line_number {
            tracing::debug!(
                estimate = headings.heading_line_number,
                heading,
                "classifier overrides heading rows"
            );
        }
        headings.heading_line_number = heading;
    }

    let data_rows = headings.heading_line_number + 1..headings.footnote_begin_row;
    let column_features = column_features(columns, data_rows.clone(), markers);
    let seed = first_data_index(classifier, Axis::Columns, &column_features)
        .unwrap_or_else(|| heuristic_head_columns(columns, data_rows.clone()));
    headings.head_columns = absorb_sparse_columns(columns, data_rows, seed, &config.thresholds)
        .max(1)
        .min(columns.len());

    headings.stub = find_stub(rows, headings.heading_line_number, headings.head_columns, layout);
    headings
}

fn first_data_index(
    classifier: &dyn HeadingClassifier,
    axis: Axis,
    features: &[FeatureRow],
) -> Option<usize> {
    let labels = classifier.classify(axis, features)?;
    if labels.len() != features.len() {
        tracing::warn!(
            %axis,
            expected = features.len(),
            got = labels.len(),
            "classifier label count mismatch, using rules"
        );
        return None;
    }
    labels.iter().position(|l| *l == HeadingLabel::Data)
}

fn populated_in(column: &Column, rows: std::ops::Range<usize>) -> usize {
    rows.filter(|&r| matches!(column.cells.get(r), Some(Some(_))))
        .count()
}

/// Leading columns with fewer populated data cells than the fullest column.
fn heuristic_head_columns(columns: &[Column], data_rows: std::ops::Range<usize>) -> usize {
    let counts: Vec<usize> = columns
        .iter()
        .map(|c| populated_in(c, data_rows.clone()))
        .collect();
    let max = counts.iter().copied().max().unwrap_or(0);
    counts.iter().take_while(|&&n| n < max).count().max(1)
}

/// Keep extending the head while the next column is much fuller than the
/// last head column.
fn absorb_sparse_columns(
    columns: &[Column],
    data_rows: std::ops::Range<usize>,
    seed: usize,
    t: &Thresholds,
) -> usize {
    let mut i = seed.max(1);
    while i < columns.len() {
        let prev = populated_in(&columns[i - 1], data_rows.clone()) as f32;
        let cur = populated_in(&columns[i], data_rows.clone()) as f32;
        if t.head_column_ratio * prev < cur {
            i += 1;
        } else {
            break;
        }
    }
    i
}

/// Header-row fragments lying entirely left of the first data column.
fn find_stub(
    rows: &[Row],
    heading_line_number: usize,
    head_columns: usize,
    layout: &ColumnLayout,
) -> Vec<PieceId> {
    let limit = if head_columns < layout.len() {
        layout.left(head_columns)
    } else {
        f32::INFINITY
    };
    rows.iter()
        .enumerate()
        .take(heading_line_number + 1)
        .flat_map(|(r, row)| {
            row.cells
                .iter()
                .enumerate()
                .filter(move |(_, p)| p.end_x < limit)
                .map(move |(index, _)| PieceId { row: r, index })
        })
        .collect()
}

fn is_numeric(text: &str) -> bool {
    let (digits, letters) = text.chars().fold((0usize, 0usize), |(d, l), c| {
        if c.is_ascii_digit() {
            (d + 1, l)
        } else if c.is_alphabetic() {
            (d, l + 1)
        } else {
            (d, l)
        }
    });
    digits > 0 && digits >= letters
}

pub fn row_features(
    rows: &[Row],
    grid: &CellGrid,
    footnote_begin_row: usize,
    markers: &Markers,
) -> Vec<FeatureRow> {
    rows.iter()
        .take(footnote_begin_row)
        .enumerate()
        .map(|(index, row)| {
            let n = row.cells.len().max(1) as f32;
            FeatureRow {
                index,
                fragment_count: row.cells.len(),
                populated_cells: grid
                    .cells
                    .get(index)
                    .map(|r| r.iter().filter(|c| !c.is_empty()).count())
                    .unwrap_or(0),
                numeric_ratio: row.cells.iter().filter(|p| is_numeric(&p.text)).count() as f32 / n,
                mean_height: row.cells.iter().map(|p| p.height).sum::<f32>() / n,
                has_unit: row.cells.iter().any(|p| markers.has_unit(&p.text)),
                superscript: row.superscript,
            }
        })
        .collect()
}

pub fn column_features(
    columns: &[Column],
    data_rows: std::ops::Range<usize>,
    markers: &Markers,
) -> Vec<FeatureRow> {
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let pieces: Vec<_> = column.populated().collect();
            let n = pieces.len().max(1) as f32;
            FeatureRow {
                index,
                fragment_count: pieces.len(),
                populated_cells: populated_in(column, data_rows.clone()),
                numeric_ratio: pieces.iter().filter(|p| is_numeric(&p.text)).count() as f32 / n,
                mean_height: pieces.iter().map(|p| p.height).sum::<f32>() / n,
                has_unit: pieces.iter().any(|p| markers.has_unit(&p.text)),
                superscript: false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TextPiece;
    use crate::structure::{assign_cells, build_columns};

    fn row(y: f32, cells: &[(&str, f32, f32)]) -> Row {
        Row {
            y,
            superscript: false,
            cells: cells
                .iter()
                .map(|(t, x, w)| TextPiece::new(*t, *x, y, *w, 10.0, 10.0))
                .collect(),
        }
    }

    fn accuracy_rows() -> Vec<Row> {
        vec![
            row(720.0, &[("Model", 72.0, 30.0), ("Acc", 200.0, 20.0)]),
            row(735.0, &[("Top-1", 200.0, 28.0), ("Top-5", 300.0, 28.0)]),
            row(750.0, &[("ResNet", 72.0, 36.0), ("76.1", 200.0, 20.0), ("92.9", 300.0, 20.0)]),
            row(765.0, &[("ViT-B", 72.0, 30.0), ("81.8", 200.0, 20.0), ("95.6", 300.0, 20.0)]),
            row(780.0, &[("ConvNeXt", 72.0, 48.0), ("82.1", 200.0, 20.0), ("96.0", 300.0, 20.0)]),
        ]
    }

    fn layout() -> ColumnLayout {
        let mut layout = ColumnLayout::new();
        for (b, e) in [(72.0, 120.0), (200.0, 228.0), (300.0, 328.0)] {
            layout.absorb(b, e, 6.0);
        }
        layout
    }

    struct Fixed(Vec<HeadingLabel>);

    impl HeadingClassifier for Fixed {
        fn classify(&self, axis: Axis, features: &[FeatureRow]) -> Option<Vec<HeadingLabel>> {
            match axis {
                Axis::Rows => Some(self.0.iter().copied().take(features.len()).collect()),
                Axis::Columns => None,
            }
        }
    }

    fn resolve(rows: &[Row], classifier: &dyn HeadingClassifier) -> Headings {
        let config = ExtractorConfig::default();
        let estimate = estimate_headings(rows, &config);
        let layout = layout();
        let grid = assign_cells(rows, estimate.footnote_begin_row, &layout);
        let columns = build_columns(rows, &layout);
        resolve_headings(
            &estimate,
            rows,
            &grid,
            &columns,
            &layout,
            &config,
            classifier,
        )
    }

    #[test]
    fn test_two_short_rows_give_heading_one() {
        let h = estimate_headings(&accuracy_rows(), &ExtractorConfig::default());
        assert_eq!(h.heading_line_number, 1);
        assert_eq!(h.footnote_begin_row, 5);
        assert_eq!(h.max_row_cells, 3);
    }

    #[test]
    fn test_full_first_row_gives_heading_zero() {
        let mut rows = accuracy_rows();
        rows[0] = row(720.0, &[("Model", 72.0, 30.0), ("Acc", 200.0, 20.0), ("F1", 300.0, 10.0)]);
        let h = estimate_headings(&rows, &ExtractorConfig::default());
        assert_eq!(h.heading_line_number, 0);
    }

    #[test]
    fn test_unit_row_extends_heading() {
        let mut rows = accuracy_rows();
        rows[0] = row(720.0, &[("Model", 72.0, 30.0), ("Acc", 200.0, 20.0), ("F1", 300.0, 10.0)]);
        rows[1] = row(735.0, &[("Top-1 (%)", 200.0, 28.0), ("Top-5", 300.0, 28.0)]);
        let h = estimate_headings(&rows, &ExtractorConfig::default());
        assert_eq!(h.heading_line_number, 1);

        // A unit further down the body does not move the heading.
        let mut rows = accuracy_rows();
        rows[3] = row(765.0, &[("ViT-B (s)", 72.0, 30.0), ("81.8", 200.0, 20.0), ("95.6", 300.0, 20.0)]);
        assert_eq!(estimate_headings(&rows, &ExtractorConfig::default()).heading_line_number, 1);
    }

    #[test]
    fn test_unit_row_keeps_one_data_row() {
        let rows = vec![
            row(720.0, &[("Model", 72.0, 30.0), ("Acc", 200.0, 20.0)]),
            row(735.0, &[("Time (ms)", 72.0, 40.0), ("12", 200.0, 10.0)]),
        ];
        let h = estimate_headings(&rows, &ExtractorConfig::default());
        assert_eq!(h.heading_line_number, 0);
        assert!(h.heading_line_number < h.footnote_begin_row);
    }

    #[test]
    fn test_footnote_markers() {
        let mut rows = accuracy_rows();
        rows.push(row(800.0, &[("* Single crop", 72.0, 60.0)]));
        assert_eq!(footnote_begin_row(&rows, &Markers::default(), 2), 5);

        let mut rows = accuracy_rows();
        let mut note = row(800.0, &[("a Measured on val", 72.0, 80.0)]);
        note.superscript = true;
        rows.push(note);
        assert_eq!(footnote_begin_row(&rows, &Markers::default(), 2), 5);

        // Without the raised marker an "a" row is data.
        let mut rows = accuracy_rows();
        rows.push(row(800.0, &[("accuracy mean", 72.0, 60.0)]));
        assert_eq!(footnote_begin_row(&rows, &Markers::default(), 2), 6);
    }

    #[test]
    fn test_rules_resolve_head_column_and_stub() {
        let rows = accuracy_rows();
        let h = resolve(&rows, &NullClassifier);
        assert_eq!(h.heading_line_number, 1);
        assert_eq!(h.head_columns, 1);
        assert_eq!(h.stub, vec![PieceId { row: 0, index: 0 }]);
    }

    #[test]
    fn test_classifier_overrides_heading_rows() {
        let rows = accuracy_rows();
        let labels = vec![
            HeadingLabel::Header,
            HeadingLabel::Data,
            HeadingLabel::Data,
            HeadingLabel::Data,
            HeadingLabel::Data,
        ];
        let h = resolve(&rows, &Fixed(labels));
        assert_eq!(h.heading_line_number, 0);
    }

    #[test]
    fn test_mismatched_labels_are_ignored() {
        let rows = accuracy_rows();
        let h = resolve(&rows, &Fixed(vec![HeadingLabel::Data]));
        assert_eq!(h.heading_line_number, 1);
    }

    #[test]
    fn test_sparse_first_column_pulls_next_into_head() {
        let columns = vec![
            Column { cells: vec![None, Some(TextPiece::new("g", 0.0, 0.0, 1.0, 1.0, 1.0)), None, None] },
            Column { cells: (0..4).map(|_| Some(TextPiece::new("v", 0.0, 0.0, 1.0, 1.0, 1.0))).collect() },
            Column { cells: (0..4).map(|_| Some(TextPiece::new("v", 0.0, 0.0, 1.0, 1.0, 1.0))).collect() },
        ];
        let t = Thresholds::default();
        assert_eq!(heuristic_head_columns(&columns, 0..4), 1);
        assert_eq!(absorb_sparse_columns(&columns, 0..4, 1, &t), 2);
    }

    #[test]
    fn test_numeric_detection() {
        assert!(is_numeric("76.1"));
        assert!(is_numeric("12.5%"));
        assert!(!is_numeric("ResNet"));
        assert!(!is_numeric("-"));
    }
}
