//! Multi-level header hierarchies.
//!
//! Column headers stack as rows, row headers as columns. Each pair of
//! adjacent levels is linked by assigning every lower fragment to one upper
//! fragment, with the assignment strategy picked from how the headers line up
//! with the column bands.

use crate::candidate::{Column, Headings, PieceId, Row};
use crate::config::schema::Thresholds;
use crate::geometry::TextPiece;
use crate::model::{Alignment, HeaderNode, HeaderTree};
use crate::structure::columns::ColumnLayout;

/// How a run of children is matched to its parent along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Parent and first child start together; a parent owns everything up
    /// to where the next parent starts.
    Leading,
    /// Parent and last child end together.
    Trailing,
    /// Children sit symmetrically under the parent's centre.
    Center,
}

impl From<Alignment> for Strategy {
    fn from(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Left | Alignment::Top => Strategy::Leading,
            Alignment::Right => Strategy::Trailing,
            Alignment::Center => Strategy::Center,
        }
    }
}

/// Decide alignment from accumulated edge deviations. Left edges wandering
/// much more than right edges means the text is right aligned, and the
/// reverse.
pub fn classify_alignment(left_deviation: f32, right_deviation: f32, ratio: f32) -> Alignment {
    let max = left_deviation.max(right_deviation);
    if max == 0.0 {
        return Alignment::Center;
    }
    let skew = left_deviation.min(right_deviation) / max;
    if skew < ratio && left_deviation > right_deviation {
        Alignment::Right
    } else if skew < ratio && left_deviation < right_deviation {
        Alignment::Left
    } else {
        Alignment::Center
    }
}

/// Sum of left and right edge deviations of header fragments from the bands
/// they fall in. The first fragment of each level is skipped.
pub fn edge_deviations(levels: &[Vec<TextPiece>], layout: &ColumnLayout, tolerance: f32) -> (f32, f32) {
    let bands = layout.bands();
    let mut left = 0.0f32;
    let mut right = 0.0f32;
    for piece in levels.iter().flat_map(|level| level.iter().skip(1)) {
        if let Some(band) = bands.iter().rev().find(|b| b.left <= piece.x) {
            left += (piece.x - band.left).abs();
        }
        if let Some(band) = bands.iter().find(|b| b.right + tolerance >= piece.end_x) {
            right += (piece.end_x - band.right).abs();
        }
    }
    (left, right)
}

fn spans_several(upper: &[TextPiece], lower: &[TextPiece]) -> bool {
    upper
        .iter()
        .any(|u| lower.iter().filter(|l| u.overlaps_horizontally(l)).count() > 1)
}

fn continues_text(upper: &str, lower: &str) -> bool {
    let upper = upper.trim();
    let lower = lower.trim();
    let cased = upper.chars().next().is_some_and(char::is_uppercase)
        && lower.chars().next().is_some_and(char::is_lowercase);
    cased
        || upper.ends_with('-')
        || upper.ends_with('&')
        || lower.starts_with('(')
        || lower.starts_with('%')
}

/// Collapse header levels that are really one wrapped header.
///
/// When no upper fragment bridges several lower ones, a level with at least
/// as many fragments absorbs the level below it. A sparser upper level is
/// folded down into the lower one when any upper/lower pair reads as one
/// phrase.
pub fn merge_sub_headers(levels: &[Vec<TextPiece>]) -> Vec<Vec<TextPiece>> {
    let mut levels: Vec<Vec<TextPiece>> = levels.to_vec();
    let mut i = 0;
    while i + 1 < levels.len() {
        if spans_several(&levels[i], &levels[i + 1]) {
            i += 1;
            continue;
        }

        if levels[i].len() >= levels[i + 1].len() {
            let lower = levels.remove(i + 1);
            let upper = &mut levels[i];
            for piece in lower {
                match upper.iter_mut().find(|u| u.overlaps_horizontally(&piece)) {
                    Some(u) => u.merge(&piece),
                    None => upper.push(piece),
                }
            }
            upper.sort_by(|a, b| a.x.total_cmp(&b.x));
            continue;
        }

        let foldable = levels[i]
            .iter()
            .any(|u| levels[i + 1].iter().any(|l| continues_text(&u.text, &l.text)));
        if foldable {
            let upper = levels.remove(i);
            for l in levels[i].iter_mut() {
                if let Some(u) = upper.iter().find(|u| u.overlaps_horizontally(l)) {
                    *l = u.merged(l);
                }
            }
            continue;
        }
        i += 1;
    }
    levels
}

/// Assign each child extent to a parent extent, both sorted along the axis.
///
/// The last parent takes every child not claimed by an earlier one.
pub fn assign_children(
    parents: &[(f32, f32)],
    children: &[(f32, f32)],
    strategy: Strategy,
    tolerance: f32,
) -> Vec<Option<usize>> {
    let mut owner = vec![None; children.len()];
    let Some(last) = parents.len().checked_sub(1) else {
        return owner;
    };

    match strategy {
        Strategy::Leading => {
            let mut k = 0;
            for p in 0..last {
                let next_start = parents[p + 1].0;
                while k < children.len() && children[k].1 <= next_start + tolerance {
                    owner[k] = Some(p);
                    k += 1;
                }
            }
            owner[k..].iter_mut().for_each(|o| *o = Some(last));
        }
        Strategy::Trailing => {
            let mut k = children.len();
            for p in (1..=last).rev() {
                let prev_end = parents[p - 1].1;
                while k > 0 && children[k - 1].0 >= prev_end - tolerance {
                    k -= 1;
                    owner[k] = Some(p);
                }
            }
            owner[..k].iter_mut().for_each(|o| *o = Some(0));
        }
        Strategy::Center => {
            let mut k = 0;
            for (p, &(start, end)) in parents.iter().enumerate().take(last) {
                if k >= children.len() {
                    break;
                }
                // Mirror the first child's start around the parent's centre.
                let bound = start + end - children[k].0;
                if children[k].0 >= bound {
                    continue;
                }
                while k < children.len() && children[k].0 < bound + tolerance {
                    owner[k] = Some(p);
                    k += 1;
                }
            }
            owner[k..].iter_mut().for_each(|o| *o = Some(last));
        }
    }
    owner
}

#[derive(Clone, Copy)]
enum Direction {
    Horizontal,
    Vertical,
}

fn build_tree(
    levels: &[Vec<TextPiece>],
    alignment: Alignment,
    direction: Direction,
    tolerance: f32,
) -> HeaderTree {
    let mut nodes: Vec<HeaderNode> = Vec::new();
    let mut level_start = Vec::with_capacity(levels.len());
    for (level, pieces) in levels.iter().enumerate() {
        level_start.push(nodes.len());
        nodes.extend(pieces.iter().map(|p| HeaderNode {
            text: p.text.clone(),
            x: p.x,
            end_x: p.end_x,
            y: p.y,
            end_y: p.end_y,
            level,
            parent: None,
            children: Vec::new(),
        }));
    }

    let extent = |p: &TextPiece| match direction {
        Direction::Horizontal => (p.x, p.end_x),
        Direction::Vertical => (p.y, p.end_y),
    };
    let strategy = Strategy::from(alignment);
    for level in 1..levels.len() {
        let parents: Vec<(f32, f32)> = levels[level - 1].iter().map(extent).collect();
        let children: Vec<(f32, f32)> = levels[level].iter().map(extent).collect();
        let owners = assign_children(&parents, &children, strategy, tolerance);
        for (c, owner) in owners.into_iter().enumerate() {
            let Some(p) = owner else { continue };
            let (parent, child) = (level_start[level - 1] + p, level_start[level] + c);
            nodes[child].parent = Some(parent);
            nodes[parent].children.push(child);
        }
    }

    HeaderTree { alignment, nodes }
}

/// Column-header hierarchy from the header rows, stub excluded. `None` when
/// fewer than two header levels remain.
pub fn column_header_tree(
    rows: &[Row],
    headings: &Headings,
    layout: &ColumnLayout,
    t: &Thresholds,
) -> Option<HeaderTree> {
    let levels: Vec<Vec<TextPiece>> = rows
        .iter()
        .enumerate()
        .take(headings.heading_line_number + 1)
        .map(|(r, row)| {
            row.cells
                .iter()
                .enumerate()
                .filter(|(index, _)| !headings.stub.contains(&PieceId { row: r, index: *index }))
                .map(|(_, p)| p.clone())
                .collect::<Vec<_>>()
        })
        .filter(|level| !level.is_empty())
        .collect();

    let levels = merge_sub_headers(&levels);
    if levels.len() < 2 {
        return None;
    }

    let (left, right) = edge_deviations(&levels, layout, t.alignment_tolerance);
    let alignment = classify_alignment(left, right, t.alignment_ratio);
    tracing::trace!(left, right, %alignment, "column header alignment");
    Some(build_tree(&levels, alignment, Direction::Horizontal, t.alignment_tolerance))
}

/// Row-header hierarchy from the head columns over the data rows. Only built
/// with two or more head columns.
pub fn row_header_tree(columns: &[Column], headings: &Headings, t: &Thresholds) -> Option<HeaderTree> {
    if headings.head_columns < 2 {
        return None;
    }
    let data_rows = headings.heading_line_number + 1..headings.footnote_begin_row;
    let first_data = data_rows.start;

    let levels: Vec<Vec<TextPiece>> = columns
        .iter()
        .take(headings.head_columns)
        .map(|column| {
            column
                .cells
                .iter()
                .enumerate()
                .filter(|(r, _)| data_rows.contains(r))
                .filter_map(|(_, cell)| cell.clone())
                .collect::<Vec<_>>()
        })
        .filter(|level| !level.is_empty())
        .collect();
    if levels.len() < 2 {
        return None;
    }

    let first = |c: usize| columns.get(c).and_then(|col| col.cells.get(first_data)).and_then(Option::as_ref);
    let alignment = match (first(0), first(1)) {
        (Some(a), Some(b)) if !a.overlaps_vertically(b) => Alignment::Center,
        _ => Alignment::Top,
    };
    Some(build_tree(&levels, alignment, Direction::Vertical, t.alignment_tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(text: &str, x: f32, y: f32, width: f32) -> TextPiece {
        TextPiece::new(text, x, y, width, 10.0, 10.0)
    }

    fn layout(bands: &[(f32, f32)]) -> ColumnLayout {
        let mut layout = ColumnLayout::new();
        for &(b, e) in bands {
            layout.absorb(b, e, 6.0);
        }
        layout
    }

    #[test]
    fn test_alignment_from_deviation_ratio() {
        assert_eq!(classify_alignment(17.0, 10.0, 0.6), Alignment::Right);
        assert_eq!(classify_alignment(10.0, 17.0, 0.6), Alignment::Left);
        assert_eq!(classify_alignment(10.0, 11.0, 0.6), Alignment::Center);
        assert_eq!(classify_alignment(0.0, 0.0, 0.6), Alignment::Center);
    }

    #[test]
    fn test_right_aligned_headers_detected() {
        // Headers flush with the right edge of wide numeric columns.
        let bands = layout(&[(72.0, 120.0), (200.0, 260.0), (300.0, 360.0)]);
        let levels = vec![
            vec![piece("Group", 72.0, 720.0, 30.0), piece("Scores", 220.0, 720.0, 140.0)],
            vec![piece("Id", 72.0, 735.0, 10.0), piece("Top-1", 232.0, 735.0, 28.0), piece("Top-5", 332.0, 735.0, 28.0)],
        ];
        let (left, right) = edge_deviations(&levels, &bands, 3.0);
        assert!(left > right);
        assert_eq!(classify_alignment(left, right, 0.6), Alignment::Right);
    }

    #[test]
    fn test_leading_assignment() {
        let parents = [(100.0, 140.0), (200.0, 240.0)];
        let children = [(100.0, 120.0), (150.0, 170.0), (200.0, 220.0), (250.0, 270.0)];
        let owners = assign_children(&parents, &children, Strategy::Leading, 3.0);
        assert_eq!(owners, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_trailing_assignment() {
        let parents = [(100.0, 170.0), (230.0, 270.0)];
        let children = [(100.0, 120.0), (150.0, 170.0), (200.0, 220.0), (250.0, 270.0)];
        let owners = assign_children(&parents, &children, Strategy::Trailing, 3.0);
        assert_eq!(owners, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_center_assignment() {
        let parents = [(110.0, 180.0), (260.0, 330.0)];
        let children = [(100.0, 140.0), (150.0, 190.0), (250.0, 290.0), (300.0, 340.0)];
        let owners = assign_children(&parents, &children, Strategy::Center, 3.0);
        assert_eq!(owners, vec![Some(0), Some(0), Some(1), Some(1)]);
    }

    #[test]
    fn test_last_parent_absorbs_remaining_children() {
        // More children trail the last parent than its own span covers.
        let parents = [(100.0, 140.0), (200.0, 240.0)];
        let children = [
            (100.0, 140.0),
            (200.0, 215.0),
            (225.0, 240.0),
            (300.0, 320.0),
            (400.0, 420.0),
        ];
        for strategy in [Strategy::Leading, Strategy::Center] {
            let owners = assign_children(&parents, &children, strategy, 3.0);
            assert_eq!(owners[0], Some(0), "{strategy:?}");
            assert!(owners[1..].iter().all(|o| *o == Some(1)), "{strategy:?}");
        }
    }

    #[test]
    fn test_center_skips_parent_without_children() {
        // The first child starts right of the first parent's centre.
        let parents = [(100.0, 140.0), (200.0, 300.0)];
        let children = [(130.0, 150.0), (210.0, 230.0)];
        let owners = assign_children(&parents, &children, Strategy::Center, 3.0);
        assert_eq!(owners, vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_no_parents_assigns_nothing() {
        let owners = assign_children(&[], &[(0.0, 1.0)], Strategy::Leading, 3.0);
        assert_eq!(owners, vec![None]);
    }

    #[test]
    fn test_wrapped_header_level_merges_up() {
        let levels = vec![
            vec![piece("Training", 200.0, 720.0, 40.0), piece("Peak", 300.0, 720.0, 25.0)],
            vec![piece("time", 205.0, 732.0, 20.0), piece("memory", 300.0, 732.0, 35.0)],
        ];
        let merged = merge_sub_headers(&levels);
        assert_eq!(merged.len(), 1);
        let texts: Vec<&str> = merged[0].iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Training time", "Peak memory"]);
        // The input is left untouched.
        assert_eq!(levels[0][0].text, "Training");
    }

    #[test]
    fn test_unit_line_folds_into_lower_level() {
        let levels = vec![
            vec![piece("Dose", 200.0, 720.0, 20.0)],
            vec![piece("(mg)", 200.0, 732.0, 20.0), piece("Time", 300.0, 732.0, 20.0)],
        ];
        let merged = merge_sub_headers(&levels);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0][0].text, "Dose (mg)");
        assert_eq!(merged[0][1].text, "Time");
    }

    #[test]
    fn test_one_continuation_folds_whole_level() {
        let levels = vec![
            vec![piece("Peak", 200.0, 720.0, 25.0), piece("Batch", 300.0, 720.0, 25.0)],
            vec![
                piece("memory", 200.0, 732.0, 35.0),
                piece("Size", 300.0, 732.0, 20.0),
                piece("Time", 400.0, 732.0, 20.0),
            ],
        ];
        let merged = merge_sub_headers(&levels);
        assert_eq!(merged.len(), 1);
        let texts: Vec<&str> = merged[0].iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Peak memory", "Batch Size", "Time"]);
    }

    #[test]
    fn test_spanning_parent_keeps_levels() {
        let levels = vec![
            vec![piece("Accuracy", 200.0, 720.0, 128.0)],
            vec![piece("Top-1", 200.0, 735.0, 28.0), piece("Top-5", 300.0, 735.0, 28.0)],
        ];
        assert_eq!(merge_sub_headers(&levels).len(), 2);
    }

    fn row(y: f32, cells: &[(&str, f32, f32)]) -> Row {
        Row {
            y,
            superscript: false,
            cells: cells.iter().map(|(t, x, w)| piece(t, *x, y, *w)).collect(),
        }
    }

    #[test]
    fn test_column_tree_for_spanning_header() {
        let rows = vec![
            row(720.0, &[("Accuracy", 200.0, 128.0)]),
            row(735.0, &[("Top-1", 200.0, 28.0), ("Top-5", 300.0, 28.0)]),
            row(750.0, &[("ResNet", 72.0, 36.0), ("76.1", 200.0, 20.0), ("92.9", 300.0, 20.0)]),
        ];
        let headings = Headings {
            heading_line_number: 1,
            footnote_begin_row: 3,
            max_row_cells: 3,
            head_columns: 1,
            stub: Vec::new(),
        };
        let layout = layout(&[(72.0, 120.0), (200.0, 228.0), (300.0, 328.0)]);
        let tree = column_header_tree(&rows, &headings, &layout, &Thresholds::default()).unwrap();
        assert_eq!(tree.alignment, Alignment::Center);
        assert_eq!(tree.child_texts("Accuracy"), vec!["Top-1", "Top-5"]);
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn test_single_header_row_has_no_tree() {
        let rows = vec![
            row(720.0, &[("Model", 72.0, 30.0), ("Acc", 200.0, 20.0)]),
            row(735.0, &[("ResNet", 72.0, 36.0), ("76.1", 200.0, 20.0)]),
        ];
        let headings = Headings {
            heading_line_number: 0,
            footnote_begin_row: 2,
            max_row_cells: 2,
            head_columns: 1,
            stub: vec![PieceId { row: 0, index: 0 }],
        };
        let layout = layout(&[(72.0, 120.0), (200.0, 228.0)]);
        assert!(column_header_tree(&rows, &headings, &layout, &Thresholds::default()).is_none());
    }

    #[test]
    fn test_row_tree_groups_by_top_alignment() {
        let group_a = piece("Vision", 72.0, 750.0, 30.0);
        let group_b = piece("Text", 72.0, 780.0, 20.0);
        let column0 = Column {
            cells: vec![None, Some(group_a), None, Some(group_b), None],
        };
        let column1 = Column {
            cells: vec![
                None,
                Some(piece("ResNet", 120.0, 750.0, 36.0)),
                Some(piece("ViT-B", 120.0, 765.0, 30.0)),
                Some(piece("BERT", 120.0, 780.0, 24.0)),
                Some(piece("T5", 120.0, 795.0, 12.0)),
            ],
        };
        let headings = Headings {
            heading_line_number: 0,
            footnote_begin_row: 5,
            max_row_cells: 3,
            head_columns: 2,
            stub: Vec::new(),
        };
        let tree = row_header_tree(&[column0, column1], &headings, &Thresholds::default()).unwrap();
        assert_eq!(tree.alignment, Alignment::Top);
        assert_eq!(tree.child_texts("Vision"), vec!["ResNet", "ViT-B"]);
        assert_eq!(tree.child_texts("Text"), vec!["BERT", "T5"]);
    }

    #[test]
    fn test_row_tree_needs_two_head_columns() {
        let headings = Headings {
            heading_line_number: 0,
            footnote_begin_row: 2,
            max_row_cells: 2,
            head_columns: 1,
            stub: Vec::new(),
        };
        assert!(row_header_tree(&[], &headings, &Thresholds::default()).is_none());
    }
}
