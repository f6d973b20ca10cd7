use crate::candidate::{CellGrid, Row};
use crate::geometry::TextPiece;
use crate::structure::columns::ColumnLayout;

/// Distribute the fragments of rows `0..footnote_begin_row` over the column
/// bands.
///
/// Fragments inside a single band are placed first. A fragment reaching into
/// several bands then fills the band it overlaps most; when any of the other
/// bands it reaches is still empty on that row, the text is copied there too
/// and every band involved is marked crossed.
pub fn assign_cells(rows: &[Row], footnote_begin_row: usize, layout: &ColumnLayout) -> CellGrid {
    let n_rows = footnote_begin_row.min(rows.len());
    let n_cols = layout.len();
    let mut cells = vec![vec![String::new(); n_cols]; n_rows];
    let mut crossed = vec![vec![false; n_cols]; n_rows];

    for (r, row) in rows[..n_rows].iter().enumerate() {
        let mut spanning: Vec<(&TextPiece, Vec<usize>)> = Vec::new();

        for piece in &row.cells {
            let bands: Vec<usize> = (0..n_cols)
                .filter(|&c| piece.overlaps_band(layout.left(c), layout.right(c)))
                .collect();
            match bands.len() {
                0 => {
                    if let Some(c) = nearest_band(piece, layout) {
                        append(&mut cells[r][c], &piece.text);
                    }
                }
                1 => append(&mut cells[r][bands[0]], &piece.text),
                _ => spanning.push((piece, bands)),
            }
        }

        for (piece, bands) in spanning {
            let primary = bands
                .iter()
                .copied()
                .max_by(|&a, &b| overlap(piece, layout, a).total_cmp(&overlap(piece, layout, b)))
                .unwrap_or(bands[0]);
            let empty: Vec<usize> = bands
                .iter()
                .copied()
                .filter(|&c| c != primary && cells[r][c].is_empty())
                .collect();

            append(&mut cells[r][primary], &piece.text);
            if !empty.is_empty() {
                crossed[r][primary] = true;
                for c in empty {
                    append(&mut cells[r][c], &piece.text);
                    crossed[r][c] = true;
                }
            }
        }
    }

    CellGrid { cells, crossed }
}

fn append(cell: &mut String, text: &str) {
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

fn overlap(piece: &TextPiece, layout: &ColumnLayout, column: usize) -> f32 {
    (piece.end_x.min(layout.right(column)) - piece.x.max(layout.left(column))).max(0.0)
}

fn nearest_band(piece: &TextPiece, layout: &ColumnLayout) -> Option<usize> {
    let distance = |c: usize| {
        if piece.end_x <= layout.left(c) {
            layout.left(c) - piece.end_x
        } else {
            piece.x - layout.right(c)
        }
    };
    (0..layout.len()).min_by(|&a, &b| distance(a).total_cmp(&distance(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn layout() -> ColumnLayout {
        let mut layout = ColumnLayout::new();
        for (b, e) in [(72.0, 120.0), (200.0, 228.0), (300.0, 328.0)] {
            layout.absorb(b, e, 6.0);
        }
        layout
    }

    #[test]
    fn test_plain_cells_land_in_their_band() {
        let rows = vec![row(750.0, &[("ResNet", 72.0, 36.0), ("76.1", 200.0, 20.0), ("92.9", 300.0, 20.0)])];
        let grid = assign_cells(&rows, 1, &layout());
        assert_eq!(grid.cells[0], vec!["ResNet", "76.1", "92.9"]);
        assert!(grid.crossed[0].iter().all(|c| !c));
    }

    #[test]
    fn test_spanning_header_fills_empty_neighbour() {
        let rows = vec![
            row(720.0, &[("Model", 72.0, 30.0), ("Accuracy", 200.0, 128.0)]),
            row(750.0, &[("ResNet", 72.0, 36.0), ("76.1", 200.0, 20.0), ("92.9", 300.0, 20.0)]),
        ];
        let grid = assign_cells(&rows, 2, &layout());
        assert_eq!(grid.cells[0], vec!["Model", "Accuracy", "Accuracy"]);
        assert_eq!(grid.crossed[0], vec![false, true, true]);
        assert!(grid.crossed[1].iter().all(|c| !c));
    }

    #[test]
    fn test_spanning_piece_without_room_goes_to_primary() {
        let rows = vec![row(
            720.0,
            &[("a", 72.0, 20.0), ("b", 200.0, 20.0), ("wide note", 210.0, 100.0), ("c", 315.0, 10.0)],
        )];
        let grid = assign_cells(&rows, 1, &layout());
        assert_eq!(grid.cells[0], vec!["a", "b wide note", "c"]);
        assert!(grid.crossed[0].iter().all(|c| !c));
    }

    #[test]
    fn test_stray_piece_goes_to_nearest_band() {
        let rows = vec![row(720.0, &[("x", 150.0, 10.0)])];
        let grid = assign_cells(&rows, 1, &layout());
        assert_eq!(grid.cells[0], vec!["x", "", ""]);
    }

    #[test]
    fn test_footnote_rows_excluded() {
        let rows = vec![
            row(720.0, &[("a", 72.0, 20.0)]),
            row(735.0, &[("* note", 72.0, 40.0)]),
        ];
        let grid = assign_cells(&rows, 1, &layout());
        assert_eq!(grid.cells.len(), 1);
    }
}
