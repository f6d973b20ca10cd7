use crate::calibrate::DocStats;
use crate::candidate::{BodySpan, CaptionSpan, Rejection, Row};
use crate::config::schema::Thresholds;
use crate::geometry::TextPiece;
use crate::model::CaptionLocation;

/// Group the body's line fragments into rows by vertical proximity.
///
/// Lines are visited top to bottom, then left to right. A line joins the
/// current row when its baseline is less than half a line gap below the
/// row's first line. Lines on the caption's side of the caption are ignored.
pub fn cluster_rows(
    lines: &[TextPiece],
    caption: &CaptionSpan,
    body: &BodySpan,
    location: CaptionLocation,
    stats: &DocStats,
    t: &Thresholds,
) -> Result<Vec<Row>, Rejection> {
    let caption_y = lines[caption.start_line].y;
    let caption_end_y = lines[caption.end_line].end_y;

    let mut body_lines: Vec<&TextPiece> = lines[body.start_line..=body.end_line]
        .iter()
        .filter(|l| match location {
            CaptionLocation::Above => l.y >= caption_y,
            CaptionLocation::Below => l.end_y <= caption_end_y,
        })
        .collect();
    body_lines.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));

    let threshold = stats.avg_line_gap * t.row_gap_factor;
    let mut rows: Vec<Row> = Vec::new();
    for line in body_lines {
        match rows.last_mut() {
            Some(row) if line.y - row.y < threshold => {
                row.superscript |= line.superscript_start;
                row.cells.push(line.clone());
            }
            _ => rows.push(Row {
                y: line.y,
                superscript: line.superscript_start,
                cells: vec![line.clone()],
            }),
        }
    }

    for row in &mut rows {
        row.cells.sort_by(|a, b| a.x.total_cmp(&b.x));
    }

    if rows.len() < t.min_rows {
        return Err(Rejection::TooFewRows { rows: rows.len() });
    }
    Ok(rows)
}
