//! Line assembly: word fragments to line fragments.

use crate::calibrate::DocStats;
use crate::config::schema::Thresholds;
use crate::geometry::TextPiece;

/// Merge consecutive words of one page into lines.
///
/// A word continues the current line when it sits on (roughly) the same
/// baseline as the previous word, strictly to its right, and close enough.
pub fn assemble_lines(words: &[TextPiece], stats: &DocStats, t: &Thresholds) -> Vec<TextPiece> {
    let mut lines = Vec::new();
    let mut current: Option<TextPiece> = None;
    let mut prev: Option<&TextPiece> = None;

    for word in words {
        if let (Some(line), Some(p)) = (current.as_mut(), prev) {
            let gap = word.x - p.end_x;
            let continues = (word.y - p.y).abs() <= p.line_height()
                && word.x > p.x
                && (gap < stats.avg_char_width * t.line_merge_char_factor
                    || gap < t.line_merge_max_gap);

            if continues {
                // A lone raised glyph followed by normal text: footnote marker.
                if line.text.chars().count() == 1
                    && word.x_scale > p.x_scale
                    && word.y > p.y
                    && p.y + p.x_scale > word.y
                {
                    line.superscript_start = true;
                }
                if word.x - line.end_x > t.space_insert_gap {
                    line.text.push(' ');
                }
                line.text.push_str(&word.text);
                line.end_x = word.end_x;
                line.y = word.y;
                line.end_y = word.end_y;
                line.width += word.width;
                line.x_scale = line.x_scale.max(word.x_scale);
                prev = Some(word);
                continue;
            }
        }

        if let Some(line) = current.take() {
            lines.push(line);
        }
        if word.text.is_empty() || word.text == " " {
            prev = None;
            continue;
        }

        let mut line = word.clone();
        line.sparse_line = true;
        line.superscript_start = false;
        current = Some(line);
        prev = Some(word);
    }

    if let Some(line) = current {
        lines.push(line);
    }
    lines
}

/// Drop whitespace-only lines that sit strictly between their neighbours.
pub fn remove_blank_lines(lines: &mut Vec<TextPiece>) {
    let mut i = 1;
    while i + 1 < lines.len() {
        let isolated = lines[i].is_blank()
            && lines[i - 1].end_y < lines[i].y
            && lines[i].end_y < lines[i + 1].y;
        if isolated {
            lines.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Mean glyph width of body-scale lines across the document.
pub fn average_line_width(pages: &[Vec<TextPiece>], body_scale: f32, t: &Thresholds) -> f32 {
    let (total, count) = pages
        .iter()
        .flatten()
        .filter(|l| l.scale() == body_scale)
        .fold((0.0f32, 0usize), |(sum, n), l| (sum + l.width, n + 1));

    if count == 0 {
        return t.fallback_line_width;
    }
    let mean = total / count as f32;
    if mean < t.min_average_line_width {
        t.fallback_line_width
    } else {
        mean
    }
}

/// Clear the sparse flag on wide lines that are vertically isolated from
/// both neighbours, i.e. ordinary paragraph lines.
pub fn mark_sparse_lines(lines: &mut [TextPiece], average_width: f32, t: &Thresholds) {
    if lines.len() < 3 {
        return;
    }
    for i in 1..lines.len() - 1 {
        let above = (lines[i].y - lines[i - 1].y).abs();
        let below = (lines[i + 1].y - lines[i].y).abs();
        if lines[i].width >= average_width
            && above > t.sparse_line_min_gap
            && below > t.sparse_line_min_gap
        {
            lines[i].sparse_line = false;
        }
    }
}
