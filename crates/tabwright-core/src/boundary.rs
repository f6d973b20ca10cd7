//! Caption and body boundary detection.
//!
//! Runs three stages on a keyword line: fold the caption, decide whether the
//! caption sits above or below its table, then grow the body away from the
//! caption line by line.

use crate::candidate::{BodySpan, CaptionSpan, Rejection};
use crate::geometry::TextPiece;
use crate::model::CaptionLocation;
use crate::pipeline::PageContext;

/// Fold lines into the caption starting at the keyword line `start`.
pub fn scan_caption(ctx: &PageContext<'_>, start: usize) -> Result<CaptionSpan, Rejection> {
    let lines = ctx.lines;
    let t = &ctx.config.thresholds;
    let stats = ctx.stats;
    let first = &lines[start];

    if first.x < 0.0 && first.width == 0.0 {
        return Err(Rejection::ReversedText);
    }

    let keyword = ctx
        .config
        .keywords
        .table_prefix(&first.stripped_text())
        .unwrap_or_default()
        .to_string();
    let gap = stats.avg_line_gap;
    let quarter_width = stats.text_width() / t.caption_wrap_width_divisor;

    let mut text = format!("{} ", first.text);
    let mut end = start;
    for i in start + 1..lines.len() {
        let prev = &lines[i - 1];
        let cur = &lines[i];
        let y_diff = cur.y - prev.y;
        let near_below = y_diff > 0.0 && y_diff <= gap * t.caption_gap_factor;

        let same_baseline = y_diff == 0.0;
        let wrapped_wide = near_below
            && !cur.stripped_text().starts_with(keyword.as_str())
            && cur.x < prev.end_x
            && cur.width >= quarter_width;
        let wrapped_close = y_diff.abs() < gap * t.caption_wrap_gap_ratio
            && cur.x - prev.end_x <= stats.avg_x_gap * t.caption_x_gap_factor;
        let short_tail = near_below
            && cur.x < prev.end_x
            && cur.width < quarter_width
            && prev.width > quarter_width;

        let continues = same_baseline || wrapped_wide || wrapped_close || short_tail;
        if !continues && stripped_len(&text) >= t.caption_min_chars {
            break;
        }
        text.push_str(&cur.text);
        text.push(' ');
        end = i;
    }

    let line_count = end - start + 1;
    if line_count > t.max_caption_lines {
        return Err(Rejection::CaptionTooLong { lines: line_count });
    }
    if ctx.config.keywords.is_contents_caption(&text) {
        return Err(Rejection::TableOfContents);
    }

    let (x, end_x) = extent(&lines[start..=end]);
    let mut caption = CaptionSpan {
        start_line: start,
        end_line: end,
        text,
        keyword,
        x,
        end_x,
        wide: false,
    };
    caption.wide = is_wide_caption(ctx, &caption);
    Ok(caption)
}

/// A caption that starts in the second quarter of the text block, or is much
/// wider than one text column, belongs to a page-wide table.
pub fn is_wide_caption(ctx: &PageContext<'_>, caption: &CaptionSpan) -> bool {
    let stats = ctx.stats;
    let t = &ctx.config.thresholds;
    let text_width = stats.text_width();
    let indent_floor =
        (text_width - t.wide_caption_indent_margin) / t.wide_caption_indent_divisor + stats.min_x;

    (caption.x > indent_floor && caption.x < text_width / t.wide_caption_x_limit_divisor)
        || caption.width() > text_width / t.wide_caption_width_ratio
}

/// Sorted vertical positions of the words in the caption's half of the page,
/// collapsing positions closer than half a line gap.
pub fn distinct_line_positions(ctx: &PageContext<'_>, caption: &CaptionSpan) -> Vec<f32> {
    let stats = ctx.stats;
    let (x0, x1) = if !caption.wide && caption.x >= stats.middle_x {
        (stats.middle_x, stats.max_x)
    } else {
        (stats.min_x, stats.middle_x)
    };

    let mut ys: Vec<f32> = ctx
        .words
        .iter()
        .filter(|w| w.x >= x0 && w.end_x <= x1)
        .map(|w| w.y)
        .collect();
    ys.sort_by(|a, b| a.total_cmp(b));

    let min_step = stats.avg_line_gap * ctx.config.thresholds.row_gap_factor;
    let mut distinct: Vec<f32> = Vec::new();
    let mut last = 0.0f32;
    for y in ys {
        if y - last >= min_step {
            distinct.push(y);
            last = y;
        }
    }
    distinct
}

/// Decide whether the caption heads its table or trails it.
pub fn classify_location(
    ctx: &PageContext<'_>,
    caption: &CaptionSpan,
    positions: &[f32],
) -> CaptionLocation {
    let lines = ctx.lines;
    let t = &ctx.config.thresholds;
    let caption_y = lines[caption.start_line].y;
    let caption_end_y = lines[caption.end_line].end_y;

    let idx = positions
        .iter()
        .position(|&y| y == caption_y)
        .unwrap_or_else(|| positions.partition_point(|&y| y < caption_y));
    let end_idx = idx + caption.line_count() - 1;
    let remaining = positions.len().saturating_sub(end_idx);

    if remaining < t.min_lines_below_caption || caption_end_y > t.caption_bottom_y {
        return CaptionLocation::Below;
    }

    let window = t.density_window;
    if window == 0 || remaining <= window || idx <= window {
        return CaptionLocation::Above;
    }

    let top = positions[idx + 1 - window];
    let caption_top = positions[idx];
    let figure_above = lines.iter().any(|l| {
        l.y >= top && l.end_y < caption_top && ctx.config.keywords.is_figure(&l.stripped_text())
    });
    if figure_above {
        return CaptionLocation::Above;
    }

    // Only the window above is widened for narrow captions.
    let test_end_x = if caption.width() < t.narrow_caption_width {
        caption.x + t.narrow_caption_window
    } else {
        caption.end_x
    };
    let in_band = |end_x: f32| move |w: &&TextPiece| w.x >= caption.x && w.end_x <= end_x;

    let above: usize = ctx
        .words
        .iter()
        .filter(in_band(test_end_x))
        .filter(|w| w.y >= top && w.end_y < caption_top)
        .map(|w| w.text.chars().count())
        .sum();

    let caption_bottom = positions[end_idx];
    let bottom = positions[end_idx + window];
    let below: usize = ctx
        .words
        .iter()
        .filter(in_band(caption.end_x))
        .filter(|w| w.y > caption_bottom && w.end_y <= bottom)
        .map(|w| w.text.chars().count())
        .sum();

    tracing::debug!(above, below, "caption density comparison");
    if above < below {
        CaptionLocation::Below
    } else {
        CaptionLocation::Above
    }
}

/// Widest line the body accepts without further evidence.
pub fn max_cell_width(ctx: &PageContext<'_>, caption: &CaptionSpan) -> f32 {
    let t = &ctx.config.thresholds;
    let relaxed = (caption.x > t.wide_caption_x_min && caption.x < t.wide_caption_x_max)
        || caption.width() > t.wide_caption_width;
    if relaxed {
        ctx.average_line_width / t.relaxed_cell_width_divisor
    } else {
        ctx.average_line_width / t.cell_width_divisor
    }
}

/// Grow the body away from the caption.
///
/// `previous_end` is the last line index claimed by an earlier table on the
/// same page; backward growth never crosses it.
pub fn grow_body(
    ctx: &PageContext<'_>,
    caption: &CaptionSpan,
    location: CaptionLocation,
    previous_end: Option<usize>,
) -> Result<BodySpan, Rejection> {
    let lines = ctx.lines;
    let t = &ctx.config.thresholds;
    let max_width = max_cell_width(ctx, caption);

    let (start, end) = match location {
        CaptionLocation::Above => {
            let caption_end_y = lines[caption.end_line].y;
            let first = caption.end_line + 1;
            let mut next = first;
            while next < lines.len() {
                let line = &lines[next];
                if line.y < caption_end_y || !accepts(ctx, caption, next, next - 1, max_width) {
                    break;
                }
                next += 1;
            }
            (first, next)
        }
        CaptionLocation::Below => {
            let caption_end_y = lines[caption.start_line].end_y;
            let mut first = caption.start_line;
            while first > 0 {
                let candidate = first - 1;
                if previous_end.is_some_and(|p| candidate <= p) {
                    break;
                }
                let line = &lines[candidate];
                if line.end_y > caption_end_y || !accepts(ctx, caption, candidate, first, max_width) {
                    break;
                }
                first = candidate;
            }
            (first, caption.start_line)
        }
    };

    let count = end - start;
    if count == 0 || count < t.min_body_lines {
        return Err(Rejection::TooFewBodyLines { lines: count });
    }

    let (x, end_x) = extent(&lines[start..end]);
    if caption.end_x < x || end_x < caption.x {
        return Err(Rejection::CaptionBodyDisjoint);
    }

    Ok(BodySpan {
        start_line: start,
        end_line: end - 1,
        x,
        end_x,
    })
}

/// Whether line `idx` may join a body whose nearest accepted line is
/// `neighbour`. Lines opening another caption of the same keyword, or a
/// figure caption, end the body.
fn accepts(
    ctx: &PageContext<'_>,
    caption: &CaptionSpan,
    idx: usize,
    neighbour: usize,
    max_width: f32,
) -> bool {
    let lines = ctx.lines;
    let line = &lines[idx];
    let stripped = line.stripped_text();

    let own_keyword = !caption.keyword.is_empty() && stripped.starts_with(caption.keyword.as_str());
    if own_keyword || ctx.config.keywords.is_figure(&stripped) {
        // Only a keyword sitting inside a row (same baseline) stays in the body.
        return line.y == lines[neighbour].y;
    }

    line.width < max_width
        || line.sparse_line
        || line.superscript_start
        || ctx.config.markers.starts_body(line.text.trim_start())
        || idx + 1 == lines.len()
}

fn extent(lines: &[TextPiece]) -> (f32, f32) {
    lines.iter().fold((f32::MAX, f32::MIN), |(x, end_x), l| {
        (x.min(l.x), end_x.max(l.end_x))
    })
}

fn stripped_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
