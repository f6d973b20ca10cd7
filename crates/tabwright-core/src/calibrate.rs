//! Document-wide geometric statistics.
//!
//! Every downstream threshold is a multiple of one of these values, which is
//! what keeps the heuristics independent of font size and page layout.

use crate::config::schema::Thresholds;
use crate::extraction::PageWords;
use crate::model::UnprocessableReason;
use serde::Serialize;

/// Read-only statistics computed once per document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocStats {
    /// Font scale carrying the most glyph width: the "normal text" scale.
    pub body_scale: f32,
    /// Largest font size near the top of the first page.
    pub title_font: f32,
    pub avg_line_gap: f32,
    pub avg_char_width: f32,
    /// Mean gap between consecutive words on the same baseline.
    pub avg_x_gap: f32,
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
    /// Split line between the left and right half of the text block.
    pub middle_x: f32,
}

impl DocStats {
    /// Calibrate from word-level fragments. Pure function of its input.
    pub fn compute(pages: &[PageWords], thresholds: &Thresholds) -> DocStats {
        let body_scale = body_scale(pages);
        let title_font = pages
            .first()
            .map(|p| {
                p.words
                    .iter()
                    .filter(|w| w.y < thresholds.title_region_max_y)
                    .fold(0.0f32, |acc, w| acc.max(w.font_size))
            })
            .unwrap_or(0.0);

        // Seeds keep the means finite when nothing qualifies.
        let mut line_gap_sum = thresholds.stats_gap_seed;
        let mut line_gap_count = 1usize;
        let mut x_gap_sum = thresholds.stats_gap_seed;
        let mut x_gap_count = 1usize;
        let mut glyph_width = thresholds.stats_glyph_width_seed;
        let mut glyph_count = 1usize;
        let mut min_x = thresholds.stats_coordinate_seed;
        let mut max_x = 0.0f32;
        let mut min_y = thresholds.stats_coordinate_seed;
        let mut max_y = 0.0f32;

        for page in pages {
            for pair in page.words.windows(2) {
                let (prev, cur) = (&pair[0], &pair[1]);
                if cur.scale() != body_scale {
                    continue;
                }

                let gap = cur.y - prev.y - prev.height;
                if gap > 0.0 && gap < prev.height {
                    line_gap_sum += cur.y - prev.y;
                    line_gap_count += 1;
                }

                if cur.x > 0.0 {
                    min_x = min_x.min(cur.x);
                }
                max_x = max_x.max(cur.end_x + cur.width_of_space);
                if cur.y > 0.0 {
                    min_y = min_y.min(cur.y);
                }
                max_y = max_y.max(cur.y);

                if cur.y == prev.y {
                    let x_gap = cur.x - prev.end_x;
                    if x_gap > 0.0 {
                        x_gap_sum += x_gap;
                        x_gap_count += 1;
                    }
                }

                glyph_width += cur.width;
                glyph_count += cur.text.chars().count();
            }
        }

        DocStats {
            body_scale,
            title_font,
            avg_line_gap: line_gap_sum / line_gap_count as f32,
            avg_char_width: glyph_width / glyph_count as f32,
            avg_x_gap: x_gap_sum / x_gap_count as f32,
            min_x,
            max_x,
            min_y,
            max_y,
            middle_x: min_x + (max_x - min_x) / 2.0,
        }
    }

    /// Width of the text block.
    pub fn text_width(&self) -> f32 {
        self.max_x - self.min_x
    }
}

fn body_scale(pages: &[PageWords]) -> f32 {
    // (scale, total glyph width) in first-seen order so ties resolve stably.
    let mut totals: Vec<(f32, f32)> = Vec::new();
    for word in pages.iter().flat_map(|p| &p.words) {
        let scale = word.scale();
        match totals.iter_mut().find(|(s, _)| *s == scale) {
            Some((_, total)) => *total += word.width,
            None => totals.push((scale, word.width)),
        }
    }

    let mut best = (0.0f32, f32::MIN);
    for (scale, total) in totals {
        if total > best.1 {
            best = (scale, total);
        }
    }
    best.0
}

/// Whole-document screening that runs before any table detection.
pub fn screen_document(pages: &[PageWords], thresholds: &Thresholds) -> Option<UnprocessableReason> {
    if pages.iter().all(|p| p.words.is_empty()) {
        return Some(UnprocessableReason::NoText);
    }

    if pages.len() > thresholds.max_pages {
        return Some(UnprocessableReason::TooLarge {
            pages: pages.len(),
            limit: thresholds.max_pages,
        });
    }

    let first = match pages.first() {
        Some(p) if !p.words.is_empty() => &p.words,
        _ => return None,
    };

    let mean_scale = first.iter().map(|w| w.scale()).sum::<f32>() / first.len() as f32;
    if mean_scale <= thresholds.unknown_encoding_scale {
        return Some(UnprocessableReason::UnknownEncoding { mean_scale });
    }

    let probe = first.len().min(thresholds.html_probe_words);
    if probe > 0 && first[..probe].iter().all(|w| is_pair_coded(&w.text)) {
        return Some(UnprocessableReason::HtmlEncoded);
    }

    None
}

/// Tokens such as `A3B4C1` made of upper-case-letter/alphanumeric pairs: what
/// hex-ish glyph codes look like when a source falls back to raw codes.
fn is_pair_coded(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    !chars.is_empty()
        && chars.len() % 2 == 0
        && chars.chunks(2).all(|pair| {
            pair[0].is_ascii_uppercase()
                && (pair[1].is_ascii_uppercase() || pair[1].is_ascii_digit())
        })
}
