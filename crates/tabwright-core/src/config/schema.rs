use serde::{Deserialize, Serialize};

/// Vocabulary and thresholds for one extraction run.
///
/// Every field has a default, so a config file only needs to name what it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    pub keywords: Keywords,
    pub markers: Markers,
    pub thresholds: Thresholds,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            name: "default".into(),
            description: None,
            version: "1".into(),
            keywords: Keywords::default(),
            markers: Markers::default(),
            thresholds: Thresholds::default(),
        }
    }
}

/// Caption vocabulary. Prefixes are case-sensitive and matched against
/// whitespace-stripped line text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub table: Vec<String>,
    pub figure: Vec<String>,
    /// Whole-caption texts (compared case-insensitively) that mark a table of
    /// contents instead of a table.
    pub table_of_contents: Vec<String>,
    /// Line prefixes skipped during the keyword scan.
    pub table_of_contents_lines: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        Keywords {
            table: strings(&["Table", "TABLE"]),
            figure: strings(&["Figure", "FIGURE", "Fig."]),
            table_of_contents: strings(&["Table of Contents", "Table of Content"]),
            table_of_contents_lines: strings(&["tableofcontent", "TABLEOFCONTENT", "TableofContent"]),
        }
    }
}

impl Keywords {
    /// The first table keyword `stripped` starts with.
    pub fn table_prefix(&self, stripped: &str) -> Option<&str> {
        self.table
            .iter()
            .find(|k| stripped.starts_with(k.as_str()))
            .map(String::as_str)
    }

    pub fn is_figure(&self, stripped: &str) -> bool {
        self.figure.iter().any(|k| stripped.starts_with(k.as_str()))
    }

    pub fn is_contents_line(&self, stripped: &str) -> bool {
        self.table_of_contents_lines
            .iter()
            .any(|k| stripped.starts_with(k.as_str()))
    }

    pub fn is_contents_caption(&self, caption: &str) -> bool {
        let caption = caption.trim();
        self.table_of_contents
            .iter()
            .any(|k| k.eq_ignore_ascii_case(caption))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Line prefixes that are always accepted into a table body.
    pub body: Vec<String>,
    /// First-cell prefixes that open the footnote region.
    pub footnote: Vec<String>,
    /// First-cell prefix that opens the footnote region only on a superscript
    /// row near the end of the table.
    pub superscript_footnote: String,
    /// Unit tokens that usually sit in header cells.
    pub units: Vec<String>,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            body: strings(&["*", "$", "t ", "a ", "1 ", "?", "''", "Note:"]),
            footnote: strings(&["*", "t ", "$", "?", "''", "Note:"]),
            superscript_footnote: "a".into(),
            units: strings(&["(%)", "(mg)", "(kg)", "(ms)", "(s)", "pg ml-1", "ng ml-1"]),
        }
    }
}

impl Markers {
    pub fn starts_body(&self, text: &str) -> bool {
        self.body.iter().any(|m| text.starts_with(m.as_str()))
    }

    pub fn starts_footnote(&self, text: &str) -> bool {
        self.footnote.iter().any(|m| text.starts_with(m.as_str()))
    }

    pub fn has_unit(&self, text: &str) -> bool {
        self.units.iter().any(|u| text.contains(u.as_str()))
    }
}

/// Geometric constants. Distances are in page units; factors multiply the
/// document statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Documents with more pages are rejected whole.
    pub max_pages: usize,
    /// Pages with this many lines or fewer are not scanned for captions.
    pub min_page_lines: usize,
    /// Average page-1 font scale at or below this means the text source could
    /// not decode the glyphs.
    pub unknown_encoding_scale: f32,
    /// Leading page-1 words inspected for HTML-like encoding.
    pub html_probe_words: usize,
    /// Page-1 fragments above this y contribute to the title font.
    pub title_region_max_y: f32,
    /// Starting sum for the line-gap and word-gap means, so they stay
    /// finite on pages with no qualifying pairs.
    pub stats_gap_seed: f32,
    pub stats_glyph_width_seed: f32,
    /// Starting minimum for the text block's left and top edges.
    pub stats_coordinate_seed: f32,
    pub line_merge_char_factor: f32,
    pub line_merge_max_gap: f32,
    pub space_insert_gap: f32,
    pub sparse_line_min_gap: f32,
    pub min_average_line_width: f32,
    pub fallback_line_width: f32,
    pub max_caption_lines: usize,
    pub caption_gap_factor: f32,
    /// Wrapped caption text may start this many average word gaps to the right.
    pub caption_x_gap_factor: f32,
    /// Captions shorter than this (whitespace removed) absorb the next line.
    pub caption_min_chars: usize,
    /// A wrapped caption line is wide when it spans at least text width /
    /// this divisor.
    pub caption_wrap_width_divisor: f32,
    /// Lines closer than this fraction of the line gap continue the caption
    /// when their horizontal gap is small.
    pub caption_wrap_gap_ratio: f32,
    pub caption_bottom_y: f32,
    pub min_lines_below_caption: usize,
    pub density_window: usize,
    pub narrow_caption_width: f32,
    pub narrow_caption_window: f32,
    pub wide_caption_x_min: f32,
    pub wide_caption_x_max: f32,
    pub wide_caption_width: f32,
    /// Captions wider than text width / ratio belong to a page-wide table.
    pub wide_caption_width_ratio: f32,
    /// Page-wide captions start past (text width - margin) / divisor from
    /// the left edge and before text width / x-limit divisor.
    pub wide_caption_indent_margin: f32,
    pub wide_caption_indent_divisor: f32,
    pub wide_caption_x_limit_divisor: f32,
    pub cell_width_divisor: f32,
    pub relaxed_cell_width_divisor: f32,
    pub min_body_lines: usize,
    pub min_rows: usize,
    pub min_columns: usize,
    /// Lines closer than this multiple of the line gap share a row.
    pub row_gap_factor: f32,
    /// Column insertion threshold as a multiple of the average intra-line gap.
    pub column_gap_factor: f32,
    pub max_columns: usize,
    pub head_column_ratio: f32,
    /// The superscript footnote marker only counts in this many final rows.
    pub superscript_footnote_rows: usize,
    pub alignment_ratio: f32,
    pub alignment_tolerance: f32,
    pub reference_min_token_chars: usize,
    pub reference_context_lines: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            max_pages: 150,
            min_page_lines: 30,
            unknown_encoding_scale: 1.2,
            html_probe_words: 20,
            title_region_max_y: 400.0,
            stats_gap_seed: 0.1,
            stats_glyph_width_seed: 1e-7,
            stats_coordinate_seed: 1000.0,
            line_merge_char_factor: 1.5,
            line_merge_max_gap: 5.0,
            space_insert_gap: 1.5,
            sparse_line_min_gap: 3.0,
            min_average_line_width: 50.0,
            fallback_line_width: 175.0,
            max_caption_lines: 15,
            caption_gap_factor: 1.35,
            caption_x_gap_factor: 3.0,
            caption_min_chars: 10,
            caption_wrap_width_divisor: 4.0,
            caption_wrap_gap_ratio: 0.5,
            caption_bottom_y: 720.0,
            min_lines_below_caption: 4,
            density_window: 6,
            narrow_caption_width: 40.0,
            narrow_caption_window: 60.0,
            wide_caption_x_min: 150.0,
            wide_caption_x_max: 250.0,
            wide_caption_width: 350.0,
            wide_caption_width_ratio: 1.85,
            wide_caption_indent_margin: 30.0,
            wide_caption_indent_divisor: 4.0,
            wide_caption_x_limit_divisor: 2.5,
            cell_width_divisor: 1.65,
            relaxed_cell_width_divisor: 1.4,
            min_body_lines: 4,
            min_rows: 2,
            min_columns: 2,
            row_gap_factor: 0.5,
            column_gap_factor: 2.0,
            max_columns: 20,
            head_column_ratio: 1.5,
            superscript_footnote_rows: 2,
            alignment_ratio: 0.6,
            alignment_tolerance: 3.0,
            reference_min_token_chars: 6,
            reference_context_lines: 3,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
