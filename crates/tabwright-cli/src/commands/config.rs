use std::path::Path;
use tabwright_core::config::builtin;
use tabwright_core::config::schema::Thresholds;
use tabwright_core::error::TabwrightError;

pub fn list() -> Result<(), TabwrightError> {
    println!("Available predefined configs:\n");
    for name in builtin::PRESETS {
        let config = builtin::load_preset(name)?;
        println!("  {:<8} {} (v{})", name, config.name, config.version);
        if let Some(ref desc) = config.description {
            println!("           {}", desc);
        }
        println!();
    }
    Ok(())
}

pub fn show(preset: &str) -> Result<(), TabwrightError> {
    let config = builtin::load_preset(preset)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

pub fn schema() -> Result<(), TabwrightError> {
    print!(
        r#"JSON Config Schema
==================

A config file tunes how captions are recognised and how table geometry is
judged. Every field is optional; anything left out takes the value of the
"default" preset. Run `tabwright config show default` for the full file.

Top-level fields:
  name          (string)  Human-readable name of the config
  description   (string)  What documents it is tuned for
  version       (string)  Version identifier
  keywords      (object)  Caption vocabulary (see below)
  markers       (object)  Body and footnote line markers (see below)
  thresholds    (object)  Geometric constants (see below)

keywords:
  table         (array)   Caption prefixes, case-sensitive, matched against
                          the line with whitespace removed. Default:
                          ["Table", "TABLE"]
  figure        (array)   Figure caption prefixes. A figure caption just
                          above a table caption keeps the caption above.
  table_of_contents
                (array)   Caption texts (case-insensitive) that mark a
                          table of contents instead of a table.
  table_of_contents_lines
                (array)   Line prefixes skipped while scanning for captions.

markers:
  body          (array)   Line prefixes always accepted into a table body.
  footnote      (array)   First-cell prefixes that start the footnote rows.
  superscript_footnote
                (string)  Prefix that starts the footnote only on a raised
                          row within the last two rows.
  units         (array)   Unit tokens that usually appear in header cells.

thresholds (numbers):
  max_pages, min_page_lines           document and page limits
  stats_gap_seed, stats_glyph_width_seed, stats_coordinate_seed
                                      starting values of the document
                                      statistics
  line_merge_char_factor, line_merge_max_gap, space_insert_gap
                                      word-to-line merging
  max_caption_lines, caption_gap_factor, caption_x_gap_factor,
  caption_min_chars, caption_wrap_width_divisor,
  caption_wrap_gap_ratio              caption folding
  wide_caption_width_ratio, wide_caption_indent_margin,
  wide_caption_indent_divisor, wide_caption_x_limit_divisor
                                      page-wide caption test
  caption_bottom_y, min_lines_below_caption, density_window,
  narrow_caption_width, narrow_caption_window
                                      caption above/below decision
  cell_width_divisor, relaxed_cell_width_divisor, min_body_lines
                                      body growth
  row_gap_factor, min_rows, column_gap_factor, min_columns,
  max_columns                         rows and columns
  superscript_footnote_rows, head_column_ratio, alignment_ratio,
  alignment_tolerance
                                      headings and header hierarchy
  reference_min_token_chars, reference_context_lines
                                      reference text search

Example:
{{
  "name": "Two-column proceedings",
  "keywords": {{ "table": ["Table", "TABLE", "Tab."] }},
  "thresholds": {{
    "min_page_lines": 20,
    "max_columns": 12
  }}
}}
"#
    );
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), TabwrightError> {
    let config = tabwright_core::config::load_config(file)?;

    println!("Config '{}' (v{}) is valid.", config.name, config.version);
    println!("  Table keywords: {}", config.keywords.table.join(", "));

    // Report overrides of the default thresholds (informational)
    let defaults = serde_json::to_value(Thresholds::default())?;
    let current = serde_json::to_value(&config.thresholds)?;
    let mut changed = Vec::new();
    if let (Some(defaults), Some(current)) = (defaults.as_object(), current.as_object()) {
        for (key, value) in current {
            if defaults.get(key) != Some(value) {
                changed.push(format!("{key} = {value}"));
            }
        }
    }

    if !changed.is_empty() {
        println!("\nThresholds changed from default:");
        for c in &changed {
            println!("  - {}", c);
        }
    }

    Ok(())
}
