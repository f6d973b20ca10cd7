pub mod builtin;
pub mod schema;

use crate::error::TabwrightError;
use schema::ExtractorConfig;
use std::path::Path;

/// Load an extractor config from a JSON file.
pub fn load_config(path: &Path) -> Result<ExtractorConfig, TabwrightError> {
    let content = std::fs::read_to_string(path).map_err(|e| TabwrightError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path)
}

/// Parse a config from a JSON string, reporting failures against `source`.
pub fn parse_config(json: &str, source: &Path) -> Result<ExtractorConfig, TabwrightError> {
    let config: ExtractorConfig =
        serde_json::from_str(json).map_err(|e| TabwrightError::ConfigLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<ExtractorConfig, TabwrightError> {
    let config: ExtractorConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate that a config is usable.
pub fn validate_config(config: &ExtractorConfig) -> Result<(), TabwrightError> {
    if config.keywords.table.is_empty() {
        return Err(TabwrightError::ConfigInvalid(
            "keywords.table must not be empty".into(),
        ));
    }

    let keyword_lists = [
        ("keywords.table", &config.keywords.table),
        ("keywords.figure", &config.keywords.figure),
    ];
    for (field, list) in keyword_lists {
        if list.iter().any(|k| k.trim().is_empty()) {
            return Err(TabwrightError::ConfigInvalid(format!(
                "{} contains an empty keyword",
                field
            )));
        }
        if let Some(k) = list.iter().find(|k| k.chars().any(char::is_whitespace)) {
            return Err(TabwrightError::ConfigInvalid(format!(
                "{} keyword '{}' contains whitespace; keywords match whitespace-stripped text",
                field, k
            )));
        }
    }

    let t = &config.thresholds;
    let positive = [
        ("line_merge_char_factor", t.line_merge_char_factor),
        ("line_merge_max_gap", t.line_merge_max_gap),
        ("caption_gap_factor", t.caption_gap_factor),
        ("caption_x_gap_factor", t.caption_x_gap_factor),
        ("wide_caption_width_ratio", t.wide_caption_width_ratio),
        ("row_gap_factor", t.row_gap_factor),
        ("cell_width_divisor", t.cell_width_divisor),
        ("relaxed_cell_width_divisor", t.relaxed_cell_width_divisor),
        ("column_gap_factor", t.column_gap_factor),
        ("head_column_ratio", t.head_column_ratio),
        ("fallback_line_width", t.fallback_line_width),
        ("caption_wrap_width_divisor", t.caption_wrap_width_divisor),
        ("caption_wrap_gap_ratio", t.caption_wrap_gap_ratio),
        ("wide_caption_indent_divisor", t.wide_caption_indent_divisor),
        ("wide_caption_x_limit_divisor", t.wide_caption_x_limit_divisor),
        ("stats_coordinate_seed", t.stats_coordinate_seed),
    ];
    for (field, value) in positive {
        if !(value > 0.0) {
            return Err(TabwrightError::ConfigInvalid(format!(
                "thresholds.{} must be positive, got {}",
                field, value
            )));
        }
    }

    if t.relaxed_cell_width_divisor > t.cell_width_divisor {
        return Err(TabwrightError::ConfigInvalid(format!(
            "thresholds.relaxed_cell_width_divisor ({}) must not exceed cell_width_divisor ({})",
            t.relaxed_cell_width_divisor, t.cell_width_divisor
        )));
    }

    if t.wide_caption_x_min >= t.wide_caption_x_max {
        return Err(TabwrightError::ConfigInvalid(format!(
            "thresholds.wide_caption_x_min ({}) must be below wide_caption_x_max ({})",
            t.wide_caption_x_min, t.wide_caption_x_max
        )));
    }

    if t.min_columns < 2 || t.max_columns < t.min_columns {
        return Err(TabwrightError::ConfigInvalid(format!(
            "thresholds.min_columns ({}) must be at least 2 and at most max_columns ({})",
            t.min_columns, t.max_columns
        )));
    }

    if t.min_rows < 2 {
        return Err(TabwrightError::ConfigInvalid(
            "thresholds.min_rows must be at least 2".into(),
        ));
    }

    if !(t.alignment_ratio > 0.0 && t.alignment_ratio <= 1.0) {
        return Err(TabwrightError::ConfigInvalid(format!(
            "thresholds.alignment_ratio must be in (0, 1], got {}",
            t.alignment_ratio
        )));
    }

    if t.max_caption_lines == 0 || t.max_pages == 0 {
        return Err(TabwrightError::ConfigInvalid(
            "thresholds.max_caption_lines and max_pages must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config_fills_defaults() {
        let json = r#"{
            "name": "Custom",
            "keywords": { "table": ["Tabelle"] },
            "thresholds": { "min_page_lines": 5 }
        }"#;
        let config = parse_config_str(json).unwrap();
        assert_eq!(config.name, "Custom");
        assert_eq!(config.keywords.table, vec!["Tabelle"]);
        assert_eq!(config.keywords.figure, vec!["Figure", "FIGURE", "Fig."]);
        assert_eq!(config.thresholds.min_page_lines, 5);
        assert_eq!(config.thresholds.max_columns, 20);
    }

    #[test]
    fn test_empty_table_keywords_rejected() {
        let json = r#"{ "keywords": { "table": [] } }"#;
        assert!(parse_config_str(json).is_err());
    }

    #[test]
    fn test_keyword_with_space_rejected() {
        let json = r#"{ "keywords": { "table": ["Tab le"] } }"#;
        assert!(parse_config_str(json).is_err());
    }

    #[test]
    fn test_non_positive_factor_rejected() {
        let json = r#"{ "thresholds": { "column_gap_factor": 0.0 } }"#;
        assert!(parse_config_str(json).is_err());
    }

    #[test]
    fn test_inverted_divisors_rejected() {
        let json = r#"{ "thresholds": { "relaxed_cell_width_divisor": 2.0 } }"#;
        assert!(parse_config_str(json).is_err());
    }

    #[test]
    fn test_min_columns_bounded_by_max() {
        let json = r#"{ "thresholds": { "min_columns": 4, "max_columns": 3 } }"#;
        assert!(parse_config_str(json).is_err());
        let json = r#"{ "thresholds": { "min_columns": 3 } }"#;
        assert_eq!(parse_config_str(json).unwrap().thresholds.min_columns, 3);
    }

    #[test]
    fn test_alignment_ratio_range() {
        let json = r#"{ "thresholds": { "alignment_ratio": 1.5 } }"#;
        assert!(parse_config_str(json).is_err());
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/tabwright.json")).unwrap_err();
        match err {
            TabwrightError::ConfigLoad { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/tabwright.json"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
