use crate::config::parse_config_str;
use crate::config::schema::ExtractorConfig;
use crate::error::TabwrightError;

const DEFAULT_JSON: &str = include_str!("../../../../presets/default.json");
const SNIPPET_JSON: &str = include_str!("../../../../presets/snippet.json");

/// Available predefined configs.
pub const PRESETS: &[&str] = &["default", "snippet"];

/// Load a predefined config by name.
pub fn load_preset(name: &str) -> Result<ExtractorConfig, TabwrightError> {
    match name {
        "default" => parse_config_str(DEFAULT_JSON),
        "snippet" => parse_config_str(SNIPPET_JSON),
        _ => Err(TabwrightError::UnknownPreset {
            name: name.to_string(),
            available: PRESETS.join(", "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Thresholds;

    #[test]
    fn test_load_default_preset_matches_defaults() {
        let config = load_preset("default").unwrap();
        assert_eq!(config.name, "default");
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_snippet_scans_every_page() {
        let config = load_preset("snippet").unwrap();
        assert_eq!(config.thresholds.min_page_lines, 0);
        assert_eq!(config.keywords.table, vec!["Table", "TABLE"]);
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            load_preset("xyz"),
            Err(TabwrightError::UnknownPreset { .. })
        ));
    }
}
