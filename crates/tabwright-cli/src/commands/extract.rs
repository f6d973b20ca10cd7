use tabwright_core::config::{builtin, load_config};
use tabwright_core::error::TabwrightError;
use tabwright_core::extraction::json::JsonSource;
use tabwright_core::extraction::pdftotext::PdftotextSource;
use tabwright_core::extraction::TextSource;
use tabwright_core::heading::NullClassifier;
use std::path::PathBuf;

use crate::output;

pub fn run(
    input_file: PathBuf,
    preset: &str,
    config_file: Option<PathBuf>,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), TabwrightError> {
    let config = match &config_file {
        Some(path) => load_config(path)?,
        None => builtin::load_preset(preset)?,
    };

    // Determine input type by extension
    let is_json = input_file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let source: Box<dyn TextSource> = if is_json {
        Box::new(JsonSource::new())
    } else {
        if !PdftotextSource::is_available() {
            return Err(TabwrightError::PdftotextNotFound);
        }
        Box::new(PdftotextSource::new())
    };

    let bytes = std::fs::read(&input_file)?;
    let result = tabwright_core::extract_pdf(&bytes, source.as_ref(), &config, &NullClassifier)?;

    if let Some(path) = output_file {
        // Always write JSON when saving to file
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json)?;
        eprintln!(
            "Found {} table(s) in {} page(s), written to {}",
            result.tables.len(),
            result.page_count,
            path.display()
        );
        return Ok(());
    }

    match output_format {
        "json" => output::json::print(&result)?,
        "xml" => println!("{}", tabwright_core::report::to_xml(&result)?),
        _ => output::table::print(&result),
    }

    Ok(())
}
