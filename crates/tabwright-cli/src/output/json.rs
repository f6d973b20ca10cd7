use tabwright_core::error::TabwrightError;
use tabwright_core::model::DocumentResult;

pub fn print(result: &DocumentResult) -> Result<(), TabwrightError> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}
