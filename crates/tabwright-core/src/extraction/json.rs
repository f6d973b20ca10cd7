use crate::error::TabwrightError;
use crate::extraction::{PageWords, TextSource, WordRecord};
use serde::{Deserialize, Serialize};

/// Text source reading pre-extracted word fragments from JSON.
///
/// The input is an array of pages, each with a 1-based `page_number` and its
/// words in source order. Useful for replaying output from other extractors.
pub struct JsonSource;

#[derive(Debug, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_number: usize,
    #[serde(default)]
    pub words: Vec<WordRecord>,
}

impl JsonSource {
    pub fn new() -> Self {
        JsonSource
    }
}

impl Default for JsonSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSource for JsonSource {
    fn load_pages(&self, bytes: &[u8]) -> Result<Vec<PageWords>, TabwrightError> {
        let records: Vec<PageRecord> = serde_json::from_slice(bytes)?;

        let mut pages = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            if record.page_number != i + 1 {
                return Err(TabwrightError::MalformedOutput(format!(
                    "page {} found at position {}; pages must be numbered 1, 2, ...",
                    record.page_number,
                    i + 1
                )));
            }
            let words = record.words.into_iter().map(Into::into).collect();
            pages.push(PageWords::new(record.page_number, words));
        }
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "json"
    }
}

/// Serialize pages back into the format [`JsonSource`] reads.
pub fn to_records(pages: &[PageWords]) -> Vec<PageRecord> {
    pages
        .iter()
        .map(|p| PageRecord {
            page_number: p.page_number,
            words: p.words.iter().map(WordRecord::from).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_pages_with_optional_metrics() {
        let json = br#"[
            {"page_number": 1, "words": [
                {"text": "Table", "x": 72, "y": 700, "width": 25, "height": 10, "font_size": 10},
                {"text": "a", "x": 72, "y": 760, "width": 3, "height": 6, "font_size": 6,
                 "x_scale": 6, "y_scale": 7, "width_of_space": 1.2}
            ]},
            {"page_number": 2}
        ]"#;
        let pages = JsonSource::new().load_pages(json).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].words[0].end_x, 97.0);
        assert_eq!(pages[0].words[0].x_scale, 10.0);
        assert_eq!(pages[0].words[1].y_scale, 7.0);
        assert_eq!(pages[0].words[1].width_of_space, 1.2);
        assert!(pages[1].words.is_empty());
    }

    #[test]
    fn test_out_of_order_pages_rejected() {
        let json = br#"[{"page_number": 2, "words": []}]"#;
        assert!(matches!(
            JsonSource::new().load_pages(json),
            Err(TabwrightError::MalformedOutput(_))
        ));
    }

    #[test]
    fn test_records_reload_identically() {
        let json = br#"[{"page_number": 1, "words": [
            {"text": "Acc", "x": 200, "y": 720, "width": 20, "height": 10, "font_size": 10}
        ]}]"#;
        let pages = JsonSource::new().load_pages(json).unwrap();
        let bytes = serde_json::to_vec(&to_records(&pages)).unwrap();
        let again = JsonSource::new().load_pages(&bytes).unwrap();
        assert_eq!(again[0].words, pages[0].words);
    }
}
