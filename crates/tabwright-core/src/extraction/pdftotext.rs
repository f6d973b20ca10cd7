use crate::error::TabwrightError;
use crate::extraction::{PageWords, TextSource};
use crate::geometry::TextPiece;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::process::Command;

/// Text source backed by pdftotext (from poppler-utils).
///
/// Uses `pdftotext -bbox` for word-level bounding boxes. The box height
/// stands in for the font size, which pdftotext does not report.
pub struct PdftotextSource;

impl PdftotextSource {
    pub fn new() -> Self {
        PdftotextSource
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSource for PdftotextSource {
    fn load_pages(&self, bytes: &[u8]) -> Result<Vec<PageWords>, TabwrightError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| TabwrightError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(bytes)
            .map_err(|e| TabwrightError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox")
            .arg(tmpfile.path())
            .arg("-")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TabwrightError::PdftotextNotFound
                } else {
                    TabwrightError::Extraction(format!("pdftotext failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(TabwrightError::PdftotextFailed { code, stderr });
        }

        let xml = String::from_utf8_lossy(&output.stdout);
        let pages = parse_bbox_xml(&xml)?;
        tracing::debug!(pages = pages.len(), "pdftotext extraction complete");
        Ok(pages)
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Word box read from a `<word>` start tag, waiting for its text.
struct OpenWord {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
    text: String,
}

impl OpenWord {
    fn into_piece(self) -> TextPiece {
        let height = self.y_max - self.y_min;
        TextPiece::new(
            self.text,
            self.x_min,
            self.y_min,
            self.x_max - self.x_min,
            height,
            height,
        )
    }
}

fn parse_bbox_xml(xml: &str) -> Result<Vec<PageWords>, TabwrightError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<PageWords> = Vec::new();
    let mut word: Option<OpenWord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(PageWords::new(pages.len() + 1, Vec::new())),
                b"word" => word = Some(open_word(&e)?),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(PageWords::new(pages.len() + 1, Vec::new()));
            }
            Ok(Event::Text(e)) => {
                if let Some(w) = word.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| TabwrightError::MalformedOutput(e.to_string()))?;
                    w.text.push_str(&text);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"word" => {
                let Some(w) = word.take() else { continue };
                let page = pages.last_mut().ok_or_else(|| {
                    TabwrightError::MalformedOutput("<word> outside of <page>".into())
                })?;
                page.words.push(w.into_piece());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TabwrightError::MalformedOutput(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn open_word(tag: &BytesStart<'_>) -> Result<OpenWord, TabwrightError> {
    let mut coords = [None; 4];
    for attr in tag.attributes().flatten() {
        let slot = match attr.key.as_ref() {
            b"xMin" => 0,
            b"yMin" => 1,
            b"xMax" => 2,
            b"yMax" => 3,
            _ => continue,
        };
        let value = String::from_utf8_lossy(&attr.value);
        coords[slot] = value.parse::<f32>().ok();
    }

    match coords {
        [Some(x_min), Some(y_min), Some(x_max), Some(y_max)] => Ok(OpenWord {
            x_min,
            y_min,
            x_max,
            y_max,
            text: String::new(),
        }),
        _ => Err(TabwrightError::MalformedOutput(
            "<word> without a complete bounding box".into(),
        )),
    }
}
