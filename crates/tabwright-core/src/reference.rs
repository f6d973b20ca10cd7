//! Reference-text locator: sentences elsewhere in the document that mention
//! a table by its caption token.

use crate::candidate::{BodySpan, CaptionSpan};
use crate::config::schema::Thresholds;
use crate::geometry::TextPiece;
use crate::model::Reference;

/// Keyword plus the digits after it, whitespace removed: `"Table 4. Runtime"`
/// gives `"Table4"`. `None` when the token is too short to search for.
pub fn caption_token(caption: &str, keyword: &str, t: &Thresholds) -> Option<String> {
    let stripped: String = caption.chars().filter(|c| !c.is_whitespace()).collect();
    let rest = stripped.strip_prefix(keyword)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let token = format!("{keyword}{digits}");
    (token.chars().count() >= t.reference_min_token_chars).then_some(token)
}

/// Byte offset in `text` where `token` starts, ignoring whitespace inside
/// `text`. A match directly followed by another digit does not count, so
/// `Table1` never matches `Table12`.
fn find_token(text: &str, token: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().filter(|(_, c)| !c.is_whitespace()).collect();
    let wanted: Vec<char> = token.chars().collect();
    if wanted.is_empty() || chars.len() < wanted.len() {
        return None;
    }
    (0..=chars.len() - wanted.len()).find_map(|s| {
        let matches = chars[s..s + wanted.len()]
            .iter()
            .zip(&wanted)
            .all(|((_, c), w)| c == w);
        let followed_by_digit = chars
            .get(s + wanted.len())
            .is_some_and(|(_, c)| c.is_ascii_digit());
        (matches && !followed_by_digit).then_some(chars[s].0)
    })
}

/// The sentence around byte `pos` of `text`.
fn sentence_at(text: &str, pos: usize) -> &str {
    let start = text[..pos].rfind(". ").map(|i| i + 2).unwrap_or(0);
    let bytes = text.as_bytes();
    let end = text[pos..]
        .char_indices()
        .find(|&(i, c)| {
            c == '.'
                && bytes
                    .get(pos + i + 1)
                    .map_or(true, |b| b.is_ascii_whitespace())
        })
        .map(|(i, _)| pos + i + 1)
        .unwrap_or(text.len());
    text[start..end].trim()
}

/// Find mentions of `token` in every line of the document except the
/// table's own caption and body lines on `page_index`.
pub fn locate_references(
    pages: &[Vec<TextPiece>],
    page_index: usize,
    caption: &CaptionSpan,
    body: Option<&BodySpan>,
    token: &str,
    t: &Thresholds,
) -> Vec<Reference> {
    let own = |p: usize, line: usize| {
        p == page_index
            && (caption.contains_line(line) || body.is_some_and(|b| b.contains_line(line)))
    };

    let mut references: Vec<Reference> = Vec::new();
    for (p, lines) in pages.iter().enumerate() {
        for (i, line) in lines.iter().enumerate() {
            if own(p, i) {
                continue;
            }
            let Some(found) = find_token(&line.text, token) else {
                continue;
            };

            let mut first = i;
            while first > 0 && i - first < t.reference_context_lines && !own(p, first - 1) {
                first -= 1;
            }
            let mut last = i;
            while last + 1 < lines.len() && last - i < t.reference_context_lines && !own(p, last + 1) {
                last += 1;
            }

            let mut text = String::new();
            let mut offset = 0;
            for (j, l) in lines[first..=last].iter().enumerate() {
                if j > 0 {
                    text.push(' ');
                }
                if first + j == i {
                    offset = text.len();
                }
                text.push_str(&l.text);
            }

            let sentence = sentence_at(&text, offset + found).to_string();
            let reference = Reference {
                page: p + 1,
                text: sentence,
            };
            if !references.contains(&reference) {
                references.push(reference);
            }
        }
    }
    references
}

/// Render references as `In page N: <sentence>` lines.
pub fn reference_text(references: &[Reference]) -> String {
    references
        .iter()
        .map(|r| format!("In page {}: {}", r.page, r.text))
        .collect::<Vec<_>>()
        .join("\n")
}
