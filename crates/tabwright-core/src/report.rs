//! XML rendering of a [`DocumentResult`].

use crate::error::TabwrightError;
use crate::model::{DocumentResult, DocumentStatus, HeaderTree, Table};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

fn report_err(e: impl std::fmt::Display) -> TabwrightError {
    TabwrightError::Report(e.to_string())
}

impl XmlOut {
    fn new() -> Self {
        XmlOut {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), TabwrightError> {
        self.writer.write_event(event).map_err(report_err)
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), TabwrightError> {
        let mut start = BytesStart::new(name);
        for &attr in attrs {
            start.push_attribute(attr);
        }
        self.event(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), TabwrightError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), TabwrightError> {
        if text.is_empty() {
            let mut start = BytesStart::new(name);
            for &attr in attrs {
                start.push_attribute(attr);
            }
            return self.event(Event::Empty(start));
        }
        self.open(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String, TabwrightError> {
        String::from_utf8(self.writer.into_inner().into_inner()).map_err(report_err)
    }
}

/// Render every finalized table of a document as XML.
pub fn to_xml(result: &DocumentResult) -> Result<String, TabwrightError> {
    let mut out = XmlOut::new();
    out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let pages = result.page_count.to_string();
    match &result.status {
        DocumentStatus::Processed => {
            out.open("document", &[("pages", &pages), ("status", "processed")])?;
        }
        DocumentStatus::Unprocessable { reason } => {
            out.open("document", &[("pages", &pages), ("status", "unprocessable")])?;
            out.leaf("reason", &[], &reason.to_string())?;
        }
    }

    for (i, table) in result.tables.iter().enumerate() {
        write_table(&mut out, i + 1, table)?;
    }

    out.close("document")?;
    out.finish()
}

fn write_table(out: &mut XmlOut, id: usize, table: &Table) -> Result<(), TabwrightError> {
    let id = id.to_string();
    let page = table.page.to_string();
    let location = table.caption_location.to_string();
    let wide = table.wide.to_string();
    out.open(
        "table",
        &[
            ("id", &id),
            ("page", &page),
            ("location", &location),
            ("wide", &wide),
        ],
    )?;

    out.leaf("caption", &[], table.caption.trim_end())?;

    let rows = table.row_count.to_string();
    let columns = table.column_count.to_string();
    let heading = table.heading_line_number.to_string();
    let head_columns = table.head_column_count.to_string();
    let width = format!("{:.2}", table.width);
    let height = format!("{:.2}", table.height);
    out.leaf(
        "shape",
        &[
            ("rows", &rows),
            ("columns", &columns),
            ("heading-line", &heading),
            ("head-columns", &head_columns),
            ("width", &width),
            ("height", &height),
        ],
        "",
    )?;

    out.open("column-headings", &[])?;
    for heading in &table.column_headings {
        out.leaf("heading", &[], heading)?;
    }
    out.close("column-headings")?;

    if !table.stub.is_empty() {
        out.leaf("stub", &[], &table.stub.join(" "))?;
    }

    out.open("body", &[])?;
    for row in &table.body_rows {
        out.leaf("row", &[], row)?;
    }
    out.close("body")?;

    if !table.footnote.is_empty() {
        out.leaf("footnote", &[], &table.footnote.join("\n"))?;
    }
    if !table.reference_text.is_empty() {
        out.leaf("reference-text", &[], &table.reference_text)?;
    }

    out.open("columns", &[])?;
    for band in &table.columns {
        let left = format!("{:.2}", band.left);
        let right = format!("{:.2}", band.right);
        out.leaf("column", &[("left", &left), ("right", &right)], "")?;
    }
    out.close("columns")?;

    if let Some(tree) = &table.column_header_tree {
        write_tree(out, "column-header-tree", tree)?;
    }
    if let Some(tree) = &table.row_header_tree {
        write_tree(out, "row-header-tree", tree)?;
    }

    out.close("table")
}

fn write_tree(out: &mut XmlOut, name: &str, tree: &HeaderTree) -> Result<(), TabwrightError> {
    let alignment = tree.alignment.to_string();
    out.open(name, &[("alignment", &alignment)])?;
    for root in tree.roots() {
        write_node(out, tree, root)?;
    }
    out.close(name)
}

fn write_node(out: &mut XmlOut, tree: &HeaderTree, node: usize) -> Result<(), TabwrightError> {
    let text = tree.nodes[node].text.as_str();
    let children = tree.children_of(node);
    if children.is_empty() {
        return out.leaf("header", &[("text", text)], "");
    }
    out.open("header", &[("text", text)])?;
    for &child in children {
        write_node(out, tree, child)?;
    }
    out.close("header")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, CaptionLocation, ColumnBand, HeaderNode, UnprocessableReason};

    fn node(text: &str, level: usize, parent: Option<usize>, children: Vec<usize>) -> HeaderNode {
        HeaderNode {
            text: text.into(),
            x: 0.0,
            end_x: 0.0,
            y: 0.0,
            end_y: 0.0,
            level,
            parent,
            children,
        }
    }

    fn table() -> Table {
        Table {
            page: 3,
            caption: "Table 1. Accuracy & size ".into(),
            keyword: "Table".into(),
            caption_location: CaptionLocation::Above,
            wide: false,
            heading_line_number: 1,
            head_column_count: 1,
            row_count: 4,
            column_count: 2,
            column_headings: vec!["Model".into(), "Acc <%>".into()],
            row_headings: vec!["ResNet".into()],
            stub: vec!["Model".into()],
            body_rows: vec!["ResNet;76.1".into()],
            footnote: vec!["* single crop".into()],
            reference_text: String::new(),
            references: Vec::new(),
            columns: vec![
                ColumnBand { left: 72.0, right: 120.0 },
                ColumnBand { left: 200.0, right: 228.0 },
            ],
            cells: Vec::new(),
            crossed: Vec::new(),
            width: 156.0,
            height: 70.0,
            column_header_tree: Some(HeaderTree {
                alignment: Alignment::Center,
                nodes: vec![
                    node("Accuracy", 0, None, vec![1]),
                    node("Top-1", 1, Some(0), Vec::new()),
                ],
            }),
            row_header_tree: None,
        }
    }

    #[test]
    fn test_table_xml_is_escaped_and_nested() {
        let result = DocumentResult {
            status: DocumentStatus::Processed,
            page_count: 5,
            stats: None,
            tables: vec![table()],
            rejected: Vec::new(),
        };
        let xml = to_xml(&result).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<document pages=\"5\" status=\"processed\">"));
        assert!(xml.contains("<caption>Table 1. Accuracy &amp; size</caption>"));
        assert!(xml.contains("<heading>Acc &lt;%&gt;</heading>"));
        assert!(xml.contains("<row>ResNet;76.1</row>"));
        assert!(xml.contains("<column left=\"72.00\" right=\"120.00\"/>"));
        assert!(xml.contains("<column-header-tree alignment=\"center\">"));
        assert!(xml.contains("<header text=\"Top-1\"/>"));
        assert!(!xml.contains("reference-text"));
    }

    #[test]
    fn test_unprocessable_document() {
        let result = DocumentResult::unprocessable(0, UnprocessableReason::NoText);
        let xml = to_xml(&result).unwrap();
        assert!(xml.contains("status=\"unprocessable\""));
        assert!(xml.contains("<reason>no text could be extracted</reason>"));
        assert!(!xml.contains("<table"));
    }
}
