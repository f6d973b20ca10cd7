//! Per-document and per-page detection driver.
//!
//! Pages are processed in order. Within a page the keyword scan resumes after
//! each candidate, and the end of the last accepted table bounds how far the
//! next trailing caption may grow its body backwards.

use crate::boundary;
use crate::calibrate::{screen_document, DocStats};
use crate::candidate::{BodySpan, CaptionSpan, Rejection, Row, Stage, TableCandidate};
use crate::config::schema::{ExtractorConfig, Keywords};
use crate::extraction::PageWords;
use crate::geometry::TextPiece;
use crate::heading::{self, HeadingClassifier};
use crate::hierarchy;
use crate::lines::{assemble_lines, average_line_width, mark_sparse_lines, remove_blank_lines};
use crate::model::{
    CaptionLocation, DocumentResult, DocumentStatus, Reference, RejectedCandidate, Table,
};
use crate::reference;
use crate::structure;

/// Read-only inputs shared by every stage working on one page.
pub struct PageContext<'a> {
    /// 1-based page number.
    pub page: usize,
    pub words: &'a [TextPiece],
    pub lines: &'a [TextPiece],
    pub stats: &'a DocStats,
    pub config: &'a ExtractorConfig,
    pub average_line_width: f32,
}

/// Run table detection over a whole document.
pub fn extract_document(
    pages: &[PageWords],
    config: &ExtractorConfig,
    classifier: &dyn HeadingClassifier,
) -> DocumentResult {
    let t = &config.thresholds;
    let page_count = pages.len();

    if let Some(reason) = screen_document(pages, t) {
        tracing::warn!(%reason, pages = page_count, "document is unprocessable");
        return DocumentResult::unprocessable(page_count, reason);
    }

    let stats = DocStats::compute(pages, t);
    tracing::debug!(?stats, "document statistics");

    let mut page_lines: Vec<Vec<TextPiece>> = pages
        .iter()
        .map(|p| {
            let mut lines = assemble_lines(&p.words, &stats, t);
            remove_blank_lines(&mut lines);
            lines
        })
        .collect();
    let average = average_line_width(&page_lines, stats.body_scale, t);
    for lines in &mut page_lines {
        mark_sparse_lines(lines, average, t);
    }

    let mut tables = Vec::new();
    let mut rejected = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        let lines = &page_lines[index];
        if lines.len() <= t.min_page_lines {
            tracing::trace!(page = page.page_number, lines = lines.len(), "page skipped");
            continue;
        }
        let ctx = PageContext {
            page: page.page_number,
            words: &page.words,
            lines,
            stats: &stats,
            config,
            average_line_width: average,
        };
        detect_page(&ctx, index, &page_lines, classifier, &mut tables, &mut rejected);
    }

    tracing::info!(
        pages = page_count,
        tables = tables.len(),
        rejected = rejected.len(),
        "document processed"
    );
    DocumentResult {
        status: DocumentStatus::Processed,
        page_count,
        stats: Some(stats),
        tables,
        rejected,
    }
}

/// Whether line `i` opens a caption: it starts with a table keyword, is not
/// a table-of-contents entry, and does not continue its predecessor's
/// baseline (an inline mention such as "... shown in Table 2").
pub fn is_caption_start(lines: &[TextPiece], i: usize, keywords: &Keywords) -> bool {
    let stripped = lines[i].stripped_text();
    keywords.table_prefix(&stripped).is_some()
        && !keywords.is_contents_line(&stripped)
        && !(i > 0 && lines[i - 1].y == lines[i].y)
}

fn detect_page(
    ctx: &PageContext<'_>,
    page_index: usize,
    all_lines: &[Vec<TextPiece>],
    classifier: &dyn HeadingClassifier,
    tables: &mut Vec<Table>,
    rejected: &mut Vec<RejectedCandidate>,
) {
    let mut i = 0;
    let mut previous_end: Option<usize> = None;
    while i < ctx.lines.len() {
        if !is_caption_start(ctx.lines, i, &ctx.config.keywords) {
            i += 1;
            continue;
        }

        let mut tc = detect_table(ctx, i, previous_end, classifier);
        let caption_end = tc.caption.as_ref().map_or(i, |c| c.end_line);

        if let Some((stage, reason)) = tc.rejection() {
            rejected.push(RejectedCandidate {
                page: ctx.page,
                caption: tc.caption_text().trim_end().to_string(),
                stage,
                reason: reason.clone(),
            });
            i = caption_end + 1;
            continue;
        }

        if let (Some(caption), Some(body)) = (tc.caption.as_ref(), tc.body.as_ref()) {
            tc.references = references_for(ctx, caption, body, page_index, all_lines);
        }

        match finalize(ctx, &tc) {
            Some(table) => {
                let end = match (table.caption_location, tc.body.as_ref()) {
                    (CaptionLocation::Above, Some(body)) => body.end_line,
                    _ => caption_end,
                };
                tracing::debug!(
                    page = ctx.page,
                    caption = %table.caption.trim_end(),
                    rows = table.row_count,
                    columns = table.column_count,
                    "table detected"
                );
                tables.push(table);
                previous_end = Some(end);
                i = end + 1;
            }
            None => i = caption_end + 1,
        }
    }
}

/// Drive one candidate through every stage. The returned candidate is either
/// rejected or carries every substructure.
fn detect_table(
    ctx: &PageContext<'_>,
    start: usize,
    previous_end: Option<usize>,
    classifier: &dyn HeadingClassifier,
) -> TableCandidate {
    let t = &ctx.config.thresholds;
    let mut tc = TableCandidate::new(ctx.page);

    let Some(caption) = tc.run(Stage::ScanCaption, || boundary::scan_caption(ctx, start)) else {
        return tc;
    };
    tc.caption = Some(caption.clone());

    let Some(location) = tc.run(Stage::ClassifyLocation, || {
        let positions = boundary::distinct_line_positions(ctx, &caption);
        Ok(boundary::classify_location(ctx, &caption, &positions))
    }) else {
        return tc;
    };
    tc.location = Some(location);

    let Some(body) = tc.run(Stage::GrowBody, || {
        boundary::grow_body(ctx, &caption, location, previous_end)
    }) else {
        return tc;
    };
    tc.body = Some(body.clone());

    let Some(rows) = tc.run(Stage::ClusterRows, || {
        structure::cluster_rows(ctx.lines, &caption, &body, location, ctx.stats, t)
    }) else {
        return tc;
    };

    structure_body(&mut tc, ctx, &rows, classifier);
    tc.rows = rows;
    tc
}

/// Stages from heading estimation onwards, which all work on the clustered
/// rows. Results are stored on `tc` as they are produced.
fn structure_body(
    tc: &mut TableCandidate,
    ctx: &PageContext<'_>,
    rows: &[Row],
    classifier: &dyn HeadingClassifier,
) {
    let config = ctx.config;
    let t = &config.thresholds;

    let Some(estimate) = tc.run(Stage::EstimateHeadings, || {
        Ok(heading::estimate_headings(rows, config))
    }) else {
        return;
    };

    let Some(layout) = tc.run(Stage::InferColumns, || {
        structure::infer_columns(
            rows,
            estimate.heading_line_number,
            estimate.footnote_begin_row,
            estimate.max_row_cells,
            ctx.stats,
            t,
        )
    }) else {
        return;
    };

    let Some((grid, columns)) = tc.run(Stage::AssignCells, || {
        Ok((
            structure::assign_cells(rows, estimate.footnote_begin_row, &layout),
            structure::build_columns(rows, &layout),
        ))
    }) else {
        return;
    };

    let Some(headings) = tc.run(Stage::ResolveHeadings, || {
        Ok(heading::resolve_headings(
            &estimate, rows, &grid, &columns, &layout, config, classifier,
        ))
    }) else {
        return;
    };

    if let Some((column_tree, row_tree)) = tc.run(Stage::BuildHierarchy, || {
        Ok((
            hierarchy::column_header_tree(rows, &headings, &layout, t),
            hierarchy::row_header_tree(&columns, &headings, t),
        ))
    }) {
        tc.column_tree = column_tree;
        tc.row_tree = row_tree;
    }

    tc.run(Stage::Finalized, || {
        if headings.footnote_begin_row <= 1 || headings.max_row_cells <= 1 {
            Err(Rejection::NoDataRows {
                footnote_begin_row: headings.footnote_begin_row,
            })
        } else {
            Ok(())
        }
    });

    tc.layout = Some(layout);
    tc.grid = Some(grid);
    tc.columns = columns;
    tc.headings = Some(headings);
}

fn body_extent(lines: &[TextPiece], body: &BodySpan) -> (f32, f32) {
    lines[body.start_line..=body.end_line]
        .iter()
        .fold((f32::MAX, f32::MIN), |(top, bottom), l| {
            (top.min(l.y), bottom.max(l.end_y))
        })
}

fn references_for(
    ctx: &PageContext<'_>,
    caption: &CaptionSpan,
    body: &BodySpan,
    page_index: usize,
    all_lines: &[Vec<TextPiece>],
) -> Vec<Reference> {
    let t = &ctx.config.thresholds;
    match reference::caption_token(&caption.text, &caption.keyword, t) {
        Some(token) => {
            reference::locate_references(all_lines, page_index, caption, Some(body), &token, t)
        }
        None => Vec::new(),
    }
}

/// Detach a finished candidate into a [`Table`] snapshot.
fn finalize(ctx: &PageContext<'_>, tc: &TableCandidate) -> Option<Table> {
    if !tc.is_valid() || tc.stage() != Stage::Finalized {
        return None;
    }
    let caption = tc.caption.as_ref()?;
    let location = tc.location?;
    let body = tc.body.as_ref()?;
    let layout = tc.layout.as_ref()?;
    let grid = tc.grid.as_ref()?;
    let headings = tc.headings.as_ref()?;

    let bands = layout.bands();
    let heading_rows = (headings.heading_line_number + 1).min(grid.cells.len());
    let data_rows = heading_rows..grid.cells.len();

    let column_headings = (0..layout.len())
        .map(|c| {
            grid.cells[..heading_rows]
                .iter()
                .map(|row| row[c].as_str())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let row_headings = grid.cells[data_rows.clone()]
        .iter()
        .map(|row| {
            row[..headings.head_columns.min(row.len())]
                .iter()
                .filter(|s| !s.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();

    let body_rows = grid.cells[data_rows]
        .iter()
        .map(|row| row.join(";"))
        .collect();

    let footnote = tc.rows[headings.footnote_begin_row.min(tc.rows.len())..]
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect();

    let stub = headings
        .stub
        .iter()
        .filter_map(|id| tc.rows.get(id.row)?.cells.get(id.index))
        .map(|p| p.text.clone())
        .collect();

    let middle_x = ctx.stats.middle_x;
    let straddles = bands.first().is_some_and(|b| b.left < middle_x)
        && bands.last().is_some_and(|b| b.right > middle_x);
    let width = match (bands.first(), bands.last()) {
        (Some(first), Some(last)) => last.right - first.left,
        _ => 0.0,
    };
    let (top, bottom) = body_extent(ctx.lines, body);

    Some(Table {
        page: ctx.page,
        caption: caption.text.clone(),
        keyword: caption.keyword.clone(),
        caption_location: location,
        wide: caption.wide || straddles,
        heading_line_number: headings.heading_line_number,
        head_column_count: headings.head_columns,
        row_count: tc.rows.len(),
        column_count: layout.len(),
        column_headings,
        row_headings,
        stub,
        body_rows,
        footnote,
        reference_text: reference::reference_text(&tc.references),
        references: tc.references.clone(),
        columns: bands,
        cells: grid.cells.clone(),
        crossed: grid.crossed.clone(),
        width,
        height: bottom - top,
        column_header_tree: tc.column_tree.clone(),
        row_header_tree: tc.row_tree.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heading::NullClassifier;

    fn line(text: &str, x: f32, y: f32) -> TextPiece {
        TextPiece::new(text, x, y, 100.0, 10.0, 10.0)
    }

    fn word(text: &str, x: f32, y: f32, width: f32) -> TextPiece {
        TextPiece::new(text, x, y, width, 10.0, 10.0)
    }

    /// Running text, eight words per line, 12pt apart.
    fn filler(top: f32, lines: usize) -> Vec<TextPiece> {
        let mut words = Vec::new();
        for line in 0..lines {
            for k in 0..8 {
                words.push(word("abcdefgh", 72.0 + 43.0 * k as f32, top + 12.0 * line as f32, 40.0));
            }
        }
        words
    }

    /// Two header rows and three data rows, 15pt apart.
    fn accuracy_table(top: f32) -> Vec<TextPiece> {
        let mut words = vec![
            word("Model", 72.0, top, 30.0),
            word("Acc", 200.0, top, 20.0),
            word("Top-1", 200.0, top + 15.0, 28.0),
            word("Top-5", 300.0, top + 15.0, 28.0),
        ];
        for (i, (name, width)) in [("ResNet", 36.0), ("ViT-B", 30.0), ("ConvNeXt", 48.0)].iter().enumerate() {
            let y = top + 30.0 + 15.0 * i as f32;
            words.push(word(name, 72.0, y, *width));
            words.push(word("76.1", 200.0, y, 20.0));
            words.push(word("92.9", 300.0, y, 20.0));
        }
        words
    }

    /// One page prepared the way `extract_document` prepares it.
    struct Prepared {
        words: Vec<TextPiece>,
        lines: Vec<TextPiece>,
        stats: DocStats,
        average: f32,
    }

    impl Prepared {
        fn new(words: Vec<TextPiece>, config: &ExtractorConfig) -> Self {
            let t = &config.thresholds;
            let pages = vec![PageWords::new(1, words)];
            let stats = DocStats::compute(&pages, t);
            let mut lines = assemble_lines(&pages[0].words, &stats, t);
            remove_blank_lines(&mut lines);
            let average = average_line_width(std::slice::from_ref(&lines), stats.body_scale, t);
            mark_sparse_lines(&mut lines, average, t);
            Prepared {
                words: pages[0].words.clone(),
                lines,
                stats,
                average,
            }
        }

        fn ctx<'a>(&'a self, config: &'a ExtractorConfig) -> PageContext<'a> {
            PageContext {
                page: 1,
                words: &self.words,
                lines: &self.lines,
                stats: &self.stats,
                config,
                average_line_width: self.average,
            }
        }

        fn caption_line(&self, prefix: &str) -> usize {
            self.lines.iter().position(|l| l.text.starts_with(prefix)).unwrap()
        }
    }

    #[test]
    fn test_caption_above_precedes_body() {
        let config = ExtractorConfig::default();
        let mut words = filler(330.0, 30);
        words.push(word("Table 1. Accuracy by model", 72.0, 700.0, 130.0));
        words.extend(accuracy_table(720.0));
        let page = Prepared::new(words, &config);
        let start = page.caption_line("Table 1");

        let tc = detect_table(&page.ctx(&config), start, None, &NullClassifier);
        assert!(tc.is_valid());
        assert_eq!(tc.stage(), Stage::Finalized);
        assert_eq!(tc.location, Some(CaptionLocation::Above));
        let (caption, body) = (tc.caption.unwrap(), tc.body.unwrap());
        assert!(caption.end_line < body.start_line);
        assert!((body.start_line..=body.end_line).all(|l| !caption.contains_line(l)));
    }

    #[test]
    fn test_caption_below_follows_body() {
        let config = ExtractorConfig::default();
        let mut words = filler(200.0, 30);
        words.extend(accuracy_table(570.0));
        words.push(word("Table 1. Accuracy by model", 72.0, 730.0, 130.0));
        let page = Prepared::new(words, &config);
        let start = page.caption_line("Table 1");

        let tc = detect_table(&page.ctx(&config), start, None, &NullClassifier);
        assert!(tc.is_valid());
        assert_eq!(tc.location, Some(CaptionLocation::Below));
        let (caption, body) = (tc.caption.unwrap(), tc.body.unwrap());
        assert!(body.end_line < caption.start_line);
        assert!((body.start_line..=body.end_line).all(|l| !caption.contains_line(l)));
    }

    /// Caption with three narrow lines under it.
    fn short_body_words() -> Vec<TextPiece> {
        let mut words = filler(330.0, 30);
        words.push(word("Table 1. Accuracy by model", 72.0, 700.0, 130.0));
        words.push(word("Model", 72.0, 720.0, 30.0));
        words.push(word("ResNet", 72.0, 735.0, 36.0));
        words.push(word("ViT-B", 72.0, 750.0, 30.0));
        words
    }

    #[test]
    fn test_rejected_candidate_skips_later_stages() {
        let config = ExtractorConfig::default();
        let page = Prepared::new(short_body_words(), &config);
        let start = page.caption_line("Table 1");

        let mut tc = detect_table(&page.ctx(&config), start, None, &NullClassifier);
        assert_eq!(
            tc.rejection(),
            Some((Stage::GrowBody, &Rejection::TooFewBodyLines { lines: 3 }))
        );
        assert_eq!(tc.stage(), Stage::GrowBody);
        assert!(tc.caption.is_some());
        assert!(tc.body.is_none());
        assert!(tc.rows.is_empty());
        assert!(tc.layout.is_none());
        assert!(tc.headings.is_none());

        // Later stages never run again on this candidate.
        assert_eq!(tc.run(Stage::ClusterRows, || Ok(())), None);
        assert_eq!(tc.stage(), Stage::GrowBody);
    }

    #[test]
    fn test_scan_resumes_after_rejected_caption() {
        let config = ExtractorConfig::default();
        let mut words = filler(40.0, 30);
        words.push(word("Table 1. Accuracy by model", 72.0, 400.0, 130.0));
        words.push(word("Model", 72.0, 420.0, 30.0));
        words.push(word("ResNet", 72.0, 435.0, 36.0));
        words.push(word("ViT-B", 72.0, 450.0, 30.0));
        words.push(word("Table 2. Runtime by model", 72.0, 500.0, 130.0));
        words.extend(accuracy_table(520.0));
        let page = Prepared::new(words, &config);
        let all_lines = vec![page.lines.clone()];

        let (mut tables, mut rejected) = (Vec::new(), Vec::new());
        detect_page(&page.ctx(&config), 0, &all_lines, &NullClassifier, &mut tables, &mut rejected);

        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].caption, "Table 1. Accuracy by model");
        assert_eq!(rejected[0].stage, Stage::GrowBody);
        assert_eq!(rejected[0].reason, Rejection::TooFewBodyLines { lines: 3 });

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].caption, "Table 2. Runtime by model ");
        assert_eq!(tables[0].row_count, 5);
        assert_eq!(tables[0].column_count, 3);
    }

    #[test]
    fn test_caption_start_rules() {
        let keywords = Keywords::default();
        let lines = vec![
            line("as shown in", 72.0, 100.0),
            line("Table 2", 180.0, 100.0),
            line("Table 3. Runtime", 72.0, 130.0),
            line("TableofContents", 72.0, 160.0),
            line("Tables are great", 72.0, 190.0),
            line("Figure 1. Overview", 72.0, 220.0),
        ];
        let starts: Vec<usize> = (0..lines.len())
            .filter(|&i| is_caption_start(&lines, i, &keywords))
            .collect();
        assert_eq!(starts, vec![2, 4]);
    }

    #[test]
    fn test_empty_document_is_unprocessable() {
        let result = extract_document(
            &[PageWords::new(1, Vec::new())],
            &ExtractorConfig::default(),
            &heading::NullClassifier,
        );
        assert!(!result.is_processed());
        assert!(result.tables.is_empty());
    }
}
