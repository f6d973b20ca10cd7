use tabwright_core::model::{DocumentResult, DocumentStatus, Table};

pub fn print(result: &DocumentResult) {
    if let DocumentStatus::Unprocessable { reason } = &result.status {
        println!("Document not processed: {reason}");
        return;
    }

    if result.tables.is_empty() {
        println!("No tables found in {} page(s).", result.page_count);
    }

    for (i, table) in result.tables.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_table(i + 1, table);
    }

    if !result.rejected.is_empty() {
        println!("\nRejected candidates:");
        for r in &result.rejected {
            println!("  page {:<4} {} ({}: {})", r.page, r.caption, r.stage, r.reason);
        }
    }
}

fn print_table(number: usize, table: &Table) {
    let wide = if table.wide { ", wide" } else { "" };
    println!(
        "=== Table {} (page {}, caption {}{}) ===\n",
        number, table.page, table.caption_location, wide
    );
    println!("  {}\n", table.caption.trim_end());

    // Column widths from the widest cell in each column
    let mut widths = vec![0usize; table.column_count];
    for row in &table.cells {
        for (c, cell) in row.iter().enumerate() {
            widths[c] = widths[c].max(cell.chars().count());
        }
    }

    for (r, row) in table.cells.iter().enumerate() {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| format!("{:<width$}", cell, width = widths[c]))
            .collect();
        println!("  {}", line.join(" | ").trim_end());
        if r == table.heading_line_number {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            println!("  {}", rule.join("-+-"));
        }
    }

    if !table.footnote.is_empty() {
        println!();
        for note in &table.footnote {
            println!("  {}", note.replace('\t', " "));
        }
    }

    if !table.reference_text.is_empty() {
        println!("\n  Referenced:");
        for line in table.reference_text.lines() {
            println!("    {}", line);
        }
    }
}
