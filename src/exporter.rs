use std::path::Path;

use chrono::NaiveDateTime;
use log::info;

use crate::error::Result;
use crate::fmt::{money_in, truncate};
use crate::models::{format_amount, StoredRecord};
use crate::reports::{totals, Totals};

pub const EXPORT_HEADER: [&str; 6] = ["Date", "Type", "Category", "Description", "Amount", "Notes"];
pub const REPORT_HEADERS: [&str; 5] = ["Date", "Type", "Category", "Description", "Amount"];

/// Text cells longer than this are cut and marked with "...".
pub const CELL_CHARS: usize = 20;
pub const TEXT_ROWS_PER_PAGE: usize = 50;

const PAGE_BREAK: char = '\x0c';

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Write records in the importable layout. Returns the number of rows written.
pub fn write_csv(records: &[StoredRecord], path: &Path) -> Result<usize> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(EXPORT_HEADER)?;
    for r in records {
        wtr.write_record([
            r.tx.date.as_str(),
            r.tx.kind.as_str(),
            r.tx.category.as_str(),
            r.tx.description.as_str(),
            format_amount(r.tx.amount).as_str(),
            r.tx.notes.as_str(),
        ])?;
    }
    wtr.flush()?;
    info!("exported {} record(s) to {}", records.len(), path.display());
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// Printable report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub title: String,
    pub generated: String,
    pub rows: Vec<[String; 5]>,
    pub totals: Totals,
    pub currency: String,
}

impl ReportDocument {
    pub fn new(owner: &str, records: &[StoredRecord], currency: &str, generated_at: NaiveDateTime) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                [
                    truncate(&r.tx.date, CELL_CHARS),
                    truncate(r.tx.kind.as_str(), CELL_CHARS),
                    truncate(&r.tx.category, CELL_CHARS),
                    truncate(&r.tx.description, CELL_CHARS),
                    money_in(r.tx.amount, currency),
                ]
            })
            .collect();
        Self {
            title: format!("Transaction Report - {owner}"),
            generated: generated_at.format("Generated on: %Y-%m-%d %H:%M").to_string(),
            rows,
            totals: totals(records),
            currency: currency.to_string(),
        }
    }

    /// Rows split into pages. An empty report still has one (empty) page.
    pub fn pages(&self, rows_per_page: usize) -> Vec<&[[String; 5]]> {
        if self.rows.is_empty() {
            return vec![&self.rows[..]];
        }
        self.rows.chunks(rows_per_page.max(1)).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Income {}  Expense {}  Balance {}",
            money_in(self.totals.income, &self.currency),
            money_in(self.totals.expense, &self.currency),
            money_in(self.totals.balance, &self.currency),
        )
    }

    /// Plain-text pages separated by form feeds.
    pub fn render_text(&self, rows_per_page: usize) -> String {
        let pages = self.pages(rows_per_page);
        let last = pages.len() - 1;
        let mut out = String::new();
        for (i, page) in pages.iter().enumerate() {
            if i == 0 {
                out.push_str(&format!("{}\n", self.title));
                out.push_str(&format!("{}\n", self.generated));
                out.push('\n');
            } else {
                out.push(PAGE_BREAK);
                out.push('\n');
            }
            out.push_str(&format!("{}\n", text_line(&REPORT_HEADERS.map(String::from))));
            out.push_str(&format!("{}\n", "-".repeat(TEXT_LINE_WIDTH)));
            for row in page.iter() {
                out.push_str(&format!("{}\n", text_line(row)));
            }
            if i == last {
                out.push_str(&format!("{}\n", "-".repeat(TEXT_LINE_WIDTH)));
                out.push_str(&format!("{}\n", self.summary()));
            }
        }
        out
    }
}

const TEXT_WIDTHS: [usize; 5] = [12, 9, 25, 25, 16];
const TEXT_LINE_WIDTH: usize = 12 + 9 + 25 + 25 + 16;

fn text_line(cells: &[String; 5]) -> String {
    format!(
        "{:<w0$}{:<w1$}{:<w2$}{:<w3$}{:>w4$}",
        cells[0],
        cells[1],
        cells[2],
        cells[3],
        cells[4],
        w0 = TEXT_WIDTHS[0],
        w1 = TEXT_WIDTHS[1],
        w2 = TEXT_WIDTHS[2],
        w3 = TEXT_WIDTHS[3],
        w4 = TEXT_WIDTHS[4],
    )
}

pub fn write_text(doc: &ReportDocument, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    std::fs::write(path, doc.render_text(TEXT_ROWS_PER_PAGE))?;
    info!("wrote text report to {}", path.display());
    Ok(())
}

#[cfg(feature = "pdf")]
pub fn write_pdf(doc: &ReportDocument, path: &Path) -> Result<()> {
    let bytes = crate::pdf::render_report(doc)?;
    ensure_parent(path)?;
    std::fs::write(path, bytes)?;
    info!("wrote PDF report to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::parse_file;
    use crate::models::{Kind, RecordId, Transaction};

    fn rec(date: &str, kind: Kind, category: &str, description: &str, amount: f64, notes: &str) -> StoredRecord {
        let tx = Transaction {
            date: date.to_string(),
            kind,
            category: category.to_string(),
            description: description.to_string(),
            amount,
            owner: "demo".to_string(),
            notes: notes.to_string(),
        };
        StoredRecord {
            id: RecordId::new(&tx, 0),
            line: 0,
            tx,
        }
    }

    fn generated_at() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_export_then_import_reproduces_tuples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("export.csv");
        let records = vec![
            rec("2024-01-15", Kind::Income, "Salary", "pay, january", 3500.0, ""),
            rec("2024-01-16", Kind::Expense, "Food", "grocery \"bulk\"", 85.5, "weekly"),
            rec("2024-01-17", Kind::Expense, "Fuel", "gas", 0.01, ""),
        ];
        assert_eq!(write_csv(&records, &path).unwrap(), 3);

        let parsed = parse_file(&path, "demo").unwrap();
        assert_eq!(parsed.skipped, 0);
        let key = |t: &Transaction| (t.date.clone(), t.kind, t.category.clone(), t.description.clone(), t.amount);
        let before: Vec<_> = records.iter().map(|r| key(&r.tx)).collect();
        let after: Vec<_> = parsed.rows.iter().map(key).collect();
        assert_eq!(before, after);
        assert_eq!(parsed.rows[1].notes, "weekly");
    }

    #[test]
    fn test_csv_export_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        write_csv(&[], &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), "Date,Type,Category,Description,Amount,Notes");
    }

    #[test]
    fn test_report_document_layout() {
        let records = vec![rec("2024-01-16", Kind::Expense, "Food", "Weekly grocery shopping trip", 85.5, "")];
        let doc = ReportDocument::new("demo", &records, "USD", generated_at());
        assert_eq!(doc.title, "Transaction Report - demo");
        assert_eq!(doc.generated, "Generated on: 2024-01-31 09:05");
        assert_eq!(doc.rows[0][3], "Weekly grocery shopp...");
        assert_eq!(doc.rows[0][4], "$85.50");
    }

    #[test]
    fn test_report_pages_split_with_form_feeds() {
        let records: Vec<StoredRecord> = (1..=5)
            .map(|d| rec(&format!("2024-01-0{d}"), Kind::Expense, "Food", "x", 1.0, ""))
            .collect();
        let doc = ReportDocument::new("demo", &records, "USD", generated_at());
        assert_eq!(doc.pages(2).len(), 3);
        let text = doc.render_text(2);
        assert_eq!(text.matches(PAGE_BREAK).count(), 2);
        assert_eq!(text.matches("Transaction Report - demo").count(), 1);
        assert_eq!(text.matches("Description").count(), 3);
        assert!(text.contains("Expense $5.00"));
    }

    #[test]
    fn test_empty_report_has_one_page() {
        let doc = ReportDocument::new("demo", &[], "USD", generated_at());
        assert_eq!(doc.pages(TEXT_ROWS_PER_PAGE).len(), 1);
        assert!(!doc.render_text(TEXT_ROWS_PER_PAGE).contains(PAGE_BREAK));
    }
}
