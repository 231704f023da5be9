use std::path::Path;

use log::{info, warn};

use crate::error::Result;
use crate::models::{parse_amount, Kind, Transaction, DATE_FORMAT};

/// Column layout of an importable file: date, type, category, description,
/// amount and optionally notes. Extra columns are ignored.
const MIN_COLUMNS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedImport {
    pub rows: Vec<Transaction>,
    /// Rows with too few columns, an unknown type or an unusable amount.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Accepts `1,234.56`, `$85.50` and quoted forms. Negative amounts are refused.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(&[',', '"', '$'][..], "");
    parse_amount(&s)
}

/// `MM/DD/YYYY` becomes ISO; anything else is kept as written.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() == 3 {
        let parsed = (|| {
            let m: u32 = parts[0].parse().ok()?;
            let d: u32 = parts[1].parse().ok()?;
            let y: i32 = parts[2].parse().ok()?;
            chrono::NaiveDate::from_ymd_opt(y, m, d)
        })();
        if let Some(date) = parsed {
            return date.format(DATE_FORMAT).to_string();
        }
    }
    raw.to_string()
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Read an external file, stamping every row with `owner`. The first row is a
/// header and is never imported.
pub fn parse_file(file_path: &Path, owner: &str) -> Result<ParsedImport> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));

    let mut parsed = ParsedImport::default();
    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("skipping unreadable import row: {e}");
                parsed.skipped += 1;
                continue;
            }
        };
        if record.len() < MIN_COLUMNS {
            parsed.skipped += 1;
            continue;
        }
        let Some(kind) = Kind::parse(&record[1]) else {
            warn!("skipping import row with type '{}'", &record[1]);
            parsed.skipped += 1;
            continue;
        };
        let Some(amount) = clean_amount(&record[4]) else {
            warn!("skipping import row with amount '{}'", &record[4]);
            parsed.skipped += 1;
            continue;
        };
        parsed.rows.push(Transaction {
            date: normalize_date(&record[0]),
            kind,
            category: record[2].trim().to_string(),
            description: record[3].trim().to_string(),
            amount,
            owner: owner.to_string(),
            notes: record.get(5).unwrap_or("").to_string(),
        });
    }
    info!(
        "parsed {} row(s) from {} ({} skipped)",
        parsed.rows.len(),
        file_path.display(),
        parsed.skipped
    );
    Ok(parsed)
}
