use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::error::TallyError;

/// Calendar format of the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column order of the record log.
pub const LOG_HEADER: [&str; 7] = ["Date", "Type", "Category", "Description", "Amount", "User", "Notes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Option<Kind> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("income") {
            Some(Self::Income)
        } else if raw.eq_ignore_ascii_case("expense") {
            Some(Self::Expense)
        } else {
            None
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::parse(s).ok_or_else(|| {
            TallyError::Validation(format!("Unknown transaction type '{s}' (expected income or expense)"))
        })
    }
}

/// Parse a stored or user-supplied amount. Only finite, non-negative values pass.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Shortest decimal form, e.g. `3500`, `85.5`.
pub fn format_amount(value: f64) -> String {
    format!("{value}")
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: String,
    pub kind: Kind,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub owner: String,
    pub notes: String,
}

impl Transaction {
    /// `None` when the date column does not match [`DATE_FORMAT`].
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn to_row(&self) -> [String; 7] {
        [
            self.date.clone(),
            self.kind.as_str().to_string(),
            self.category.clone(),
            self.description.clone(),
            format_amount(self.amount),
            self.owner.clone(),
            self.notes.clone(),
        ]
    }

    /// Build from a log row: 6 fields, or 7 with notes.
    pub fn from_fields(fields: &[&str]) -> Result<Self, SkipReason> {
        if fields.len() != 6 && fields.len() != 7 {
            return Err(SkipReason::FieldCount(fields.len()));
        }
        let kind = Kind::parse(fields[1]).ok_or_else(|| SkipReason::Kind(fields[1].to_string()))?;
        let amount = parse_amount(fields[4]).ok_or_else(|| SkipReason::Amount(fields[4].to_string()))?;
        Ok(Self {
            date: fields[0].to_string(),
            kind,
            category: fields[2].to_string(),
            description: fields[3].to_string(),
            amount,
            owner: fields[5].to_string(),
            notes: fields.get(6).map(|n| n.to_string()).unwrap_or_default(),
        })
    }

    /// Full-tuple equality with the amount compared numerically, so `85.50` and
    /// `85.5` are the same record.
    pub fn same_fields(&self, other: &Transaction) -> bool {
        self.date == other.date
            && self.kind == other.kind
            && self.category == other.category
            && self.description == other.description
            && self.amount == other.amount
            && self.owner == other.owner
            && self.notes == other.notes
    }

    fn digest(&self) -> [u8; 4] {
        let mut hasher = Sha256::new();
        for field in self.to_row() {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        let full = hasher.finalize();
        [full[0], full[1], full[2], full[3]]
    }
}

/// Surrogate identity for a log row: a digest of the field tuple plus the
/// occurrence ordinal among identical rows. Never written to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    digest: [u8; 4],
    ordinal: u32,
}

impl RecordId {
    pub fn new(tx: &Transaction, ordinal: u32) -> Self {
        Self {
            digest: tx.digest(),
            ordinal,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.digest))?;
        if self.ordinal > 0 {
            write!(f, ".{}", self.ordinal)?;
        }
        Ok(())
    }
}

impl FromStr for RecordId {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TallyError::Validation(format!("Invalid transaction id: {s}"));
        let (hex_part, ordinal) = match s.trim().split_once('.') {
            Some((h, o)) => (h, o.parse::<u32>().map_err(|_| invalid())?),
            None => (s.trim(), 0),
        };
        let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
        let digest: [u8; 4] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self { digest, ordinal })
    }
}

/// A well-formed log row with its surrogate id and 1-based file line.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub line: u64,
    pub tx: Transaction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FieldCount(usize),
    Kind(String),
    Amount(String),
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected 6 or 7 fields, found {n}"),
            Self::Kind(k) => write!(f, "unknown type '{k}'"),
            Self::Amount(a) => write!(f, "invalid amount '{a}'"),
            Self::Unreadable(e) => write!(f, "unreadable row ({e})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}
