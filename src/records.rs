use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Result, TallyError};
use crate::models::{RecordId, SkipReason, SkippedRow, StoredRecord, Transaction, LOG_HEADER};

// ---------------------------------------------------------------------------
// Append
// ---------------------------------------------------------------------------

/// Write the header row if the log is missing or empty.
pub fn ensure_log(path: &Path) -> Result<()> {
    if path.metadata().is_ok_and(|m| m.len() > 0) {
        return Ok(());
    }
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(LOG_HEADER)?;
    wtr.flush()?;
    Ok(())
}

pub fn append(path: &Path, tx: &Transaction) -> Result<()> {
    append_all(path, std::slice::from_ref(tx)).map(|_| ())
}

pub fn append_all(path: &Path, txs: &[Transaction]) -> Result<usize> {
    ensure_log(path)?;
    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    if !ends_with_newline(&mut file)? {
        file.write_all(b"\n")?;
    }
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    for tx in txs {
        wtr.write_record(tx.to_row())?;
    }
    wtr.flush()?;
    info!("appended {} record(s) to {}", txs.len(), path.display());
    Ok(txs.len())
}

fn ends_with_newline(file: &mut File) -> Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Assigns surrogate ids in file order. Identical rows get increasing ordinals.
#[derive(Default)]
struct IdAllocator {
    seen: HashMap<RecordId, u32>,
}

impl IdAllocator {
    fn next(&mut self, tx: &Transaction) -> RecordId {
        let count = self.seen.entry(RecordId::new(tx, 0)).or_insert(0);
        let id = RecordId::new(tx, *count);
        *count += 1;
        id
    }
}

/// Lazy, file-ordered scan of the record log. Malformed rows are skipped and
/// collected until [`Records::into_skipped`].
pub struct Records<P> {
    reader: Option<csv::Reader<File>>,
    predicate: P,
    ids: IdAllocator,
    skipped: Vec<SkippedRow>,
}

impl<P> Records<P> {
    pub fn into_skipped(self) -> Vec<SkippedRow> {
        self.skipped
    }
}

impl<P> Iterator for Records<P>
where
    P: FnMut(&StoredRecord) -> bool,
{
    type Item = Result<StoredRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut record = csv::StringRecord::new();
        loop {
            let line = reader.position().line();
            match reader.read_record(&mut record) {
                Ok(false) => {
                    self.reader = None;
                    return None;
                }
                Ok(true) => {}
                Err(e) if e.is_io_error() => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
                Err(e) => {
                    let line = e.position().map(|p| p.line()).unwrap_or(line);
                    warn!("skipping unreadable row at line {line}: {e}");
                    self.skipped.push(SkippedRow {
                        line,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            }
            let line = record.position().map(|p| p.line()).unwrap_or(line);
            let fields: Vec<&str> = record.iter().collect();
            let tx = match Transaction::from_fields(&fields) {
                Ok(tx) => tx,
                Err(reason) => {
                    warn!("skipping malformed row at line {line}: {reason}");
                    self.skipped.push(SkippedRow { line, reason });
                    continue;
                }
            };
            let stored = StoredRecord {
                id: self.ids.next(&tx),
                line,
                tx,
            };
            if (self.predicate)(&stored) {
                return Some(Ok(stored));
            }
        }
    }
}

/// Start a fresh scan from the persisted log. A missing log scans as empty.
pub fn scan<P>(path: &Path, predicate: P) -> Result<Records<P>>
where
    P: FnMut(&StoredRecord) -> bool,
{
    let reader = if path.exists() {
        debug!("scanning {}", path.display());
        Some(
            csv::ReaderBuilder::new()
                .has_headers(true)
                .flexible(true)
                .from_path(path)?,
        )
    } else {
        None
    };
    Ok(Records {
        reader,
        predicate,
        ids: IdAllocator::default(),
        skipped: Vec::new(),
    })
}

/// Records matching `predicate` together with every malformed row seen.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub records: Vec<StoredRecord>,
    pub skipped: Vec<SkippedRow>,
}

pub fn load<P>(path: &Path, predicate: P) -> Result<Snapshot>
where
    P: FnMut(&StoredRecord) -> bool,
{
    let mut iter = scan(path, predicate)?;
    let records = iter.by_ref().collect::<Result<Vec<_>>>()?;
    Ok(Snapshot {
        records,
        skipped: iter.into_skipped(),
    })
}

// ---------------------------------------------------------------------------
// Delete (full rewrite)
// ---------------------------------------------------------------------------

/// Remove every record for which `matcher` is true.
pub fn delete_where<M>(path: &Path, matcher: M) -> Result<usize>
where
    M: FnMut(&StoredRecord) -> bool,
{
    remove_rows(path, matcher, None)
}

/// Remove only the first record (in file order) for which `matcher` is true.
pub fn delete_first<M>(path: &Path, matcher: M) -> Result<bool>
where
    M: FnMut(&StoredRecord) -> bool,
{
    Ok(remove_rows(path, matcher, Some(1))? == 1)
}

pub fn delete_by_id(path: &Path, id: RecordId) -> Result<bool> {
    delete_first(path, |r| r.id == id)
}

/// Rows that survive are copied from their original bytes. The whole log is read
/// before the file is truncated, so a read failure leaves it untouched; a write
/// failure after truncation does not.
fn remove_rows<M>(path: &Path, mut matcher: M, limit: Option<usize>) -> Result<usize>
where
    M: FnMut(&StoredRecord) -> bool,
{
    if !path.exists() {
        return Ok(0);
    }
    let bytes = std::fs::read(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let mut starts: Vec<usize> = Vec::new();
    let mut removed_at: Vec<usize> = Vec::new();
    let mut ids = IdAllocator::default();
    let mut record = csv::ByteRecord::new();
    let mut index = 0usize;

    while rdr.read_byte_record(&mut record)? {
        let start = record.position().map(|p| p.byte() as usize).unwrap_or(0);
        starts.push(start);
        let is_header = index == 0;
        index += 1;
        if is_header {
            continue;
        }
        let Some(fields) = record
            .iter()
            .map(|f| std::str::from_utf8(f).ok())
            .collect::<Option<Vec<&str>>>()
        else {
            continue;
        };
        let Ok(tx) = Transaction::from_fields(&fields) else {
            continue;
        };
        let stored = StoredRecord {
            id: ids.next(&tx),
            line: record.position().map(|p| p.line()).unwrap_or(0),
            tx,
        };
        let under_limit = limit.map_or(true, |l| removed_at.len() < l);
        if under_limit && matcher(&stored) {
            removed_at.push(starts.len() - 1);
        }
    }

    if removed_at.is_empty() {
        return Ok(0);
    }

    let write = || -> Result<()> {
        let mut out = File::create(path)?;
        let first = starts.first().copied().unwrap_or(bytes.len());
        out.write_all(&bytes[..first])?;
        for (i, start) in starts.iter().enumerate() {
            if removed_at.contains(&i) {
                continue;
            }
            let end = starts.get(i + 1).copied().unwrap_or(bytes.len());
            out.write_all(&bytes[*start..end])?;
        }
        out.sync_all()?;
        Ok(())
    };
    write().map_err(|e| TallyError::Rewrite {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    info!("removed {} record(s) from {}", removed_at.len(), path.display());
    Ok(removed_at.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kind;

    fn tx(date: &str, kind: Kind, category: &str, description: &str, amount: f64) -> Transaction {
        Transaction {
            date: date.to_string(),
            kind,
            category: category.to_string(),
            description: description.to_string(),
            amount,
            owner: "demo".to_string(),
            notes: String::new(),
        }
    }

    fn log_path(dir: &tempfile::TempDir) -> std::path::PathBuf {
        dir.path().join("transactions.csv")
    }

    #[test]
    fn test_ensure_log_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        ensure_log(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Type,Category,Description,Amount,User,Notes"));
    }

    #[test]
    fn test_append_to_empty_log_writes_header_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        std::fs::write(&path, "").unwrap();
        append(&path, &tx("2024-01-15", Kind::Income, "Salary", "pay", 3500.0)).unwrap();

        let snapshot = load(&path, |_| true).unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert!(snapshot.skipped.is_empty());
        assert_eq!(snapshot.records[0].tx.amount, 3500.0);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Date,Type,Category,Description,Amount,User,Notes\n"));
    }

    #[test]
    fn test_append_then_scan_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        append(&path, &tx("2024-01-15", Kind::Income, "Salary", "pay", 3500.0)).unwrap();
        append(&path, &tx("2024-01-16", Kind::Expense, "Food", "grocery", 85.5)).unwrap();

        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 2);
        assert_eq!(snap.records[0].tx.description, "pay");
        assert_eq!(snap.records[1].tx.amount, 85.5);
        assert!(snap.skipped.is_empty());
    }

    #[test]
    fn test_scan_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        append(&path, &tx("2024-01-15", Kind::Income, "Salary", "pay", 3500.0)).unwrap();
        let first: Vec<_> = scan(&path, |_| true).unwrap().collect::<Result<_>>().unwrap();
        append(&path, &tx("2024-01-16", Kind::Expense, "Food", "grocery", 85.5)).unwrap();
        let second: Vec<_> = scan(&path, |_| true).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_scan_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snap = load(&log_path(&dir), |_| true).unwrap();
        assert!(snap.records.is_empty());
    }

    #[test]
    fn test_scan_applies_predicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        append(&path, &tx("2024-01-15", Kind::Income, "Salary", "pay", 3500.0)).unwrap();
        append(&path, &tx("2024-01-16", Kind::Expense, "Food", "grocery", 85.5)).unwrap();
        let snap = load(&path, |r| r.tx.kind == Kind::Expense).unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].tx.category, "Food");
    }

    #[test]
    fn test_malformed_rows_are_skipped_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        std::fs::write(
            &path,
            "Date,Type,Category,Description,Amount,User,Notes\n\
             2024-01-15,income,Salary,pay,3500,demo,\n\
             2024-01-16,expense,Food\n\
             2024-01-17,expense,Food,lunch,twelve,demo,\n\
             2024-01-18,expense,Food,dinner,30,demo,\n",
        )
        .unwrap();
        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 2);
        assert_eq!(snap.skipped.len(), 2);
        assert_eq!(snap.skipped[0].line, 3);
        assert_eq!(snap.skipped[0].reason, SkipReason::FieldCount(3));
        assert_eq!(snap.skipped[1].reason, SkipReason::Amount("twelve".to_string()));
    }

    #[test]
    fn test_identical_rows_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        let coffee = tx("2024-02-01", Kind::Expense, "Food", "coffee", 4.0);
        append_all(&path, &[coffee.clone(), coffee.clone()]).unwrap();
        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 2);
        assert_ne!(snap.records[0].id, snap.records[1].id);
    }

    #[test]
    fn test_delete_first_matches_amount_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        std::fs::write(
            &path,
            "Date,Type,Category,Description,Amount,User,Notes\n\
             2024-01-15,income,Salary,pay,3500,demo,\n\
             2024-01-16,expense,Food,grocery,85.50,demo,\n",
        )
        .unwrap();
        let target = tx("2024-01-16", Kind::Expense, "Food", "grocery", 85.5);
        assert!(delete_first(&path, |r| r.tx.same_fields(&target)).unwrap());
        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].tx.description, "pay");
    }

    #[test]
    fn test_delete_first_removes_one_duplicate_and_keeps_others_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        let original = "Date,Type,Category,Description,Amount,User,Notes\r\n\
                        2024-01-15,income,Salary,\"pay, january\",3500.00,demo,first\r\n\
                        2024-02-01,expense,Food,coffee,4,demo,\r\n\
                        broken,row\r\n\
                        2024-02-01,expense,Food,coffee,4,demo,\r\n\
                        2024-02-02,expense,Food,bagel,3.25,demo,\r\n";
        std::fs::write(&path, original).unwrap();

        let coffee = tx("2024-02-01", Kind::Expense, "Food", "coffee", 4.0);
        assert!(delete_first(&path, |r| r.tx.same_fields(&coffee)).unwrap());

        let after = std::fs::read_to_string(&path).unwrap();
        let expected = "Date,Type,Category,Description,Amount,User,Notes\r\n\
                        2024-01-15,income,Salary,\"pay, january\",3500.00,demo,first\r\n\
                        broken,row\r\n\
                        2024-02-01,expense,Food,coffee,4,demo,\r\n\
                        2024-02-02,expense,Food,bagel,3.25,demo,\r\n";
        assert_eq!(after, expected);
    }

    #[test]
    fn test_delete_by_id_targets_the_second_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        let coffee = tx("2024-02-01", Kind::Expense, "Food", "coffee", 4.0);
        append_all(&path, &[coffee.clone(), coffee]).unwrap();
        append(&path, &tx("2024-02-02", Kind::Expense, "Food", "bagel", 3.25)).unwrap();

        let before = load(&path, |_| true).unwrap();
        let dup_id = before.records[1].id;
        assert!(delete_by_id(&path, dup_id).unwrap());

        let after = load(&path, |_| true).unwrap();
        assert_eq!(after.records.len(), 2);
        assert_eq!(after.records[0].id, before.records[0].id);
        assert!(!delete_by_id(&path, dup_id).unwrap());
    }

    #[test]
    fn test_delete_where_removes_all_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        append_all(
            &path,
            &[
                tx("2024-02-01", Kind::Expense, "Food", "coffee", 4.0),
                tx("2024-02-02", Kind::Income, "Gift", "birthday", 50.0),
                tx("2024-02-03", Kind::Expense, "Food", "coffee", 4.0),
            ],
        )
        .unwrap();
        let removed = delete_where(&path, |r| r.tx.description == "coffee").unwrap();
        assert_eq!(removed, 2);
        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 1);
    }

    #[test]
    fn test_delete_without_match_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        append(&path, &tx("2024-02-01", Kind::Expense, "Food", "coffee", 4.0)).unwrap();
        let before = std::fs::read(&path).unwrap();
        assert_eq!(delete_where(&path, |_| false).unwrap(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_append_after_row_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = log_path(&dir);
        std::fs::write(
            &path,
            "Date,Type,Category,Description,Amount,User,Notes\n2024-01-15,income,Salary,pay,3500,demo,",
        )
        .unwrap();
        append(&path, &tx("2024-01-16", Kind::Expense, "Food", "grocery", 85.5)).unwrap();
        let snap = load(&path, |_| true).unwrap();
        assert_eq!(snap.records.len(), 2);
        assert!(snap.skipped.is_empty());
    }
}
