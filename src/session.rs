//! The logged-in user's view of a store.
//!
//! A [`Session`] carries the owner explicitly: every record, budget and report
//! operation is scoped to it, and every call takes the store lock for its whole
//! read or read-modify-write cycle.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info, warn};

use crate::catalog::{self, AddOutcome, Budget, CategorySet};
use crate::error::{Result, TallyError};
use crate::importer::{self, ImportResult};
use crate::models::{parse_amount, parse_date, Kind, RecordId, StoredRecord, Transaction, DATE_FORMAT};
use crate::records::{self, Snapshot};
use crate::reports::{self, Dashboard, Filter};
use crate::settings::{load_preferences, Preferences};
use crate::store::Store;
use crate::users;

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Unvalidated user input for a new record.
#[derive(Debug, Clone, Default)]
pub struct NewTransaction {
    /// Defaults to today.
    pub date: Option<String>,
    pub kind: String,
    pub category: String,
    pub description: String,
    pub amount: String,
    pub notes: String,
}

impl NewTransaction {
    fn validate(self, owner: &str, today: NaiveDate) -> Result<Transaction> {
        let category = self.category.trim();
        let description = self.description.trim();
        let amount = self.amount.trim();
        if category.is_empty() || description.is_empty() || amount.is_empty() {
            return Err(TallyError::Validation(
                "Please fill in all required fields (category, description, amount)".to_string(),
            ));
        }
        let kind: Kind = self.kind.parse()?;
        let amount = parse_amount(amount)
            .ok_or_else(|| TallyError::Validation(format!("Please enter a valid amount: '{amount}'")))?;
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_date(raw)
                .ok_or_else(|| TallyError::Validation(format!("Invalid date '{raw}' (expected YYYY-MM-DD)")))?,
            None => today,
        };
        Ok(Transaction {
            date: date.format(DATE_FORMAT).to_string(),
            kind,
            category: category.to_string(),
            description: description.to_string(),
            amount,
            owner: owner.to_string(),
            notes: self.notes.trim().to_string(),
        })
    }
}

/// Field replacements for an existing record. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TransactionEdit {
    pub date: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub notes: Option<String>,
}

impl TransactionEdit {
    fn over(self, current: &Transaction) -> NewTransaction {
        NewTransaction {
            date: Some(self.date.unwrap_or_else(|| current.date.clone())),
            kind: self.kind.unwrap_or_else(|| current.kind.to_string()),
            category: self.category.unwrap_or_else(|| current.category.clone()),
            description: self.description.unwrap_or_else(|| current.description.clone()),
            amount: self.amount.unwrap_or_else(|| current.amount.to_string()),
            notes: self.notes.unwrap_or_else(|| current.notes.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Refresh task
// ---------------------------------------------------------------------------

pub type RefreshCallback = Box<dyn FnMut(Result<Dashboard>) + Send>;

/// Recomputes the dashboard on a fixed interval until cancelled. Dropping the
/// task cancels it and waits for the worker thread to finish.
pub struct RefreshTask {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTask {
    fn spawn(store: Arc<Store>, owner: String, interval: Duration, mut callback: RefreshCallback) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::Builder::new()
            .name("tally-refresh".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("refreshing dashboard for {owner}");
                        callback(compute_dashboard(&store, &owner, today()));
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("dashboard refresh thread panicked");
            }
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn owned_by<'a>(owner: &'a str) -> impl FnMut(&StoredRecord) -> bool + 'a {
    move |r| r.tx.owner == owner
}

/// One locked snapshot of records, budgets and preferences folded into a dashboard.
fn compute_dashboard(store: &Store, owner: &str, today: NaiveDate) -> Result<Dashboard> {
    let (snapshot, budgets, prefs) = {
        let _guard = store.lock();
        (
            records::load(&store.dir().transactions(), owned_by(owner))?,
            catalog::budgets_for(store.dir(), owner),
            load_preferences(store.dir()),
        )
    };
    Ok(reports::dashboard(&snapshot.records, &budgets, today, prefs.savings_goal))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session {
    user: String,
    store: Arc<Store>,
    refresh: Option<RefreshTask>,
}

impl Session {
    pub fn login(store: Arc<Store>, username: &str, password: &str) -> Result<Self> {
        let user = {
            let _guard = store.lock();
            users::authenticate(store.dir(), username, password)?
        };
        info!("{user} logged in");
        Ok(Self {
            user,
            store,
            refresh: None,
        })
    }

    /// Open a session for an already-verified user, e.g. right after registering.
    pub fn for_user(store: Arc<Store>, username: &str) -> Result<Self> {
        let user = {
            let _guard = store.lock();
            users::canonical_name(store.dir(), username)
        }
        .ok_or_else(|| TallyError::NotFound(format!("No such user: {username}")))?;
        Ok(Self {
            user,
            store,
            refresh: None,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    // -- records ------------------------------------------------------------

    pub fn add_transaction(&self, new: NewTransaction) -> Result<Transaction> {
        let tx = new.validate(&self.user, today())?;
        let _guard = self.store.lock();
        records::append(&self.store.dir().transactions(), &tx)?;
        Ok(tx)
    }

    /// Every well-formed record of this user, in file order, plus the malformed
    /// rows met along the way.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let _guard = self.store.lock();
        records::load(&self.store.dir().transactions(), owned_by(&self.user))
    }

    pub fn transactions(&self, filter: &Filter) -> Result<Vec<StoredRecord>> {
        let snapshot = self.snapshot()?;
        Ok(reports::filter_view(&snapshot.records, filter).into_iter().cloned().collect())
    }

    pub fn find(&self, id: RecordId) -> Result<StoredRecord> {
        self.snapshot()?
            .records
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| TallyError::NotFound(format!("No transaction with id {id}")))
    }

    pub fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.store.lock();
        let owner = self.user.as_str();
        let removed = records::delete_first(&self.store.dir().transactions(), |r| {
            r.id == id && r.tx.owner == owner
        })?;
        if !removed {
            return Err(TallyError::NotFound(format!("No transaction with id {id}")));
        }
        Ok(())
    }

    /// Remove every one of the owner's records in the filtered view. An empty
    /// filter is refused rather than wiping the owner's log.
    pub fn delete_filtered(&self, filter: &Filter) -> Result<usize> {
        if filter.is_empty() {
            return Err(TallyError::Validation(
                "Give an id or at least one of --search, --type, --from, --to".to_string(),
            ));
        }
        let _guard = self.store.lock();
        let owner = self.user.as_str();
        let removed = records::delete_where(&self.store.dir().transactions(), |r| {
            r.tx.owner == owner && filter.accepts(r)
        })?;
        info!("deleted {removed} transaction(s) for {owner}");
        Ok(removed)
    }

    /// Replace a record. The edited record moves to the end of the log.
    pub fn update(&self, id: RecordId, edit: TransactionEdit) -> Result<Transaction> {
        let _guard = self.store.lock();
        let path = self.store.dir().transactions();
        let current = records::scan(&path, owned_by(&self.user))?
            .find(|r| r.as_ref().map_or(true, |r| r.id == id))
            .transpose()?
            .ok_or_else(|| TallyError::NotFound(format!("No transaction with id {id}")))?;
        let updated = edit.over(&current.tx).validate(&self.user, today())?;
        info!("replacing record {id} at line {}", current.line);
        records::delete_by_id(&path, id)?;
        records::append(&path, &updated)?;
        Ok(updated)
    }

    pub fn import(&self, file_path: &Path) -> Result<ImportResult> {
        let parsed = importer::parse_file(file_path, &self.user)?;
        let _guard = self.store.lock();
        let imported = records::append_all(&self.store.dir().transactions(), &parsed.rows)?;
        info!("imported {imported} transaction(s) for {}", self.user);
        Ok(ImportResult {
            imported,
            skipped: parsed.skipped,
        })
    }

    // -- reports ------------------------------------------------------------

    pub fn dashboard(&self, today: NaiveDate) -> Result<Dashboard> {
        compute_dashboard(&self.store, &self.user, today)
    }

    /// Recompute the dashboard every `interval` and hand it to `callback`.
    /// Replaces any refresh already running.
    pub fn start_auto_refresh(&mut self, interval: Duration, callback: RefreshCallback) -> Result<()> {
        self.stop_auto_refresh();
        self.refresh = Some(RefreshTask::spawn(
            Arc::clone(&self.store),
            self.user.clone(),
            interval,
            callback,
        )?);
        Ok(())
    }

    pub fn stop_auto_refresh(&mut self) {
        if let Some(mut task) = self.refresh.take() {
            task.cancel();
        }
    }

    // -- categories and budgets --------------------------------------------

    pub fn categories(&self) -> CategorySet {
        let _guard = self.store.lock();
        catalog::load_categories(self.store.dir())
    }

    pub fn add_category(&self, kind: Kind, label: &str) -> Result<AddOutcome> {
        let _guard = self.store.lock();
        catalog::add_category(self.store.dir(), kind, label)
    }

    pub fn budgets(&self) -> Vec<Budget> {
        let _guard = self.store.lock();
        catalog::budgets_for(self.store.dir(), &self.user)
    }

    pub fn set_budget(&self, category: &str, limit: f64) -> Result<()> {
        let _guard = self.store.lock();
        catalog::set_budget(self.store.dir(), &self.user, category, limit)
    }

    pub fn clear_budgets(&self) -> Result<bool> {
        let _guard = self.store.lock();
        catalog::clear_budgets(self.store.dir(), &self.user)
    }

    pub fn preferences(&self) -> Preferences {
        let _guard = self.store.lock();
        load_preferences(self.store.dir())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_auto_refresh();
    }
}
