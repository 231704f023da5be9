pub mod account;
pub mod backup;
pub mod budget;
pub mod categories;
pub mod dashboard;
pub mod demo;
pub mod export;
pub mod import;
pub mod init;
pub mod prefs;
pub mod report;
pub mod reset;
pub mod status;
pub mod transactions;

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use zeroize::Zeroizing;

use crate::error::{Result, TallyError};
use crate::models::parse_date;
use crate::session::Session;
use crate::settings::{get_data_dir, load_settings};
use crate::store::Store;

pub const PASSWORD_ENV: &str = "TALLY_PASSWORD";

pub(crate) fn open_store() -> Result<Arc<Store>> {
    Ok(Arc::new(Store::open(get_data_dir())?))
}

/// `TALLY_PASSWORD` when set, otherwise an interactive prompt.
pub(crate) fn read_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    Ok(Zeroizing::new(rpassword::prompt_password(prompt)?))
}

/// `--user` wins over the remembered login name.
pub(crate) fn resolve_user(user: Option<String>) -> Result<String> {
    user.filter(|u| !u.trim().is_empty())
        .or_else(|| Some(load_settings().user_name).filter(|u| !u.is_empty()))
        .ok_or(TallyError::NotLoggedIn)
}

/// Authenticate and open a session. Every command that touches a user's data
/// goes through here.
pub(crate) fn login_session(user: Option<String>) -> Result<Session> {
    let username = resolve_user(user)?;
    let store = open_store()?;
    let password = read_password(&format!("Password for {username}: "))?;
    Session::login(store, &username, &password)
}

pub(crate) fn parse_date_opt(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    match raw.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_date(d)
            .map(Some)
            .ok_or_else(|| TallyError::Validation(format!("Invalid date '{d}' (expected YYYY-MM-DD)"))),
        None => Ok(None),
    }
}

#[derive(Parser)]
#[command(name = "tally", version, about = "Personal income and expense tracker with budgets and reports.")]
pub struct Cli {
    /// Act as this user instead of the last one that logged in
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and its default files.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Create a user account.
    Register {
        username: String,
    },
    /// Check a password and remember the user for later commands.
    Login {
        username: String,
    },
    /// Forget the remembered user.
    Logout,
    /// Record an income or expense.
    Add {
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        amount: String,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List transactions, newest first.
    List {
        /// Case-insensitive text to find in descriptions
        #[arg(long)]
        search: Option<String>,
        /// all, income or expense
        #[arg(long = "type", default_value = "all")]
        kind: String,
        /// First date to include: YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last date to include: YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
        /// Show at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete one transaction by the id shown in `list`, or every transaction
    /// matching the given filters.
    Delete {
        #[arg(conflicts_with_all = ["search", "kind", "from", "to"])]
        id: Option<String>,
        /// Case-insensitive text to find in descriptions
        #[arg(long)]
        search: Option<String>,
        /// income or expense
        #[arg(long = "type")]
        kind: Option<String>,
        /// First date to include: YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Last date to include: YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
    /// Change fields of one transaction.
    Edit {
        id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Show totals, quick stats, budgets and recent activity.
    Dashboard {
        /// Keep refreshing until Enter is pressed
        #[arg(long)]
        watch: bool,
        /// Seconds between refreshes (default: from preferences)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Manage budget limits.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Manage income and expense categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Summaries over all of your transactions.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Write your transactions to a file.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Append transactions from a CSV file (Date,Type,Category,Description,Amount[,Notes]).
    Import {
        file: String,
    },
    /// Copy every data file into a timestamped directory.
    Backup {
        /// Directory to create the backup in (default: <data_dir>/backups)
        #[arg(long)]
        output: Option<String>,
    },
    /// Create the demo/demo account with sample data.
    Demo,
    /// Delete all data files and start over.
    Reset {
        /// Confirm that everything should be deleted
        #[arg(long)]
        yes: bool,
    },
    /// Show or change preferences.
    Prefs {
        #[command(subcommand)]
        command: Option<PrefsCommands>,
    },
    /// Show the data directory and record counts.
    Status,
    /// Print a shell completion script.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set (or replace) the limit for a category.
    Set {
        category: String,
        amount: f64,
    },
    /// Show limits against actual spending.
    List,
    /// Remove all of your limits.
    Clear,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category label.
    Add {
        label: String,
        /// income or expense
        #[arg(long = "type", default_value = "expense")]
        kind: String,
    },
    /// List category labels.
    List {
        /// Only this kind: income or expense
        #[arg(long = "type")]
        kind: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Income and expense per month.
    Monthly,
    /// Income and expense per day.
    Daily,
    /// Expense per category.
    Categories,
    /// Budget limits against actual spending.
    Budget,
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Importable CSV.
    Csv {
        /// Output path (default: <data_dir>/exports/transactions-YYYY-MM-DD.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Printable plain-text report.
    Text {
        #[arg(long)]
        output: Option<String>,
    },
    /// Printable PDF report.
    #[cfg(feature = "pdf")]
    Pdf {
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PrefsCommands {
    /// Print the current preferences.
    Show,
    /// Change one or more preferences.
    Set {
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long = "savings-goal")]
        savings_goal: Option<f64>,
        #[arg(long = "refresh-secs")]
        refresh_secs: Option<u64>,
        #[arg(long)]
        notifications: Option<bool>,
    },
}
