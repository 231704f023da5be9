use std::sync::Arc;

use chrono::{Datelike, Local, NaiveDate};
use colored::Colorize;

use crate::catalog;
use crate::cli::open_store;
use crate::error::Result;
use crate::models::{Kind, Transaction, DATE_FORMAT};
use crate::records;
use crate::store::Store;
use crate::users;

pub const DEMO_USER: &str = "demo";
const DEMO_PASSWORD: &str = "demo";

struct DemoTxn {
    day: u32,
    kind: Kind,
    category: &'static str,
    description: &'static str,
    amount: f64,
    notes: &'static str,
}

const TRANSACTIONS: &[DemoTxn] = &[
    DemoTxn { day: 1, kind: Kind::Income, category: "Salary", description: "Monthly salary", amount: 3500.0, notes: "Regular income" },
    DemoTxn { day: 2, kind: Kind::Expense, category: "Food & Dining", description: "Grocery shopping", amount: 85.50, notes: "Weekly groceries" },
    DemoTxn { day: 3, kind: Kind::Expense, category: "Transportation", description: "Gas fill-up", amount: 45.0, notes: "Car fuel" },
    DemoTxn { day: 4, kind: Kind::Expense, category: "Entertainment", description: "Movie tickets", amount: 28.0, notes: "Weekend movie" },
    DemoTxn { day: 5, kind: Kind::Expense, category: "Bills & Utilities", description: "Electric bill", amount: 120.0, notes: "Monthly electricity" },
    DemoTxn { day: 6, kind: Kind::Expense, category: "Shopping", description: "New shoes", amount: 75.0, notes: "Footwear" },
    DemoTxn { day: 7, kind: Kind::Income, category: "Freelance", description: "Web design project", amount: 500.0, notes: "Side project" },
    DemoTxn { day: 8, kind: Kind::Expense, category: "Healthcare", description: "Doctor visit", amount: 150.0, notes: "Health checkup" },
];

const BUDGETS: &[(&str, f64)] = &[
    ("Food & Dining", 400.0),
    ("Transportation", 200.0),
    ("Entertainment", 100.0),
    ("Bills & Utilities", 300.0),
    ("Shopping", 150.0),
    ("Healthcare", 200.0),
];

/// Days of the current month, never past `today`.
fn demo_date(today: NaiveDate, day: u32) -> String {
    let d = day.min(today.day());
    NaiveDate::from_ymd_opt(today.year(), today.month(), d)
        .unwrap_or(today)
        .format(DATE_FORMAT)
        .to_string()
}

fn demo_transactions(today: NaiveDate) -> Vec<Transaction> {
    TRANSACTIONS
        .iter()
        .map(|t| Transaction {
            date: demo_date(today, t.day),
            kind: t.kind,
            category: t.category.to_string(),
            description: t.description.to_string(),
            amount: t.amount,
            owner: DEMO_USER.to_string(),
            notes: t.notes.to_string(),
        })
        .collect()
}

/// Returns false when the demo user already existed and nothing was written.
pub fn create_demo(store: &Store, today: NaiveDate) -> Result<bool> {
    let _guard = store.lock();
    if users::user_exists(store.dir(), DEMO_USER) {
        return Ok(false);
    }
    users::register(store.dir(), DEMO_USER, DEMO_PASSWORD, DEMO_PASSWORD)?;
    records::append_all(&store.dir().transactions(), &demo_transactions(today))?;
    for (category, limit) in BUDGETS {
        catalog::set_budget(store.dir(), DEMO_USER, category, *limit)?;
    }
    Ok(true)
}

pub fn run() -> Result<()> {
    let store: Arc<Store> = open_store()?;
    if !create_demo(&store, Local::now().date_naive())? {
        println!("The demo account already exists. Log in with username 'demo', password 'demo'.");
        return Ok(());
    }
    println!("{}", "Demo data loaded!".green().bold());
    println!("  User:         {DEMO_USER} (password: {DEMO_PASSWORD})");
    println!("  Transactions: {}", TRANSACTIONS.len());
    println!("  Budgets:      {}", BUDGETS.len());
    println!();
    println!("Try: TALLY_PASSWORD=demo tally --user demo dashboard");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::load;
    use crate::reports::{budget_performance, category_breakdown, quick_stats};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_demo_dates_stay_in_current_month_and_past() {
        assert_eq!(demo_date(day("2024-03-05"), 8), "2024-03-05");
        assert_eq!(demo_date(day("2024-03-20"), 8), "2024-03-08");
    }

    #[test]
    fn test_create_demo_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::open(tmp.path()).unwrap();
        let today = day("2024-01-20");
        assert!(create_demo(&store, today).unwrap());
        assert!(!create_demo(&store, today).unwrap());

        let snap = load(&store.dir().transactions(), |_| true).unwrap();
        assert_eq!(snap.records.len(), TRANSACTIONS.len());
        assert_eq!(users::authenticate(store.dir(), "demo", "demo").unwrap(), "demo");

        let stats = quick_stats(&snap.records, today);
        assert_eq!(stats.top_category.as_deref(), Some("Healthcare"));
        assert_eq!(stats.month_expense, 503.5);

        let budgets = catalog::budgets_for(store.dir(), "demo");
        let lines = budget_performance(&category_breakdown(&snap.records), &budgets);
        let food = lines.iter().find(|l| l.category == "Food & Dining").unwrap();
        assert_eq!(food.actual, 85.5);
    }
}
