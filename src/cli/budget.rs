use colored::Colorize;

use crate::cli::dashboard::budget_table;
use crate::cli::login_session;
use crate::error::Result;
use crate::fmt::money_in;
use crate::reports::{budget_performance, category_breakdown};

pub fn set(user: Option<String>, category: &str, amount: f64) -> Result<()> {
    let session = login_session(user)?;
    session.set_budget(category, amount)?;
    let currency = session.preferences().currency;
    println!(
        "{} Budget for {} set to {}",
        "✓".green().bold(),
        category.trim(),
        money_in(amount, &currency)
    );
    Ok(())
}

pub fn list(user: Option<String>) -> Result<()> {
    let session = login_session(user)?;
    let budgets = session.budgets();
    if budgets.is_empty() {
        println!("No budgets set. Add one with `tally budget set <category> <amount>`.");
        return Ok(());
    }
    let snapshot = session.snapshot()?;
    let lines = budget_performance(&category_breakdown(&snapshot.records), &budgets);
    let currency = session.preferences().currency;
    println!("{}\n{}", "Budgets".bold(), budget_table(&lines, &currency));
    Ok(())
}

pub fn clear(user: Option<String>) -> Result<()> {
    let session = login_session(user)?;
    if session.clear_budgets()? {
        println!("Cleared all budgets for {}", session.user());
    } else {
        println!("No budgets to clear.");
    }
    Ok(())
}
