use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::dashboard::budget_table;
use crate::cli::{login_session, ReportCommands};
use crate::error::Result;
use crate::fmt::{bar, money_in, percent};
use crate::reports::{self, PeriodTotals};
use crate::session::Session;

const BAR_WIDTH: usize = 30;

pub fn run(user: Option<String>, command: ReportCommands) -> Result<()> {
    let session = login_session(user)?;
    match command {
        ReportCommands::Monthly => series(&session, "Month", reports::monthly_series),
        ReportCommands::Daily => series(&session, "Date", reports::daily_series),
        ReportCommands::Categories => categories(&session),
        ReportCommands::Budget => budget(&session),
    }
}

fn series(
    session: &Session,
    label: &str,
    group: fn(&[crate::models::StoredRecord]) -> Vec<PeriodTotals>,
) -> Result<()> {
    let snapshot = session.snapshot()?;
    let rows = group(&snapshot.records);
    if rows.is_empty() {
        println!("No dated transactions to report.");
        return Ok(());
    }
    let currency = session.preferences().currency;

    let mut table = Table::new();
    table.set_header(vec![label, "Income", "Expense", "Net"]);
    for row in &rows {
        let net = money_in(row.net(), &currency);
        let net = if row.net() < 0.0 { net.red() } else { net.green() };
        table.add_row(vec![
            Cell::new(&row.period),
            Cell::new(money_in(row.income, &currency)),
            Cell::new(money_in(row.expense, &currency)),
            Cell::new(net),
        ]);
    }
    let income: f64 = rows.iter().map(|r| r.income).sum();
    let expense: f64 = rows.iter().map(|r| r.expense).sum();
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money_in(income, &currency).bold()),
        Cell::new(money_in(expense, &currency).bold()),
        Cell::new(money_in(income - expense, &currency).bold()),
    ]);
    println!("{table}");
    Ok(())
}

fn categories(session: &Session) -> Result<()> {
    let snapshot = session.snapshot()?;
    let breakdown = reports::category_breakdown(&snapshot.records);
    if breakdown.items.is_empty() {
        println!("No expenses recorded.");
        return Ok(());
    }
    let currency = session.preferences().currency;
    let max = breakdown.items.iter().map(|i| i.total).fold(0.0, f64::max);

    let mut table = Table::new();
    table.set_header(vec!["Category", "Total", "Count", "Share", ""]);
    for item in &breakdown.items {
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(money_in(item.total, &currency)),
            Cell::new(item.count),
            Cell::new(percent(item.share)),
            Cell::new(bar(item.total, max, BAR_WIDTH)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money_in(breakdown.total, &currency).bold()),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
    ]);
    println!("{}\n{table}", "Expenses by category".bold());
    Ok(())
}

fn budget(session: &Session) -> Result<()> {
    let budgets = session.budgets();
    if budgets.is_empty() {
        println!("No budgets set.");
        return Ok(());
    }
    let snapshot = session.snapshot()?;
    let lines = reports::budget_performance(&reports::category_breakdown(&snapshot.records), &budgets);
    let currency = session.preferences().currency;
    println!("{}\n{}", "Budget performance".bold(), budget_table(&lines, &currency));

    for line in lines.iter().filter(|l| l.overage() > 0.0) {
        println!(
            "{} {} is over budget by {} ({} of limit)",
            "!".red().bold(),
            line.category,
            money_in(line.overage(), &currency),
            percent(line.percentage())
        );
    }
    Ok(())
}
