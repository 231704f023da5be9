use colored::Colorize;
use comfy_table::{Cell, Color, Table};

use crate::cli::{login_session, parse_date_opt};
use crate::error::Result;
use crate::fmt::{money_in, truncate};
use crate::models::{Kind, RecordId, StoredRecord};
use crate::reports::{Filter, KindFilter};
use crate::session::{NewTransaction, TransactionEdit};

pub(crate) fn transactions_table(records: &[StoredRecord], currency: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Type", "Category", "Description", "Amount", "Notes"]);
    for r in records {
        let amount = match r.tx.kind {
            Kind::Income => Cell::new(money_in(r.tx.amount, currency)).fg(Color::Green),
            Kind::Expense => Cell::new(money_in(r.tx.amount, currency)).fg(Color::Red),
        };
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(&r.tx.date),
            Cell::new(r.tx.kind),
            Cell::new(&r.tx.category),
            Cell::new(truncate(&r.tx.description, 40)),
            amount,
            Cell::new(truncate(&r.tx.notes, 30)),
        ]);
    }
    table
}

pub fn add(user: Option<String>, entry: NewTransaction) -> Result<()> {
    let session = login_session(user)?;
    let tx = session.add_transaction(entry)?;
    let currency = session.preferences().currency;
    println!(
        "{} Added {} {} ({}) on {}",
        "✓".green().bold(),
        tx.kind,
        money_in(tx.amount, &currency),
        tx.category,
        tx.date
    );
    Ok(())
}

pub fn list(
    user: Option<String>,
    search: Option<String>,
    kind: &str,
    from: Option<String>,
    to: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let filter = Filter {
        text: search,
        kind: kind.parse::<KindFilter>()?,
        from: parse_date_opt(&from)?,
        to: parse_date_opt(&to)?,
    };
    let session = login_session(user)?;
    let mut records = session.transactions(&filter)?;
    let matched = records.len();
    if let Some(n) = limit {
        records.truncate(n);
    }

    if records.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }
    let currency = session.preferences().currency;
    println!("{}\n{}", "Transactions".bold(), transactions_table(&records, &currency));
    if records.len() < matched {
        println!("Showing {} of {matched}.", records.len());
    }
    Ok(())
}

pub fn delete(user: Option<String>, id: &str) -> Result<()> {
    let id: RecordId = id.parse()?;
    let session = login_session(user)?;
    let record = session.find(id)?;
    session.delete(id)?;
    let currency = session.preferences().currency;
    println!(
        "Deleted transaction {id}: {} {} {} ({})",
        record.tx.date,
        record.tx.kind,
        money_in(record.tx.amount, &currency),
        record.tx.description
    );
    Ok(())
}

pub fn delete_filtered(
    user: Option<String>,
    search: Option<String>,
    kind: Option<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let filter = Filter {
        text: search,
        kind: kind.as_deref().unwrap_or("all").parse::<KindFilter>()?,
        from: parse_date_opt(&from)?,
        to: parse_date_opt(&to)?,
    };
    let session = login_session(user)?;
    let removed = session.delete_filtered(&filter)?;
    println!("Deleted {removed} transaction(s)");
    Ok(())
}

pub fn edit(user: Option<String>, id: &str, edit: TransactionEdit) -> Result<()> {
    let id: RecordId = id.parse()?;
    let session = login_session(user)?;
    let tx = session.update(id, edit)?;
    let currency = session.preferences().currency;
    println!(
        "Updated transaction: {} {} {} ({})",
        tx.date,
        tx.kind,
        money_in(tx.amount, &currency),
        tx.category
    );
    Ok(())
}
