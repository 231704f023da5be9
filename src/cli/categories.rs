use comfy_table::{Cell, Table};

use crate::catalog::AddOutcome;
use crate::cli::login_session;
use crate::error::Result;
use crate::models::Kind;

pub fn add(user: Option<String>, label: &str, kind: &str) -> Result<()> {
    let kind: Kind = kind.parse()?;
    let session = login_session(user)?;
    match session.add_category(kind, label)? {
        AddOutcome::Added => println!("Added {kind} category: {}", label.trim()),
        AddOutcome::AlreadyExists => println!("Category already exists: {}", label.trim()),
    }
    Ok(())
}

pub fn list(user: Option<String>, kind: Option<String>) -> Result<()> {
    let kinds = match kind {
        Some(k) => vec![k.parse::<Kind>()?],
        None => vec![Kind::Expense, Kind::Income],
    };
    let session = login_session(user)?;
    let set = session.categories();

    let mut table = Table::new();
    table.set_header(vec!["Type", "Category"]);
    for kind in kinds {
        for label in set.labels(kind) {
            table.add_row(vec![Cell::new(kind), Cell::new(label)]);
        }
    }
    println!("Categories\n{table}");
    Ok(())
}
