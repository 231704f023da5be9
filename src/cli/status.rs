use std::collections::BTreeMap;

use crate::error::Result;
use crate::fmt::format_bytes;
use crate::records;
use crate::settings::{get_data_dir, load_settings};
use crate::store::{load_document, DataDir};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let dir = DataDir::new(get_data_dir());
    let log = dir.transactions();

    println!("User:       {}", if settings.user_name.is_empty() { "(not logged in)" } else { &settings.user_name });
    println!("Data dir:   {}", dir.root().display());
    println!("Records:    {}", log.display());

    if log.exists() {
        let size = std::fs::metadata(&log)?.len();
        println!("Log size:   {}", format_bytes(size));

        let snapshot = records::load(&log, |_| true)?;
        let accounts: BTreeMap<String, String> = load_document(&dir.users());

        println!();
        println!("Transactions:  {}", snapshot.records.len());
        println!("Accounts:      {}", accounts.len());
        println!("Skipped rows:  {}", snapshot.skipped.len());
        for row in &snapshot.skipped {
            println!("  line {}: {}", row.line, row.reason);
        }
    } else {
        println!();
        println!("Data directory not initialized. Run `tally init` to set up.");
    }
    Ok(())
}
