use std::path::Path;

use colored::Colorize;

use crate::cli::login_session;
use crate::error::{Result, TallyError};

pub fn run(user: Option<String>, file: &str) -> Result<()> {
    let path = Path::new(file);
    if !path.exists() {
        return Err(TallyError::NotFound(format!("File not found: {file}")));
    }
    let session = login_session(user)?;
    let result = session.import(path)?;
    println!(
        "{} Imported {} transaction(s) for {}",
        "✓".green().bold(),
        result.imported,
        session.user()
    );
    if result.skipped > 0 {
        println!("{} {} row(s) skipped (too few columns, unknown type or bad amount)", "!".yellow().bold(), result.skipped);
    }
    Ok(())
}
