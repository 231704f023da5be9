use colored::Colorize;

use crate::cli::open_store;
use crate::error::{Result, TallyError};
use crate::settings::{load_settings, save_settings};

pub fn run(yes: bool) -> Result<()> {
    if !yes {
        return Err(TallyError::Validation(
            "This permanently deletes all transactions, budgets, categories and accounts. \
             Re-run with --yes to confirm."
                .to_string(),
        ));
    }
    let store = open_store()?;
    store.reset()?;

    let mut settings = load_settings();
    if !settings.user_name.is_empty() {
        settings.user_name.clear();
        save_settings(&settings)?;
    }
    println!("{} All data cleared in {}", "✓".green().bold(), store.dir().root().display());
    Ok(())
}
