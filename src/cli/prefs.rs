use comfy_table::{Cell, Table};

use crate::cli::{open_store, PrefsCommands};
use crate::error::Result;
use crate::settings::{load_preferences, save_preferences, Preferences};

fn print(prefs: &Preferences) {
    let mut table = Table::new();
    table.set_header(vec!["Preference", "Value"]);
    table.add_row(vec![Cell::new("theme"), Cell::new(&prefs.theme)]);
    table.add_row(vec![Cell::new("currency"), Cell::new(&prefs.currency)]);
    table.add_row(vec![Cell::new("notifications"), Cell::new(prefs.notifications)]);
    table.add_row(vec![Cell::new("savings_goal"), Cell::new(prefs.savings_goal)]);
    table.add_row(vec![Cell::new("refresh_secs"), Cell::new(prefs.refresh_secs)]);
    println!("{table}");
}

pub fn run(command: Option<PrefsCommands>) -> Result<()> {
    let store = open_store()?;
    let _guard = store.lock();
    let mut prefs = load_preferences(store.dir());
    match command.unwrap_or(PrefsCommands::Show) {
        PrefsCommands::Show => print(&prefs),
        PrefsCommands::Set {
            currency,
            theme,
            savings_goal,
            refresh_secs,
            notifications,
        } => {
            if let Some(c) = currency {
                prefs.currency = c.trim().to_ascii_uppercase();
            }
            if let Some(t) = theme {
                prefs.theme = t;
            }
            if let Some(g) = savings_goal {
                prefs.savings_goal = g;
            }
            if let Some(s) = refresh_secs {
                prefs.refresh_secs = s;
            }
            if let Some(n) = notifications {
                prefs.notifications = n;
            }
            save_preferences(store.dir(), &prefs)?;
            println!("Preferences saved.");
            print(&prefs);
        }
    }
    Ok(())
}
