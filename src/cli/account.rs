use colored::Colorize;

use crate::cli::{open_store, read_password};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};
use crate::users;

fn remember(username: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.user_name = username.to_string();
    save_settings(&settings)
}

pub fn register(username: &str) -> Result<()> {
    let store = open_store()?;
    let password = read_password("Password: ")?;
    let confirm = if std::env::var(crate::cli::PASSWORD_ENV).is_ok() {
        password.clone()
    } else {
        read_password("Confirm password: ")?
    };
    let name = {
        let _guard = store.lock();
        users::register(store.dir(), username, &password, &confirm)?
    };
    remember(&name)?;
    println!("{} Account created for {}", "✓".green().bold(), name.bold());
    Ok(())
}

pub fn login(username: &str) -> Result<()> {
    let store = open_store()?;
    let password = read_password(&format!("Password for {}: ", username.trim()))?;
    let session = crate::session::Session::login(store, username, &password)?;
    remember(session.user())?;
    println!("Welcome back, {}!", session.user().bold());
    Ok(())
}

pub fn logout() -> Result<()> {
    let settings = load_settings();
    if settings.user_name.is_empty() {
        println!("No user is logged in.");
        return Ok(());
    }
    let name = settings.user_name.clone();
    remember("")?;
    println!("Logged out {name}.");
    Ok(())
}
