use std::collections::BTreeMap;

use log::info;
use sha2::{Digest, Sha256};

use crate::error::{Result, TallyError};
use crate::store::{load_document, save_document, DataDir};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 4;

/// username -> password hash
type UserBook = BTreeMap<String, String>;

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn find_user<'a>(book: &'a UserBook, username: &str) -> Option<(&'a String, &'a String)> {
    let wanted = username.to_lowercase();
    book.iter().find(|(name, _)| name.to_lowercase() == wanted)
}

/// The username as it was registered, matched case-insensitively.
pub fn canonical_name(dir: &DataDir, username: &str) -> Option<String> {
    let book: UserBook = load_document(&dir.users());
    find_user(&book, username.trim()).map(|(name, _)| name.clone())
}

pub fn user_exists(dir: &DataDir, username: &str) -> bool {
    canonical_name(dir, username).is_some()
}

/// Returns the stored (trimmed) username.
pub fn register(dir: &DataDir, username: &str, password: &str, confirm: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() || confirm.is_empty() {
        return Err(TallyError::Validation("Please fill in all fields".to_string()));
    }
    if username.chars().count() < MIN_USERNAME_LEN {
        return Err(TallyError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LEN} characters long"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(TallyError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    if password != confirm {
        return Err(TallyError::Validation("Passwords don't match".to_string()));
    }

    let mut book: UserBook = load_document(&dir.users());
    if find_user(&book, username).is_some() {
        return Err(TallyError::UserExists(username.to_string()));
    }
    book.insert(username.to_string(), hash_password(password));
    save_document(&dir.users(), &book)?;
    info!("registered user {username}");
    Ok(username.to_string())
}

/// Case-insensitive username lookup. Returns the username as stored.
pub fn authenticate(dir: &DataDir, username: &str, password: &str) -> Result<String> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(TallyError::Validation(
            "Please enter both username and password".to_string(),
        ));
    }
    let book: UserBook = load_document(&dir.users());
    if book.is_empty() {
        return Err(TallyError::NoUsers);
    }
    match find_user(&book, username) {
        Some((name, hash)) if *hash == hash_password(password) => Ok(name.clone()),
        _ => Err(TallyError::InvalidCredentials),
    }
}
