use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("No accounts found. Run `tally register <username>` to create one.")]
    NoUsers,

    #[error("Username already exists: {0}")]
    UserExists(String),

    #[error("Not logged in. Pass --user or run `tally login <username>`.")]
    NotLoggedIn,

    /// The record log is truncated before rows are written back, so it may be
    /// left incomplete when this fires.
    #[error("Failed while rewriting {}: {source} (the record log may be incomplete; restore from a backup)", path.display())]
    Rewrite {
        path: PathBuf,
        #[source]
        source: Box<TallyError>,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[cfg_attr(not(feature = "pdf"), allow(dead_code))]
    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, TallyError>;
