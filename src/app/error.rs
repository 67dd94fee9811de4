use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    HttpStatus(u16),

    #[error("Feed decode error: {0}")]
    Decode(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid interval {0:?}: expected <integer><unit> with unit s, m or h")]
    InvalidInterval(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No feeds available")]
    NoFeedsAvailable,

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Feed not found: {0}")]
    FeedNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No user logged in, run `gator login <name>` first")]
    NotLoggedIn,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GatorError>;

impl From<crate::config::ConfigError> for GatorError {
    fn from(err: crate::config::ConfigError) -> Self {
        GatorError::Config(err.to_string())
    }
}
