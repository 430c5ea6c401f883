//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all infrastructure failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// A disposition was rejected.
    Disposition(DispositionError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Disposition(err) => write!(f, "disposition: {err}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<DispositionError> for AppError {
    fn from(err: DispositionError) -> Self {
        Self::Disposition(err)
    }
}

/// Recoverable failures of a disposition request.
///
/// None of these affect the live queue: a failed disposition leaves the lead
/// where it was, with its attempt count unchanged. Callers surface the error
/// to the operator and let them choose again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionError {
    /// Action or payload not permitted by the current configuration.
    InvalidAction(String),
    /// Target lead is no longer awaiting contact in the store.
    UnknownLead(String),
    /// Another disposition for the same lead is already in flight.
    ConcurrentModification(String),
    /// The underlying store failed while reading or committing.
    Store(String),
}

impl Display for DispositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAction(msg) => write!(f, "invalid action: {msg}"),
            Self::UnknownLead(msg) => write!(f, "unknown lead: {msg}"),
            Self::ConcurrentModification(msg) => write!(f, "concurrent modification: {msg}"),
            Self::Store(msg) => write!(f, "store: {msg}"),
        }
    }
}

impl std::error::Error for DispositionError {}

impl From<AppError> for DispositionError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Disposition(inner) => inner,
            AppError::NotFound(msg) => Self::UnknownLead(msg),
            other => Self::Store(other.to_string()),
        }
    }
}
