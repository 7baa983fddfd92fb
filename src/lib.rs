//! # Certstore - Local certificate metadata registry
//!
//! Records which signer certified which set of components, keyed by serial
//! number, in a single SQLite file.
//!
//! Certstore provides:
//! - A `certificates` repository over SQLite with two schema profiles
//!   (basic, and dated with issue/expiry timestamps)
//! - An interactive command shell (`certstore-shell`)
//! - A flag-driven one-shot CLI (`certstore`)

pub mod certificate;
pub mod cli;
pub mod config;
pub mod logging;
pub mod shell;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use certificate::{Certificate, SchemaProfile, Validity};
pub use storage::CertificateStore;

/// Result type alias for Certstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Certstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Certificate with serial number {0} already exists")]
    DuplicateSerial(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Schema mismatch: database holds a {found} certificates table, expected {expected}")]
    SchemaMismatch {
        expected: SchemaProfile,
        found: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error came from user input rather than the store
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}
