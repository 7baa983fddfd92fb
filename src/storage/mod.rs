//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with one table:
//! - certificates(serial_number, signer, components[, issue_date, expiry_date])

pub mod codec;
pub mod schema;
pub mod sqlite;

pub use sqlite::{CertificateStore, StoreStats};
