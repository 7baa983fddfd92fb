//! Database schema definitions

use crate::certificate::SchemaProfile;

/// SQL to create the certificates table without dates
pub const CREATE_BASIC_CERTIFICATES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS certificates (
    serial_number TEXT PRIMARY KEY,
    signer TEXT NOT NULL,
    components TEXT NOT NULL
)
"#;

/// SQL to create the certificates table with issue/expiry tracking.
/// Dates are RFC 3339 UTC text.
pub const CREATE_DATED_CERTIFICATES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS certificates (
    serial_number TEXT PRIMARY KEY,
    signer TEXT NOT NULL,
    components TEXT NOT NULL,
    issue_date TEXT NOT NULL,
    expiry_date TEXT NOT NULL
)
"#;

/// Columns shared by both profiles
pub const BASIC_COLUMNS: &[&str] = &["serial_number", "signer", "components"];

/// Columns of the dated profile
pub const DATED_COLUMNS: &[&str] = &[
    "serial_number",
    "signer",
    "components",
    "issue_date",
    "expiry_date",
];

/// Schema creation statement for a profile
pub fn create_table_statement(profile: SchemaProfile) -> &'static str {
    match profile {
        SchemaProfile::Basic => CREATE_BASIC_CERTIFICATES_TABLE,
        SchemaProfile::Dated => CREATE_DATED_CERTIFICATES_TABLE,
    }
}

/// Expected column names, in declaration order
pub fn expected_columns(profile: SchemaProfile) -> &'static [&'static str] {
    match profile {
        SchemaProfile::Basic => BASIC_COLUMNS,
        SchemaProfile::Dated => DATED_COLUMNS,
    }
}

/// Guess which profile created a table from its column names
pub fn detect_profile(columns: &[String]) -> Option<SchemaProfile> {
    [SchemaProfile::Basic, SchemaProfile::Dated]
        .into_iter()
        .find(|profile| {
            let expected = expected_columns(*profile);
            expected.len() == columns.len() && expected.iter().zip(columns).all(|(e, c)| c == e)
        })
}
