//! SQLite storage implementation

use std::path::Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use crate::certificate::{Certificate, SchemaProfile, Validity, split_components};
use crate::{Error, Result};
use super::{codec, schema};

/// SQLite-backed repository of certificates
pub struct CertificateStore {
    conn: Connection,
    profile: SchemaProfile,
}

/// A row as read from the table, before the component list is decoded
struct RawCertificate {
    serial_number: String,
    signer: String,
    components: String,
    validity: Option<Validity>,
}

impl CertificateStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, profile: SchemaProfile) -> Result<Self> {
        tracing::debug!("Opening {} certificate store at {}", profile, path.display());
        let conn = Connection::open(path)?;
        let store = Self { conn, profile };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(profile: SchemaProfile) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn, profile };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create the certificates table if missing, then make sure an existing
    /// table has the columns this profile expects
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute(schema::create_table_statement(self.profile), [])?;
        self.verify_schema()
    }

    fn verify_schema(&self) -> Result<()> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(certificates)")?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        match schema::detect_profile(&columns) {
            Some(found) if found == self.profile => Ok(()),
            found => Err(Error::SchemaMismatch {
                expected: self.profile,
                found: found.map_or_else(|| "unrecognised".to_string(), |p| p.to_string()),
            }),
        }
    }

    /// Close the underlying connection, reporting any failure to flush
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Storage(e))
    }

    // ========== Certificate Operations ==========

    /// Insert a new certificate.
    ///
    /// Under the dated profile a certificate without validity is stamped as
    /// issued now, expiring one year later. Under the basic profile any
    /// validity is not persisted.
    pub fn insert_certificate(&self, cert: &Certificate) -> Result<()> {
        cert.validate()?;
        let components = codec::encode_components(&cert.components);

        let result = match self.profile {
            SchemaProfile::Basic => {
                if cert.validity.is_some() {
                    tracing::debug!("Basic profile, dropping validity of {}", cert.serial_number);
                }
                self.conn.execute(
                    "INSERT INTO certificates (serial_number, signer, components) VALUES (?1, ?2, ?3)",
                    params![cert.serial_number, cert.signer, components],
                )
            }
            SchemaProfile::Dated => {
                let validity = cert.validity.unwrap_or_else(Validity::issued_now);
                self.conn.execute(
                    r#"
                    INSERT INTO certificates (serial_number, signer, components, issue_date, expiry_date)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        cert.serial_number,
                        cert.signer,
                        components,
                        validity.issue_date.to_rfc3339(),
                        validity.expiry_date.to_rfc3339(),
                    ],
                )
            }
        };

        match result {
            Ok(_) => {
                tracing::info!("Inserted certificate {} signed by {}", cert.serial_number, cert.signer);
                Ok(())
            }
            Err(e) => Err(insert_error(&cert.serial_number, e)),
        }
    }

    /// Insert from raw text fields, with components given as `a,b,c`
    pub fn insert_certificate_raw(&self, serial_number: &str, signer: &str, components: &str) -> Result<()> {
        let cert = Certificate::new(serial_number, signer, split_components(components));
        self.insert_certificate(&cert)
    }

    /// Check whether a certificate with this serial number is stored
    pub fn certificate_exists(&self, serial_number: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM certificates WHERE serial_number = ?1",
            [serial_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a certificate by serial number
    pub fn get_certificate(&self, serial_number: &str) -> Result<Option<Certificate>> {
        let sql = format!("{} WHERE serial_number = ?1", self.select_sql());
        let raw = self
            .conn
            .query_row(&sql, [serial_number], |row| self.row_to_raw(row))
            .optional()?;
        Ok(raw.map(decode_certificate))
    }

    /// Get all stored certificates, in insertion order
    pub fn get_certificates(&self) -> Result<Vec<Certificate>> {
        let sql = format!("{} ORDER BY rowid", self.select_sql());
        let mut stmt = self.conn.prepare(&sql)?;

        let rows = stmt
            .query_map([], |row| self.row_to_raw(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows.into_iter().map(decode_certificate).collect())
    }

    /// Count all certificates
    pub fn count_certificates(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM certificates", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let expired = if self.profile.tracks_dates() {
            let now = Utc::now();
            Some(
                self.get_certificates()?
                    .iter()
                    .filter(|cert| cert.is_expired_at(now))
                    .count(),
            )
        } else {
            None
        };

        Ok(StoreStats {
            profile: self.profile,
            total: self.count_certificates()?,
            expired,
        })
    }

    fn select_sql(&self) -> &'static str {
        match self.profile {
            SchemaProfile::Basic => "SELECT serial_number, signer, components FROM certificates",
            SchemaProfile::Dated => {
                "SELECT serial_number, signer, components, issue_date, expiry_date FROM certificates"
            }
        }
    }

    /// Helper to convert a row to a RawCertificate
    fn row_to_raw(&self, row: &rusqlite::Row) -> rusqlite::Result<RawCertificate> {
        let validity = if self.profile.tracks_dates() {
            Some(Validity {
                issue_date: parse_timestamp(row, 3)?,
                expiry_date: parse_timestamp(row, 4)?,
            })
        } else {
            None
        };

        Ok(RawCertificate {
            serial_number: row.get(0)?,
            signer: row.get(1)?,
            components: row.get(2)?,
            validity,
        })
    }
}

fn decode_certificate(raw: RawCertificate) -> Certificate {
    let components = codec::decode_components(&raw.serial_number, &raw.components);
    Certificate {
        serial_number: raw.serial_number,
        signer: raw.signer,
        components,
        validity: raw.validity,
    }
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

/// Only a primary-key clash is a duplicate serial; other constraint
/// failures stay storage errors.
fn insert_error(serial_number: &str, err: rusqlite::Error) -> Error {
    let primary_key_clash = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    );
    if primary_key_clash {
        Error::DuplicateSerial(serial_number.to_string())
    } else {
        Error::Storage(err)
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub profile: SchemaProfile,
    pub total: usize,
    /// Only known under the dated profile
    pub expired: Option<usize>,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics ({}):", self.profile)?;
        write!(f, "  Certificates: {}", self.total)?;
        if let Some(expired) = self.expired {
            write!(f, "\n  Expired: {}", expired)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_certificate(serial: &str) -> Certificate {
        Certificate::new(serial, "AcmeCA", vec!["bootloader".to_string(), "kernel".to_string()])
    }

    #[test]
    fn test_insert_then_exists() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();

        store.insert_certificate(&sample_certificate("SN001")).unwrap();

        assert!(store.certificate_exists("SN001").unwrap());
    }

    #[test]
    fn test_missing_serial_is_not_an_error() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        assert!(!store.certificate_exists("SN999").unwrap());
        assert!(store.get_certificate("SN999").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_serial_is_rejected() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        store.insert_certificate(&sample_certificate("SN001")).unwrap();

        let other = Certificate::new("SN001", "EvilCA", vec!["rootkit".to_string()]);
        let err = store.insert_certificate(&other).unwrap_err();
        assert!(matches!(err, Error::DuplicateSerial(ref s) if s == "SN001"));

        let stored = store.get_certificate("SN001").unwrap().unwrap();
        assert_eq!(stored, sample_certificate("SN001"));
        assert_eq!(store.count_certificates().unwrap(), 1);
    }

    #[test]
    fn test_get_certificates_round_trips_components() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        assert!(store.get_certificates().unwrap().is_empty());

        let certs = vec![
            sample_certificate("SN001"),
            Certificate::new("SN002", "OtherCA", vec!["firmware".to_string()]),
            Certificate::new("SN003", "AcmeCA", vec!["a,b".to_string(), "c".to_string()]),
        ];
        for cert in &certs {
            store.insert_certificate(cert).unwrap();
        }

        let stored = store.get_certificates().unwrap();
        assert_eq!(stored, certs);
    }

    #[test]
    fn test_invalid_certificate_never_reaches_the_table() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        let err = store.insert_certificate(&Certificate::new("SN1", "", vec!["a".to_string()])).unwrap_err();
        assert!(err.is_argument_error());
        assert_eq!(store.count_certificates().unwrap(), 0);
    }

    #[test]
    fn test_raw_insert_splits_components() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        store.insert_certificate_raw("SN001", "AcmeCA", "bootloader,kernel").unwrap();

        let stored = store.get_certificate("SN001").unwrap().unwrap();
        assert_eq!(stored.components, vec!["bootloader", "kernel"]);
        assert!(stored.validity.is_none());
    }

    #[test]
    fn test_dated_profile_stamps_validity() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Dated).unwrap();
        let before = Utc::now();
        store.insert_certificate(&sample_certificate("SN001")).unwrap();

        let stored = store.get_certificate("SN001").unwrap().unwrap();
        let validity = stored.validity.unwrap();
        assert!(validity.issue_date >= before);
        assert_eq!(validity, Validity::starting_at(validity.issue_date));
    }

    #[test]
    fn test_dated_profile_keeps_given_validity_and_counts_expired() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Dated).unwrap();
        let old = Validity::starting_at(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
        store.insert_certificate(&sample_certificate("OLD").with_validity(old)).unwrap();
        store.insert_certificate(&sample_certificate("NEW")).unwrap();

        assert_eq!(store.get_certificate("OLD").unwrap().unwrap().validity, Some(old));

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.expired, Some(1));
    }

    #[test]
    fn test_legacy_comma_joined_rows_are_readable() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO certificates (serial_number, signer, components) VALUES ('SN1', 'AcmeCA', 'bootloader,kernel')",
                [],
            )
            .unwrap();

        let certs = store.get_certificates().unwrap();
        assert_eq!(certs[0].components, vec!["bootloader", "kernel"]);
    }

    #[test]
    fn test_bracketed_legacy_row_does_not_break_listing() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO certificates (serial_number, signer, components) VALUES ('OLD', 'AcmeCA', '[beta]bootloader,kernel')",
                [],
            )
            .unwrap();
        store.insert_certificate(&sample_certificate("NEW")).unwrap();

        let certs = store.get_certificates().unwrap();
        assert_eq!(certs.len(), 2);
        assert_eq!(certs[0].components, vec!["[beta]bootloader", "kernel"]);
        assert_eq!(certs[1], sample_certificate("NEW"));
    }

    #[test]
    fn test_only_primary_key_clash_is_a_duplicate() {
        let store = CertificateStore::open_in_memory(SchemaProfile::Basic).unwrap();

        let not_null = store
            .conn
            .execute(
                "INSERT INTO certificates (serial_number, signer, components) VALUES ('SN1', NULL, '[]')",
                [],
            )
            .unwrap_err();
        assert!(matches!(insert_error("SN1", not_null), Error::Storage(_)));

        store.insert_certificate(&sample_certificate("SN1")).unwrap();
        let clash = store
            .conn
            .execute(
                "INSERT INTO certificates (serial_number, signer, components) VALUES ('SN1', 'AcmeCA', '[]')",
                [],
            )
            .unwrap_err();
        assert!(matches!(insert_error("SN1", clash), Error::DuplicateSerial(ref s) if s == "SN1"));
    }

    #[test]
    fn test_reopen_is_idempotent_and_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certificates.db");

        let store = CertificateStore::open(&path, SchemaProfile::Dated).unwrap();
        store.insert_certificate(&sample_certificate("SN001")).unwrap();
        store.close().unwrap();

        let store = CertificateStore::open(&path, SchemaProfile::Dated).unwrap();
        assert!(store.certificate_exists("SN001").unwrap());
        assert_eq!(store.count_certificates().unwrap(), 1);
    }

    #[test]
    fn test_profile_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("certificates.db");
        CertificateStore::open(&path, SchemaProfile::Basic).unwrap().close().unwrap();

        let err = CertificateStore::open(&path, SchemaProfile::Dated).err().unwrap();
        assert!(matches!(
            err,
            Error::SchemaMismatch { expected: SchemaProfile::Dated, ref found } if found == "basic"
        ));
    }
}
