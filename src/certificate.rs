//! Certificate types
//!
//! A certificate records that a signer vouched for an ordered list of
//! components. The serial number is the only identity a certificate has.

use crate::{Error, Result};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How long a freshly issued certificate stays valid
pub const VALIDITY_MONTHS: u32 = 12;

/// Table layout the repository works against.
///
/// `Basic` stores serial, signer and components only. `Dated` also tracks
/// issue and expiry timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaProfile {
    Basic,
    Dated,
}

impl SchemaProfile {
    /// Get the string representation of the profile
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaProfile::Basic => "basic",
            SchemaProfile::Dated => "dated",
        }
    }

    /// Whether rows under this profile carry issue/expiry dates
    pub fn tracks_dates(&self) -> bool {
        matches!(self, SchemaProfile::Dated)
    }
}

impl FromStr for SchemaProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "basic" | "simple" => Ok(SchemaProfile::Basic),
            "dated" | "rich" => Ok(SchemaProfile::Dated),
            _ => Err(Error::InvalidArgument(format!("Unknown schema profile: {}", s))),
        }
    }
}

impl std::fmt::Display for SchemaProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue and expiry timestamps of a certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
}

impl Validity {
    /// Validity window starting at `issue_date` and lasting one year
    pub fn starting_at(issue_date: DateTime<Utc>) -> Self {
        let expiry_date = issue_date
            .checked_add_months(Months::new(VALIDITY_MONTHS))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            issue_date,
            expiry_date,
        }
    }

    /// Validity window starting now
    pub fn issued_now() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expiry_date
    }
}

/// A certificate record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Unique identifier, primary key of the store
    pub serial_number: String,
    /// Issuing authority
    pub signer: String,
    /// Certified components, in the order given at insert
    pub components: Vec<String>,
    /// Issue/expiry dates, only present under the dated profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<Validity>,
}

impl Certificate {
    /// Create a certificate without dates
    pub fn new(
        serial_number: impl Into<String>,
        signer: impl Into<String>,
        components: Vec<String>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            signer: signer.into(),
            components,
            validity: None,
        }
    }

    /// Attach a validity window
    pub fn with_validity(mut self, validity: Validity) -> Self {
        self.validity = Some(validity);
        self
    }

    /// Check the fields the store requires before anything is written
    pub fn validate(&self) -> Result<()> {
        if self.serial_number.trim().is_empty() {
            return Err(Error::InvalidArgument("serial number must not be empty".into()));
        }
        if self.signer.trim().is_empty() {
            return Err(Error::InvalidArgument("signer must not be empty".into()));
        }
        if self.components.is_empty() {
            return Err(Error::InvalidArgument("at least one component is required".into()));
        }
        if self.components.iter().any(|c| c.is_empty()) {
            return Err(Error::InvalidArgument("component names must not be empty".into()));
        }
        Ok(())
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        self.validity.is_some_and(|v| v.is_expired_at(at))
    }
}

impl std::fmt::Display for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Certificate: Serial={}, Signer={}, Components=[{}]",
            self.serial_number,
            self.signer,
            self.components.join(", ")
        )?;
        if let Some(validity) = &self.validity {
            write!(
                f,
                ", Issued={}, Expires={}",
                validity.issue_date.to_rfc3339(),
                validity.expiry_date.to_rfc3339()
            )?;
        }
        Ok(())
    }
}

/// Split a user-typed component list (`a,b,c`) into its components.
///
/// Surrounding whitespace is trimmed and empty segments are dropped.
pub fn split_components(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_split_components() {
        assert_eq!(split_components("bootloader,kernel"), vec!["bootloader", "kernel"]);
        assert_eq!(split_components(" a , ,b,"), vec!["a", "b"]);
        assert!(split_components(",,").is_empty());
    }

    #[test]
    fn test_validity_is_one_year() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let validity = Validity::starting_at(issued);
        assert_eq!(validity.expiry_date, Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap());
        assert!(!validity.is_expired_at(issued));
        assert!(validity.is_expired_at(validity.expiry_date));
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        assert!(Certificate::new("", "AcmeCA", vec!["a".into()]).validate().is_err());
        assert!(Certificate::new("SN1", " ", vec!["a".into()]).validate().is_err());
        assert!(Certificate::new("SN1", "AcmeCA", vec![]).validate().is_err());
        assert!(Certificate::new("SN1", "AcmeCA", vec!["a".into()]).validate().is_ok());
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("dated".parse::<SchemaProfile>().unwrap(), SchemaProfile::Dated);
        assert_eq!("Basic".parse::<SchemaProfile>().unwrap(), SchemaProfile::Basic);
        assert!("other".parse::<SchemaProfile>().is_err());
    }

    #[test]
    fn test_display_without_dates() {
        let cert = Certificate::new("SN001", "AcmeCA", vec!["bootloader".into(), "kernel".into()]);
        assert_eq!(
            cert.to_string(),
            "Certificate: Serial=SN001, Signer=AcmeCA, Components=[bootloader, kernel]"
        );
    }
}
