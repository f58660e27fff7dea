//! Strongly-typed identifiers for domain entities
//!
//! Using newtype wrappers around UUIDs provides type safety and prevents
//! accidental mixing of different identifier types. The meter number is the
//! one non-UUID key: it is an operator-assigned business identifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let uuid_str = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// Billing domain identifiers
define_id!(CustomerId, "CUS");
define_id!(ReadingId, "RDG");
define_id!(BillId, "BIL");
define_id!(PaymentId, "PAY");

/// Error produced when a meter number fails validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeterNumberError {
    #[error("Meter number cannot be empty")]
    Empty,

    #[error("Meter number too long: {0} characters (max 32)")]
    TooLong(usize),

    #[error("Meter number contains invalid character: {0:?}")]
    InvalidCharacter(char),
}

/// An operator-assigned meter number, the immutable business key for a
/// customer's water connection
///
/// Alphanumeric plus `-` and `/`, at most 32 characters. Stored uppercase
/// so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeterNumber(String);

impl MeterNumber {
    /// Parses and normalizes a meter number
    pub fn new(raw: impl AsRef<str>) -> Result<Self, MeterNumberError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(MeterNumberError::Empty);
        }
        if trimmed.len() > 32 {
            return Err(MeterNumberError::TooLong(trimmed.len()));
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '/')
        {
            return Err(MeterNumberError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the normalized meter number string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MeterNumber {
    type Err = MeterNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
