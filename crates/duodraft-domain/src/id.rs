//! Identifier value objects
//!
//! Teachers and students are issued by the roster and user stores as
//! 24-character hexadecimal object ids. Both are validated here so nothing
//! malformed can reach a store.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a hexadecimal object id
pub const OBJECT_ID_LEN: usize = 24;

/// Error returned when an identifier string is not well formed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier was empty
    #[error("{kind} id is empty")]
    Empty {
        /// Which identifier was being parsed
        kind: &'static str,
    },

    /// Identifier did not have the expected length
    #[error("{kind} id must be {expected} characters, got {actual}")]
    Length {
        /// Which identifier was being parsed
        kind: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Identifier contained a non-hexadecimal character
    #[error("{kind} id contains non-hex character {found:?}")]
    NotHex {
        /// Which identifier was being parsed
        kind: &'static str,
        /// Offending character
        found: char,
    },

    /// Round id was not a valid UUID
    #[error("round id is not a valid UUID: {0}")]
    Uuid(String),
}

fn parse_object_id(kind: &'static str, raw: &str) -> Result<String, IdError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if raw.len() != OBJECT_ID_LEN {
        return Err(IdError::Length {
            kind,
            expected: OBJECT_ID_LEN,
            actual: raw.len(),
        });
    }
    if let Some(found) = raw.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(IdError::NotHex { kind, found });
    }
    Ok(raw.to_ascii_lowercase())
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Parse and normalize (lowercase) an object id
            pub fn parse(raw: &str) -> Result<Self, IdError> {
                parse_object_id($kind, raw).map(Self)
            }

            /// Get the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

object_id!(
    /// Identifier of the teacher that owns a class and its pairing rounds
    TeacherId,
    "teacher"
);

object_id!(
    /// Identifier of a student on a teacher's roster
    StudentId,
    "student"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_object_id() {
        let id = TeacherId::parse("64b7f0c2a1e4d3b2c1a09f8e").unwrap();
        assert_eq!(id.as_str(), "64b7f0c2a1e4d3b2c1a09f8e");
    }

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let id = StudentId::parse(" 64B7F0C2A1E4D3B2C1A09F8E ").unwrap();
        assert_eq!(id.to_string(), "64b7f0c2a1e4d3b2c1a09f8e");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(
            TeacherId::parse(""),
            Err(IdError::Empty { kind: "teacher" })
        );
        assert!(matches!(
            StudentId::parse("abc"),
            Err(IdError::Length { actual: 3, .. })
        ));
        assert!(matches!(
            StudentId::parse("64b7f0c2a1e4d3b2c1a09f8z"),
            Err(IdError::NotHex { found: 'z', .. })
        ));
    }

    #[test]
    fn test_from_str() {
        let id: StudentId = "aaaaaaaaaaaaaaaaaaaaaaaa".parse().unwrap();
        assert_eq!(id.as_str().len(), OBJECT_ID_LEN);
    }
}
