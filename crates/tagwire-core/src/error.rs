//! Error types for the tagwire-core library.
//!
//! Every failure surfaces as one of four kinds: an unknown wire type, an
//! intentionally unsupported feature, an unsupported decoding strategy, or
//! malformed/insufficient input.

use thiserror::Error;

/// Result type alias for tagwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all decoding operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The low three bits of a tag byte do not name a known wire type
    #[error("unknown wire type {code} at offset {offset}")]
    UnknownWireType {
        /// The offending wire-type code
        code: u8,
        /// Byte offset of the tag
        offset: usize,
    },

    /// Feature deliberately not implemented by this decoder
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Requested a decoding mode other than keyed decoding
    #[error("unsupported decoding strategy: {0}")]
    UnsupportedDecodingStrategy(String),

    /// Malformed or insufficient input
    #[error("decoding error: {reason}")]
    Decoding {
        /// Human-readable description of the failure
        reason: String,
    },
}

impl Error {
    /// Creates a new unknown wire type error
    pub fn unknown_wire_type(code: u8, offset: usize) -> Self {
        Self::UnknownWireType { code, offset }
    }

    /// Creates a new unsupported data type error
    pub fn unsupported_data_type(msg: impl Into<String>) -> Self {
        Self::UnsupportedDataType(msg.into())
    }

    /// Creates a new unsupported decoding strategy error
    pub fn unsupported_strategy(msg: impl Into<String>) -> Self {
        Self::UnsupportedDecodingStrategy(msg.into())
    }

    /// Creates a new decoding error
    pub fn decoding(reason: impl Into<String>) -> Self {
        Self::Decoding {
            reason: reason.into(),
        }
    }

    /// Creates the error returned when a field number has no entry
    pub fn missing_field(number: u32) -> Self {
        Self::decoding(format!("no data for field {}", number))
    }

    /// Creates the error returned when a payload ends before `needed` bytes
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Self::decoding(format!(
            "not enough data at offset {}: need {} bytes, have {}",
            offset, needed, available
        ))
    }

    /// Returns true if the input used a feature this decoder does not provide,
    /// as opposed to being malformed
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDataType(_) | Self::UnsupportedDecodingStrategy(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_wire_type(7, 12);
        assert_eq!(err.to_string(), "unknown wire type 7 at offset 12");

        let err = Error::missing_field(4);
        assert!(err.to_string().contains("field 4"));
    }

    #[test]
    fn test_truncated_message() {
        let err = Error::truncated(3, 8, 2);
        assert_eq!(
            err.to_string(),
            "decoding error: not enough data at offset 3: need 8 bytes, have 2"
        );
    }

    #[test]
    fn test_is_unsupported() {
        assert!(Error::unsupported_data_type("groups").is_unsupported());
        assert!(Error::unsupported_strategy("unkeyed").is_unsupported());
        assert!(!Error::decoding("bad").is_unsupported());
        assert!(!Error::unknown_wire_type(6, 0).is_unsupported());
    }
}
