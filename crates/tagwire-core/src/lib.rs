//! # tagwire-core
//!
//! A decoder for a compact, protobuf-style binary wire format.
//!
//! This crate provides:
//! - Scanning a byte buffer into `(field number, wire type, payload)` records
//! - An immutable, field-number-keyed [`FieldStore`] with typed accessors
//! - Recursive decoding of nested messages into caller-defined types
//!
//! ## Architecture
//!
//! - [`scanner`]: Tag, varint, fixed-width and length-delimited parsing
//! - [`decode`]: Field store, typed reads, schemas and the decode entry point
//! - [`error`]: Error types and handling
//!
//! ## Wire format
//!
//! Each record starts with a single tag byte: field number in the upper five
//! bits (so at most 31), wire type in the lower three. Length-delimited
//! payloads carry a single length byte and are therefore capped at
//! [`MAX_LENGTH_DELIMITED`] bytes. Groups, packed/repeated fields, maps and
//! zigzag integers are not supported.
//!
//! ## Example
//!
//! ```
//! use tagwire_core::scan;
//!
//! let fields = scan(&[0x08, 0x96, 0x01, 0x12, 0x05, b'h', b'e', b'l', b'l', b'o'])?;
//! assert_eq!(fields.read_i64(1)?, 150);
//! assert_eq!(fields.read_string(2)?, "hello");
//! assert!(!fields.read_bool(3));
//! # Ok::<(), tagwire_core::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decode;
pub mod error;
pub mod scanner;

// Re-export primary types for convenience
pub use decode::{
    decode, ContainerKind, Decoder, DecoderConfig, FieldKind, FieldSpec, FieldStore, FieldValue,
    Message, Schema,
};
pub use error::{Error, Result};
pub use scanner::{
    records, scan, FieldRecord, Tag, WireType, MAX_FIELD_NUMBER, MAX_LENGTH_DELIMITED,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
