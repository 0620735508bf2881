//! Structured decoding module.
//!
//! This module turns scanned buffers into typed values:
//!
//! 1. [`Decoder::scan`] builds an immutable [`FieldStore`] from a buffer
//! 2. A [`Message`] implementation asks the store for each field by number
//! 3. Nested messages recurse through a fresh [`Decoder`] one level deeper
//!
//! Types describe their fields either by implementing [`Message`] by hand on
//! top of the [`FieldStore`] accessors, or declaratively with a [`Schema`].

mod schema;
mod store;

use crate::error::{Error, Result};
use crate::scanner::collect_fields;
use tracing::debug;

pub use schema::{FieldKind, FieldSpec, Schema};
pub use store::{FieldStore, FieldValue};

/// Default limit on nested-message depth
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// A type that can be populated from a [`FieldStore`]
///
/// # Example
///
/// ```
/// use tagwire_core::{FieldStore, Message, Result};
///
/// struct Point {
///     x: i64,
///     y: i64,
/// }
///
/// impl Message for Point {
///     fn decode_fields(fields: &FieldStore) -> Result<Self> {
///         Ok(Self {
///             x: fields.read_i64(1)?,
///             y: fields.read_i64(2)?,
///         })
///     }
/// }
///
/// let point: Point = tagwire_core::decode(&[0x08, 0x03, 0x10, 0x04])?;
/// assert_eq!((point.x, point.y), (3, 4));
/// # Ok::<(), tagwire_core::Error>(())
/// ```
pub trait Message: Sized {
    /// Build the value from the fields of one scanned buffer
    fn decode_fields(fields: &FieldStore) -> Result<Self>;
}

/// The kind of container a caller asks the decoder for.
///
/// Only keyed containers exist in this format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Fields addressed by field number
    Keyed,
    /// Array-like sequence of values
    Unkeyed,
    /// A single unnamed value
    SingleValue,
}

impl ContainerKind {
    /// Returns a lowercase name for messages
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Keyed => "keyed",
            ContainerKind::Unkeyed => "unkeyed",
            ContainerKind::SingleValue => "single value",
        }
    }
}

/// Configuration for decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum nested-message depth (top level is depth 0)
    pub max_depth: usize,
    /// Maximum top-level input size in bytes (0 = unlimited)
    pub max_input_len: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input_len: 0,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the maximum input size
    pub fn max_input_len(mut self, len: usize) -> Self {
        self.max_input_len = len;
        self
    }
}

/// Entry point for decoding buffers.
///
/// A decoder carries no parser state besides its configuration and nesting
/// depth, so it can be copied freely and used from several threads at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoder {
    config: DecoderConfig,
    depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config, depth: 0 }
    }

    /// Returns the configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the nesting depth this decoder operates at
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Scan a buffer into a field store
    pub fn scan(&self, data: &[u8]) -> Result<FieldStore> {
        if self.depth == 0 && self.config.max_input_len > 0 && data.len() > self.config.max_input_len
        {
            return Err(Error::decoding(format!(
                "input of {} bytes exceeds limit of {} bytes",
                data.len(),
                self.config.max_input_len
            )));
        }

        let fields = collect_fields(data)?;
        Ok(FieldStore::new(fields, *self))
    }

    /// Decode a buffer into `T`
    pub fn decode<T: Message>(&self, data: &[u8]) -> Result<T> {
        debug!("Decoding {} bytes at depth {}", data.len(), self.depth);
        let fields = self.scan(data)?;
        T::decode_fields(&fields)
    }

    /// Open a top-level container of the given kind over `data`.
    ///
    /// Only [`ContainerKind::Keyed`] is available; the other kinds fail with
    /// [`Error::UnsupportedDecodingStrategy`].
    pub fn container(&self, data: &[u8], kind: ContainerKind) -> Result<FieldStore> {
        match kind {
            ContainerKind::Keyed => self.scan(data),
            ContainerKind::Unkeyed | ContainerKind::SingleValue => Err(Error::unsupported_strategy(
                format!("{} decoding not supported", kind.as_str()),
            )),
        }
    }

    /// Returns a decoder one nesting level deeper
    pub(crate) fn nested(&self) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.config.max_depth {
            return Err(Error::decoding(format!(
                "message nesting exceeds maximum depth of {}",
                self.config.max_depth
            )));
        }
        Ok(Self {
            config: self.config,
            depth,
        })
    }
}

/// Decode a buffer into `T` with the default configuration
pub fn decode<T: Message>(data: &[u8]) -> Result<T> {
    Decoder::new().decode(data)
}
