//! Wire scanning module.
//!
//! Splits a flat byte buffer into `(field number, wire type, payload)`
//! records and collapses them into a field-number-keyed mapping.
//!
//! ## Algorithm Overview
//!
//! 1. Read the tag byte at the cursor
//! 2. Extract the payload according to the wire type
//! 3. Advance the cursor past the payload
//! 4. Repeat until the cursor reaches the end of the buffer
//!
//! Scanning is linear and never backtracks. The first malformed record aborts
//! the scan; no partial mapping is returned.

mod wire;

use crate::decode::{Decoder, FieldStore};
use crate::error::Result;
use std::collections::BTreeMap;
use std::iter::FusedIterator;
use tracing::debug;

pub use wire::{
    decode_varint, read_record, FieldRecord, Tag, WireType, MAX_FIELD_NUMBER,
    MAX_LENGTH_DELIMITED,
};

/// Iterator over the field records of a buffer, in wire order.
///
/// Yields `Err` at most once; iteration stops after the first error.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Records<'a> {
    /// Creates an iterator starting at offset 0
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            failed: false,
        }
    }

    /// Offset of the next tag to be read
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for Records<'_> {
    type Item = Result<FieldRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        match read_record(self.data, self.offset) {
            Ok((record, next)) => {
                self.offset = next;
                Some(Ok(record))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for Records<'_> {}

/// Iterate over every record in `data` without collapsing repeated fields
pub fn records(data: &[u8]) -> Records<'_> {
    Records::new(data)
}

/// Scan `data` into a mapping from field number to its last record
pub(crate) fn collect_fields(data: &[u8]) -> Result<BTreeMap<u32, FieldRecord>> {
    let mut fields = BTreeMap::new();
    let mut count = 0usize;

    for record in records(data) {
        let record = record?;
        count += 1;
        // Last occurrence wins
        fields.insert(record.number, record);
    }

    debug!(
        "Scanned {} bytes: {} records, {} distinct fields",
        data.len(),
        count,
        fields.len()
    );
    Ok(fields)
}

/// Scan a buffer with the default decoder configuration.
///
/// This is a convenience function for `Decoder::new().scan(data)`.
pub fn scan(data: &[u8]) -> Result<FieldStore> {
    Decoder::new().scan(data)
}
