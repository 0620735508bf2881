//! Low-level wire format parsing.
//!
//! ## Wire Format Overview
//!
//! Each field is encoded as:
//! - A single tag byte: field number in the upper 5 bits, wire type in the
//!   lower 3 bits
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, bool, enum)
//! - 1: FIXED64 (fixed64, sfixed64, double)
//! - 2: LENGTH_DELIMITED (string, bytes, embedded messages), single length byte
//! - 5: FIXED32 (fixed32, sfixed32, float)
//!
//! Groups (3, 4) are recognised but rejected.

use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::trace;

/// Largest payload a length-delimited field can carry.
///
/// The length prefix is a single byte rather than a varint, so payloads are
/// capped at 255 bytes.
pub const MAX_LENGTH_DELIMITED: usize = u8::MAX as usize;

/// Largest field number expressible in a single tag byte
pub const MAX_FIELD_NUMBER: u32 = 31;

/// Maximum number of bytes in a varint carrying a 64-bit value
const MAX_VARINT_LEN: usize = 10;

/// Wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Fixed64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    LengthDelimited = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    Fixed32 = 5,
}

impl WireType {
    /// Returns the wire type for a 3-bit code, or `None` for 6 and 7
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            3 => Some(WireType::StartGroup),
            4 => Some(WireType::EndGroup),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    /// Returns the short name used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::LengthDelimited => "len",
            WireType::StartGroup => "sgroup",
            WireType::EndGroup => "egroup",
            WireType::Fixed32 => "fixed32",
        }
    }

    /// Returns true for the deprecated group markers
    pub fn is_group(&self) -> bool {
        matches!(self, WireType::StartGroup | WireType::EndGroup)
    }
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Field number (0..=31)
    pub field_number: u32,
    /// Raw wire-type code (0..=7)
    pub wire_code: u8,
}

impl Tag {
    /// Splits a tag byte into field number and wire-type code
    pub fn from_byte(byte: u8) -> Self {
        Self {
            field_number: u32::from(byte >> 3),
            wire_code: byte & 0b111,
        }
    }

    /// Resolves the wire-type code, rejecting unknown codes
    pub fn wire_type(&self, offset: usize) -> Result<WireType> {
        WireType::from_code(self.wire_code)
            .ok_or(Error::unknown_wire_type(self.wire_code, offset))
    }
}

/// A single field record extracted from a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    /// Field number from the tag
    pub number: u32,
    /// Wire type from the tag
    pub wire_type: WireType,
    /// Payload bytes.
    ///
    /// For varints this is the decoded value as 8 little-endian bytes, for
    /// every other wire type it is the raw bytes following the tag (and the
    /// length byte, for length-delimited fields).
    pub payload: Bytes,
    /// Byte offset of the tag in the scanned buffer
    pub offset: usize,
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed. Fails if the
/// continuation bit is still set on the last available byte, or if the
/// encoding carries more than 64 significant bits.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(Error::decoding("varint overflows 64 bits"));
        }

        result |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::decoding(format!(
        "varint not terminated within {} bytes",
        data.len()
    )))
}

/// Take `len` bytes starting at `start`, failing instead of reading past the end
fn take(data: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    let available = data.len().saturating_sub(start);
    if available < len {
        return Err(Error::truncated(start, len, available));
    }
    Ok(&data[start..start + len])
}

/// Read the field record whose tag sits at `offset`.
///
/// Returns the record and the offset of the next tag.
pub fn read_record(data: &[u8], offset: usize) -> Result<(FieldRecord, usize)> {
    let tag_byte = *data
        .get(offset)
        .ok_or_else(|| Error::truncated(offset, 1, 0))?;
    let tag = Tag::from_byte(tag_byte);
    let wire_type = tag.wire_type(offset)?;
    let start = offset + 1;

    let (payload, next) = match wire_type {
        WireType::Varint => {
            let remaining = data.get(start..).unwrap_or_default();
            let (value, len) = decode_varint(remaining).map_err(|e| match e {
                Error::Decoding { reason } => Error::decoding(format!(
                    "{} (field {} at offset {})",
                    reason, tag.field_number, offset
                )),
                other => other,
            })?;
            (Bytes::copy_from_slice(&value.to_le_bytes()), start + len)
        }
        WireType::Fixed64 => (Bytes::copy_from_slice(take(data, start, 8)?), start + 8),
        WireType::LengthDelimited => {
            let length = data
                .get(start)
                .map(|&b| usize::from(b))
                .ok_or_else(|| Error::truncated(start, 1, 0))?;
            // Copy so nested scans see offsets starting at 0
            let body = take(data, start + 1, length)?;
            (Bytes::copy_from_slice(body), start + 1 + length)
        }
        WireType::Fixed32 => (Bytes::copy_from_slice(take(data, start, 4)?), start + 4),
        WireType::StartGroup | WireType::EndGroup => {
            return Err(Error::unsupported_data_type(
                "groups are deprecated and not supported by this decoder",
            ));
        }
    };

    trace!(
        "Decoded {} field with tag {} at offset {}: {} bytes",
        wire_type,
        tag.field_number,
        offset,
        payload.len()
    );

    Ok((
        FieldRecord {
            number: tag.field_number,
            wire_type,
            payload,
            offset,
        },
        next,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_varint_single_byte() {
        let data = [0x08]; // Value 8
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 8);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_decode_varint_multi_byte() {
        let data = [0xAC, 0x02]; // Value 300
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, 300);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_varint_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let (value, len) = decode_varint(&data).unwrap();
        assert_eq!(value, u64::MAX);
        assert_eq!(len, 10);
    }

    #[test]
    fn test_decode_varint_stops_at_terminator() {
        let data = [0x96, 0x01, 0xFF];
        assert_eq!(decode_varint(&data).unwrap(), (150, 2));
    }

    #[test]
    fn test_decode_varint_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(matches!(decode_varint(&data), Err(Error::Decoding { .. })));

        let eleven = [0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x81, 0x00];
        assert!(decode_varint(&eleven).is_err());
    }

    #[test]
    fn test_decode_varint_unterminated() {
        assert!(matches!(decode_varint(&[0x96]), Err(Error::Decoding { .. })));
        assert!(decode_varint(&[]).is_err());
    }

    #[test]
    fn test_varint_minimal_encodings() {
        for value in [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX >> 1, u64::MAX] {
            let mut encoded = Vec::new();
            let mut n = value;
            loop {
                let byte = (n & 0x7F) as u8;
                n >>= 7;
                if n == 0 {
                    encoded.push(byte);
                    break;
                }
                encoded.push(byte | 0x80);
            }
            assert_eq!(decode_varint(&encoded).unwrap(), (value, encoded.len()));
        }
    }

    #[test]
    fn test_wire_type_conversion() {
        assert_eq!(WireType::from_code(0), Some(WireType::Varint));
        assert_eq!(WireType::from_code(1), Some(WireType::Fixed64));
        assert_eq!(WireType::from_code(2), Some(WireType::LengthDelimited));
        assert_eq!(WireType::from_code(5), Some(WireType::Fixed32));
        assert!(WireType::from_code(3).unwrap().is_group());
        assert_eq!(WireType::from_code(6), None);
        assert_eq!(WireType::from_code(7), None);
    }

    #[test]
    fn test_tag_from_byte() {
        let tag = Tag::from_byte(0x12);
        assert_eq!(tag.field_number, 2);
        assert_eq!(tag.wire_code, 2);

        let tag = Tag::from_byte(0xFD);
        assert_eq!(tag.field_number, MAX_FIELD_NUMBER);
        assert_eq!(tag.wire_code, 5);
    }

    #[test]
    fn test_read_varint_record() {
        let data = [0x08, 0x96, 0x01];
        let (record, next) = read_record(&data, 0).unwrap();
        assert_eq!(record.number, 1);
        assert_eq!(record.wire_type, WireType::Varint);
        assert_eq!(&record.payload[..], &150u64.to_le_bytes());
        assert_eq!(next, 3);
    }

    #[test]
    fn test_read_len_record() {
        let data = [0x0A, 0x05, b'h', b'e', b'l', b'l', b'o', 0x08];
        let (record, next) = read_record(&data, 0).unwrap();
        assert_eq!(record.number, 1);
        assert_eq!(&record.payload[..], b"hello");
        assert_eq!(next, 7);
    }

    #[test]
    fn test_read_empty_len_record() {
        let (record, next) = read_record(&[0x0A, 0x00], 0).unwrap();
        assert!(record.payload.is_empty());
        assert_eq!(next, 2);
    }

    #[test]
    fn test_read_len_record_truncated() {
        let data = [0x0A, 0x05, b'h', b'e'];
        assert!(matches!(read_record(&data, 0), Err(Error::Decoding { .. })));
        assert!(read_record(&[0x0A], 0).is_err());
    }

    #[test]
    fn test_read_fixed_records() {
        let data = [0x0D, 0x01, 0x02, 0x03, 0x04];
        let (record, next) = read_record(&data, 0).unwrap();
        assert_eq!(record.wire_type, WireType::Fixed32);
        assert_eq!(&record.payload[..], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(next, 5);

        let data = [0x09, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let (record, next) = read_record(&data, 0).unwrap();
        assert_eq!(record.wire_type, WireType::Fixed64);
        assert_eq!(record.payload.len(), 8);
        assert_eq!(next, 9);

        assert!(read_record(&[0x09, 0x01, 0x02], 0).is_err());
        assert!(read_record(&[0x0D, 0x01], 0).is_err());
    }

    #[test]
    fn test_read_group_rejected() {
        assert!(matches!(
            read_record(&[0x0B], 0),
            Err(Error::UnsupportedDataType(_))
        ));
        assert!(matches!(
            read_record(&[0x0C], 0),
            Err(Error::UnsupportedDataType(_))
        ));
    }

    #[test]
    fn test_tag_wire_type_reports_offset() {
        assert_eq!(Tag::from_byte(0x0A).wire_type(9), Ok(WireType::LengthDelimited));
        assert_eq!(
            Tag::from_byte(0x0F).wire_type(42),
            Err(Error::UnknownWireType { code: 7, offset: 42 })
        );
    }

    #[test]
    fn test_read_unknown_wire_type() {
        assert_eq!(
            read_record(&[0x00, 0x0E], 1),
            Err(Error::UnknownWireType { code: 6, offset: 1 })
        );
    }
}
