//! Field store and typed accessors.

use super::{ContainerKind, Decoder, FieldKind, Message};
use crate::error::{Error, Result};
use crate::scanner::{FieldRecord, WireType};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::mem::size_of;

/// The fields of one scanned buffer, keyed by field number.
///
/// Built once per decode call and never mutated afterwards. When a field
/// number occurs more than once on the wire, only the last occurrence is kept.
#[derive(Debug, Clone)]
pub struct FieldStore {
    fields: BTreeMap<u32, FieldRecord>,
    decoder: Decoder,
}

impl FieldStore {
    pub(crate) fn new(fields: BTreeMap<u32, FieldRecord>, decoder: Decoder) -> Self {
        Self { fields, decoder }
    }

    /// Returns true iff the store has an entry for `number`
    pub fn contains(&self, number: u32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Number of distinct field numbers
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the scanned buffer had no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field numbers present, in ascending order
    pub fn field_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.fields.keys().copied()
    }

    /// Returns the record kept for `number`
    pub fn record(&self, number: u32) -> Option<&FieldRecord> {
        self.fields.get(&number)
    }

    /// Wire type of the record kept for `number`
    pub fn wire_type(&self, number: u32) -> Option<WireType> {
        self.record(number).map(|r| r.wire_type)
    }

    /// Raw payload for `number`, failing if absent
    pub fn payload(&self, number: u32) -> Result<&Bytes> {
        self.record(number)
            .map(|r| &r.payload)
            .ok_or_else(|| Error::missing_field(number))
    }

    /// The decoder this store was scanned with
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Leading `N` bytes of the payload
    fn leading<const N: usize>(&self, number: u32) -> Result<[u8; N]> {
        let payload = self.payload(number)?;
        if payload.len() < N {
            return Err(Error::decoding(format!(
                "field {} has {} bytes, need {}",
                number,
                payload.len(),
                N
            )));
        }
        let mut buf = [0u8; N];
        buf.copy_from_slice(&payload[..N]);
        Ok(buf)
    }

    /// Fold up to `width` payload bytes, least significant first
    fn fold_le(&self, number: u32, width: usize) -> Result<u64> {
        let payload = self.payload(number)?;
        Ok(payload
            .iter()
            .take(width)
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc | u64::from(b) << (8 * i)))
    }

    fn narrow(name: &str) -> Error {
        Error::unsupported_data_type(format!("{} fields are not supported", name))
    }

    /// Reads a boolean.
    ///
    /// Any entry, whatever its payload, reads as `true`. Unlike every other
    /// accessor, absence is not an error: it reads as `false`.
    pub fn read_bool(&self, number: u32) -> bool {
        self.contains(number)
    }

    /// Reads the payload as UTF-8 text
    pub fn read_string(&self, number: u32) -> Result<String> {
        let payload = self.payload(number)?;
        std::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|e| Error::decoding(format!("field {} is not valid UTF-8: {}", number, e)))
    }

    /// Returns the raw payload bytes
    pub fn read_bytes(&self, number: u32) -> Result<Bytes> {
        self.payload(number).cloned()
    }

    /// Reads a little-endian IEEE-754 double
    pub fn read_f64(&self, number: u32) -> Result<f64> {
        self.leading(number).map(f64::from_le_bytes)
    }

    /// Reads a little-endian IEEE-754 float
    pub fn read_f32(&self, number: u32) -> Result<f32> {
        self.leading(number).map(f32::from_le_bytes)
    }

    /// Reinterprets the payload as a native-width signed integer
    pub fn read_isize(&self, number: u32) -> Result<isize> {
        self.leading::<{ size_of::<isize>() }>(number)
            .map(isize::from_le_bytes)
    }

    /// Reinterprets the payload as a native-width unsigned integer
    pub fn read_usize(&self, number: u32) -> Result<usize> {
        self.leading::<{ size_of::<usize>() }>(number)
            .map(usize::from_le_bytes)
    }

    /// Reinterprets the payload as a little-endian `u32`
    pub fn read_u32(&self, number: u32) -> Result<u32> {
        self.leading(number).map(u32::from_le_bytes)
    }

    /// Reinterprets the payload as a little-endian `u64`
    pub fn read_u64(&self, number: u32) -> Result<u64> {
        self.leading(number).map(u64::from_le_bytes)
    }

    /// Reads a signed 32-bit integer by folding the low four payload bytes
    pub fn read_i32(&self, number: u32) -> Result<i32> {
        self.fold_le(number, 4).map(|v| v as u32 as i32)
    }

    /// Reads a signed 64-bit integer by folding the low eight payload bytes
    pub fn read_i64(&self, number: u32) -> Result<i64> {
        self.fold_le(number, 8).map(|v| v as i64)
    }

    /// Always fails: 8-bit fields are not supported
    pub fn read_i8(&self, _number: u32) -> Result<i8> {
        Err(Self::narrow("i8"))
    }

    /// Always fails: 16-bit fields are not supported
    pub fn read_i16(&self, _number: u32) -> Result<i16> {
        Err(Self::narrow("i16"))
    }

    /// Always fails: 8-bit fields are not supported
    pub fn read_u8(&self, _number: u32) -> Result<u8> {
        Err(Self::narrow("u8"))
    }

    /// Always fails: 16-bit fields are not supported
    pub fn read_u16(&self, _number: u32) -> Result<u16> {
        Err(Self::narrow("u16"))
    }

    /// Reads a `fixed32` field
    pub fn read_fixed32(&self, number: u32) -> Result<u32> {
        self.read_u32(number)
    }

    /// Reads a varint field as a signed 64-bit integer
    pub fn read_varint_as_i64(&self, number: u32) -> Result<i64> {
        self.read_i64(number)
    }

    /// Decodes the payload as a nested message.
    ///
    /// The payload is scanned into its own store one nesting level deeper;
    /// exceeding the configured depth is a decoding error.
    pub fn read_message<T: Message>(&self, number: u32) -> Result<T> {
        let payload = self.payload(number)?;
        self.decoder.nested()?.decode(payload)
    }

    /// Reads `T`, or `None` when the field is absent
    pub fn read_optional<T: FieldValue>(&self, number: u32) -> Result<Option<T>> {
        if !self.contains(number) {
            return Ok(None);
        }
        T::read(self, number).map(Some)
    }

    /// Reads field `number` as `T`
    pub fn get<T: FieldValue>(&self, number: u32) -> Result<T> {
        T::read(self, number)
    }

    /// Always fails: nested containers are not part of this format
    pub fn nested_container(&self, number: u32, kind: ContainerKind) -> Result<FieldStore> {
        Err(Error::unsupported_data_type(format!(
            "nested {} container for field {}",
            kind.as_str(),
            number
        )))
    }

    /// Always fails: there is no superclass decoding in this format
    pub fn super_decoder(&self, number: Option<u32>) -> Result<Decoder> {
        Err(Error::unsupported_data_type(match number {
            Some(n) => format!("super decoder for field {}", n),
            None => "super decoder".to_string(),
        }))
    }
}

/// A scalar type readable from a [`FieldStore`]
pub trait FieldValue: Sized {
    /// The kind reported in schemas
    const KIND: FieldKind;

    /// Whether absence is acceptable
    const OPTIONAL: bool = false;

    /// Read field `number` from `fields`
    fn read(fields: &FieldStore, number: u32) -> Result<Self>;
}

macro_rules! field_value {
    ($($ty:ty => $kind:ident, $read:ident;)*) => {
        $(
            impl FieldValue for $ty {
                const KIND: FieldKind = FieldKind::$kind;

                fn read(fields: &FieldStore, number: u32) -> Result<Self> {
                    fields.$read(number)
                }
            }
        )*
    };
}

field_value! {
    String => String, read_string;
    Bytes => Bytes, read_bytes;
    f64 => Double, read_f64;
    f32 => Float, read_f32;
    isize => Int, read_isize;
    i8 => Int8, read_i8;
    i16 => Int16, read_i16;
    i32 => Int32, read_i32;
    i64 => Int64, read_i64;
    usize => UInt, read_usize;
    u8 => UInt8, read_u8;
    u16 => UInt16, read_u16;
    u32 => UInt32, read_u32;
    u64 => UInt64, read_u64;
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn read(fields: &FieldStore, number: u32) -> Result<Self> {
        Ok(fields.read_bool(number))
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;
    const OPTIONAL: bool = true;

    fn read(fields: &FieldStore, number: u32) -> Result<Self> {
        fields.read_optional(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn store(data: &[u8]) -> FieldStore {
        scan(data).unwrap()
    }

    #[test]
    fn test_contains_and_len() {
        let fields = store(&[0x08, 0x01, 0x12, 0x00]);
        assert!(fields.contains(1));
        assert!(fields.contains(2));
        assert!(!fields.contains(3));
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.field_numbers().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(fields.wire_type(2), Some(WireType::LengthDelimited));
    }

    #[test]
    fn test_bool_presence_policy() {
        // Payload 0 still reads as true
        let fields = store(&[0x08, 0x00]);
        assert!(fields.read_bool(1));
        assert!(!fields.read_bool(2));
        assert_eq!(fields.get::<bool>(2), Ok(false));

        // So does an empty length-delimited payload
        let fields = store(&[0x12, 0x00]);
        assert!(fields.read_bool(2));
        assert_eq!(fields.get::<bool>(2), Ok(true));
    }

    #[test]
    fn test_read_string() {
        let fields = store(&[0x12, 0x05, b'h', b'e', b'l', b'l', b'o']);
        assert_eq!(fields.read_string(2).unwrap(), "hello");
        assert!(matches!(fields.read_string(1), Err(Error::Decoding { .. })));
    }

    #[test]
    fn test_read_string_invalid_utf8() {
        let fields = store(&[0x12, 0x02, 0xC3, 0x28]);
        assert!(matches!(fields.read_string(2), Err(Error::Decoding { .. })));
        assert_eq!(&fields.read_bytes(2).unwrap()[..], &[0xC3, 0x28]);
    }

    #[test]
    fn test_read_floats_bit_exact() {
        let value = -1234.5678e-9f64;
        let mut data = vec![0x09];
        data.extend_from_slice(&value.to_le_bytes());
        let fields = store(&data);
        assert_eq!(fields.read_f64(1).unwrap().to_bits(), value.to_bits());

        let value = 3.25f32;
        let mut data = vec![0x15];
        data.extend_from_slice(&value.to_le_bytes());
        let fields = store(&data);
        assert_eq!(fields.read_f32(2).unwrap().to_bits(), value.to_bits());
    }

    #[test]
    fn test_read_f64_short_payload() {
        let fields = store(&[0x0D, 0x00, 0x00, 0x80, 0x3F]);
        assert!(matches!(fields.read_f64(1), Err(Error::Decoding { .. })));
        assert_eq!(fields.read_f32(1).unwrap(), 1.0);
    }

    #[test]
    fn test_read_reinterpreted_integers() {
        let fields = store(&[0x0D, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(fields.read_u32(1).unwrap(), 0x1234_5678);
        assert_eq!(fields.read_fixed32(1).unwrap(), 0x1234_5678);
        assert!(fields.read_u64(1).is_err());

        let fields = store(&[0x08, 0xAC, 0x02]);
        assert_eq!(fields.read_u64(1).unwrap(), 300);
        assert_eq!(fields.read_usize(1).unwrap(), 300);
        assert_eq!(fields.read_isize(1).unwrap(), 300);
        assert_eq!(fields.read_u32(1).unwrap(), 300);
    }

    #[test]
    fn test_read_folded_integers() {
        let fields = store(&[0x08, 0x96, 0x01]);
        assert_eq!(fields.read_i64(1).unwrap(), 150);
        assert_eq!(fields.read_i32(1).unwrap(), 150);
        assert_eq!(fields.read_varint_as_i64(1).unwrap(), 150);

        // Fixed32 payload folds into a zero-extended i64
        let fields = store(&[0x0D, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(fields.read_i32(1).unwrap(), -1);
        assert_eq!(fields.read_i64(1).unwrap(), 0xFFFF_FFFF);
    }

    #[test]
    fn test_read_negative_varint() {
        // -2 as a ten-byte varint
        let fields = store(&[
            0x08, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
        ]);
        assert_eq!(fields.read_i64(1).unwrap(), -2);
        assert_eq!(fields.read_i32(1).unwrap(), -2);
    }

    #[test]
    fn test_narrow_integers_unsupported() {
        let fields = store(&[0x08, 0x01]);
        assert!(matches!(fields.read_i8(1), Err(Error::UnsupportedDataType(_))));
        assert!(matches!(fields.read_i16(1), Err(Error::UnsupportedDataType(_))));
        assert!(matches!(fields.read_u8(1), Err(Error::UnsupportedDataType(_))));
        assert!(matches!(fields.get::<u16>(1), Err(Error::UnsupportedDataType(_))));
    }

    #[test]
    fn test_missing_fields_fail() {
        let fields = store(&[]);
        assert!(fields.is_empty());
        assert_eq!(fields.read_i64(1), Err(Error::missing_field(1)));
        assert!(matches!(fields.read_f64(1), Err(Error::Decoding { .. })));
        assert!(matches!(fields.read_u32(1), Err(Error::Decoding { .. })));
        assert!(matches!(fields.read_bytes(1), Err(Error::Decoding { .. })));
    }

    #[test]
    fn test_read_optional() {
        let fields = store(&[0x08, 0x07]);
        assert_eq!(fields.read_optional::<i64>(1).unwrap(), Some(7));
        assert_eq!(fields.read_optional::<i64>(2).unwrap(), None);
        assert_eq!(fields.get::<Option<u64>>(2).unwrap(), None);
    }

    #[test]
    fn test_unsupported_containers() {
        let fields = store(&[0x12, 0x00]);
        assert!(matches!(
            fields.nested_container(2, ContainerKind::Keyed),
            Err(Error::UnsupportedDataType(_))
        ));
        assert!(matches!(
            fields.nested_container(2, ContainerKind::Unkeyed),
            Err(Error::UnsupportedDataType(_))
        ));
        assert!(matches!(
            fields.super_decoder(None),
            Err(Error::UnsupportedDataType(_))
        ));
        assert!(matches!(
            fields.super_decoder(Some(2)),
            Err(Error::UnsupportedDataType(_))
        ));
    }
}
