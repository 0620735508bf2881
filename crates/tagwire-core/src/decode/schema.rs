//! Declarative field descriptors.
//!
//! A [`Schema`] lists, for a target type, which field numbers it expects, what
//! kind each one is, and how to store the decoded value. Decoding starts from
//! `T::default()` and applies each setter in declaration order.

use super::{FieldStore, FieldValue, Message};
use crate::error::Result;
use std::fmt;

/// The kind of value a schema field expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Presence flag
    Bool,
    /// UTF-8 text
    String,
    /// Raw bytes
    Bytes,
    /// 64-bit float
    Double,
    /// 32-bit float
    Float,
    /// Native-width signed integer
    Int,
    /// 8-bit signed integer (unsupported)
    Int8,
    /// 16-bit signed integer (unsupported)
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// Native-width unsigned integer
    UInt,
    /// 8-bit unsigned integer (unsupported)
    UInt8,
    /// 16-bit unsigned integer (unsupported)
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// Nested message
    Message,
}

impl FieldKind {
    /// Returns true if reading this kind always fails
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            FieldKind::Int8 | FieldKind::Int16 | FieldKind::UInt8 | FieldKind::UInt16
        )
    }
}

type Setter<T> = Box<dyn Fn(&mut T, &FieldStore) -> Result<()> + Send + Sync>;

/// One entry of a [`Schema`]
pub struct FieldSpec<T> {
    number: u32,
    kind: FieldKind,
    optional: bool,
    setter: Setter<T>,
}

impl<T> FieldSpec<T> {
    /// Field number on the wire
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Expected kind
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether absence is tolerated
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl<T> fmt::Debug for FieldSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("number", &self.number)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Ordered field descriptors for a target type.
///
/// # Example
///
/// ```
/// use tagwire_core::{FieldStore, Message, Result, Schema};
/// use std::sync::OnceLock;
///
/// #[derive(Default)]
/// struct Greeting {
///     text: String,
///     loud: bool,
/// }
///
/// impl Greeting {
///     fn schema() -> &'static Schema<Self> {
///         static SCHEMA: OnceLock<Schema<Greeting>> = OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             Schema::new()
///                 .field(1, |g: &mut Greeting, v| g.text = v)
///                 .field(2, |g: &mut Greeting, v| g.loud = v)
///         })
///     }
/// }
///
/// impl Message for Greeting {
///     fn decode_fields(fields: &FieldStore) -> Result<Self> {
///         Self::schema().decode(fields)
///     }
/// }
///
/// let greeting: Greeting = tagwire_core::decode(&[0x0A, 0x02, b'h', b'i'])?;
/// assert_eq!(greeting.text, "hi");
/// assert!(!greeting.loud);
/// # Ok::<(), tagwire_core::Error>(())
/// ```
pub struct Schema<T> {
    fields: Vec<FieldSpec<T>>,
}

impl<T: Default + 'static> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + 'static> Schema<T> {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a scalar field; use `Option<V>` for fields that may be absent
    pub fn field<V: FieldValue + 'static>(mut self, number: u32, set: fn(&mut T, V)) -> Self {
        self.fields.push(FieldSpec {
            number,
            kind: V::KIND,
            optional: V::OPTIONAL,
            setter: Box::new(move |target: &mut T, fields: &FieldStore| {
                set(target, fields.get::<V>(number)?);
                Ok(())
            }),
        });
        self
    }

    /// Adds a required nested message field
    pub fn message<M: Message + 'static>(mut self, number: u32, set: fn(&mut T, M)) -> Self {
        self.fields.push(FieldSpec {
            number,
            kind: FieldKind::Message,
            optional: false,
            setter: Box::new(move |target: &mut T, fields: &FieldStore| {
                set(target, fields.read_message::<M>(number)?);
                Ok(())
            }),
        });
        self
    }

    /// Adds a nested message field that may be absent
    pub fn optional_message<M: Message + 'static>(
        mut self,
        number: u32,
        set: fn(&mut T, Option<M>),
    ) -> Self {
        self.fields.push(FieldSpec {
            number,
            kind: FieldKind::Message,
            optional: true,
            setter: Box::new(move |target: &mut T, fields: &FieldStore| {
                let value = if fields.contains(number) {
                    Some(fields.read_message::<M>(number)?)
                } else {
                    None
                };
                set(target, value);
                Ok(())
            }),
        });
        self
    }

    /// Builds a `T` from the store, failing on the first field that fails
    pub fn decode(&self, fields: &FieldStore) -> Result<T> {
        let mut target = T::default();
        for spec in &self.fields {
            (spec.setter)(&mut target, fields)?;
        }
        Ok(target)
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec<T>> {
        self.fields.iter()
    }

    /// Number of declared fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no fields are declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.fields).finish()
    }
}
