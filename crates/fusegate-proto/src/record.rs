// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Flattening of typed records into ordered field values
//!
//! Every wire message implements [`WireRecord`]. The raw codec never sees
//! concrete message types: it works on the flat `Vec<FieldValue>` a record
//! produces, checked against the record's [`FieldLayout`]. Nested fixed
//! records (such as [`crate::messages::Attr`]) flatten inline into their
//! parent.

use crate::error::CodecError;
use crate::layout::{FieldSpec, FieldType};

/// A single decoded or to-be-encoded field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Bool(bool),
    U32(u32),
    U64(u64),
    I64(i64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Bool(_) => FieldType::Bool,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::U64(_) => FieldType::U64,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Blob(_) => FieldType::Blob,
        }
    }
}

/// Sequential access to flattened values while rebuilding a record.
pub struct FieldReader {
    values: std::vec::IntoIter<FieldValue>,
}

impl FieldReader {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }

    pub fn take(&mut self, field: &'static str) -> Result<FieldValue, CodecError> {
        self.values.next().ok_or(CodecError::MissingField { field })
    }

    /// Values not consumed by the record.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

/// A type that occupies one or more consecutive fields of a record.
pub trait WireField: Sized {
    /// Append this field's specs under `name`.
    fn describe(name: &'static str, out: &mut Vec<FieldSpec>);
    fn put(&self, out: &mut Vec<FieldValue>);
    fn take(name: &'static str, reader: &mut FieldReader) -> Result<Self, CodecError>;
}

/// A complete request or response payload.
pub trait WireRecord: Sized {
    /// Record name used in layout errors.
    const NAME: &'static str;

    /// Field specs in declaration order, nested records flattened.
    fn describe() -> Vec<FieldSpec>;

    fn flatten(&self) -> Vec<FieldValue>;

    fn unflatten(reader: &mut FieldReader) -> Result<Self, CodecError>;
}

macro_rules! scalar_field {
    ($ty:ty, $variant:ident) => {
        impl WireField for $ty {
            fn describe(name: &'static str, out: &mut Vec<FieldSpec>) {
                out.push(FieldSpec::new(name, FieldType::$variant));
            }

            fn put(&self, out: &mut Vec<FieldValue>) {
                out.push(FieldValue::$variant(self.clone()));
            }

            fn take(name: &'static str, reader: &mut FieldReader) -> Result<Self, CodecError> {
                match reader.take(name)? {
                    FieldValue::$variant(value) => Ok(value),
                    other => Err(CodecError::FieldMismatch {
                        field: name,
                        expected: FieldType::$variant,
                        found: other.field_type(),
                    }),
                }
            }
        }
    };
}

scalar_field!(bool, Bool);
scalar_field!(u32, U32);
scalar_field!(u64, U64);
scalar_field!(i64, I64);
scalar_field!(String, Text);
scalar_field!(Vec<u8>, Blob);

/// Declare a wire record: a serde struct plus its [`WireRecord`] and
/// [`WireField`] implementations, with fields in wire order.
#[macro_export]
macro_rules! wire_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                pub $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Default, PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::record::WireRecord for $name {
            const NAME: &'static str = stringify!($name);

            #[allow(unused_mut)]
            fn describe() -> Vec<$crate::layout::FieldSpec> {
                let mut out = Vec::new();
                $( <$ty as $crate::record::WireField>::describe(stringify!($field), &mut out); )*
                out
            }

            #[allow(unused_mut)]
            fn flatten(&self) -> Vec<$crate::record::FieldValue> {
                let mut out = Vec::new();
                $( $crate::record::WireField::put(&self.$field, &mut out); )*
                out
            }

            #[allow(unused_variables)]
            fn unflatten(
                reader: &mut $crate::record::FieldReader,
            ) -> Result<Self, $crate::error::CodecError> {
                Ok(Self {
                    $( $field: <$ty as $crate::record::WireField>::take(stringify!($field), reader)?, )*
                })
            }
        }

        impl $crate::record::WireField for $name {
            fn describe(_name: &'static str, out: &mut Vec<$crate::layout::FieldSpec>) {
                out.extend(<$name as $crate::record::WireRecord>::describe());
            }

            fn put(&self, out: &mut Vec<$crate::record::FieldValue>) {
                out.extend($crate::record::WireRecord::flatten(self));
            }

            fn take(
                _name: &'static str,
                reader: &mut $crate::record::FieldReader,
            ) -> Result<Self, $crate::error::CodecError> {
                <$name as $crate::record::WireRecord>::unflatten(reader)
            }
        }
    };
}
