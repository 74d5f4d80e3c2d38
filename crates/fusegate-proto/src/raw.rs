// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Raw fixed-layout encoding (`application/fuse`)
//!
//! One encoder and one decoder serve every operation: both are driven
//! purely by the record's [`FieldLayout`].

use crate::error::CodecError;
use crate::escape;
use crate::layout::{FieldLayout, FieldSpec, FieldType, LayoutShape};
use crate::record::FieldValue;

/// Encode flattened `values` according to `layout`.
pub fn encode(layout: &FieldLayout, values: &[FieldValue]) -> Result<Vec<u8>, CodecError> {
    check_types(layout.fields(), values)?;

    let mut out = Vec::with_capacity(layout.prefix_len());
    let split = layout.fixed_fields().len();
    let (fixed, variable) = values.split_at(split);

    for value in fixed {
        match value {
            FieldValue::Bool(v) => out.push(u8::from(*v)),
            FieldValue::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Text(_) | FieldValue::Blob(_) => {
                unreachable!("layout validation keeps variable fields out of the prefix")
            }
        }
    }

    match layout.shape() {
        LayoutShape::Empty | LayoutShape::Fixed => {}
        LayoutShape::WholeBody | LayoutShape::PrefixAndTail => {
            out.extend_from_slice(variable_bytes(&variable[0]));
        }
        LayoutShape::Delimited => {
            for value in variable {
                escape::write_field(&mut out, variable_bytes(value));
            }
        }
    }

    Ok(out)
}

/// Decode `body` into flattened values according to `layout`.
///
/// Fixed-only layouts read exactly the prefix and ignore surplus bytes.
/// Nothing is returned unless the whole body decodes.
pub fn decode(layout: &FieldLayout, body: &[u8]) -> Result<Vec<FieldValue>, CodecError> {
    let prefix_len = layout.prefix_len();

    if body.len() < prefix_len {
        return Err(CodecError::ShortRead {
            expected: prefix_len,
            actual: body.len(),
        });
    }

    let mut values = Vec::with_capacity(layout.fields().len());
    let mut cursor = Cursor::new(&body[..prefix_len]);
    for spec in layout.fixed_fields() {
        values.push(cursor.read_scalar(spec.ty));
    }

    let rest = &body[prefix_len..];
    match layout.shape() {
        LayoutShape::Empty | LayoutShape::Fixed => {}
        LayoutShape::WholeBody | LayoutShape::PrefixAndTail => {
            let spec = &layout.variable_fields()[0];
            values.push(variable_value(spec, rest.to_vec())?);
        }
        LayoutShape::Delimited => {
            let mut offset = 0;
            for spec in layout.variable_fields() {
                let (bytes, used) = escape::read_field(&rest[offset..], spec.name)?;
                offset += used;
                values.push(variable_value(spec, bytes)?);
            }
            if offset != rest.len() {
                return Err(CodecError::TrailingBytes {
                    count: rest.len() - offset,
                });
            }
        }
    }

    Ok(values)
}

fn check_types(specs: &[FieldSpec], values: &[FieldValue]) -> Result<(), CodecError> {
    if values.len() < specs.len() {
        return Err(CodecError::MissingField {
            field: specs[values.len()].name,
        });
    }
    for (spec, value) in specs.iter().zip(values) {
        if spec.ty != value.field_type() {
            return Err(CodecError::FieldMismatch {
                field: spec.name,
                expected: spec.ty,
                found: value.field_type(),
            });
        }
    }
    if values.len() > specs.len() {
        return Err(CodecError::TrailingBytes {
            count: values.len() - specs.len(),
        });
    }
    Ok(())
}

fn variable_bytes(value: &FieldValue) -> &[u8] {
    match value {
        FieldValue::Text(text) => text.as_bytes(),
        FieldValue::Blob(bytes) => bytes,
        _ => &[],
    }
}

fn variable_value(spec: &FieldSpec, bytes: Vec<u8>) -> Result<FieldValue, CodecError> {
    match spec.ty {
        FieldType::Text => String::from_utf8(bytes)
            .map(FieldValue::Text)
            .map_err(|_| CodecError::InvalidUtf8 { field: spec.name }),
        _ => Ok(FieldValue::Blob(bytes)),
    }
}

/// Reader over a prefix whose length was already checked against the layout.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn read_scalar(&mut self, ty: FieldType) -> FieldValue {
        match ty {
            FieldType::Bool => FieldValue::Bool(self.take::<1>()[0] != 0),
            FieldType::U32 => FieldValue::U32(u32::from_le_bytes(self.take())),
            FieldType::U64 => FieldValue::U64(u64::from_le_bytes(self.take())),
            FieldType::I64 => FieldValue::I64(i64::from_le_bytes(self.take())),
            FieldType::Text | FieldType::Blob => {
                unreachable!("prefix holds fixed-width fields only")
            }
        }
    }
}
