// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Field layouts for the raw fixed-prefix encoding
//!
//! A layout is a list of scalar fields that form a packed little-endian
//! prefix, followed by the variable-length (text or blob) fields. Variable
//! fields must all come last; [`FieldLayout::new`] rejects anything else so
//! the codec never has to handle it.

use crate::error::LayoutError;

/// Wire type of a single field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    U32,
    U64,
    I64,
    /// UTF-8 text of implicit length
    Text,
    /// Raw bytes of implicit length
    Blob,
}

impl FieldType {
    /// Width in the fixed prefix, or `None` for variable-length fields.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            FieldType::Bool => Some(1),
            FieldType::U32 => Some(4),
            FieldType::U64 | FieldType::I64 => Some(8),
            FieldType::Text | FieldType::Blob => None,
        }
    }

    pub const fn is_variable(self) -> bool {
        self.fixed_width().is_none()
    }
}

/// A named field in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// How the variable part of a payload is framed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutShape {
    /// No fields at all; the payload is empty.
    Empty,
    /// Only fixed fields; the payload is exactly the prefix.
    Fixed,
    /// A single variable field and no prefix; the field is the whole payload.
    WholeBody,
    /// A non-empty prefix followed by one variable field taking the remainder.
    PrefixAndTail,
    /// Prefix followed by several escaped, newline-terminated fields.
    Delimited,
}

/// Validated layout of one request or response record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    record: &'static str,
    fields: Vec<FieldSpec>,
    prefix_len: usize,
    variable_count: usize,
    shape: LayoutShape,
}

impl FieldLayout {
    /// Validate `fields` and classify the layout.
    pub fn new(record: &'static str, fields: Vec<FieldSpec>) -> Result<Self, LayoutError> {
        let mut first_variable: Option<&FieldSpec> = None;
        let mut prefix_len = 0;
        let mut variable_count = 0;

        for field in &fields {
            match field.ty.fixed_width() {
                Some(width) => {
                    if let Some(variable) = first_variable {
                        return Err(LayoutError::NonTrailingVariable {
                            record,
                            field: variable.name,
                            after: field.name,
                        });
                    }
                    prefix_len += width;
                }
                None => {
                    first_variable.get_or_insert(field);
                    variable_count += 1;
                }
            }
        }

        let shape = match (prefix_len, variable_count) {
            (0, 0) => LayoutShape::Empty,
            (_, 0) => LayoutShape::Fixed,
            (0, 1) => LayoutShape::WholeBody,
            (_, 1) => LayoutShape::PrefixAndTail,
            _ => LayoutShape::Delimited,
        };

        Ok(Self {
            record,
            fields,
            prefix_len,
            variable_count,
            shape,
        })
    }

    /// An empty layout for records without a body.
    pub fn empty(record: &'static str) -> Self {
        Self {
            record,
            fields: Vec::new(),
            prefix_len: 0,
            variable_count: 0,
            shape: LayoutShape::Empty,
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Byte length of the packed scalar prefix.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn shape(&self) -> LayoutShape {
        self.shape
    }

    pub fn is_empty(&self) -> bool {
        self.shape == LayoutShape::Empty
    }

    pub(crate) fn fixed_fields(&self) -> &[FieldSpec] {
        &self.fields[..self.fields.len() - self.variable_count]
    }

    pub(crate) fn variable_fields(&self) -> &[FieldSpec] {
        &self.fields[self.fields.len() - self.variable_count..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &'static str, ty: FieldType) -> FieldSpec {
        FieldSpec::new(name, ty)
    }

    #[fusegate_test_utils::logged_test]
    fn classifies_the_four_payload_shapes() {
        let fixed = FieldLayout::new("fixed", vec![spec("inode", FieldType::U64)]).unwrap();
        assert_eq!(fixed.shape(), LayoutShape::Fixed);
        assert_eq!(fixed.prefix_len(), 8);

        let whole = FieldLayout::new("whole", vec![spec("data", FieldType::Blob)]).unwrap();
        assert_eq!(whole.shape(), LayoutShape::WholeBody);
        assert_eq!(whole.prefix_len(), 0);

        let tail = FieldLayout::new(
            "tail",
            vec![spec("inode", FieldType::U64), spec("name", FieldType::Text)],
        )
        .unwrap();
        assert_eq!(tail.shape(), LayoutShape::PrefixAndTail);

        let delimited = FieldLayout::new(
            "delimited",
            vec![
                spec("inode", FieldType::U64),
                spec("old_name", FieldType::Text),
                spec("new_name", FieldType::Text),
            ],
        )
        .unwrap();
        assert_eq!(delimited.shape(), LayoutShape::Delimited);
        assert_eq!(delimited.variable_count(), 2);
    }

    #[fusegate_test_utils::logged_test]
    fn prefix_is_packed_without_padding() {
        let layout = FieldLayout::new(
            "mixed",
            vec![
                spec("dir", FieldType::Bool),
                spec("handle", FieldType::U64),
                spec("flags", FieldType::U32),
            ],
        )
        .unwrap();
        assert_eq!(layout.prefix_len(), 13);
    }

    #[fusegate_test_utils::logged_test]
    fn rejects_variable_field_before_fixed_field() {
        let err = FieldLayout::new(
            "broken",
            vec![spec("name", FieldType::Text), spec("inode", FieldType::U64)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            LayoutError::NonTrailingVariable {
                record: "broken",
                field: "name",
                after: "inode",
            }
        );
    }

    #[fusegate_test_utils::logged_test]
    fn no_fields_is_empty() {
        let layout = FieldLayout::new("none", Vec::new()).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout, FieldLayout::empty("none"));
    }
}
