// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Error types for layout construction and payload coding

use thiserror::Error;

use crate::kind::OperationKind;
use crate::layout::FieldType;

/// A record layout that the raw codec cannot represent.
///
/// These are raised while the registry is being built, never per call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{record}: variable-length field `{field}` is followed by fixed field `{after}`")]
    NonTrailingVariable {
        record: &'static str,
        field: &'static str,
        after: &'static str,
    },
    #[error("operation {0} is registered more than once")]
    DuplicateKind(OperationKind),
    #[error("operation {0} has no registered descriptor")]
    MissingKind(OperationKind),
}

/// Failure to encode or decode a payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("short payload: need at least {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
    #[error("field `{field}` is not terminated by a newline")]
    Unterminated { field: &'static str },
    #[error("field `{field}` contains an invalid escape sequence at byte {offset}")]
    InvalidEscape { field: &'static str, offset: usize },
    #[error("{count} unexpected bytes after the last field")]
    TrailingBytes { count: usize },
    #[error("text field `{field}` is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("field `{field}` expected {expected:?} but the record produced {found:?}")]
    FieldMismatch {
        field: &'static str,
        expected: FieldType,
        found: FieldType,
    },
    #[error("record ended before field `{field}`")]
    MissingField { field: &'static str },
    #[error("structured payload error: {0}")]
    Structured(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Structured(err.to_string())
    }
}
