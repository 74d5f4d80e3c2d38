// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Newline-delimited escaping for records with several variable fields
//!
//! `\` becomes `\\`, a newline becomes `\n`, and every field is terminated
//! by one unescaped newline.

use crate::error::CodecError;

const ESCAPE: u8 = b'\\';
const NEWLINE: u8 = b'\n';

/// Append `value` escaped and newline-terminated.
pub fn write_field(out: &mut Vec<u8>, value: &[u8]) {
    out.reserve(value.len() + 1);
    for &byte in value {
        match byte {
            ESCAPE => out.extend_from_slice(b"\\\\"),
            NEWLINE => out.extend_from_slice(b"\\n"),
            other => out.push(other),
        }
    }
    out.push(NEWLINE);
}

/// Read one field from the start of `input`.
///
/// Returns the unescaped bytes and the number of input bytes consumed,
/// terminator included.
pub fn read_field(input: &[u8], field: &'static str) -> Result<(Vec<u8>, usize), CodecError> {
    let mut value = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        match input[pos] {
            NEWLINE => return Ok((value, pos + 1)),
            ESCAPE => {
                match input.get(pos + 1) {
                    Some(&ESCAPE) => value.push(ESCAPE),
                    Some(&b'n') => value.push(NEWLINE),
                    _ => return Err(CodecError::InvalidEscape { field, offset: pos }),
                }
                pos += 2;
            }
            other => {
                value.push(other);
                pos += 1;
            }
        }
    }

    Err(CodecError::Unterminated { field })
}
