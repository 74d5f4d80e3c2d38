// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Encoding selection: structured JSON (default) or raw fixed layout

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::layout::FieldLayout;
use crate::raw;
use crate::record::{FieldReader, WireRecord};

pub const RAW_CONTENT_TYPE: &str = "application/fuse";
pub const GENERIC_CONTENT_TYPE: &str = "application/json";

/// Wire encoding spoken on one connection. The two are not interchangeable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireEncoding {
    /// Self-describing JSON records
    #[default]
    Generic,
    /// Packed little-endian prefix plus trailing variable fields
    Raw,
}

/// Error body used in generic mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errno: i32,
    #[serde(default)]
    pub message: String,
}

impl WireEncoding {
    pub fn content_type(self) -> &'static str {
        match self {
            WireEncoding::Generic => GENERIC_CONTENT_TYPE,
            WireEncoding::Raw => RAW_CONTENT_TYPE,
        }
    }

    /// Encode `value`. An empty layout always produces an empty body.
    pub fn encode<T>(self, layout: &FieldLayout, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: WireRecord + Serialize,
    {
        if layout.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            WireEncoding::Generic => Ok(serde_json::to_vec(value)?),
            WireEncoding::Raw => raw::encode(layout, &value.flatten()),
        }
    }

    /// Decode `body`. For an empty layout the body content is ignored.
    pub fn decode<T>(self, layout: &FieldLayout, body: &[u8]) -> Result<T, CodecError>
    where
        T: WireRecord + DeserializeOwned,
    {
        if layout.is_empty() {
            return T::unflatten(&mut FieldReader::new(Vec::new()));
        }
        match self {
            WireEncoding::Generic => Ok(serde_json::from_slice(body)?),
            WireEncoding::Raw => {
                let values = raw::decode(layout, body)?;
                let mut reader = FieldReader::new(values);
                let record = T::unflatten(&mut reader)?;
                if reader.remaining() != 0 {
                    return Err(CodecError::TrailingBytes {
                        count: reader.remaining(),
                    });
                }
                Ok(record)
            }
        }
    }

    /// Error payload a backend sends with a non-2xx status.
    pub fn encode_error(self, errno: i32, message: &str) -> Vec<u8> {
        match self {
            WireEncoding::Raw => errno.to_le_bytes().to_vec(),
            WireEncoding::Generic => {
                let body = ErrorBody {
                    errno,
                    message: message.to_string(),
                };
                serde_json::to_vec(&body).unwrap_or_default()
            }
        }
    }

    /// Extract the embedded errno (and message, if any) from an error body.
    pub fn decode_error(self, body: &[u8]) -> Option<(i32, Option<String>)> {
        match self {
            WireEncoding::Raw => {
                let bytes: [u8; 4] = body.try_into().ok()?;
                Some((i32::from_le_bytes(bytes), None))
            }
            WireEncoding::Generic => {
                let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
                let message = (!parsed.message.is_empty()).then_some(parsed.message);
                Some((parsed.errno, message))
            }
        }
    }
}

impl std::fmt::Display for WireEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireEncoding::Generic => write!(f, "generic"),
            WireEncoding::Raw => write!(f, "raw"),
        }
    }
}

impl std::str::FromStr for WireEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "generic" | "json" => Ok(WireEncoding::Generic),
            "raw" | "fuse" => Ok(WireEncoding::Raw),
            _ => Err(format!(
                "Invalid wire encoding: {}. Use 'generic' or 'raw'",
                s
            )),
        }
    }
}
