// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Caller credential and trace token decoration

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};

use crate::transport::{HttpReply, HttpRequest, HttpTransport, TransportError};

pub const DEFAULT_AUTH_SCHEME: &str = "FuseGate";
/// Carries the radix-36 trace token in both directions.
pub const TRACE_HEADER: &str = "x-reqid";
/// Optional human-readable error message on failed replies.
pub const ERROR_HEADER: &str = "x-err";

/// Identity of the process that issued a kernel callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Credential {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl Credential {
    pub fn new(uid: u32, gid: u32, pid: u32) -> Self {
        Self { uid, gid, pid }
    }

    /// `uid | gid | pid`, each little-endian.
    pub fn to_bytes(self) -> [u8; 12] {
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&self.uid.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.gid.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.pid.to_le_bytes());
        bytes
    }

    /// `Authorization` header value: `<scheme> <base64(bytes)>`.
    pub fn authorization(self, scheme: &str) -> String {
        format!("{} {}", scheme, STANDARD.encode(self.to_bytes()))
    }
}

/// Per-operation trace token, the kernel's unique request id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceToken(pub u64);

impl std::fmt::Display for TraceToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut buf = [0u8; 13];
        let mut pos = buf.len();
        let mut value = self.0;
        loop {
            pos -= 1;
            buf[pos] = DIGITS[(value % 36) as usize];
            value /= 36;
            if value == 0 {
                break;
            }
        }
        // Only ASCII digits were written.
        f.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| std::fmt::Error)?)
    }
}

impl std::str::FromStr for TraceToken {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 36).map(TraceToken)
    }
}

/// What the decorating transport needs to know about the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallIdentity {
    pub credential: Credential,
    pub trace: TraceToken,
}

/// Adds `Authorization` and `X-Reqid` to every request that carries an identity.
#[derive(Clone, Debug)]
pub struct AuthorizedTransport<T> {
    inner: T,
    scheme: String,
}

impl<T> AuthorizedTransport<T> {
    pub fn new(inner: T, scheme: impl Into<String>) -> Self {
        Self {
            inner,
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for AuthorizedTransport<T> {
    async fn post(&self, mut request: HttpRequest) -> Result<HttpReply, TransportError> {
        if let Some(identity) = request.identity {
            let mut authorization =
                HeaderValue::from_str(&identity.credential.authorization(&self.scheme))
                    .map_err(|_| TransportError::InvalidHeader {
                        name: "authorization",
                    })?;
            authorization.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, authorization);

            let trace = HeaderValue::from_str(&identity.trace.to_string())
                .map_err(|_| TransportError::InvalidHeader { name: TRACE_HEADER })?;
            request.headers.insert(HeaderName::from_static(TRACE_HEADER), trace);
        }
        self.inner.post(request).await
    }
}
