// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! HTTP transport seam
//!
//! The RPC client only ever POSTs a fully buffered body and reads a fully
//! buffered reply, so the transport contract is a single method. The
//! production implementation wraps a pooled `reqwest::Client`; tests
//! substitute mocks or a decorated transport.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::auth::CallIdentity;

/// Outbound request, before credential decoration.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Caller identity the decorating transport turns into headers
    pub identity: Option<CallIdentity>,
}

/// Backend reply with its body read to completion.
#[derive(Clone, Debug)]
pub struct HttpReply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP request timed out")]
    Timeout,

    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },

    #[error("invalid backend URL {url}")]
    InvalidUrl { url: String },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POST `request` and return the reply with its body fully drained.
    async fn post(&self, request: HttpRequest) -> Result<HttpReply, TransportError>;
}

/// `reqwest`-backed transport. Clones share one connection pool.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Pooled client identifying itself as the gateway.
    pub fn with_defaults() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fusegate/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        // The body is always consumed, including on error statuses, so the
        // connection goes back to the pool.
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(HttpReply {
            status,
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err)
    }
}
