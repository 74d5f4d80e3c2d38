// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Backend RPC client for the fusegate gateway
//!
//! One forwarded operation is one `POST <target>/v1/<kind>`. The
//! [`RpcClient`] encodes the request with the connection's wire encoding,
//! sends it through an [`HttpTransport`] decorated with the caller's
//! credential and trace token, and folds every failure (transport, backend
//! status, malformed payload, cancellation) into a single [`ErrorInfo`]
//! that maps onto a POSIX errno.

pub mod auth;
pub mod client;
pub mod context;
pub mod error;
pub mod transport;

pub use auth::{
    AuthorizedTransport, CallIdentity, Credential, TraceToken, DEFAULT_AUTH_SCHEME, ERROR_HEADER,
    TRACE_HEADER,
};
pub use client::RpcClient;
pub use context::CallContext;
pub use error::{ErrorInfo, ErrorKind};
pub use transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport, TransportError};
