// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! encode → POST → decode → classify, for any registered operation

use std::sync::Arc;

use fusegate_proto::{Operation, OperationDescriptor, Registry, WireEncoding};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::{debug, Instrument};
use url::Url;

use crate::auth::{AuthorizedTransport, TraceToken, ERROR_HEADER, TRACE_HEADER};
use crate::context::CallContext;
use crate::error::ErrorInfo;
use crate::transport::{HttpReply, HttpRequest, HttpTransport, ReqwestTransport, TransportError};

/// Issues backend calls for one encoding. Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn HttpTransport>,
    encoding: WireEncoding,
    registry: &'static Registry,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("encoding", &self.encoding).finish()
    }
}

impl RpcClient {
    pub fn new(transport: Arc<dyn HttpTransport>, encoding: WireEncoding) -> Self {
        Self {
            transport,
            encoding,
            registry: Registry::global(),
        }
    }

    /// Client over `http`, decorating every call with `scheme` credentials.
    pub fn over_http(http: reqwest::Client, scheme: &str, encoding: WireEncoding) -> Self {
        let transport = AuthorizedTransport::new(ReqwestTransport::new(http), scheme);
        Self::new(Arc::new(transport), encoding)
    }

    pub fn encoding(&self) -> WireEncoding {
        self.encoding
    }

    /// Forward one `Op` to `ctx.target`.
    ///
    /// Cancellation of `ctx.cancel` or expiry of `ctx.deadline` drops the
    /// in-flight request and yields a canceled or timed-out error.
    pub async fn call<Op: Operation>(
        &self,
        ctx: &CallContext,
        request: &Op::Request,
    ) -> Result<Op::Response, ErrorInfo> {
        let descriptor = self.registry.descriptor(Op::KIND);
        let span = tracing::debug_span!(
            "rpc",
            kind = %Op::KIND,
            unique = ctx.trace.0,
            target = %ctx.target
        );
        self.call_inner::<Op>(descriptor, ctx, request)
            .instrument(span)
            .await
            .map_err(|err| match err.trace {
                Some(_) => err,
                None => err.with_trace(ctx.trace),
            })
    }

    async fn call_inner<Op: Operation>(
        &self,
        descriptor: &OperationDescriptor,
        ctx: &CallContext,
        request: &Op::Request,
    ) -> Result<Op::Response, ErrorInfo> {
        if ctx.is_canceled() {
            return Err(ErrorInfo::canceled());
        }

        let body = self
            .encoding
            .encode(descriptor.request_layout(), request)
            .map_err(|err| ErrorInfo::codec(&err))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(self.encoding.content_type()),
        );
        let http_request = HttpRequest {
            url: endpoint(&ctx.target, descriptor.path)?,
            headers,
            body,
            identity: Some(ctx.identity()),
        };

        debug!(bytes = http_request.body.len(), "sending request");
        let deadline = async {
            match ctx.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        let reply = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                debug!("call canceled in flight");
                return Err(ErrorInfo::canceled());
            }
            _ = deadline => {
                debug!("call deadline exceeded");
                return Err(ErrorInfo::timed_out());
            }
            reply = self.transport.post(http_request) => reply,
        };
        let reply = reply.map_err(|err| {
            debug!(error = %err, "transport failure");
            ErrorInfo::transport(&err)
        })?;

        debug!(status = reply.status.as_u16(), bytes = reply.body.len(), "received reply");
        if !reply.status.is_success() {
            return Err(self.backend_error(&reply));
        }

        self.encoding
            .decode(descriptor.response_layout(), &reply.body)
            .map_err(|err| ErrorInfo::codec(&err))
    }

    fn backend_error(&self, reply: &HttpReply) -> ErrorInfo {
        let status = reply.status.as_u16();
        let (errno, embedded) = self.encoding.decode_error(&reply.body).unwrap_or((0, None));
        // Only positive codes are errnos
        let errno = errno.max(0);
        let message = reply
            .header(ERROR_HEADER)
            .map(str::to_string)
            .or(embedded)
            .unwrap_or_else(|| {
                reply.status.canonical_reason().unwrap_or("backend error").to_string()
            });

        let mut error = ErrorInfo::backend(status, errno, message);
        if let Some(trace) = reply.header(TRACE_HEADER).and_then(|v| v.parse::<TraceToken>().ok()) {
            error = error.with_trace(trace);
        }
        error
    }
}

/// `target` with `path` appended, keeping any base path on the target.
fn endpoint(target: &Url, path: &str) -> Result<Url, ErrorInfo> {
    let joined = format!("{}{}", target.as_str().trim_end_matches('/'), path);
    Url::parse(&joined).map_err(|_| ErrorInfo::transport(&TransportError::InvalidUrl { url: joined }))
}
