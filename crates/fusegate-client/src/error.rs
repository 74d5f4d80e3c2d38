// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use fusegate_proto::{CodecError, OperationKind};
use thiserror::Error;

use crate::auth::TraceToken;
use crate::transport::TransportError;

/// Where a failure came from. Drives the errno used when none was embedded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Backend,
    Codec,
    Canceled,
    TimedOut,
    Unimplemented,
    ReadOnly,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Backend => "backend",
            ErrorKind::Codec => "codec",
            ErrorKind::Canceled => "canceled",
            ErrorKind::TimedOut => "timed out",
            ErrorKind::Unimplemented => "unimplemented",
            ErrorKind::ReadOnly => "read-only",
        };
        f.write_str(name)
    }
}

/// Failure of one forwarded operation.
///
/// `errno` is the code embedded by the backend, or 0 when none was
/// supplied; [`ErrorInfo::to_errno`] resolves the code the kernel sees.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub errno: i32,
    pub message: String,
    pub trace: Option<TraceToken>,
    pub status: Option<u16>,
}

impl ErrorInfo {
    fn new(kind: ErrorKind, errno: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            errno,
            message: message.into(),
            trace: None,
            status: None,
        }
    }

    pub fn transport(err: &TransportError) -> Self {
        Self::new(ErrorKind::Transport, 0, err.to_string())
    }

    /// Error reported by the backend with a non-2xx status.
    pub fn backend(status: u16, errno: i32, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::new(ErrorKind::Backend, errno, message)
        }
    }

    pub fn codec(err: &CodecError) -> Self {
        Self::new(ErrorKind::Codec, 0, err.to_string())
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, 0, "operation interrupted")
    }

    pub fn timed_out() -> Self {
        Self::new(ErrorKind::TimedOut, 0, "operation deadline exceeded")
    }

    pub fn unimplemented(operation: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::Unimplemented,
            0,
            format!("{} is not implemented", operation),
        )
    }

    pub fn read_only(kind: OperationKind) -> Self {
        Self::new(
            ErrorKind::ReadOnly,
            0,
            format!("{} rejected on a read-only mount", kind),
        )
    }

    pub fn with_trace(mut self, trace: TraceToken) -> Self {
        self.trace = Some(trace);
        self
    }

    /// POSIX code to answer the kernel with.
    pub fn to_errno(&self) -> i32 {
        if self.errno > 0 {
            return self.errno;
        }
        match self.kind {
            ErrorKind::Transport | ErrorKind::Backend | ErrorKind::Codec => libc::EIO,
            ErrorKind::Canceled => libc::EINTR,
            ErrorKind::TimedOut => libc::ETIMEDOUT,
            ErrorKind::Unimplemented => libc::ENOSYS,
            ErrorKind::ReadOnly => libc::EROFS,
        }
    }
}
