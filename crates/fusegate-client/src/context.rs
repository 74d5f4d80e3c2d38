// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::{CallIdentity, Credential, TraceToken};

/// Everything one forwarded operation needs besides its payload.
///
/// Created when a kernel callback arrives and dropped once it is answered.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub target: Url,
    pub credential: Credential,
    pub trace: TraceToken,
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl CallContext {
    pub fn new(target: Url, credential: Credential, trace: TraceToken) -> Self {
        Self {
            target,
            credential,
            trace,
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set the deadline `timeout` from now; `None` clears it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|timeout| Instant::now() + timeout);
        self
    }

    pub fn identity(&self) -> CallIdentity {
        CallIdentity {
            credential: self.credential,
            trace: self.trace,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
