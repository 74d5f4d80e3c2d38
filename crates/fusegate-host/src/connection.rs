// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-mount dispatcher
//!
//! A [`Connection`] reads callbacks from one kernel session and spawns one
//! worker per callback. Workers forward their operation through the
//! [`RpcClient`] and answer the kernel. The read loop never waits on a
//! worker; closing the session drains the workers before the connection
//! reports [`ConnectionState::Closed`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fusegate_client::{CallContext, ErrorInfo, RpcClient, TraceToken};
use fusegate_proto::{ops, NoBody, Operation};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn, Instrument};
use url::Url;

use crate::kernel::{Call, CallHandler, KernelRequest, KernelSession, Reply, RequestHeader};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Serving,
    Closed,
}

/// Fixed for the lifetime of a connection.
#[derive(Clone, Debug)]
pub struct ConnectionSettings {
    pub target: Url,
    pub readonly: bool,
    /// Deadline applied to every forwarded call
    pub request_timeout: Option<Duration>,
    /// Bound on how long close waits for in-flight workers
    pub drain_timeout: Option<Duration>,
}

type InflightTable = Mutex<HashMap<u64, CancellationToken>>;

struct Shared {
    client: RpcClient,
    settings: ConnectionSettings,
    inflight: InflightTable,
}

pub struct Connection {
    mount_point: PathBuf,
    shared: Arc<Shared>,
    tracker: TaskTracker,
    // Parent of every worker's cancellation token
    workers: CancellationToken,
    state: watch::Sender<ConnectionState>,
}

impl Connection {
    pub fn new(
        mount_point: impl Into<PathBuf>,
        client: RpcClient,
        settings: ConnectionSettings,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Open);
        Self {
            mount_point: mount_point.into(),
            shared: Arc::new(Shared {
                client,
                settings,
                inflight: Mutex::new(HashMap::new()),
            }),
            tracker: TaskTracker::new(),
            workers: CancellationToken::new(),
            state,
        }
    }

    pub fn mount_point(&self) -> &Path {
        &self.mount_point
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.shared.settings
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Workers that have not answered yet.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Serve `session` until it ends or `shutdown` fires, then drain.
    pub async fn serve(&self, mut session: Box<dyn KernelSession>, shutdown: CancellationToken) {
        let span = tracing::info_span!("connection", mount_point = %self.mount_point.display());
        async {
            self.state.send_replace(ConnectionState::Serving);
            info!(operation = "connection_serve", "serving kernel session");

            loop {
                let request = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        debug!(operation = "connection_shutdown", "shutdown requested");
                        break;
                    }
                    next = session.next_request() => match next {
                        Some(request) => request,
                        None => {
                            debug!(operation = "connection_eof", "kernel session closed");
                            break;
                        }
                    },
                };
                self.dispatch(request);
            }

            drop(session);
            self.drain().await;
            self.state.send_replace(ConnectionState::Closed);
            info!(operation = "connection_closed", "connection closed");
        }
        .instrument(span)
        .await
    }

    fn dispatch(&self, request: KernelRequest) {
        match request {
            KernelRequest::Interrupt(call) => self.interrupt(call),
            other => other.route(self),
        }
    }

    /// Cancel the target worker locally, then notify the backend.
    fn interrupt(&self, call: Call<ops::Interrupt>) {
        let target = call.request.intr_unique;
        let token = self
            .shared
            .inflight
            .lock()
            .ok()
            .and_then(|inflight| inflight.get(&target).cloned());
        match token {
            Some(token) => {
                debug!(operation = "interrupt", unique = target, "canceling in-flight call");
                token.cancel();
            }
            None => debug!(operation = "interrupt", unique = target, "no in-flight call to cancel"),
        }
        self.handle(call);
    }

    async fn drain(&self) {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            debug!(operation = "connection_drain", pending, "waiting for in-flight workers");
        }

        match self.shared.settings.drain_timeout {
            None => self.tracker.wait().await,
            Some(limit) => {
                if tokio::time::timeout(limit, self.tracker.wait()).await.is_err() {
                    warn!(
                        operation = "connection_drain_timeout",
                        pending = self.tracker.len(),
                        "drain deadline reached, canceling remaining workers"
                    );
                    self.workers.cancel();
                    self.tracker.wait().await;
                }
            }
        }
    }
}

impl CallHandler for Connection {
    fn handle<Op: Operation>(&self, call: Call<Op>) {
        let Call {
            header,
            request,
            reply,
        } = call;
        let kind = Op::KIND;
        let settings = &self.shared.settings;

        if settings.readonly && kind.is_mutating() {
            debug!(operation = "readonly_reject", kind = %kind, unique = header.unique);
            reply.error(ErrorInfo::read_only(kind).to_errno());
            return;
        }

        let cancel = self.workers.child_token();
        if let Ok(mut inflight) = self.shared.inflight.lock() {
            inflight.insert(header.unique, cancel.clone());
        }

        let ctx = CallContext::new(
            settings.target.clone(),
            header.credential(),
            TraceToken(header.unique),
        )
        .with_cancellation(cancel)
        .with_timeout(settings.request_timeout);

        let shared = Arc::clone(&self.shared);
        let span = tracing::debug_span!("operation", kind = %kind, unique = header.unique);
        self.tracker.spawn(
            async move {
                let result = shared.client.call::<Op>(&ctx, &request).await;
                if let Ok(mut inflight) = shared.inflight.lock() {
                    inflight.remove(&header.unique);
                }
                answer(header, reply, result);
            }
            .instrument(span),
        );
    }

    fn unsupported(&self, header: RequestHeader, opcode: String, reply: Reply<NoBody>) {
        debug!(
            operation = "unsupported",
            opcode = %opcode,
            unique = header.unique,
            "answering ENOSYS"
        );
        reply.error(ErrorInfo::unimplemented(opcode).to_errno());
    }
}

fn answer<T: Send + 'static>(header: RequestHeader, reply: Reply<T>, result: Result<T, ErrorInfo>) {
    match result {
        Ok(response) => reply.ok(response),
        Err(err) => {
            let errno = err.to_errno();
            debug!(unique = header.unique, errno, error = %err, "operation failed");
            reply.error(errno);
        }
    }
}
