// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Contract between the dispatcher and a kernel filesystem session
//!
//! A session yields one [`KernelRequest`] per kernel callback. Each request
//! carries the caller's [`RequestHeader`], the typed payload for its
//! operation and a one-shot [`Reply`]. Replying consumes the handle, so a
//! callback is answered at most once; a handle dropped unanswered reports
//! `EIO`.

use async_trait::async_trait;
use fusegate_client::Credential;
use fusegate_proto::{ops, NoBody, Operation, OperationKind};
use tokio::sync::{mpsc, oneshot};

/// Caller identity and kernel request id of one callback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestHeader {
    pub unique: u64,
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl RequestHeader {
    pub fn credential(&self) -> Credential {
        Credential::new(self.uid, self.gid, self.pid)
    }
}

type Responder<T> = Box<dyn FnOnce(Result<T, i32>) + Send>;

/// One-shot answer to a kernel callback: a payload or an errno.
pub struct Reply<T> {
    responder: Option<Responder<T>>,
}

impl<T: Send + 'static> Reply<T> {
    pub fn new(respond: impl FnOnce(Result<T, i32>) + Send + 'static) -> Self {
        Self {
            responder: Some(Box::new(respond)),
        }
    }

    /// Reply whose outcome is delivered through a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, i32>>) {
        let (tx, rx) = oneshot::channel();
        let reply = Self::new(move |result| {
            let _ = tx.send(result);
        });
        (reply, rx)
    }

    pub fn ok(self, value: T) {
        self.send(Ok(value));
    }

    pub fn error(self, errno: i32) {
        self.send(Err(errno));
    }

    pub fn send(mut self, result: Result<T, i32>) {
        if let Some(respond) = self.responder.take() {
            respond(result);
        }
    }
}

impl<T> Drop for Reply<T> {
    fn drop(&mut self) {
        if let Some(respond) = self.responder.take() {
            respond(Err(libc::EIO));
        }
    }
}

impl<T> std::fmt::Debug for Reply<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reply")
            .field("answered", &self.responder.is_none())
            .finish()
    }
}

/// One kernel callback of operation `Op`.
#[derive(Debug)]
pub struct Call<Op: Operation> {
    pub header: RequestHeader,
    pub request: Op::Request,
    pub reply: Reply<Op::Response>,
}

impl<Op: Operation> Call<Op> {
    pub fn new(
        header: RequestHeader,
        request: Op::Request,
    ) -> (Self, oneshot::Receiver<Result<Op::Response, i32>>) {
        let (reply, rx) = Reply::channel();
        (
            Self {
                header,
                request,
                reply,
            },
            rx,
        )
    }
}

/// Consumer of typed calls, used with [`KernelRequest::route`].
pub trait CallHandler {
    fn handle<Op: Operation>(&self, call: Call<Op>);

    /// A callback the gateway has no operation for.
    fn unsupported(&self, header: RequestHeader, opcode: String, reply: Reply<NoBody>);
}

macro_rules! kernel_requests {
    ($($variant:ident => $name:literal ($req:ty, $resp:ty)),* $(,)?) => {
        /// A kernel callback, tagged by operation.
        #[derive(Debug)]
        pub enum KernelRequest {
            $($variant(Call<ops::$variant>),)*
            /// A callback type outside the operation table (ioctl, poll, ...)
            Unsupported {
                header: RequestHeader,
                opcode: String,
                reply: Reply<NoBody>,
            },
        }

        impl KernelRequest {
            /// `None` for [`KernelRequest::Unsupported`].
            pub fn kind(&self) -> Option<OperationKind> {
                match self {
                    $(KernelRequest::$variant(_) => Some(OperationKind::$variant),)*
                    KernelRequest::Unsupported { .. } => None,
                }
            }

            pub fn header(&self) -> &RequestHeader {
                match self {
                    $(KernelRequest::$variant(call) => &call.header,)*
                    KernelRequest::Unsupported { header, .. } => header,
                }
            }

            pub fn route<H: CallHandler>(self, handler: &H) {
                match self {
                    $(KernelRequest::$variant(call) => handler.handle(call),)*
                    KernelRequest::Unsupported { header, opcode, reply } => {
                        handler.unsupported(header, opcode, reply)
                    }
                }
            }
        }

        $(
            impl From<Call<ops::$variant>> for KernelRequest {
                fn from(call: Call<ops::$variant>) -> Self {
                    KernelRequest::$variant(call)
                }
            }
        )*
    };
}

fusegate_proto::for_each_operation!(kernel_requests);

/// Source of kernel callbacks for one mounted filesystem.
#[async_trait]
pub trait KernelSession: Send {
    /// Next callback, or `None` once the kernel has closed the session.
    async fn next_request(&mut self) -> Option<KernelRequest>;
}

/// Session fed through an in-process channel.
///
/// The `fuser` bridge pushes callbacks from its own thread into the
/// [`SessionSender`]; tests push scripted callbacks the same way.
#[derive(Debug)]
pub struct ChannelSession {
    rx: mpsc::UnboundedReceiver<KernelRequest>,
}

#[derive(Clone, Debug)]
pub struct SessionSender {
    tx: mpsc::UnboundedSender<KernelRequest>,
}

impl ChannelSession {
    pub fn pair() -> (SessionSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SessionSender { tx }, Self { rx })
    }
}

#[async_trait]
impl KernelSession for ChannelSession {
    async fn next_request(&mut self) -> Option<KernelRequest> {
        self.rx.recv().await
    }
}

impl SessionSender {
    /// Queue `request`. A closed session answers it with `EIO` on drop.
    pub fn send(&self, request: KernelRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    /// Queue a typed call and return the receiver for its reply.
    pub fn call<Op: Operation>(
        &self,
        header: RequestHeader,
        request: Op::Request,
    ) -> oneshot::Receiver<Result<Op::Response, i32>>
    where
        KernelRequest: From<Call<Op>>,
    {
        let (call, rx) = Call::<Op>::new(header, request);
        self.send(KernelRequest::from(call));
        rx
    }

    /// Queue a callback outside the operation table.
    pub fn unsupported(
        &self,
        header: RequestHeader,
        opcode: &str,
    ) -> oneshot::Receiver<Result<NoBody, i32>> {
        let (reply, rx) = Reply::channel();
        self.send(KernelRequest::Unsupported {
            header,
            opcode: opcode.to_string(),
            reply,
        });
        rx
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
