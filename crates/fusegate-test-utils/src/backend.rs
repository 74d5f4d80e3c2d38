// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! A scriptable HTTP backend bound to an ephemeral local port.
//!
//! Every POST is recorded (path, headers, body) before the handler's reply
//! is sent, so tests can assert on exactly what the gateway put on the
//! wire. Replies may be delayed to keep calls in flight.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::task::JoinHandle;
use tracing::debug;

/// One request as the backend received it.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// What the backend answers.
#[derive(Clone, Debug)]
pub struct BackendReply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl BackendReply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Handler = dyn Fn(&RecordedRequest) -> BackendReply + Send + Sync;

#[derive(Clone)]
struct BackendState {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Running simulated backend. The server task stops when this is dropped.
pub struct SimulatedBackend {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl SimulatedBackend {
    /// Bind `127.0.0.1:0` and serve `handler` for every path.
    pub async fn start<F>(handler: F) -> std::io::Result<Self>
    where
        F: Fn(&RecordedRequest) -> BackendReply + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            handler: Arc::new(handler),
            requests: requests.clone(),
        };
        let app = Router::new().fallback(handle).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                debug!(error = %err, "simulated backend stopped");
            }
        });

        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// Base URL, e.g. `http://127.0.0.1:41234`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|request| request.path == path).collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|guard| guard.len()).unwrap_or_default()
    }
}

impl Drop for SimulatedBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(state): State<BackendState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RecordedRequest {
        path: uri.path().to_string(),
        headers,
        body: body.to_vec(),
    };
    let reply = (state.handler)(&request);
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request);
    }

    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response_headers = HeaderMap::new();
    for (name, value) in &reply.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response_headers.insert(name, value);
        }
    }
    (status, response_headers, reply.body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[crate::logged_tokio_test]
    async fn records_requests_and_replies() {
        let backend = SimulatedBackend::start(|request| {
            if request.path == "/v1/missing" {
                BackendReply::with_status(404, vec![2, 0, 0, 0]).header("X-Err", "not here")
            } else {
                BackendReply::ok(request.body.clone())
            }
        })
        .await
        .unwrap();

        let client = reqwest::Client::new();
        let echoed = client
            .post(format!("{}/v1/echo", backend.url()))
            .header("X-Reqid", "abc")
            .body(vec![1, 2, 3])
            .send()
            .await
            .unwrap();
        assert_eq!(echoed.status().as_u16(), 200);
        assert_eq!(echoed.bytes().await.unwrap().to_vec(), vec![1, 2, 3]);

        let missing = client
            .post(format!("{}/v1/missing", backend.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status().as_u16(), 404);
        assert_eq!(missing.headers()["x-err"], "not here");

        let recorded = backend.requests();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].path, "/v1/echo");
        assert_eq!(recorded[0].header("x-reqid"), Some("abc"));
        assert_eq!(backend.requests_to("/v1/missing").len(), 1);
        logger.log("simulated backend recorded both calls").unwrap();
    }
}
