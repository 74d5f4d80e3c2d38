// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Admin HTTP API
//!
//! - `POST /v1/mount` with a [`MountArgs`] body
//! - `POST /v1/unmount` with `{"mountpoint": "..."}`
//! - `GET /v1/mounts` lists the active mounts

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::manager::{MountStatus, SessionError, SessionManager};
use crate::mount::MountArgs;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmountArgs {
    #[serde(rename = "mountpoint")]
    pub mount_point: PathBuf,
}

/// Error body of every failed admin call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProblem {
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub errno: i32,
}

#[derive(Debug)]
pub struct AdminError(pub SessionError);

impl From<SessionError> for AdminError {
    fn from(err: SessionError) -> Self {
        AdminError(err)
    }
}

impl AdminError {
    pub fn to_problem(&self) -> AdminProblem {
        let title = match &self.0 {
            SessionError::AlreadyMounted(_) => "Already Mounted",
            SessionError::NotMounted(_) => "Not Mounted",
            SessionError::InvalidAllowMode(_) | SessionError::InvalidTarget { .. } => {
                "Invalid Mount Arguments"
            }
            SessionError::Mount { .. } => "Mount Failed",
            SessionError::Unmount { .. } => "Unmount Failed",
            SessionError::Table(_) => "Mount Table Error",
        };
        AdminProblem {
            title: title.to_string(),
            status: self.0.status(),
            detail: self.0.to_string(),
            errno: self.0.errno(),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let problem = self.to_problem();
        let status = StatusCode::from_u16(problem.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}

pub fn router(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/v1/mount", post(mount))
        .route("/v1/unmount", post(unmount))
        .route("/v1/mounts", get(list_mounts))
        .with_state(manager)
}

async fn mount(
    State(manager): State<Arc<SessionManager>>,
    Json(args): Json<MountArgs>,
) -> Result<StatusCode, AdminError> {
    let mount_point = args.mount_point.clone();
    match manager.mount(args).await {
        Ok(()) => {
            info!(operation = "admin_mount", mount_point = %mount_point.display());
            Ok(StatusCode::OK)
        }
        Err(err) => {
            warn!(operation = "admin_mount", mount_point = %mount_point.display(), error = %err);
            Err(err.into())
        }
    }
}

async fn unmount(
    State(manager): State<Arc<SessionManager>>,
    Json(args): Json<UnmountArgs>,
) -> Result<StatusCode, AdminError> {
    match manager.unmount(&args.mount_point).await {
        Ok(()) => {
            info!(operation = "admin_unmount", mount_point = %args.mount_point.display());
            Ok(StatusCode::OK)
        }
        Err(err) => {
            warn!(operation = "admin_unmount", mount_point = %args.mount_point.display(), error = %err);
            Err(err.into())
        }
    }
}

async fn list_mounts(State(manager): State<Arc<SessionManager>>) -> Json<Vec<MountStatus>> {
    Json(manager.mounts())
}
