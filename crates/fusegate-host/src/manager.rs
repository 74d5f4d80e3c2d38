// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Session manager: the set of live connections, keyed by mount point

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use fusegate_client::{HttpTransport, RpcClient};
use fusegate_proto::WireEncoding;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionSettings, ConnectionState};
use crate::kernel::KernelSession;
use crate::mount::MountArgs;
use crate::mount_table::{MountTable, MountTableError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{} is already mounted", .0.display())]
    AlreadyMounted(PathBuf),

    #[error("{} is not mounted", .0.display())]
    NotMounted(PathBuf),

    #[error("invalid argument `allow`: value can be `allow_root` or `allow_other`, got {0:?}")]
    InvalidAllowMode(String),

    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("failed to mount {}: {reason}", .mount_point.display())]
    Mount { mount_point: PathBuf, reason: String },

    #[error("failed to unmount {}: {reason}", .mount_point.display())]
    Unmount { mount_point: PathBuf, reason: String },

    #[error(transparent)]
    Table(#[from] MountTableError),
}

impl SessionError {
    pub fn errno(&self) -> i32 {
        match self {
            SessionError::AlreadyMounted(_) => libc::EEXIST,
            SessionError::NotMounted(_) => libc::ENOENT,
            SessionError::InvalidAllowMode(_) | SessionError::InvalidTarget { .. } => libc::EINVAL,
            SessionError::Mount { .. } | SessionError::Unmount { .. } | SessionError::Table(_) => {
                libc::EIO
            }
        }
    }

    /// HTTP status the admin API answers with.
    pub fn status(&self) -> u16 {
        match self {
            SessionError::AlreadyMounted(_) => 409,
            SessionError::NotMounted(_) => 404,
            SessionError::InvalidAllowMode(_) | SessionError::InvalidTarget { .. } => 400,
            SessionError::Mount { .. } | SessionError::Unmount { .. } | SessionError::Table(_) => {
                500
            }
        }
    }
}

/// Attaches kernel sessions to mount points.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mounter: Send + Sync {
    async fn mount(&self, args: &MountArgs) -> Result<Box<dyn KernelSession>, SessionError>;

    /// Detach whatever is mounted at `mount_point`.
    async fn unmount(&self, mount_point: &Path) -> Result<(), SessionError>;
}

/// Per-connection settings shared by every mount.
#[derive(Clone, Debug, Default)]
pub struct ManagerSettings {
    pub encoding: WireEncoding,
    pub request_timeout: Option<Duration>,
    pub drain_timeout: Option<Duration>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MountStatus {
    #[serde(flatten)]
    pub args: MountArgs,
    pub serving: bool,
}

struct ActiveSession {
    args: MountArgs,
    connection: Arc<Connection>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

enum Slot {
    // Reserved while the kernel mount is in progress
    Pending,
    Active(ActiveSession),
}

#[derive(Default)]
struct State {
    // Persisted order
    mounts: Vec<MountArgs>,
    sessions: HashMap<PathBuf, Slot>,
}

pub struct SessionManager {
    mounter: Arc<dyn Mounter>,
    transport: Arc<dyn HttpTransport>,
    settings: ManagerSettings,
    table: Option<MountTable>,
    state: Mutex<State>,
    // Held from snapshot to save so saves land in mutation order
    persist_lock: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(
        mounter: Arc<dyn Mounter>,
        transport: Arc<dyn HttpTransport>,
        settings: ManagerSettings,
        table: Option<MountTable>,
    ) -> Self {
        Self {
            mounter,
            transport,
            settings,
            table,
            state: Mutex::new(State::default()),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mount `args` and record it in the mount table.
    pub async fn mount(&self, args: MountArgs) -> Result<(), SessionError> {
        self.mount_session(args, true).await
    }

    /// Re-establish every mount saved in the table.
    ///
    /// A stale kernel mount left by a previous process is detached first.
    pub async fn restore(&self) -> Result<usize, SessionError> {
        let Some(table) = &self.table else {
            return Ok(0);
        };
        let saved = table.load()?;
        info!(operation = "restore_mounts", count = saved.len(), "restoring saved mounts");

        for args in &saved {
            if let Err(err) = self.mounter.unmount(&args.mount_point).await {
                debug!(operation = "restore_unmount_stale", mount_point = %args.mount_point.display(), error = %err, "no stale mount detached");
            }
            self.mount_session(args.clone(), false).await?;
        }
        Ok(saved.len())
    }

    async fn mount_session(&self, args: MountArgs, persist: bool) -> Result<(), SessionError> {
        args.validate()?;
        let mount_point = args.mount_point.clone();
        debug!(operation = "mount_start", mount_point = %mount_point.display(), target = %args.target);

        {
            let mut state = self.state();
            if state.sessions.contains_key(&mount_point) {
                debug!(operation = "mount_conflict", mount_point = %mount_point.display());
                return Err(SessionError::AlreadyMounted(mount_point));
            }
            state.sessions.insert(mount_point.clone(), Slot::Pending);
        }

        let active = match self.start(&args).await {
            Ok(active) => active,
            Err(err) => {
                self.state().sessions.remove(&mount_point);
                warn!(operation = "mount_failed", mount_point = %mount_point.display(), error = %err);
                return Err(err);
            }
        };

        let _persisting = self.persist_lock.lock().await;
        let snapshot = {
            let mut state = self.state();
            state.sessions.insert(mount_point.clone(), Slot::Active(active));
            state.mounts.push(args);
            state.mounts.clone()
        };
        info!(operation = "mounted", mount_point = %mount_point.display());

        if persist {
            self.persist(&snapshot)?;
        }
        Ok(())
    }

    async fn start(&self, args: &MountArgs) -> Result<ActiveSession, SessionError> {
        let settings = ConnectionSettings {
            target: args.target_url()?,
            readonly: args.is_readonly(),
            request_timeout: self.settings.request_timeout,
            drain_timeout: self.settings.drain_timeout,
        };
        let session = self.mounter.mount(args).await?;

        let client = RpcClient::new(Arc::clone(&self.transport), self.settings.encoding);
        let connection = Arc::new(Connection::new(args.mount_point.clone(), client, settings));
        let shutdown = CancellationToken::new();
        let task = {
            let connection = Arc::clone(&connection);
            let shutdown = shutdown.clone();
            tokio::spawn(async move { connection.serve(session, shutdown).await })
        };

        Ok(ActiveSession {
            args: args.clone(),
            connection,
            shutdown,
            task,
        })
    }

    /// Unmount `mount_point`, wait for its workers and drop it from the table.
    pub async fn unmount(&self, mount_point: &Path) -> Result<(), SessionError> {
        let active = {
            let mut state = self.state();
            match state.sessions.remove(mount_point) {
                Some(Slot::Active(active)) => {
                    state.mounts.retain(|args| args.mount_point != mount_point);
                    active
                }
                Some(Slot::Pending) => {
                    state.sessions.insert(mount_point.to_path_buf(), Slot::Pending);
                    return Err(SessionError::NotMounted(mount_point.to_path_buf()));
                }
                None => return Err(SessionError::NotMounted(mount_point.to_path_buf())),
            }
        };

        let detached = self.stop(active).await;
        {
            let _persisting = self.persist_lock.lock().await;
            let snapshot = self.state().mounts.clone();
            self.persist(&snapshot)?;
        }
        info!(operation = "unmounted", mount_point = %mount_point.display());
        detached
    }

    /// Stop every session without touching the mount table, so a restart restores them.
    pub async fn shutdown_all(&self) {
        let active: Vec<ActiveSession> = {
            let mut state = self.state();
            let mount_points: Vec<PathBuf> = state
                .sessions
                .iter()
                .filter(|(_, slot)| matches!(slot, Slot::Active(_)))
                .map(|(path, _)| path.clone())
                .collect();
            mount_points
                .into_iter()
                .filter_map(|path| match state.sessions.remove(&path) {
                    Some(Slot::Active(active)) => Some(active),
                    _ => None,
                })
                .collect()
        };

        info!(operation = "shutdown_all", sessions = active.len(), "closing all sessions");
        for session in active {
            let mount_point = session.args.mount_point.clone();
            if let Err(err) = self.stop(session).await {
                warn!(operation = "shutdown_unmount", mount_point = %mount_point.display(), error = %err);
            }
        }
    }

    async fn stop(&self, session: ActiveSession) -> Result<(), SessionError> {
        let detached = self.mounter.unmount(&session.args.mount_point).await;
        session.shutdown.cancel();
        if let Err(err) = session.task.await {
            warn!(operation = "session_join", mount_point = %session.args.mount_point.display(), error = %err);
        }
        detached
    }

    fn persist(&self, mounts: &[MountArgs]) -> Result<(), SessionError> {
        if let Some(table) = &self.table {
            table.save(mounts)?;
        }
        Ok(())
    }

    pub fn mounts(&self) -> Vec<MountStatus> {
        let state = self.state();
        state
            .mounts
            .iter()
            .map(|args| MountStatus {
                args: args.clone(),
                serving: matches!(
                    state.sessions.get(&args.mount_point),
                    Some(Slot::Active(active)) if active.connection.state() == ConnectionState::Serving
                ),
            })
            .collect()
    }

    pub fn connection(&self, mount_point: &Path) -> Option<Arc<Connection>> {
        match self.state().sessions.get(mount_point) {
            Some(Slot::Active(active)) => Some(Arc::clone(&active.connection)),
            _ => None,
        }
    }
}
