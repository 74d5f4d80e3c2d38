// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! fusegate host: serves kernel filesystem sessions by forwarding every
//! callback to an HTTP backend
//!
//! [`SessionManager`] owns one [`Connection`] per mount point. A connection
//! reads callbacks from its [`KernelSession`] and answers each one from a
//! worker task through the [`fusegate_client::RpcClient`]. Mounts are
//! managed over the [`admin`] API and persisted in a [`MountTable`].

pub mod admin;
pub mod attr;
pub mod config;
pub mod connection;
#[cfg(all(feature = "fuse", target_os = "linux"))]
pub mod fuse_session;
pub mod kernel;
pub mod manager;
pub mod mount;
pub mod mount_table;

pub use config::{ConfigError, GatewayConfig};
pub use connection::{Connection, ConnectionSettings, ConnectionState};
pub use kernel::{
    Call, CallHandler, ChannelSession, KernelRequest, KernelSession, Reply, RequestHeader,
    SessionSender,
};
pub use manager::{ManagerSettings, MountStatus, Mounter, SessionError, SessionManager};
pub use mount::{AllowMode, MountArgs};
pub use mount_table::{MountTable, MountTableError};
