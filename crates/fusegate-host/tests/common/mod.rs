// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fusegate_client::{AuthorizedTransport, HttpTransport, ReqwestTransport};
use fusegate_host::{
    ChannelSession, KernelSession, ManagerSettings, MountArgs, MountTable, Mounter, SessionError,
    SessionManager, SessionSender,
};
use fusegate_proto::{descriptor_for, Operation, WireEncoding};
use fusegate_test_utils::SimulatedBackend;

/// Mounter whose kernel sessions are in-process channels the test drives.
#[derive(Default)]
pub struct ChannelMounter {
    senders: Mutex<HashMap<PathBuf, SessionSender>>,
    unmounts: Mutex<Vec<PathBuf>>,
}

impl ChannelMounter {
    pub fn sender(&self, mount_point: &str) -> SessionSender {
        self.senders
            .lock()
            .unwrap()
            .get(Path::new(mount_point))
            .cloned()
            .unwrap_or_else(|| panic!("{} is not mounted", mount_point))
    }

    pub fn unmounts(&self) -> Vec<PathBuf> {
        self.unmounts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mounter for ChannelMounter {
    async fn mount(&self, args: &MountArgs) -> Result<Box<dyn KernelSession>, SessionError> {
        let (sender, session) = ChannelSession::pair();
        self.senders.lock().unwrap().insert(args.mount_point.clone(), sender);
        Ok(Box::new(session))
    }

    async fn unmount(&self, mount_point: &Path) -> Result<(), SessionError> {
        self.unmounts.lock().unwrap().push(mount_point.to_path_buf());
        match self.senders.lock().unwrap().remove(mount_point) {
            Some(_) => Ok(()),
            None => Err(SessionError::Unmount {
                mount_point: mount_point.to_path_buf(),
                reason: "not mounted".into(),
            }),
        }
    }
}

pub fn transport() -> Arc<dyn HttpTransport> {
    Arc::new(AuthorizedTransport::new(
        ReqwestTransport::with_defaults().unwrap(),
        "FuseGate",
    ))
}

pub fn manager(
    mounter: &Arc<ChannelMounter>,
    settings: ManagerSettings,
    table: Option<MountTable>,
) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        mounter.clone(),
        transport(),
        settings,
        table,
    ))
}

pub fn raw_settings() -> ManagerSettings {
    ManagerSettings {
        encoding: WireEncoding::Raw,
        ..Default::default()
    }
}

/// Raw response body for `Op`.
pub fn raw_response<Op: Operation>(response: &Op::Response) -> Vec<u8> {
    WireEncoding::Raw
        .encode(descriptor_for(Op::KIND).response_layout(), response)
        .unwrap()
}

/// Wait until the backend has seen `count` requests.
pub async fn wait_for_requests(backend: &SimulatedBackend, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.request_count() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("backend did not receive the expected requests");
}
