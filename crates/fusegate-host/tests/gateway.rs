// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mounted sessions forwarding to a simulated backend.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{manager, raw_response, raw_settings, wait_for_requests, ChannelMounter};
use fusegate_client::Credential;
use fusegate_host::{ManagerSettings, MountArgs, MountTable, RequestHeader};
use fusegate_proto::{
    ops, Attr, AttrResponse, EntryResponse, GetattrRequest, InterruptRequest, LookupRequest,
    ReadRequest, ReadResponse, WireEncoding, WriteRequest,
};
use fusegate_test_utils::{logged_tokio_test, BackendReply, SimulatedBackend};

fn header(unique: u64) -> RequestHeader {
    RequestHeader {
        unique,
        uid: 501,
        gid: 20,
        pid: 3141,
    }
}

fn read(handle: u64) -> ReadRequest {
    ReadRequest {
        handle,
        offset: 0,
        size: 5,
        dir: false,
    }
}

#[logged_tokio_test]
async fn getattr_inode_42_through_a_mount() {
    let attr = Attr {
        valid_ns: 1_000_000_000,
        inode: 42,
        size: 5,
        mode: 0o100644,
        nlink: 1,
        uid: 501,
        gid: 20,
        blksize: 4096,
        ..Default::default()
    };
    let body = raw_response::<ops::Getattr>(&AttrResponse { attr: attr.clone() });
    let backend = SimulatedBackend::start(move |_| BackendReply::ok(body.clone()))
        .await
        .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();

    let sender = mounter.sender("/mnt/gate");
    let response = sender
        .call::<ops::Getattr>(header(1295), GetattrRequest { inode: 42 })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response.attr, attr);

    let requests = backend.requests_to("/v1/getattr");
    assert_eq!(requests.len(), 1);
    logger.log(&format!("headers: {:?}", requests[0].headers)).unwrap();
    assert_eq!(requests[0].body, 42u64.to_le_bytes().to_vec());
    assert_eq!(requests[0].header("x-reqid"), Some("zz"));
    assert_eq!(
        requests[0].header("authorization"),
        Some(Credential::new(501, 20, 3141).authorization("FuseGate").as_str())
    );

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn generic_encoding_lookup() {
    let backend = SimulatedBackend::start(|request| {
        let lookup: LookupRequest = serde_json::from_slice(&request.body).unwrap();
        if lookup.name == "hello.txt" {
            let entry = EntryResponse {
                inode: 7,
                generation: 1,
                entry_valid_ns: 5_000_000_000,
                attr: Attr {
                    inode: 7,
                    mode: 0o100600,
                    ..Default::default()
                },
            };
            BackendReply::ok(serde_json::to_vec(&entry).unwrap())
        } else {
            BackendReply::with_status(
                404,
                WireEncoding::Generic.encode_error(libc::ENOENT, "no such entry"),
            )
        }
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, ManagerSettings::default(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();
    let sender = mounter.sender("/mnt/gate");

    let found = sender
        .call::<ops::Lookup>(
            header(1),
            LookupRequest {
                inode: 1,
                name: "hello.txt".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.inode, 7);

    let missing = sender
        .call::<ops::Lookup>(
            header(2),
            LookupRequest {
                inode: 1,
                name: "absent".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(missing, Err(libc::ENOENT));

    manager.shutdown_all().await;
}

#[logged_tokio_test(flavor = "multi_thread", worker_threads = 4)]
async fn hundred_concurrent_reads_each_answered_once() {
    let body = raw_response::<ops::Read>(&ReadResponse {
        data: b"hello".to_vec(),
    });
    let backend = SimulatedBackend::start(move |_| {
        BackendReply::ok(body.clone()).delayed(Duration::from_millis(50))
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();
    let sender = mounter.sender("/mnt/gate");

    let started = Instant::now();
    let receivers: Vec<_> = (0..100)
        .map(|unique| sender.call::<ops::Read>(header(unique), read(unique)))
        .collect();
    for rx in receivers {
        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.data, b"hello");
    }
    logger.log(&format!("100 reads took {:?}", started.elapsed())).unwrap();

    // Workers run concurrently, so the total is far below 100 * 50ms.
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(backend.requests_to("/v1/read").len(), 100);

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn unmount_waits_for_in_flight_workers() {
    let body = raw_response::<ops::Read>(&ReadResponse {
        data: b"hello".to_vec(),
    });
    let backend = SimulatedBackend::start(move |_| {
        BackendReply::ok(body.clone()).delayed(Duration::from_millis(200))
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();
    let sender = mounter.sender("/mnt/gate");

    let mut receivers: Vec<_> = (0..5)
        .map(|unique| sender.call::<ops::Read>(header(unique), read(unique)))
        .collect();
    wait_for_requests(&backend, 5).await;

    let connection = manager.connection(Path::new("/mnt/gate")).unwrap();
    manager.unmount(Path::new("/mnt/gate")).await.unwrap();
    assert_eq!(connection.in_flight(), 0);

    for rx in receivers.iter_mut() {
        let response = rx.try_recv().expect("worker answered before unmount returned");
        assert_eq!(response.unwrap().data, b"hello");
    }
    assert_eq!(mounter.unmounts(), vec![PathBuf::from("/mnt/gate")]);
}

#[logged_tokio_test]
async fn unsupported_callback_is_enosys_without_backend_call() {
    let backend = SimulatedBackend::start(|_| BackendReply::ok(Vec::new()))
        .await
        .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();

    let result = mounter.sender("/mnt/gate").unsupported(header(9), "ioctl").await.unwrap();
    assert_eq!(result, Err(libc::ENOSYS));
    assert_eq!(backend.request_count(), 0);

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn interrupt_cancels_locally_and_is_forwarded() {
    let body = raw_response::<ops::Read>(&ReadResponse {
        data: b"late".to_vec(),
    });
    let backend = SimulatedBackend::start(move |request| {
        if request.path == "/v1/read" {
            BackendReply::ok(body.clone()).delayed(Duration::from_secs(10))
        } else {
            BackendReply::ok(Vec::new())
        }
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();
    let sender = mounter.sender("/mnt/gate");

    let started = Instant::now();
    let pending = sender.call::<ops::Read>(header(10), read(3));
    wait_for_requests(&backend, 1).await;

    let interrupt =
        sender.call::<ops::Interrupt>(header(11), InterruptRequest { intr_unique: 10 });
    assert_eq!(pending.await.unwrap(), Err(libc::EINTR));
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(interrupt.await.unwrap().is_ok());
    let forwarded = backend.requests_to("/v1/interrupt");
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].body, 10u64.to_le_bytes().to_vec());

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn readonly_mount_rejects_writes_locally() {
    let backend = SimulatedBackend::start(|_| BackendReply::ok(Vec::new()))
        .await
        .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let manager = manager(&mounter, raw_settings(), None);
    let mut args = MountArgs::new("/mnt/ro", backend.url());
    args.readonly = 1;
    manager.mount(args).await.unwrap();

    let write = WriteRequest {
        handle: 1,
        offset: 0,
        flags: 0,
        data: b"nope".to_vec(),
    };
    let result = mounter.sender("/mnt/ro").call::<ops::Write>(header(1), write).await.unwrap();
    assert_eq!(result, Err(libc::EROFS));
    assert_eq!(backend.request_count(), 0);

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn drain_timeout_cancels_stuck_workers() {
    let backend = SimulatedBackend::start(|_| {
        BackendReply::ok(Vec::new()).delayed(Duration::from_secs(30))
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let settings = ManagerSettings {
        encoding: WireEncoding::Raw,
        drain_timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let manager = manager(&mounter, settings, None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();

    let stuck = mounter.sender("/mnt/gate").call::<ops::Read>(header(1), read(1));
    wait_for_requests(&backend, 1).await;

    let started = Instant::now();
    manager.unmount(Path::new("/mnt/gate")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stuck.await.unwrap(), Err(libc::EINTR));
}

#[logged_tokio_test]
async fn request_timeout_is_etimedout() {
    let backend = SimulatedBackend::start(|_| {
        BackendReply::ok(Vec::new()).delayed(Duration::from_secs(30))
    })
    .await
    .unwrap();

    let mounter = Arc::new(ChannelMounter::default());
    let settings = ManagerSettings {
        encoding: WireEncoding::Raw,
        request_timeout: Some(Duration::from_millis(100)),
        ..Default::default()
    };
    let manager = manager(&mounter, settings, None);
    manager.mount(MountArgs::new("/mnt/gate", backend.url())).await.unwrap();

    let result = mounter
        .sender("/mnt/gate")
        .call::<ops::Getattr>(header(1), GetattrRequest { inode: 1 })
        .await
        .unwrap();
    assert_eq!(result, Err(libc::ETIMEDOUT));

    manager.shutdown_all().await;
}

#[logged_tokio_test]
async fn saved_mounts_are_restored_by_a_new_process() {
    let dir = tempfile::tempdir().unwrap();
    let table = MountTable::new(dir.path().join("mounts.json"), dir.path().join("mounts.bak"));

    let first = Arc::new(ChannelMounter::default());
    let manager_a = manager(&first, raw_settings(), Some(table.clone()));
    manager_a.mount(MountArgs::new("/mnt/a", "http://127.0.0.1:1")).await.unwrap();
    manager_a.mount(MountArgs::new("/mnt/b", "http://127.0.0.1:2")).await.unwrap();
    manager_a.shutdown_all().await;
    assert_eq!(table.load().unwrap().len(), 2);

    let second = Arc::new(ChannelMounter::default());
    let manager_b = manager(&second, raw_settings(), Some(table.clone()));
    assert_eq!(manager_b.restore().await.unwrap(), 2);

    let mounted: Vec<_> = manager_b.mounts().into_iter().map(|m| m.args.mount_point).collect();
    assert_eq!(mounted, vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/b")]);
    // A stale detach is attempted before each mount.
    assert_eq!(second.unmounts().len(), 2);
    assert!(manager_b.connection(Path::new("/mnt/b")).is_some());
    assert_eq!(table.load().unwrap().len(), 2);
    manager_b.shutdown_all().await;
}
