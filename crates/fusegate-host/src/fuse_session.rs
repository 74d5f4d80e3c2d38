// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Kernel sessions backed by `fuser`
//!
//! [`FuserMounter`] mounts a [`KernelBridge`] with `fuser::spawn_mount2`.
//! The bridge runs on fuser's session thread and never waits for the
//! backend: each callback becomes a typed [`Call`] on a [`ChannelSession`]
//! whose reply closure answers the fuser reply object. `init` is the only
//! callback that blocks, since fuser needs its answer synchronously.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use async_trait::async_trait;
use fuser::{
    BackgroundSession, FileAttr, FileType, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyIoctl, ReplyOpen, ReplyStatfs, ReplyWrite,
    ReplyXattr, Request, TimeOrNow,
};
use fusegate_proto::{
    ops, AccessRequest, Attr, CreateRequest, EntryResponse, FlushRequest, ForgetRequest,
    FsyncRequest, GetattrRequest, GetxattrRequest, InitRequest, LinkRequest, ListxattrRequest,
    LookupRequest, MkdirRequest, MknodRequest, NoBody, OpenRequest, Operation, ReadRequest,
    ReadlinkRequest, ReleaseRequest, RemoveRequest, RemovexattrRequest, RenameRequest,
    SetattrRequest, SetxattrRequest, SymlinkRequest, WriteRequest,
};
use libc::c_int;
use tracing::{debug, info, warn};

use crate::attr::{
    ns_from_system_time, parse_dirents, permissions, setattr_valid, system_time_from_ns,
    ttl_from_ns, NodeKind, RELEASE_FLUSH,
};
use crate::kernel::{
    Call, ChannelSession, KernelRequest, KernelSession, Reply, RequestHeader, SessionSender,
};
use crate::manager::{Mounter, SessionError};
use crate::mount::{AllowMode, MountArgs};

/// Protocol version fuser negotiates with the `abi-7-40` feature.
const KERNEL_ABI: (u32, u32) = (7, 40);

/// Bytes requested from the backend per directory read.
const READDIR_CHUNK: u32 = 4096;

const DEFAULT_FSNAME: &str = "fusegate";

/// Mounts through `fuser` and keeps each background session until unmount.
#[derive(Default)]
pub struct FuserMounter {
    sessions: Mutex<HashMap<PathBuf, BackgroundSession>>,
}

impl FuserMounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<PathBuf, BackgroundSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn mount_options(args: &MountArgs) -> Result<Vec<MountOption>, SessionError> {
    let fsname = if args.fsname.is_empty() {
        DEFAULT_FSNAME.to_string()
    } else {
        args.fsname.clone()
    };
    let mut options = vec![MountOption::FSName(fsname)];
    if !args.subtype.is_empty() {
        options.push(MountOption::Subtype(args.subtype.clone()));
    }
    match args.allow_mode()? {
        AllowMode::Owner => {}
        AllowMode::Root => options.push(MountOption::AllowRoot),
        AllowMode::Other => options.push(MountOption::AllowOther),
    }
    if args.is_readonly() {
        options.push(MountOption::RO);
    }
    Ok(options)
}

#[async_trait]
impl Mounter for FuserMounter {
    async fn mount(&self, args: &MountArgs) -> Result<Box<dyn KernelSession>, SessionError> {
        let options = mount_options(args)?;
        let (sender, session) = ChannelSession::pair();
        let bridge = KernelBridge::new(sender);

        let mount_point = args.mount_point.clone();
        let mount_error = |reason: String| SessionError::Mount {
            mount_point: args.mount_point.clone(),
            reason,
        };
        let background = tokio::task::spawn_blocking(move || {
            fuser::spawn_mount2(bridge, &mount_point, &options)
        })
        .await
        .map_err(|err| mount_error(err.to_string()))?
        .map_err(|err| mount_error(err.to_string()))?;

        info!(operation = "fuse_mount", mount_point = %args.mount_point.display());
        self.sessions().insert(args.mount_point.clone(), background);
        Ok(Box::new(session))
    }

    async fn unmount(&self, mount_point: &Path) -> Result<(), SessionError> {
        let unmount_error = |reason: String| SessionError::Unmount {
            mount_point: mount_point.to_path_buf(),
            reason,
        };

        let background = self.sessions().remove(mount_point);
        match background {
            Some(background) => {
                tokio::task::spawn_blocking(move || background.join())
                    .await
                    .map_err(|err| unmount_error(err.to_string()))?;
                info!(operation = "fuse_unmount", mount_point = %mount_point.display());
                Ok(())
            }
            // Not ours: a mount left behind by an earlier process.
            None => {
                let status = tokio::process::Command::new("fusermount")
                    .arg("-u")
                    .arg(mount_point)
                    .status()
                    .await
                    .map_err(|err| unmount_error(err.to_string()))?;
                if status.success() {
                    info!(operation = "fuse_unmount_stale", mount_point = %mount_point.display());
                    Ok(())
                } else {
                    Err(unmount_error(format!("fusermount exited with {}", status)))
                }
            }
        }
    }
}

/// `fuser::Filesystem` that forwards every callback to a [`ChannelSession`].
pub struct KernelBridge {
    sender: SessionSender,
}

impl KernelBridge {
    pub fn new(sender: SessionSender) -> Self {
        Self { sender }
    }

    fn submit<Op: Operation>(
        &self,
        req: &Request<'_>,
        request: Op::Request,
        respond: impl FnOnce(Result<Op::Response, c_int>) + Send + 'static,
    ) where
        KernelRequest: From<Call<Op>>,
    {
        let call = Call::<Op> {
            header: header(req),
            request,
            reply: Reply::new(respond),
        };
        // A closed session drops the call, which answers EIO.
        if !self.sender.send(KernelRequest::from(call)) {
            debug!(operation = "bridge_closed", kind = %Op::KIND, "session closed");
        }
    }

    fn unsupported(&self, req: &Request<'_>, opcode: &str, respond: impl FnOnce(c_int) + Send + 'static) {
        let reply = Reply::<NoBody>::new(move |result| respond(result.err().unwrap_or(libc::ENOSYS)));
        self.sender.send(KernelRequest::Unsupported {
            header: header(req),
            opcode: opcode.to_string(),
            reply,
        });
    }
}

fn header(req: &Request<'_>) -> RequestHeader {
    RequestHeader {
        unique: req.unique(),
        uid: req.uid(),
        gid: req.gid(),
        pid: req.pid(),
    }
}

fn file_type(kind: NodeKind) -> FileType {
    match kind {
        NodeKind::NamedPipe => FileType::NamedPipe,
        NodeKind::CharDevice => FileType::CharDevice,
        NodeKind::BlockDevice => FileType::BlockDevice,
        NodeKind::Directory => FileType::Directory,
        NodeKind::RegularFile => FileType::RegularFile,
        NodeKind::Symlink => FileType::Symlink,
        NodeKind::Socket => FileType::Socket,
    }
}

fn file_attr(attr: &Attr) -> FileAttr {
    FileAttr {
        ino: attr.inode,
        size: attr.size,
        blocks: attr.blocks,
        atime: system_time_from_ns(attr.atime_ns),
        mtime: system_time_from_ns(attr.mtime_ns),
        ctime: system_time_from_ns(attr.ctime_ns),
        crtime: system_time_from_ns(attr.crtime_ns),
        kind: file_type(NodeKind::from_mode(attr.mode)),
        perm: permissions(attr),
        nlink: attr.nlink,
        uid: attr.uid,
        gid: attr.gid,
        rdev: attr.rdev,
        blksize: attr.blksize,
        flags: attr.flags,
    }
}

fn reply_entry(reply: ReplyEntry, result: Result<EntryResponse, c_int>) {
    match result {
        Ok(entry) => {
            let attr = FileAttr {
                ino: entry.inode,
                ..file_attr(&entry.attr)
            };
            reply.entry(&ttl_from_ns(entry.entry_valid_ns), &attr, entry.generation);
        }
        Err(errno) => reply.error(errno),
    }
}

fn reply_empty(reply: ReplyEmpty, result: Result<NoBody, c_int>) {
    match result {
        Ok(_) => reply.ok(),
        Err(errno) => reply.error(errno),
    }
}

/// `size == 0` asks for the length only.
fn reply_xattr(reply: ReplyXattr, size: u32, data: &[u8]) {
    if size == 0 {
        reply.size(data.len() as u32);
    } else if data.len() > size as usize {
        reply.error(libc::ERANGE);
    } else {
        reply.data(data);
    }
}

fn time_or_now(time: TimeOrNow) -> (i64, bool) {
    match time {
        TimeOrNow::SpecificTime(time) => (ns_from_system_time(time), false),
        TimeOrNow::Now => (ns_from_system_time(SystemTime::now()), true),
    }
}

macro_rules! utf8_or_reply {
    ($name:expr, $reply:expr) => {
        match $name.to_str() {
            Some(name) => name.to_string(),
            None => {
                $reply.error(libc::EINVAL);
                return;
            }
        }
    };
}

impl fuser::Filesystem for KernelBridge {
    fn init(&mut self, req: &Request<'_>, config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        let (call, rx) = Call::<ops::Init>::new(
            header(req),
            InitRequest {
                major: KERNEL_ABI.0,
                minor: KERNEL_ABI.1,
                max_readahead: 0,
                flags: 0,
            },
        );
        self.sender.send(KernelRequest::from(call));

        let response = rx.blocking_recv().unwrap_or(Err(libc::EIO))?;
        if response.max_readahead > 0 {
            if let Err(nearest) = config.set_max_readahead(response.max_readahead) {
                warn!(operation = "fuse_init", requested = response.max_readahead, nearest, "max_readahead clamped");
                let _ = config.set_max_readahead(nearest);
            }
        }
        if response.max_write > 0 {
            if let Err(nearest) = config.set_max_write(response.max_write) {
                warn!(operation = "fuse_init", requested = response.max_write, nearest, "max_write clamped");
                let _ = config.set_max_write(nearest);
            }
        }
        info!(operation = "fuse_init", max_write = response.max_write, "kernel session initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        let (call, _rx) = Call::<ops::Destroy>::new(RequestHeader::default(), NoBody {});
        self.sender.send(KernelRequest::from(call));
    }

    fn forget(&mut self, req: &Request<'_>, ino: u64, nlookup: u64) {
        self.submit::<ops::Forget>(req, ForgetRequest { inode: ino, nlookup }, |_| {});
    }

    fn statfs(&mut self, req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        self.submit::<ops::Statfs>(req, NoBody {}, move |result| match result {
            Ok(st) => reply.statfs(
                st.blocks, st.bfree, st.bavail, st.files, st.ffree, st.bsize, st.namelen, st.frsize,
            ),
            Err(errno) => reply.error(errno),
        });
    }

    fn access(&mut self, req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let request = AccessRequest {
            inode: ino,
            mask: mask as u32,
        };
        self.submit::<ops::Access>(req, request, move |result| reply_empty(reply, result));
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        self.submit::<ops::Getattr>(req, GetattrRequest { inode: ino }, move |result| match result {
            Ok(resp) => reply.attr(&ttl_from_ns(resp.attr.valid_ns), &file_attr(&resp.attr)),
            Err(errno) => reply.error(errno),
        });
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        crtime: Option<SystemTime>,
        chgtime: Option<SystemTime>,
        bkuptime: Option<SystemTime>,
        flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        use setattr_valid as valid;

        let mut request = SetattrRequest::default();
        if let Some(mode) = mode {
            request.valid |= valid::MODE;
            request.mode = mode;
        }
        if let Some(uid) = uid {
            request.valid |= valid::UID;
            request.uid = uid;
        }
        if let Some(gid) = gid {
            request.valid |= valid::GID;
            request.gid = gid;
        }
        if let Some(size) = size {
            request.valid |= valid::SIZE;
            request.size = size;
        }
        if let Some(atime) = atime {
            let (ns, now) = time_or_now(atime);
            request.valid |= valid::ATIME | if now { valid::ATIME_NOW } else { 0 };
            request.atime_ns = ns;
        }
        if let Some(mtime) = mtime {
            let (ns, now) = time_or_now(mtime);
            request.valid |= valid::MTIME | if now { valid::MTIME_NOW } else { 0 };
            request.mtime_ns = ns;
        }
        if let Some(fh) = fh {
            request.valid |= valid::HANDLE;
            request.handle = fh;
        }
        if let Some(crtime) = crtime {
            request.valid |= valid::CRTIME;
            request.crtime_ns = ns_from_system_time(crtime);
        }
        if let Some(chgtime) = chgtime {
            request.valid |= valid::CHGTIME;
            request.chgtime_ns = ns_from_system_time(chgtime);
        }
        if let Some(bkuptime) = bkuptime {
            request.valid |= valid::BKUPTIME;
            request.bkuptime_ns = ns_from_system_time(bkuptime);
        }
        if let Some(flags) = flags {
            request.valid |= valid::FLAGS;
            request.flags = flags;
        }

        self.submit::<ops::Setattr>(req, request, move |result| match result {
            Ok(resp) => reply.attr(&ttl_from_ns(resp.attr.valid_ns), &file_attr(&resp.attr)),
            Err(errno) => reply.error(errno),
        });
    }

    fn listxattr(&mut self, req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let request = ListxattrRequest {
            inode: ino,
            size,
            position: 0,
        };
        self.submit::<ops::Listxattr>(req, request, move |result| match result {
            Ok(resp) => reply_xattr(reply, size, &resp.names),
            Err(errno) => reply.error(errno),
        });
    }

    fn getxattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let name = utf8_or_reply!(name, reply);
        let request = GetxattrRequest {
            inode: ino,
            size,
            position: 0,
            name,
        };
        self.submit::<ops::Getxattr>(req, request, move |result| match result {
            Ok(resp) => reply_xattr(reply, size, &resp.value),
            Err(errno) => reply.error(errno),
        });
    }

    fn setxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
        position: u32,
        reply: ReplyEmpty,
    ) {
        let name = utf8_or_reply!(name, reply);
        let request = SetxattrRequest {
            inode: ino,
            flags: flags as u32,
            position,
            name,
            value: value.to_vec(),
        };
        self.submit::<ops::Setxattr>(req, request, move |result| reply_empty(reply, result));
    }

    fn removexattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = utf8_or_reply!(name, reply);
        let request = RemovexattrRequest { inode: ino, name };
        self.submit::<ops::Removexattr>(req, request, move |result| reply_empty(reply, result));
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let name = utf8_or_reply!(name, reply);
        let request = LookupRequest {
            inode: parent,
            name,
        };
        self.submit::<ops::Lookup>(req, request, move |result| reply_entry(reply, result));
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let request = OpenRequest {
            inode: ino,
            flags: flags as u32,
            dir: false,
        };
        self.submit::<ops::Open>(req, request, move |result| match result {
            Ok(resp) => reply.opened(resp.handle, resp.flags),
            Err(errno) => reply.error(errno),
        });
    }

    fn opendir(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let request = OpenRequest {
            inode: ino,
            flags: flags as u32,
            dir: true,
        };
        self.submit::<ops::Open>(req, request, move |result| match result {
            Ok(resp) => reply.opened(resp.handle, resp.flags),
            Err(errno) => reply.error(errno),
        });
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let name = utf8_or_reply!(name, reply);
        let request = CreateRequest {
            inode: parent,
            flags: flags as u32,
            mode: mode & !umask,
            name,
        };
        self.submit::<ops::Create>(req, request, move |result| match result {
            Ok(resp) => {
                let attr = FileAttr {
                    ino: resp.entry.inode,
                    ..file_attr(&resp.entry.attr)
                };
                reply.created(
                    &ttl_from_ns(resp.entry.entry_valid_ns),
                    &attr,
                    resp.entry.generation,
                    resp.handle,
                    resp.open_flags,
                );
            }
            Err(errno) => reply.error(errno),
        });
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let name = utf8_or_reply!(name, reply);
        let request = MkdirRequest {
            inode: parent,
            mode: mode & !umask,
            name,
        };
        self.submit::<ops::Mkdir>(req, request, move |result| reply_entry(reply, result));
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let new_name = utf8_or_reply!(link_name, reply);
        let target = utf8_or_reply!(target.as_os_str(), reply);
        let request = SymlinkRequest {
            inode: parent,
            new_name,
            target,
        };
        self.submit::<ops::Symlink>(req, request, move |result| reply_entry(reply, result));
    }

    fn readlink(&mut self, req: &Request<'_>, ino: u64, reply: ReplyData) {
        self.submit::<ops::Readlink>(req, ReadlinkRequest { inode: ino }, move |result| match result {
            Ok(resp) => reply.data(resp.target.as_bytes()),
            Err(errno) => reply.error(errno),
        });
    }

    fn link(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let new_name = utf8_or_reply!(newname, reply);
        let request = LinkRequest {
            inode: newparent,
            old_inode: ino,
            new_name,
        };
        self.submit::<ops::Link>(req, request, move |result| reply_entry(reply, result));
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        let name = utf8_or_reply!(name, reply);
        let request = MknodRequest {
            inode: parent,
            mode: mode & !umask,
            rdev,
            name,
        };
        self.submit::<ops::Mknod>(req, request, move |result| reply_entry(reply, result));
    }

    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let old_name = utf8_or_reply!(name, reply);
        let new_name = utf8_or_reply!(newname, reply);
        let request = RenameRequest {
            inode: parent,
            new_dir_inode: newparent,
            old_name,
            new_name,
        };
        self.submit::<ops::Rename>(req, request, move |result| reply_empty(reply, result));
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = utf8_or_reply!(name, reply);
        let request = RemoveRequest {
            inode: parent,
            dir: false,
            name,
        };
        self.submit::<ops::Remove>(req, request, move |result| reply_empty(reply, result));
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let name = utf8_or_reply!(name, reply);
        let request = RemoveRequest {
            inode: parent,
            dir: true,
            name,
        };
        self.submit::<ops::Remove>(req, request, move |result| reply_empty(reply, result));
    }

    fn read(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let request = ReadRequest {
            handle: fh,
            offset,
            size,
            dir: false,
        };
        self.submit::<ops::Read>(req, request, move |result| match result {
            Ok(resp) => reply.data(&resp.data),
            Err(errno) => reply.error(errno),
        });
    }

    fn readdir(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let request = ReadRequest {
            handle: fh,
            offset,
            size: READDIR_CHUNK,
            dir: true,
        };
        self.submit::<ops::Read>(req, request, move |result| match result {
            Ok(resp) => {
                for entry in parse_dirents(&resp.data) {
                    let name = OsStr::from_bytes(&entry.name);
                    if reply.add(entry.inode, entry.offset, file_type(entry.kind), name) {
                        break;
                    }
                }
                reply.ok();
            }
            Err(errno) => reply.error(errno),
        });
    }

    fn write(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let request = WriteRequest {
            handle: fh,
            offset,
            flags: write_flags,
            data: data.to_vec(),
        };
        self.submit::<ops::Write>(req, request, move |result| match result {
            Ok(resp) => reply.written(resp.size),
            Err(errno) => reply.error(errno),
        });
    }

    fn flush(&mut self, req: &Request<'_>, _ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        let request = FlushRequest {
            handle: fh,
            lock_owner,
            flags: 0,
        };
        self.submit::<ops::Flush>(req, request, move |result| reply_empty(reply, result));
    }

    fn fsync(&mut self, req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let request = FsyncRequest {
            handle: fh,
            flags: u32::from(datasync),
            dir: false,
        };
        self.submit::<ops::Fsync>(req, request, move |result| reply_empty(reply, result));
    }

    fn fsyncdir(&mut self, req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let request = FsyncRequest {
            handle: fh,
            flags: u32::from(datasync),
            dir: true,
        };
        self.submit::<ops::Fsync>(req, request, move |result| reply_empty(reply, result));
    }

    fn release(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: ReplyEmpty,
    ) {
        let request = ReleaseRequest {
            handle: fh,
            flags: flags as u32,
            release_flags: if flush { RELEASE_FLUSH } else { 0 },
            lock_owner: lock_owner.unwrap_or(0),
            dir: false,
        };
        self.submit::<ops::Release>(req, request, move |result| reply_empty(reply, result));
    }

    fn releasedir(&mut self, req: &Request<'_>, _ino: u64, fh: u64, flags: i32, reply: ReplyEmpty) {
        let request = ReleaseRequest {
            handle: fh,
            flags: flags as u32,
            release_flags: 0,
            lock_owner: 0,
            dir: true,
        };
        self.submit::<ops::Release>(req, request, move |result| reply_empty(reply, result));
    }

    fn ioctl(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: u32,
        _cmd: u32,
        _in_data: &[u8],
        _out_size: u32,
        reply: ReplyIoctl,
    ) {
        self.unsupported(req, "ioctl", move |errno| reply.error(errno));
    }

    fn fallocate(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _offset: i64,
        _length: i64,
        _mode: i32,
        reply: ReplyEmpty,
    ) {
        self.unsupported(req, "fallocate", move |errno| reply.error(errno));
    }
}
