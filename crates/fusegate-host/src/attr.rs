// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Conversions between wire timestamps and kernel-facing types.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fusegate_proto::Attr;

/// Signed nanoseconds since the epoch to `SystemTime`.
pub fn system_time_from_ns(ns: i64) -> SystemTime {
    let magnitude = Duration::from_nanos(ns.unsigned_abs());
    if ns >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}

/// Inverse of [`system_time_from_ns`], saturating at the `i64` range.
pub fn ns_from_system_time(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_nanos())
            .map(|ns| -ns)
            .unwrap_or(i64::MIN),
    }
}

pub fn ttl_from_ns(ns: u64) -> Duration {
    Duration::from_nanos(ns)
}

/// Node type encoded in the `S_IFMT` bits of a mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    NamedPipe,
    CharDevice,
    BlockDevice,
    Directory,
    RegularFile,
    Symlink,
    Socket,
}

impl NodeKind {
    pub fn from_mode(mode: u32) -> Self {
        match mode & (libc::S_IFMT as u32) {
            m if m == libc::S_IFIFO as u32 => NodeKind::NamedPipe,
            m if m == libc::S_IFCHR as u32 => NodeKind::CharDevice,
            m if m == libc::S_IFBLK as u32 => NodeKind::BlockDevice,
            m if m == libc::S_IFDIR as u32 => NodeKind::Directory,
            m if m == libc::S_IFLNK as u32 => NodeKind::Symlink,
            m if m == libc::S_IFSOCK as u32 => NodeKind::Socket,
            _ => NodeKind::RegularFile,
        }
    }

    /// `S_IFMT` bits for this kind.
    pub fn mode_bits(self) -> u32 {
        let bits = match self {
            NodeKind::NamedPipe => libc::S_IFIFO,
            NodeKind::CharDevice => libc::S_IFCHR,
            NodeKind::BlockDevice => libc::S_IFBLK,
            NodeKind::Directory => libc::S_IFDIR,
            NodeKind::RegularFile => libc::S_IFREG,
            NodeKind::Symlink => libc::S_IFLNK,
            NodeKind::Socket => libc::S_IFSOCK,
        };
        bits as u32
    }
}

/// Permission bits (including setuid/setgid/sticky) of `attr.mode`.
pub fn permissions(attr: &Attr) -> u16 {
    (attr.mode & 0o7777) as u16
}

/// Bits of `SetattrRequest::valid`, as defined by the FUSE protocol.
pub mod setattr_valid {
    pub const MODE: u32 = 1 << 0;
    pub const UID: u32 = 1 << 1;
    pub const GID: u32 = 1 << 2;
    pub const SIZE: u32 = 1 << 3;
    pub const ATIME: u32 = 1 << 4;
    pub const MTIME: u32 = 1 << 5;
    pub const HANDLE: u32 = 1 << 6;
    pub const ATIME_NOW: u32 = 1 << 7;
    pub const MTIME_NOW: u32 = 1 << 8;
    pub const CTIME: u32 = 1 << 10;
    pub const CRTIME: u32 = 1 << 28;
    pub const CHGTIME: u32 = 1 << 29;
    pub const BKUPTIME: u32 = 1 << 30;
    pub const FLAGS: u32 = 1 << 31;
}

/// `ReleaseRequest::release_flags` bit asking the backend to flush first.
pub const RELEASE_FLUSH: u32 = 1;

const DIRENT_HEADER: usize = 24;

/// One entry of a directory read, in kernel `fuse_dirent` layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dirent {
    pub inode: u64,
    /// Offset of the next entry
    pub offset: i64,
    pub kind: NodeKind,
    pub name: Vec<u8>,
}

impl Dirent {
    /// Append this entry to `buf`, padded to eight bytes.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();
        buf.extend_from_slice(&self.inode.to_le_bytes());
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&(self.name.len() as u32).to_le_bytes());
        buf.extend_from_slice(&(self.kind.mode_bits() >> 12).to_le_bytes());
        buf.extend_from_slice(&self.name);
        let padded = dirent_len(self.name.len());
        buf.resize(start + padded, 0);
    }
}

fn dirent_len(name_len: usize) -> usize {
    (DIRENT_HEADER + name_len + 7) & !7
}

/// Split the data of a directory read into entries.
///
/// Parsing stops at the first truncated or empty-named entry.
pub fn parse_dirents(mut buf: &[u8]) -> Vec<Dirent> {
    let mut entries = Vec::new();
    while buf.len() >= DIRENT_HEADER {
        let word = |at: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[at..at + 8]);
            bytes
        };
        let inode = u64::from_le_bytes(word(0));
        let offset = i64::from_le_bytes(word(8));
        let mut half = [0u8; 4];
        half.copy_from_slice(&buf[16..20]);
        let name_len = u32::from_le_bytes(half) as usize;
        half.copy_from_slice(&buf[20..24]);
        let dtype = u32::from_le_bytes(half);

        if name_len == 0 || buf.len() < DIRENT_HEADER + name_len {
            break;
        }
        entries.push(Dirent {
            inode,
            offset,
            // DT_* values are the S_IFMT bits shifted down by twelve
            kind: NodeKind::from_mode(dtype << 12),
            name: buf[DIRENT_HEADER..DIRENT_HEADER + name_len].to_vec(),
        });
        buf = &buf[dirent_len(name_len).min(buf.len())..];
    }
    entries
}
