// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Request and response records exchanged with the backend
//!
//! Field order is wire order. Times are signed nanoseconds since the Unix
//! epoch; durations are unsigned nanoseconds.

use crate::wire_record;

wire_record! {
    /// Payload of operations that carry no body in one direction.
    pub struct NoBody {}
}

wire_record! {
    /// File attributes as returned by getattr, setattr and every entry reply.
    pub struct Attr {
        /// How long the kernel may cache these attributes
        pub valid_ns: u64,
        pub inode: u64,
        pub size: u64,
        pub blocks: u64,
        pub atime_ns: i64,
        pub mtime_ns: i64,
        pub ctime_ns: i64,
        pub crtime_ns: i64,
        /// File type and permission bits (`st_mode`)
        pub mode: u32,
        pub nlink: u32,
        pub uid: u32,
        pub gid: u32,
        pub rdev: u32,
        pub flags: u32,
        pub blksize: u32,
    }
}

wire_record! {
    pub struct InitRequest {
        pub major: u32,
        pub minor: u32,
        pub max_readahead: u32,
        pub flags: u32,
    }
}

wire_record! {
    pub struct InitResponse {
        pub max_readahead: u32,
        pub flags: u32,
        pub max_write: u32,
    }
}

wire_record! {
    pub struct StatfsResponse {
        pub blocks: u64,
        pub bfree: u64,
        pub bavail: u64,
        pub files: u64,
        pub ffree: u64,
        pub bsize: u32,
        pub namelen: u32,
        pub frsize: u32,
    }
}

wire_record! {
    pub struct AccessRequest {
        pub inode: u64,
        pub mask: u32,
    }
}

wire_record! {
    pub struct GetattrRequest {
        pub inode: u64,
    }
}

wire_record! {
    pub struct AttrResponse {
        pub attr: Attr,
    }
}

wire_record! {
    /// Only the attributes selected by `valid` are meaningful.
    pub struct SetattrRequest {
        pub valid: u32,
        pub handle: u64,
        pub size: u64,
        pub atime_ns: i64,
        pub mtime_ns: i64,
        pub mode: u32,
        pub uid: u32,
        pub gid: u32,
        pub bkuptime_ns: i64,
        pub chgtime_ns: i64,
        pub crtime_ns: i64,
        pub flags: u32,
    }
}

wire_record! {
    pub struct ListxattrRequest {
        pub inode: u64,
        pub size: u32,
        pub position: u32,
    }
}

wire_record! {
    /// NUL-separated attribute names.
    pub struct ListxattrResponse {
        pub names: Vec<u8>,
    }
}

wire_record! {
    pub struct GetxattrRequest {
        pub inode: u64,
        pub size: u32,
        pub position: u32,
        pub name: String,
    }
}

wire_record! {
    pub struct GetxattrResponse {
        pub value: Vec<u8>,
    }
}

wire_record! {
    pub struct SetxattrRequest {
        pub inode: u64,
        pub flags: u32,
        pub position: u32,
        pub name: String,
        pub value: Vec<u8>,
    }
}

wire_record! {
    pub struct RemovexattrRequest {
        pub inode: u64,
        pub name: String,
    }
}

wire_record! {
    /// Lookup of `name` in directory `inode`.
    pub struct LookupRequest {
        pub inode: u64,
        pub name: String,
    }
}

wire_record! {
    /// A directory entry; the reply of lookup, mkdir, symlink, link and mknod.
    pub struct EntryResponse {
        pub inode: u64,
        pub generation: u64,
        pub entry_valid_ns: u64,
        pub attr: Attr,
    }
}

wire_record! {
    pub struct OpenRequest {
        pub inode: u64,
        pub flags: u32,
        pub dir: bool,
    }
}

wire_record! {
    pub struct OpenResponse {
        pub handle: u64,
        pub flags: u32,
    }
}

wire_record! {
    pub struct CreateRequest {
        pub inode: u64,
        pub flags: u32,
        pub mode: u32,
        pub name: String,
    }
}

wire_record! {
    pub struct CreateResponse {
        pub entry: EntryResponse,
        pub handle: u64,
        pub open_flags: u32,
    }
}

wire_record! {
    pub struct MkdirRequest {
        pub inode: u64,
        pub mode: u32,
        pub name: String,
    }
}

wire_record! {
    pub struct SymlinkRequest {
        pub inode: u64,
        pub new_name: String,
        pub target: String,
    }
}

wire_record! {
    pub struct ReadlinkRequest {
        pub inode: u64,
    }
}

wire_record! {
    pub struct ReadlinkResponse {
        pub target: String,
    }
}

wire_record! {
    pub struct LinkRequest {
        pub inode: u64,
        pub old_inode: u64,
        pub new_name: String,
    }
}

wire_record! {
    pub struct MknodRequest {
        pub inode: u64,
        pub mode: u32,
        pub rdev: u32,
        pub name: String,
    }
}

wire_record! {
    pub struct RenameRequest {
        pub inode: u64,
        pub new_dir_inode: u64,
        pub old_name: String,
        pub new_name: String,
    }
}

wire_record! {
    pub struct RemoveRequest {
        pub inode: u64,
        pub dir: bool,
        pub name: String,
    }
}

wire_record! {
    pub struct ReadRequest {
        pub handle: u64,
        pub offset: i64,
        pub size: u32,
        pub dir: bool,
    }
}

wire_record! {
    pub struct ReadResponse {
        pub data: Vec<u8>,
    }
}

wire_record! {
    pub struct WriteRequest {
        pub handle: u64,
        pub offset: i64,
        pub flags: u32,
        pub data: Vec<u8>,
    }
}

wire_record! {
    pub struct WriteResponse {
        pub size: u32,
    }
}

wire_record! {
    pub struct FlushRequest {
        pub handle: u64,
        pub lock_owner: u64,
        pub flags: u32,
    }
}

wire_record! {
    pub struct FsyncRequest {
        pub handle: u64,
        pub flags: u32,
        pub dir: bool,
    }
}

wire_record! {
    pub struct ReleaseRequest {
        pub handle: u64,
        pub flags: u32,
        pub release_flags: u32,
        pub lock_owner: u64,
        pub dir: bool,
    }
}

wire_record! {
    pub struct ForgetRequest {
        pub inode: u64,
        pub nlookup: u64,
    }
}

wire_record! {
    /// Names the in-flight request, by its unique id, that should be abandoned.
    pub struct InterruptRequest {
        pub intr_unique: u64,
    }
}
