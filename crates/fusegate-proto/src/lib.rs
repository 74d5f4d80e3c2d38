// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! fusegate protocol: operation registry and wire codecs
//!
//! This crate owns the closed table of filesystem operations the gateway
//! forwards, the typed request/response records for each of them, and the
//! two wire encodings (structured JSON and the raw fixed-prefix layout).

/// Invoke `$callback!` with the full operation table.
///
/// Each entry is `Variant => "name" (RequestType, ResponseType)`. The
/// registry, the kind enum and the kernel-facing request enum in
/// `fusegate-host` are all generated from this single list.
#[macro_export]
macro_rules! for_each_operation {
    ($callback:ident) => {
        $callback! {
            Init => "init" ($crate::messages::InitRequest, $crate::messages::InitResponse),
            Destroy => "destroy" ($crate::messages::NoBody, $crate::messages::NoBody),
            Statfs => "statfs" ($crate::messages::NoBody, $crate::messages::StatfsResponse),
            Access => "access" ($crate::messages::AccessRequest, $crate::messages::NoBody),
            Getattr => "getattr" ($crate::messages::GetattrRequest, $crate::messages::AttrResponse),
            Setattr => "setattr" ($crate::messages::SetattrRequest, $crate::messages::AttrResponse),
            Listxattr => "listxattr" ($crate::messages::ListxattrRequest, $crate::messages::ListxattrResponse),
            Getxattr => "getxattr" ($crate::messages::GetxattrRequest, $crate::messages::GetxattrResponse),
            Setxattr => "setxattr" ($crate::messages::SetxattrRequest, $crate::messages::NoBody),
            Removexattr => "removexattr" ($crate::messages::RemovexattrRequest, $crate::messages::NoBody),
            Lookup => "lookup" ($crate::messages::LookupRequest, $crate::messages::EntryResponse),
            Open => "open" ($crate::messages::OpenRequest, $crate::messages::OpenResponse),
            Create => "create" ($crate::messages::CreateRequest, $crate::messages::CreateResponse),
            Mkdir => "mkdir" ($crate::messages::MkdirRequest, $crate::messages::EntryResponse),
            Symlink => "symlink" ($crate::messages::SymlinkRequest, $crate::messages::EntryResponse),
            Readlink => "readlink" ($crate::messages::ReadlinkRequest, $crate::messages::ReadlinkResponse),
            Link => "link" ($crate::messages::LinkRequest, $crate::messages::EntryResponse),
            Mknod => "mknod" ($crate::messages::MknodRequest, $crate::messages::EntryResponse),
            Rename => "rename" ($crate::messages::RenameRequest, $crate::messages::NoBody),
            Remove => "remove" ($crate::messages::RemoveRequest, $crate::messages::NoBody),
            Read => "read" ($crate::messages::ReadRequest, $crate::messages::ReadResponse),
            Write => "write" ($crate::messages::WriteRequest, $crate::messages::WriteResponse),
            Flush => "flush" ($crate::messages::FlushRequest, $crate::messages::NoBody),
            Fsync => "fsync" ($crate::messages::FsyncRequest, $crate::messages::NoBody),
            Release => "release" ($crate::messages::ReleaseRequest, $crate::messages::NoBody),
            Forget => "forget" ($crate::messages::ForgetRequest, $crate::messages::NoBody),
            Interrupt => "interrupt" ($crate::messages::InterruptRequest, $crate::messages::NoBody),
        }
    };
}

pub mod codec;
pub mod error;
pub mod escape;
pub mod kind;
pub mod layout;
pub mod messages;
pub mod raw;
pub mod record;
pub mod registry;

pub use codec::{ErrorBody, WireEncoding, GENERIC_CONTENT_TYPE, RAW_CONTENT_TYPE};
pub use error::{CodecError, LayoutError};
pub use kind::OperationKind;
pub use layout::{FieldLayout, FieldSpec, FieldType, LayoutShape};
pub use messages::*;
pub use record::{FieldReader, FieldValue, WireField, WireRecord};
pub use registry::{
    descriptor_for, ops, Operation, OperationDescriptor, Payload, Registry, RegistryEntry,
};
