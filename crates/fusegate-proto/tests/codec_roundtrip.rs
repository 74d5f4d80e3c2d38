// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use fusegate_proto::*;

fn sample_attr(inode: u64) -> Attr {
    Attr {
        valid_ns: 1_000_000_000,
        inode,
        size: 4096,
        blocks: 8,
        atime_ns: 1_700_000_000_123_456_789,
        mtime_ns: -5,
        ctime_ns: 1_700_000_001_000_000_000,
        crtime_ns: 0,
        mode: 0o100644,
        nlink: 1,
        uid: 1000,
        gid: 1000,
        rdev: 0,
        flags: 0,
        blksize: 4096,
    }
}

fn sample_entry(inode: u64) -> EntryResponse {
    EntryResponse {
        inode,
        generation: 3,
        entry_valid_ns: 500_000_000,
        attr: sample_attr(inode),
    }
}

/// Encode then decode both payloads of `Op` in both encodings.
fn assert_round_trip<Op: Operation>(request: Op::Request, response: Op::Response) {
    let descriptor = descriptor_for(Op::KIND);
    for encoding in [WireEncoding::Raw, WireEncoding::Generic] {
        let body = encoding
            .encode(descriptor.request_layout(), &request)
            .unwrap_or_else(|e| panic!("{} {} request encode: {}", Op::KIND, encoding, e));
        let decoded: Op::Request = encoding
            .decode(descriptor.request_layout(), &body)
            .unwrap_or_else(|e| panic!("{} {} request decode: {}", Op::KIND, encoding, e));
        assert_eq!(decoded, request, "{} {} request", Op::KIND, encoding);

        let body = encoding
            .encode(descriptor.response_layout(), &response)
            .unwrap_or_else(|e| panic!("{} {} response encode: {}", Op::KIND, encoding, e));
        let decoded: Op::Response = encoding
            .decode(descriptor.response_layout(), &body)
            .unwrap_or_else(|e| panic!("{} {} response decode: {}", Op::KIND, encoding, e));
        assert_eq!(decoded, response, "{} {} response", Op::KIND, encoding);
    }
}

#[fusegate_test_utils::logged_test]
fn every_operation_round_trips() {
    assert_round_trip::<ops::Init>(
        InitRequest {
            major: 7,
            minor: 31,
            max_readahead: 131072,
            flags: 0x1,
        },
        InitResponse {
            max_readahead: 65536,
            flags: 0x1,
            max_write: 1 << 20,
        },
    );
    assert_round_trip::<ops::Destroy>(NoBody {}, NoBody {});
    assert_round_trip::<ops::Statfs>(
        NoBody {},
        StatfsResponse {
            blocks: 1000,
            bfree: 900,
            bavail: 800,
            files: 100,
            ffree: 50,
            bsize: 4096,
            namelen: 255,
            frsize: 4096,
        },
    );
    assert_round_trip::<ops::Access>(AccessRequest { inode: 1, mask: 4 }, NoBody {});
    assert_round_trip::<ops::Getattr>(
        GetattrRequest { inode: 42 },
        AttrResponse {
            attr: sample_attr(42),
        },
    );
    assert_round_trip::<ops::Setattr>(
        SetattrRequest {
            valid: 0x8,
            handle: 9,
            size: 10,
            atime_ns: 11,
            mtime_ns: 12,
            mode: 0o755,
            uid: 1,
            gid: 2,
            bkuptime_ns: 0,
            chgtime_ns: 0,
            crtime_ns: -1,
            flags: 0,
        },
        AttrResponse {
            attr: sample_attr(5),
        },
    );
    assert_round_trip::<ops::Listxattr>(
        ListxattrRequest {
            inode: 3,
            size: 256,
            position: 0,
        },
        ListxattrResponse {
            names: b"user.a\0user.b\0".to_vec(),
        },
    );
    assert_round_trip::<ops::Getxattr>(
        GetxattrRequest {
            inode: 3,
            size: 64,
            position: 0,
            name: "user.mime\ntype".into(),
        },
        GetxattrResponse {
            value: vec![0, 10, 92, 255],
        },
    );
    assert_round_trip::<ops::Setxattr>(
        SetxattrRequest {
            inode: 3,
            flags: 1,
            position: 0,
            name: "user.a\\b".into(),
            value: b"c\nd\\".to_vec(),
        },
        NoBody {},
    );
    assert_round_trip::<ops::Removexattr>(
        RemovexattrRequest {
            inode: 3,
            name: "user.a".into(),
        },
        NoBody {},
    );
    assert_round_trip::<ops::Lookup>(
        LookupRequest {
            inode: 1,
            name: "hello.txt".into(),
        },
        sample_entry(2),
    );
    assert_round_trip::<ops::Open>(
        OpenRequest {
            inode: 2,
            flags: 0o2,
            dir: false,
        },
        OpenResponse {
            handle: 77,
            flags: 1,
        },
    );
    assert_round_trip::<ops::Create>(
        CreateRequest {
            inode: 1,
            flags: 0o101,
            mode: 0o644,
            name: "new".into(),
        },
        CreateResponse {
            entry: sample_entry(10),
            handle: 78,
            open_flags: 2,
        },
    );
    assert_round_trip::<ops::Mkdir>(
        MkdirRequest {
            inode: 1,
            mode: 0o755,
            name: "dir".into(),
        },
        sample_entry(11),
    );
    assert_round_trip::<ops::Symlink>(
        SymlinkRequest {
            inode: 1,
            new_name: "link".into(),
            target: "../some\\where\nelse".into(),
        },
        sample_entry(12),
    );
    assert_round_trip::<ops::Readlink>(
        ReadlinkRequest { inode: 12 },
        ReadlinkResponse {
            target: "../target".into(),
        },
    );
    assert_round_trip::<ops::Link>(
        LinkRequest {
            inode: 1,
            old_inode: 2,
            new_name: "hard".into(),
        },
        sample_entry(2),
    );
    assert_round_trip::<ops::Mknod>(
        MknodRequest {
            inode: 1,
            mode: 0o20644,
            rdev: 0x0103,
            name: "null".into(),
        },
        sample_entry(13),
    );
    assert_round_trip::<ops::Rename>(
        RenameRequest {
            inode: 1,
            new_dir_inode: 4,
            old_name: "a\\b".into(),
            new_name: "c\nd".into(),
        },
        NoBody {},
    );
    assert_round_trip::<ops::Remove>(
        RemoveRequest {
            inode: 1,
            dir: true,
            name: "dir".into(),
        },
        NoBody {},
    );
    assert_round_trip::<ops::Read>(
        ReadRequest {
            handle: 77,
            offset: 8192,
            size: 4096,
            dir: false,
        },
        ReadResponse {
            data: (0..=255).collect(),
        },
    );
    assert_round_trip::<ops::Write>(
        WriteRequest {
            handle: 77,
            offset: 0,
            flags: 0,
            data: b"payload\nwith newline".to_vec(),
        },
        WriteResponse { size: 20 },
    );
    assert_round_trip::<ops::Flush>(
        FlushRequest {
            handle: 77,
            lock_owner: 0xdead_beef,
            flags: 0,
        },
        NoBody {},
    );
    assert_round_trip::<ops::Fsync>(
        FsyncRequest {
            handle: 77,
            flags: 1,
            dir: false,
        },
        NoBody {},
    );
    assert_round_trip::<ops::Release>(
        ReleaseRequest {
            handle: 77,
            flags: 0,
            release_flags: 1,
            lock_owner: 5,
            dir: false,
        },
        NoBody {},
    );
    assert_round_trip::<ops::Forget>(
        ForgetRequest {
            inode: 2,
            nlookup: 3,
        },
        NoBody {},
    );
    assert_round_trip::<ops::Interrupt>(InterruptRequest { intr_unique: 99 }, NoBody {});
}

#[fusegate_test_utils::logged_test]
fn escaped_pair_survives_raw_rename() {
    let descriptor = descriptor_for(OperationKind::Rename);
    let layout = descriptor.request_layout();
    assert_eq!(layout.shape(), LayoutShape::Delimited);

    let request = RenameRequest {
        inode: 1,
        new_dir_inode: 1,
        old_name: "a\\b".into(),
        new_name: "c\nd".into(),
    };
    let body = WireEncoding::Raw.encode(layout, &request).unwrap();
    assert_eq!(&body[16..], b"a\\\\b\nc\\nd\n");

    let decoded: RenameRequest = WireEncoding::Raw.decode(layout, &body).unwrap();
    assert_eq!(decoded.old_name, "a\\b");
    assert_eq!(decoded.new_name, "c\nd");
}

#[fusegate_test_utils::logged_test]
fn attr_reply_decodes_bit_for_bit() {
    let layout = descriptor_for(OperationKind::Getattr).response_layout();
    let attr = sample_attr(42);

    let mut body = Vec::new();
    body.extend_from_slice(&attr.valid_ns.to_le_bytes());
    body.extend_from_slice(&attr.inode.to_le_bytes());
    body.extend_from_slice(&attr.size.to_le_bytes());
    body.extend_from_slice(&attr.blocks.to_le_bytes());
    body.extend_from_slice(&attr.atime_ns.to_le_bytes());
    body.extend_from_slice(&attr.mtime_ns.to_le_bytes());
    body.extend_from_slice(&attr.ctime_ns.to_le_bytes());
    body.extend_from_slice(&attr.crtime_ns.to_le_bytes());
    for word in [
        attr.mode,
        attr.nlink,
        attr.uid,
        attr.gid,
        attr.rdev,
        attr.flags,
        attr.blksize,
    ] {
        body.extend_from_slice(&word.to_le_bytes());
    }

    let decoded: AttrResponse = WireEncoding::Raw.decode(layout, &body).unwrap();
    assert_eq!(decoded.attr, attr);

    let short = &body[..body.len() - 1];
    assert_eq!(
        WireEncoding::Raw.decode::<AttrResponse>(layout, short),
        Err(CodecError::ShortRead {
            expected: 92,
            actual: 91
        })
    );

    let mut padded = body.clone();
    padded.push(0);
    let decoded: AttrResponse = WireEncoding::Raw.decode(layout, &padded).unwrap();
    assert_eq!(decoded.attr, attr);
}
