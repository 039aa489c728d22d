use std::path::{Path, PathBuf};

use buildlink::codec::{
    decode_build_identity, encode_build_identity, BuildIdentitySerializer, Decoder, Encoder, Serializer,
};
use buildlink::error::BuildlinkError;
use buildlink::identity::{BuildIdentifier, BuildIdentity, ProjectIdentifier, ProjectPath};

/// An identifier written by some other component, canonical or not.
struct Foreign {
    current: bool,
    name: Option<&'static str>,
    root_dir: Option<PathBuf>,
}

impl BuildIdentifier for Foreign {
    fn is_current_build(&self) -> bool {
        self.current
    }
    fn name(&self) -> Option<&str> {
        self.name
    }
    fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }
}

fn write_foreign(value: &Foreign) -> Result<Vec<u8>, BuildlinkError> {
    let mut encoder = Encoder::new(Vec::new());
    BuildIdentitySerializer.write_identifier(&mut encoder, value)?;
    Ok(encoder.into_inner())
}

#[test]
fn current_build_is_a_single_absent_marker() {
    let bytes = encode_build_identity(&BuildIdentity::current()).expect("encode");
    assert_eq!(bytes, vec![0]);
    let decoded = decode_build_identity(&bytes).expect("decode");
    assert_eq!(decoded, BuildIdentity::Current);
    assert!(decoded.is_current_build());
    assert!(decoded.name().is_none());
    assert!(decoded.root_dir().is_none());
}

#[test]
fn named_build_layout() {
    let identity = BuildIdentity::named("lib", "/work/lib").expect("identity");
    let bytes = encode_build_identity(&identity).expect("encode");
    let mut expected = vec![1, 3];
    expected.extend_from_slice(b"lib");
    expected.push(9);
    expected.extend_from_slice(b"/work/lib");
    assert_eq!(bytes, expected);
}

#[test]
fn named_builds_round_trip() {
    let long_name = "n".repeat(300); // length needs a two byte varint
    let cases = [
        ("myBuild", "/repo".to_string()),
        ("ünïcødé build", "/home/dev/Projekte/größe".to_string()),
        (long_name.as_str(), format!("/deep/{}", "d/".repeat(200))),
    ];
    for (name, root) in &cases {
        let identity = BuildIdentity::named(*name, root.as_str()).expect("identity");
        let bytes = encode_build_identity(&identity).expect("encode");
        assert_eq!(decode_build_identity(&bytes).expect("decode"), identity, "round trip of {name}");
    }
}

#[test]
fn consecutive_records_share_one_stream() {
    let first = BuildIdentity::named("a", "/a").expect("identity");
    let second = BuildIdentity::current();
    let third = BuildIdentity::named("c", "/c").expect("identity");
    let mut encoder = Encoder::new(Vec::new());
    for identity in [&first, &second, &third] {
        BuildIdentitySerializer.write(&mut encoder, identity).expect("write");
    }
    let bytes = encoder.into_inner();
    let mut decoder = Decoder::new(bytes.as_slice());
    assert_eq!(BuildIdentitySerializer.read(&mut decoder).expect("first"), first);
    assert_eq!(BuildIdentitySerializer.read(&mut decoder).expect("second"), second);
    assert_eq!(BuildIdentitySerializer.read(&mut decoder).expect("third"), third);
    assert!(matches!(BuildIdentitySerializer.read(&mut decoder), Err(BuildlinkError::MalformedStream(_))));
}

#[test]
fn current_build_with_a_name_is_rejected() {
    let err = write_foreign(&Foreign { current: true, name: Some("oops"), root_dir: None }).unwrap_err();
    assert!(matches!(err, BuildlinkError::InvariantViolation(_)), "got {err:?}");
}

#[test]
fn non_canonical_named_builds_are_rejected() {
    let cases = [
        Foreign { current: false, name: None, root_dir: Some(PathBuf::from("/repo")) },
        Foreign { current: false, name: Some(""), root_dir: Some(PathBuf::from("/repo")) },
        Foreign { current: false, name: Some("b"), root_dir: None },
        Foreign { current: false, name: Some("b"), root_dir: Some(PathBuf::from("relative/dir")) },
        Foreign { current: false, name: Some("b"), root_dir: Some(PathBuf::new()) },
    ];
    for case in &cases {
        let err = write_foreign(case).unwrap_err();
        assert!(matches!(err, BuildlinkError::InvariantViolation(_)), "got {err:?}");
    }
}

#[test]
fn canonical_foreign_identifier_is_accepted() {
    let bytes = write_foreign(&Foreign { current: false, name: Some("x"), root_dir: Some(PathBuf::from("/x")) })
        .expect("encode");
    assert_eq!(
        decode_build_identity(&bytes).expect("decode"),
        BuildIdentity::named("x", "/x").expect("identity")
    );
}

#[test]
fn constructing_invalid_identities_fails() {
    assert!(matches!(BuildIdentity::named("", "/repo"), Err(BuildlinkError::InvariantViolation(_))));
    assert!(matches!(BuildIdentity::named("b", "repo"), Err(BuildlinkError::InvariantViolation(_))));
    assert!(matches!(BuildIdentity::named("b", ""), Err(BuildlinkError::InvariantViolation(_))));
}

#[test]
fn malformed_streams() {
    let cases: Vec<(&str, Vec<u8>)> = vec![
        ("empty", vec![]),
        ("name marker only", vec![1]),
        ("truncated name", vec![1, 5, b'a', b'b']),
        ("name without path", vec![1, 3, b'a', b'b', b'c']),
        ("truncated path", vec![1, 1, b'a', 4, b'/', b'r']),
        ("unknown marker", vec![7]),
        ("invalid utf-8", vec![1, 2, 0xff, 0xfe, 2, b'/', b'x']),
        ("relative path", vec![1, 1, b'a', 3, b'r', b'e', b'l']),
        ("empty name", vec![1, 0, 2, b'/', b'x']),
        ("endless varint", vec![1, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]),
        (
            "varint overflowing 64 bits",
            vec![1, 0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x7e, b'a', 2, b'/', b'x'],
        ),
    ];
    for (label, bytes) in cases {
        let result = decode_build_identity(&bytes);
        assert!(matches!(result, Err(BuildlinkError::MalformedStream(_))), "{label}: got {result:?}");
    }
}

#[test]
fn oversized_strings_are_rejected_before_reading() {
    let identity = BuildIdentity::named("a".repeat(64), "/repo").expect("identity");
    let bytes = encode_build_identity(&identity).expect("encode");
    let mut decoder = Decoder::with_max_string_len(bytes.as_slice(), 16);
    let result = BuildIdentitySerializer.read(&mut decoder);
    assert!(matches!(result, Err(BuildlinkError::MalformedStream(_))), "got {result:?}");
}

#[test]
fn project_paths() {
    let root = ProjectPath::root();
    assert!(root.is_root());
    assert_eq!(root.name(), None);
    assert_eq!(root.parent(), None);

    let sub = root.child("sub1").expect("child");
    assert_eq!(sub.as_str(), ":sub1");
    assert_eq!(sub.parent(), Some(ProjectPath::root()));

    let nested = ProjectPath::parse(":a:b:c").expect("nested");
    assert_eq!(nested.name(), Some("c"));
    assert_eq!(nested.parent().expect("parent").as_str(), ":a:b");

    for invalid in ["", "a", "::", ":a:", "a:b", ":a b"] {
        assert!(
            matches!(ProjectPath::parse(invalid), Err(BuildlinkError::InvalidPayload(_))),
            "'{invalid}' should be rejected"
        );
    }
}

#[test]
fn project_identifier_display() {
    let build = BuildIdentity::named("myBuild", "/repo").expect("identity");
    let id = ProjectIdentifier::new(build.clone(), ProjectPath::parse(":sub1").expect("path"));
    assert_eq!(id.to_string(), "(myBuild, /repo, :sub1)");
    assert_eq!(id.build_identifier(), &build);
}
