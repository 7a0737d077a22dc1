mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::{TAG, pack, write_package};
use tempfile::TempDir;

fn extract(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_extract"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run extract")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn missing_package_argument_exits_with_one() {
    let output = extract(&[]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn blocked_entry_is_reported_but_exits_with_zero() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let bytes = pack(
        TAG,
        &[
            ("a.bin", &b"aaaa"[..]),
            ("blocker/x.bin", &b"xxxx"[..]),
            ("c.bin", &b"cccc"[..]),
        ],
    );
    let path = write_package(temp.path(), "partial.mpkg", &bytes);
    let root = temp.path().join("partial");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("blocker"), b"in the way").unwrap();

    let output = extract(&[&path]);

    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    assert!(stdout(&output).contains("failed to extract blocker/x.bin"));
    assert_eq!(std::fs::read(root.join("a.bin")).unwrap(), b"aaaa");
    assert_eq!(std::fs::read(root.join("c.bin")).unwrap(), b"cccc");
}

#[test]
fn tag_mismatch_exits_with_one_and_writes_nothing() {
    let temp = TempDir::new().expect("failed to create temp dir");
    let bytes = pack(b"XXXX0000", &[("a.bin", &b"aaaa"[..])]);
    let path = write_package(temp.path(), "foreign.mpkg", &bytes);

    let output = extract(&[&path]);

    assert_eq!(output.status.code(), Some(1));
    let printed = stdout(&output);
    assert!(printed.contains("PKGM0014"), "{}", printed);
    assert!(printed.contains("XXXX0000"), "{}", printed);
    assert!(!temp.path().join("foreign").exists());
}
