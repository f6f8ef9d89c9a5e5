//! `notcmp` binary behaviour: exit codes, object files, listings.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn notcmp() -> Command {
    Command::new(env!("CARGO_BIN_EXE_notcmp"))
}

#[test]
fn compiles_to_raw_binary() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tune.not");
    let object = temp.path().join("tune.bin");
    fs::write(&source, " TPO 60 NVC 2 ACT 1,2 END\n").unwrap();

    let output = notcmp()
        .args([
            source.to_str().unwrap(),
            "-o",
            object.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run notcmp");

    assert!(
        output.status.success(),
        "notcmp failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        fs::read(&object).unwrap(),
        [0x10, 0x3C, 0x50, 0x02, 0x90, 0x00, 0x90, 0x01, 0x00]
    );
}

#[test]
fn writes_intel_hex_with_base_address() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tune.not");
    let object = temp.path().join("tune.hex");
    fs::write(&source, " NVC 1 ACT 1 END\n").unwrap();

    let output = notcmp()
        .args([
            source.to_str().unwrap(),
            "-o",
            object.to_str().unwrap(),
            "-f",
            "ihex",
            "-a",
            "0x0100",
        ])
        .output()
        .expect("failed to run notcmp");

    assert!(output.status.success());
    let text = fs::read_to_string(&object).unwrap();
    assert!(text.starts_with(":05010000"), "got: {text}");
    assert!(text.ends_with(":00000001FF\n"));
}

#[test]
fn errors_leave_no_object_file() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("bad.not");
    let object = temp.path().join("bad.bin");
    fs::write(&source, " ESB\n END\n").unwrap();

    let output = notcmp()
        .args([source.to_str().unwrap(), "-o", object.to_str().unwrap()])
        .output()
        .expect("failed to run notcmp");

    assert!(!output.status.success());
    assert!(!object.exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ESB without SUB"), "stderr: {stderr}");
}

#[test]
fn listing_file_is_written() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tune.not");
    let object = temp.path().join("tune.bin");
    let listing = temp.path().join("tune.lst");
    fs::write(&source, " TPO 60\n END\n").unwrap();

    let output = notcmp()
        .args([
            source.to_str().unwrap(),
            "-o",
            object.to_str().unwrap(),
            "-l",
            listing.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run notcmp");

    assert!(output.status.success());
    let text = fs::read_to_string(&listing).unwrap();
    assert_eq!(text, " TPO 60\n0000  10 3C \n END\n0002  00 \n");
}

#[test]
fn unknown_format_is_rejected() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("tune.not");
    fs::write(&source, " END\n").unwrap();

    let output = notcmp()
        .args([
            source.to_str().unwrap(),
            "-o",
            temp.path().join("out").to_str().unwrap(),
            "-f",
            "elf",
        ])
        .output()
        .expect("failed to run notcmp");

    assert!(!output.status.success());
}
