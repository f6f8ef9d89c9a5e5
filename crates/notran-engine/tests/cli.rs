//! `notint` binary behaviour with WAV output.

use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn notint() -> Command {
    Command::new(env!("CARGO_BIN_EXE_notint"))
}

#[test]
fn renders_a_wav_file_with_the_expected_sample_count() {
    let temp = TempDir::new().unwrap();
    let bytecode = temp.path().join("tune.bin");
    let bank = temp.path().join("waves.bin");
    let wav = temp.path().join("out.wav");

    // Tempo 32, one voice, one 72-unit note.
    fs::write(&bytecode, [0x10, 0x20, 0x90, 0x00, 0x60, 0x18, 0x04, 0x00]).unwrap();
    fs::write(&bank, vec![0x80u8; 256]).unwrap();

    let output = notint()
        .args([
            bytecode.to_str().unwrap(),
            bank.to_str().unwrap(),
            "-o",
            wav.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run notint");

    assert!(
        output.status.success(),
        "notint failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let reader = hound::WavReader::open(&wav).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 8772);
    assert_eq!(spec.bits_per_sample, 8);
    assert_eq!(reader.len(), 32 * 72);
}

#[test]
fn jump_budget_flag_terminates_a_looping_program() {
    let temp = TempDir::new().unwrap();
    let bytecode = temp.path().join("loop.bin");
    let bank = temp.path().join("waves.bin");
    let wav = temp.path().join("out.wav");

    // Note, then jump back to the note forever.
    fs::write(
        &bytecode,
        [0x10, 0x01, 0x90, 0x00, 0x60, 0x18, 0x0F, 0x40, 0x04, 0x00],
    )
    .unwrap();
    fs::write(&bank, vec![0x80u8; 256]).unwrap();

    let output = notint()
        .args([
            bytecode.to_str().unwrap(),
            bank.to_str().unwrap(),
            "-o",
            wav.to_str().unwrap(),
            "-j",
            "4",
        ])
        .output()
        .expect("failed to run notint");

    assert!(output.status.success());
    let reader = hound::WavReader::open(&wav).unwrap();
    // The first pass plus four jumps back through the note.
    assert_eq!(reader.len(), 5 * 6);
}

#[test]
fn corrupt_bytecode_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    let bytecode = temp.path().join("bad.bin");
    let bank = temp.path().join("waves.bin");

    fs::write(&bytecode, [0xA0, 0x00]).unwrap();
    fs::write(&bank, vec![0x80u8; 256]).unwrap();

    let output = notint()
        .args([
            bytecode.to_str().unwrap(),
            bank.to_str().unwrap(),
            "-o",
            temp.path().join("out.wav").to_str().unwrap(),
        ])
        .output()
        .expect("failed to run notint");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("undefined control opcode"), "stderr: {stderr}");
}

#[test]
fn invalid_sample_rate_is_rejected() {
    let output = notint()
        .args(["a", "b", "-r", "500"])
        .output()
        .expect("failed to run notint");
    assert!(!output.status.success());
}
