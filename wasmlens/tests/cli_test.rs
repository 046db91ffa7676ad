// Copyright (c) 2025 The WasmLens Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

#![allow(clippy::unwrap_used)]
//! End-to-end tests driving the `wasmlens` binary.

use std::{fs, path::PathBuf, process::Command};

use tempfile::TempDir;

const MODULE: &str = r#"
(module
  (memory 1)
  (global $g (mut i32) (i32.const 40))
  (func $answer (export "answer") (param i32) (result i32)
    local.get 0
    global.get $g
    i32.add)
  (data (i32.const 0) "hi"))
"#;

fn write_module(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sample.wasm");
    fs::write(&path, wat::parse_str(MODULE).unwrap()).unwrap();
    path
}

fn wasmlens(args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_wasmlens")).args(args).output().unwrap();
    (output.status.success(), String::from_utf8_lossy(&output.stdout).into_owned())
}

#[test]
fn lists_sections() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let (ok, stdout) = wasmlens(&["sections", path.to_str().unwrap()]);
    assert!(ok);
    assert!(stdout.contains("0x00000008"));
    for kind in ["Type", "Function", "Memory", "Global", "Export", "Code", "Data"] {
        assert!(stdout.contains(kind), "missing {kind} in\n{stdout}");
    }
}

#[test]
fn inspects_header_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let (ok, stdout) = wasmlens(&["inspect", path.to_str().unwrap(), "--offset", "0x5"]);
    assert!(ok);
    assert!(stdout.contains("version:"), "{stdout}");
}

#[test]
fn round_trips_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let out = dir.path().join("out.wasm");
    let (ok, stdout) = wasmlens(&["roundtrip", path.to_str().unwrap(), "--output", out.to_str().unwrap()]);
    assert!(ok);
    assert!(stdout.starts_with("identical"), "{stdout}");
    assert_eq!(fs::read(out).unwrap(), fs::read(path).unwrap());
}

#[test]
fn runs_a_function() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let (ok, stdout) = wasmlens(&["run", path.to_str().unwrap(), "--func", "0", "2"]);
    assert!(ok);
    assert!(stdout.contains("global.get 0"), "{stdout}");
    assert!(stdout.trim_end().ends_with("result: i32:42"), "{stdout}");
}

#[test]
fn validate_reports_success() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let (ok, stdout) = wasmlens(&["validate", path.to_str().unwrap()]);
    assert!(ok);
    assert_eq!(stdout.trim(), "ok");
}

#[test]
fn splice_writes_edited_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let out = dir.path().join("spliced.wasm");
    let (ok, stdout) = wasmlens(&[
        "splice",
        path.to_str().unwrap(),
        "--at",
        "8",
        "--hex",
        "00 03 01 78 00",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(ok);
    assert!(stdout.contains("module decodes"), "{stdout}");
    let original = fs::read(path).unwrap();
    let spliced = fs::read(out).unwrap();
    assert_eq!(spliced.len(), original.len() + 5);
    assert_eq!(&spliced[8..13], &[0x00, 0x03, 0x01, b'x', 0x00]);
}

#[test]
fn dump_prints_header() {
    let dir = TempDir::new().unwrap();
    let path = write_module(&dir);
    let (ok, stdout) = wasmlens(&["dump", path.to_str().unwrap(), "--length", "8"]);
    assert!(ok);
    assert!(stdout.starts_with("00000000  00 61 73 6d 01 00 00 00"), "{stdout}");
}
