//! Integration tests for the kddp command line.
//!
//! Linking needs the external toolchain and a DDP installation, so these
//! tests exercise the IR dump path, which is self-contained.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

fn temp_source(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("kddp_test_{}_{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}.ddp", name));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn version_prints_compiler_and_gcc() {
    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("version").assert().success().stdout(predicate::str::contains("kddp"));
}

#[test]
fn verbose_version_has_gcc_on_the_third_line() {
    let mut cmd = Command::cargo_bin("kddp").unwrap();
    let output = cmd.arg("version").arg("--wortreich").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.len() >= 3);
    // "GCC Version <version>": the version is the third word
    let words: Vec<&str> = lines[2].split_whitespace().collect();
    assert_eq!(words[0], "GCC");
    assert_eq!(words.len(), 3);
}

#[test]
fn build_dumps_llvm_ir() {
    let input = temp_source("gruss", "Schreibe \"Hallo, Welt!\".\n");
    let output = input.with_extension("");

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("build")
        .arg(&input)
        .arg("--llvm-ir")
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let ir = std::fs::read_to_string(output.with_extension("ll")).unwrap();
    assert!(ir.contains("define i64 @_ddp_ddpmain()"));
    assert!(ir.contains("_ddp_string_from_constant"));
    assert!(ir.contains("Schreibe_Text"));
}

#[test]
fn build_reports_errors_with_nonzero_exit() {
    let input = temp_source("kaputt", "Schreibe x.\n");

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("build")
        .arg(&input)
        .arg("--llvm-ir")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Fehler"));
}

#[test]
fn build_emits_json_diagnostics() {
    let input = temp_source("kaputt_json", "Schreibe x.\n");

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    let output = cmd.arg("build").arg(&input).arg("--llvm-ir").arg("--json").output().unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("gültiges JSON erwartet");
    assert_eq!(parsed["success"], serde_json::Value::Bool(false));
    assert!(parsed["diagnostics"].as_array().map_or(0, |d| d.len()) > 0);
}

#[test]
fn build_resolves_includes() {
    let dir = std::env::temp_dir().join(format!("kddp_test_include_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("modul.ddp"),
        "Die Funktion eins, gibt eine Zahl zurück, macht:\n    Gib 1 zurück.\nUnd kann so benutzt werden:\n    \"eins\".\n",
    )
    .unwrap();
    let main = dir.join("haupt.ddp");
    std::fs::write(&main, "Binde \"modul\" ein.\nSchreibe eins.\n").unwrap();

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("build").arg(&main).arg("--llvm-ir").assert().success();

    let ir = std::fs::read_to_string(main.with_extension("ll")).unwrap();
    assert!(ir.contains("define i64 @eins()"));
}

#[test]
fn out_of_bounds_ir_names_the_trap() {
    let input = temp_source(
        "grenzen",
        "Die Zahlen Liste l ist eine Liste, die aus 1, 2 und 3 besteht.\nSchreibe die 5. Stelle von l.\n",
    );

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("build").arg(&input).arg("--llvm-ir").assert().success();

    let ir = std::fs::read_to_string(input.with_extension("ll")).unwrap();
    assert!(ir.contains("call void @out_of_bounds(i64 5"));
}

#[test]
fn dump_list_defs_writes_the_type_definitions() {
    let dir = std::env::temp_dir().join(format!("kddp_test_defs_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let prefix = dir.join("listen");

    let mut cmd = Command::cargo_bin("kddp").unwrap();
    cmd.arg("dump-list-defs").arg("-o").arg(&prefix).arg("--llvm-ir").assert().success();

    let ir = std::fs::read_to_string(prefix.with_extension("ll")).unwrap();
    assert!(ir.contains("%ddpstringlist = type { %ddpstring**, i64, i64 }"));
}
