//! Command-line tests for the `dynlib` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

fn dynlib() -> Command {
    let mut cmd = Command::cargo_bin("dynlib").unwrap();
    cmd.env_remove("DYNLIB_BINDING")
        .env_remove("DYNLIB_VISIBILITY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_classify_not_found() {
    dynlib()
        .args(["classify", "The specified procedure could not be found."])
        .assert()
        .success()
        .stdout("not-found\n");
}

#[test]
fn test_classify_shared_object_is_unexpected() {
    dynlib()
        .args(["classify", "shared object not found"])
        .assert()
        .success()
        .stdout("unexpected\n");

    dynlib()
        .args(["classify", "permission denied"])
        .assert()
        .success()
        .stdout("unexpected\n");
}

#[test]
fn test_open_missing_library_fails() {
    dynlib()
        .args(["open", "/nonexistent/dynlib/libnope.so"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not open library %/nonexistent/dynlib/libnope.so"));
}

#[test]
fn test_pick_requires_names() {
    dynlib().args(["pick", "libm.so.6"]).assert().failure();
}

#[test]
fn test_invalid_config_file_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[loader]\nbinding = \"sometimes\"").unwrap();

    dynlib()
        .arg("--config")
        .arg(file.path())
        .args(["open", "libm.so.6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_invalid_env_override_fails() {
    dynlib()
        .env("DYNLIB_BINDING", "eventually")
        .args(["open", "libm.so.6"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DYNLIB_BINDING"));
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod linux {
    use super::*;

    #[test]
    fn test_open_by_bare_name() {
        dynlib()
            .args(["open", "libm.so.6"])
            .assert()
            .success()
            .stdout("#[library! %libm.so.6]\n");
    }

    #[test]
    fn test_pick_json() {
        let output = dynlib()
            .args(["pick", "libm.so.6", "cos", "sin", "--json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let reports = reports.as_array().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["name"], "cos");
        assert_eq!(reports[0]["status"], "found");
        assert!(reports[1]["address"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_pick_with_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[loader]\nbinding = \"now\"\nvisibility = \"global\"").unwrap();

        dynlib()
            .arg("--config")
            .arg(file.path())
            .args(["pick", "libm.so.6", "cos"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("cos\t0x"));
    }
}
