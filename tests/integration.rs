//! Integration tests for genoingest
//!
//! Drives the built binary end to end:
//! - Template printing and config validation
//! - Revision diffs
//! - File listing and ingesting into a scratch data directory
//! - The ingest ledger

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with a clean genoingest environment
fn genoingest(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_genoingest"))
        .args(args)
        .env_remove("GENOINGEST_ROOT")
        .env_remove("GENOINGEST_DATA_DIR")
        .env("GENOINGEST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// A data root with two GERP rate files and a config pointing at it
fn gerp_fixture() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("data");
    fs::create_dir_all(root.join("Conservations")).unwrap();
    fs::write(root.join("Conservations/chr1.maf.rates"), "1.5\t0.2\n2.0\t-1.1\n").unwrap();
    fs::write(root.join("Conservations/chr2.maf.rates"), "NA\tNA\n").unwrap();

    let config = temp.path().join("ingest.json");
    fs::write(
        &config,
        r#"{
            "gerp.database": "conservation",
            "gerp.batch_size": 1000,
            "gerp.file_list": ["?/Conservations/chr*.maf.rates"]
        }"#,
    )
    .unwrap();

    (temp, root, config)
}

// ============================================================================
// Config Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_template_passes_template_check() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("ingest.json");

        let output = genoingest(&["template"]);
        assert!(output.status.success());
        fs::write(&config, &output.stdout).unwrap();

        let output = genoingest(&["check", path_arg(&config), "--template"]);
        assert!(output.status.success(), "{}", stderr(&output));
        let json = stdout_json(&output);
        assert_eq!(json["valid"], true);
        assert_eq!(json["mode"], "template");
    }

    #[test]
    fn test_strict_check_rejects_placeholders() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("ingest.json");
        fs::write(&config, genoingest(&["template"]).stdout).unwrap();

        let output = genoingest(&["check", path_arg(&config)]);
        assert_eq!(output.status.code(), Some(1));
        let json = stdout_json(&output);
        assert_eq!(json["valid"], false);
        assert!(!json["issues"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_revision() {
        let output = genoingest(&["template", "--revision", "9"]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("Unknown template revision 9"));
    }

    #[test]
    fn test_missing_config() {
        let output = genoingest(&["describe", "/nonexistent/ingest.json"]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("Config file not found"));
    }

    #[test]
    fn test_bundled_revisions_diff() {
        let output = genoingest(&["diff", "@1", "@2"]);
        assert!(output.status.success(), "{}", stderr(&output));
        let json = stdout_json(&output);
        assert_eq!(json["superset"], true);
        assert!(json["removed"].as_array().unwrap().is_empty());
        assert!(!json["added"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_describe_redacts_password() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("ingest.json");
        fs::write(
            &config,
            r#"{
                "db.host": "localhost",
                "db.port": 3306,
                "db.user": "loader",
                "db.password": "hunter2"
            }"#,
        )
        .unwrap();

        let output = genoingest(&["describe", path_arg(&config)]);
        assert!(output.status.success(), "{}", stderr(&output));
        let text = String::from_utf8_lossy(&output.stdout);
        assert!(!text.contains("hunter2"));
        assert_eq!(stdout_json(&output)["connection"], "loader@localhost:3306");
    }
}

// ============================================================================
// Ingest Tests
// ============================================================================

mod ingest_tests {
    use super::*;

    #[test]
    fn test_files_lists_expanded_inputs() {
        let (_temp, root, config) = gerp_fixture();

        let output = genoingest(&["files", path_arg(&config), "--root", path_arg(&root)]);
        assert!(output.status.success(), "{}", stderr(&output));
        let json = stdout_json(&output);
        assert_eq!(json["missing"], 0);
        assert_eq!(json["sources"][0]["source"], "gerp");
        assert_eq!(json["sources"][0]["files"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_ingest_then_runs() {
        let (temp, root, config) = gerp_fixture();
        let data_dir = temp.path().join("db");

        let output = genoingest(&[
            "ingest",
            path_arg(&config),
            "--mode",
            "gerp",
            "--root",
            path_arg(&root),
            "--data-dir",
            path_arg(&data_dir),
        ]);
        assert!(output.status.success(), "{}", stderr(&output));
        let report = stdout_json(&output);
        assert_eq!(report["records"], 3);
        assert_eq!(report["files"].as_array().unwrap().len(), 2);
        assert!(data_dir.join("conservation.db").exists());

        let output = genoingest(&[
            "runs",
            "--database",
            "conservation",
            "--data-dir",
            path_arg(&data_dir),
        ]);
        assert!(output.status.success(), "{}", stderr(&output));
        let runs = stdout_json(&output);
        assert_eq!(runs["total"], 1);
        assert_eq!(runs["runs"][0]["status"], "done");
        assert_eq!(runs["runs"][0]["records"], 3);
    }

    #[test]
    fn test_ingest_uses_root_from_env() {
        let (temp, root, config) = gerp_fixture();
        let data_dir = temp.path().join("db");

        let output = Command::new(env!("CARGO_BIN_EXE_genoingest"))
            .args(["ingest", path_arg(&config), "--mode", "gerp"])
            .env("GENOINGEST_ROOT", &root)
            .env("GENOINGEST_DATA_DIR", &data_dir)
            .env("GENOINGEST_LOG", "warn")
            .output()
            .unwrap();
        assert!(output.status.success(), "{}", stderr(&output));
        assert!(data_dir.join("conservation.db").exists());
    }

    #[test]
    fn test_ingest_unresolved_root_fails() {
        let (temp, _root, config) = gerp_fixture();
        let data_dir = temp.path().join("db");

        let output = genoingest(&[
            "ingest",
            path_arg(&config),
            "--mode",
            "gerp",
            "--data-dir",
            path_arg(&data_dir),
        ]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("gerp.file_list"));
    }

    #[test]
    fn test_db_is_not_an_ingest_mode() {
        let (temp, root, config) = gerp_fixture();
        let output = genoingest(&[
            "ingest",
            path_arg(&config),
            "--mode",
            "db",
            "--root",
            path_arg(&root),
            "--data-dir",
            path_arg(&temp.path().join("db")),
        ]);
        assert_eq!(output.status.code(), Some(1));
    }

    #[test]
    fn test_runs_on_missing_database() {
        let temp = TempDir::new().unwrap();
        let output = genoingest(&["runs", "--database", "gtex", "--data-dir", path_arg(temp.path())]);
        assert_eq!(output.status.code(), Some(1));
        assert!(stderr(&output).contains("Database not found"));
    }
}
