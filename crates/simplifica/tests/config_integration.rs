//! Configuration seen through the binary.
//!
//! Discovery and merge order are unit-tested in `simplifica-core`; these
//! tests check that editor timings, suggestion settings and the stored key
//! reach the CLI, read back through `info --json`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// Effective configuration for a run from `dir`, with extra env and flags.
fn effective_config(dir: &Path, env: &[(&str, &str)], flags: &[&str]) -> Value {
    let mut command = cmd();
    command.env_remove("SIMPLIFICA_API_KEY");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command
        .args(["-C", dir.to_str().unwrap()])
        .args(flags)
        .args(["info", "--json"])
        .output()
        .expect("failed to run command");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: Value = serde_json::from_slice(&output.stdout).expect("invalid JSON output");
    json["config"].clone()
}

#[test]
fn defaults_match_editor_timings() {
    let tmp = TempDir::new().unwrap();
    let config = effective_config(tmp.path(), &[], &[]);

    assert!(config["config_file"].is_null());
    assert_eq!(config["debounce_ms"], 1200);
    assert_eq!(config["reanalyze_delay_ms"], 500);
    assert_eq!(config["discovery_interval_ms"], 1500);
    assert_eq!(config["min_text_length"], 5);
    assert_eq!(config["segmenter"], "locale");
    assert_eq!(config["target_score"], 70);
    assert_eq!(config["model"], "google/gemini-2.5-flash-lite");
    assert!(config["api_key"].is_null());
}

#[test]
fn analysis_settings_from_each_format() {
    let cases = [
        (".simplifica.toml", "debounce_ms = 800\nsegmenter = \"simple\"\n"),
        (".simplifica.yaml", "debounce_ms: 800\nsegmenter: simple\n"),
        (".simplifica.json", r#"{"debounce_ms": 800, "segmenter": "simple"}"#),
    ];
    for (name, body) in cases {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(name), body).unwrap();

        let config = effective_config(tmp.path(), &[], &[]);
        assert_eq!(config["debounce_ms"], 800, "{name}");
        assert_eq!(config["segmenter"], "simple", "{name}");
        assert!(config["config_file"].as_str().unwrap().ends_with(name));
    }
}

#[test]
fn project_config_applies_to_subdirectories() {
    let tmp = TempDir::new().unwrap();
    let drafts = tmp.path().join("docs").join("rascunhos");
    fs::create_dir_all(&drafts).unwrap();
    fs::write(tmp.path().join("simplifica.toml"), "min_text_length = 12\n").unwrap();

    let config = effective_config(&drafts, &[], &[]);
    assert_eq!(config["min_text_length"], 12);
}

#[test]
fn suggestion_settings_from_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".simplifica.json"),
        r#"{"model": "openai/gpt-4o-mini", "target_score": 80, "endpoint": "http://localhost:9/v1"}"#,
    )
    .unwrap();

    let config = effective_config(tmp.path(), &[], &[]);
    assert_eq!(config["model"], "openai/gpt-4o-mini");
    assert_eq!(config["target_score"], 80);
    assert_eq!(config["endpoint"], "http://localhost:9/v1");
}

#[test]
fn configured_api_key_is_masked() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".simplifica.toml"),
        r#"api_key = "sk-or-v1-0123456789abcdef""#,
    )
    .unwrap();

    let config = effective_config(tmp.path(), &[], &[]);
    assert_eq!(config["api_key"], "sk-or-...cdef");
    assert!(!config.to_string().contains("0123456789"));
}

#[test]
fn env_overrides_file_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".simplifica.toml"), "debounce_ms = 800\n").unwrap();

    let config = effective_config(
        tmp.path(),
        &[
            ("SIMPLIFICA_DEBOUNCE_MS", "300"),
            ("SIMPLIFICA_MODEL", "meta/llama-3-8b"),
        ],
        &[],
    );
    assert_eq!(config["debounce_ms"], 300);
    assert_eq!(config["model"], "meta/llama-3-8b");
}

#[test]
fn explicit_config_overrides_project_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".simplifica.toml"), "target_score = 60\n").unwrap();
    let explicit = tmp.path().join("revisao.toml");
    fs::write(&explicit, "target_score = 85\n").unwrap();

    let config = effective_config(tmp.path(), &[], &["--config", explicit.to_str().unwrap()]);
    assert_eq!(config["target_score"], 85);
    assert!(config["config_file"].as_str().unwrap().ends_with("revisao.toml"));
}

#[test]
fn repository_boundary_hides_outer_config() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(tmp.path().join(".simplifica.toml"), "debounce_ms = 50\n").unwrap();

    let config = effective_config(&src, &[], &[]);
    assert_eq!(config["debounce_ms"], 1200);
    assert!(config["config_file"].is_null());
}

#[test]
fn invalid_config_fails_before_any_command() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".simplifica.toml"), "debounce_ms = [[[").unwrap();
    fs::write(tmp.path().join("texto.txt"), "O gato dorme no sofá.").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "score", "texto.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}
