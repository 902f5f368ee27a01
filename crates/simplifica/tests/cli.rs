//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective.

use assert_cmd::Command;
use predicates::prelude::*;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn short_help_flag_shows_usage() {
    cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn short_version_flag_shows_version() {
    cmd()
        .arg("-V")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn version_only_prints_bare_version() {
    cmd()
        .arg("--version-only")
        .assert()
        .success()
        .stdout(predicate::str::diff(format!(
            "{}\n",
            env!("CARGO_PKG_VERSION")
        )));
}

// =============================================================================
// Info Command
// =============================================================================

#[test]
fn info_shows_package_name_and_version() {
    cmd()
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_NAME")))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn info_json_outputs_valid_json() {
    let output = cmd().arg("info").arg("--json").assert().success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("info --json should output valid JSON");

    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn info_json_contains_expected_fields() {
    cmd()
        .arg("info")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\""))
        .stdout(predicate::str::contains("\"version\""));
}

#[test]
fn info_help_shows_command_options() {
    cmd()
        .args(["info", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--json"));
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_flag_accepted() {
    cmd().args(["--quiet", "info"]).assert().success();
}

#[test]
fn short_quiet_flag_accepted() {
    cmd().args(["-q", "info"]).assert().success();
}

#[test]
fn verbose_flag_accepted() {
    cmd().args(["--verbose", "info"]).assert().success();
}

#[test]
fn short_verbose_flag_accepted() {
    cmd().args(["-v", "info"]).assert().success();
}

#[test]
fn multiple_verbose_flags_accepted() {
    cmd().args(["-vv", "info"]).assert().success();
}

#[test]
fn color_auto_accepted() {
    cmd().args(["--color", "auto", "info"]).assert().success();
}

#[test]
fn color_always_accepted() {
    cmd().args(["--color", "always", "info"]).assert().success();
}

#[test]
fn color_never_accepted() {
    cmd().args(["--color", "never", "info"]).assert().success();
}

// =============================================================================
// Fixtures
// =============================================================================

const EASY: &str = "O gato dorme no sofá. O cão corre no parque.";
const MIXED: &str =
    "Frase simples. Frase muito mais complicada e extensa que deveria ser marcada.";
const HARD: &str = "Administrativamente, a implementação governamental experimentou \
                    dificuldades operacionais consideráveis.";

/// Write `content` to a file named `name` in a fresh temp dir.
fn fixture(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

/// A command whose persisted key lives in `dir` and ignores any key in the
/// caller's environment.
fn isolated(dir: &std::path::Path) -> Command {
    let mut c = cmd();
    c.env("SIMPLIFICA_SETTINGS_FILE", dir.join("settings.json"))
        .env_remove("SIMPLIFICA_API_KEY");
    c
}

// =============================================================================
// Score Command
// =============================================================================

#[test]
fn score_easy_text() {
    let (_dir, path) = fixture("easy.txt", EASY);
    cmd()
        .args(["score", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Muito Simples"));
}

#[test]
fn score_json_has_tier() {
    let (_dir, path) = fixture("easy.txt", EASY);
    let output = cmd()
        .args(["score", "--json", path.to_str().unwrap()])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).expect("valid JSON");
    assert_eq!(json["readability"]["tier"], "easy");
    assert_eq!(json["below_min"], false);
}

#[test]
fn score_below_min_fails() {
    let (_dir, path) = fixture("hard.txt", HARD);
    cmd()
        .args(["score", "--min-score", "50", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("scores"));
}

#[test]
fn score_short_text_is_reported_not_failed() {
    let (_dir, path) = fixture("short.txt", "Oi.");
    cmd()
        .args(["score", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("too short"));
}

#[test]
fn score_markdown_ignores_code() {
    let content = format!("{EASY}\n\n```\nAdministrativamente governamental.\n```\n");
    let (_dir, path) = fixture("doc.md", &content);
    let output = cmd()
        .args(["score", "--json", path.to_str().unwrap()])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).expect("valid JSON");
    assert_eq!(json["readability"]["word_count"], 10);
}

#[test]
fn score_missing_file_fails() {
    cmd()
        .args(["score", "/nonexistent/texto.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// =============================================================================
// Segment Command
// =============================================================================

#[test]
fn segment_lists_sentences() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    let output = cmd()
        .args(["segment", "--json", path.to_str().unwrap()])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).expect("valid JSON");
    let units = json.as_array().unwrap();
    assert_eq!(units.len(), 2);
    assert_eq!(units[0]["text"], "Frase simples.");
    assert_eq!(units[0]["start"], 0);
}

#[test]
fn segment_keeps_abbreviations_together() {
    let (_dir, path) = fixture("abbr.txt", "O Sr. Silva chegou cedo. Depois saiu.");
    cmd()
        .args(["segment", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("O Sr. Silva chegou cedo."));
}

#[test]
fn segment_rejects_unknown_strategy() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    cmd()
        .args(["segment", "--segmenter", "icu", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// =============================================================================
// Highlight Command
// =============================================================================

#[test]
fn highlight_flags_the_medium_sentence() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    cmd()
        .args(["--color", "never", "highlight", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("extensa que deveria"))
        .stdout(predicate::str::contains("1 of 2 sentences flagged (0 hard)"));
}

#[test]
fn highlight_json_includes_markers() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    let output = cmd()
        .args(["highlight", "--json", path.to_str().unwrap()])
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).expect("valid JSON");
    assert_eq!(json["flagged"].as_array().unwrap().len(), 1);
    let markers = json["markers"].as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert!(!markers[0]["boxes"].as_array().unwrap().is_empty());
}

#[test]
fn highlight_fail_on_hard() {
    let (_dir, path) = fixture("hard.txt", HARD);
    cmd()
        .args(["highlight", "--fail-on-hard", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hard sentence"));
}

// =============================================================================
// Apply Command
// =============================================================================

#[test]
fn apply_prints_edited_text() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    cmd()
        .args([
            "apply",
            path.to_str().unwrap(),
            "--old",
            "Frase muito mais complicada e extensa que deveria ser marcada.",
            "--new",
            "Frase longa.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("Frase simples. Frase longa."));
}

#[test]
fn apply_write_updates_file() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    cmd()
        .args([
            "apply",
            path.to_str().unwrap(),
            "--old",
            "Frase simples.",
            "--new",
            "Frase curta.",
            "--write",
        ])
        .assert()
        .success();
    let edited = std::fs::read_to_string(&path).unwrap();
    assert!(edited.starts_with("Frase curta. Frase muito"));
}

#[test]
fn apply_missing_sentence_fails() {
    let (_dir, path) = fixture("mixed.txt", MIXED);
    cmd()
        .args(["apply", path.to_str().unwrap(), "--old", "Ausente.", "--new", "Outra."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find the original text"));
}

// =============================================================================
// Key Command
// =============================================================================

#[test]
fn key_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["key", "set", "sk-or-v1-0123456789abcdef"])
        .assert()
        .success();
    isolated(dir.path())
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sk-or-...cdef"))
        .stdout(predicate::str::contains("0123456789").not());
    isolated(dir.path()).args(["key", "clear"]).assert().success();
    isolated(dir.path())
        .args(["key", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"));
}

#[test]
fn key_set_rejects_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["key", "set", "not-a-key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sk-or-"));
    assert!(!dir.path().join("settings.json").exists());
}

#[test]
fn key_message_speaks_the_settings_protocol() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .args(["key", "message", r#"{"action":"updateApiKey","apiKey":"sk-or-abc"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""success":true"#));
    isolated(dir.path())
        .args(["key", "message", r#"{"action":"getApiKey"}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""apiKey":"sk-or-abc""#));
}

// =============================================================================
// Suggest Command
// =============================================================================

#[test]
fn suggest_without_key_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    isolated(dir.path())
        .env("SIMPLIFICA_ENDPOINT", "http://127.0.0.1:9/unreachable")
        .args(["suggest", MIXED])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API Key não configurada"));
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    // arg_required_else_help makes clap print help to stderr and exit 2
    cmd()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn invalid_flag_shows_error() {
    cmd()
        .arg("--not-a-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// =============================================================================
// Chdir Flag
// =============================================================================

#[test]
fn chdir_flag_changes_directory() {
    // The -C flag should be accepted and work without error
    // We use a path that definitely exists
    cmd().args(["-C", "/tmp", "info"]).assert().success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "info"])
        .assert()
        .failure();
}
