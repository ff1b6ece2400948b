//! Smoke tests for the zepctl binary wiring

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PNG_IMG_TAG: &str = "<img src=\"data:image/png;base64,iVBORw0KGgo=\">";

/// A zepctl command isolated from the user's home config
fn zepctl(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("zepctl").unwrap();
    cmd.env("HOME", home).env_remove("ZEPCTL_CONFIG");
    cmd
}

fn legacy_note() -> String {
    json!({
        "name": "Smoke test",
        "paragraphs": [
            {
                "user": "sam",
                "dateCreated": "Feb 28, 2017 4:44:54 PM",
                "dateUpdated": "Feb 28, 2017 4:50:00 PM",
                "text": "%sql select 1",
                "result": {"code": "SUCCESS", "type": "TABLE", "msg": "a\tb\n1\t2"}
            }
        ]
    })
    .to_string()
}

fn new_note() -> String {
    json!({
        "name": "Smoke test new",
        "paragraphs": [
            {
                "config": {"editorMode": "ace/mode/python"},
                "text": "%pyspark print(1)",
                "results": {"code": "SUCCESS", "msg": [{"type": "TEXT", "data": "1"}]}
            }
        ]
    })
    .to_string()
}

// === Help ===

#[test]
fn test_top_level_help() {
    let home = TempDir::new().unwrap();
    zepctl(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("detect"));
}

#[test]
fn test_convert_help() {
    let home = TempDir::new().unwrap();
    zepctl(home.path())
        .args(["convert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Input notebook JSON file"))
        .stdout(predicate::str::contains("--schema"));
}

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    zepctl(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zepctl"));
}

// === Convert ===

#[test]
fn test_convert_to_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("note.json");
    fs::write(&input, legacy_note()).unwrap();
    let output = dir.path().join("md/smoke.md");

    zepctl(dir.path())
        .arg("convert")
        .arg("--in")
        .arg(&input)
        .arg("--out")
        .arg(&output)
        .assert()
        .success();

    let markdown = fs::read_to_string(&output).unwrap();
    assert!(markdown.starts_with("---\ntitle: Smoke test\nauthor(s): sam\n"));
    assert!(markdown.contains("```sql\nselect 1\n```\n|a|b|\n|-|-|\n|1|2|"));
}

#[test]
fn test_convert_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("note.json");
    fs::write(&input, new_note()).unwrap();

    zepctl(dir.path())
        .current_dir(dir.path())
        .arg("convert")
        .arg("--in")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("---\ntitle: Smoke test new\n"))
        .stdout(predicate::str::contains("```python\nprint(1)\n```"))
        .stdout(predicate::str::contains("# Output:"));
}

#[test]
fn test_convert_malformed_date_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("note.json");
    let note = json!({
        "name": "bad dates",
        "paragraphs": [{"dateCreated": "yesterday-ish", "text": "1 + 1"}]
    });
    fs::write(&input, note.to_string()).unwrap();
    let output = dir.path().join("bad.md");

    zepctl(dir.path())
        .arg("convert")
        .arg("--in")
        .arg(&input)
        .arg("--out")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("yesterday-ish"));

    assert!(!output.exists());
}

#[test]
fn test_convert_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    zepctl(dir.path())
        .arg("convert")
        .arg("--in")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure();
}

#[test]
fn test_convert_links_images_from_dir_option() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("note.json");
    let note = json!({
        "name": "chart",
        "paragraphs": [{
            "config": {"editorMode": "ace/mode/python"},
            "text": "plt.show()",
            "results": {
                "code": "SUCCESS",
                "msg": [{"type": "HTML", "data": PNG_IMG_TAG}]
            }
        }]
    });
    fs::write(&input, note.to_string()).unwrap();

    zepctl(dir.path())
        .current_dir(dir.path())
        .args(["convert", "--in", "note.json", "--out", "docs/chart.md", "--dir", "assets"])
        .assert()
        .success();

    let markdown = fs::read_to_string(dir.path().join("docs/chart.md")).unwrap();
    assert!(markdown.contains("![png](../assets/images/output_1.png)"));
    assert!(dir.path().join("assets/images/output_1.png").exists());
}

// === Detect ===

#[test]
fn test_detect_reports_schema() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("legacy.json");
    let new = dir.path().join("new.json");
    fs::write(&legacy, legacy_note()).unwrap();
    fs::write(&new, new_note()).unwrap();

    zepctl(dir.path())
        .arg("detect")
        .arg("--in")
        .arg(&legacy)
        .assert()
        .success()
        .stdout("legacy\n");

    zepctl(dir.path())
        .arg("detect")
        .arg("--in")
        .arg(&new)
        .assert()
        .success()
        .stdout("new\n");
}

// === Batch ===

#[test]
fn test_batch_converts_directory() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for id in ["2A94M5J1Z", "2BWJFTXKJ"] {
        let note_dir = input.path().join(id);
        fs::create_dir_all(&note_dir).unwrap();
        fs::write(note_dir.join("note.json"), legacy_note()).unwrap();
    }

    zepctl(input.path())
        .arg("batch")
        .arg("--in")
        .arg(input.path())
        .arg("--out")
        .arg(output.path())
        .arg("--no-progress")
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy schema"));

    assert!(output.path().join("2A94M5J1Z/smoke-test.md").exists());
    assert!(output.path().join("2BWJFTXKJ/smoke-test.md").exists());
}

#[test]
fn test_batch_reports_failures() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let note_dir = input.path().join("broken");
    fs::create_dir_all(&note_dir).unwrap();
    fs::write(note_dir.join("note.json"), "{not json").unwrap();

    zepctl(input.path())
        .arg("--quiet")
        .arg("batch")
        .arg("--in")
        .arg(input.path())
        .arg("--out")
        .arg(output.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed"));
}

// === Config ===

#[test]
fn test_config_default_language() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("zepctl.toml");
    fs::write(&config, "[convert]\ndefault_language = \"python\"\n").unwrap();
    let input = dir.path().join("note.json");
    let note = json!({"name": "cfg", "paragraphs": [{"text": "x = 1"}]});
    fs::write(&input, note.to_string()).unwrap();

    zepctl(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("convert")
        .arg("--in")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("```python\nx = 1\n```"));
}
