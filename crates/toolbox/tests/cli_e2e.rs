#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn toolbox_cmd(data: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("toolbox"));
    cmd.env_remove("RUST_LOG")
        .env_remove("TOOLBOX_NAMESPACE")
        .arg("--data")
        .arg(data.path());
    cmd
}

fn json_output(data: &TempDir, args: &[&str]) -> Value {
    let output = toolbox_cmd(data)
        .args(["-o", "json"])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_naked_run_shows_status() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded from:"))
        .stdout(predicate::str::contains("defaults"))
        .stdout(predicate::str::contains("Flat-key store:"));
}

#[test]
fn test_status_json_on_fresh_install() {
    let data = TempDir::new().unwrap();
    let status = json_output(&data, &["status"]);
    assert_eq!(status["loadSource"], "defaults");
    assert_eq!(status["persistenceEnabled"], true);
    assert_eq!(status["needsMigration"], false);
    assert_eq!(status["migration"]["completed"], true);
    assert_eq!(status["migration"]["migratedItems"], 0);
}

#[test]
fn test_favorites_persist_across_runs() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .args(["favorite", "add", "json-formatter"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added json-formatter"));

    toolbox_cmd(&data)
        .args(["fav", "ls"])
        .assert()
        .success()
        .stdout(predicate::str::contains("json-formatter"));

    let prefs = json_output(&data, &["prefs", "show"]);
    assert_eq!(prefs["favoriteTools"], serde_json::json!(["json-formatter"]));

    toolbox_cmd(&data)
        .args(["favorite", "rm", "json-formatter"])
        .assert()
        .success();
    toolbox_cmd(&data)
        .args(["favorite", "rm", "json-formatter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a favorite"));
}

#[test]
fn test_usage_and_search_history() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .args(["usage", "record", "base64"])
        .assert()
        .success();
    toolbox_cmd(&data)
        .args(["usage", "record", "base64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 total"));
    toolbox_cmd(&data)
        .args(["search", "add", "url", "encoder"])
        .assert()
        .success();

    let prefs = json_output(&data, &["prefs", "show"]);
    assert_eq!(prefs["usageHistory"][0]["toolId"], "base64");
    assert_eq!(prefs["usageHistory"][0]["usageCount"], 2);
    assert_eq!(prefs["searchHistory"][0], "url encoder");

    toolbox_cmd(&data).args(["search", "clear"]).assert().success();
    let prefs = json_output(&data, &["prefs", "show"]);
    assert_eq!(prefs["searchHistory"], serde_json::json!([]));
}

#[test]
fn test_prefs_export_reset_import() {
    let data = TempDir::new().unwrap();
    let export = data.path().join("backup").join("prefs.json");

    toolbox_cmd(&data)
        .args(["favorite", "add", "uuid"])
        .assert()
        .success();
    toolbox_cmd(&data)
        .args(["prefs", "export"])
        .arg(&export)
        .assert()
        .success();
    assert!(export.exists());

    toolbox_cmd(&data).args(["prefs", "reset"]).assert().success();
    toolbox_cmd(&data)
        .args(["favorite", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("none"));

    toolbox_cmd(&data)
        .args(["prefs", "import"])
        .arg(&export)
        .assert()
        .success();
    toolbox_cmd(&data)
        .args(["favorite", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("uuid"));
}

#[test]
fn test_prefs_import_rejects_non_object() {
    let data = TempDir::new().unwrap();
    let bad = data.path().join("bad.json");
    fs::write(&bad, "[1, 2, 3]").unwrap();

    toolbox_cmd(&data)
        .args(["prefs", "import"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid preferences export"));
}

#[test]
fn test_migrate_legacy_flat_data() {
    let data = TempDir::new().unwrap();
    fs::write(
        data.path().join("flat.json"),
        r#"{
            "toolbox-preferences": "{\"favoriteTools\":[\"legacy-tool\"]}",
            "snake-highscore": "120",
            "unrelated": "kept"
        }"#,
    )
    .unwrap();

    let result = json_output(&data, &["migrate"]);
    assert_eq!(result["success"], true);
    assert_eq!(result["skipped"], false);
    assert!(result["migratedItems"].as_u64().unwrap() >= 2);

    toolbox_cmd(&data)
        .args(["favorite", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy-tool"));

    toolbox_cmd(&data)
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to migrate."));

    let flat: Value =
        serde_json::from_str(&fs::read_to_string(data.path().join("flat.json")).unwrap()).unwrap();
    assert_eq!(flat["unrelated"], "kept");
    assert_eq!(flat["snake-highscore"], "120");
}

#[test]
fn test_restore_requires_confirmation() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .arg("restore")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_storage_threshold_is_saved() {
    let data = TempDir::new().unwrap();
    let storage = json_output(&data, &["storage", "--threshold", "90"]);
    assert_eq!(storage["settings"]["warningThreshold"], 90);
    assert!(storage["flat"]["quota"].as_u64().unwrap() > 0);

    let prefs = json_output(&data, &["prefs", "show"]);
    assert_eq!(prefs["storage"]["warningThreshold"], 90);

    toolbox_cmd(&data)
        .args(["storage", "--threshold", "101"])
        .assert()
        .failure();
}

#[test]
fn test_layout_set() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .args(["layout", "set", "--density", "compact", "--columns", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("compact density, 6 columns"));

    toolbox_cmd(&data)
        .args(["layout", "set"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing to change"));
}

#[test]
fn test_games_stats() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .args(["games", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("snake"))
        .stdout(predicate::str::contains("2048"))
        .stdout(predicate::str::contains("never"));

    let stats = json_output(&data, &["games", "stats", "tetris"]);
    assert_eq!(stats.as_array().unwrap().len(), 1);
    assert_eq!(stats[0]["game"], "tetris");
    assert_eq!(stats[0]["gamesPlayed"], 0);
}

#[test]
fn test_empty_records_list_and_export() {
    let data = TempDir::new().unwrap();
    toolbox_cmd(&data)
        .args(["identities", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No identities."));
    toolbox_cmd(&data)
        .args(["resources", "search", "physics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No resources."));

    toolbox_cmd(&data)
        .args(["identities", "export", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"First Name\""));

    let out = data.path().join("resources.json");
    toolbox_cmd(&data)
        .args(["resources", "export"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 0 resources"));
    let exported: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(exported, serde_json::json!([]));
}
