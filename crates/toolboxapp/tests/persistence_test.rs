use std::fs;
use tempfile::TempDir;
use toolboxapp::games::Game;
use toolboxapp::init::initialize;
use toolboxapp::prefs::model::{Density, LayoutPatch};
use toolboxapp::prefs::LoadSource;
use toolboxapp::records::identity::{Address, IdentityProfile};
use toolboxapp::store::flat::FlatStore;

fn legacy_flat(dir: &TempDir, items: &[(&str, &str)]) {
    let map: serde_json::Map<String, serde_json::Value> = items
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    fs::write(
        dir.path().join("flat.json"),
        serde_json::to_string(&map).unwrap(),
    )
    .unwrap();
}

#[test]
fn test_fresh_install_then_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(ctx.toolbox.start(), LoadSource::Defaults);
        let prefs = ctx.toolbox.preferences_mut();
        prefs.add_favorite("base64").unwrap();
        prefs.record_usage("base64").unwrap();
        prefs
            .update_layout(LayoutPatch {
                density: Some(Density::Spacious),
                grid_columns: Some(6),
            })
            .unwrap();
    }

    let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
    assert_eq!(ctx.toolbox.start(), LoadSource::Structured);
    let prefs = ctx.toolbox.preferences().preferences();
    assert_eq!(prefs.favorite_tools, vec!["base64"]);
    assert_eq!(prefs.usage_of("base64").unwrap().usage_count, 1);
    assert_eq!(prefs.layout.grid_columns, 6);
    assert!(!ctx.toolbox.migrator().needs_migration().unwrap());
}

#[test]
fn test_legacy_install_is_migrated_once() {
    let dir = TempDir::new().unwrap();
    legacy_flat(
        &dir,
        &[
            ("toolbox-preferences", r#"{"favoriteTools":["x"],"searchHistory":["pdf"]}"#),
            ("snake-highScore", "1200"),
            ("toolbox-translation-cache", "{}"),
        ],
    );

    let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
    assert!(ctx.toolbox.migrator().needs_migration().unwrap());
    ctx.toolbox.start();

    let prefs = ctx.toolbox.preferences().preferences();
    assert_eq!(prefs.favorite_tools, vec!["x"]);
    assert_eq!(prefs.search_history, vec!["pdf"]);

    let marker = ctx.toolbox.migrator().marker().unwrap().unwrap();
    assert!(marker.completed);
    assert_eq!(marker.migrated_items, 3);
    assert!(!ctx.toolbox.migrator().needs_migration().unwrap());

    // Legacy keys are left where they were
    assert_eq!(
        ctx.toolbox.flat().get_item("snake-highScore").unwrap().as_deref(),
        Some("1200")
    );
}

#[test]
fn test_restore_after_migration() {
    let dir = TempDir::new().unwrap();
    legacy_flat(&dir, &[("toolbox-preferences", r#"{"favoriteTools":["x"]}"#)]);

    let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
    ctx.toolbox.start();
    ctx.toolbox.preferences_mut().add_favorite("y").unwrap();

    let restored = ctx.toolbox.migrator().restore_pre_migration_data().unwrap();
    assert_eq!(restored, 1);
    assert_eq!(
        ctx.toolbox.flat().get_item("toolbox-preferences").unwrap().as_deref(),
        Some(r#"{"favoriteTools":["x"]}"#)
    );
    assert!(ctx.toolbox.migrator().needs_migration().unwrap());
}

#[test]
fn test_export_import_across_installs() {
    let source_dir = TempDir::new().unwrap();
    let target_dir = TempDir::new().unwrap();

    let mut source = initialize(Some(source_dir.path().to_path_buf())).unwrap();
    source.toolbox.start();
    source.toolbox.preferences_mut().add_favorite("qr").unwrap();
    source
        .toolbox
        .preferences_mut()
        .add_search_history("unicode")
        .unwrap();
    let blob = source.toolbox.preferences().export_snapshot().unwrap();

    let mut target = initialize(Some(target_dir.path().to_path_buf())).unwrap();
    target.toolbox.start();
    assert!(target.toolbox.preferences_mut().import_snapshot(&blob));
    assert_eq!(
        target.toolbox.preferences().preferences(),
        source.toolbox.preferences().preferences()
    );

    // And it survives a reopen
    let mut reopened = initialize(Some(target_dir.path().to_path_buf())).unwrap();
    reopened.toolbox.start();
    assert!(reopened.toolbox.preferences().preferences().is_favorite("qr"));
}

#[test]
fn test_records_and_games_persist() {
    let dir = TempDir::new().unwrap();
    {
        let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
        ctx.toolbox.start();
        ctx.toolbox
            .identities()
            .save(IdentityProfile {
                first_name: "Lee".to_string(),
                address: Address {
                    state_abbreviation: "TX".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
            .unwrap();
        ctx.toolbox
            .games()
            .record_result(Game::Minesweeper, 30, true)
            .unwrap();
    }

    let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
    ctx.toolbox.start();
    assert_eq!(ctx.toolbox.identities().by_state("tx").unwrap().len(), 1);
    assert_eq!(
        ctx.toolbox.games().stats(Game::Minesweeper).unwrap().games_won,
        1
    );
}

#[test]
fn test_config_file_changes_namespace() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("toolbox.toml"), "namespace = \"tb-\"\n").unwrap();

    let mut ctx = initialize(Some(dir.path().to_path_buf())).unwrap();
    assert_eq!(ctx.config.namespace, "tb-");
    ctx.toolbox.start();
    ctx.toolbox.preferences_mut().add_favorite("a").unwrap();
    assert!(ctx.toolbox.flat().get_item("tb-preferences").unwrap().is_some());
    assert!(ctx.toolbox.flat().get_item("toolbox-preferences").unwrap().is_none());
}
