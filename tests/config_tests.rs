//! Integration tests for configuration persistence

use appvol::config::{Action, Config, ConfigStore};
use std::fs;
use tempfile::TempDir;

fn config_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("appvol").join("config.json")
}

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);

    let store = ConfigStore::load(path.clone());

    assert!(path.exists(), "load must create the file on disk");
    assert_eq!(*store.config(), Config::default());

    let on_disk: Config = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, Config::default());
}

#[test]
fn corrupt_file_is_replaced_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ this is not json").unwrap();

    let store = ConfigStore::load(path.clone());
    assert_eq!(*store.config(), Config::default());

    // The broken document must have been rewritten as valid JSON.
    let on_disk: Config = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, Config::default());
}

#[test]
fn partial_document_falls_back_per_action() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
        &path,
        r#"{ "hotkeys": { "mute": ["ctrl", "shift", "m"] } }"#,
    )
    .unwrap();

    let store = ConfigStore::load(path);

    assert_eq!(store.binding(Action::Mute), vec!["ctrl", "shift", "m"]);
    assert_eq!(
        store.binding(Action::VolumeUp),
        Action::VolumeUp.default_binding()
    );
    assert_eq!(
        store.config().overlay_timeout_ms(),
        Config::default().overlay_timeout_ms()
    );
}

#[test]
fn set_binding_writes_through_to_disk() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);

    let mut store = ConfigStore::load(path.clone());
    store.set_binding(
        Action::VolumeDown,
        vec!["ctrl".into(), "alt".into(), "j".into()],
    );

    let reloaded = ConfigStore::load(path);
    assert_eq!(reloaded.binding(Action::VolumeDown), vec!["ctrl", "alt", "j"]);
    // Untouched actions keep their defaults.
    assert_eq!(
        reloaded.binding(Action::VolumeUp),
        Action::VolumeUp.default_binding()
    );
}

#[test]
fn gui_section_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = config_path(&dir);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, r#"{ "gui": { "opacity": 0.6, "timeout": 1500 } }"#).unwrap();

    let store = ConfigStore::load(path.clone());
    assert_eq!(store.config().overlay_opacity(), 0.6);
    assert_eq!(store.config().overlay_timeout_ms(), 1500);

    store.save();
    let reloaded = ConfigStore::load(path);
    assert_eq!(reloaded.config().overlay_opacity(), 0.6);
}
