use std::fs;
use std::path::PathBuf;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, TaskPool};

use reskin::catalog::ModelDirectory;
use reskin::settings::{ModSettings, SettingsResource};
use reskin::{BundleCache, CustomModelsEnabled, ModelCatalog, ModelRefresh, ReskinPlugin};

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reskin-plugin-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn test_app(name: &str) -> App {
    IoTaskPool::get_or_init(TaskPool::new);
    let dir = scratch_dir(name);
    let mut app = App::new();
    app.add_plugins((
        AssetPlugin::default(),
        ReskinPlugin::new(dir.join("models"))
            .with_settings_path(dir.join("settings.yaml")),
    ));
    app.init_asset::<Scene>();
    app
}

#[test]
fn plugin_registers_resources_and_writes_default_settings() {
    let dir = scratch_dir("register");
    fs::create_dir_all(dir.join("models")).unwrap();
    IoTaskPool::get_or_init(TaskPool::new);
    let mut app = App::new();
    app.add_plugins((
        AssetPlugin::default(),
        ReskinPlugin::new(dir.join("models")).with_settings_path(dir.join("settings.yaml")),
    ));
    app.init_asset::<Scene>();

    assert!(dir.join("settings.yaml").is_file());
    assert_eq!(
        app.world().resource::<SettingsResource>().current,
        ModSettings::default()
    );
    assert_eq!(
        app.world().resource::<ModelDirectory>().root,
        dir.join("models")
    );
    assert!(app.world().contains_resource::<ModelCatalog>());
    assert!(app.world().contains_resource::<BundleCache>());
    assert!(app.world().contains_resource::<ModelRefresh>());
    assert!(app.world().resource::<CustomModelsEnabled>().0);

    // A full frame runs with nothing spawned.
    app.update();
}

#[test]
fn toggle_key_flips_the_master_switch() {
    let mut app = test_app("toggle");
    app.update();
    assert!(app.world().resource::<CustomModelsEnabled>().0);

    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(KeyCode::Backslash);
    app.update();
    assert!(!app.world().resource::<CustomModelsEnabled>().0);

    // Held key does not re-toggle.
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .clear_just_pressed(KeyCode::Backslash);
    app.update();
    assert!(!app.world().resource::<CustomModelsEnabled>().0);

    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .reset_all();
    app.world_mut()
        .resource_mut::<ButtonInput<KeyCode>>()
        .press(KeyCode::Backslash);
    app.update();
    assert!(app.world().resource::<CustomModelsEnabled>().0);
}

#[test]
fn refresh_runs_inside_the_plugin_pipeline() {
    let mut app = test_app("refresh");
    fs::create_dir_all(
        app.world()
            .resource::<ModelDirectory>()
            .root
            .clone(),
    )
    .unwrap();

    let handle = app
        .world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(None);
    for _ in 0..16 {
        app.update();
        if !app.world().resource::<ModelRefresh>().is_refreshing() {
            break;
        }
    }
    assert!(handle.is_finished());
    assert_eq!(app.world().resource::<ModelCatalog>().total_models(), 0);
}
