use std::fs;
use std::path::{Path, PathBuf};

use bevy::prelude::*;

use reskin::bundle::BundleCache;
use reskin::bundle::format::BundleArchive;
use reskin::catalog::refresh::{
    ModelRefresh, RefreshCompleted, RefreshProgress, RefreshStarted, advance_model_refresh,
};
use reskin::catalog::{MANIFEST_FILE_NAME, ModelCatalog, ModelDirectory};

#[derive(Resource, Default)]
struct Captured {
    started: usize,
    completed: usize,
    progress: Vec<String>,
}

fn capture_events(
    mut started: MessageReader<RefreshStarted>,
    mut progress: MessageReader<RefreshProgress>,
    mut completed: MessageReader<RefreshCompleted>,
    mut captured: ResMut<Captured>,
) {
    captured.started += started.read().count();
    captured.completed += completed.read().count();
    captured
        .progress
        .extend(progress.read().map(|event| event.message.clone()));
}

fn scratch_root(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("reskin-refresh-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// One bundle directory with a manifest; `with_prefab` controls whether the
/// container actually carries the prefab the manifest promises.
fn write_bundle_dir(root: &Path, name: &str, model_id: &str, with_prefab: bool) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let manifest = format!(
        r#"{{"BundleName":"{name}","BundlePath":"pack.bundle","Models":[{{"Id":"{model_id}","Name":"{model_id}","PrefabPath":"prefabs/{model_id}.glb","ThumbnailPath":""}}]}}"#
    );
    fs::write(dir.join(MANIFEST_FILE_NAME), manifest).unwrap();
    let prefab_name = format!("prefabs/{model_id}.glb");
    let assets: Vec<(&str, &[u8])> = if with_prefab {
        vec![(prefab_name.as_str(), b"scene")]
    } else {
        Vec::new()
    };
    fs::write(dir.join("pack.bundle"), BundleArchive::encode(assets)).unwrap();
}

fn test_app(root: &Path) -> App {
    let mut app = App::new();
    app.insert_resource(ModelDirectory {
        root: root.to_path_buf(),
    })
    .init_resource::<ModelCatalog>()
    .init_resource::<BundleCache>()
    .init_resource::<ModelRefresh>()
    .init_resource::<Captured>()
    .add_message::<RefreshStarted>()
    .add_message::<RefreshProgress>()
    .add_message::<RefreshCompleted>()
    .add_systems(Update, (advance_model_refresh, capture_events).chain());
    app
}

fn run_until_idle(app: &mut App) {
    for _ in 0..256 {
        app.update();
        if !app.world().resource::<ModelRefresh>().is_refreshing() {
            return;
        }
    }
    panic!("refresh never settled");
}

#[test]
fn completion_before_any_refresh_resolves_immediately() {
    let refresh = ModelRefresh::default();
    assert!(refresh.completion_handle().is_finished());
}

#[test]
fn refresh_probes_and_filters_the_catalog() {
    let root = scratch_root("filter");
    write_bundle_dir(&root, "ducks", "duck", true);
    write_bundle_dir(&root, "ghosts", "ghost", false);
    let mut app = test_app(&root);

    let handle = app
        .world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(None);
    run_until_idle(&mut app);

    assert!(handle.is_finished());
    let catalog = app.world().resource::<ModelCatalog>();
    assert!(catalog.find_model("duck").is_some());
    assert!(catalog.find_model("ghost").is_none());
    assert_eq!(catalog.total_models(), 1);

    let captured = app.world().resource::<Captured>();
    assert_eq!(captured.started, 1);
    assert_eq!(captured.completed, 1);
    assert!(
        captured
            .progress
            .iter()
            .any(|message| message.starts_with("Loading... ("))
    );
}

#[test]
fn priority_model_reports_a_distinguished_message() {
    let root = scratch_root("priority");
    write_bundle_dir(&root, "ducks", "duck", true);
    let mut app = test_app(&root);

    app.world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(Some("duck".into()));
    run_until_idle(&mut app);

    let captured = app.world().resource::<Captured>();
    assert!(
        captured
            .progress
            .iter()
            .any(|message| message == "Loading priority model: duck")
    );
}

#[test]
fn newer_refresh_supersedes_the_running_one() {
    let root = scratch_root("supersede");
    write_bundle_dir(&root, "ducks", "duck", true);
    let mut app = test_app(&root);

    let first = app
        .world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(None);
    app.update();
    assert_eq!(app.world().resource::<Captured>().started, 1);
    assert!(!first.is_finished());

    let second = app
        .world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(None);
    assert!(!first.is_finished());
    app.update();
    // The superseded session settles before the replacement makes progress.
    assert!(first.is_finished());
    assert!(!second.is_finished());
    assert_eq!(app.world().resource::<Captured>().completed, 1);
    assert_eq!(app.world().resource::<Captured>().started, 2);

    run_until_idle(&mut app);
    assert!(second.is_finished());
    assert_eq!(app.world().resource::<Captured>().completed, 2);
}

#[test]
fn cancelled_refresh_still_finalizes() {
    let root = scratch_root("cancel");
    write_bundle_dir(&root, "ducks", "duck", true);
    let mut app = test_app(&root);

    let handle = app
        .world_mut()
        .resource_mut::<ModelRefresh>()
        .refresh_model_list(None);
    app.update();
    app.world().resource::<ModelRefresh>().cancel_refresh();
    app.update();

    assert!(handle.is_finished());
    assert!(!app.world().resource::<ModelRefresh>().is_refreshing());
    assert_eq!(app.world().resource::<Captured>().completed, 1);
}
