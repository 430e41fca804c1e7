//! In-memory registry of discovered model bundles.
//!
//! A bundle directory is any subdirectory of the model root containing a
//! `bundleinfo.json` manifest next to the bundle container file. Directories
//! with a missing or malformed manifest are simply absent from the catalog.

pub mod refresh;

use bevy::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE_NAME: &str = "bundleinfo.json";

/// One model entry inside a bundle manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub prefab_path: String,
    /// Either an in-bundle asset path, a path relative to the bundle
    /// directory, or an absolute filesystem path.
    pub thumbnail_path: String,
}

impl ModelInfo {
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.name.trim().is_empty()
            && !self.prefab_path.trim().is_empty()
    }
}

/// Manifest of one bundle directory. Immutable after load apart from
/// [`ModelBundleInfo::filtered_copy`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModelBundleInfo {
    pub bundle_name: String,
    /// Container file path relative to the bundle directory.
    pub bundle_path: String,
    pub models: Vec<ModelInfo>,
    /// Absolute directory the manifest was loaded from; never serialized.
    #[serde(skip)]
    pub directory_path: PathBuf,
}

impl ModelBundleInfo {
    /// Parses `bundleinfo.json` from `directory`, filtering out invalid model
    /// entries. Returns `None` (after logging) when the manifest is missing
    /// or malformed.
    pub fn load_from_directory(directory: &Path) -> Option<Self> {
        let manifest_path = directory.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return None;
        }
        let raw = match fs::read_to_string(&manifest_path) {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    "failed to read manifest '{}': {}",
                    manifest_path.display(),
                    error
                );
                return None;
            }
        };
        match serde_json::from_str::<ModelBundleInfo>(&raw) {
            Ok(mut info) => {
                info.directory_path = directory.to_path_buf();
                info.models.retain(ModelInfo::is_valid);
                Some(info)
            }
            Err(error) => {
                warn!(
                    "malformed manifest '{}': {}",
                    manifest_path.display(),
                    error
                );
                None
            }
        }
    }

    /// Projects a subset of models without mutating this bundle.
    pub fn filtered_copy(&self, models: Vec<ModelInfo>) -> Self {
        Self {
            bundle_name: self.bundle_name.clone(),
            bundle_path: self.bundle_path.clone(),
            models,
            directory_path: self.directory_path.clone(),
        }
    }

    /// Absolute path of the bundle container file.
    pub fn bundle_file_path(&self) -> PathBuf {
        self.directory_path.join(&self.bundle_path)
    }
}

/// Root directory scanned for bundle subdirectories.
#[derive(Resource, Debug, Clone)]
pub struct ModelDirectory {
    pub root: PathBuf,
}

/// The catalog of every discovered bundle, in directory-name order.
#[derive(Resource, Debug, Default)]
pub struct ModelCatalog {
    pub bundles: Vec<ModelBundleInfo>,
}

impl ModelCatalog {
    /// Re-enumerates bundle directories under `root`. Fast: directory listing
    /// and manifest parsing only, no bundle loads.
    pub fn rescan(&mut self, root: &Path) {
        self.bundles.clear();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(
                    "failed to enumerate model directory '{}': {}",
                    root.display(),
                    error
                );
                return;
            }
        };
        let mut directories: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        directories.sort();
        for directory in directories {
            if let Some(info) = ModelBundleInfo::load_from_directory(&directory) {
                self.bundles.push(info);
            }
        }
    }

    /// Looks a model id up across every bundle, returning catalog indices.
    pub fn find_model(&self, model_id: &str) -> Option<(usize, usize)> {
        for (bundle_index, bundle) in self.bundles.iter().enumerate() {
            if let Some(model_index) = bundle.models.iter().position(|model| model.id == model_id)
            {
                return Some((bundle_index, model_index));
            }
        }
        None
    }

    pub fn model(&self, pair: (usize, usize)) -> Option<(&ModelBundleInfo, &ModelInfo)> {
        let bundle = self.bundles.get(pair.0)?;
        let model = bundle.models.get(pair.1)?;
        Some((bundle, model))
    }

    pub fn total_models(&self) -> usize {
        self.bundles.iter().map(|bundle| bundle.models.len()).sum()
    }

    /// Every (bundle, model) index pair in catalog order.
    pub fn model_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::with_capacity(self.total_models());
        for (bundle_index, bundle) in self.bundles.iter().enumerate() {
            for model_index in 0..bundle.models.len() {
                pairs.push((bundle_index, model_index));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "BundleName": "ducks",
        "BundlePath": "ducks.bundle",
        "Models": [
            {"Id": "duck.classic", "Name": "Classic", "PrefabPath": "assets/classic.glb", "ThumbnailPath": "thumbs/classic.png"},
            {"Id": "", "Name": "Invalid", "PrefabPath": "assets/invalid.glb", "ThumbnailPath": ""},
            {"Id": "duck.tux", "Name": "Tux", "PrefabPath": "assets/tux.glb", "ThumbnailPath": ""}
        ]
    }"#;

    #[test]
    fn manifest_parse_filters_invalid_models() {
        let mut info: ModelBundleInfo = serde_json::from_str(MANIFEST).unwrap();
        info.models.retain(ModelInfo::is_valid);
        assert_eq!(info.bundle_name, "ducks");
        assert_eq!(info.models.len(), 2);
        assert_eq!(info.models[0].id, "duck.classic");
        assert_eq!(info.models[1].id, "duck.tux");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let info: ModelBundleInfo = serde_json::from_str("{}").unwrap();
        assert!(info.bundle_name.is_empty());
        assert!(info.models.is_empty());
    }

    #[test]
    fn filtered_copy_keeps_original_intact() {
        let mut info: ModelBundleInfo = serde_json::from_str(MANIFEST).unwrap();
        info.models.retain(ModelInfo::is_valid);
        let copy = info.filtered_copy(vec![info.models[0].clone()]);
        assert_eq!(copy.models.len(), 1);
        assert_eq!(info.models.len(), 2);
        assert_eq!(copy.bundle_name, info.bundle_name);
    }

    #[test]
    fn find_model_scans_bundles_in_order() {
        let mut info: ModelBundleInfo = serde_json::from_str(MANIFEST).unwrap();
        info.models.retain(ModelInfo::is_valid);
        let catalog = ModelCatalog {
            bundles: vec![info],
        };
        assert_eq!(catalog.find_model("duck.tux"), Some((0, 1)));
        assert_eq!(catalog.find_model("duck.unknown"), None);
        assert_eq!(catalog.total_models(), 2);
        assert_eq!(catalog.model_pairs(), vec![(0, 0), (0, 1)]);
    }
}
