//! Bundle loader: loads opaque model-bundle containers from disk, caches one
//! live handle per normalized path, and extracts prefabs and thumbnails.
//!
//! Every failure is logged with path context and degrades to `None`/`false`;
//! nothing here ever panics across the public boundary or stalls the frame
//! loop with anything beyond the requested synchronous read.

pub mod format;

use crate::catalog::{ModelBundleInfo, ModelInfo};
use bevy::prelude::*;
use format::BundleArchive;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Subdirectory, next to each bundle, where prefab blobs are extracted so the
/// host asset server can load them as scenes.
pub const PREFAB_CACHE_DIR: &str = ".prefab-cache";

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle file not found at '{path}'", path = path.display())]
    NotFound { path: PathBuf },
    #[error("failed to construct bundle handle from '{path}'", path = path.display())]
    LoadFailure { path: PathBuf },
    #[error("i/o fault reading '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A live bundle handle. Owned exclusively by the [`BundleCache`]; callers
/// only ever hold transient references.
#[derive(Debug)]
pub struct LoadedBundle {
    path: PathBuf,
    prefab_cache_dir: PathBuf,
    archive: BundleArchive,
}

impl LoadedBundle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn asset_names(&self) -> &[String] {
        self.archive.asset_names()
    }

    pub fn contains_asset(&self, asset_path: &str) -> bool {
        self.archive.contains_asset(asset_path)
    }

    pub fn asset_bytes(&self, asset_path: &str) -> Option<&[u8]> {
        self.archive.asset_bytes(asset_path)
    }
}

/// Process-wide bundle cache, owned by the `App` as a resource. Mutation only
/// ever happens from systems holding `ResMut`, so no internal locking is
/// required to keep the one-handle-per-path invariant.
#[derive(Resource, Debug, Default)]
pub struct BundleCache {
    loaded: HashMap<PathBuf, LoadedBundle>,
}

impl BundleCache {
    /// Returns the cached handle for the bundle, loading it from disk on a
    /// miss or when `force_reload` is set. A reload always evicts and drops
    /// the prior handle for the path before installing the new one.
    pub fn get_or_load(
        &mut self,
        bundle_info: &ModelBundleInfo,
        force_reload: bool,
    ) -> Option<&LoadedBundle> {
        let resolved = normalize_path(&bundle_info.bundle_file_path());
        if !force_reload && self.loaded.contains_key(&resolved) {
            return self.loaded.get(&resolved);
        }
        match self.load_into_cache(bundle_info, &resolved) {
            Ok(()) => self.loaded.get(&resolved),
            Err(error) => {
                error!("bundle loader: {error}");
                None
            }
        }
    }

    fn load_into_cache(
        &mut self,
        bundle_info: &ModelBundleInfo,
        resolved: &Path,
    ) -> Result<(), BundleError> {
        if bundle_info.bundle_path.is_empty() || !resolved.is_file() {
            return Err(BundleError::NotFound {
                path: resolved.to_path_buf(),
            });
        }
        let bytes = fs::read(resolved).map_err(|source| BundleError::Io {
            path: resolved.to_path_buf(),
            source,
        })?;
        let archive = BundleArchive::parse(&bytes).ok_or_else(|| BundleError::LoadFailure {
            path: resolved.to_path_buf(),
        })?;

        // Unload any previous handle for this path before installing the new
        // one; the cache never holds two handles for one path.
        self.loaded.remove(resolved);
        self.loaded.insert(
            resolved.to_path_buf(),
            LoadedBundle {
                path: resolved.to_path_buf(),
                prefab_cache_dir: bundle_info.directory_path.join(PREFAB_CACHE_DIR),
                archive,
            },
        );
        Ok(())
    }

    pub fn is_loaded(&self, bundle_info: &ModelBundleInfo) -> bool {
        self.loaded
            .contains_key(&normalize_path(&bundle_info.bundle_file_path()))
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Releases every cached handle. With `unload_loaded_objects` set, the
    /// prefab files previously extracted from each bundle are deleted too;
    /// otherwise already-spawned scenes keep loading from them.
    pub fn unload_all(&mut self, unload_loaded_objects: bool) {
        for (_, bundle) in self.loaded.drain() {
            if unload_loaded_objects && bundle.prefab_cache_dir.is_dir() {
                if let Err(error) = fs::remove_dir_all(&bundle.prefab_cache_dir) {
                    warn!(
                        "failed to clear prefab cache '{}': {}",
                        bundle.prefab_cache_dir.display(),
                        error
                    );
                }
            }
        }
    }

    /// Raw bytes of a named asset. Non-fatal on a missing asset: logged and
    /// `None`.
    pub fn load_asset_bytes(
        &mut self,
        bundle_info: &ModelBundleInfo,
        asset_path: &str,
    ) -> Option<Vec<u8>> {
        let bundle = self.get_or_load(bundle_info, false)?;
        match bundle.asset_bytes(asset_path) {
            Some(bytes) => Some(bytes.to_vec()),
            None => {
                error!(
                    "failed to load asset '{}' from bundle '{}'",
                    asset_path, bundle_info.bundle_path
                );
                None
            }
        }
    }

    /// Extracts the model's prefab blob into the bundle's prefab cache and
    /// returns the file path for the host asset server to load a scene from.
    pub fn load_model_prefab(
        &mut self,
        bundle_info: &ModelBundleInfo,
        model_info: &ModelInfo,
    ) -> Option<PathBuf> {
        let bytes = self.load_asset_bytes(bundle_info, &model_info.prefab_path)?;
        let cache_dir = bundle_info.directory_path.join(PREFAB_CACHE_DIR);
        if let Err(error) = fs::create_dir_all(&cache_dir) {
            error!(
                "failed to create prefab cache '{}': {}",
                cache_dir.display(),
                error
            );
            return None;
        }
        let out_path = cache_dir.join(sanitize_asset_file_name(&model_info.prefab_path));
        match fs::write(&out_path, &bytes) {
            Ok(()) => Some(out_path),
            Err(error) => {
                error!(
                    "failed to extract prefab '{}' to '{}': {}",
                    model_info.prefab_path,
                    out_path.display(),
                    error
                );
                None
            }
        }
    }

    /// Decodes the model's thumbnail. Resolution policy, preserved exactly:
    /// empty path → none; absolute path → filesystem only; otherwise the
    /// in-bundle asset (case-insensitive name match) wins, falling back to a
    /// loose file beside the bundle directory.
    pub fn load_thumbnail_texture(
        &mut self,
        bundle_info: &ModelBundleInfo,
        model_info: &ModelInfo,
    ) -> Option<image::DynamicImage> {
        if model_info.thumbnail_path.is_empty() {
            return None;
        }
        let thumbnail_path = Path::new(&model_info.thumbnail_path);
        if thumbnail_path.is_absolute() {
            return load_texture_from_file(thumbnail_path);
        }

        let in_bundle_bytes = {
            match self.get_or_load(bundle_info, false) {
                Some(bundle) if bundle.contains_asset(&model_info.thumbnail_path) => bundle
                    .asset_bytes(&model_info.thumbnail_path)
                    .map(<[u8]>::to_vec),
                _ => None,
            }
        };
        if let Some(bytes) = in_bundle_bytes {
            match image::load_from_memory(&bytes) {
                Ok(texture) => return Some(texture),
                Err(error) => {
                    error!(
                        "failed to decode in-bundle thumbnail '{}': {}",
                        model_info.thumbnail_path, error
                    );
                }
            }
        }

        let external_path = bundle_info.directory_path.join(&model_info.thumbnail_path);
        if external_path.is_file() {
            return load_texture_from_file(&external_path);
        }
        None
    }

    /// Existence probe through the bundle's asset-name listing; never
    /// materializes the asset itself.
    pub fn check_prefab_exists(
        &mut self,
        bundle_info: &ModelBundleInfo,
        model_info: &ModelInfo,
    ) -> bool {
        if model_info.prefab_path.is_empty() {
            return false;
        }
        self.get_or_load(bundle_info, false)
            .map(|bundle| bundle.contains_asset(&model_info.prefab_path))
            .unwrap_or(false)
    }
}

fn load_texture_from_file(path: &Path) -> Option<image::DynamicImage> {
    if !path.is_file() {
        error!("thumbnail file not found: '{}'", path.display());
        return None;
    }
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            error!("failed to read thumbnail '{}': {}", path.display(), error);
            return None;
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(texture) => Some(texture),
        Err(error) => {
            error!("failed to decode thumbnail '{}': {}", path.display(), error);
            None
        }
    }
}

/// Lexical path normalization: strips `.` segments and resolves `..` without
/// touching the filesystem, so the cache keys stay stable however callers
/// spell the path.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn sanitize_asset_file_name(asset_path: &str) -> String {
    asset_path
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            other => other,
        })
        .collect()
}
