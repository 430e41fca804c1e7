//! Minimal container realization of the opaque bundle format: a magic tag, a
//! JSON asset index, then the raw blob region. Everything beyond this
//! path→handle contract is out of scope for the crate.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const BUNDLE_MAGIC: [u8; 4] = *b"MBF1";

const HEADER_LEN: usize = BUNDLE_MAGIC.len() + 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    name: String,
    offset: u64,
    len: u64,
}

/// Parsed, in-memory bundle contents.
#[derive(Debug, Default)]
pub struct BundleArchive {
    asset_names: Vec<String>,
    assets: HashMap<String, Vec<u8>>,
}

impl BundleArchive {
    /// Constructs an archive from raw file bytes. Returns `None` for any
    /// structural inconsistency; the caller reports the failure.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN || bytes[..4] != BUNDLE_MAGIC {
            return None;
        }
        let index_len = u32::from_le_bytes(bytes[4..8].try_into().ok()?) as usize;
        let data_start = HEADER_LEN.checked_add(index_len)?;
        if data_start > bytes.len() {
            return None;
        }
        let entries: Vec<IndexEntry> =
            serde_json::from_slice(&bytes[HEADER_LEN..data_start]).ok()?;

        let data = &bytes[data_start..];
        let mut archive = BundleArchive::default();
        for entry in entries {
            let start = usize::try_from(entry.offset).ok()?;
            let end = start.checked_add(usize::try_from(entry.len).ok()?)?;
            if end > data.len() {
                return None;
            }
            archive
                .assets
                .insert(entry.name.clone(), data[start..end].to_vec());
            archive.asset_names.push(entry.name);
        }
        Some(archive)
    }

    /// Serializes assets into container bytes; the inverse of [`parse`].
    /// Used by bundle authoring tools and tests.
    pub fn encode<'a>(assets: impl IntoIterator<Item = (&'a str, &'a [u8])>) -> Vec<u8> {
        let mut entries = Vec::new();
        let mut data = Vec::new();
        for (name, blob) in assets {
            entries.push(IndexEntry {
                name: name.to_string(),
                offset: data.len() as u64,
                len: blob.len() as u64,
            });
            data.extend_from_slice(blob);
        }
        let index = serde_json::to_vec(&entries).unwrap_or_default();

        let mut bytes = Vec::with_capacity(HEADER_LEN + index.len() + data.len());
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        bytes.extend_from_slice(&(index.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&index);
        bytes.extend_from_slice(&data);
        bytes
    }

    /// All asset names, in index order.
    pub fn asset_names(&self) -> &[String] {
        &self.asset_names
    }

    /// Case-insensitive exact match against the asset-name listing.
    pub fn contains_asset(&self, asset_path: &str) -> bool {
        self.asset_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(asset_path))
    }

    /// Asset bytes; exact match first, then case-insensitive.
    pub fn asset_bytes(&self, asset_path: &str) -> Option<&[u8]> {
        if let Some(bytes) = self.assets.get(asset_path) {
            return Some(bytes);
        }
        self.asset_names
            .iter()
            .find(|name| name.eq_ignore_ascii_case(asset_path))
            .and_then(|name| self.assets.get(name))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_parse_preserves_assets() {
        let bytes = BundleArchive::encode([
            ("assets/duck.glb", b"glb-bytes".as_slice()),
            ("thumbs/duck.png", b"png-bytes".as_slice()),
        ]);
        let archive = BundleArchive::parse(&bytes).unwrap();
        assert_eq!(archive.asset_names().len(), 2);
        assert_eq!(archive.asset_bytes("assets/duck.glb"), Some(b"glb-bytes".as_slice()));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let bytes = BundleArchive::encode([("Assets/Duck.glb", b"x".as_slice())]);
        let archive = BundleArchive::parse(&bytes).unwrap();
        assert!(archive.contains_asset("assets/duck.glb"));
        assert_eq!(archive.asset_bytes("ASSETS/DUCK.GLB"), Some(b"x".as_slice()));
        assert!(!archive.contains_asset("assets/goose.glb"));
    }

    #[test]
    fn rejects_wrong_magic_and_truncated_index() {
        assert!(BundleArchive::parse(b"NOPE\0\0\0\0").is_none());
        let mut bytes = BundleArchive::encode([("a", b"1".as_slice())]);
        bytes.truncate(10);
        assert!(BundleArchive::parse(&bytes).is_none());
    }

    #[test]
    fn rejects_blob_out_of_bounds() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&BUNDLE_MAGIC);
        let index = br#"[{"name":"a","offset":0,"len":100}]"#;
        bytes.extend_from_slice(&(index.len() as u32).to_le_bytes());
        bytes.extend_from_slice(index);
        bytes.extend_from_slice(b"short");
        assert!(BundleArchive::parse(&bytes).is_none());
    }
}
