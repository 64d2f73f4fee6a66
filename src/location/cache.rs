//! File-based coordinate cache.
//!
//! Keys are the exact source URLs. Only successful resolutions are stored,
//! and nothing is evicted. Writes go to memory; `flush` persists them.

use super::types::{LatLng, Method};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CacheEntry {
    pub lat: f64,
    pub lng: f64,
    /// Method tag exactly as stored; tags this build does not know are kept.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
}

impl CacheEntry {
    pub fn point(&self) -> LatLng {
        LatLng { lat: self.lat, lng: self.lng }
    }

    /// Missing and unknown tags read as `Method::Cached`.
    pub fn method(&self) -> Method {
        Method::from(self.method.clone())
    }
}

/// The coordinate cache.
pub struct CoordinateCache {
    path: PathBuf,
    // Sorted so that an unchanged cache serializes to identical bytes.
    entries: BTreeMap<String, CacheEntry>,
    dirty: bool,
}

impl CoordinateCache {
    /// Load the cache at `path`. A missing or unreadable file starts empty.
    pub fn load_from(path: PathBuf) -> Self {
        let entries = match Self::read_file(&path) {
            Some(entries) => entries,
            None => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), "cache file unreadable, starting empty");
                }
                BTreeMap::new()
            }
        };
        Self { path, entries, dirty: false }
    }

    fn read_file(path: &Path) -> Option<BTreeMap<String, CacheEntry>> {
        let data = fs::read_to_string(path).ok()?;
        serde_json::from_str(&data).ok()
    }

    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    /// Record a successful resolution. Overwrites an entry for the same URL.
    pub fn put(&mut self, url: &str, point: LatLng, method: Method) {
        let entry = CacheEntry {
            lat: point.lat,
            lng: point.lng,
            method: method.tag().to_string(),
        };
        if self.entries.get(url) != Some(&entry) {
            self.entries.insert(url.to_string(), entry);
            self.dirty = true;
        }
    }

    /// Write pending changes to disk. Returns whether the file was written.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        self.dirty = false;
        Ok(true)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POINT: LatLng = LatLng { lat: 24.71, lng: 46.68 };

    fn test_cache() -> (CoordinateCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates_cache.json");
        (CoordinateCache::load_from(path), dir)
    }

    #[test]
    fn test_cache_put_get() {
        let (mut cache, _dir) = test_cache();
        cache.put("https://maps.google.com/@24.71,46.68", POINT, Method::AtCoords);

        let entry = cache.get("https://maps.google.com/@24.71,46.68").unwrap();
        assert_eq!(entry.point(), POINT);
        assert_eq!(entry.method(), Method::AtCoords);
    }

    #[test]
    fn test_cache_keys_are_exact() {
        let (mut cache, _dir) = test_cache();
        cache.put("https://goo.gl/maps/AbC", POINT, Method::S2Cell);
        assert!(cache.get("https://goo.gl/maps/abc").is_none());
        assert!(cache.get("https://goo.gl/maps/AbC/").is_none());
    }

    #[test]
    fn test_cache_miss() {
        let (cache, _dir) = test_cache();
        assert!(cache.get("nonexistent").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_does_not_touch_disk() {
        let (mut cache, _dir) = test_cache();
        cache.put("u", POINT, Method::AtCoords);
        assert!(!cache.path().exists());
        assert!(cache.flush().unwrap());
        assert!(cache.path().exists());
    }

    #[test]
    fn test_cache_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates_cache.json");

        {
            let mut cache = CoordinateCache::load_from(path.clone());
            cache.put("https://maps.app.goo.gl/x1", POINT, Method::PlusCode);
            cache.flush().unwrap();
        }

        let cache2 = CoordinateCache::load_from(path);
        assert_eq!(cache2.len(), 1);
        assert_eq!(cache2.get("https://maps.app.goo.gl/x1").unwrap().method(), Method::PlusCode);
    }

    #[test]
    fn test_clean_flush_leaves_file_alone() {
        let (mut cache, _dir) = test_cache();
        cache.put("a", POINT, Method::AtCoords);
        cache.flush().unwrap();
        let before = fs::read_to_string(cache.path()).unwrap();

        // same entry again is not a change
        cache.put("a", POINT, Method::AtCoords);
        assert!(!cache.flush().unwrap());
        assert_eq!(fs::read_to_string(cache.path()).unwrap(), before);
    }

    #[test]
    fn test_cache_without_method() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates_cache.json");
        fs::write(&path, r#"{ "https://goo.gl/maps/q": { "lat": 24.8, "lng": 46.6 } }"#).unwrap();

        let cache = CoordinateCache::load_from(path);
        let entry = cache.get("https://goo.gl/maps/q").unwrap();
        assert_eq!(entry.method(), Method::Cached);
        assert!((entry.lat - 24.8).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_method_survives_rewrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates_cache.json");
        fs::write(
            &path,
            r#"{
  "https://goo.gl/maps/old": { "lat": 24.8, "lng": 46.6, "method": "geocoder" },
  "https://goo.gl/maps/bare": { "lat": 24.7, "lng": 46.7 }
}"#,
        )
        .unwrap();

        let mut cache = CoordinateCache::load_from(path.clone());
        assert_eq!(cache.get("https://goo.gl/maps/old").unwrap().method(), Method::Cached);
        cache.put("https://goo.gl/maps/new", POINT, Method::AtCoords);
        assert!(cache.flush().unwrap());

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["https://goo.gl/maps/old"]["method"], "geocoder");
        assert!(raw["https://goo.gl/maps/bare"].get("method").is_none());
        assert_eq!(raw["https://goo.gl/maps/new"]["method"], "@coords");
    }

    #[test]
    fn test_corrupt_cache_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinates_cache.json");
        fs::write(&path, "{ truncated").unwrap();
        assert!(CoordinateCache::load_from(path).is_empty());
    }
}
