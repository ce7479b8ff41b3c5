use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

pub const POINTS_TABLE_KEY: &str = "points_table";

/// Flat JSON key-value store under the configured cache directory,
/// backing the stale-while-revalidate points table. Policy: no TTL —
/// readers get whatever was written last, and every successful fetch
/// overwrites the entry. Corrupt or missing entries read as a miss.
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for_key(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = fs::read_to_string(self.path_for_key(key)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding unreadable cache entry {key}: {err}");
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(err) = self.try_write(key, value) {
            warn!("cache write for {key} failed: {err}");
        }
    }

    fn try_write<T: Serialize>(&self, key: &str, value: &T) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let json = serde_json::to_string(value).map_err(io::Error::other)?;
        fs::write(self.path_for_key(key), json)
    }
}

pub fn cache_root(base: &Path, cache_dir: &str) -> PathBuf {
    base.join(cache_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointsRow;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn scratch_cache() -> DiskCache {
        let unique = format!(
            "fozlava-cache-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        DiskCache::new(std::env::temp_dir().join(unique))
    }

    #[test]
    fn write_then_read_round_trips_points_rows() {
        let cache = scratch_cache();
        let rows = vec![
            PointsRow {
                team: "Team A".to_string(),
                total_points: 120.0,
            },
            PointsRow {
                team: "Team B".to_string(),
                total_points: 95.0,
            },
        ];
        cache.write(POINTS_TABLE_KEY, &rows);
        let read: Vec<PointsRow> = cache.read(POINTS_TABLE_KEY).unwrap();
        assert_eq!(read, rows);
    }

    #[test]
    fn missing_and_corrupt_entries_read_as_miss() {
        let cache = scratch_cache();
        assert!(cache.read::<Vec<PointsRow>>(POINTS_TABLE_KEY).is_none());

        fs::create_dir_all(cache.path_for_key("x").parent().unwrap()).unwrap();
        fs::write(cache.path_for_key(POINTS_TABLE_KEY), "not json").unwrap();
        assert!(cache.read::<Vec<PointsRow>>(POINTS_TABLE_KEY).is_none());
    }

    #[test]
    fn overwrite_replaces_the_entry() {
        let cache = scratch_cache();
        cache.write(POINTS_TABLE_KEY, &vec![PointsRow {
            team: "Stale".to_string(),
            total_points: 1.0,
        }]);
        cache.write(POINTS_TABLE_KEY, &vec![PointsRow {
            team: "Fresh".to_string(),
            total_points: 2.0,
        }]);
        let read: Vec<PointsRow> = cache.read(POINTS_TABLE_KEY).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].team, "Fresh");
    }
}
