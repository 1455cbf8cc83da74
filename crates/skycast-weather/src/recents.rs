//! Bounded, most-recent-first list of searched cities.

use parking_lot::Mutex;
use skycast_core::{KeyValueStore, RecentsConfig, StorageError};
use std::sync::Arc;

use crate::types::WeatherError;

pub const RECENTS_KEY: &str = "recents_v1";
/// Unversioned key written by earlier releases
pub const LEGACY_RECENTS_KEY: &str = "@weather_app_recent_searches";

pub struct RecentSearchStore {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    seed: Vec<String>,
    // Serializes read-modify-write so concurrent adds don't drop entries
    lock: Mutex<()>,
}

impl RecentSearchStore {
    pub fn new(store: Arc<dyn KeyValueStore>, config: &RecentsConfig) -> Self {
        Self {
            store,
            capacity: config.capacity.max(1),
            seed: config.seed.clone(),
            lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persisted list, or the seed list if nothing was ever saved.
    ///
    /// Unreadable or corrupt data is treated as an empty list.
    pub fn load(&self) -> Vec<String> {
        let _guard = self.lock.lock();
        self.load_locked().unwrap_or_else(|e| {
            tracing::warn!("Failed to read recent searches: {}", e);
            Vec::new()
        })
    }

    /// Move `city` to the front, dropping any case-insensitive duplicate.
    ///
    /// Blank input leaves the list untouched and returns it. Fails without
    /// writing if the stored list cannot be read.
    pub fn add(&self, city: &str) -> Result<Vec<String>, WeatherError> {
        let _guard = self.lock.lock();
        let current = self.load_locked()?;

        let clean = city.trim();
        if clean.is_empty() {
            return Ok(current);
        }

        let mut next = Vec::with_capacity(self.capacity);
        next.push(clean.to_string());
        next.extend(current.into_iter().filter(|c| !same_city(c, clean)));
        next.truncate(self.capacity);

        self.persist(&next)?;
        Ok(next)
    }

    /// Erase the list. The seed is not restored afterwards.
    pub fn clear(&self) -> Result<(), WeatherError> {
        let _guard = self.lock.lock();
        self.persist(&[])?;
        self.store.remove(LEGACY_RECENTS_KEY)?;
        tracing::info!("Cleared recent searches");
        Ok(())
    }

    /// Read errors propagate; a corrupt record reads as empty.
    fn load_locked(&self) -> Result<Vec<String>, StorageError> {
        let Some(raw) = self.store.get(RECENTS_KEY)? else {
            return Ok(self
                .migrate_legacy()?
                .unwrap_or_else(|| self.normalize(self.seed.clone())));
        };

        match parse_list(&raw) {
            Some(list) => Ok(self.normalize(list)),
            None => {
                tracing::warn!("Recent searches record is corrupt, starting empty");
                Ok(Vec::new())
            }
        }
    }

    fn migrate_legacy(&self) -> Result<Option<Vec<String>>, StorageError> {
        let Some(raw) = self.store.get(LEGACY_RECENTS_KEY)? else {
            return Ok(None);
        };
        let Some(parsed) = parse_list(&raw) else {
            return Ok(None);
        };

        let list = self.normalize(parsed);
        if let Err(e) = self.persist(&list) {
            tracing::warn!("Failed to migrate legacy recent searches: {}", e);
            return Ok(Some(list));
        }
        if let Err(e) = self.store.remove(LEGACY_RECENTS_KEY) {
            tracing::warn!("Failed to remove legacy recent searches: {}", e);
        }

        tracing::info!("Migrated {} recent searches from legacy storage", list.len());
        Ok(Some(list))
    }

    fn persist(&self, list: &[String]) -> Result<(), WeatherError> {
        let json = serde_json::to_string(list)
            .map_err(|e| WeatherError::CacheUnavailable(e.to_string()))?;
        self.store.set(RECENTS_KEY, &json)?;
        Ok(())
    }

    /// Trim, drop blanks and duplicates, keep at most `capacity`.
    fn normalize(&self, list: Vec<String>) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.capacity);
        for city in list {
            let clean = city.trim();
            if clean.is_empty() || out.iter().any(|c| same_city(c, clean)) {
                continue;
            }
            out.push(clean.to_string());
            if out.len() == self.capacity {
                break;
            }
        }
        out
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// JSON array of strings; non-string items are skipped. `None` if the
/// record is not a JSON array at all.
fn parse_list(raw: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
    )
}
