//! Last successfully fetched weather per city, for offline display.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use skycast_core::{KeyValueStore, StorageError};
use std::sync::Arc;

use crate::types::{WeatherError, WeatherView};

pub const WEATHER_CACHE_KEY: &str = "weather_cache_v1";

/// Map of lowercased city name → `WeatherView`, persisted as one JSON object.
pub struct WeatherCache {
    store: Arc<dyn KeyValueStore>,
    lock: Mutex<()>,
}

impl WeatherCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Store `view` under its city, replacing any previous entry.
    ///
    /// A view with a blank city is ignored. Other cities' entries are kept
    /// as-is, even ones this version can no longer parse. If the existing
    /// record cannot be read, nothing is written.
    pub fn save(&self, view: &WeatherView) -> Result<(), WeatherError> {
        let key = cache_key(&view.city);
        if key.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock();
        let mut entries = self.read_map()?.unwrap_or_default();

        let value = serde_json::to_value(view)
            .map_err(|e| WeatherError::CacheUnavailable(e.to_string()))?;
        entries.insert(key, value);

        let json = serde_json::to_string(&entries)
            .map_err(|e| WeatherError::CacheUnavailable(e.to_string()))?;
        self.store.set(WEATHER_CACHE_KEY, &json)?;
        Ok(())
    }

    /// Cached view for `city`, matched case- and whitespace-insensitively.
    ///
    /// Missing, corrupt or unreadable data is a miss.
    pub fn load(&self, city: &str) -> Option<WeatherView> {
        let key = cache_key(city);
        if key.is_empty() {
            return None;
        }

        let _guard = self.lock.lock();
        let mut entries = match self.read_map() {
            Ok(entries) => entries?,
            Err(e) => {
                tracing::warn!("Weather cache unavailable: {}", e);
                return None;
            }
        };
        let entry = entries.remove(&key)?;

        match serde_json::from_value(entry) {
            Ok(view) => Some(view),
            Err(e) => {
                tracing::warn!("Cached weather for {:?} is unreadable: {}", key, e);
                None
            }
        }
    }

    /// `Ok(None)` when the record is absent or corrupt. A corrupt record is
    /// replaced by the next save.
    fn read_map(&self) -> Result<Option<Map<String, Value>>, StorageError> {
        let Some(raw) = self.store.get(WEATHER_CACHE_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                tracing::warn!("Weather cache record is corrupt, treating as empty");
                Ok(None)
            }
        }
    }
}

fn cache_key(city: &str) -> String {
    city.trim().to_lowercase()
}
