//! Search orchestration: lookup, cache fallback and recents bookkeeping.
//!
//! The controller owns all screen state and hands out `SearchSnapshot`
//! copies. State lives behind a mutex that is never held across an
//! `.await`, so searches can be polled concurrently; a generation counter
//! decides which completion is allowed to apply its result.

use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use skycast_core::{Config, KeyValueStore, SqliteStore};
use std::sync::Arc;

use crate::cache::WeatherCache;
use crate::client::WeatherClient;
use crate::recents::RecentSearchStore;
use crate::types::{WeatherError, WeatherView};

const CACHED_ADVISORY: &str = "Showing cached data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Immutable view of the controller state after an operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    pub phase: SearchPhase,
    /// Current input text
    pub query: String,
    pub weather: Option<WeatherView>,
    /// Hard failure message; weather is cleared when set
    pub error: Option<String>,
    /// Soft failure shown next to cached weather
    pub advisory: Option<String>,
    pub recents: Vec<String>,
    /// Pull-to-refresh in progress; the current weather stays on screen
    pub refreshing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchKind {
    Fresh,
    Refresh,
}

#[derive(Debug, Default)]
struct ControllerState {
    snapshot: SearchSnapshot,
    generation: u64,
    /// Lowercased city of the search currently in flight
    in_flight: Option<String>,
}

pub struct SearchController {
    client: WeatherClient,
    recents: RecentSearchStore,
    cache: WeatherCache,
    state: Mutex<ControllerState>,
}

impl SearchController {
    /// Build a controller; recent searches are loaded immediately.
    pub fn new(client: WeatherClient, recents: RecentSearchStore, cache: WeatherCache) -> Self {
        let snapshot = SearchSnapshot {
            recents: recents.load(),
            ..SearchSnapshot::default()
        };

        Self {
            client,
            recents,
            cache,
            state: Mutex::new(ControllerState {
                snapshot,
                ..ControllerState::default()
            }),
        }
    }

    /// Wire a controller from configuration, opening the local database.
    pub fn open(config: &Config) -> anyhow::Result<Self> {
        let path = config.database_path();
        let store: Arc<dyn KeyValueStore> = Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("Failed to open database at {}", path.display()))?,
        );
        let client = WeatherClient::new(&config.weather).context("Failed to build HTTP client")?;

        tracing::info!("Weather controller ready ({})", path.display());
        Ok(Self::new(
            client,
            RecentSearchStore::new(store.clone(), &config.recents),
            WeatherCache::new(store),
        ))
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn set_query(&self, text: &str) {
        self.state.lock().snapshot.query = text.to_string();
    }

    /// Search `city_override`, or the current query when `None`.
    ///
    /// Blank targets are ignored, as is any search started while another
    /// city is loading. The returned snapshot is always in a terminal phase
    /// unless the call was ignored.
    pub async fn search(&self, city_override: Option<&str>) -> SearchSnapshot {
        self.run(city_override, SearchKind::Fresh).await
    }

    /// Re-run the search for the city on screen without clearing it.
    pub async fn refresh(&self) -> SearchSnapshot {
        let city = {
            let state = self.state.lock();
            match &state.snapshot.weather {
                Some(view) => view.city.clone(),
                None => return state.snapshot.clone(),
            }
        };
        self.run(Some(&city), SearchKind::Refresh).await
    }

    pub fn clear_recents(&self) -> Result<SearchSnapshot, WeatherError> {
        self.recents.clear()?;
        let mut state = self.state.lock();
        state.snapshot.recents.clear();
        Ok(state.snapshot.clone())
    }

    async fn run(&self, city_override: Option<&str>, kind: SearchKind) -> SearchSnapshot {
        let (city, generation) = {
            let mut state = self.state.lock();
            let city = city_override
                .unwrap_or(state.snapshot.query.as_str())
                .trim()
                .to_string();
            if city.is_empty() {
                return state.snapshot.clone();
            }

            let key = city.to_lowercase();
            if state.snapshot.phase == SearchPhase::Loading {
                let same_city = state.in_flight.as_deref() == Some(key.as_str());
                if kind != SearchKind::Refresh || !same_city {
                    tracing::debug!("Ignoring search for {:?}, another search is loading", city);
                    return state.snapshot.clone();
                }
            }

            state.generation += 1;
            state.in_flight = Some(key);
            let snapshot = &mut state.snapshot;
            snapshot.phase = SearchPhase::Loading;
            snapshot.error = None;
            snapshot.advisory = None;
            snapshot.refreshing = kind == SearchKind::Refresh;
            (city, state.generation)
        };

        let mut guard = LoadingGuard {
            state: &self.state,
            generation,
            armed: true,
        };

        let result = self.client.fetch_current(&city).await;

        {
            let mut state = self.state.lock();
            guard.armed = false;
            if state.generation != generation {
                tracing::debug!("Discarding stale result for {:?}", city);
                return state.snapshot.clone();
            }
            // Loading with nothing in flight: no search can start until this one is applied
            state.in_flight = None;
        }

        let outcome = match result {
            Ok(current) => {
                let view = WeatherView::from_current(&current, Utc::now());
                let recents = self.remember(&view.city);
                if let Err(e) = self.cache.save(&view) {
                    tracing::warn!("Failed to cache weather for {}: {}", view.city, e);
                }
                Outcome::Fresh { view, recents }
            }
            Err(e) => {
                tracing::warn!("Weather lookup for {:?} failed: {}", city, e);
                match self.cache.load(&city) {
                    Some(view) => {
                        tracing::info!("Showing cached weather for {}", view.city);
                        let recents = self.remember(&view.city);
                        Outcome::Cached {
                            view,
                            recents,
                            advisory: format!("{} {}", e.user_message(), CACHED_ADVISORY),
                        }
                    }
                    None => Outcome::Failed(e.user_message().to_string()),
                }
            }
        };

        let mut state = self.state.lock();
        let snapshot = &mut state.snapshot;
        match outcome {
            Outcome::Fresh { view, recents } => {
                snapshot.phase = SearchPhase::Success;
                snapshot.weather = Some(view);
                snapshot.query.clear();
                if let Some(list) = recents {
                    snapshot.recents = list;
                }
            }
            Outcome::Cached {
                view,
                recents,
                advisory,
            } => {
                snapshot.phase = SearchPhase::Success;
                snapshot.weather = Some(view);
                snapshot.advisory = Some(advisory);
                if let Some(list) = recents {
                    snapshot.recents = list;
                }
            }
            Outcome::Failed(message) => {
                snapshot.phase = SearchPhase::Error;
                snapshot.error = Some(message);
                snapshot.weather = None;
            }
        }

        snapshot.refreshing = false;
        snapshot.clone()
    }

    /// Push `city` onto recents. `None` on a storage failure, so the
    /// displayed list stays as it was.
    fn remember(&self, city: &str) -> Option<Vec<String>> {
        match self.recents.add(city) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!("Failed to update recent searches: {}", e);
                None
            }
        }
    }
}

/// What a finished lookup puts on screen.
enum Outcome {
    Fresh {
        view: WeatherView,
        recents: Option<Vec<String>>,
    },
    Cached {
        view: WeatherView,
        recents: Option<Vec<String>>,
        advisory: String,
    },
    Failed(String),
}

/// Settles a search whose future was dropped before completing, so the
/// controller never stays stuck in `Loading`.
struct LoadingGuard<'a> {
    state: &'a Mutex<ControllerState>,
    generation: u64,
    armed: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.state.lock();
        if state.generation != self.generation || state.snapshot.phase != SearchPhase::Loading {
            return;
        }

        tracing::debug!("Search cancelled before completion");
        state.in_flight = None;
        let snapshot = &mut state.snapshot;
        snapshot.refreshing = false;
        snapshot.phase = if snapshot.weather.is_some() {
            SearchPhase::Success
        } else {
            SearchPhase::Idle
        };
    }
}
