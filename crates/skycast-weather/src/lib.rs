//! City weather lookup for Skycast
//!
//! Geocodes a city name and fetches current conditions from the Open-Meteo
//! API, keeping a list of recent searches and the last-known weather per
//! city for offline display.

pub mod cache;
pub mod client;
pub mod condition;
pub mod controller;
pub mod recents;
pub mod types;

pub use cache::WeatherCache;
pub use client::WeatherClient;
pub use condition::{ConditionStyle, WeatherCondition};
pub use controller::{SearchController, SearchPhase, SearchSnapshot};
pub use recents::RecentSearchStore;
pub use types::*;
