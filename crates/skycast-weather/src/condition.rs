//! WMO weather code → display condition.
//! See: https://open-meteo.com/en/docs#weathervariables

use serde::{Deserialize, Serialize};

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";

/// Condition buckets shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Fog,
    Rainy,
    Snowy,
    Thunderstorm,
    Unknown,
}

impl WeatherCondition {
    /// Bucket a WMO code. Total: anything unrecognised is `Unknown`.
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::Clear,
            1..=3 => Self::PartlyCloudy,
            45..=48 => Self::Fog,
            51..=65 | 80..=82 => Self::Rainy,
            71..=77 | 85..=86 => Self::Snowy,
            c if c >= 95 => Self::Thunderstorm,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Fog => "Fog",
            Self::Rainy => "Rainy",
            Self::Snowy => "Snowy",
            Self::Thunderstorm => "Thunderstorm",
            Self::Unknown => "Unknown",
        }
    }

    /// Icon name for the UI icon set
    pub fn icon_name(&self, is_day: bool) -> &'static str {
        match (self, is_day) {
            (Self::Clear, true) => "sun",
            (Self::Clear, false) => "moon",
            (Self::PartlyCloudy, true) => "cloud_sun",
            (Self::PartlyCloudy, false) => "cloud_moon",
            (Self::Fog, true) => "cloud_fog",
            (Self::Fog, false) => "cloud_fog_moon",
            (Self::Rainy, true) => "cloud_rain",
            (Self::Rainy, false) => "cloud_moon_rain",
            (Self::Snowy, true) => "cloud_snow",
            (Self::Snowy, false) => "cloud_moon_snow",
            (Self::Thunderstorm, true) => "cloud_lightning",
            (Self::Thunderstorm, false) => "cloud_moon_lightning",
            (Self::Unknown, _) => "question",
        }
    }

    /// Two-digit OpenWeatherMap icon code, if the bucket has artwork
    fn owm_icon(&self) -> Option<&'static str> {
        match self {
            Self::Clear => Some("01"),
            Self::PartlyCloudy => Some("02"),
            Self::Fog => Some("50"),
            Self::Rainy => Some("10"),
            Self::Snowy => Some("13"),
            Self::Thunderstorm => Some("11"),
            Self::Unknown => None,
        }
    }

    /// Background gradient, top color first
    pub fn palette(&self, is_day: bool) -> [&'static str; 2] {
        match (self, is_day) {
            (Self::Clear, true) => ["#4A90E2", "#87CEFA"],
            (Self::Clear, false) => ["#0B1026", "#2B3A67"],
            (Self::PartlyCloudy, true) => ["#6A8CAF", "#B0C4DE"],
            (Self::PartlyCloudy, false) => ["#1C2331", "#414E66"],
            (Self::Fog, true) => ["#9EA7B0", "#D3D8DC"],
            (Self::Fog, false) => ["#3A4047", "#5F676F"],
            (Self::Rainy, true) => ["#4B6584", "#778CA3"],
            (Self::Rainy, false) => ["#1E272E", "#3D4E5C"],
            (Self::Snowy, true) => ["#A5C8E4", "#E8F1F8"],
            (Self::Snowy, false) => ["#2C3E50", "#6C7A89"],
            (Self::Thunderstorm, true) => ["#4A4E69", "#9A8C98"],
            (Self::Thunderstorm, false) => ["#141420", "#3A3A55"],
            (Self::Unknown, _) => ["#2F3542", "#57606F"],
        }
    }
}

/// Everything the UI needs to render a condition
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionStyle {
    pub condition: WeatherCondition,
    pub label: &'static str,
    pub icon_id: &'static str,
    pub icon_url: Option<String>,
    pub palette: [&'static str; 2],
}

/// Map a WMO code and day/night flag to its display style. Never fails.
pub fn map(code: i32, is_day: bool) -> ConditionStyle {
    let condition = WeatherCondition::from_wmo_code(code);
    let suffix = if is_day { "d" } else { "n" };

    ConditionStyle {
        condition,
        label: condition.label(),
        icon_id: condition.icon_name(is_day),
        icon_url: condition
            .owm_icon()
            .map(|icon| format!("{}/{}{}@4x.png", ICON_URL_BASE, icon, suffix)),
        palette: condition.palette(is_day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: [WeatherCondition; 6] = [
        WeatherCondition::Clear,
        WeatherCondition::PartlyCloudy,
        WeatherCondition::Fog,
        WeatherCondition::Rainy,
        WeatherCondition::Snowy,
        WeatherCondition::Thunderstorm,
    ];

    #[test]
    fn test_reference_codes() {
        assert_eq!(map(0, true).label, "Clear");
        assert_eq!(map(2, true).label, "Partly Cloudy");
        assert_eq!(map(46, true).label, "Fog");
        assert_eq!(map(60, true).label, "Rainy");
        assert_eq!(map(75, true).label, "Snowy");
        assert_eq!(map(96, true).label, "Thunderstorm");
    }

    #[test]
    fn test_wmo_code_ranges() {
        assert_eq!(WeatherCondition::from_wmo_code(1), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(3), WeatherCondition::PartlyCloudy);
        assert_eq!(WeatherCondition::from_wmo_code(45), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(48), WeatherCondition::Fog);
        assert_eq!(WeatherCondition::from_wmo_code(51), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_wmo_code(65), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_wmo_code(80), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_wmo_code(82), WeatherCondition::Rainy);
        assert_eq!(WeatherCondition::from_wmo_code(71), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_wmo_code(77), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_wmo_code(85), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_wmo_code(86), WeatherCondition::Snowy);
        assert_eq!(WeatherCondition::from_wmo_code(95), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_wmo_code(99), WeatherCondition::Thunderstorm);
        assert_eq!(WeatherCondition::from_wmo_code(1000), WeatherCondition::Thunderstorm);
    }

    #[test]
    fn test_gaps_are_unknown() {
        for code in [-1, 4, 44, 49, 66, 70, 78, 79, 83, 84, 87, 94, i32::MIN] {
            assert_eq!(
                WeatherCondition::from_wmo_code(code),
                WeatherCondition::Unknown,
                "code {}",
                code
            );
        }
    }

    #[test]
    fn test_total_over_wide_range() {
        for code in -500..=500 {
            for is_day in [true, false] {
                let style = map(code, is_day);
                assert!(!style.label.is_empty());
                assert!(!style.icon_id.is_empty());
            }
        }
        assert!(!map(i32::MAX, true).label.is_empty());
        assert!(!map(i32::MIN, false).label.is_empty());
    }

    #[test]
    fn test_unknown_is_neutral() {
        let day = map(4, true);
        let night = map(4, false);
        assert_eq!(day.condition, WeatherCondition::Unknown);
        assert_eq!(day.icon_id, "question");
        assert!(day.icon_url.is_none());
        assert_eq!(day.palette, night.palette);
    }

    #[test]
    fn test_day_and_night_variants_differ() {
        for condition in KNOWN {
            assert_ne!(condition.icon_name(true), condition.icon_name(false), "{:?}", condition);
            assert_ne!(condition.palette(true), condition.palette(false), "{:?}", condition);
        }
        assert_ne!(map(0, true).icon_url, map(0, false).icon_url);
    }

    #[test]
    fn test_icon_url_suffix() {
        assert_eq!(
            map(61, true).icon_url.as_deref(),
            Some("https://openweathermap.org/img/wn/10d@4x.png")
        );
        assert_eq!(
            map(61, false).icon_url.as_deref(),
            Some("https://openweathermap.org/img/wn/10n@4x.png")
        );
    }
}
