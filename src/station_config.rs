//! # Station Marker Configuration
//!
//! Centralized rules for turning station data into marker appearance:
//! availability thresholds, the color palette, size presets, and the
//! accessibility sentence read by screen readers.
//!
//! Every table here has a default constant and an override type whose
//! fields are all optional. Merging an override fills each unset field from
//! the default table, so a configuration file only needs to name the values
//! it changes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Discrete availability bucket derived from a bike count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityLevel {
    Good,
    Medium,
    Low,
    Empty,
}

impl AvailabilityLevel {
    pub const ALL: [AvailabilityLevel; 4] = [
        AvailabilityLevel::Good,
        AvailabilityLevel::Medium,
        AvailabilityLevel::Low,
        AvailabilityLevel::Empty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AvailabilityLevel::Good => "good",
            AvailabilityLevel::Medium => "medium",
            AvailabilityLevel::Low => "low",
            AvailabilityLevel::Empty => "empty",
        }
    }
}

impl fmt::Display for AvailabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a station is in service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    #[default]
    Active,
    Inactive,
}

/// Marker size keyword.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl MarkerSize {
    /// Pick a size from the viewport.
    ///
    /// Large needs both a wide screen and a high-density display; without a
    /// known viewport (no window, e.g. server-side rendering) the medium
    /// size is used.
    pub fn responsive(viewport_width: Option<u32>, pixel_ratio: f64) -> Self {
        let Some(width) = viewport_width else {
            return MarkerSize::Medium;
        };

        if width >= 1200 && pixel_ratio >= 2.0 {
            MarkerSize::Large
        } else if width >= 768 {
            MarkerSize::Medium
        } else {
            MarkerSize::Small
        }
    }
}

impl FromStr for MarkerSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(MarkerSize::Small),
            "medium" => Ok(MarkerSize::Medium),
            "large" => Ok(MarkerSize::Large),
            other => Err(format!("unknown marker size: {other}")),
        }
    }
}

/// Bike-count thresholds separating availability levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationThresholds {
    /// Above this a station has good availability
    pub good: u32,
    /// Upper bound of the medium bucket
    pub medium: u32,
    /// Upper bound of the low bucket (zero is always empty)
    pub low: u32,
}

pub const DEFAULT_THRESHOLDS: StationThresholds = StationThresholds {
    good: 5,
    medium: 3,
    low: 1,
};

impl Default for StationThresholds {
    fn default() -> Self {
        DEFAULT_THRESHOLDS
    }
}

/// Display colors per availability level plus the out-of-service color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationColors {
    pub good: String,
    pub medium: String,
    pub low: String,
    pub empty: String,
    pub inactive: String,
}

impl StationColors {
    /// Color for a level, or the inactive color for stations out of service.
    pub fn color_for(&self, level: AvailabilityLevel, status: StationStatus) -> &str {
        if status == StationStatus::Inactive {
            return &self.inactive;
        }

        match level {
            AvailabilityLevel::Good => &self.good,
            AvailabilityLevel::Medium => &self.medium,
            AvailabilityLevel::Low => &self.low,
            AvailabilityLevel::Empty => &self.empty,
        }
    }
}

impl Default for StationColors {
    fn default() -> Self {
        Self {
            good: "#22C55E".to_string(),     // green-500
            medium: "#EAB308".to_string(),   // yellow-500
            low: "#F97316".to_string(),      // orange-500
            empty: "#EF4444".to_string(),    // red-500
            inactive: "#9CA3AF".to_string(), // gray-400
        }
    }
}

/// Diameter and font sizes for one marker size, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSizeConfig {
    pub diameter: u32,
    pub font_size: u32,
    pub small_font_size: u32,
    pub padding: Option<u32>,
}

/// Size presets for the three size keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSizes {
    pub small: MarkerSizeConfig,
    pub medium: MarkerSizeConfig,
    pub large: MarkerSizeConfig,
}

pub const DEFAULT_SIZES: MarkerSizes = MarkerSizes {
    small: MarkerSizeConfig {
        diameter: 32,
        font_size: 12,
        small_font_size: 8,
        padding: Some(4),
    },
    medium: MarkerSizeConfig {
        diameter: 40,
        font_size: 14,
        small_font_size: 9,
        padding: Some(6),
    },
    large: MarkerSizeConfig {
        diameter: 48,
        font_size: 16,
        small_font_size: 10,
        padding: Some(8),
    },
};

impl MarkerSizes {
    pub fn get(&self, size: MarkerSize) -> MarkerSizeConfig {
        match size {
            MarkerSize::Small => self.small,
            MarkerSize::Medium => self.medium,
            MarkerSize::Large => self.large,
        }
    }
}

impl Default for MarkerSizes {
    fn default() -> Self {
        DEFAULT_SIZES
    }
}

/// Size preset for a keyword from the default table.
pub fn size_config(size: MarkerSize) -> MarkerSizeConfig {
    DEFAULT_SIZES.get(size)
}

/// Map a bike count to its availability level.
///
/// Evaluated in order: zero is empty, then `<= low`, then `<= medium`,
/// anything above is good. The `good` threshold does not take part.
pub fn availability_level(available_bikes: u32, thresholds: &StationThresholds) -> AvailabilityLevel {
    if available_bikes == 0 {
        AvailabilityLevel::Empty
    } else if available_bikes <= thresholds.low {
        AvailabilityLevel::Low
    } else if available_bikes <= thresholds.medium {
        AvailabilityLevel::Medium
    } else {
        AvailabilityLevel::Good
    }
}

/// Color for a bike count, honoring the station status.
pub fn color_for_availability<'a>(
    available_bikes: u32,
    status: StationStatus,
    colors: &'a StationColors,
    thresholds: &StationThresholds,
) -> &'a str {
    colors.color_for(availability_level(available_bikes, thresholds), status)
}

// -- Overrides --

/// Partial thresholds; unset fields keep their default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    pub good: Option<u32>,
    pub medium: Option<u32>,
    pub low: Option<u32>,
}

impl ThresholdOverrides {
    pub fn apply(&self, base: &StationThresholds) -> StationThresholds {
        StationThresholds {
            good: self.good.unwrap_or(base.good),
            medium: self.medium.unwrap_or(base.medium),
            low: self.low.unwrap_or(base.low),
        }
    }
}

/// Partial palette; unset fields keep their default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorOverrides {
    pub good: Option<String>,
    pub medium: Option<String>,
    pub low: Option<String>,
    pub empty: Option<String>,
    pub inactive: Option<String>,
}

impl ColorOverrides {
    pub fn apply(&self, base: &StationColors) -> StationColors {
        let pick = |custom: &Option<String>, default: &String| {
            custom.clone().unwrap_or_else(|| default.clone())
        };

        StationColors {
            good: pick(&self.good, &base.good),
            medium: pick(&self.medium, &base.medium),
            low: pick(&self.low, &base.low),
            empty: pick(&self.empty, &base.empty),
            inactive: pick(&self.inactive, &base.inactive),
        }
    }
}

/// Partial preset for a single size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeConfigOverrides {
    pub diameter: Option<u32>,
    pub font_size: Option<u32>,
    pub small_font_size: Option<u32>,
    pub padding: Option<u32>,
}

impl SizeConfigOverrides {
    pub fn apply(&self, base: &MarkerSizeConfig) -> MarkerSizeConfig {
        MarkerSizeConfig {
            diameter: self.diameter.unwrap_or(base.diameter),
            font_size: self.font_size.unwrap_or(base.font_size),
            small_font_size: self.small_font_size.unwrap_or(base.small_font_size),
            padding: self.padding.or(base.padding),
        }
    }
}

/// Partial size table; each size is merged independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeOverrides {
    #[serde(default)]
    pub small: SizeConfigOverrides,
    #[serde(default)]
    pub medium: SizeConfigOverrides,
    #[serde(default)]
    pub large: SizeConfigOverrides,
}

impl SizeOverrides {
    pub fn apply(&self, base: &MarkerSizes) -> MarkerSizes {
        MarkerSizes {
            small: self.small.apply(&base.small),
            medium: self.medium.apply(&base.medium),
            large: self.large.apply(&base.large),
        }
    }
}

pub fn merge_thresholds(custom: &ThresholdOverrides) -> StationThresholds {
    custom.apply(&DEFAULT_THRESHOLDS)
}

pub fn merge_colors(custom: &ColorOverrides) -> StationColors {
    custom.apply(&StationColors::default())
}

pub fn merge_sizes(custom: &SizeOverrides) -> MarkerSizes {
    custom.apply(&DEFAULT_SIZES)
}

// -- Accessibility --

/// Language of the accessibility sentence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLocale {
    #[default]
    French,
    English,
}

impl FromStr for LabelLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fr" | "french" => Ok(LabelLocale::French),
            "en" | "english" => Ok(LabelLocale::English),
            other => Err(format!("unknown locale: {other}")),
        }
    }
}

fn plural(count: u32) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

/// Sentence describing a station for screen readers.
///
/// The level is computed with the default thresholds. Both locales append
/// a plural "s" only when a count is greater than one, so zero stays
/// singular.
///
/// # Example
/// ```
/// use vlille_lib::station_config::{accessibility_label, LabelLocale};
///
/// let label = accessibility_label(1, 3, Some("Gare"), LabelLocale::French);
/// assert_eq!(
///     label,
///     "Station Gare. Faible disponibilité. 1 vélo et 3 places disponibles."
/// );
/// ```
pub fn accessibility_label(
    available_bikes: u32,
    available_spots: u32,
    station_name: Option<&str>,
    locale: LabelLocale,
) -> String {
    let level = availability_level(available_bikes, &DEFAULT_THRESHOLDS);
    let bikes_s = plural(available_bikes);
    let spots_s = plural(available_spots);

    match locale {
        LabelLocale::French => {
            let level_text = match level {
                AvailabilityLevel::Good => "Bonne disponibilité",
                AvailabilityLevel::Medium => "Disponibilité moyenne",
                AvailabilityLevel::Low => "Faible disponibilité",
                AvailabilityLevel::Empty => "Aucun vélo disponible",
            };
            let base = station_name
                .map(|name| format!("Station {name}. "))
                .unwrap_or_default();

            format!(
                "{base}{level_text}. {available_bikes} vélo{bikes_s} et {available_spots} place{spots_s} disponible{spots_s}."
            )
        }
        LabelLocale::English => {
            let level_text = match level {
                AvailabilityLevel::Good => "Good availability",
                AvailabilityLevel::Medium => "Medium availability",
                AvailabilityLevel::Low => "Low availability",
                AvailabilityLevel::Empty => "No bikes available",
            };
            let base = station_name
                .map(|name| format!("Station {name}. "))
                .unwrap_or_default();

            format!(
                "{base}{level_text}. {available_bikes} bike{bikes_s} and {available_spots} dock{spots_s} available."
            )
        }
    }
}

/// Structural check that a JSON record can be treated as a station.
///
/// Requires a string `station_id` and numeric `lat`, `lon`,
/// `num_bikes_available`, `num_docks_available`. Unknown fields are ignored
/// and no bounds are checked.
pub fn is_valid_station(candidate: &Value) -> bool {
    let Some(record) = candidate.as_object() else {
        return false;
    };

    let is_number = |key: &str| record.get(key).is_some_and(Value::is_number);

    record.get("station_id").is_some_and(Value::is_string)
        && is_number("lat")
        && is_number("lon")
        && is_number("num_bikes_available")
        && is_number("num_docks_available")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_availability_levels_with_defaults() {
        let t = DEFAULT_THRESHOLDS;
        assert_eq!(availability_level(0, &t), AvailabilityLevel::Empty);
        assert_eq!(availability_level(1, &t), AvailabilityLevel::Low);
        assert_eq!(availability_level(2, &t), AvailabilityLevel::Medium);
        assert_eq!(availability_level(3, &t), AvailabilityLevel::Medium);
        assert_eq!(availability_level(4, &t), AvailabilityLevel::Good);
        assert_eq!(availability_level(500, &t), AvailabilityLevel::Good);
    }

    #[test]
    fn test_availability_levels_follow_thresholds() {
        let t = StationThresholds {
            good: 10,
            medium: 8,
            low: 2,
        };
        for n in 1..=2 {
            assert_eq!(availability_level(n, &t), AvailabilityLevel::Low);
        }
        for n in 3..=8 {
            assert_eq!(availability_level(n, &t), AvailabilityLevel::Medium);
        }
        assert_eq!(availability_level(9, &t), AvailabilityLevel::Good);
    }

    #[test]
    fn test_inactive_color_ignores_level() {
        let colors = StationColors::default();
        for level in AvailabilityLevel::ALL {
            assert_eq!(colors.color_for(level, StationStatus::Inactive), "#9CA3AF");
        }
    }

    #[test]
    fn test_default_palette() {
        let colors = StationColors::default();
        let t = DEFAULT_THRESHOLDS;
        assert_eq!(
            color_for_availability(10, StationStatus::Active, &colors, &t),
            "#22C55E"
        );
        assert_eq!(
            color_for_availability(0, StationStatus::Active, &colors, &t),
            "#EF4444"
        );
        assert_eq!(
            colors.color_for(AvailabilityLevel::Medium, StationStatus::Active),
            "#EAB308"
        );
        assert_eq!(
            colors.color_for(AvailabilityLevel::Low, StationStatus::Active),
            "#F97316"
        );
    }

    #[test]
    fn test_size_presets() {
        assert_eq!(size_config(MarkerSize::Small).diameter, 32);
        assert_eq!(size_config(MarkerSize::Medium).diameter, 40);
        assert_eq!(size_config(MarkerSize::Large).diameter, 48);
        assert_eq!(size_config(MarkerSize::Large).small_font_size, 10);
    }

    #[test]
    fn test_merge_thresholds_keeps_unset_defaults() {
        let merged = merge_thresholds(&ThresholdOverrides {
            low: Some(2),
            ..Default::default()
        });
        assert_eq!(merged.good, 5);
        assert_eq!(merged.medium, 3);
        assert_eq!(merged.low, 2);
    }

    #[test]
    fn test_merge_colors_replaces_only_named_keys() {
        let merged = merge_colors(&ColorOverrides {
            good: Some("#00FF00".to_string()),
            ..Default::default()
        });
        assert_eq!(merged.good, "#00FF00");
        assert_eq!(merged.empty, "#EF4444");
        assert_eq!(merged.inactive, "#9CA3AF");
    }

    #[test]
    fn test_merge_sizes_merges_each_size_independently() {
        let merged = merge_sizes(&SizeOverrides {
            small: SizeConfigOverrides {
                diameter: Some(30),
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(merged.small.diameter, 30);
        assert_eq!(merged.small.font_size, 12);
        assert_eq!(merged.small.padding, Some(4));
        assert_eq!(merged.medium, DEFAULT_SIZES.medium);
        assert_eq!(merged.large, DEFAULT_SIZES.large);
    }

    #[test]
    fn test_responsive_size() {
        assert_eq!(MarkerSize::responsive(None, 3.0), MarkerSize::Medium);
        assert_eq!(MarkerSize::responsive(Some(1440), 2.0), MarkerSize::Large);
        assert_eq!(MarkerSize::responsive(Some(1440), 1.0), MarkerSize::Medium);
        assert_eq!(MarkerSize::responsive(Some(768), 1.0), MarkerSize::Medium);
        assert_eq!(MarkerSize::responsive(Some(390), 3.0), MarkerSize::Small);
    }

    #[test]
    fn test_marker_size_from_str() {
        assert_eq!("Large".parse::<MarkerSize>(), Ok(MarkerSize::Large));
        assert!("huge".parse::<MarkerSize>().is_err());
    }

    #[test]
    fn test_accessibility_label_pluralization() {
        let label = accessibility_label(1, 3, Some("Gare"), LabelLocale::French);
        assert!(label.contains("1 vélo et 3 places disponibles."));
        assert!(label.starts_with("Station Gare. "));

        let label = accessibility_label(7, 1, None, LabelLocale::French);
        assert_eq!(
            label,
            "Bonne disponibilité. 7 vélos et 1 place disponible."
        );

        let label = accessibility_label(0, 0, None, LabelLocale::French);
        assert_eq!(
            label,
            "Aucun vélo disponible. 0 vélo et 0 place disponible."
        );
    }

    #[test]
    fn test_accessibility_label_english() {
        let label = accessibility_label(2, 5, Some("Gare"), LabelLocale::English);
        assert_eq!(
            label,
            "Station Gare. Medium availability. 2 bikes and 5 docks available."
        );
    }

    #[test]
    fn test_is_valid_station() {
        let valid = json!({
            "station_id": "36",
            "lat": 50.63,
            "lon": 3.07,
            "num_bikes_available": 4,
            "num_docks_available": 12,
            "extra": "ignored"
        });
        assert!(is_valid_station(&valid));

        for key in [
            "station_id",
            "lat",
            "lon",
            "num_bikes_available",
            "num_docks_available",
        ] {
            let mut missing = valid.clone();
            missing.as_object_mut().unwrap().remove(key);
            assert!(!is_valid_station(&missing), "missing {key} should fail");
        }

        let mut numeric_id = valid.clone();
        numeric_id["station_id"] = json!(36);
        assert!(!is_valid_station(&numeric_id));

        let mut string_lat = valid.clone();
        string_lat["lat"] = json!("50.63");
        assert!(!is_valid_station(&string_lat));

        assert!(!is_valid_station(&Value::Null));
        assert!(!is_valid_station(&json!([1, 2, 3])));
    }
}
