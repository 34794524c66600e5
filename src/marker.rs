//! # Marker Markup Generation
//!
//! Builds the inline HTML for station markers. A marker is a colored
//! circular badge with two stacked numbers: bikes available on top, free
//! docks underneath. The markup is consumed by Leaflet `L.divIcon`, so this
//! module also produces the icon geometry (size and anchors) that goes with
//! it.

use serde::Serialize;

use crate::station_config::{
    availability_level, MarkerSize, MarkerSizes, StationColors, StationThresholds,
    DEFAULT_SIZES, DEFAULT_THRESHOLDS,
};
use crate::Station;

/// CSS class Leaflet puts on station marker containers.
pub const STATION_MARKER_CLASS: &str = "vlille-station-marker";

/// Merged thresholds, palette and size presets used to style markers.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerTheme {
    pub thresholds: StationThresholds,
    pub colors: StationColors,
    pub sizes: MarkerSizes,
}

impl Default for MarkerTheme {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS,
            colors: StationColors::default(),
            sizes: DEFAULT_SIZES,
        }
    }
}

/// Resolved style of a single station marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerStyleConfig {
    pub diameter: u32,
    pub font_size: u32,
    pub small_font_size: u32,
    pub background_color: String,
}

/// Everything a map library needs to place an HTML marker.
///
/// Mirrors the options of Leaflet `L.divIcon`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivIcon {
    pub html: String,
    pub class_name: String,
    pub icon_size: [u32; 2],
    pub icon_anchor: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_anchor: Option<[f64; 2]>,
}

pub fn marker_style_config(station: &Station, size: MarkerSize, theme: &MarkerTheme) -> MarkerStyleConfig {
    let preset = theme.sizes.get(size);
    let level = availability_level(station.num_bikes_available, &theme.thresholds);

    MarkerStyleConfig {
        diameter: preset.diameter,
        font_size: preset.font_size,
        small_font_size: preset.small_font_size,
        background_color: theme.colors.color_for(level, station.status()).to_string(),
    }
}

/// Inline CSS of the circular badge.
pub fn marker_inline_css(config: &MarkerStyleConfig) -> String {
    [
        format!("width: {}px;", config.diameter),
        format!("height: {}px;", config.diameter),
        format!("background-color: {};", config.background_color),
        "border: 2px solid #FFFFFF;".to_string(),
        "border-radius: 50%;".to_string(),
        "box-shadow: 0 2px 8px rgba(0, 0, 0, 0.25);".to_string(),
        "display: flex;".to_string(),
        "align-items: center;".to_string(),
        "justify-content: center;".to_string(),
        "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;".to_string(),
        "font-weight: 600;".to_string(),
        "color: #FFFFFF;".to_string(),
        "transition: all 0.2s ease;".to_string(),
        "cursor: pointer;".to_string(),
        "flex-shrink: 0;".to_string(),
    ]
    .join(" ")
}

/// Inner HTML: bikes available above free docks.
pub fn marker_content_html(station: &Station, config: &MarkerStyleConfig) -> String {
    format!(
        concat!(
            "<div style=\"display: flex; flex-direction: column; align-items: center; ",
            "justify-content: center; height: 100%; line-height: 1;\">",
            "<div style=\"font-size: {}px; font-weight: 700;\">{}</div>",
            "<div style=\"font-size: {}px; font-weight: 500; opacity: 0.9;\">{}</div>",
            "</div>"
        ),
        config.font_size,
        station.num_bikes_available,
        config.small_font_size,
        station.num_docks_available,
    )
}

/// Badge and content in a single element.
pub fn complete_marker_html(station: &Station, size: MarkerSize, theme: &MarkerTheme) -> String {
    let config = marker_style_config(station, size, theme);
    wrap_marker_html(station, &config)
}

fn wrap_marker_html(station: &Station, config: &MarkerStyleConfig) -> String {
    let css = marker_inline_css(config);
    let content = marker_content_html(station, config);
    format!("<div style=\"{css}\">{content}</div>")
}

/// Icon for a station, anchored at the center of the badge.
pub fn station_div_icon(station: &Station, size: MarkerSize, theme: &MarkerTheme) -> DivIcon {
    let config = marker_style_config(station, size, theme);
    let half = f64::from(config.diameter) / 2.0;

    DivIcon {
        html: wrap_marker_html(station, &config),
        class_name: STATION_MARKER_CLASS.to_string(),
        icon_size: [config.diameter, config.diameter],
        icon_anchor: [half, half],
        popup_anchor: Some([0.0, -half]),
    }
}

/// Blue dot for the user's current position.
pub fn user_location_icon() -> DivIcon {
    let css = concat!(
        "width: 20px; height: 20px; background-color: #3B82F6; ",
        "border: 3px solid #FFFFFF; border-radius: 50%; ",
        "box-shadow: 0 2px 8px rgba(0, 0, 0, 0.3); position: relative;"
    );

    DivIcon {
        html: format!("<div style=\"{css}\"></div>"),
        class_name: "user-location-marker".to_string(),
        icon_size: [20, 20],
        icon_anchor: [10.0, 10.0],
        popup_anchor: None,
    }
}

/// Bouncing pin marking a searched place.
pub fn here_marker_icon() -> DivIcon {
    let css = concat!(
        "width: 60px; height: 60px; background-color: #EC4899; ",
        "border: 4px solid #FFFFFF; border-radius: 50%; ",
        "box-shadow: 0 4px 12px rgba(0, 0, 0, 0.3); display: flex; ",
        "align-items: center; justify-content: center; font-size: 24px; ",
        "color: #FFFFFF; font-weight: bold; position: relative; ",
        "animation: bounce 0.6s ease-in-out;"
    );
    let keyframes = concat!(
        "<style>@keyframes bounce { ",
        "0%, 20%, 50%, 80%, 100% { transform: translateY(0); } ",
        "40% { transform: translateY(-10px); } ",
        "60% { transform: translateY(-5px); } }</style>"
    );

    DivIcon {
        html: format!("<div style=\"{css}\">📍</div>{keyframes}"),
        class_name: "here-marker".to_string(),
        icon_size: [60, 60],
        icon_anchor: [30.0, 30.0],
        popup_anchor: None,
    }
}
