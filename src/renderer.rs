//! # Station Map Rendering
//!
//! This module places styled station markers on a map surface. The map is a
//! capability behind [`MapRenderer`]; two surfaces ship with the crate:
//!
//! - [`AsciiRenderer`]: a terminal listing for development and quick checks
//! - [`LeafletPageRenderer`]: a standalone HTML page driving Leaflet, where
//!   every marker is the generated `L.divIcon` markup

use std::collections::HashMap;

use chrono::Local;
use serde::Serialize;

use crate::api::LocationSearchResult;
use crate::marker::{here_marker_icon, station_div_icon, DivIcon, MarkerTheme};
use crate::station_config::{accessibility_label, availability_level, AvailabilityLevel, LabelLocale, MarkerSize};
use crate::Station;

/// Map center used when no station is placed (Lille Grand Place).
pub const LILLE_CENTER: (f64, f64) = (50.6372, 3.0633);
const DEFAULT_ZOOM: u8 = 14;

/// A surface that accepts markers at coordinates.
pub trait MapRenderer {
    fn place_station(&mut self, station: &Station, level: AvailabilityLevel, icon: &DivIcon, label: &str);

    fn place_location(&mut self, location: &LocationSearchResult, icon: &DivIcon);

    /// Produce the rendered output and reset the surface.
    fn finish(&mut self) -> String;
}

/// Style every station and hand it to the renderer.
pub fn render_stations<R: MapRenderer + ?Sized>(
    renderer: &mut R,
    stations: &[Station],
    size: MarkerSize,
    theme: &MarkerTheme,
    locale: LabelLocale,
) {
    for station in stations {
        let level = availability_level(station.num_bikes_available, &theme.thresholds);
        let icon = station_div_icon(station, size, theme);
        let label = accessibility_label(
            station.num_bikes_available,
            station.num_docks_available,
            Some(&station.name),
            locale,
        );
        renderer.place_station(station, level, &icon, &label);
    }
}

/// Place geocoder results with the "here" pin.
pub fn render_locations<R: MapRenderer + ?Sized>(renderer: &mut R, locations: &[LocationSearchResult]) {
    let icon = here_marker_icon();
    for location in locations {
        renderer.place_location(location, &icon);
    }
}

// -- ASCII --

/// Terminal listing, one line per station.
#[derive(Default)]
pub struct AsciiRenderer {
    lines: Vec<String>,
    counts: HashMap<AvailabilityLevel, usize>,
    inactive: usize,
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn level_glyph(level: AvailabilityLevel, active: bool) -> char {
    if !active {
        return '×';
    }

    match level {
        AvailabilityLevel::Good => '●',
        AvailabilityLevel::Medium => '◕',
        AvailabilityLevel::Low => '◔',
        AvailabilityLevel::Empty => '○',
    }
}

impl MapRenderer for AsciiRenderer {
    fn place_station(&mut self, station: &Station, level: AvailabilityLevel, _icon: &DivIcon, _label: &str) {
        if station.is_active {
            *self.counts.entry(level).or_default() += 1;
        } else {
            self.inactive += 1;
        }

        let reported = station
            .last_reported_at()
            .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());

        self.lines.push(format!(
            "{} {:>3} 🚲 {:>3} 🅿  {}  {}",
            level_glyph(level, station.is_active),
            station.num_bikes_available,
            station.num_docks_available,
            reported,
            station.name
        ));
    }

    fn place_location(&mut self, location: &LocationSearchResult, _icon: &DivIcon) {
        let position = location
            .position()
            .map(|(lat, lon)| format!("{lat:.5}, {lon:.5}"))
            .unwrap_or_else(|| "?".to_string());
        self.lines
            .push(format!("📍 {}  ({})", location.display_name, position));
    }

    fn finish(&mut self) -> String {
        let mut out = std::mem::take(&mut self.lines).join("\n");

        let summary: Vec<String> = AvailabilityLevel::ALL
            .iter()
            .map(|level| format!("{}: {}", level, self.counts.get(level).copied().unwrap_or(0)))
            .collect();
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{} | inactive: {}", summary.join(" | "), self.inactive));

        self.counts.clear();
        self.inactive = 0;
        out
    }
}

// -- Leaflet --

#[derive(Serialize)]
struct PageMarker<'a> {
    lat: f64,
    lon: f64,
    icon: &'a DivIcon,
    title: &'a str,
    popup: String,
}

/// Standalone HTML page with one Leaflet marker per station.
pub struct LeafletPageRenderer {
    title: String,
    markers: Vec<String>,
}

impl LeafletPageRenderer {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            markers: Vec::new(),
        }
    }

    fn push(&mut self, marker: &PageMarker<'_>) {
        match serde_json::to_string(marker) {
            Ok(json) => self.markers.push(json),
            Err(e) => log::warn!("skipping marker at {}, {}: {e}", marker.lat, marker.lon),
        }
    }
}

impl MapRenderer for LeafletPageRenderer {
    fn place_station(&mut self, station: &Station, _level: AvailabilityLevel, icon: &DivIcon, label: &str) {
        let popup = format!("<strong>{}</strong><br>{}", escape_html(&station.name), escape_html(label));
        self.push(&PageMarker {
            lat: station.lat,
            lon: station.lon,
            icon,
            title: label,
            popup,
        });
    }

    fn place_location(&mut self, location: &LocationSearchResult, icon: &DivIcon) {
        let Some((lat, lon)) = location.position() else {
            log::warn!("location {} has no usable coordinates", location.place_id);
            return;
        };

        self.push(&PageMarker {
            lat,
            lon,
            icon,
            title: &location.display_name,
            popup: escape_html(&location.display_name),
        });
    }

    fn finish(&mut self) -> String {
        let markers = std::mem::take(&mut self.markers).join(",\n");
        // Keep "</script>" inside JSON strings from closing the script tag.
        let markers = markers.replace("</", "<\\/");
        let (lat, lon) = LILLE_CENTER;

        format!(
            r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }} .leaflet-div-icon {{ background: none; border: none; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const map = L.map('map').setView([{lat}, {lon}], {zoom});
L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
  attribution: '&copy; OpenStreetMap contributors'
}}).addTo(map);
const markers = [
{markers}
];
for (const m of markers) {{
  L.marker([m.lat, m.lon], {{ icon: L.divIcon(m.icon), title: m.title, alt: m.title }})
    .bindPopup(m.popup)
    .addTo(map);
}}
</script>
</body>
</html>
"#,
            title = escape_html(&self.title),
            zoom = DEFAULT_ZOOM,
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
