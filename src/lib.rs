//! # V'lille Live Map Core Library
//!
//! This library turns the public V'lille open-data feeds into map markers.
//! The heart of it is a small pure pipeline with no I/O:
//!
//! 1. **Classify**: a bike count becomes an [`station_config::AvailabilityLevel`]
//! 2. **Resolve style**: level + active flag become a color, a size keyword
//!    becomes a diameter and font sizes
//! 3. **Generate markup**: the resolved style and the station counts become
//!    inline HTML that a map library (Leaflet) places at the station
//!
//! Around that core sit thin adapters: an HTTP client for the open-data
//! feeds and the Nominatim geocoder ([`api`]), a TOML configuration layer
//! ([`config`]) and two map renderers ([`renderer`]).
//!
//! ## Data Flow
//! 1. **Fetch**: `station_information.json` + `station_status.json` → join → `Vec<Station>`
//! 2. **Style**: each station → [`marker::DivIcon`] + accessibility label
//! 3. **Render**: ASCII listing on stdout, or a standalone Leaflet page
//!
//! Stations are replaced wholesale on every poll and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod api;
pub mod config;
pub mod marker;
pub mod renderer;
pub mod station_config;


/// A bike-share dock location with its live counts.
///
/// Built by joining a station information record with its status record.
/// Both counts are non-negative by type; their sum is not constant since
/// station capacity can change between polls.
///
/// # Example
/// ```
/// use vlille_lib::Station;
///
/// let station = Station {
///     station_id: "36".to_string(),
///     name: "Gare Lille Flandres".to_string(),
///     lat: 50.6365,
///     lon: 3.0699,
///     num_bikes_available: 4,
///     num_docks_available: 20,
///     last_reported: 1_760_000_000,
///     is_active: true,
/// };
///
/// assert_eq!(station.num_bikes_available, 4);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    /// Display name shown on the map and in accessibility labels
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub num_bikes_available: u32,
    pub num_docks_available: u32,
    /// Epoch seconds of the last report from the station
    pub last_reported: i64,
    /// False when the status feed reports the station as not installed or not renting
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Station {
    /// Last report as a UTC timestamp, `None` when the epoch value is out of range.
    pub fn last_reported_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_reported, 0)
    }

    pub fn status(&self) -> station_config::StationStatus {
        if self.is_active {
            station_config::StationStatus::Active
        } else {
            station_config::StationStatus::Inactive
        }
    }
}
