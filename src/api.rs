//! # V'lille Open-Data Client
//!
//! Network access for station data and place search.
//!
//! ## Data Sources
//!
//! ### Ilévia open data (GBFS)
//! - **Information**: `{base_url}/station_information.json` - id, name, position
//! - **Status**: `{base_url}/station_status.json` - live bike and dock counts
//! - Both feeds wrap their records as `{ "data": { "stations": [...] } }`
//!
//! ### Nominatim
//! - **Search**: `{nominatim_url}/search` restricted to France and biased to a
//!   viewbox around Lille
//!
//! ## Processing
//! 1. **Fetch**: both feeds are requested concurrently
//! 2. **Join**: information and status records are matched by `station_id`
//! 3. **Return**: a fresh `Vec<Station>` sorted by id, replacing any previous set
//!
//! Failures are logged and handed back to the caller as [`ApiError`]; there is
//! no retry and no cache.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::ApiConfig;
use crate::station_config::is_valid_station;
use crate::Station;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const INFORMATION_FEED: &str = "station_information.json";
const STATUS_FEED: &str = "station_status.json";

/// Viewbox around the Lille metropolis (lon1,lat1,lon2,lat2).
pub const LILLE_VIEWBOX: &str = "3.278904,50.572686,2.812420,50.678252";

/// Errors raised while talking to the open-data feeds or the geocoder.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure (DNS, TLS, timeout, connection reset)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status code
    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Body was not the expected JSON shape
    #[error("decoding {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configured base address could not be parsed or joined
    #[error("invalid url: {0}")]
    Url(String),
}

/// GBFS feed envelope. Records stay untyped until each one is checked.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    data: FeedData,
}

#[derive(Debug, Deserialize)]
struct FeedData {
    stations: Vec<Value>,
}

/// Record of `station_information.json`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InformationRecord {
    pub station_id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Record of `station_status.json`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StatusRecord {
    pub station_id: String,
    pub num_bikes_available: u32,
    pub num_docks_available: u32,
    pub last_reported: i64,
    #[serde(default, deserialize_with = "flag")]
    pub is_installed: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_renting: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    pub is_returning: Option<bool>,
}

impl StatusRecord {
    /// A station is active unless the feed explicitly says otherwise.
    pub fn is_active(&self) -> bool {
        self.is_installed.unwrap_or(true) && self.is_renting.unwrap_or(true)
    }
}

/// GBFS v1 publishes flags as 0/1, later versions as booleans.
fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(Option::<Flag>::deserialize(deserializer)?.map(|f| match f {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    }))
}

/// Coordinate as returned by Nominatim, which quotes its numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Coordinate::Number(n) => Some(*n),
            Coordinate::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Place returned by the geocoder. Passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationSearchResult {
    pub place_id: u64,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub display_name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub importance: Option<f64>,
    #[serde(default)]
    pub boundingbox: Option<Vec<String>>,
    /// Any other field the geocoder sends
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl LocationSearchResult {
    /// Position as numbers, `None` if either coordinate does not parse.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat.as_f64()?, self.lon.as_f64()?))
    }
}

/// Join raw information and status records into stations.
///
/// Each status record is laid over its information record, then the merged
/// record must pass [`is_valid_station`] and decode on its own. Records that
/// fail are skipped with a warning so one bad station never hides the
/// others. Stations without a status record are dropped. The result is
/// sorted by `station_id` so renders are stable between polls.
pub fn join_stations(information: Vec<Value>, status: Vec<Value>) -> Vec<Station> {
    let status_by_id: HashMap<String, Value> = status
        .into_iter()
        .filter_map(|record| {
            let id = record.get("station_id")?.as_str()?.to_string();
            Some((id, record))
        })
        .collect();

    let mut stations: Vec<Station> = information
        .into_iter()
        .filter_map(|info| {
            let id = info.get("station_id").and_then(Value::as_str)?;
            let Some(live) = status_by_id.get(id) else {
                log::debug!("no status for station {id}");
                return None;
            };

            let merged = merge_records(&info, live);
            if !is_valid_station(&merged) {
                log::warn!("skipping malformed station {id}");
                return None;
            }

            match build_station(info.clone(), live.clone()) {
                Ok(station) => Some(station),
                Err(e) => {
                    log::warn!("skipping station {id}: {e}");
                    None
                }
            }
        })
        .collect();

    stations.sort_by(|a, b| a.station_id.cmp(&b.station_id));
    stations
}

/// Shallow merge, status fields replacing information fields.
fn merge_records(info: &Value, status: &Value) -> Value {
    let mut merged: Map<String, Value> = info.as_object().cloned().unwrap_or_default();
    if let Some(live) = status.as_object() {
        merged.extend(live.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    Value::Object(merged)
}

fn build_station(info: Value, status: Value) -> Result<Station, serde_json::Error> {
    let info: InformationRecord = serde_json::from_value(info)?;
    let live: StatusRecord = serde_json::from_value(status)?;

    Ok(Station {
        station_id: info.station_id,
        name: info.name,
        lat: info.lat,
        lon: info.lon,
        num_bikes_available: live.num_bikes_available,
        num_docks_available: live.num_docks_available,
        last_reported: live.last_reported,
        is_active: live.is_active(),
    })
}

/// Parse a feed body into its raw records.
///
/// Only a body that is not a feed at all is an error.
pub fn parse_records(url: &str, body: &[u8]) -> Result<Vec<Value>, ApiError> {
    let feed: FeedResponse = serde_json::from_slice(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })?;

    Ok(feed.data.stations)
}

/// Decode records one by one, skipping those that do not fit `T`.
pub fn decode_records<T: DeserializeOwned>(url: &str, records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                log::warn!("skipping record {index} of {url}: {e}");
                None
            }
        })
        .collect()
}

/// Parse a feed body into typed records. Kept separate from the transport for testing.
pub fn parse_feed<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<Vec<T>, ApiError> {
    Ok(decode_records(url, parse_records(url, body)?))
}

/// Client for the station feeds and the geocoder.
pub struct VLilleApi {
    base_url: Url,
    nominatim_url: Url,
    client: Client,
}

impl VLilleApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = ClientBuilder::new()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: parse_base(&config.base_url)?,
            nominatim_url: parse_base(&config.nominatim_url)?,
            client,
        })
    }

    pub async fn station_information(&self) -> Result<Vec<InformationRecord>, ApiError> {
        let records = self.information_records().await?;
        Ok(decode_records(INFORMATION_FEED, records))
    }

    /// Live status keyed by station id.
    pub async fn station_status(&self) -> Result<HashMap<String, StatusRecord>, ApiError> {
        let records: Vec<StatusRecord> = decode_records(STATUS_FEED, self.status_records().await?);

        Ok(records
            .into_iter()
            .map(|record| (record.station_id.clone(), record))
            .collect())
    }

    /// Fetch both feeds and join them into a fresh station set.
    pub async fn stations(&self) -> Result<Vec<Station>, ApiError> {
        let (information, status) =
            tokio::try_join!(self.information_records(), self.status_records())?;

        let stations = join_stations(information, status);
        log::info!("loaded {} stations", stations.len());

        Ok(stations)
    }

    /// Nominatim search address for a free-text query.
    pub fn search_url(&self, query: &str) -> Result<Url, ApiError> {
        let mut url = join(&self.nominatim_url, "search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("countrycodes", "fr")
            .append_pair("viewbox", LILLE_VIEWBOX)
            .append_pair("format", "json");
        Ok(url)
    }

    pub async fn search_location(&self, query: &str) -> Result<Vec<LocationSearchResult>, ApiError> {
        let url = self.search_url(query)?;

        let body = self
            .send(self.client.get(url.clone()), url.as_str())
            .await
            .inspect_err(|e| log::error!("location search failed: {e}"))?;

        serde_json::from_slice(&body).map_err(|source| {
            let err = ApiError::Decode {
                url: url.to_string(),
                source,
            };
            log::error!("location search failed: {err}");
            err
        })
    }

    async fn information_records(&self) -> Result<Vec<Value>, ApiError> {
        self.fetch_records(INFORMATION_FEED)
            .await
            .inspect_err(|e| log::error!("loading station information failed: {e}"))
    }

    async fn status_records(&self) -> Result<Vec<Value>, ApiError> {
        self.fetch_records(STATUS_FEED)
            .await
            .inspect_err(|e| log::error!("loading station status failed: {e}"))
    }

    async fn fetch_records(&self, name: &str) -> Result<Vec<Value>, ApiError> {
        let url = join(&self.base_url, name)?;
        let body = self.send(self.client.get(url.clone()), url.as_str()).await?;
        log::debug!("fetched {} bytes from {url}", body.len());

        parse_records(url.as_str(), &body)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Vec<u8>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Parse a base address, making sure it ends with a slash so joins append.
fn parse_base(addr: &str) -> Result<Url, ApiError> {
    let normalized = if addr.ends_with('/') {
        addr.to_string()
    } else {
        format!("{addr}/")
    };

    normalized
        .parse()
        .map_err(|e| ApiError::Url(format!("{addr}: {e}")))
}

fn join(base: &Url, path: &str) -> Result<Url, ApiError> {
    base.join(path)
        .map_err(|e| ApiError::Url(format!("{base}{path}: {e}")))
}
