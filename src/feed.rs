//! GTFS-Realtime feed retrieval and projection into flat vehicle records.

use gtfs_realtime::FeedMessage;
use prost::Message;
use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::info;

use crate::http::HttpClient;
use crate::{AppError, Result};

/// Placeholder for fields the feed left empty.
pub const UNKNOWN: &str = "Unknown";

/// Decoded position data for one vehicle, already converted for display.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFix {
    /// Latitude in decimal degrees, rounded to 6 digits.
    pub latitude: f64,
    /// Longitude in decimal degrees, rounded to 6 digits.
    pub longitude: f64,
    /// Speed in km/h, rounded to 2 digits; `0.0` when the feed omits speed.
    pub speed_kmh: f64,
}

/// Flattened projection of one feed entity carrying vehicle data.
///
/// `position` is `None` when the entity has no position sub-message; the
/// renderer shows `Unknown` for those fields rather than a zero reading.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    /// Vehicle identifier, or [`UNKNOWN`] when the feed left it empty.
    pub vehicle_id: String,
    /// Route identifier from the trip descriptor, or [`UNKNOWN`].
    pub route_id: String,
    /// Geographic fix, absent when the feed carried no position.
    pub position: Option<GeoFix>,
}

/// Fetch and decode the GTFS-Realtime feed.
///
/// # Errors
///
/// Returns `AppError::FeedFetch` on a non-success status,
/// `AppError::Transient` if the transport fails past the retry bound, and
/// `AppError::FeedDecode` if the body is not a valid feed message.
pub async fn fetch_feed(http: &HttpClient, url: &str) -> Result<FeedMessage> {
    info!(url, "fetching GTFS-Realtime feed");
    let response = http
        .execute(Method::GET, url, HeaderMap::new(), None, None)
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::FeedFetch(format!(
            "feed endpoint returned {status} for {url}"
        )));
    }
    let body = response.bytes().await?;
    Ok(FeedMessage::decode(body.as_ref())?)
}

/// Project a decoded feed into its header timestamp and vehicle records.
///
/// Pure: preserves entity order, skips entities without vehicle data, and
/// performs the unit conversions the report expects.
#[must_use]
pub fn extract_vehicles(feed: &FeedMessage) -> (Option<u64>, Vec<VehicleRecord>) {
    let feed_ts = feed.header.timestamp.filter(|ts| *ts > 0);

    let records = feed
        .entity
        .iter()
        .filter_map(|entity| entity.vehicle.as_ref())
        .map(|vehicle| {
            let vehicle_id = vehicle
                .vehicle
                .as_ref()
                .and_then(|descriptor| descriptor.id.clone())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_owned());
            let route_id = vehicle
                .trip
                .as_ref()
                .and_then(|trip| trip.route_id.clone())
                .filter(|route| !route.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_owned());
            let position = vehicle.position.as_ref().map(|pos| GeoFix {
                latitude: round_dp(f64::from(pos.latitude), 6),
                longitude: round_dp(f64::from(pos.longitude), 6),
                speed_kmh: round_dp(f64::from(pos.speed.unwrap_or(0.0)) * 3.6, 2),
            });

            VehicleRecord {
                vehicle_id,
                route_id,
                position,
            }
        })
        .collect();

    (feed_ts, records)
}

fn round_dp(value: f64, digits: u32) -> f64 {
    let factor = f64::from(10_u32.pow(digits));
    (value * factor).round() / factor
}
