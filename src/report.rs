//! Markdown rendering of the train status report.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Kuala_Lumpur;
use chrono_tz::Tz;
use std::fmt::Write as _;

use crate::config::DASHBOARD_TITLE;
use crate::feed::{VehicleRecord, UNKNOWN};

/// Time zone all report timestamps are rendered in.
const REPORT_TZ: Tz = Kuala_Lumpur;

/// Render the dashboard report for the current wall clock.
#[must_use]
pub fn render_report(feed_ts: Option<u64>, records: &[VehicleRecord]) -> String {
    render_report_at(feed_ts, records, Utc::now())
}

/// Render the dashboard report against an explicit "now".
///
/// The feed timestamp is converted from epoch UTC to local time; an
/// unconvertible or absent timestamp falls back to `now`. Every record is
/// rendered, in input order, with no truncation.
#[must_use]
pub fn render_report_at(
    feed_ts: Option<u64>,
    records: &[VehicleRecord],
    now: DateTime<Utc>,
) -> String {
    let last_updated = display_timestamp(feed_ts, now);

    let mut report = format!("🚆 **{DASHBOARD_TITLE}**\n\n");
    let _ = writeln!(report, "*Last updated: {last_updated}*");
    report.push('\n');

    if records.is_empty() {
        report.push_str("No active trains detected at the moment.");
        return report;
    }

    let _ = writeln!(report, "Found **{}** active trains.", records.len());
    report.push('\n');
    for record in records {
        let (location, speed) = match &record.position {
            Some(fix) => (
                format!("{}, {}", fix.latitude, fix.longitude),
                fix.speed_kmh.to_string(),
            ),
            None => (format!("{UNKNOWN}, {UNKNOWN}"), UNKNOWN.to_owned()),
        };
        let _ = writeln!(
            report,
            "  - **Train ID:** {} | **Route:** {}",
            record.vehicle_id, record.route_id
        );
        let _ = writeln!(report, "    - **Location:** `{location}`");
        let _ = writeln!(report, "    - **Speed:** {speed} km/h");
    }

    report
}

fn display_timestamp(feed_ts: Option<u64>, now: DateTime<Utc>) -> String {
    let instant = feed_ts
        .and_then(|ts| i64::try_from(ts).ok())
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .unwrap_or(now);
    instant
        .with_timezone(&REPORT_TZ)
        .format("%Y-%m-%d %H:%M:%S %Z")
        .to_string()
}
