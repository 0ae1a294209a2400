//! Shared builders for the integration tests: synthetic radar soundings
//! with a known planted convection vector, and minimal event catalogs.
#![allow(dead_code)]

use hifitime::{Epoch, Unit};
use sdconv::samples::RawSample;
use sdconv::{Event, EventCatalog, EventStatus, Polarity};

pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;

/// A one-event catalog at `event_time` with the given response lag, rated
/// good.
pub fn single_event_catalog(event_time: Epoch, lag_minutes: u32) -> EventCatalog {
    EventCatalog::new(vec![Event::new(
        event_time,
        Polarity::Northward,
        lag_minutes,
        EventStatus::Good,
    )])
}

/// One raw sounding.
pub fn raw_sample(
    radar: &str,
    timestamp: Epoch,
    latitude: f64,
    local_time_deg: f64,
    azimuth: f64,
    velocity: f64,
) -> RawSample {
    RawSample {
        radar_id: radar.into(),
        beam_number: 7,
        range_gate: 30,
        velocity,
        latitude,
        lon_or_lt: local_time_deg,
        azimuth,
        timestamp,
    }
}

/// Soundings carrying a planted convection vector `(speed, direction)` as a
/// pure cosine over `azimuths`, emitted once per minute over
/// `[response − minutes, response + minutes)`.
pub fn planted_cosine_samples(
    radar: &str,
    response: Epoch,
    minutes: i64,
    latitude: f64,
    local_time_deg: f64,
    azimuths: &[f64],
    speed: f64,
    direction_deg: f64,
) -> Vec<RawSample> {
    let mut out = Vec::new();
    for minute in -minutes..minutes {
        let t = response + Unit::Minute * minute;
        for &azm in azimuths {
            let velocity = speed * ((azm - direction_deg) * DEG2RAD).cos();
            out.push(raw_sample(radar, t, latitude, local_time_deg, azm, velocity));
        }
    }
    out
}
