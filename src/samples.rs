//! # Sample record types
//!
//! The typed records that flow between pipeline stages, in stage order:
//! [`RawSample`] (ingestion output) → [`GriddedSample`] → [`FilteredSample`]
//! → [`SuperposedSample`]. Each stage only adds or replaces the keying
//! information; the measured LOS velocity is carried through unchanged
//! (except for the median collapse).

use hifitime::Epoch;

use crate::constants::{Degree, Minutes, Mps, RadarId};
use crate::coords::local_time_degrees;
use crate::grid::GridCell;

/// One radar beam sounding result at one range gate, as produced by the
/// upstream ingestion/geolocation step.
///
/// `latitude` and `lon_or_lt` are in the pipeline's configured coordinate
/// system (magnetic latitude / MLT degrees, or geographic latitude / local
/// time degrees). `azimuth` is the look direction of the chosen fit axis in
/// degrees relative to the coordinate pole; it may arrive in `[0, 360)` and
/// is normalized during gridding.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub radar_id: RadarId,
    pub beam_number: u16,
    pub range_gate: u16,
    pub velocity: Mps,
    pub latitude: Degree,
    pub lon_or_lt: Degree,
    pub azimuth: Degree,
    pub timestamp: Epoch,
}

impl RawSample {
    /// Build a raw sample from a geographically located observation.
    ///
    /// Geolocation in geographic mode hands back a longitude, not a local
    /// time; this constructor derives the solar local-time angle from the
    /// sounding timestamp and longitude so the sample grids on the same
    /// `[0, 360)` local-time axis as magnetic-mode data.
    #[allow(clippy::too_many_arguments)]
    pub fn from_geo(
        radar_id: RadarId,
        beam_number: u16,
        range_gate: u16,
        velocity: Mps,
        latitude: Degree,
        longitude: Degree,
        azimuth: Degree,
        timestamp: Epoch,
    ) -> Self {
        RawSample {
            radar_id,
            beam_number,
            range_gate,
            velocity,
            latitude,
            lon_or_lt: local_time_degrees(timestamp, longitude),
            azimuth,
            timestamp,
        }
    }
}

/// A raw sample annotated with its discrete grid cell.
#[derive(Debug, Clone)]
pub struct GriddedSample {
    pub radar_id: RadarId,
    pub timestamp: Epoch,
    pub cell: GridCell,
    pub velocity: Mps,
}

/// Median-collapsed representative of all gridded samples sharing a
/// (cell, radar, time window); timestamped at the window midpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredSample {
    pub radar_id: RadarId,
    pub timestamp: Epoch,
    pub cell: GridCell,
    pub velocity: Mps,
}

/// A filtered sample re-expressed on the relative-time axis of one event.
///
/// `relative_minutes` is the signed offset from the event's response time.
/// Many superposed samples from independent events legitimately land in the
/// same (cell, relative-time) bucket; that accumulation is the statistical
/// basis of the superposed-epoch method.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperposedSample {
    pub radar_id: RadarId,
    pub relative_minutes: Minutes,
    pub cell: GridCell,
    pub velocity: Mps,
    /// Index of the contributing event within the filtered catalog selection
    /// (a back-reference, not ownership).
    pub source_event: usize,
}
