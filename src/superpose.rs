//! # Superposed-epoch alignment
//!
//! The temporal heart of the pipeline. For every curated turning event the
//! aligner computes a **response time** (`event_time + lag`), derives the
//! window `[response − H, response + H]`, pulls all combined-radar samples
//! inside that window, and re-stamps each with its signed offset from the
//! response time, rounded to whole minutes.
//!
//! All events' windows are unioned into a single long table indexed by
//! relative time instead of absolute time — many independent physical events
//! stacked on a common clock. Contributions are deliberately **not**
//! deduplicated across events: multiple events feeding the same
//! (cell, relative-minute) bucket is the statistical signal the downstream
//! fit aggregates.
//!
//! Events are processed independently; an event whose window contains no
//! samples simply contributes nothing.

use hifitime::{Duration, Epoch, Unit};

use crate::config::PipelineParams;
use crate::constants::{Minutes, SECONDS_PER_MINUTE};
use crate::events::Event;
use crate::samples::{FilteredSample, SuperposedSample};

/// Aligns combined-radar samples onto per-event relative clocks.
#[derive(Debug, Clone, Copy)]
pub struct SuperposedEpochAligner {
    half_window: Duration,
}

impl SuperposedEpochAligner {
    pub fn new(half_window_minutes: u32) -> Self {
        SuperposedEpochAligner {
            half_window: Unit::Minute * half_window_minutes as i64,
        }
    }

    pub fn from_params(params: &PipelineParams) -> Self {
        Self::new(params.half_window_minutes)
    }

    /// Response time of one event under the configured lag policy.
    pub fn response_time(event: &Event, params: &PipelineParams) -> Epoch {
        event.event_time + Unit::Minute * params.effective_lag(event.lag_minutes) as i64
    }

    /// Signed whole-minute offset of `timestamp` from `response`.
    pub fn relative_minutes(timestamp: Epoch, response: Epoch) -> Minutes {
        let seconds = (timestamp - response).to_seconds();
        (seconds / SECONDS_PER_MINUTE).round() as Minutes
    }

    /// Align one event: select samples within the response window and
    /// re-stamp them on the relative clock.
    ///
    /// Arguments
    /// -----------------
    /// * `event_index`: position of the event in the filtered catalog
    ///   selection, carried as a back-reference on each emitted sample.
    /// * `event`: the turning event.
    /// * `samples`: the combined multi-radar table (any order).
    /// * `params`: lag policy (per-event catalog lag or fixed override).
    pub fn align_event(
        &self,
        event_index: usize,
        event: &Event,
        samples: &[&FilteredSample],
        params: &PipelineParams,
    ) -> Vec<SuperposedSample> {
        let response = Self::response_time(event, params);
        let window_start = response - self.half_window;
        let window_end = response + self.half_window;

        samples
            .iter()
            .filter(|s| s.timestamp >= window_start && s.timestamp <= window_end)
            .map(|s| SuperposedSample {
                radar_id: s.radar_id.clone(),
                relative_minutes: Self::relative_minutes(s.timestamp, response),
                cell: s.cell,
                velocity: s.velocity,
                source_event: event_index,
            })
            .collect()
    }

    /// Align every event and union the results into one stacked table.
    pub fn align_all(
        &self,
        events: &[&Event],
        samples: &[&FilteredSample],
        params: &PipelineParams,
    ) -> Vec<SuperposedSample> {
        let mut out = Vec::new();
        for (i, event) in events.iter().enumerate() {
            out.extend(self.align_event(i, event, samples, params));
        }
        out
    }
}
