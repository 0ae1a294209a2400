//! # Temporal median filtering
//!
//! Collapses the gridded samples of one radar into one representative
//! velocity per (grid cell, time window): a non-overlapping window of fixed
//! width slides from the range start to the range end, and within each
//! window the median velocity of every touched cell is emitted, timestamped
//! at the window midpoint.
//!
//! The filter is a pure batch aggregation — no state crosses a window
//! boundary — and its output is sparse: windows and cells without samples
//! produce nothing.

use hifitime::{Duration, Epoch, Unit};

use crate::constants::{Mps, RadarId};
use crate::grid::GridCell;
use crate::samples::{FilteredSample, GriddedSample};

/// Median of a slice, resolved without assuming input order.
///
/// Even-length inputs return the mean of the two central values.
pub fn median(values: &[Mps]) -> Mps {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Round to `digits` decimal places.
pub(crate) fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Non-overlapping median filter for one radar's gridded stream.
#[derive(Debug, Clone, Copy)]
pub struct TemporalMedianFilter {
    window: Duration,
}

impl TemporalMedianFilter {
    pub fn new(window_minutes: u32) -> Self {
        TemporalMedianFilter {
            window: Unit::Minute * window_minutes as i64,
        }
    }

    /// Run the filter over `[start, end)` for one radar.
    ///
    /// Arguments
    /// -----------------
    /// * `radar_id`: the radar whose samples are filtered (stamped on output).
    /// * `samples`: gridded samples; only those of `radar_id` inside a window
    ///   contribute to that window.
    /// * `start`, `end`: the time range walked by the window. The walk emits
    ///   windows `[start, start+w)`, `[start+w, start+2w)`, … while the
    ///   window end does not pass `end`.
    ///
    /// Return
    /// ----------
    /// * Filtered samples ordered by (timestamp, cell), one per touched
    ///   (window, cell), with the median velocity rounded to 2 decimals and
    ///   the window-midpoint timestamp.
    pub fn filter(
        &self,
        radar_id: &RadarId,
        samples: &[GriddedSample],
        start: Epoch,
        end: Epoch,
    ) -> Vec<FilteredSample> {
        let mut out = Vec::new();

        let mut window_start = start;
        let mut window_end = start + self.window;
        while window_end <= end {
            // cell → velocities observed inside this window
            let mut bins: std::collections::BTreeMap<GridCell, Vec<Mps>> =
                std::collections::BTreeMap::new();
            for s in samples {
                if &s.radar_id == radar_id && s.timestamp >= window_start && s.timestamp < window_end
                {
                    bins.entry(s.cell).or_default().push(s.velocity);
                }
            }

            let midpoint = window_start + self.window / 2;
            for (cell, vels) in bins {
                out.push(FilteredSample {
                    radar_id: radar_id.clone(),
                    timestamp: midpoint,
                    cell,
                    velocity: round_to(median(&vels), 2),
                });
            }

            window_start = window_end;
            window_end = window_start + self.window;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gridded(radar: &str, t: Epoch, cell: GridCell, v: f64) -> GriddedSample {
        GriddedSample {
            radar_id: radar.into(),
            timestamp: t,
            cell,
            velocity: v,
        }
    }

    fn t(minute: u8, second: u8) -> Epoch {
        Epoch::from_gregorian_utc(2013, 2, 21, 5, minute, second, 0)
    }

    #[test]
    fn median_is_order_independent() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_relative_eq!(median(&[2.0, 3.0, 1.0]), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_relative_eq!(median(&[-7.5]), -7.5);
    }

    #[test]
    fn window_collapses_to_single_median_at_midpoint() {
        let cell = GridCell::new(55.5, 0.0, 7.5);
        let radar: RadarId = "bks".into();
        let samples = vec![
            gridded("bks", t(0, 10), cell, 100.0),
            gridded("bks", t(0, 50), cell, 300.0),
            gridded("bks", t(1, 30), cell, 200.0),
        ];
        let filter = TemporalMedianFilter::new(2);
        let out = filter.filter(&radar, &samples, t(0, 0), t(2, 0));
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].velocity, 200.0);
        assert_eq!(out[0].timestamp, t(1, 0));
    }

    #[test]
    fn empty_windows_emit_nothing() {
        let cell = GridCell::new(55.5, 0.0, 7.5);
        let radar: RadarId = "bks".into();
        // Samples only in the second of three windows.
        let samples = vec![
            gridded("bks", t(2, 30), cell, 50.0),
            gridded("bks", t(3, 10), cell, 70.0),
        ];
        let filter = TemporalMedianFilter::new(2);
        let out = filter.filter(&radar, &samples, t(0, 0), t(6, 0));
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].velocity, 60.0);
        assert_eq!(out[0].timestamp, t(3, 0));
    }

    #[test]
    fn cells_are_filtered_independently() {
        let cell_a = GridCell::new(55.5, 0.0, 7.5);
        let cell_b = GridCell::new(56.5, 15.0, 7.5);
        let radar: RadarId = "bks".into();
        let samples = vec![
            gridded("bks", t(0, 20), cell_a, 10.0),
            gridded("bks", t(0, 40), cell_b, -90.0),
        ];
        let filter = TemporalMedianFilter::new(2);
        let out = filter.filter(&radar, &samples, t(0, 0), t(2, 0));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn other_radars_are_ignored() {
        let cell = GridCell::new(55.5, 0.0, 7.5);
        let radar: RadarId = "bks".into();
        let samples = vec![
            gridded("bks", t(0, 20), cell, 10.0),
            gridded("cve", t(0, 40), cell, 999.0),
        ];
        let filter = TemporalMedianFilter::new(2);
        let out = filter.filter(&radar, &samples, t(0, 0), t(2, 0));
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].velocity, 10.0);
    }

    #[test]
    fn partial_trailing_window_is_not_emitted() {
        let cell = GridCell::new(55.5, 0.0, 7.5);
        let radar: RadarId = "bks".into();
        let samples = vec![gridded("bks", t(3, 0), cell, 42.0)];
        let filter = TemporalMedianFilter::new(2);
        // Range ends at minute 3: the second window [2, 4) does not fit.
        let out = filter.filter(&radar, &samples, t(0, 0), t(3, 0));
        assert!(out.is_empty());
    }
}
