//! # Per-cell velocity summary statistics
//!
//! Collapses the full superposed sample set into one row per
//! (latitude, local-time, azimuth) cell: mean, median, standard deviation
//! and count of the LOS velocities observed there across all events and
//! relative times. The summary is the quick-look companion to the cosine
//! fits; it answers "how much data sits under this cell and how scattered
//! is it" without any model assumption.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PipelineParams;
use crate::constants::{Degree, Mps};
use crate::grid::GridCell;
use crate::median_filter::{median, round_to};
use crate::samples::SuperposedSample;

/// Velocity statistics for one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub lat_center: Degree,
    pub lt_center: Degree,
    pub azimuth_center: Degree,
    pub vel_mean: Mps,
    pub vel_median: Mps,
    /// Population standard deviation of the cell's velocities below the
    /// outlier cut; the configured fallback when the cut leaves nothing.
    pub vel_std: Mps,
    pub vel_count: usize,
}

/// Population standard deviation (ddof = 0).
fn population_std(values: &[Mps]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Summarize the superposed samples per grid cell.
///
/// Mean, median and count cover every velocity of the cell; only the
/// standard deviation restricts itself to `|v| < summary_outlier_maxlim`,
/// and when that cut leaves nothing (or the statistic comes out non-finite)
/// the configured fallback is substituted, so a cell never reports a NaN
/// spread. Rows come out ordered by cell.
pub fn summarize(samples: &[SuperposedSample], params: &PipelineParams) -> Vec<SummaryRow> {
    let mut by_cell: BTreeMap<GridCell, Vec<Mps>> = BTreeMap::new();
    for s in samples {
        by_cell.entry(s.cell).or_default().push(s.velocity);
    }

    by_cell
        .into_iter()
        .map(|(cell, vels)| {
            let mean = vels.iter().sum::<f64>() / vels.len() as f64;
            let cut: Vec<Mps> = vels
                .iter()
                .copied()
                .filter(|v| v.abs() < params.summary_outlier_maxlim)
                .collect();
            let std = match cut.is_empty() {
                true => params.summary_std_fallback,
                false => {
                    let s = population_std(&cut);
                    if s.is_finite() {
                        s
                    } else {
                        params.summary_std_fallback
                    }
                }
            };
            SummaryRow {
                lat_center: cell.lat_center.into_inner(),
                lt_center: cell.lt_center.into_inner(),
                azimuth_center: cell.azimuth_center.into_inner(),
                vel_mean: round_to(mean, 2),
                vel_median: round_to(median(&vels), 2),
                vel_std: round_to(std, 2),
                vel_count: vels.len(),
            }
        })
        .collect()
}
