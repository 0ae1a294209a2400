//! # Cosine fitting of superposed LOS velocities
//!
//! For every relative-time bucket and every populated (latitude, local-time)
//! cell, this module gathers the superposed line-of-sight velocities whose
//! local time falls inside the longitudinal fit window, applies the velocity
//! and azimuth gates, and fits the cosine response model through
//! [`solver::fit_cosine`].
//!
//! The driver is deliberately forgiving: a group that fails a gate or whose
//! fit degenerates is skipped and reported, never fatal. One bad cell must
//! not abort a pipeline run that covers hundreds of cells, so the batch
//! result carries both the converged fits and the per-group skip reasons,
//! in the manner of the per-unit diagnostic maps used elsewhere in the
//! crate.

pub mod solver;

use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::config::{PipelineParams, Weighting};
use crate::constants::{Degree, Minutes, Mps, RADEG};
use crate::coords::wrap_360;
use crate::grid::SpatialCell;
use crate::median_filter::round_to;
use crate::samples::SuperposedSample;
use crate::sdconv_errors::SdconvError;

/// One converged cosine fit for a (latitude, local-time, relative-time)
/// group.
///
/// `vel_dir` is the fitted phase in degrees wrapped to `[0, 360)`, i.e. the
/// azimuth at which the LOS velocity magnitude peaks. Magnitudes are rounded
/// to 2 decimals and directions to 1, matching the precision of the exported
/// data products.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CosineFitResult {
    pub lat_center: Degree,
    pub lt_center: Degree,
    /// Start of the relative-time bucket, in minutes from the response time.
    pub relative_time: Minutes,
    /// Fitted amplitude `A` (m/s).
    pub vel_mag: Mps,
    /// Standard error of the amplitude (m/s).
    pub vel_mag_err: Mps,
    /// Fitted phase `φ` in degrees, `[0, 360)`.
    pub vel_dir: Degree,
    /// Standard error of the phase, degrees.
    pub vel_dir_err: Degree,
    /// Number of velocity points entering the fit.
    pub vel_count: usize,
    /// Spread between the extreme azimuth bin centers in the group (degrees).
    pub azimuth_span: Degree,
}

/// Why a candidate group produced no fit.
///
/// Carries the solver error by value, so the type is not `Clone` (the
/// wrapped I/O error sources aren't).
#[derive(Debug, PartialEq)]
pub enum SkipReason {
    /// Every candidate was rejected by the velocity or azimuth gate.
    NoCandidates,
    /// The group did not exceed the unique-azimuth floor.
    TooFewUniqueAzimuths { unique: usize, required: usize },
    /// The solver rejected the group.
    Fit(SdconvError),
}

/// A skipped (cell, relative-time) group and its reason.
#[derive(Debug, PartialEq)]
pub struct SkippedGroup {
    pub lat_center: Degree,
    pub lt_center: Degree,
    pub relative_time: Minutes,
    pub reason: SkipReason,
}

/// Outcome of fitting one batch of superposed samples.
#[derive(Debug, Default)]
pub struct FitBatch {
    pub results: Vec<CosineFitResult>,
    pub skipped: Vec<SkippedGroup>,
}

/// Shortest angular distance between two circular local-time values,
/// in `[0, 180]` degrees.
fn circular_lt_distance(a: Degree, b: Degree) -> Degree {
    let d = wrap_360(a - b);
    d.min(360.0 - d)
}

/// Population standard deviation; zero for fewer than two values.
fn population_std(values: &[Mps]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Per-point sigmas for the weighted fit.
///
/// Under [`Weighting::Std`] every point sharing an exact azimuth bin gets
/// `σ = 1 + std(velocities at that azimuth)`, so azimuths with internally
/// scattered velocities are downweighted while a lone point keeps `σ = 1`.
/// Under [`Weighting::None`] all sigmas are one.
fn weighting_sigmas(weighting: Weighting, azimuths: &[Degree], velocities: &[Mps]) -> Vec<f64> {
    match weighting {
        Weighting::None => vec![1.0; azimuths.len()],
        Weighting::Std => {
            let mut by_azm: BTreeMap<OrderedFloat<f64>, Vec<Mps>> = BTreeMap::new();
            for (&a, &v) in azimuths.iter().zip(velocities) {
                by_azm.entry(OrderedFloat(a)).or_default().push(v);
            }
            let sigma_of: BTreeMap<OrderedFloat<f64>, f64> = by_azm
                .into_iter()
                .map(|(a, vels)| (a, 1.0 + population_std(&vels)))
                .collect();
            azimuths
                .iter()
                .map(|a| sigma_of[&OrderedFloat(*a)])
                .collect()
        }
    }
}

/// Batch cosine fitter over superposed samples.
///
/// Holds only the run parameters; the samples are borrowed per call so one
/// fitter can serve several event selections.
#[derive(Debug, Clone)]
pub struct CosineFitter<'a> {
    params: &'a PipelineParams,
}

impl<'a> CosineFitter<'a> {
    pub fn new(params: &'a PipelineParams) -> Self {
        CosineFitter { params }
    }

    /// Fit every (cell, relative-time bucket) group in `samples`.
    ///
    /// Arguments
    /// -----------------
    /// * `samples`: the full superposed sample set across all selected
    ///   events.
    ///
    /// Return
    /// ----------
    /// * [`FitBatch`] with the converged fits, ordered by
    ///   (relative time, latitude, local time), and the skipped groups.
    ///
    /// A rerun on the same samples and parameters reproduces the batch
    /// exactly: buckets, cells and candidates are all walked in sorted
    /// order.
    pub fn fit_all(&self, samples: &[SuperposedSample]) -> FitBatch {
        let mut batch = FitBatch::default();
        for &start in &self.params.reltime_starts {
            let end = start + self.params.reltime_resolution as Minutes - 1;
            let bucket: Vec<&SuperposedSample> = samples
                .iter()
                .filter(|s| s.relative_minutes >= start && s.relative_minutes <= end)
                .collect();
            if bucket.is_empty() {
                continue;
            }

            let cells: BTreeSet<SpatialCell> =
                bucket.iter().map(|s| s.cell.spatial()).collect();
            for cell in cells {
                match self.fit_group(&bucket, cell, start) {
                    Ok(result) => batch.results.push(result),
                    Err(reason) => {
                        log::debug!(
                            "skipping cell (lat {}, lt {}) at reltime {start}: {reason:?}",
                            cell.lat_center,
                            cell.lt_center,
                        );
                        batch.skipped.push(SkippedGroup {
                            lat_center: cell.lat_center.into_inner(),
                            lt_center: cell.lt_center.into_inner(),
                            relative_time: start,
                            reason,
                        });
                    }
                }
            }
        }
        batch
    }

    /// Fit one spatial cell within one relative-time bucket.
    fn fit_group(
        &self,
        bucket: &[&SuperposedSample],
        cell: SpatialCell,
        relative_time: Minutes,
    ) -> Result<CosineFitResult, SkipReason> {
        let half_window = self.params.mlt_half_window_degrees();
        let mut candidates: Vec<(Degree, Mps)> = bucket
            .iter()
            .filter(|s| {
                s.cell.lat_center == cell.lat_center
                    && circular_lt_distance(
                        s.cell.lt_center.into_inner(),
                        cell.lt_center.into_inner(),
                    ) <= half_window
            })
            .map(|s| (s.cell.azimuth_center.into_inner(), s.velocity))
            .filter(|(azm, vel)| {
                vel.abs() <= self.params.abs_losvel_maxlim
                    && azm.abs() <= self.params.abs_azm_maxlim
            })
            .collect();
        if candidates.is_empty() {
            return Err(SkipReason::NoCandidates);
        }
        candidates.sort_by(|x, y| {
            (OrderedFloat(x.0), OrderedFloat(x.1)).cmp(&(OrderedFloat(y.0), OrderedFloat(y.1)))
        });

        let azimuths: Vec<Degree> = candidates.iter().map(|c| c.0).collect();
        let velocities: Vec<Mps> = candidates.iter().map(|c| c.1).collect();

        let unique: BTreeSet<OrderedFloat<f64>> =
            azimuths.iter().map(|a| OrderedFloat(*a)).collect();
        if unique.len() <= self.params.unique_azm_count_minlim {
            return Err(SkipReason::TooFewUniqueAzimuths {
                unique: unique.len(),
                required: self.params.unique_azm_count_minlim + 1,
            });
        }
        // Sorted ascending, so span is last minus first.
        let azimuth_span = match (unique.first(), unique.last()) {
            (Some(first), Some(last)) => last.into_inner() - first.into_inner(),
            _ => return Err(SkipReason::NoCandidates),
        };

        let sigmas = weighting_sigmas(self.params.weighting, &azimuths, &velocities);
        let fit = solver::fit_cosine(&azimuths, &velocities, &sigmas, self.params.fitvel_bounds)
            .map_err(SkipReason::Fit)?;

        Ok(CosineFitResult {
            lat_center: cell.lat_center.into_inner(),
            lt_center: cell.lt_center.into_inner(),
            relative_time,
            vel_mag: round_to(fit.amplitude, 2),
            vel_mag_err: round_to(fit.amplitude_err, 2),
            vel_dir: round_to(wrap_360(fit.phase / RADEG), 1),
            vel_dir_err: round_to(wrap_360(fit.phase_err / RADEG), 1),
            vel_count: velocities.len(),
            azimuth_span,
        })
    }
}
