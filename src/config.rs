//! # Pipeline configuration
//!
//! This module defines [`PipelineParams`] and its builder, which centralize
//! every tunable knob of the superposed-epoch pipeline: spatial
//! discretization, temporal pre-smoothing, event alignment windows, and the
//! candidate gates and numerical bounds of the cosine fit.
//!
//! Configuration is resolved **once**, validated at pipeline start, and
//! passed down by reference; invalid values abort the run before any work is
//! dispatched (operator errors, not data errors).
//!
//! ## Example
//!
//! ```rust
//! use sdconv::config::{PipelineParams, Weighting};
//!
//! let params = PipelineParams::builder()
//!     .half_window_minutes(60)
//!     .reltime_resolution(2)
//!     .mlt_width(1.0)
//!     .abs_losvel_maxlim(300.0)
//!     .fitvel_bounds((-300.0, 300.0))
//!     .weighting(Weighting::Std)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.half_window_minutes, 60);
//! ```

use std::cmp::Ordering::{Equal, Greater, Less};

use crate::constants::{Degree, Minutes, Mps};
use crate::coords::CoordinateSystem;
use crate::sdconv_errors::SdconvError;

/// Which azimuth each LOS sample is fitted against.
///
/// Both axes exist in the source data; the LOS-velocity azimuth is the one
/// used in practice and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitAxis {
    /// Azimuth of the LOS velocity vector at the scatter location.
    #[default]
    LosVelAzimuth,
    /// Azimuth of the beam boresight at the radar.
    BeamAzimuth,
}

impl FitAxis {
    /// Source column the ingestion step reads the azimuth from.
    pub fn column_label(&self) -> &'static str {
        match self {
            FitAxis::LosVelAzimuth => "losvel_azm",
            FitAxis::BeamAzimuth => "beam_azm",
        }
    }
}

/// Weighting scheme applied to fit candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weighting {
    /// Every point carries weight 1.
    #[default]
    None,
    /// Point `i` weighted by `1 / (1 + std(v_los sharing i's exact azimuth))`:
    /// azimuth bins with noisier repeated measurements are downweighted.
    Std,
}

impl Weighting {
    /// Tag appended to the fit-result export name (`_std_weight`), mirroring
    /// the naming of the weighted output table in the source data products.
    pub fn export_suffix(&self) -> &'static str {
        match self {
            Weighting::None => "",
            Weighting::Std => "_std_weight",
        }
    }
}

/// Configuration for the full superposed-epoch pipeline.
///
/// Fields
/// -----------------
/// **Spatial discretization**
/// * `coords` – coordinate system descriptor (MLT or geographic).
/// * `lat_bin_width` – latitude bin width in degrees (centers at half-widths).
/// * `lt_bin_width` – local-time bin width in degrees; bins are circular and
///   centered on multiples of the width, so one bin straddles the 0/360 seam.
/// * `azimuth_bin_width` – azimuth bin width in degrees, applied after
///   normalizing azimuths to `(−180, 180]`.
///
/// **Temporal pre-smoothing**
/// * `median_window_minutes` – width of the non-overlapping median windows.
///
/// **Event alignment**
/// * `half_window_minutes` – half-width `H` of the response window
///   `[response − H, response + H]`.
/// * `lag_override_minutes` – when `Some(l)`, every event responds at
///   `event_time + l`; when `None`, each event's catalog lag is used.
///
/// **Cosine-fit grouping and gates**
/// * `mlt_width` – width (MLT **hours**) of the local-time window gathered
///   around each cell before fitting; independent from `lt_bin_width`.
/// * `reltime_starts` – left edges of the relative-time buckets to fit.
/// * `reltime_resolution` – bucket width in minutes; bucket `r` covers
///   `[r, r + resolution − 1]`.
/// * `abs_losvel_maxlim` – discard candidates with `|v| >` this limit (m/s).
/// * `abs_azm_maxlim` – discard candidates with `|azimuth| >` this limit.
/// * `unique_azm_count_minlim` – a group is fit only when its distinct
///   azimuth count **exceeds** this value.
/// * `fitvel_bounds` – clamp applied to the fit parameters each iteration
///   (defends against pathological fits on sparse geometry).
/// * `weighting` – see [`Weighting`].
/// * `fit_axis` – see [`FitAxis`].
///
/// **Summary statistics**
/// * `summary_outlier_maxlim` – |v| cut applied before the summary std.
/// * `summary_std_fallback` – substituted when the summary std is empty/NaN.
#[derive(Debug, Clone)]
pub struct PipelineParams {
    // --- Spatial discretization ---
    pub coords: CoordinateSystem,
    pub lat_bin_width: Degree,
    pub lt_bin_width: Degree,
    pub azimuth_bin_width: Degree,

    // --- Temporal pre-smoothing ---
    pub median_window_minutes: u32,

    // --- Event alignment ---
    pub half_window_minutes: u32,
    pub lag_override_minutes: Option<u32>,

    // --- Cosine-fit grouping ---
    pub mlt_width: f64,
    pub reltime_starts: Vec<Minutes>,
    pub reltime_resolution: u32,

    // --- Fit candidate gates / numerics ---
    pub abs_losvel_maxlim: Mps,
    pub abs_azm_maxlim: Degree,
    pub unique_azm_count_minlim: usize,
    pub fitvel_bounds: (f64, f64),
    pub weighting: Weighting,
    pub fit_axis: FitAxis,

    // --- Summary statistics ---
    pub summary_outlier_maxlim: Mps,
    pub summary_std_fallback: Mps,
}

impl PipelineParams {
    /// Construct a [`PipelineParams`] with the defaults of the original study.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fluent, validated [`PipelineParamsBuilder`].
    pub fn builder() -> PipelineParamsBuilder {
        PipelineParamsBuilder::new()
    }

    /// Effective response lag for one event in minutes.
    pub fn effective_lag(&self, catalog_lag: u32) -> u32 {
        self.lag_override_minutes.unwrap_or(catalog_lag)
    }

    /// Half of the local-time gather window, in degrees of the 24-hour dial.
    pub fn mlt_half_window_degrees(&self) -> Degree {
        self.mlt_width / 2.0 * 15.0
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            coords: CoordinateSystem::Mlt,
            lat_bin_width: 1.0,
            lt_bin_width: 15.0,
            azimuth_bin_width: 15.0,

            median_window_minutes: 2,

            half_window_minutes: 60,
            lag_override_minutes: None,

            mlt_width: 1.0,
            reltime_starts: (-30..=30).step_by(2).collect(),
            reltime_resolution: 2,

            abs_losvel_maxlim: 300.0,
            abs_azm_maxlim: 75.0,
            unique_azm_count_minlim: 3,
            fitvel_bounds: (-300.0, 300.0),
            weighting: Weighting::default(),
            fit_axis: FitAxis::default(),

            summary_outlier_maxlim: 500.0,
            summary_std_fallback: 500.0,
        }
    }
}

/// Builder for [`PipelineParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct PipelineParamsBuilder {
    params: PipelineParams,
}

impl PipelineParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: PipelineParams::default(),
        }
    }

    // --- Spatial discretization ---
    pub fn coords(mut self, v: CoordinateSystem) -> Self {
        self.params.coords = v;
        self
    }
    pub fn lat_bin_width(mut self, v: Degree) -> Self {
        self.params.lat_bin_width = v;
        self
    }
    pub fn lt_bin_width(mut self, v: Degree) -> Self {
        self.params.lt_bin_width = v;
        self
    }
    pub fn azimuth_bin_width(mut self, v: Degree) -> Self {
        self.params.azimuth_bin_width = v;
        self
    }

    // --- Temporal pre-smoothing ---
    pub fn median_window_minutes(mut self, v: u32) -> Self {
        self.params.median_window_minutes = v;
        self
    }

    // --- Event alignment ---
    pub fn half_window_minutes(mut self, v: u32) -> Self {
        self.params.half_window_minutes = v;
        self
    }
    pub fn lag_override_minutes(mut self, v: Option<u32>) -> Self {
        self.params.lag_override_minutes = v;
        self
    }

    // --- Cosine-fit grouping ---
    pub fn mlt_width(mut self, v: f64) -> Self {
        self.params.mlt_width = v;
        self
    }
    pub fn reltime_starts(mut self, v: Vec<Minutes>) -> Self {
        self.params.reltime_starts = v;
        self
    }
    pub fn reltime_resolution(mut self, v: u32) -> Self {
        self.params.reltime_resolution = v;
        self
    }

    // --- Fit gates / numerics ---
    pub fn abs_losvel_maxlim(mut self, v: Mps) -> Self {
        self.params.abs_losvel_maxlim = v;
        self
    }
    pub fn abs_azm_maxlim(mut self, v: Degree) -> Self {
        self.params.abs_azm_maxlim = v;
        self
    }
    pub fn unique_azm_count_minlim(mut self, v: usize) -> Self {
        self.params.unique_azm_count_minlim = v;
        self
    }
    pub fn fitvel_bounds(mut self, v: (f64, f64)) -> Self {
        self.params.fitvel_bounds = v;
        self
    }
    pub fn weighting(mut self, v: Weighting) -> Self {
        self.params.weighting = v;
        self
    }
    pub fn fit_axis(mut self, v: FitAxis) -> Self {
        self.params.fit_axis = v;
        self
    }

    // --- Summary ---
    pub fn summary_outlier_maxlim(mut self, v: Mps) -> Self {
        self.params.summary_outlier_maxlim = v;
        self
    }
    pub fn summary_std_fallback(mut self, v: Mps) -> Self {
        self.params.summary_std_fallback = v;
        self
    }

    // ---- Numeric helpers for PartialOrd (treat NaN as invalid) ----

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Return true iff a < b and comparable (i.e., not NaN).
    #[inline]
    fn lt(a: f64, b: f64) -> bool {
        a.partial_cmp(&b) == Some(Less)
    }

    /// Finalize the builder and produce a validated [`PipelineParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `lat_bin_width`, `lt_bin_width`, `azimuth_bin_width` strictly positive
    ///   and the circular widths no wider than 360°.
    /// * `median_window_minutes ≥ 1`, `half_window_minutes ≥ 1`,
    ///   `reltime_resolution ≥ 1`.
    /// * `reltime_starts` non-empty.
    /// * `abs_losvel_maxlim ≥ 0`, `abs_azm_maxlim ∈ [0, 180]`.
    /// * `fitvel_bounds.0 < fitvel_bounds.1`.
    /// * `mlt_width > 0`, `summary_outlier_maxlim ≥ 0`,
    ///   `summary_std_fallback ≥ 0`.
    pub fn build(self) -> Result<PipelineParams, SdconvError> {
        let p = &self.params;

        if !Self::gt0(p.lat_bin_width) {
            return Err(SdconvError::InvalidParameter(
                "lat_bin_width must be > 0".into(),
            ));
        }
        if !Self::gt0(p.lt_bin_width) || p.lt_bin_width > 360.0 {
            return Err(SdconvError::InvalidParameter(
                "lt_bin_width must be in (0, 360]".into(),
            ));
        }
        if !Self::gt0(p.azimuth_bin_width) || p.azimuth_bin_width > 360.0 {
            return Err(SdconvError::InvalidParameter(
                "azimuth_bin_width must be in (0, 360]".into(),
            ));
        }
        if p.median_window_minutes == 0 {
            return Err(SdconvError::InvalidParameter(
                "median_window_minutes must be >= 1".into(),
            ));
        }
        if p.half_window_minutes == 0 {
            return Err(SdconvError::InvalidParameter(
                "half_window_minutes must be >= 1".into(),
            ));
        }
        if p.reltime_resolution == 0 {
            return Err(SdconvError::InvalidParameter(
                "reltime_resolution must be >= 1".into(),
            ));
        }
        if p.reltime_starts.is_empty() {
            return Err(SdconvError::InvalidParameter(
                "reltime_starts must not be empty".into(),
            ));
        }
        if !Self::gt0(p.mlt_width) {
            return Err(SdconvError::InvalidParameter(
                "mlt_width must be > 0".into(),
            ));
        }
        if !Self::ge0(p.abs_losvel_maxlim) {
            return Err(SdconvError::InvalidParameter(
                "abs_losvel_maxlim must be >= 0".into(),
            ));
        }
        if !Self::ge0(p.abs_azm_maxlim) || p.abs_azm_maxlim > 180.0 {
            return Err(SdconvError::InvalidParameter(
                "abs_azm_maxlim must be in [0, 180]".into(),
            ));
        }
        if !Self::lt(p.fitvel_bounds.0, p.fitvel_bounds.1) {
            return Err(SdconvError::InvalidParameter(
                "fitvel_bounds must satisfy min < max".into(),
            ));
        }
        if !Self::ge0(p.summary_outlier_maxlim) || !Self::ge0(p.summary_std_fallback) {
            return Err(SdconvError::InvalidParameter(
                "summary limits must be >= 0".into(),
            ));
        }

        Ok(self.params)
    }
}
