//! # sdconv
//!
//! Superposed-epoch analysis of SuperDARN line-of-sight velocity data around
//! interplanetary magnetic field (IMF) turning events.
//!
//! The crate takes per-radar line-of-sight (LOS) velocity samples that have
//! already been geolocated by an upstream ingestion step, discretizes them
//! onto a magnetic-latitude / local-time / azimuth grid, median-filters them
//! in time, stacks them on a relative clock anchored to each turning event,
//! and finally recovers two-dimensional convection vectors per grid cell by
//! fitting the single-frequency cosine response `v_los(θ) = A·cos(θ − φ)`
//! to the azimuthal distribution of LOS velocities.
//!
//! ## Pipeline stages
//!
//! 1. [`grid::SpatialGridder`] — continuous coordinates → discrete [`grid::GridCell`] keys.
//! 2. [`median_filter::TemporalMedianFilter`] — per-cell median over fixed time windows.
//! 3. [`combine::RadarCombiner`] — union of per-radar streams, deduplicated.
//! 4. [`superpose::SuperposedEpochAligner`] — absolute time → minutes relative to each
//!    event's convection response time, stacked across events.
//! 5. [`cosfit`] — bounded weighted least squares of the cosine model per
//!    (cell, relative-time bucket).
//! 6. [`summary`] / [`store::MasterStore`] — persistence with insert-or-ignore
//!    semantics and descriptive statistics.
//!
//! The whole run is driven by [`pipeline::run_pipeline`] under a single
//! validated [`config::PipelineParams`].

pub mod combine;
pub mod config;
pub mod constants;
pub mod coords;
pub mod cosfit;
pub mod events;
pub mod grid;
pub mod median_filter;
pub mod pipeline;
pub mod samples;
pub mod sdconv_errors;
pub mod store;
pub mod summary;
pub mod superpose;

pub use config::{FitAxis, PipelineParams, Weighting};
pub use coords::{CoordConverter, CoordinateSystem, IdentityConverter};
pub use cosfit::CosineFitResult;
pub use events::{Event, EventCatalog, EventStatus, Polarity};
pub use grid::{GridCell, GridSpec, SpatialGridder};
pub use pipeline::{run_pipeline, RunReport};
pub use sdconv_errors::SdconvError;
pub use store::MasterStore;
