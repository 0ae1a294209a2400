//! # End-to-end pipeline driver
//!
//! Orchestrates one run: grid the raw soundings, median-filter them per
//! radar around each selected event, combine radars, superpose on the
//! relative clock, fit the cosine model per cell and bucket, and summarize.
//! Everything lands in a [`MasterStore`], whose insert-or-ignore tables make
//! the whole run idempotent: feeding the same events and samples twice
//! leaves the store unchanged.
//!
//! Failures stay local. An event whose window holds no data, or a cell whose
//! fit degenerates, is logged and reported without touching the rest of the
//! run; the only fatal errors are configuration-level ones (an unreadable
//! store layout).

use hifitime::Unit;
use itertools::Itertools;

use crate::combine::RadarCombiner;
use crate::config::PipelineParams;
use crate::constants::{AHashMap, RadarId};
use crate::cosfit::{CosineFitter, SkippedGroup};
use crate::events::{EventCatalog, EventStatus};
use crate::grid::{GridSpec, SpatialGridder};
use crate::median_filter::TemporalMedianFilter;
use crate::samples::{RawSample, SuperposedSample};
use crate::sdconv_errors::SdconvError;
use crate::store::{MasterStore, StoreCounts};
use crate::summary::summarize;
use crate::superpose::SuperposedEpochAligner;

/// What one event contributed to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventReport {
    /// Median-filtered rows found inside the event's window, all radars.
    pub filtered_rows: usize,
    /// Superposed rows newly inserted (duplicates of prior runs excluded).
    pub superposed_new: usize,
}

/// Outcome of one [`run_pipeline`] call.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-event contributions, keyed by the event's index in the good
    /// selection.
    pub per_event: AHashMap<usize, EventReport>,
    /// Fit rows newly inserted into the store.
    pub fits_new: usize,
    /// Groups that produced no fit, with reasons.
    pub fit_skips: Vec<SkippedGroup>,
    /// Store row counts after the run.
    pub counts: StoreCounts,
}

/// Run the full superposed-epoch pipeline over one raw sample set.
///
/// Arguments
/// -----------------
/// * `catalog`: the event catalog; only events rated good are processed.
/// * `raw_samples`: geolocated soundings covering (at least) the windows of
///   the selected events. Samples outside every window are simply unused.
/// * `params`: run configuration.
/// * `store`: accumulation target; may already hold rows from earlier runs.
///
/// Return
/// ----------
/// * [`RunReport`] on success.
/// * [`SdconvError::SchemaVersionTooNew`] when the store was written by a
///   newer layout.
///
/// The fit and summary stages always run over the complete superposed table,
/// so a store grown across several calls ends up with the same fits as a
/// single call over the union of the inputs.
pub fn run_pipeline(
    catalog: &EventCatalog,
    raw_samples: &[RawSample],
    params: &PipelineParams,
    store: &mut MasterStore,
) -> Result<RunReport, SdconvError> {
    store.migrate()?;

    log::info!(
        "pipeline start: coords {}, fit axis {}, weighting {:?}",
        params.coords.tag(),
        params.fit_axis.column_label(),
        params.weighting
    );

    let events = catalog.select(None, Some(EventStatus::Good));
    if events.is_empty() {
        log::warn!("no good-rated events in the catalog; nothing to superpose");
    }

    let gridder = SpatialGridder::new(GridSpec::from_params(params));
    let gridded = gridder.grid_all(raw_samples);
    log::info!(
        "gridded {} of {} raw samples",
        gridded.len(),
        raw_samples.len()
    );

    let radars: Vec<RadarId> = gridded
        .iter()
        .map(|s| s.radar_id.clone())
        .unique()
        .sorted()
        .collect();
    let filter = TemporalMedianFilter::new(params.median_window_minutes);
    let aligner = SuperposedEpochAligner::from_params(params);
    let half_window = Unit::Minute * params.half_window_minutes as i64;

    let mut report = RunReport::default();
    for (index, event) in events.iter().enumerate() {
        let response = SuperposedEpochAligner::response_time(event, params);
        let window_start = response - half_window;
        let window_end = response + half_window;

        let mut combiner = RadarCombiner::new();
        for radar in &radars {
            combiner.extend(filter.filter(radar, &gridded, window_start, window_end));
        }
        let rows = combiner.sorted_by_time();
        let aligned = aligner.align_event(index, event, &rows, params);
        if aligned.is_empty() {
            log::warn!(
                "event {index} at {} contributed no samples",
                event.event_time
            );
        }

        let mut superposed_new = 0;
        for s in &aligned {
            if store.insert_superposed(s) {
                superposed_new += 1;
            }
        }
        report.per_event.insert(
            index,
            EventReport {
                filtered_rows: rows.len(),
                superposed_new,
            },
        );
    }

    // Fit and summarize over the complete table, not just this call's new
    // rows, so incremental runs converge on the same products.
    let all_superposed: Vec<SuperposedSample> = store
        .superposed()
        .map(|(key, &velocity)| SuperposedSample {
            radar_id: key.2.clone(),
            relative_minutes: key.0,
            cell: key.1,
            velocity,
            source_event: key.3,
        })
        .collect();

    let batch = CosineFitter::new(params).fit_all(&all_superposed);
    if !batch.skipped.is_empty() {
        log::warn!("{} fit groups skipped", batch.skipped.len());
    }
    for fit in batch.results {
        if store.insert_fit(fit) {
            report.fits_new += 1;
        }
    }
    report.fit_skips = batch.skipped;

    for row in summarize(&all_superposed, params) {
        store.insert_summary(row);
    }

    report.counts = store.counts();
    log::info!(
        "run complete: {} superposed rows, {} fits, {} summary cells",
        report.counts.superposed,
        report.counts.fits,
        report.counts.summary
    );
    Ok(report)
}
