//! # Master store
//!
//! The accumulation point of a run: typed, ordered tables for the
//! superposed samples, the cosine fit results and the per-cell summary.
//! Every table is keyed by its natural composite key and inserts are
//! ignore-on-conflict, so feeding the store the same event twice (or
//! rerunning a whole pipeline over an already-populated store) changes
//! nothing. That idempotence is what lets event selections be refined
//! incrementally without rebuilding from scratch.
//!
//! The store carries a schema version. [`MasterStore::migrate`] walks a
//! store created under an older layout up to the current one and is a no-op
//! at the current version; a store from a newer layout is refused rather
//! than silently misread.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::PipelineParams;
use crate::constants::{Minutes, Mps, RadarId};
use crate::cosfit::CosineFitResult;
use crate::grid::{GridCell, SpatialCell};
use crate::samples::SuperposedSample;
use crate::sdconv_errors::SdconvError;
use crate::summary::SummaryRow;

/// Layout version written by this build.
///
/// Version 1 predates the summary table; version 2 is the current layout.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Natural key of the superposed table: one row per
/// (relative time, cell, radar, source event).
pub type SuperposedKey = (Minutes, GridCell, RadarId, usize);

/// Natural key of the fit table: one row per (relative time, spatial cell).
pub type FitKey = (Minutes, SpatialCell);

/// Row counts per table, as reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub superposed: usize,
    pub fits: usize,
    pub summary: usize,
}

#[derive(Debug, Clone)]
pub struct MasterStore {
    schema_version: u32,
    superposed: BTreeMap<SuperposedKey, Mps>,
    fits: BTreeMap<FitKey, CosineFitResult>,
    summary: BTreeMap<GridCell, SummaryRow>,
}

impl Default for MasterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterStore {
    /// An empty store at the current schema version.
    pub fn new() -> Self {
        MasterStore {
            schema_version: CURRENT_SCHEMA_VERSION,
            superposed: BTreeMap::new(),
            fits: BTreeMap::new(),
            summary: BTreeMap::new(),
        }
    }

    /// An empty store claiming an arbitrary schema version, as when opening
    /// data written by another build.
    pub fn with_schema_version(version: u32) -> Self {
        MasterStore {
            schema_version: version,
            ..Self::new()
        }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Bring the store's layout up to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Running it again is a no-op. A version newer than this build
    /// understands is an error; nothing is modified in that case.
    pub fn migrate(&mut self) -> Result<(), SdconvError> {
        if self.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(SdconvError::SchemaVersionTooNew {
                found: self.schema_version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if self.schema_version < 2 {
            // v1 → v2 added the summary table; an absent table is just
            // empty here, so only the version marker moves.
            self.schema_version = 2;
        }
        Ok(())
    }

    /// Insert one superposed sample; `false` when its key already exists.
    pub fn insert_superposed(&mut self, sample: &SuperposedSample) -> bool {
        let key = (
            sample.relative_minutes,
            sample.cell,
            sample.radar_id.clone(),
            sample.source_event,
        );
        insert_if_vacant(&mut self.superposed, key, sample.velocity)
    }

    /// Insert one fit result; `false` when its key already exists.
    pub fn insert_fit(&mut self, fit: CosineFitResult) -> bool {
        let key = (
            fit.relative_time,
            SpatialCell::new(fit.lat_center, fit.lt_center),
        );
        insert_if_vacant(&mut self.fits, key, fit)
    }

    /// Insert one summary row; `false` when its cell already exists.
    pub fn insert_summary(&mut self, row: SummaryRow) -> bool {
        let cell = GridCell::new(row.lat_center, row.lt_center, row.azimuth_center);
        insert_if_vacant(&mut self.summary, cell, row)
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            superposed: self.superposed.len(),
            fits: self.fits.len(),
            summary: self.summary.len(),
        }
    }

    /// Fit results in (relative time, cell) order.
    pub fn fits(&self) -> impl Iterator<Item = &CosineFitResult> {
        self.fits.values()
    }

    /// Summary rows in cell order.
    pub fn summary(&self) -> impl Iterator<Item = &SummaryRow> {
        self.summary.values()
    }

    /// Superposed rows in natural-key order.
    pub fn superposed(&self) -> impl Iterator<Item = (&SuperposedKey, &Mps)> {
        self.superposed.iter()
    }

    /// File name of the fit export for a given configuration, e.g.
    /// `cosfit_mlt_std_weight.csv`.
    pub fn fit_export_name(params: &PipelineParams) -> String {
        format!(
            "cosfit_{}{}.csv",
            params.coords.tag(),
            params.weighting.export_suffix()
        )
    }

    /// Write the fit table as CSV under `dir` and return the file path.
    pub fn export_fits(
        &self,
        dir: &Utf8Path,
        params: &PipelineParams,
    ) -> Result<Utf8PathBuf, SdconvError> {
        let path = dir.join(Self::fit_export_name(params));
        let mut writer = csv::Writer::from_path(&path)?;
        for fit in self.fits.values() {
            writer.serialize(fit)?;
        }
        writer.flush()?;
        log::info!("exported {} fit rows to {path}", self.fits.len());
        Ok(path)
    }

    /// Write the summary table as CSV under `dir` and return the file path.
    pub fn export_summary(
        &self,
        dir: &Utf8Path,
        params: &PipelineParams,
    ) -> Result<Utf8PathBuf, SdconvError> {
        let path = dir.join(format!("master_summary_{}.csv", params.coords.tag()));
        let mut writer = csv::Writer::from_path(&path)?;
        for row in self.summary.values() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        log::info!("exported {} summary rows to {path}", self.summary.len());
        Ok(path)
    }
}

fn insert_if_vacant<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, value: V) -> bool {
    match table.entry(key) {
        std::collections::btree_map::Entry::Vacant(e) => {
            e.insert(value);
            true
        }
        std::collections::btree_map::Entry::Occupied(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn superposed(reltime: Minutes, radar: &str, event: usize, vel: Mps) -> SuperposedSample {
        SuperposedSample {
            radar_id: radar.into(),
            relative_minutes: reltime,
            cell: GridCell::new(65.5, 0.0, 7.5),
            velocity: vel,
            source_event: event,
        }
    }

    fn fit(reltime: Minutes, lat: f64) -> CosineFitResult {
        CosineFitResult {
            lat_center: lat,
            lt_center: 0.0,
            relative_time: reltime,
            vel_mag: 100.0,
            vel_mag_err: 5.0,
            vel_dir: 20.0,
            vel_dir_err: 3.0,
            vel_count: 12,
            azimuth_span: 120.0,
        }
    }

    #[test]
    fn duplicate_superposed_keys_are_ignored() {
        let mut store = MasterStore::new();
        assert!(store.insert_superposed(&superposed(0, "bks", 3, 100.0)));
        assert!(!store.insert_superposed(&superposed(0, "bks", 3, 999.0)));
        assert_eq!(store.counts().superposed, 1);
        assert_eq!(*store.superposed().next().unwrap().1, 100.0);
    }

    #[test]
    fn same_row_from_another_event_is_kept() {
        let mut store = MasterStore::new();
        store.insert_superposed(&superposed(0, "bks", 3, 100.0));
        store.insert_superposed(&superposed(0, "bks", 4, 100.0));
        assert_eq!(store.counts().superposed, 2);
    }

    #[test]
    fn fit_reinsertion_is_idempotent() {
        let mut store = MasterStore::new();
        assert!(store.insert_fit(fit(0, 65.5)));
        assert!(!store.insert_fit(fit(0, 65.5)));
        assert!(store.insert_fit(fit(2, 65.5)));
        assert_eq!(store.counts().fits, 2);
    }

    #[test]
    fn migrate_is_idempotent_from_an_old_version() {
        let mut store = MasterStore::with_schema_version(1);
        store.migrate().unwrap();
        assert_eq!(store.schema_version(), CURRENT_SCHEMA_VERSION);
        store.migrate().unwrap();
        assert_eq!(store.schema_version(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrate_refuses_a_newer_version() {
        let mut store = MasterStore::with_schema_version(CURRENT_SCHEMA_VERSION + 1);
        let err = store.migrate().unwrap_err();
        assert_eq!(
            err,
            SdconvError::SchemaVersionTooNew {
                found: CURRENT_SCHEMA_VERSION + 1,
                supported: CURRENT_SCHEMA_VERSION,
            }
        );
    }

    #[test]
    fn export_names_follow_the_configuration() {
        use crate::config::Weighting;
        let unweighted = PipelineParams::new();
        assert_eq!(MasterStore::fit_export_name(&unweighted), "cosfit_mlt.csv");
        let weighted = PipelineParams::builder()
            .weighting(Weighting::Std)
            .build()
            .unwrap();
        assert_eq!(
            MasterStore::fit_export_name(&weighted),
            "cosfit_mlt_std_weight.csv"
        );
    }
}
