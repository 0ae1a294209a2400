//! # Multi-radar combination
//!
//! Unions per-radar filtered streams into one time-ordered table. The union
//! is keyed by the natural composite key (cell, timestamp, radar): the first
//! writer wins and later duplicates are ignored, which makes re-runs and
//! overlapping inputs safe without any coordination.

use std::collections::BTreeMap;

use hifitime::Epoch;

use crate::constants::RadarId;
use crate::grid::GridCell;
use crate::samples::FilteredSample;

/// Natural key of the combined table.
pub type CombinedKey = (GridCell, Epoch, RadarId);

/// Order-preserving union of per-radar filtered sample streams.
#[derive(Debug, Default, Clone)]
pub struct RadarCombiner {
    rows: BTreeMap<CombinedKey, FilteredSample>,
}

impl RadarCombiner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one filtered sample; duplicates of an existing
    /// (cell, timestamp, radar) key are ignored.
    ///
    /// Return
    /// ----------
    /// * `true` when the sample was inserted, `false` when the key already
    ///   existed.
    pub fn insert(&mut self, sample: FilteredSample) -> bool {
        let key = (sample.cell, sample.timestamp, sample.radar_id.clone());
        match self.rows.entry(key) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(sample);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Union a whole per-radar stream into the combined table.
    pub fn extend<I>(&mut self, samples: I)
    where
        I: IntoIterator<Item = FilteredSample>,
    {
        for s in samples {
            self.insert(s);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The combined rows sorted by timestamp ascending (ties broken by cell
    /// then radar), the order the windowed consumers downstream expect.
    pub fn sorted_by_time(&self) -> Vec<&FilteredSample> {
        let mut rows: Vec<&FilteredSample> = self.rows.values().collect();
        rows.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.cell.cmp(&b.cell))
                .then_with(|| a.radar_id.cmp(&b.radar_id))
        });
        rows
    }
}
