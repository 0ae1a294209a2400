//! # Spatial gridding
//!
//! Maps each raw sample's continuous coordinates onto a discrete
//! (latitude, local-time, azimuth) cell key.
//!
//! Binning conventions:
//!
//! * **Latitude** — floor-to-width bins with centers at half-widths, so a 1°
//!   grid yields half-integer centers (55.0…56.0 → 55.5).
//! * **Local time** — circular; bins are centered on multiples of the width,
//!   which places one bin astride the 0/360 seam (width 15° → the 0° bin
//!   spans [352.5, 7.5)). `bin(x) == bin(x mod 360)` for any finite `x`.
//! * **Azimuth** — normalized to `(−180, 180]` first (look directions are
//!   symmetric about the boresight), then floor-to-width bins with centers
//!   at half-widths.
//!
//! Bin assignment is a pure function of the coordinates and widths: no
//! randomness, no history. Samples with a non-finite latitude cannot be
//! placed and are dropped silently.

use ordered_float::OrderedFloat;

use crate::config::PipelineParams;
use crate::constants::Degree;
use crate::coords::{normalize_azimuth, wrap_360};
use crate::samples::{GriddedSample, RawSample};

/// Bin widths for the three gridded axes, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub lat_bin_width: Degree,
    pub lt_bin_width: Degree,
    pub azimuth_bin_width: Degree,
}

impl GridSpec {
    pub fn new(lat_bin_width: Degree, lt_bin_width: Degree, azimuth_bin_width: Degree) -> Self {
        GridSpec {
            lat_bin_width,
            lt_bin_width,
            azimuth_bin_width,
        }
    }

    pub fn from_params(params: &PipelineParams) -> Self {
        GridSpec {
            lat_bin_width: params.lat_bin_width,
            lt_bin_width: params.lt_bin_width,
            azimuth_bin_width: params.azimuth_bin_width,
        }
    }
}

/// A discretized bin in (latitude, local-time, azimuth) space, identified by
/// its center coordinates.
///
/// Centers are stored as [`OrderedFloat`] so cells can key ordered maps and
/// be hashed; equality is exact since centers are produced deterministically
/// from the same widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub lat_center: OrderedFloat<f64>,
    pub lt_center: OrderedFloat<f64>,
    pub azimuth_center: OrderedFloat<f64>,
}

impl GridCell {
    pub fn new(lat_center: f64, lt_center: f64, azimuth_center: f64) -> Self {
        GridCell {
            lat_center: OrderedFloat(lat_center),
            lt_center: OrderedFloat(lt_center),
            azimuth_center: OrderedFloat(azimuth_center),
        }
    }

    /// The (latitude, local-time) projection, used as fit-group key once the
    /// azimuth dimension becomes the fit abscissa.
    pub fn spatial(&self) -> SpatialCell {
        SpatialCell {
            lat_center: self.lat_center,
            lt_center: self.lt_center,
        }
    }
}

/// A (latitude, local-time) cell with the azimuth dimension collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpatialCell {
    pub lat_center: OrderedFloat<f64>,
    pub lt_center: OrderedFloat<f64>,
}

impl SpatialCell {
    pub fn new(lat_center: f64, lt_center: f64) -> Self {
        SpatialCell {
            lat_center: OrderedFloat(lat_center),
            lt_center: OrderedFloat(lt_center),
        }
    }
}

/// Stateless binning engine for one [`GridSpec`].
#[derive(Debug, Clone, Copy)]
pub struct SpatialGridder {
    spec: GridSpec,
}

impl SpatialGridder {
    pub fn new(spec: GridSpec) -> Self {
        SpatialGridder { spec }
    }

    /// Center of the latitude bin containing `lat`.
    pub fn lat_bin(&self, lat: Degree) -> Degree {
        let w = self.spec.lat_bin_width;
        (lat / w).floor() * w + w / 2.0
    }

    /// Center of the circular local-time bin containing `lt`, in `[0, 360)`.
    ///
    /// Bins are centered on multiples of the width; values within half a
    /// width below 360 fold into the 0° bin.
    pub fn lt_bin(&self, lt: Degree) -> Degree {
        let w = self.spec.lt_bin_width;
        wrap_360((wrap_360(lt) / w).round() * w)
    }

    /// Center of the azimuth bin containing `azimuth`, after normalization
    /// to `(−180, 180]`.
    pub fn azimuth_bin(&self, azimuth: Degree) -> Degree {
        let w = self.spec.azimuth_bin_width;
        let a = normalize_azimuth(azimuth);
        (a / w).floor() * w + w / 2.0
    }

    /// Grid cell for one coordinate triple, or `None` when the latitude is
    /// not finite (the sample cannot be gridded).
    pub fn cell(&self, lat: Degree, lt: Degree, azimuth: Degree) -> Option<GridCell> {
        if !lat.is_finite() {
            return None;
        }
        Some(GridCell::new(
            self.lat_bin(lat),
            self.lt_bin(lt),
            self.azimuth_bin(azimuth),
        ))
    }

    /// Annotate one raw sample with its grid cell. Samples whose latitude is
    /// NaN (range gates beyond the geolocation model) are dropped.
    pub fn grid_sample(&self, sample: &RawSample) -> Option<GriddedSample> {
        let cell = self.cell(sample.latitude, sample.lon_or_lt, sample.azimuth)?;
        Some(GriddedSample {
            radar_id: sample.radar_id.clone(),
            timestamp: sample.timestamp,
            cell,
            velocity: sample.velocity,
        })
    }

    /// Grid a batch of raw samples, silently dropping ungriddable ones.
    pub fn grid_all<'a, I>(&self, samples: I) -> Vec<GriddedSample>
    where
        I: IntoIterator<Item = &'a RawSample>,
    {
        samples
            .into_iter()
            .filter_map(|s| self.grid_sample(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hifitime::Epoch;

    fn gridder() -> SpatialGridder {
        SpatialGridder::new(GridSpec::new(1.0, 15.0, 15.0))
    }

    fn raw(lat: f64, lt: f64, azm: f64) -> RawSample {
        RawSample {
            radar_id: "bks".into(),
            beam_number: 13,
            range_gate: 25,
            velocity: -120.0,
            latitude: lat,
            lon_or_lt: lt,
            azimuth: azm,
            timestamp: Epoch::from_gregorian_utc(2013, 2, 21, 5, 50, 0, 0),
        }
    }

    #[test]
    fn latitude_bins_center_on_half_integers() {
        let g = gridder();
        assert_relative_eq!(g.lat_bin(55.0), 55.5);
        assert_relative_eq!(g.lat_bin(55.99), 55.5);
        assert_relative_eq!(g.lat_bin(-56.2), -56.5);
    }

    #[test]
    fn local_time_bin_is_modulo_invariant() {
        let g = gridder();
        for x in [-3.0, 3.0, 45.0, 187.3, 352.6, 359.9, 400.0, 725.0] {
            assert_relative_eq!(g.lt_bin(x), g.lt_bin(wrap_360(x)));
        }
    }

    #[test]
    fn seam_bin_catches_both_sides() {
        // Width 15° → the 0° bin spans [352.5, 7.5).
        let g = gridder();
        assert_relative_eq!(g.lt_bin(358.0), 0.0);
        assert_relative_eq!(g.lt_bin(3.0), 0.0);
        assert_relative_eq!(g.lt_bin(355.0), 0.0);
        assert_relative_eq!(g.lt_bin(5.0), 0.0);
        // Just outside the seam bin on either side.
        assert_relative_eq!(g.lt_bin(352.0), 345.0);
        assert_relative_eq!(g.lt_bin(8.0), 15.0);
    }

    #[test]
    fn azimuth_is_normalized_before_binning() {
        let g = gridder();
        // 270° normalizes to −90°, landing in the [−90, −75) bin.
        assert_relative_eq!(g.azimuth_bin(270.0), -82.5);
        assert_relative_eq!(g.azimuth_bin(-90.0), -82.5);
        assert_relative_eq!(g.azimuth_bin(7.0), 7.5);
    }

    #[test]
    fn nan_latitude_is_dropped() {
        let g = gridder();
        assert!(g.grid_sample(&raw(f64::NAN, 10.0, 5.0)).is_none());
        assert!(g.grid_sample(&raw(55.2, 10.0, 5.0)).is_some());
    }

    #[test]
    fn gridding_is_deterministic() {
        let g = gridder();
        let s = raw(62.7, 353.9, -12.0);
        let a = g.grid_sample(&s).unwrap();
        let b = g.grid_sample(&s).unwrap();
        assert_eq!(a.cell, b.cell);
        assert_relative_eq!(a.cell.lat_center.0, 62.5);
        assert_relative_eq!(a.cell.lt_center.0, 0.0);
    }
}
