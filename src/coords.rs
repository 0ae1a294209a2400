//! # Coordinate systems and circular-angle arithmetic
//!
//! The binning and fitting stages are generic over the coordinate system the
//! upstream geolocation produced: magnetic latitude / magnetic local time
//! (`mlt`) or geographic latitude / solar local time (`geo`). The choice is a
//! data value — a [`CoordinateSystem`] descriptor naming the two spatial axes
//! — so a single binning/fitting implementation serves both, instead of two
//! duplicated code paths.
//!
//! Local time and azimuth are circular coordinates. This module owns the two
//! normalizations the rest of the crate relies on:
//!
//! * [`wrap_360`] — angles to `[0, 360)`, used for local-time axes,
//! * [`normalize_azimuth`] — look directions to `(−180, 180]`, since azimuth
//!   is symmetric about the beam boresight.
//!
//! Conversion between geographic and magnetic frames (including declination
//! correction of beam bearings) is **not** implemented here. It lives behind
//! the [`CoordConverter`] trait so that a well-tested external utility can be
//! plugged in; this crate never re-derives bearing sign conventions.

use std::str::FromStr;

use hifitime::Epoch;

use crate::constants::{Degree, DEGREES_PER_HOUR};
use crate::sdconv_errors::SdconvError;

/// The coordinate system in which samples are gridded and fitted.
///
/// Selecting a system only changes the labels under which spatial axes are
/// exported; the binning and fitting arithmetic is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// Magnetic latitude / magnetic local time (degrees).
    Mlt,
    /// Geographic latitude / solar local time (degrees).
    Geo,
}

impl CoordinateSystem {
    /// Column label for the gridded latitude axis (`mag_glatc` / `geo_glatc`).
    pub fn lat_label(&self) -> &'static str {
        match self {
            CoordinateSystem::Mlt => "mag_glatc",
            CoordinateSystem::Geo => "geo_glatc",
        }
    }

    /// Column label for the gridded local-time axis (`mag_gltc` / `geo_gltc`).
    pub fn lt_label(&self) -> &'static str {
        match self {
            CoordinateSystem::Mlt => "mag_gltc",
            CoordinateSystem::Geo => "geo_gltc",
        }
    }

    /// Column label for the gridded azimuth axis (`mag_gazmc` / `geo_gazmc`).
    pub fn azimuth_label(&self) -> &'static str {
        match self {
            CoordinateSystem::Mlt => "mag_gazmc",
            CoordinateSystem::Geo => "geo_gazmc",
        }
    }

    /// Short tag used in export file names (`mlt` / `geo`).
    pub fn tag(&self) -> &'static str {
        match self {
            CoordinateSystem::Mlt => "mlt",
            CoordinateSystem::Geo => "geo",
        }
    }
}

impl FromStr for CoordinateSystem {
    type Err = SdconvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mlt" => Ok(CoordinateSystem::Mlt),
            "geo" => Ok(CoordinateSystem::Geo),
            other => Err(SdconvError::UnknownCoordinateSystem(other.to_string())),
        }
    }
}

/// External coordinate conversion seam.
///
/// Implementations convert a point between coordinate systems at a given
/// altitude and instant (e.g. geographic → magnetic local time via AACGM).
/// The pipeline treats this as a black box; any declination correction of
/// beam bearings must happen inside the implementation.
pub trait CoordConverter {
    /// Convert `(lat, lon_or_lt)` from `from` to `to` at `altitude_km` and `at`.
    ///
    /// Return
    /// ------
    /// * `(lat2, lt_or_lon2)` in the target system, both in degrees.
    fn convert(
        &self,
        lat: Degree,
        lon_or_lt: Degree,
        from: CoordinateSystem,
        to: CoordinateSystem,
        altitude_km: f64,
        at: Epoch,
    ) -> Result<(Degree, Degree), SdconvError>;
}

/// Converter for data already expressed in the pipeline's coordinate system.
///
/// Same-system requests pass through untouched; a cross-frame request is a
/// configuration mistake (the upstream geolocation should have been run in
/// the target frame) and is reported as [`SdconvError::CoordConversion`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl CoordConverter for IdentityConverter {
    fn convert(
        &self,
        lat: Degree,
        lon_or_lt: Degree,
        from: CoordinateSystem,
        to: CoordinateSystem,
        _altitude_km: f64,
        _at: Epoch,
    ) -> Result<(Degree, Degree), SdconvError> {
        if from == to {
            Ok((lat, lon_or_lt))
        } else {
            Err(SdconvError::CoordConversion(format!(
                "no converter available from {} to {}",
                from.tag(),
                to.tag()
            )))
        }
    }
}

/// Wrap any finite angle into `[0, 360)`.
#[inline]
pub fn wrap_360(angle: Degree) -> Degree {
    angle.rem_euclid(360.0)
}

/// Normalize an azimuth into `(−180, 180]`.
///
/// Values above 180° map to `value − 360`; idempotent, total over all finite
/// inputs.
#[inline]
pub fn normalize_azimuth(azimuth: Degree) -> Degree {
    let a = wrap_360(azimuth);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

/// Solar local time of a point, in degrees of the 24-hour dial.
///
/// Midnight maps to 0° (or 360°), noon to 180°. Used when staying in
/// geographic coordinates: the UT timestamp is shifted by the longitude
/// (15° of longitude per hour) and re-expressed as an angle.
pub fn local_time_degrees(utc: Epoch, longitude: Degree) -> Degree {
    let lon = normalize_azimuth(longitude);
    let (_, _, _, hh, mm, ss, ns) = utc.to_gregorian_utc();
    let ut_hours =
        hh as f64 + mm as f64 / 60.0 + ss as f64 / 3600.0 + ns as f64 / (3600.0 * 1.0e9);
    let local_hours = (ut_hours + lon / DEGREES_PER_HOUR).rem_euclid(24.0);
    local_hours * DEGREES_PER_HOUR
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hifitime::Epoch;

    #[test]
    fn wrap_360_covers_negative_and_large_angles() {
        assert_relative_eq!(wrap_360(-5.0), 355.0);
        assert_relative_eq!(wrap_360(725.0), 5.0);
        assert_relative_eq!(wrap_360(360.0), 0.0);
    }

    #[test]
    fn azimuth_normalization_is_idempotent() {
        for raw in [-720.0, -181.0, -180.0, -1.0, 0.0, 179.0, 180.0, 181.0, 359.0, 723.0] {
            let once = normalize_azimuth(raw);
            assert!(once > -180.0 && once <= 180.0, "raw={raw} once={once}");
            assert_relative_eq!(normalize_azimuth(once), once);
        }
    }

    #[test]
    fn azimuth_above_180_maps_down() {
        assert_relative_eq!(normalize_azimuth(270.0), -90.0);
        assert_relative_eq!(normalize_azimuth(181.0), -179.0);
        assert_relative_eq!(normalize_azimuth(180.0), 180.0);
    }

    #[test]
    fn local_time_at_greenwich_morning() {
        let utc = Epoch::from_gregorian_utc(2013, 2, 21, 6, 0, 0, 0);
        assert_relative_eq!(local_time_degrees(utc, 0.0), 90.0);
    }

    #[test]
    fn local_time_wraps_across_midnight() {
        // 23:00 UT at 30°E → 01:00 local → 15°
        let utc = Epoch::from_gregorian_utc(2013, 2, 21, 23, 0, 0, 0);
        assert_relative_eq!(local_time_degrees(utc, 30.0), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn identity_converter_passes_same_frame_points_through() {
        let at = Epoch::from_gregorian_utc(2013, 2, 21, 6, 0, 0, 0);
        let (lat, lt) = IdentityConverter
            .convert(62.5, 310.0, CoordinateSystem::Mlt, CoordinateSystem::Mlt, 300.0, at)
            .unwrap();
        assert_relative_eq!(lat, 62.5);
        assert_relative_eq!(lt, 310.0);
    }

    #[test]
    fn identity_converter_refuses_cross_frame_requests() {
        let at = Epoch::from_gregorian_utc(2013, 2, 21, 6, 0, 0, 0);
        let err = IdentityConverter
            .convert(62.5, 310.0, CoordinateSystem::Geo, CoordinateSystem::Mlt, 300.0, at)
            .unwrap_err();
        assert!(matches!(err, SdconvError::CoordConversion(_)));
    }

    #[test]
    fn coordinate_system_from_str() {
        assert_eq!("mlt".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::Mlt);
        assert_eq!("geo".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::Geo);
        assert!(matches!(
            "magnetic".parse::<CoordinateSystem>(),
            Err(SdconvError::UnknownCoordinateSystem(_))
        ));
    }
}
