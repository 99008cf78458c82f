//! Length measurement and conversion to kilometres.
//!
//! In [`LengthMode::Planar`] lengths are measured in coordinate units
//! (degrees for geodetic data). Each clipped segment is multiplied by
//! [`DEGREE_SCALE`], and grouped sums are divided by [`GROUPING_DIVISOR`],
//! a net factor of 100 from degrees to "kilometres". This ignores latitude
//! and is only a rough approximation of ground distance.
//!
//! [`LengthMode::Geodesic`] measures on the WGS84 ellipsoid in metres and
//! groups into kilometres with the same divisor.

use geo::{Euclidean, Geodesic, Length, LineString};
use road_density_engine_models::LengthMode;

/// Per-segment factor applied to planar lengths.
pub const DEGREE_SCALE: f64 = 100_000.0;

/// Divisor applied to grouped (summed) lengths.
pub const GROUPING_DIVISOR: f64 = 1_000.0;

/// Measures clipped geometry and converts it to output units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitConverter {
    mode: LengthMode,
}

impl UnitConverter {
    #[must_use]
    pub const fn new(mode: LengthMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(self) -> LengthMode {
        self.mode
    }

    /// Native length of a set of polylines: degrees in planar mode,
    /// metres in geodesic mode.
    #[must_use]
    pub fn measure<'a>(self, lines: impl IntoIterator<Item = &'a LineString<f64>>) -> f64 {
        lines
            .into_iter()
            .map(|line| match self.mode {
                LengthMode::Planar => Euclidean.length(line),
                LengthMode::Geodesic => Geodesic.length(line),
            })
            .sum()
    }

    /// First stage: per-segment scaling of a native length.
    #[must_use]
    pub fn scale(self, native: f64) -> f64 {
        match self.mode {
            LengthMode::Planar => native * DEGREE_SCALE,
            LengthMode::Geodesic => native,
        }
    }

    /// Second stage: turns a sum of scaled lengths into kilometres.
    #[must_use]
    pub fn group(self, scaled: f64) -> f64 {
        scaled / GROUPING_DIVISOR
    }

    /// Both stages at once.
    #[must_use]
    pub fn to_km(self, native: f64) -> f64 {
        self.group(self.scale(native))
    }
}
