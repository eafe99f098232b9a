use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

pub const CENTIMETRES_PER_METRE: u32 = 100;
pub const WATTS_PER_KILOWATT: u32 = 1_000;
/// Approximate length of one degree of latitude, used to turn lat/lng deltas into metres.
/// This ignores the narrowing of longitude degrees away from the equator.
pub const METRES_PER_DEGREE: f64 = 111_000.;

pub fn centimetres_to_metres(length_cm: f64) -> f64 {
    length_cm / CENTIMETRES_PER_METRE as f64
}

pub fn watts_to_kilowatts(power_w: f64) -> f64 {
    power_w / WATTS_PER_KILOWATT as f64
}

/// Planar distance in metres between two lat/lng pairs using the fixed degree multiplier.
pub fn approximate_distance_metres(
    (lat1, lng1): (f64, f64),
    (lat2, lng2): (f64, f64),
    metres_per_degree: f64,
) -> f64 {
    ((lat1 - lat2).powi(2) + (lng1 - lng2).powi(2)).sqrt() * metres_per_degree
}

/// Linear similarity in [0, 1]: 1 when `difference` is zero, falling to 0 at `span`.
pub fn linear_similarity(difference: f64, span: f64) -> f64 {
    if span <= 0. || !difference.is_finite() {
        return 0.;
    }
    (1. - difference.abs() / span).clamp(0., 1.)
}

/// Compass bearing of a surface in degrees, N=0, E=90, S=180, W=270.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Orientation360(f64);

impl Orientation360 {
    pub fn new(angle: f64) -> Result<Self, Orientation360Error> {
        if !(0. ..=360.).contains(&angle) {
            return Err(Orientation360Error::InvalidAngle);
        }

        Ok(Self(angle))
    }

    /// Wraps any finite angle into [0, 360). Non-finite angles become 0.
    pub fn normalised(angle: f64) -> Self {
        if !angle.is_finite() {
            return Self(0.);
        }
        Self(angle.rem_euclid(360.))
    }

    pub fn angle(&self) -> f64 {
        self.0
    }

    /// Smallest angle between two bearings, in [0, 180].
    pub fn orientation_difference(
        orientation1: Orientation360,
        orientation2: Orientation360,
    ) -> f64 {
        let op_rel_orientation = (orientation1.angle() - orientation2.angle()).abs();

        if op_rel_orientation > 180. {
            360. - op_rel_orientation
        } else {
            op_rel_orientation
        }
    }
}

impl Display for Orientation360 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Orientation360 {
    fn from(angle: f64) -> Self {
        Self::normalised(angle)
    }
}

impl FromStr for Orientation360 {
    type Err = Orientation360Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let angle = s
            .trim()
            .parse::<f64>()
            .map_err(|_| Orientation360Error::InvalidAngle)?;
        Self::new(angle)
    }
}

#[derive(Clone, Copy, Debug, Error)]
pub enum Orientation360Error {
    #[error("Angle must be between 0 and 360 degrees inclusive")]
    InvalidAngle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_convert_centimetres_to_metres() {
        assert_relative_eq!(centimetres_to_metres(172.2), 1.722);
    }

    #[rstest]
    fn should_approximate_distance_using_degree_multiplier() {
        assert_relative_eq!(
            approximate_distance_metres((51.5, -0.1), (51.5003, -0.1004), METRES_PER_DEGREE),
            55.5,
            max_relative = 1e-9
        );
    }

    #[rstest]
    #[case(0., 45., 1.)]
    #[case(22.5, 45., 0.5)]
    #[case(45., 45., 0.)]
    #[case(90., 45., 0.)]
    #[case(-22.5, 45., 0.5)]
    #[case(10., 0., 0.)]
    fn test_linear_similarity(#[case] difference: f64, #[case] span: f64, #[case] expected: f64) {
        assert_relative_eq!(linear_similarity(difference, span), expected);
    }

    mod orientation360 {
        use super::*;
        use pretty_assertions::assert_eq;

        #[rstest]
        fn test_orientation360_invalid_angle() {
            assert!(Orientation360::new(-10.).is_err());
            assert!(Orientation360::new(380.).is_err());
        }

        #[rstest]
        fn test_orientation360_normalised_wraps() {
            assert_eq!(Orientation360::normalised(-90.).angle(), 270.);
            assert_eq!(Orientation360::normalised(370.).angle(), 10.);
            assert_eq!(Orientation360::normalised(f64::NAN).angle(), 0.);
        }

        #[rstest]
        #[case(10., 350., 20.)]
        #[case(180., 0., 180.)]
        #[case(90., 135., 45.)]
        fn test_orientation_difference(#[case] a: f64, #[case] b: f64, #[case] expected: f64) {
            assert_eq!(
                Orientation360::orientation_difference(a.into(), b.into()),
                expected
            );
        }

        #[rstest]
        fn test_orientation360_from_str() {
            assert_eq!("180".parse::<Orientation360>().unwrap().angle(), 180.);
            assert!("north".parse::<Orientation360>().is_err());
        }
    }
}
