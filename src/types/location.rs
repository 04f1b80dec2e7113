use serde::{Deserialize, Serialize};
use std::fmt;

/// A geographical coordinate: latitude first, longitude second, both in degrees.
///
/// # Examples
///
/// ```
/// use solar_compare::LatLon;
///
/// let mica = LatLon(-0.22, -78.36);
/// assert_eq!(mica.0, -0.22); // Latitude
/// assert_eq!(mica.1, -78.36); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(self) -> f64 {
        self.0
    }

    pub fn longitude(self) -> f64 {
        self.1
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}
