use serde::{Deserialize, Serialize};

use crate::math::equals_epsilon;

/// A position in radians. Used as the lightweight record returned by
/// rectangle corners and tile centers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}
impl Cartographic {
    pub const ZERO: Cartographic = Cartographic {
        longitude: 0.0,
        latitude: 0.0,
        height: 0.0,
    };
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic::from_radians(longitude, latitude, height)
    }
    pub fn from_radians(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude,
            latitude,
            height,
        }
    }
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Cartographic {
            longitude: longitude.to_radians(),
            latitude: latitude.to_radians(),
            height,
        }
    }
    pub fn equals_epsilon(&self, right: &Cartographic, epsilon: f64) -> bool {
        return equals_epsilon(self.longitude, right.longitude, Some(epsilon), None)
            && equals_epsilon(self.latitude, right.latitude, Some(epsilon), None)
            && equals_epsilon(self.height, right.height, Some(epsilon), None);
    }
}
impl std::fmt::Display for Cartographic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cartographic {{ longitude: {}, latitude: {}, height: {} }}",
            self.longitude, self.latitude, self.height
        )
    }
}
