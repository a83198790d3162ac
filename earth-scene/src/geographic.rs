use serde::{Deserialize, Serialize};

use crate::{cartographic::Cartographic, math::equals_epsilon};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

/// A geographic position. Longitude and latitude are stored in degrees,
/// height in the linear unit of the ellipsoid radii. Immutable once built.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geographic {
    longitude: f64,
    latitude: f64,
    height: f64,
}
impl Geographic {
    /// Longitude and latitude in degrees.
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::with_unit(longitude, latitude, height, AngleUnit::Degrees)
    }
    /// Radian input is converted to degrees on construction.
    pub fn with_unit(longitude: f64, latitude: f64, height: f64, unit: AngleUnit) -> Self {
        match unit {
            AngleUnit::Degrees => Self {
                longitude,
                latitude,
                height,
            },
            AngleUnit::Radians => Self {
                longitude: longitude.to_degrees(),
                latitude: latitude.to_degrees(),
                height,
            },
        }
    }
    pub fn from_radians(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::with_unit(longitude, latitude, height, AngleUnit::Radians)
    }
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
    pub fn latitude(&self) -> f64 {
        self.latitude
    }
    pub fn height(&self) -> f64 {
        self.height
    }
    pub fn longitude_radians(&self) -> f64 {
        self.longitude.to_radians()
    }
    pub fn latitude_radians(&self) -> f64 {
        self.latitude.to_radians()
    }
    pub fn to_cartographic(&self) -> Cartographic {
        Cartographic::from_degrees(self.longitude, self.latitude, self.height)
    }
    pub fn equals_epsilon(&self, right: &Geographic, epsilon: f64) -> bool {
        return equals_epsilon(self.longitude, right.longitude, Some(epsilon), None)
            && equals_epsilon(self.latitude, right.latitude, Some(epsilon), None)
            && equals_epsilon(self.height, right.height, Some(epsilon), None);
    }
}
impl From<Cartographic> for Geographic {
    fn from(value: Cartographic) -> Self {
        Geographic::from_radians(value.longitude, value.latitude, value.height)
    }
}
impl From<&Cartographic> for Geographic {
    fn from(value: &Cartographic) -> Self {
        Geographic::from_radians(value.longitude, value.latitude, value.height)
    }
}
