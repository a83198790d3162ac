use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::{cartographic::Cartographic, math::*};

/// A two-dimensional region in radians. `west` greater than `east` means the
/// rectangle crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}
impl Rectangle {
    pub const MAX_VALUE: Rectangle = Rectangle {
        west: -PI,
        south: -FRAC_PI_2,
        east: PI,
        north: FRAC_PI_2,
    };
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
    pub fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.to_radians(),
            south: south.to_radians(),
            east: east.to_radians(),
            north: north.to_radians(),
        }
    }
    pub fn width(&self) -> f64 {
        let mut east = self.east;
        let west = self.west;
        if east < west {
            east += TAU;
        }
        return east - west;
    }
    pub fn height(&self) -> f64 {
        return self.north - self.south;
    }
    pub fn southwest(&self) -> Cartographic {
        return Cartographic::new(self.west, self.south, 0.0);
    }
    pub fn northwest(&self) -> Cartographic {
        return Cartographic::new(self.west, self.north, 0.0);
    }
    pub fn northeast(&self) -> Cartographic {
        return Cartographic::new(self.east, self.north, 0.0);
    }
    pub fn southeast(&self) -> Cartographic {
        return Cartographic::new(self.east, self.south, 0.0);
    }
    pub fn center(&self) -> Cartographic {
        let mut east = self.east;
        let west = self.west;
        if east < west {
            east += TAU;
        }

        let longitude = negative_pi_to_pi((west + east) * 0.5);
        let latitude = (self.south + self.north) * 0.5;

        return Cartographic::new(longitude, latitude, 0.0);
    }
    pub fn equals_epsilon(&self, right: &Rectangle, absolute_epsilon: f64) -> bool {
        return self == right
            || (self.west - right.west).abs() <= absolute_epsilon
                && (self.south - right.south).abs() <= absolute_epsilon
                && (self.east - right.east).abs() <= absolute_epsilon
                && (self.north - right.north).abs() <= absolute_epsilon;
    }
    pub fn contains(&self, cartographic: &Cartographic) -> bool {
        let mut longitude = cartographic.longitude;
        let latitude = cartographic.latitude;

        let west = self.west;
        let mut east = self.east;

        if east < west {
            east += TAU;
            if longitude < 0.0 {
                longitude += TAU;
            }
        }
        return (longitude > west || equals_epsilon(longitude, west, Some(EPSILON14), None))
            && (longitude < east || equals_epsilon(longitude, east, Some(EPSILON14), None))
            && latitude >= self.south
            && latitude <= self.north;
    }
    /// Splits into north-west, north-east, south-west and south-east quadrants.
    /// Children copy the parent's edges and share their inner edges, so their
    /// union is exactly the parent.
    pub fn subdivide(&self) -> [Rectangle; 4] {
        let mut mid_longitude = self.west + self.width() * 0.5;
        if mid_longitude > PI {
            mid_longitude = negative_pi_to_pi(mid_longitude);
        }
        let mid_latitude = (self.south + self.north) * 0.5;
        return [
            Rectangle::new(self.west, mid_latitude, mid_longitude, self.north),
            Rectangle::new(mid_longitude, mid_latitude, self.east, self.north),
            Rectangle::new(self.west, self.south, mid_longitude, mid_latitude),
            Rectangle::new(mid_longitude, self.south, self.east, mid_latitude),
        ];
    }
    /// Nearest position inside the rectangle, at height zero.
    pub fn closest_cartographic(&self, cartographic: &Cartographic) -> Cartographic {
        let latitude = cartographic.latitude.clamp(self.south, self.north);
        if self.contains(&Cartographic::new(cartographic.longitude, latitude, 0.0)) {
            return Cartographic::new(cartographic.longitude, latitude, 0.0);
        }
        let to_west = zero_to_two_pi(self.west - cartographic.longitude);
        let from_east = zero_to_two_pi(cartographic.longitude - self.east);
        let longitude = if to_west < from_east {
            self.west
        } else {
            self.east
        };
        return Cartographic::new(longitude, latitude, 0.0);
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.west, self.south, self.east, self.north
        )
    }
}
