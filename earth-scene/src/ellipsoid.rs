use bevy::math::DVec3;

use crate::{cartographic::Cartographic, geographic::Geographic, math::*};

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeodeticError {
    /// The position is at, or numerically too close to, the ellipsoid center
    /// to have a surface projection.
    #[error("position has no projection onto the ellipsoid surface")]
    DegenerateInput,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub radii: DVec3,
    pub radii_squared: DVec3,
    pub one_over_radii: DVec3,
    pub one_over_radii_squared: DVec3,
    pub minimum_radius: f64,
    pub maximum_radius: f64,
    pub one_over_maximum_radius: f64,
    pub center_tolerance_squared: f64,
}

macro_rules! ellipsoid {
    ($x:expr, $y:expr, $z:expr, $min:expr, $max:expr) => {
        Ellipsoid {
            radii: DVec3::new($x, $y, $z),
            radii_squared: DVec3::new($x * $x, $y * $y, $z * $z),
            one_over_radii: DVec3::new(1.0 / $x, 1.0 / $y, 1.0 / $z),
            one_over_radii_squared: DVec3::new(
                1.0 / ($x * $x),
                1.0 / ($y * $y),
                1.0 / ($z * $z),
            ),
            minimum_radius: $min,
            maximum_radius: $max,
            one_over_maximum_radius: 1.0 / $max,
            center_tolerance_squared: EPSILON1,
        }
    };
}

const WGS84_SEMIMAJOR_AXIS: f64 = 6378137.0;
const WGS84_SEMIMINOR_AXIS: f64 = 6356752.3142451793;

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}
impl Ellipsoid {
    pub const WGS84: Ellipsoid = ellipsoid!(
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMINOR_AXIS,
        WGS84_SEMIMINOR_AXIS,
        WGS84_SEMIMAJOR_AXIS
    );
    /// Sphere whose radius is the WGS84 maximum radius, used by the
    /// pseudo-mercator (EPSG:3857) simplification.
    pub const PSEUDO_MERCATOR: Ellipsoid = ellipsoid!(
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMAJOR_AXIS,
        WGS84_SEMIMAJOR_AXIS
    );
    pub const UNIT_SPHERE: Ellipsoid = ellipsoid!(1.0, 1.0, 1.0, 1.0, 1.0);

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        ellipsoid!(x, y, z, x.min(y).min(z), x.max(y).max(z))
    }
    pub fn from_vec3(radii: DVec3) -> Self {
        Ellipsoid::new(radii.x, radii.y, radii.z)
    }

    /// Unit normal at a geographic position.
    pub fn geodetic_surface_normal_cartographic(&self, geographic: &Geographic) -> DVec3 {
        let longitude = geographic.longitude_radians();
        let latitude = geographic.latitude_radians();
        let cos_latitude = latitude.cos();
        let x = cos_latitude * longitude.cos();
        let y = cos_latitude * longitude.sin();
        let z = latitude.sin();
        return DVec3::new(x, y, z).normalize();
    }

    /// Unit normal at an arbitrary Cartesian position.
    pub fn geodetic_surface_normal(&self, cartesian: DVec3) -> DVec3 {
        return (cartesian * self.one_over_radii_squared).normalize();
    }

    /// Scales `position` along the geodetic surface normal so that it lies on
    /// the surface. Positions close to the center fall back to the radial
    /// projection; the exact center is [`GeodeticError::DegenerateInput`].
    /// Arbitrarily far positions are projected as well.
    pub fn scale_to_geodetic_surface(&self, position: DVec3) -> Result<DVec3, GeodeticError> {
        if !position.is_finite() {
            return Err(GeodeticError::DegenerateInput);
        }
        // Far positions are scaled into the ellipsoid's range so the squares
        // below stay finite. The scale is folded into the multipliers.
        let scale = (position.abs().max_element() * self.one_over_maximum_radius).max(1.0);
        let one_over_scale = 1.0 / scale;
        let position = position * one_over_scale;
        let one_over_radii = self.one_over_radii;
        let x2 = position.x * position.x * one_over_radii.x * one_over_radii.x;
        let y2 = position.y * position.y * one_over_radii.y * one_over_radii.y;
        let z2 = position.z * position.z * one_over_radii.z * one_over_radii.z;

        // Squared ellipsoid norm.
        let squared_norm = x2 + y2 + z2;
        let ratio = (1.0 / squared_norm).sqrt();

        // Radial intersection as the initial approximation.
        let intersection = position * ratio;

        // The iteration does not converge near the center.
        if squared_norm < self.center_tolerance_squared {
            if !ratio.is_finite() {
                return Err(GeodeticError::DegenerateInput);
            }
            return Ok(intersection);
        }

        let one_over_radii_squared = self.one_over_radii_squared;
        // Gradient at the intersection stands in for the true unit normal; the
        // magnitude difference is absorbed in the multiplier.
        let gradient = intersection * one_over_radii_squared * 2.0;

        let mut lambda =
            (1.0 - ratio * one_over_scale) * position.length() / (0.5 * gradient.length());
        let mut correction = 0.0;
        loop {
            lambda -= correction;
            let x_multiplier = 1.0 / (one_over_scale + lambda * one_over_radii_squared.x);
            let y_multiplier = 1.0 / (one_over_scale + lambda * one_over_radii_squared.y);
            let z_multiplier = 1.0 / (one_over_scale + lambda * one_over_radii_squared.z);

            let x_multiplier2 = x_multiplier * x_multiplier;
            let y_multiplier2 = y_multiplier * y_multiplier;
            let z_multiplier2 = z_multiplier * z_multiplier;

            let x_multiplier3 = x_multiplier2 * x_multiplier;
            let y_multiplier3 = y_multiplier2 * y_multiplier;
            let z_multiplier3 = z_multiplier2 * z_multiplier;

            let func = x2 * x_multiplier2 + y2 * y_multiplier2 + z2 * z_multiplier2 - 1.0;
            if !func.is_finite() {
                return Err(GeodeticError::DegenerateInput);
            }
            if func.abs() <= EPSILON12 {
                return Ok(DVec3::new(
                    position.x * x_multiplier,
                    position.y * y_multiplier,
                    position.z * z_multiplier,
                ));
            }

            let denominator = x2 * x_multiplier3 * one_over_radii_squared.x
                + y2 * y_multiplier3 * one_over_radii_squared.y
                + z2 * z_multiplier3 * one_over_radii_squared.z;
            let derivative = -2.0 * denominator;
            correction = func / derivative;
        }
    }

    pub fn space_to_geographic(&self, cartesian: DVec3) -> Result<Geographic, GeodeticError> {
        let p = self.scale_to_geodetic_surface(cartesian)?;
        let n = self.geodetic_surface_normal(p);
        let h = cartesian - p;
        let longitude = n.y.atan2(n.x);
        let latitude = n.z.asin();
        let height = h.dot(cartesian).signum() * h.length();
        return Ok(Geographic::from_radians(longitude, latitude, height));
    }

    pub fn geographic_to_space(&self, geographic: &Geographic) -> DVec3 {
        let n = self.geodetic_surface_normal_cartographic(geographic);
        let mut k = self.radii_squared * n;
        let gamma = n.dot(k).sqrt();
        k = k / gamma;
        return k + n * geographic.height();
    }

    pub fn cartographic_to_cartesian(&self, cartographic: &Cartographic) -> DVec3 {
        self.geographic_to_space(&Geographic::from(cartographic))
    }

    pub fn cartesian_to_cartographic(&self, cartesian: DVec3) -> Option<Cartographic> {
        self.space_to_geographic(cartesian)
            .ok()
            .map(|geographic| geographic.to_cartographic())
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    const SPACE_CARTESIAN: DVec3 =
        DVec3::new(4582719.8827300891, -4582719.8827300882, 1725510.4250797231);
    const SURFACE_CARTESIAN: DVec3 =
        DVec3::new(4094327.7921465295, 1909216.4044747739, 4487348.4088659193);

    fn vec_equals_epsilon(left: DVec3, right: DVec3, epsilon: f64) -> bool {
        equals_epsilon(left.x, right.x, Some(epsilon), None)
            && equals_epsilon(left.y, right.y, Some(epsilon), None)
            && equals_epsilon(left.z, right.z, Some(epsilon), None)
    }

    #[test]
    fn derived_radii() {
        let ellipsoid = Ellipsoid::new(1.0, 2.0, 4.0);
        assert_eq!(ellipsoid.radii_squared, DVec3::new(1.0, 4.0, 16.0));
        assert_eq!(ellipsoid.one_over_radii, DVec3::new(1.0, 0.5, 0.25));
        assert_eq!(ellipsoid.one_over_radii_squared, DVec3::new(1.0, 0.25, 0.0625));
        assert_eq!(ellipsoid.minimum_radius, 1.0);
        assert_eq!(ellipsoid.maximum_radius, 4.0);
        assert_eq!(ellipsoid.one_over_maximum_radius, 0.25);
    }

    #[test]
    fn pseudo_mercator_is_a_sphere_of_the_wgs84_maximum_radius() {
        let sphere = Ellipsoid::PSEUDO_MERCATOR;
        let radius = Ellipsoid::WGS84.maximum_radius;
        assert_eq!(sphere.radii, DVec3::splat(radius));
        assert_eq!(sphere.minimum_radius, sphere.maximum_radius);
        assert_eq!(Ellipsoid::WGS84, Ellipsoid::new(6378137.0, 6378137.0, 6356752.3142451793));
    }

    #[test]
    fn geodetic_surface_normal_cartographic_at_equator() {
        let ellipsoid = Ellipsoid::WGS84;
        let n = ellipsoid.geodetic_surface_normal_cartographic(&Geographic::new(90.0, 0.0, 0.0));
        assert!(vec_equals_epsilon(n, DVec3::new(0.0, 1.0, 0.0), EPSILON14));
        let n = ellipsoid.geodetic_surface_normal_cartographic(&Geographic::new(0.0, 90.0, 0.0));
        assert!(vec_equals_epsilon(n, DVec3::new(0.0, 0.0, 1.0), EPSILON14));
    }

    #[test]
    fn geodetic_surface_normal_is_unit() {
        let n = Ellipsoid::WGS84.geodetic_surface_normal(SPACE_CARTESIAN);
        assert!(equals_epsilon(n.length(), 1.0, Some(EPSILON14), None));
    }

    #[test]
    fn geographic_to_space_known_value() {
        let ellipsoid = Ellipsoid::WGS84;
        let actual = ellipsoid.geographic_to_space(&Geographic::new(-45.0, 15.0, 330000.0));
        assert!(vec_equals_epsilon(actual, SPACE_CARTESIAN, EPSILON7));
        let actual = ellipsoid.geographic_to_space(&Geographic::new(25.0, 45.0, 0.0));
        assert!(vec_equals_epsilon(actual, SURFACE_CARTESIAN, EPSILON7));
    }

    #[test]
    fn space_to_geographic_known_value() {
        let ellipsoid = Ellipsoid::WGS84;
        let g = ellipsoid.space_to_geographic(SPACE_CARTESIAN).unwrap();
        assert!(equals_epsilon(g.longitude_radians(), (-45.0f64).to_radians(), Some(EPSILON7), None));
        assert!(equals_epsilon(g.latitude_radians(), 15.0f64.to_radians(), Some(EPSILON7), None));
        assert!(equals_epsilon(g.height(), 330000.0, Some(EPSILON7), None));
    }

    #[test]
    fn height_is_negative_below_the_surface() {
        let ellipsoid = Ellipsoid::WGS84;
        let below = ellipsoid.geographic_to_space(&Geographic::new(10.0, 20.0, -1000.0));
        let g = ellipsoid.space_to_geographic(below).unwrap();
        assert!(equals_epsilon(g.height(), -1000.0, Some(EPSILON7), None));
    }

    #[test]
    fn round_trip_random_points() {
        let ellipsoid = Ellipsoid::WGS84;
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let expected = Geographic::new(
                rng.gen_range(-179.9..179.9),
                rng.gen_range(-89.0..89.0),
                rng.gen_range(-1000.0..100000.0),
            );
            let actual = ellipsoid
                .space_to_geographic(ellipsoid.geographic_to_space(&expected))
                .unwrap();
            assert!(
                (actual.longitude_radians() - expected.longitude_radians()).abs() <= EPSILON9,
                "{:?} != {:?}",
                actual,
                expected
            );
            assert!((actual.latitude_radians() - expected.latitude_radians()).abs() <= EPSILON9);
            assert!(equals_epsilon(actual.height(), expected.height(), Some(EPSILON9), Some(1e-4)));
        }
    }

    #[test]
    fn scale_to_geodetic_surface_keeps_surface_points() {
        let ellipsoid = Ellipsoid::WGS84;
        let mut rng = rand::thread_rng();
        let mut surface_points = vec![SURFACE_CARTESIAN];
        for _ in 0..100 {
            surface_points.push(ellipsoid.geographic_to_space(&Geographic::new(
                rng.gen_range(-180.0..180.0),
                rng.gen_range(-90.0..90.0),
                0.0,
            )));
        }
        for point in surface_points {
            let actual = ellipsoid.scale_to_geodetic_surface(point).unwrap();
            assert!(vec_equals_epsilon(actual, point, EPSILON10), "{} != {}", actual, point);
        }
    }

    #[test]
    fn scale_to_geodetic_surface_projects_along_the_normal() {
        let ellipsoid = Ellipsoid::WGS84;
        let surface = ellipsoid.geographic_to_space(&Geographic::new(30.0, -60.0, 0.0));
        let above = ellipsoid.geographic_to_space(&Geographic::new(30.0, -60.0, 25000.0));
        let actual = ellipsoid.scale_to_geodetic_surface(above).unwrap();
        assert!(vec_equals_epsilon(actual, surface, EPSILON10));
    }

    #[test]
    fn scale_to_geodetic_surface_near_center() {
        let ellipsoid = Ellipsoid::WGS84;
        assert_eq!(
            ellipsoid.scale_to_geodetic_surface(DVec3::ZERO),
            Err(GeodeticError::DegenerateInput)
        );
        assert_eq!(
            ellipsoid.space_to_geographic(DVec3::ZERO),
            Err(GeodeticError::DegenerateInput)
        );
        assert_eq!(
            ellipsoid.scale_to_geodetic_surface(DVec3::new(f64::NAN, 0.0, 0.0)),
            Err(GeodeticError::DegenerateInput)
        );
        // inside the center tolerance the radial projection is returned
        let near = DVec3::new(1000.0, 0.0, 0.0);
        let actual = ellipsoid.scale_to_geodetic_surface(near).unwrap();
        assert!(vec_equals_epsilon(actual, DVec3::new(6378137.0, 0.0, 0.0), EPSILON14));
    }

    #[test]
    fn scale_to_geodetic_surface_far_away() {
        let ellipsoid = Ellipsoid::WGS84;
        let pole = ellipsoid.scale_to_geodetic_surface(DVec3::new(0.0, 0.0, 1e200)).unwrap();
        assert!(vec_equals_epsilon(pole, DVec3::new(0.0, 0.0, WGS84_SEMIMINOR_AXIS), EPSILON10));

        let diagonal = ellipsoid.scale_to_geodetic_surface(DVec3::splat(1e150)).unwrap();
        let normal = ellipsoid.geodetic_surface_normal(diagonal);
        assert!(vec_equals_epsilon(normal, DVec3::ONE.normalize(), EPSILON10));
        assert!(((diagonal * ellipsoid.one_over_radii).length_squared() - 1.0).abs() < EPSILON10);

        let unit = Ellipsoid::UNIT_SPHERE
            .scale_to_geodetic_surface(DVec3::new(0.0, -3e250, 0.0))
            .unwrap();
        assert!(vec_equals_epsilon(unit, DVec3::new(0.0, -1.0, 0.0), EPSILON14));
    }

    #[test]
    fn cartographic_helpers_agree() {
        let ellipsoid = Ellipsoid::WGS84;
        let c = Cartographic::from_degrees(-45.0, 15.0, 330000.0);
        let p = ellipsoid.cartographic_to_cartesian(&c);
        assert!(vec_equals_epsilon(p, SPACE_CARTESIAN, EPSILON7));
        let back = ellipsoid.cartesian_to_cartographic(p).unwrap();
        assert!(back.equals_epsilon(&c, EPSILON7));
        assert!(ellipsoid.cartesian_to_cartographic(DVec3::ZERO).is_none());
    }
}
