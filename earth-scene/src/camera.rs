use bevy::math::DVec3;

use crate::{
    cartographic::Cartographic, ellipsoid::Ellipsoid, geographic::Geographic,
    perspective_frustum::PerspectiveFrustum,
};

/// Viewpoint consumed by the level-of-detail engine. Orientation belongs to
/// the renderer; only position, frustum and viewport size matter here.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: DVec3,
    pub frustum: PerspectiveFrustum,
    pub viewport_width: u32,
    pub viewport_height: u32,
}
impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: DVec3::ZERO,
            frustum: PerspectiveFrustum::default(),
            viewport_width: 1024,
            viewport_height: 768,
        };
        camera.set_viewport(1024, 768);
        camera.set_geographic(&Ellipsoid::WGS84, &Geographic::new(0.0, 0.0, 20000000.0));
        return camera;
    }
}
impl Camera {
    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }
    pub fn set_geographic(&mut self, ellipsoid: &Ellipsoid, geographic: &Geographic) {
        self.position = ellipsoid.geographic_to_space(geographic);
    }
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
        self.frustum
            .set_aspect_ratio(self.viewport_width as f64 / self.viewport_height as f64);
    }
    /// `None` when the camera sits at the ellipsoid center.
    pub fn position_cartographic(&self, ellipsoid: &Ellipsoid) -> Option<Cartographic> {
        ellipsoid.cartesian_to_cartographic(self.position)
    }
}

#[cfg(test)]
mod tests {
    use crate::{equals_epsilon, EPSILON7};

    use super::*;

    #[test]
    fn geographic_position_round_trips() {
        let mut camera = Camera::default();
        camera.set_geographic(&Ellipsoid::WGS84, &Geographic::new(116.0, 39.0, 5000.0));
        let c = camera.position_cartographic(&Ellipsoid::WGS84).unwrap();
        assert!(equals_epsilon(c.longitude, 116.0f64.to_radians(), Some(EPSILON7), None));
        assert!(equals_epsilon(c.latitude, 39.0f64.to_radians(), Some(EPSILON7), None));
        assert!(equals_epsilon(c.height, 5000.0, Some(EPSILON7), None));
    }

    #[test]
    fn viewport_drives_aspect_ratio() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.frustum.aspect_ratio(), 2.0);
        camera.set_viewport(0, 0);
        assert_eq!(camera.viewport_height, 1);
        camera.set_position(DVec3::ZERO);
        assert!(camera.position_cartographic(&Ellipsoid::WGS84).is_none());
    }
}
