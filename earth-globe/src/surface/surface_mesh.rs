use bevy::math::DVec3;
use earth_scene::{Ellipsoid, Geographic, Rectangle};

/// Regular grid draped over a tile rectangle at zero height, with texture
/// coordinates spanning the tile image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TileSurfaceMesh {
    pub vertices: Vec<DVec3>,
    pub texcoords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl TileSurfaceMesh {
    /// Cells per tile edge.
    pub const LERP: u32 = 8;

    pub fn from_rectangle(rectangle: &Rectangle, ellipsoid: &Ellipsoid) -> Self {
        let lerp = Self::LERP;
        let lerp_factor = 1.0 / lerp as f64;
        let range_x = rectangle.width();
        let range_y = rectangle.height();
        let side = (lerp + 1) as usize;
        let mut vertices = Vec::with_capacity(side * side);
        let mut texcoords = Vec::with_capacity(side * side);
        let mut indices = Vec::with_capacity((lerp * lerp * 6) as usize);

        // x-major: vertex (x, y) sits at x * (lerp + 1) + y
        for x in 0..=lerp {
            for y in 0..=lerp {
                let geographic = Geographic::from_radians(
                    rectangle.west + x as f64 * lerp_factor * range_x,
                    rectangle.south + y as f64 * lerp_factor * range_y,
                    0.0,
                );
                vertices.push(ellipsoid.geographic_to_space(&geographic));
                texcoords.push([
                    (x as f64 * lerp_factor) as f32,
                    (y as f64 * lerp_factor) as f32,
                ]);
            }
        }
        for x in 0..lerp {
            for y in 0..lerp {
                let first = x * (lerp + 1) + y;
                let second = first + lerp + 1;
                indices.extend_from_slice(&[first, second, first + 1, second, second + 1, first + 1]);
            }
        }
        Self {
            vertices,
            texcoords,
            indices,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
