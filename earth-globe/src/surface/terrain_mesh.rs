use bevy::math::DVec3;
use earth_scene::{Ellipsoid, Geographic, Rectangle};
use quantized_mesh_decoder::{EdgeIndices, QuantizedMeshTerrain};

/// Largest quantized coordinate of a quantized-mesh vertex.
const QUANTIZED_MAX: f64 = 32767.0;

/// A decoded terrain tile placed on the ellipsoid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TerrainMesh {
    pub positions: Vec<DVec3>,
    /// Quantized u, v scaled to `0..=1`.
    pub texcoords: Vec<[f32; 2]>,
    pub heights: Vec<f64>,
    pub indices: Vec<u32>,
    pub edge_indices: EdgeIndices,
    pub minimum_height: f64,
    pub maximum_height: f64,
}

impl TerrainMesh {
    /// Stages missing from a partial decode yield an empty mesh.
    pub fn from_terrain(
        terrain: &QuantizedMeshTerrain,
        rectangle: &Rectangle,
        ellipsoid: &Ellipsoid,
    ) -> Self {
        let minimum_height = terrain.header.minimum_height as f64;
        let maximum_height = terrain.header.maximum_height as f64;
        let height_range = maximum_height - minimum_height;
        let width = rectangle.width();
        let height = rectangle.height();

        let mut mesh = TerrainMesh {
            minimum_height,
            maximum_height,
            ..Default::default()
        };
        if let Some(vertex_data) = terrain.vertex_data.as_ref() {
            mesh.positions.reserve(vertex_data.len());
            for i in 0..vertex_data.len() {
                let (Some(&u), Some(&v), Some(&h)) = (
                    vertex_data.u.get(i),
                    vertex_data.v.get(i),
                    vertex_data.height.get(i),
                ) else {
                    break;
                };
                let u = u as f64 / QUANTIZED_MAX;
                let v = v as f64 / QUANTIZED_MAX;
                let h = minimum_height + h as f64 / QUANTIZED_MAX * height_range;
                let geographic = Geographic::from_radians(
                    rectangle.west + u * width,
                    rectangle.south + v * height,
                    h,
                );
                mesh.positions.push(ellipsoid.geographic_to_space(&geographic));
                mesh.texcoords.push([u as f32, v as f32]);
                mesh.heights.push(h);
            }
        }
        if let Some(indices) = terrain.triangle_indices.as_ref() {
            mesh.indices = indices.to_u32_vec();
        }
        if let Some(edge_indices) = terrain.edge_indices.as_ref() {
            mesh.edge_indices = edge_indices.clone();
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}
