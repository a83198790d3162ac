//https://github.com/CesiumGS/quantized-mesh
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use log::warn;

/// Size in bytes of the fixed header.
pub const HEADER_BYTES: usize = 88;
/// Vertex count above which indices are stored as 32-bit values.
pub const MAX_16_BIT_VERTEX_COUNT: u32 = 65536;
pub const WATER_MASK_SIZE: usize = 256;

pub const EXTENSION_VERTEX_NORMALS: u8 = 1;
pub const EXTENSION_WATER_MASK: u8 = 2;
pub const EXTENSION_METADATA: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DecodingStep {
    Header = 0,
    Vertices = 1,
    TriangleIndices = 2,
    EdgeIndices = 3,
    #[default]
    Extensions = 4,
}
impl std::fmt::Display for DecodingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DecodingStep::Header => "header",
            DecodingStep::Vertices => "vertices",
            DecodingStep::TriangleIndices => "triangle indices",
            DecodingStep::EdgeIndices => "edge indices",
            DecodingStep::Extensions => "extensions",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Last stage to decode. Bytes belonging to later stages are never read.
    pub max_decoding_step: DecodingStep,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer truncated while decoding {stage}: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        stage: DecodingStep,
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("triangle index code {code} at position {position} exceeds high-water mark {highest}")]
    InvalidIndexCode {
        position: usize,
        code: u32,
        highest: u32,
    },
    #[error("triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantizedMeshHeader {
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub minimum_height: f32,
    pub maximum_height: f32,
    pub bounding_sphere_center_x: f64,
    pub bounding_sphere_center_y: f64,
    pub bounding_sphere_center_z: f64,
    pub bounding_sphere_radius: f64,
    pub horizon_occlusion_point_x: f64,
    pub horizon_occlusion_point_y: f64,
    pub horizon_occlusion_point_z: f64,
}

/// Quantized vertex attributes, each in `0..=32767`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexData {
    pub u: Vec<u16>,
    pub v: Vec<u16>,
    pub height: Vec<u16>,
}
impl VertexData {
    pub fn len(&self) -> usize {
        self.u.len()
    }
    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }
}

/// Index storage; the width follows the vertex count.
#[derive(Debug, Clone, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}
impl Default for Indices {
    fn default() -> Self {
        Indices::U16(Vec::new())
    }
}
impl Indices {
    pub fn len(&self) -> usize {
        match self {
            Indices::U16(indices) => indices.len(),
            Indices::U32(indices) => indices.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            Indices::U16(indices) => indices.get(i).map(|&index| index as u32),
            Indices::U32(indices) => indices.get(i).copied(),
        }
    }
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            Indices::U16(indices) => indices.iter().map(|&index| index as u32).collect(),
            Indices::U32(indices) => indices.clone(),
        }
    }
    fn from_u32(indices: Vec<u32>, bytes_per_index: usize) -> Self {
        if bytes_per_index == 2 {
            Indices::U16(indices.into_iter().map(|index| index as u16).collect())
        } else {
            Indices::U32(indices)
        }
    }
}

/// Vertex indices along each tile edge, used to stitch neighbouring tiles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EdgeIndices {
    pub west: Indices,
    pub south: Indices,
    pub east: Indices,
    pub north: Indices,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaterMask {
    /// The whole tile is land (0) or water (255).
    Uniform(u8),
    /// 256 x 256 grid, row-major from the north-west corner.
    Grid(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    /// Oct-encoded per-vertex normals, two bytes per vertex.
    VertexNormals(Vec<u8>),
    WaterMask(WaterMask),
    Metadata(serde_json::Value),
}

/// Result of a (possibly partial) decode. Stages after
/// [`DecodeOptions::max_decoding_step`] are `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuantizedMeshTerrain {
    pub header: QuantizedMeshHeader,
    pub vertex_data: Option<VertexData>,
    pub triangle_indices: Option<Indices>,
    pub edge_indices: Option<EdgeIndices>,
    pub extensions: Option<BTreeMap<u8, Extension>>,
    /// Offset of the first byte not consumed by the decoded stages.
    pub bytes_read: usize,
}
impl QuantizedMeshTerrain {
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.as_ref().map_or(0, |v| v.len())
    }
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.as_ref().map_or(0, |i| i.len() / 3)
    }
    pub fn vertex_normals(&self) -> Option<&[u8]> {
        match self.extensions.as_ref()?.get(&EXTENSION_VERTEX_NORMALS) {
            Some(Extension::VertexNormals(normals)) => Some(normals),
            _ => None,
        }
    }
    pub fn water_mask(&self) -> Option<&WaterMask> {
        match self.extensions.as_ref()?.get(&EXTENSION_WATER_MASK) {
            Some(Extension::WaterMask(mask)) => Some(mask),
            _ => None,
        }
    }
    pub fn metadata(&self) -> Option<&serde_json::Value> {
        match self.extensions.as_ref()?.get(&EXTENSION_METADATA) {
            Some(Extension::Metadata(metadata)) => Some(metadata),
            _ => None,
        }
    }
}

pub fn zigzag_decode(value: u16) -> i16 {
    (value >> 1) as i16 ^ -((value & 1) as i16)
}
pub fn zigzag_encode(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)) as u16
}

/// High-water-mark index decoding: each code is an offset below the highest
/// index seen so far, and a zero code introduces the next new index.
pub fn decode_high_water_mark(codes: &[u32]) -> Result<Vec<u32>, DecodeError> {
    let mut highest: u32 = 0;
    let mut indices = Vec::with_capacity(codes.len());
    for (position, &code) in codes.iter().enumerate() {
        if code > highest {
            return Err(DecodeError::InvalidIndexCode {
                position,
                code,
                highest,
            });
        }
        indices.push(highest - code);
        if code == 0 {
            highest += 1;
        }
    }
    return Ok(indices);
}

pub fn decode(data: &[u8], options: DecodeOptions) -> Result<QuantizedMeshTerrain, DecodeError> {
    let mut reader = StageReader::new(data);
    let max = options.max_decoding_step;

    let header = decode_header(&mut reader)?;
    let mut terrain = QuantizedMeshTerrain {
        header,
        bytes_read: reader.position(),
        ..Default::default()
    };
    if max < DecodingStep::Vertices {
        return Ok(terrain);
    }

    let vertex_data = decode_vertex_data(&mut reader)?;
    let vertex_count = vertex_data.len() as u32;
    terrain.vertex_data = Some(vertex_data);
    terrain.bytes_read = reader.position();
    if max < DecodingStep::TriangleIndices {
        return Ok(terrain);
    }

    let bytes_per_index = if vertex_count > MAX_16_BIT_VERTEX_COUNT { 4 } else { 2 };
    terrain.triangle_indices = Some(decode_triangle_indices(
        &mut reader,
        vertex_count,
        bytes_per_index,
    )?);
    terrain.bytes_read = reader.position();
    if max < DecodingStep::EdgeIndices {
        return Ok(terrain);
    }

    terrain.edge_indices = Some(decode_edge_indices(&mut reader, bytes_per_index)?);
    terrain.bytes_read = reader.position();
    if max < DecodingStep::Extensions {
        return Ok(terrain);
    }

    terrain.extensions = Some(decode_extensions(&mut reader)?);
    terrain.bytes_read = reader.position();
    return Ok(terrain);
}

struct StageReader<'a> {
    cursor: Cursor<&'a [u8]>,
    stage: DecodingStep,
}
impl<'a> StageReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            stage: DecodingStep::Header,
        }
    }
    fn position(&self) -> usize {
        self.cursor.position() as usize
    }
    fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }
    /// Fails unless `needed` more bytes are available.
    fn require(&self, needed: usize) -> Result<(), DecodeError> {
        let available = self.remaining();
        if needed > available {
            return Err(DecodeError::Truncated {
                stage: self.stage,
                offset: self.position(),
                needed,
                available,
            });
        }
        Ok(())
    }
    fn require_elements(&self, count: u32, element_bytes: usize) -> Result<usize, DecodeError> {
        let needed = (count as usize)
            .checked_mul(element_bytes)
            .unwrap_or(usize::MAX);
        self.require(needed)?;
        Ok(needed)
    }
    fn skip(&mut self, bytes: usize) -> Result<(), DecodeError> {
        self.require(bytes)?;
        self.cursor.set_position((self.position() + bytes) as u64);
        Ok(())
    }
    fn align_to(&mut self, bytes: usize) -> Result<(), DecodeError> {
        let misalignment = self.position() % bytes;
        if misalignment != 0 {
            self.skip(bytes - misalignment)?;
        }
        Ok(())
    }
    fn u8(&mut self) -> Result<u8, DecodeError> {
        self.require(1)?;
        self.cursor.read_u8().map_err(|_| self.truncated(1))
    }
    fn u32(&mut self) -> Result<u32, DecodeError> {
        self.require(4)?;
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.truncated(4))
    }
    fn f32(&mut self) -> Result<f32, DecodeError> {
        self.require(4)?;
        self.cursor
            .read_f32::<LittleEndian>()
            .map_err(|_| self.truncated(4))
    }
    fn f64(&mut self) -> Result<f64, DecodeError> {
        self.require(8)?;
        self.cursor
            .read_f64::<LittleEndian>()
            .map_err(|_| self.truncated(8))
    }
    fn u16_array(&mut self, count: u32) -> Result<Vec<u16>, DecodeError> {
        let needed = self.require_elements(count, 2)?;
        let mut values = vec![0u16; count as usize];
        self.cursor
            .read_u16_into::<LittleEndian>(&mut values)
            .map_err(|_| self.truncated(needed))?;
        Ok(values)
    }
    fn u32_array(&mut self, count: u32) -> Result<Vec<u32>, DecodeError> {
        let needed = self.require_elements(count, 4)?;
        let mut values = vec![0u32; count as usize];
        self.cursor
            .read_u32_into::<LittleEndian>(&mut values)
            .map_err(|_| self.truncated(needed))?;
        Ok(values)
    }
    fn index_array(&mut self, count: u32, bytes_per_index: usize) -> Result<Vec<u32>, DecodeError> {
        if bytes_per_index == 2 {
            Ok(self
                .u16_array(count)?
                .into_iter()
                .map(|index| index as u32)
                .collect())
        } else {
            self.u32_array(count)
        }
    }
    fn bytes(&mut self, length: usize) -> Result<Vec<u8>, DecodeError> {
        self.require(length)?;
        let mut bytes = vec![0u8; length];
        self.cursor
            .read_exact(&mut bytes)
            .map_err(|_| self.truncated(length))?;
        Ok(bytes)
    }
    fn truncated(&self, needed: usize) -> DecodeError {
        DecodeError::Truncated {
            stage: self.stage,
            offset: self.position(),
            needed,
            available: self.remaining(),
        }
    }
}

fn decode_header(reader: &mut StageReader) -> Result<QuantizedMeshHeader, DecodeError> {
    reader.stage = DecodingStep::Header;
    reader.require(HEADER_BYTES)?;
    Ok(QuantizedMeshHeader {
        center_x: reader.f64()?,
        center_y: reader.f64()?,
        center_z: reader.f64()?,
        minimum_height: reader.f32()?,
        maximum_height: reader.f32()?,
        bounding_sphere_center_x: reader.f64()?,
        bounding_sphere_center_y: reader.f64()?,
        bounding_sphere_center_z: reader.f64()?,
        bounding_sphere_radius: reader.f64()?,
        horizon_occlusion_point_x: reader.f64()?,
        horizon_occlusion_point_y: reader.f64()?,
        horizon_occlusion_point_z: reader.f64()?,
    })
}

fn decode_vertex_data(reader: &mut StageReader) -> Result<VertexData, DecodeError> {
    reader.stage = DecodingStep::Vertices;
    let vertex_count = reader.u32()?;
    // u, v and height arrays
    reader.require_elements(vertex_count, 6)?;
    let mut u = reader.u16_array(vertex_count)?;
    let mut v = reader.u16_array(vertex_count)?;
    let mut height = reader.u16_array(vertex_count)?;

    let mut u_value: u16 = 0;
    let mut v_value: u16 = 0;
    let mut height_value: u16 = 0;
    for i in 0..vertex_count as usize {
        u_value = u_value.wrapping_add_signed(zigzag_decode(u[i]));
        v_value = v_value.wrapping_add_signed(zigzag_decode(v[i]));
        height_value = height_value.wrapping_add_signed(zigzag_decode(height[i]));
        u[i] = u_value;
        v[i] = v_value;
        height[i] = height_value;
    }
    Ok(VertexData { u, v, height })
}

fn decode_triangle_indices(
    reader: &mut StageReader,
    vertex_count: u32,
    bytes_per_index: usize,
) -> Result<Indices, DecodeError> {
    reader.stage = DecodingStep::TriangleIndices;
    reader.align_to(bytes_per_index)?;
    let triangle_count = reader.u32()?;
    let index_count = triangle_count.checked_mul(3).ok_or(reader.truncated(usize::MAX))?;
    let codes = reader.index_array(index_count, bytes_per_index)?;
    let indices = decode_high_water_mark(&codes)?;
    if let Some(&index) = indices.iter().find(|&&index| index >= vertex_count) {
        return Err(DecodeError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }
    Ok(Indices::from_u32(indices, bytes_per_index))
}

fn decode_edge_indices(
    reader: &mut StageReader,
    bytes_per_index: usize,
) -> Result<EdgeIndices, DecodeError> {
    reader.stage = DecodingStep::EdgeIndices;
    let mut edge = || -> Result<Indices, DecodeError> {
        let count = reader.u32()?;
        let indices = reader.index_array(count, bytes_per_index)?;
        Ok(Indices::from_u32(indices, bytes_per_index))
    };
    let west = edge()?;
    let south = edge()?;
    let east = edge()?;
    let north = edge()?;
    Ok(EdgeIndices {
        west,
        south,
        east,
        north,
    })
}

fn decode_extensions(reader: &mut StageReader) -> Result<BTreeMap<u8, Extension>, DecodeError> {
    reader.stage = DecodingStep::Extensions;
    let mut extensions = BTreeMap::new();
    while reader.remaining() > 0 {
        let extension_id = reader.u8()?;
        let extension_length = reader.u32()?;
        let payload = reader.bytes(extension_length as usize)?;
        let extension = match extension_id {
            EXTENSION_VERTEX_NORMALS => Some(Extension::VertexNormals(payload)),
            EXTENSION_WATER_MASK => decode_water_mask(payload).map(Extension::WaterMask),
            EXTENSION_METADATA => decode_metadata(&payload).map(Extension::Metadata),
            _ => {
                warn!("Unknown extension with id {}", extension_id);
                None
            }
        };
        if let Some(extension) = extension {
            extensions.insert(extension_id, extension);
        }
    }
    Ok(extensions)
}

fn decode_water_mask(payload: Vec<u8>) -> Option<WaterMask> {
    match payload.len() {
        1 => Some(WaterMask::Uniform(payload[0])),
        n if n == WATER_MASK_SIZE * WATER_MASK_SIZE => Some(WaterMask::Grid(payload)),
        n => {
            warn!("skipping water mask extension with unexpected length {}", n);
            None
        }
    }
}

fn decode_metadata(payload: &[u8]) -> Option<serde_json::Value> {
    let Some(length_bytes) = payload.get(..4) else {
        warn!("skipping metadata extension shorter than its length prefix");
        return None;
    };
    let json_length = u32::from_le_bytes([
        length_bytes[0],
        length_bytes[1],
        length_bytes[2],
        length_bytes[3],
    ]) as usize;
    let Some(json) = payload[4..].get(..json_length) else {
        warn!(
            "skipping metadata extension: json length {} exceeds payload",
            json_length
        );
        return None;
    };
    match serde_json::from_slice(json) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("skipping unparsable metadata extension: {}", e);
            None
        }
    }
}
