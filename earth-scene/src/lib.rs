mod camera;
mod cartographic;
mod ellipsoid;
mod geographic;
mod geographic_tiling_scheme;
mod math;
mod perspective_frustum;
mod rectangle;
mod tile_key;
mod tiling_scheme;

pub use camera::*;
pub use cartographic::*;
pub use ellipsoid::*;
pub use geographic::*;
pub use geographic_tiling_scheme::*;
pub use math::*;
pub use perspective_frustum::*;
pub use rectangle::*;
pub use tile_key::*;
pub use tiling_scheme::*;
