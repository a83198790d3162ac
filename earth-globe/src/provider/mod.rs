pub mod imagery_provider;
pub mod terrain_provider;
pub mod url_template;

pub use imagery_provider::{ImageryProvider, XyzImageryProvider};
pub use terrain_provider::{QuantizedMeshTerrainProvider, TerrainProvider};
pub use url_template::UrlTemplate;
