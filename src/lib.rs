pub mod assembler;
pub mod bands;
pub mod batch;
pub mod checksum;
pub mod crs;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod parser;
pub mod raster;
pub mod scene;
pub mod valid_region;
pub mod writer;

pub use assembler::{prepare_dataset, PrepareOptions};
pub use batch::{collect_scenes, process_all, process_scene, BatchOptions, BatchReport, SceneOutcome};
pub use descriptor::Descriptor;
pub use error::{ChecksumError, ConvertError, GeometryError, RasterError, SceneError};
pub use model::MetadataValue;
pub use parser::{convert, convert_str, load_metadata, parse_xml, ConvertOptions};
pub use raster::{Affine, GdalRasterReader, RasterMaskReader};
pub use scene::SceneSource;
pub use valid_region::shape::{GeometryShaper, HullStrategy, ShaperConfig};
pub use valid_region::{CrsPolygon, PixelPolygon, ValidRegion, ValidRegionService};
pub use writer::DescriptorWriter;
