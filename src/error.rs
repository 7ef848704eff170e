use std::path::PathBuf;
use thiserror::Error;

/// Failure to turn one band file into samples and a transform.
///
/// Both variants are recoverable for valid-region derivation: they turn into
/// [`ValidRegion::Unavailable`](crate::valid_region::ValidRegion::Unavailable).
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to read raster {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed raster {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Valid-region failures that are surfaced to the caller.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("no band paths were given")]
    NoBands,

    #[error("mask has no valid pixels")]
    NoValidPixels,

    #[error("shaped footprint is empty after clipping to the raster extent")]
    EmptyFootprint,
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read XML file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error at byte {position}: {message}")]
    Parse { position: u64, message: String },

    #[error("XML document is empty")]
    EmptyDocument,

    #[error("expected root element '{expected}', found '{found}'")]
    UnexpectedRoot { expected: String, found: String },
}

#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("previous output {path} is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("previous output {path} holds {count} documents, expected exactly one")]
    MultipleDocuments { path: PathBuf, count: usize },

    #[error("previous output {path} has no checksum_sha1 value")]
    MissingChecksum { path: PathBuf },
}

/// Scene-level failures. A scene that fails with one of these is skipped.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no metadata file found in {0}")]
    NoMetadataFile(PathBuf),

    #[error("failed to access scene {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    #[error("metadata of {path} could not be converted: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: ConvertError,
    },

    #[error("unknown sensor code '{0}'")]
    UnknownSensor(String),

    #[error("no band alias for '{band}' on sensor {sensor}")]
    UnknownBand { sensor: String, band: String },

    #[error("metadata field '{0}' is missing")]
    MissingField(String),

    #[error("metadata field '{field}' has invalid value '{value}'")]
    InvalidField { field: String, value: String },

    #[error("failed to build spatial reference for EPSG:{epsg}: {source}")]
    Crs {
        epsg: u32,
        #[source]
        source: gdal::errors::GdalError,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

pub type Result<T, E = SceneError> = std::result::Result<T, E>;
