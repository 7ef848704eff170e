use gdal::Dataset;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::RasterError;

/// Pixel to CRS mapping: `x' = a*x + b*y + xoff`, `y' = d*x + e*y + yoff`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub d: f64,
    pub e: f64,
    pub xoff: f64,
    pub yoff: f64,
}

impl Affine {
    pub fn new(a: f64, b: f64, d: f64, e: f64, xoff: f64, yoff: f64) -> Self {
        Self {
            a,
            b,
            d,
            e,
            xoff,
            yoff,
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    /// GDAL geotransforms are ordered `[xoff, a, b, yoff, d, e]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self::new(gt[1], gt[2], gt[4], gt[5], gt[0], gt[3])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.xoff,
            self.d * x + self.e * y + self.yoff,
        )
    }
}

/// First layer of a band file, row-major.
///
/// Level-2 bands are 8 or 16 bit integers, so samples are widened to `i32`
/// rather than `f64`.
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub width: usize,
    pub height: usize,
    pub samples: Vec<i32>,
    pub transform: Affine,
}

/// Source of band samples for mask aggregation.
pub trait RasterMaskReader {
    fn read_band(&self, path: &str) -> Result<RasterBand, RasterError>;
}

/// Reads bands through GDAL. Accepts plain paths and `/vsitar/`, `/vsizip/`
/// virtual paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct GdalRasterReader;

impl GdalRasterReader {
    pub fn new() -> Self {
        Self
    }
}

impl RasterMaskReader for GdalRasterReader {
    fn read_band(&self, path: &str) -> Result<RasterBand, RasterError> {
        if !path.starts_with("/vsi") && !Path::new(path).exists() {
            return Err(RasterError::Io {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
            });
        }

        let dataset = Dataset::open(path).map_err(|e| malformed(path, e))?;
        if dataset.raster_count() < 1 {
            return Err(malformed(path, "dataset has no raster bands"));
        }

        let (width, height) = dataset.raster_size();
        let transform = match dataset.geo_transform() {
            Ok(gt) => Affine::from_gdal(gt),
            Err(e) => {
                warn!("No geotransform in {}, using identity: {}", path, e);
                Affine::identity()
            }
        };

        let band = dataset.rasterband(1).map_err(|e| malformed(path, e))?;
        let buffer = band.read_band_as::<i32>().map_err(|e| malformed(path, e))?;
        let samples = buffer.data().to_vec();
        if samples.len() != width * height {
            return Err(malformed(
                path,
                format!(
                    "expected {} samples for {}x{} grid, got {}",
                    width * height,
                    width,
                    height,
                    samples.len()
                ),
            ));
        }

        debug!("Read band {} ({}x{})", path, width, height);
        Ok(RasterBand {
            width,
            height,
            samples,
            transform,
        })
    }
}

fn malformed(path: &str, reason: impl ToString) -> RasterError {
    RasterError::Malformed {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}
