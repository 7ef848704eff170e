//! Footprint of the non-fill data of a scene.
//!
//! Band masks are ORed ([`mask`]), traced into pixel rectangles
//! ([`vectorize`]), shaped into one outline ([`shape`]) and finally moved
//! into the scene CRS ([`project`]).

pub mod mask;
pub mod project;
pub mod shape;
pub mod vectorize;

use geo::MultiPolygon;
use tracing::{info, warn};

use crate::error::GeometryError;
use crate::raster::{GdalRasterReader, RasterMaskReader};
use mask::aggregate_masks;
use project::AffineProjector;
use shape::GeometryShaper;
use vectorize::vectorize;

/// Footprint in pixel coordinates of the band grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelPolygon(pub MultiPolygon<f64>);

/// Footprint in CRS coordinates. Only built by [`AffineProjector::project`].
#[derive(Debug, Clone, PartialEq)]
pub struct CrsPolygon(pub(crate) MultiPolygon<f64>);

impl CrsPolygon {
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.0
    }

    pub fn into_geometry(self) -> MultiPolygon<f64> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidRegion {
    Region(CrsPolygon),
    /// A band could not be opened or read.
    Unavailable,
}

impl ValidRegion {
    pub fn polygon(&self) -> Option<&CrsPolygon> {
        match self {
            ValidRegion::Region(polygon) => Some(polygon),
            ValidRegion::Unavailable => None,
        }
    }
}

pub struct ValidRegionService<R = GdalRasterReader> {
    reader: R,
    shaper: GeometryShaper,
}

impl Default for ValidRegionService<GdalRasterReader> {
    fn default() -> Self {
        Self::new(GdalRasterReader::new())
    }
}

impl<R: RasterMaskReader> ValidRegionService<R> {
    pub fn new(reader: R) -> Self {
        Self::with_shaper(reader, GeometryShaper::default())
    }

    pub fn with_shaper(reader: R, shaper: GeometryShaper) -> Self {
        Self { reader, shaper }
    }

    /// Derives the valid-data polygon of co-registered bands.
    ///
    /// Raster I/O and format problems degrade to [`ValidRegion::Unavailable`];
    /// an empty band list or a footprint without valid pixels is an error.
    pub fn derive<S: AsRef<str>>(
        &self,
        band_paths: &[S],
        mask_value: Option<i64>,
    ) -> Result<ValidRegion, GeometryError> {
        let aggregated = match aggregate_masks(&self.reader, band_paths, mask_value) {
            Ok(Some(aggregated)) => aggregated,
            Ok(None) => return Err(GeometryError::NoBands),
            Err(e) => {
                warn!("Valid region unavailable: {}", e);
                return Ok(ValidRegion::Unavailable);
            }
        };

        let mask = &aggregated.mask;
        let shapes = vectorize(mask);
        let pixel = self.shaper.shape(&shapes, mask.width(), mask.height())?;
        let projected = AffineProjector::new(aggregated.transform).project(&pixel);

        info!(
            "Derived valid region from {} band(s), {} of {} pixels valid",
            band_paths.len(),
            mask.valid_count(),
            mask.width() * mask.height()
        );
        Ok(ValidRegion::Region(projected))
    }
}
