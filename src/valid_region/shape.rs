use geo::algorithm::buffer::{Buffer, BufferStyle, LineCap, LineJoin};
use geo::{coord, unary_union, BooleanOps, ConvexHull, MultiPolygon, Polygon, Rect, Simplify};
use tracing::debug;

use super::vectorize::{PixelShape, VALID};
use super::PixelPolygon;
use crate::error::GeometryError;

/// Reduces the unioned valid area to a single outline.
pub trait HullStrategy: Send + Sync {
    fn hull(&self, area: &MultiPolygon<f64>) -> Polygon<f64>;
}

/// Convex hull. Concavities of the valid area are filled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConvexHullStrategy;

impl HullStrategy for ConvexHullStrategy {
    fn hull(&self, area: &MultiPolygon<f64>) -> Polygon<f64> {
        area.convex_hull()
    }
}

/// Distances are in pixel units.
#[derive(Debug, Clone, Copy)]
pub struct ShaperConfig {
    pub buffer_distance: f64,
    pub simplify_tolerance: f64,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            buffer_distance: 1.0,
            simplify_tolerance: 1.0,
        }
    }
}

/// union -> hull -> buffer -> simplify -> clip to the pixel extent
pub struct GeometryShaper {
    config: ShaperConfig,
    hull: Box<dyn HullStrategy>,
}

impl Default for GeometryShaper {
    fn default() -> Self {
        Self::new(ShaperConfig::default())
    }
}

impl GeometryShaper {
    pub fn new(config: ShaperConfig) -> Self {
        Self::with_hull(config, ConvexHullStrategy)
    }

    pub fn with_hull(config: ShaperConfig, hull: impl HullStrategy + 'static) -> Self {
        Self {
            config,
            hull: Box::new(hull),
        }
    }

    /// Unions the shapes tagged [`VALID`], ignoring all others.
    pub fn union(shapes: &[PixelShape]) -> MultiPolygon<f64> {
        let polygons: Vec<Polygon<f64>> = shapes
            .iter()
            .filter(|shape| shape.value == VALID)
            .map(|shape| shape.polygon.clone())
            .collect();
        unary_union(&polygons)
    }

    /// Runs the full pipeline for a `width` x `height` pixel grid.
    pub fn shape(
        &self,
        shapes: &[PixelShape],
        width: usize,
        height: usize,
    ) -> Result<PixelPolygon, GeometryError> {
        let area = Self::union(shapes);
        if area.0.is_empty() {
            return Err(GeometryError::NoValidPixels);
        }

        let hull = self.hull.hull(&area);
        // bevelled joins, square caps
        let style = BufferStyle::new(self.config.buffer_distance)
            .line_join(LineJoin::Bevel)
            .line_cap(LineCap::Square);
        let buffered = hull.buffer_with_style(style);
        let simplified = buffered.simplify(self.config.simplify_tolerance);

        let extent = Rect::new(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: width as f64, y: height as f64 },
        )
        .to_polygon();
        let clipped = simplified.intersection(&extent);
        if clipped.0.is_empty() {
            return Err(GeometryError::EmptyFootprint);
        }

        debug!(
            "Shaped {} pixel shapes into {} part(s)",
            shapes.len(),
            clipped.0.len()
        );
        Ok(PixelPolygon(clipped))
    }
}
