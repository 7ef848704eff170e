use geo::{AffineOps, AffineTransform};

use super::{CrsPolygon, PixelPolygon};
use crate::raster::Affine;

/// Moves pixel-space footprints into the raster's CRS.
#[derive(Debug, Clone, Copy)]
pub struct AffineProjector {
    transform: Affine,
}

impl AffineProjector {
    pub fn new(transform: Affine) -> Self {
        Self { transform }
    }

    /// Only coordinates change; rings, ring order and holes are kept as is.
    pub fn project(&self, polygon: &PixelPolygon) -> CrsPolygon {
        let t = &self.transform;
        let matrix = AffineTransform::new(t.a, t.b, t.xoff, t.d, t.e, t.yoff);
        CrsPolygon(polygon.0.affine_transform(&matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, BoundingRect, Coord, LineString, MultiPolygon, Polygon, Rect};

    #[test]
    fn test_unit_square_translation() {
        let square = PixelPolygon(MultiPolygon::new(vec![Rect::new(
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        )
        .to_polygon()]));
        let projector = AffineProjector::new(Affine::new(1.0, 0.0, 0.0, 1.0, 100.0, 200.0));

        let projected = projector.project(&square);
        let bounds = projected.0.bounding_rect().unwrap();
        assert_eq!(bounds.min(), coord! { x: 100.0, y: 200.0 });
        assert_eq!(bounds.max(), coord! { x: 101.0, y: 201.0 });
    }

    #[test]
    fn test_holes_and_order_preserved() {
        let exterior = LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)]);
        let hole = LineString::from(vec![(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)]);
        let pixel = PixelPolygon(MultiPolygon::new(vec![Polygon::new(exterior, vec![hole])]));
        let affine = Affine::new(30.0, 0.0, 0.0, -30.0, 500000.0, 7000000.0);

        let projected = AffineProjector::new(affine).project(&pixel);
        let polygon = &projected.0 .0[0];
        assert_eq!(polygon.interiors().len(), 1);

        let expected: Vec<Coord<f64>> = pixel.0 .0[0]
            .exterior()
            .coords()
            .map(|c| {
                let (x, y) = affine.apply(c.x, c.y);
                coord! { x: x, y: y }
            })
            .collect();
        let actual: Vec<Coord<f64>> = polygon.exterior().coords().copied().collect();
        assert_eq!(actual, expected);
        assert_eq!(polygon.interiors()[0].coords().next(), Some(&coord! { x: 500030.0, y: 6999970.0 }));
    }
}
