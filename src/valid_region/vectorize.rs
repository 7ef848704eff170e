//! Raster mask to pixel-space polygons.
//!
//! Each row is split into maximal runs of valid pixels. A run that repeats
//! with the same column extent on the next row extends the rectangle above
//! it, so homogeneous areas come out as few, tall rectangles. Pixel
//! `(col, row)` covers `[col, col + 1] x [row, row + 1]`.
//!
//! Connectivity is 4-connected: rectangles sharing an edge merge in the
//! union step, rectangles touching only at a corner stay separate parts.

use geo::{coord, Polygon, Rect};
use std::collections::BTreeMap;

use super::mask::ValidityMask;

/// Mask value carried by shapes that cover valid pixels.
pub const VALID: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct PixelShape {
    pub polygon: Polygon<f64>,
    pub value: u8,
}

/// Traces the valid area of `mask` into axis-aligned rectangles tagged
/// with [`VALID`]. Invalid pixels produce no shapes.
pub fn vectorize(mask: &ValidityMask) -> Vec<PixelShape> {
    let mut shapes = Vec::new();
    // (first col, end col) -> first row of the open rectangle
    let mut open: BTreeMap<(usize, usize), usize> = BTreeMap::new();

    for row in 0..mask.height() {
        let mut next = BTreeMap::new();
        for run in row_runs(mask.row(row)) {
            let top = open.remove(&run).unwrap_or(row);
            next.insert(run, top);
        }
        for ((start, end), top) in open {
            shapes.push(rectangle(start, end, top, row));
        }
        open = next;
    }
    for ((start, end), top) in open {
        shapes.push(rectangle(start, end, top, mask.height()));
    }

    shapes
}

fn row_runs(row: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (col, &valid) in row.iter().enumerate() {
        match (valid, start) {
            (true, None) => start = Some(col),
            (false, Some(s)) => {
                runs.push((s, col));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, row.len()));
    }
    runs
}

fn rectangle(start: usize, end: usize, top: usize, bottom: usize) -> PixelShape {
    let rect = Rect::new(
        coord! { x: start as f64, y: top as f64 },
        coord! { x: end as f64, y: bottom as f64 },
    );
    PixelShape {
        polygon: rect.to_polygon(),
        value: VALID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, BoundingRect};

    fn mask(width: usize, rows: &[&str]) -> ValidityMask {
        let cells = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        ValidityMask::from_cells(width, rows.len(), cells).unwrap()
    }

    #[test]
    fn test_runs() {
        assert_eq!(row_runs(&[true, true, false, true]), vec![(0, 2), (3, 4)]);
        assert!(row_runs(&[false, false]).is_empty());
    }

    #[test]
    fn test_block_is_one_rectangle() {
        let m = mask(5, &[".....", ".###.", ".###.", "....."]);
        let shapes = vectorize(&m);
        assert_eq!(shapes.len(), 1);

        let bounds = shapes[0].polygon.bounding_rect().unwrap();
        assert_eq!(bounds.min(), coord! { x: 1.0, y: 1.0 });
        assert_eq!(bounds.max(), coord! { x: 4.0, y: 3.0 });
        assert_eq!(shapes[0].value, VALID);
    }

    #[test]
    fn test_area_matches_valid_count() {
        let m = mask(6, &["##....", "###...", ".####.", "..####", "#....#"]);
        let area: f64 = vectorize(&m).iter().map(|s| s.polygon.unsigned_area()).sum();
        assert_eq!(area, m.valid_count() as f64);
    }

    #[test]
    fn test_empty_mask_has_no_shapes() {
        let m = mask(3, &["...", "..."]);
        assert!(vectorize(&m).is_empty());
    }
}
