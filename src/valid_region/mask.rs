use tracing::debug;

use crate::error::RasterError;
use crate::raster::{Affine, RasterMaskReader};

/// Boolean grid, row-major, `true` where a pixel holds data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl ValidityMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    /// Returns `None` when `cells` does not fill a `width` x `height` grid.
    pub fn from_cells(width: usize, height: usize, cells: Vec<bool>) -> Option<Self> {
        (cells.len() == width * height).then_some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    pub fn row(&self, row: usize) -> &[bool] {
        &self.cells[row * self.width..(row + 1) * self.width]
    }

    pub fn get(&self, col: usize, row: usize) -> bool {
        self.cells[row * self.width + col]
    }

    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// Combined mask of all bands plus the transform of the last band read.
#[derive(Debug, Clone)]
pub struct AggregatedMask {
    pub mask: ValidityMask,
    pub transform: Affine,
}

/// With a mask value the sample must carry all of its bits, otherwise any
/// nonzero sample is data.
pub fn sample_is_valid(sample: i32, mask_value: Option<i64>) -> bool {
    match mask_value {
        Some(bits) => i64::from(sample) & bits == bits,
        None => sample != 0,
    }
}

/// ORs the validity of every band into one mask.
///
/// Bands are read one at a time and dropped before the next one is opened.
/// The first unreadable band aborts the whole aggregation. Returns `Ok(None)`
/// for an empty path list.
pub fn aggregate_masks<R, S>(
    reader: &R,
    paths: &[S],
    mask_value: Option<i64>,
) -> Result<Option<AggregatedMask>, RasterError>
where
    R: RasterMaskReader + ?Sized,
    S: AsRef<str>,
{
    let mut aggregated: Option<AggregatedMask> = None;

    for path in paths {
        let path = path.as_ref();
        let band = reader.read_band(path)?;

        let acc = aggregated.get_or_insert_with(|| AggregatedMask {
            mask: ValidityMask::new(band.width, band.height),
            transform: band.transform,
        });
        if (acc.mask.width, acc.mask.height) != (band.width, band.height) {
            return Err(RasterError::Malformed {
                path: path.to_string(),
                reason: format!(
                    "grid {}x{} does not match previous bands ({}x{})",
                    band.width, band.height, acc.mask.width, acc.mask.height
                ),
            });
        }

        for (cell, &sample) in acc.mask.cells.iter_mut().zip(&band.samples) {
            *cell |= sample_is_valid(sample, mask_value);
        }
        acc.transform = band.transform;
        debug!("Accumulated validity of {}", path);
    }

    Ok(aggregated)
}
