use std::ops::Range;

use ahash::AHashSet;
use anyhow::{Result, bail};
use geo::{Coord, Rect};
use ndarray::Array2;

/// Affine georeference mapping pixel indices to world coordinates.
/// `pixel_h` is negative for north-up rasters (row 0 at `origin_y`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_w: f64,
    pub pixel_h: f64,
}

impl GridTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_w: f64, pixel_h: f64) -> Self {
        Self { origin_x, origin_y, pixel_w, pixel_h }
    }

    /// Convenience constructor for square north-up pixels.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_size: f64) -> Self {
        Self::new(origin_x, origin_y, pixel_size, -pixel_size)
    }
}

/// A single named measurement surface. NaN encodes nodata.
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub data: Array2<f64>,
}

impl Band {
    pub fn new(name: impl Into<String>, data: Array2<f64>) -> Self {
        Self { name: name.into(), data }
    }
}

/// An ordered set of named 2D bands sharing one pixel grid and spatial reference.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    bands: Vec<Band>,
    transform: GridTransform,
    epsg: u32,
    shape: (usize, usize), // (rows, cols)
}

impl RasterGrid {
    /// Construct a grid from bands sharing one shape. Rejects empty band sets,
    /// shape mismatches, degenerate pixel sizes, and duplicate band names.
    pub fn new(bands: Vec<Band>, transform: GridTransform, epsg: u32) -> Result<Self> {
        let Some(first) = bands.first() else {
            bail!("raster must contain at least one band");
        };
        if transform.pixel_w == 0.0 || transform.pixel_h == 0.0 {
            bail!("raster pixel size must be nonzero");
        }
        let shape = first.data.dim();
        let mut seen: AHashSet<&str> = AHashSet::with_capacity(bands.len());
        for band in &bands {
            if band.data.dim() != shape {
                bail!(
                    "band '{}' has shape {:?}, expected {:?} shared by all bands",
                    band.name, band.data.dim(), shape
                );
            }
            if !seen.insert(band.name.as_str()) {
                bail!("duplicate band name '{}'", band.name);
            }
        }
        Ok(Self { bands, transform, epsg, shape })
    }

    /// Get the number of bands.
    #[inline] pub fn num_bands(&self) -> usize { self.bands.len() }

    /// Get a reference to the list of bands, in their declared order.
    #[inline] pub fn bands(&self) -> &[Band] { &self.bands }

    /// Band names in band order.
    #[inline]
    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|band| band.name.clone()).collect()
    }

    /// Get the EPSG code of the grid's spatial reference.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg }

    /// Get the (rows, cols) pixel shape shared by all bands.
    #[inline] pub fn shape(&self) -> (usize, usize) { self.shape }

    /// Area of one pixel in world units.
    #[inline]
    pub fn cell_area(&self) -> f64 {
        (self.transform.pixel_w * self.transform.pixel_h).abs()
    }

    /// World-space extent of the full grid.
    pub fn bounds(&self) -> Rect<f64> {
        let t = &self.transform;
        let (rows, cols) = self.shape;
        Rect::new(
            Coord { x: t.origin_x, y: t.origin_y },
            Coord {
                x: t.origin_x + cols as f64 * t.pixel_w,
                y: t.origin_y + rows as f64 * t.pixel_h,
            },
        )
    }

    /// World-space rectangle of the pixel at (row, col).
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect<f64> {
        let t = &self.transform;
        Rect::new(
            Coord {
                x: t.origin_x + col as f64 * t.pixel_w,
                y: t.origin_y + row as f64 * t.pixel_h,
            },
            Coord {
                x: t.origin_x + (col + 1) as f64 * t.pixel_w,
                y: t.origin_y + (row + 1) as f64 * t.pixel_h,
            },
        )
    }

    /// Pixel window covering `rect`, clamped to the grid.
    /// Returns `None` when the rectangle misses the grid entirely.
    pub fn window(&self, rect: &Rect<f64>) -> Option<(Range<usize>, Range<usize>)> {
        let t = &self.transform;
        let (rows, cols) = self.shape;

        let c_a = (rect.min().x - t.origin_x) / t.pixel_w;
        let c_b = (rect.max().x - t.origin_x) / t.pixel_w;
        let r_a = (rect.min().y - t.origin_y) / t.pixel_h;
        let r_b = (rect.max().y - t.origin_y) / t.pixel_h;

        let c0 = c_a.min(c_b).floor().max(0.0) as usize;
        let c1 = (c_b.max(c_a).ceil().max(0.0) as usize).min(cols);
        let r0 = r_a.min(r_b).floor().max(0.0) as usize;
        let r1 = (r_b.max(r_a).ceil().max(0.0) as usize).min(rows);

        if c0 >= c1 || r0 >= r1 {
            return None;
        }
        Some((r0..r1, c0..c1))
    }
}
