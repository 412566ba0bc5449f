use anyhow::{Result, bail};
use geo::BoundingRect;

use crate::{
    coverage::{BooleanOverlay, CoverageEngine},
    grid::RasterGrid,
    layer::{BoundaryLayer, Identity},
    merge::is_reserved,
};

/// Closed set of reducers over a polygon's covered pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationKind {
    /// Sum of `coverage_fraction * value` over intersecting pixels.
    #[default]
    WeightedSum,
    /// Coverage-weighted mean over intersecting pixels.
    WeightedMean,
}

/// One polygon's aggregates, band values in raster band order.
/// `None` marks a polygon with zero covered (non-nodata) pixels.
#[derive(Debug, Clone)]
pub struct AggregateRow {
    pub identity: Identity,
    pub values: Vec<Option<f64>>,
}

/// Aggregate one boundary layer over the raster using the default overlay engine.
pub fn aggregate(
    layer: &BoundaryLayer,
    grid: &RasterGrid,
    kind: AggregationKind,
) -> Result<Vec<AggregateRow>> {
    aggregate_with(layer, grid, kind, &BooleanOverlay)
}

/// Aggregate one boundary layer over the raster: one row per polygon, in
/// input polygon order, one value per band, weighted by fractional pixel
/// coverage. Pure function of its inputs.
///
/// Fatal errors: spatial reference mismatch, band names colliding with
/// reserved output columns, and a non-empty layer that misses the raster
/// entirely. A polygon with no covered pixels is not an error; its values
/// are null.
pub fn aggregate_with(
    layer: &BoundaryLayer,
    grid: &RasterGrid,
    kind: AggregationKind,
    engine: &dyn CoverageEngine,
) -> Result<Vec<AggregateRow>> {
    if layer.epsg() != grid.epsg() {
        bail!(
            "layer at depth {} is EPSG:{} but the raster is EPSG:{} (reproject before the pipeline)",
            layer.depth(), layer.epsg(), grid.epsg()
        );
    }
    for band in grid.bands() {
        if is_reserved(&band.name) {
            bail!("band name '{}' collides with a reserved output column", band.name);
        }
    }
    if layer.is_empty() {
        // Empty layer, not "no overlap": an empty aggregate set is valid.
        return Ok(Vec::new());
    }
    if layer.polygons_in(&grid.bounds()).is_empty() {
        bail!("layer at depth {} does not intersect the raster extent", layer.depth());
    }

    let num_bands = grid.num_bands();
    let mut rows = Vec::with_capacity(layer.len());

    for (i, polygon) in layer.polygons().iter().enumerate() {
        let mut sums = vec![0.0f64; num_bands];
        let mut weights = vec![0.0f64; num_bands];

        let window = polygon.bounding_rect().and_then(|rect| grid.window(&rect));
        if let Some((row_range, col_range)) = window {
            for r in row_range {
                for c in col_range.clone() {
                    let fraction = engine.fraction(polygon, grid.cell_rect(r, c));
                    if fraction <= 0.0 {
                        continue;
                    }
                    for (b, band) in grid.bands().iter().enumerate() {
                        let value = band.data[[r, c]];
                        if value.is_nan() {
                            continue; // nodata
                        }
                        sums[b] += fraction * value;
                        weights[b] += fraction;
                    }
                }
            }
        }

        let values = (0..num_bands)
            .map(|b| {
                if weights[b] == 0.0 {
                    return None;
                }
                Some(match kind {
                    AggregationKind::WeightedSum => sums[b],
                    AggregationKind::WeightedMean => sums[b] / weights[b],
                })
            })
            .collect();

        rows.push(AggregateRow { identity: layer.identity(i).clone(), values });
    }

    Ok(rows)
}
