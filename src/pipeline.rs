use std::path::Path;

use anyhow::{Result, bail};
use polars::frame::DataFrame;
use rayon::prelude::*;

use crate::{
    grid::RasterGrid,
    layer::BoundaryLayer,
    merge::merge_levels,
    reshape::{TableShape, pivot_long},
    sink::{RunManifest, write_parquet_atomic},
    zonal::{AggregateRow, AggregationKind, aggregate},
};

/// Batch-run configuration. `depth` is the statically declared number of
/// admin nesting depths in the output schema, never inferred from input
/// attributes.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub depth: usize,
    pub aggregation: AggregationKind,
    pub shape: TableShape,
}

impl PipelineConfig {
    /// Defaults: area-weighted sum, long output.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            aggregation: AggregationKind::default(),
            shape: TableShape::default(),
        }
    }
}

/// Run the full pipeline in memory: aggregate each level against the shared
/// raster (levels in parallel, read-only inputs, joined before the merge),
/// stack the levels into the wide table, and pivot per the configured shape.
///
/// Layers must be ordered by strictly increasing depth and no layer may be
/// deeper than `config.depth - 1`. A run either completes or fails fatally;
/// there is no partial result.
pub fn run(
    grid: &RasterGrid,
    layers: &[BoundaryLayer],
    config: &PipelineConfig,
    verbose: u8,
) -> Result<DataFrame> {
    if layers.is_empty() {
        bail!("no boundary layers supplied");
    }

    if verbose > 0 {
        for layer in layers {
            let dups = layer.duplicate_identities();
            if dups > 0 {
                eprintln!(
                    "[zonal] depth {}: {} polygons share an identity tuple (kept verbatim)",
                    layer.depth(), dups
                );
            }
        }
    }

    let levels: Vec<Vec<AggregateRow>> = layers
        .par_iter()
        .map(|layer| aggregate(layer, grid, config.aggregation))
        .collect::<Result<_>>()?;

    if verbose > 0 {
        let polygons: usize = levels.iter().map(|level| level.len()).sum();
        eprintln!(
            "[zonal] aggregated {} bands over {} polygons across {} levels",
            grid.num_bands(), polygons, levels.len()
        );
    }

    let depths: Vec<usize> = layers.iter().map(|layer| layer.depth()).collect();
    let band_names = grid.band_names();
    let wide = merge_levels(&levels, &depths, config.depth, &band_names)?;

    match config.shape {
        TableShape::Wide => Ok(wide),
        TableShape::Long => pivot_long(&wide, config.depth, &band_names),
    }
}

/// `run`, then persist atomically to Parquet with a JSON run manifest
/// (`<output>.manifest.json`) recording bands, depth, row count, and the
/// output file's sha256.
pub fn run_to_parquet(
    grid: &RasterGrid,
    layers: &[BoundaryLayer],
    config: &PipelineConfig,
    output: &Path,
    verbose: u8,
) -> Result<DataFrame> {
    let table = run(grid, layers, config, verbose)?;

    write_parquet_atomic(&table, output)?;
    let manifest = RunManifest::describe(&table, config.depth, grid.band_names(), output)?;
    let manifest_path = output.with_extension("manifest.json");
    manifest.write(&manifest_path)?;

    if verbose > 0 {
        eprintln!("[sink] {} rows -> {}", table.height(), output.display());
        eprintln!("[sink] manifest -> {}", manifest_path.display());
    }
    Ok(table)
}
