use anyhow::{Result, bail};
use polars::prelude::*;

use crate::zonal::AggregateRow;

/// Name of the identity column for a given nesting depth.
#[inline]
pub fn identity_column(depth: usize) -> String {
    format!("admin_name_{depth}")
}

/// True if `name` is reserved for the output schema and cannot be a band name.
pub fn is_reserved(name: &str) -> bool {
    name == "variable" || name == "value" || name.starts_with("admin_name_")
}

/// Row-stack per-level aggregates into one wide table.
///
/// Identity columns run `admin_name_0 .. admin_name_{total_depth - 1}`;
/// depths beyond a level's own depth are proper nulls, so a downstream
/// `is null` filter selects exactly that depth. Levels must arrive in
/// strictly increasing depth order and each level's internal row order is
/// preserved. Duplicate identity tuples are kept verbatim.
pub fn merge_levels(
    levels: &[Vec<AggregateRow>],
    depths: &[usize],
    total_depth: usize,
    band_names: &[String],
) -> Result<DataFrame> {
    if levels.len() != depths.len() {
        bail!("{} levels supplied with {} depths", levels.len(), depths.len());
    }
    if total_depth == 0 {
        bail!("total depth must be at least 1");
    }
    for pair in depths.windows(2) {
        if pair[1] <= pair[0] {
            bail!(
                "levels must arrive in strictly increasing depth order (depth {} after {})",
                pair[1], pair[0]
            );
        }
    }
    if let Some(&deepest) = depths.last() {
        if deepest >= total_depth {
            bail!("level depth {deepest} exceeds the configured depth count {total_depth}");
        }
    }

    let total_rows: usize = levels.iter().map(|level| level.len()).sum();
    // vec![template; n] clones drop the reservation; build each buffer directly.
    let mut ident_cols: Vec<Vec<Option<String>>> =
        (0..total_depth).map(|_| Vec::with_capacity(total_rows)).collect();
    let mut band_cols: Vec<Vec<Option<f64>>> =
        (0..band_names.len()).map(|_| Vec::with_capacity(total_rows)).collect();

    for (level, &depth) in levels.iter().zip(depths) {
        for (i, row) in level.iter().enumerate() {
            if row.identity.len() != depth + 1 {
                bail!(
                    "row {i} at depth {depth} carries {} admin names, expected {}",
                    row.identity.len(), depth + 1
                );
            }
            if row.values.len() != band_names.len() {
                bail!(
                    "row {i} at depth {depth} carries {} band values for a band set of {}",
                    row.values.len(), band_names.len()
                );
            }
            for (d, col) in ident_cols.iter_mut().enumerate() {
                col.push(row.identity.get(d).cloned());
            }
            for (b, col) in band_cols.iter_mut().enumerate() {
                col.push(row.values[b]);
            }
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(total_depth + band_names.len());
    for (d, values) in ident_cols.into_iter().enumerate() {
        columns.push(Column::new(identity_column(d).into(), values));
    }
    for (name, values) in band_names.iter().zip(band_cols) {
        columns.push(Column::new(name.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}
