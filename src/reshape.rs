use anyhow::{Context, Result};
use polars::prelude::*;

use crate::merge::identity_column;

/// Output table shape. The long pivot is a swappable stage: wide output
/// skips it entirely when compression or scan performance favor one column
/// per band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableShape {
    Wide,
    #[default]
    Long,
}

/// Pivot the wide table into long form: one row per (polygon, band) pair,
/// with `variable` = band name and `value` = aggregate.
///
/// Purely row-expanding: identity columns pass through unchanged, nulls
/// included. Output order is deterministic, input rows outer and raster
/// band order inner, so consumers can rely on the (polygon, variable)
/// enumeration order.
pub fn pivot_long(wide: &DataFrame, total_depth: usize, band_names: &[String]) -> Result<DataFrame> {
    let height = wide.height();
    let num_bands = band_names.len();

    let mut ident_in: Vec<Vec<Option<String>>> = Vec::with_capacity(total_depth);
    for d in 0..total_depth {
        let name = identity_column(d);
        let col = wide
            .column(&name)
            .with_context(|| format!("wide table is missing identity column '{name}'"))?;
        let values = col
            .as_materialized_series()
            .str()
            .with_context(|| format!("identity column '{name}' is not text"))?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        ident_in.push(values);
    }

    let mut band_in: Vec<Vec<Option<f64>>> = Vec::with_capacity(num_bands);
    for name in band_names {
        let col = wide
            .column(name)
            .with_context(|| format!("wide table is missing band column '{name}'"))?;
        let values = col
            .as_materialized_series()
            .f64()
            .with_context(|| format!("band column '{name}' is not numeric"))?
            .into_iter()
            .collect();
        band_in.push(values);
    }

    let mut ident_out: Vec<Vec<Option<String>>> = (0..total_depth)
        .map(|_| Vec::with_capacity(height * num_bands))
        .collect();
    let mut variable: Vec<&str> = Vec::with_capacity(height * num_bands);
    let mut value: Vec<Option<f64>> = Vec::with_capacity(height * num_bands);

    for i in 0..height {
        for b in 0..num_bands {
            for (d, col) in ident_out.iter_mut().enumerate() {
                col.push(ident_in[d][i].clone());
            }
            variable.push(band_names[b].as_str());
            value.push(band_in[b][i]);
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(total_depth + 2);
    for (d, values) in ident_out.into_iter().enumerate() {
        columns.push(Column::new(identity_column(d).into(), values));
    }
    columns.push(Column::new("variable".into(), variable));
    columns.push(Column::new("value".into(), value));

    Ok(DataFrame::new(columns)?)
}
