#![doc = "Zonalite public API"]
mod common;
mod coverage;
mod grid;
mod layer;
mod merge;
mod pipeline;
mod provider;
mod reshape;
mod sink;
mod zonal;

#[doc(inline)]
pub use grid::{Band, GridTransform, RasterGrid};

#[doc(inline)]
pub use layer::{BoundaryLayer, Identity};

#[doc(inline)]
pub use coverage::{BooleanOverlay, CoverageEngine};

#[doc(inline)]
pub use zonal::{AggregateRow, AggregationKind, aggregate, aggregate_with};

#[doc(inline)]
pub use merge::{identity_column, merge_levels};

#[doc(inline)]
pub use reshape::{TableShape, pivot_long};

#[doc(inline)]
pub use sink::{RunManifest, write_parquet_atomic};

#[doc(inline)]
pub use pipeline::{PipelineConfig, run, run_to_parquet};

#[doc(inline)]
pub use provider::read_boundary_layer;
