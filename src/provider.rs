use std::path::Path;

use anyhow::{Context, Result, bail};
use shapefile::{Shape, dbase::FieldValue};

use crate::layer::{BoundaryLayer, Identity};

/// Read one administrative level from a polygon shapefile.
///
/// `name_fields` lists the attribute fields holding the admin names in depth
/// order, coarsest first; its length fixes the layer depth at
/// `name_fields.len() - 1`. The raster half of the provider contract stays
/// external; grids are constructed in memory by the caller.
pub fn read_boundary_layer(
    path: &Path,
    epsg: u32,
    name_fields: &[&str],
) -> Result<BoundaryLayer> {
    if name_fields.is_empty() {
        bail!("at least one admin name field is required");
    }
    let depth = name_fields.len() - 1;

    let mut reader = shapefile::Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut polygons = Vec::with_capacity(reader.shape_count()?);
    let mut identities = Vec::with_capacity(polygons.capacity());

    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result
            .with_context(|| format!("Error reading shape+record {i} in {}", path.display()))?;

        let polygon = match shape {
            Shape::Polygon(p) => rings_to_geo(&p),
            other => bail!(
                "record {i} in {}: expected polygon geometry, found {}",
                path.display(), other.shapetype()
            ),
        };

        let mut identity = Identity::new();
        for field in name_fields {
            match record.get(field) {
                Some(FieldValue::Character(Some(name))) => identity.push(name.trim().to_string()),
                Some(FieldValue::Character(None)) => {
                    bail!("record {i}: admin name field '{field}' is empty")
                }
                Some(_) => bail!("record {i}: admin name field '{field}' is not text"),
                None => bail!("record {i}: missing admin name field '{field}'"),
            }
        }

        polygons.push(polygon);
        identities.push(identity);
    }

    BoundaryLayer::new(depth, epsg, polygons, identities)
}

/// Convert a shapefile polygon's ring list into a `geo::MultiPolygon`.
/// Shapefiles store rings flat, each exterior (CW) followed by its holes.
fn rings_to_geo(polygon: &shapefile::Polygon) -> geo::MultiPolygon<f64> {
    fn close_ring(coords: &mut Vec<geo::Coord<f64>>) {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last {
                coords.push(first);
            }
        }
    }

    fn signed_area(coords: &[geo::Coord<f64>]) -> f64 {
        coords.windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum::<f64>()
            / 2.0
    }

    let mut polygons: Vec<geo::Polygon<f64>> = Vec::new();
    let mut exterior: Option<geo::LineString<f64>> = None;
    let mut holes: Vec<geo::LineString<f64>> = Vec::new();

    for ring in polygon.rings() {
        let mut coords: Vec<geo::Coord<f64>> = ring
            .points()
            .iter()
            .map(|pt| geo::Coord { x: pt.x, y: pt.y })
            .collect();
        close_ring(&mut coords);

        // Shapefile convention: exteriors wind clockwise (negative area).
        if signed_area(&coords) < 0.0 {
            if let Some(ext) = exterior.take() {
                polygons.push(geo::Polygon::new(ext, std::mem::take(&mut holes)));
            }
            exterior = Some(geo::LineString::new(coords));
        } else {
            holes.push(geo::LineString::new(coords));
        }
    }
    if let Some(ext) = exterior {
        polygons.push(geo::Polygon::new(ext, holes));
    }

    geo::MultiPolygon::new(polygons)
}
