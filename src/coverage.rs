use geo::{Area, BooleanOps, Contains, MultiPolygon, Rect};

/// Fractional pixel-coverage computation, pluggable at the aggregator seam.
///
/// The pipeline never implements its own overlay; implementations delegate
/// to a geometry engine. `Sync` so engines can be shared across level workers.
pub trait CoverageEngine: Sync {
    /// Fraction of `cell` covered by `polygon`, in `[0, 1]`.
    fn fraction(&self, polygon: &MultiPolygon<f64>, cell: Rect<f64>) -> f64;
}

/// Default engine backed by `geo`'s boolean overlay.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanOverlay;

impl CoverageEngine for BooleanOverlay {
    fn fraction(&self, polygon: &MultiPolygon<f64>, cell: Rect<f64>) -> f64 {
        let cell_poly = cell.to_polygon();

        // Interior pixels skip the overlay entirely.
        if polygon.contains(&cell_poly) {
            return 1.0;
        }

        let clipped = polygon.intersection(&MultiPolygon::new(vec![cell_poly]));
        let cell_area = cell.width() * cell.height();
        if cell_area == 0.0 {
            return 0.0;
        }
        (clipped.unsigned_area() / cell_area).clamp(0.0, 1.0)
    }
}
