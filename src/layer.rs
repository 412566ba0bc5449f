use ahash::AHashMap;
use anyhow::{Result, bail};
use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use rstar::{AABB, RTree, RTreeObject};
use smallvec::SmallVec;

/// Admin names for depths `0..=k`, coarsest first.
pub type Identity = SmallVec<[String; 4]>;

/// A bounding box in an R-tree, associated with a polygon by index.
#[derive(Debug, Clone)]
struct BoundingBox {
    idx: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// One administrative nesting level: ordered polygons with identity tuples.
///
/// A layer of depth `k` names its polygons at every depth `0..=k` and knows
/// nothing about finer levels.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    depth: usize,
    epsg: u32,
    polygons: Vec<MultiPolygon<f64>>,
    identities: Vec<Identity>,
    rtree: RTree<BoundingBox>,
}

impl BoundaryLayer {
    /// Construct a layer, validating that every polygon carries exactly
    /// `depth + 1` non-empty admin names and a nonempty geometry.
    pub fn new(
        depth: usize,
        epsg: u32,
        polygons: Vec<MultiPolygon<f64>>,
        identities: Vec<Identity>,
    ) -> Result<Self> {
        if polygons.len() != identities.len() {
            bail!(
                "layer at depth {depth} has {} polygons but {} identity tuples",
                polygons.len(), identities.len()
            );
        }
        for (i, identity) in identities.iter().enumerate() {
            if identity.len() != depth + 1 {
                bail!(
                    "polygon {i} at depth {depth} carries {} admin names, expected {}",
                    identity.len(), depth + 1
                );
            }
            if let Some(d) = identity.iter().position(|name| name.is_empty()) {
                bail!("polygon {i} at depth {depth} has an empty admin name at depth {d}");
            }
        }

        let mut boxes = Vec::with_capacity(polygons.len());
        for (i, polygon) in polygons.iter().enumerate() {
            let Some(bbox) = polygon.bounding_rect() else {
                bail!("polygon {i} at depth {depth} has no extent (empty geometry)");
            };
            boxes.push(BoundingBox { idx: i, bbox });
        }

        Ok(Self { depth, epsg, polygons, identities, rtree: RTree::bulk_load(boxes) })
    }

    /// Get the number of polygons.
    #[inline] pub fn len(&self) -> usize { self.polygons.len() }

    /// Check if there are no polygons.
    #[inline] pub fn is_empty(&self) -> bool { self.polygons.is_empty() }

    /// Get the layer's nesting depth (0 = coarsest).
    #[inline] pub fn depth(&self) -> usize { self.depth }

    /// Get the EPSG code of the layer's spatial reference.
    #[inline] pub fn epsg(&self) -> u32 { self.epsg }

    /// Get a reference to the list of polygons.
    #[inline] pub fn polygons(&self) -> &[MultiPolygon<f64>] { &self.polygons }

    /// Get the identity tuple of polygon `i`.
    #[inline] pub fn identity(&self, i: usize) -> &Identity { &self.identities[i] }

    /// Get a reference to the list of identity tuples.
    #[inline] pub fn identities(&self) -> &[Identity] { &self.identities }

    /// Compute the bounding rectangle of all polygons.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.polygons.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            ))
    }

    /// Indices of polygons whose bounding box intersects `rect`, ascending.
    pub fn polygons_in(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut hits: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.idx)
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Count polygons whose identity tuple duplicates another's.
    /// Duplicates are never removed; uniqueness is a provider precondition.
    pub fn duplicate_identities(&self) -> usize {
        let mut counts: AHashMap<&Identity, usize> = AHashMap::with_capacity(self.len());
        for identity in &self.identities {
            *counts.entry(identity).or_default() += 1;
        }
        counts.values().filter(|&&n| n > 1).map(|&n| n).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![
            Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }).to_polygon(),
        ])
    }

    #[test]
    fn rejects_wrong_identity_arity() {
        let result = BoundaryLayer::new(
            1,
            4326,
            vec![square(0.0, 0.0, 1.0, 1.0)],
            vec![smallvec!["Kenya".to_string()]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_admin_name() {
        let result = BoundaryLayer::new(
            0,
            4326,
            vec![square(0.0, 0.0, 1.0, 1.0)],
            vec![smallvec![String::new()]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn polygons_in_reports_matching_indices() {
        let layer = BoundaryLayer::new(
            0,
            4326,
            vec![square(0.0, 0.0, 1.0, 1.0), square(5.0, 5.0, 6.0, 6.0)],
            vec![smallvec!["A".to_string()], smallvec!["B".to_string()]],
        )
        .unwrap();
        let near = Rect::new(Coord { x: 0.5, y: 0.5 }, Coord { x: 0.6, y: 0.6 });
        assert_eq!(layer.polygons_in(&near), vec![0]);
        let wide = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 6.0, y: 6.0 });
        assert_eq!(layer.polygons_in(&wide), vec![0, 1]);
        let gap = Rect::new(Coord { x: 2.0, y: 2.0 }, Coord { x: 3.0, y: 3.0 });
        assert!(layer.polygons_in(&gap).is_empty());
    }

    #[test]
    fn duplicate_identities_counts_repeats() {
        let kafue = || smallvec!["Zambia".to_string(), "Kafue".to_string()];
        let layer = BoundaryLayer::new(
            1,
            4326,
            vec![
                square(0.0, 0.0, 1.0, 1.0),
                square(1.0, 0.0, 2.0, 1.0),
                square(2.0, 0.0, 3.0, 1.0),
            ],
            vec![kafue(), kafue(), smallvec!["Zambia".to_string(), "Lusaka".to_string()]],
        )
        .unwrap();
        assert_eq!(layer.duplicate_identities(), 2);
    }
}
