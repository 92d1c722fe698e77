//! Nearest-road lookup over the reprojected road geometries.

#[cfg(test)]
mod test;

use geo::{LineString, Point};
use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::fmt::{Debug, Formatter};
use std::time::Instant;

use crate::build::RoadFeature;
use crate::error::{Error, Result};
use crate::geometry::split::snap_point_to_line;

/// A road geometry stored within the [`RoadIndex`], tagged with the position
/// of its feature in the source road set.
#[derive(Clone)]
pub struct IndexedRoad {
    pub feature: usize,
    pub line: LineString,
    envelope: AABB<Point>,
}

impl IndexedRoad {
    pub fn new(feature: usize, line: LineString) -> Option<Self> {
        let first = *line.0.first()?;
        let (min, max) = line.0.iter().fold((first, first), |(min, max), c| {
            (
                geo::coord! { x: min.x.min(c.x), y: min.y.min(c.y) },
                geo::coord! { x: max.x.max(c.x), y: max.y.max(c.y) },
            )
        });

        Some(IndexedRoad {
            feature,
            line,
            envelope: AABB::from_corners(Point(min), Point(max)),
        })
    }

    /// Planar distance from `point` to the nearest position on the road.
    pub fn distance(&self, point: &Point) -> f64 {
        snap_point_to_line(&self.line, *point)
            .map(|snap| snap.distance)
            .unwrap_or(f64::INFINITY)
    }
}

impl RTreeObject for IndexedRoad {
    type Envelope = AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedRoad {
    fn distance_2(&self, point: &Point) -> f64 {
        self.distance(point).powi(2)
    }
}

/// Spatial index answering "which road is nearest to this point".
///
/// Built once over a static road set and never mutated afterwards, so it can
/// be shared freely between concurrent requests.
#[derive(Clone)]
pub struct RoadIndex {
    tree: RTree<IndexedRoad>,
}

impl Debug for RoadIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RoadIndex with Roads: {}", self.tree.size())
    }
}

impl RoadIndex {
    pub fn build(roads: &[RoadFeature]) -> Self {
        let start_time = Instant::now();

        let entries = roads
            .iter()
            .enumerate()
            .filter_map(|(feature, road)| IndexedRoad::new(feature, road.geometry.clone()))
            .collect::<Vec<_>>();

        let tree = RTree::bulk_load(entries);
        debug!(
            "RTree bulk load of {} roads took: {:?}",
            tree.size(),
            start_time.elapsed()
        );

        RoadIndex { tree }
    }

    pub fn size(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Index of the road feature nearest to `point`.
    pub fn nearest(&self, point: Point) -> Result<usize> {
        self.tree
            .nearest_neighbor(&point)
            .map(|road| road.feature)
            .ok_or(Error::NotFound)
    }

    /// Index of the nearest road feature and its distance from `point`.
    pub fn nearest_with_distance(&self, point: Point) -> Result<(usize, f64)> {
        self.tree
            .nearest_neighbor(&point)
            .map(|road| (road.feature, road.distance(&point)))
            .ok_or(Error::NotFound)
    }

    /// The nearest road feature and its distance, provided it lies within `radius`.
    pub fn nearest_within(&self, point: Point, radius: f64) -> Option<(usize, f64)> {
        self.nearest_with_distance(point)
            .ok()
            .filter(|(_, distance)| *distance <= radius)
    }
}
