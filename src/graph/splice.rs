use geo::{Distance, Euclidean, Line, Point};
use log::debug;
use serde_json::Value;

use crate::build::RoadFeature;
use crate::error::{Error, Result};
use crate::geometry::split::{project_onto_segment, segment_distance, split_line_at_point};
use crate::geometry::NodeId;
use crate::graph::{Node, NodeRole, Properties, RoadGraph};

/// A node further than this from a road segment is not considered to lie on it.
const ON_EDGE_EPSILON: f64 = 1e-4;

impl RoadGraph {
    /// Snaps `point` onto `road` and splices a node for it into the graph.
    ///
    /// Fails with [`Error::OutOfNetwork`] when the point lies farther than
    /// `tolerance` from the road, and with [`Error::Split`] when the road cannot
    /// be divided into exactly two pieces at the snapped location.
    pub fn splice_point(
        &mut self,
        feature: usize,
        road: &RoadFeature,
        point: Point,
        tolerance: f64,
        role: NodeRole,
        properties: Properties,
    ) -> Result<NodeId> {
        let (snap, segment) = road.snap(point).ok_or_else(|| {
            Error::InvalidGeometry(format!("road feature {feature} has no segments"))
        })?;

        if snap.distance > tolerance {
            return Err(Error::OutOfNetwork {
                x: point.x(),
                y: point.y(),
                radius: tolerance,
                distance: snap.distance,
            });
        }

        // Coincides with an existing vertex, nothing to split.
        if self.contains_node(&NodeId::from(snap.position)) {
            return self.splice_at(feature, segment, snap.position, role, properties);
        }

        let pieces = split_line_at_point(&road.geometry, point, tolerance);
        if pieces.len() != 2 {
            return Err(Error::Split {
                feature,
                pieces: pieces.len(),
            });
        }

        self.splice_at(feature, segment, snap.position, role, properties)
    }

    /// Splices a node at `position`, which must lie on `segment` of road
    /// `feature`.
    ///
    /// The edge containing the position is replaced by two sub-edges meeting at
    /// the new node, each inheriting the provenance of the replaced edge, so
    /// the original endpoints stay connected through it. A position that
    /// collapses onto an existing node instead tags that node with `role`.
    pub fn splice_at(
        &mut self,
        feature: usize,
        segment: Line,
        position: Point,
        role: NodeRole,
        properties: Properties,
    ) -> Result<NodeId> {
        let mut node = Node::new(position, role);
        node.demand = properties
            .get("demand")
            .and_then(Value::as_u64)
            .and_then(|demand| u32::try_from(demand).ok());
        node.properties = properties;
        let id = node.id;

        if self.contains_node(&id) {
            debug!("Position {id} collapses onto an existing node, tagging as {role:?}");
            return Ok(self.add_node(node));
        }

        let (source, target) = self
            .containing_edge(segment, position)
            .ok_or(Error::Split { feature, pieces: 1 })?;

        let Some(edge) = self.remove_edge(source, target) else {
            return Err(Error::Split { feature, pieces: 1 });
        };

        self.add_node(node);

        for end in [source, target] {
            let Some(end_position) = self.node(&end).map(Node::position) else {
                return Err(Error::NodeNotFound(end));
            };

            let mut half = edge.clone();
            half.weight = Euclidean.distance(end_position, position);
            self.insert_edge(end, id, half);
        }

        debug!("Spliced {id} ({role:?}) between {source} and {target}");
        Ok(id)
    }

    /// The edge holding `position` within `segment`.
    ///
    /// Earlier splices may have cut the segment into a chain of collinear
    /// edges, which is walked from the segment's start one node at a time.
    fn containing_edge(&self, segment: Line, position: Point) -> Option<(NodeId, NodeId)> {
        if segment_distance(segment, position) > ON_EDGE_EPSILON {
            return None;
        }

        let (_, goal) = project_onto_segment(segment, position);
        let mut current = NodeId::from(Point(segment.start));
        let mut reached = 0.0;

        loop {
            let (next, fraction) = self
                .neighbors(current)
                .filter_map(|neighbor| {
                    let point = self.node(&neighbor)?.position();
                    let (_, fraction) = project_onto_segment(segment, point);
                    let on_segment = segment_distance(segment, point) <= ON_EDGE_EPSILON;
                    (on_segment && fraction > reached).then_some((neighbor, fraction))
                })
                .min_by(|(_, a), (_, b)| a.total_cmp(b))?;

            if fraction >= goal {
                return Some((current, next));
            }

            current = next;
            reached = fraction;
        }
    }
}
