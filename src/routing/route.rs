use geo::Point;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::{NodeId, Project};
use crate::graph::RoadGraph;
use crate::routing::matrix::Cost;

/// The ordered stops of one vehicle, from the depot back to the depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    vehicle: usize,
    nodes: Vec<NodeId>,
    load: u64,
    cost: Cost,
}

impl Route {
    pub(crate) fn new(vehicle: usize, nodes: Vec<NodeId>, load: u64, cost: Cost) -> Self {
        Route {
            vehicle,
            nodes,
            load,
            cost,
        }
    }

    pub fn vehicle(&self) -> usize {
        self.vehicle
    }

    /// Every node visited, the depot at both ends included.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn depot(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// The stops between leaving and returning to the depot.
    pub fn services(&self) -> &[NodeId] {
        match self.nodes.len() {
            0..=2 => &[],
            len => &self.nodes[1..len - 1],
        }
    }

    /// Whether the vehicle stays at the depot.
    pub fn is_idle(&self) -> bool {
        self.services().is_empty()
    }

    pub fn load(&self) -> u64 {
        self.load
    }

    pub fn cost(&self) -> Cost {
        self.cost
    }

    /// The route as geographic `(lat, lon)` pairs.
    pub fn coordinates<P>(&self, graph: &RoadGraph, projection: &P) -> Result<Vec<(f64, f64)>>
    where
        P: Project + ?Sized,
    {
        self.nodes
            .iter()
            .map(|id| {
                let node = graph.node(id).ok_or(Error::NodeNotFound(*id))?;
                let geographic = projection.unproject(Point::new(node.x, node.y))?;
                Ok((geographic.y(), geographic.x()))
            })
            .collect()
    }
}
