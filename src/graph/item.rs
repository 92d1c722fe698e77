use geo::{Distance, Euclidean, Point};
use indexmap::IndexMap;
use petgraph::algo::{dijkstra, has_path_connecting};
use petgraph::prelude::UnGraphMap;
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt::{Debug, Formatter};
use std::hash::BuildHasherDefault;

use crate::geometry::NodeId;

pub type Weight = f64;

/// Open provenance properties carried from source features, not consumed by
/// the core logic.
pub type Properties = Map<String, Value>;

pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

pub type GraphStructure = UnGraphMap<NodeId, Edge>;

/// Which part a node plays within the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// A plain road vertex.
    Road,
    /// A point of interest the fleet must service.
    TaxiRank,
    /// The start and end location of every vehicle.
    Depot,
}

/// A vertex of the road network, positioned in the working (planar) CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,

    #[serde(default)]
    pub is_depot: bool,
    #[serde(default)]
    pub is_taxi_rank: bool,

    /// Load contributed when visited. Resolved through [`Node::demand`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand: Option<u32>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Properties,
}

impl Node {
    pub fn new(position: Point, role: NodeRole) -> Self {
        Node {
            id: NodeId::from(position),
            x: position.x(),
            y: position.y(),
            is_depot: role == NodeRole::Depot,
            is_taxi_rank: role == NodeRole::TaxiRank,
            demand: None,
            properties: Properties::new(),
        }
    }

    #[inline]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// The depot never contributes load; service points default to one unit.
    pub fn demand(&self) -> u32 {
        if self.is_depot {
            0
        } else {
            self.demand.unwrap_or(1)
        }
    }

    /// Folds another sighting of the same physical point into this node.
    fn absorb(&mut self, other: Node) {
        self.is_depot |= other.is_depot;
        self.is_taxi_rank |= other.is_taxi_rank;
        if other.demand.is_some() {
            self.demand = other.demand;
        }
        self.properties.extend(other.properties);
    }
}

/// An undirected road segment between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Euclidean length of the segment in the working CRS.
    pub weight: Weight,

    /// Position of the source road within the road set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<usize>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Properties,
}

impl Edge {
    /// Whether the source road is flagged as one the fleet should cover.
    pub fn is_required(&self) -> bool {
        matches!(self.properties.get("required"), Some(Value::Bool(true)))
    }
}

/// Undirected, weighted road graph keyed by coordinate-derived [`NodeId`]s.
///
/// Node attributes live alongside the graph structure in an insertion-ordered
/// map, so iteration order is reproducible for identical inputs. Cloning yields
/// a fully materialised, independent copy.
#[derive(Clone, Default)]
pub struct RoadGraph {
    pub(crate) graph: GraphStructure,
    pub(crate) nodes: FxIndexMap<NodeId, Node>,
}

impl Debug for RoadGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RoadGraph with Nodes: {}, Edges: {}",
            self.node_count(),
            self.edge_count()
        )
    }
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        self.graph.edge_weight(a, b)
    }

    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &Edge)> {
        self.graph.all_edges()
    }

    /// Nodes sharing an edge with `id`. Empty for an unknown node.
    pub fn neighbors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.neighbors(id)
    }

    /// Identities of every taxi rank, sorted so that positional consumers see
    /// the same order on every run.
    pub fn taxi_ranks(&self) -> Vec<NodeId> {
        let mut ranks = self
            .nodes
            .values()
            .filter(|node| node.is_taxi_rank)
            .map(|node| node.id)
            .collect::<Vec<_>>();

        ranks.sort_unstable();
        ranks
    }

    /// Inserts a node, or merges it into the node already occupying the same
    /// identity. Returns the identity either way.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        match self.nodes.get_mut(&id) {
            Some(existing) => existing.absorb(node),
            None => {
                self.graph.add_node(id);
                self.nodes.insert(id, node);
            }
        }

        id
    }

    /// Adds the segment `a -> b`, creating plain road nodes for unseen
    /// endpoints. Segments whose endpoints collapse onto one identity are not
    /// added, and `None` is returned.
    pub fn add_segment(
        &mut self,
        a: Point,
        b: Point,
        feature: Option<usize>,
        properties: &Properties,
    ) -> Option<(NodeId, NodeId)> {
        let source = self.add_node(Node::new(a, NodeRole::Road));
        let target = self.add_node(Node::new(b, NodeRole::Road));

        if source == target {
            return None;
        }

        let edge = Edge {
            weight: Euclidean.distance(a, b),
            feature,
            properties: properties.clone(),
        };

        self.graph.add_edge(source, target, edge);
        Some((source, target))
    }

    pub(crate) fn insert_edge(&mut self, a: NodeId, b: NodeId, edge: Edge) {
        self.graph.add_edge(a, b, edge);
    }

    pub(crate) fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Option<Edge> {
        self.graph.remove_edge(a, b)
    }

    /// Whether any path connects `a` and `b`.
    pub fn has_path(&self, a: NodeId, b: NodeId) -> bool {
        self.contains_node(&a)
            && self.contains_node(&b)
            && has_path_connecting(&self.graph, a, b, None)
    }

    /// Shortest-path distance from `source` to every reachable node, costing
    /// each edge through `cost`.
    pub fn distances_from<F>(&self, source: NodeId, cost: F) -> FxHashMap<NodeId, Weight>
    where
        F: Fn(&Edge) -> Weight,
    {
        if !self.contains_node(&source) {
            return FxHashMap::default();
        }

        dijkstra(&self.graph, source, None, |edge| cost(edge.weight()))
            .into_iter()
            .collect()
    }
}
