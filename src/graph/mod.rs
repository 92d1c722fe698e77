//! The road graph: coordinate-keyed nodes, weighted undirected edges, the
//! splicing protocol used to insert points into it, and its persistence.

pub mod item;
pub mod persist;
pub mod splice;


#[doc(inline)]
pub use item::{Edge, FxIndexMap, Node, NodeRole, Properties, RoadGraph, Weight};
