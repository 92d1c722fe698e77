#![doc = include_str!("../readme.md")]

pub mod build;
pub mod config;
pub mod depot;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod index;
pub mod routing;

#[cfg(test)]
mod fixture;

#[doc(inline)]
pub use build::{build_base_network, BuildReport, Network, RawFeatures};
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use depot::{DepotManager, WorkingGraph};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use geometry::{NodeId, Project, Projection};
#[doc(inline)]
pub use graph::RoadGraph;
#[doc(inline)]
pub use routing::{solve_routing, Formulator, Route};
