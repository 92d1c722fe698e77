//! Offline construction of the base road network from raw geographic
//! features.

pub mod builder;
pub mod feature;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use builder::{build_base_network, BuildReport, Network};
#[doc(inline)]
pub use feature::{PoiFeature, RawFeatures, RoadFeature};
