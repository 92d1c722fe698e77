//! Request-time depot placement over a shared, immutable base network.

pub mod manager;
mod site;


#[doc(inline)]
pub use manager::{DepotManager, WorkingGraph};
