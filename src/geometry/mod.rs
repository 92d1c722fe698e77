//! Geometry utilities: node identity, point-to-line snapping and splitting,
//! and map projection.

pub mod ident;
pub mod project;
pub mod split;


#[doc(inline)]
pub use ident::NodeId;
#[doc(inline)]
pub use project::{Planar, Project, Projection, TransverseMercator, PT_TM06};
#[doc(inline)]
pub use split::{snap_point_to_line, split_line_at_point, Snap, SPLIT_TOLERANCE};
