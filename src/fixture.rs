//! Shared networks for the in-crate tests.

use geo::{wkt, LineString, Point};
use serde_json::json;

use crate::build::{build_base_network, Network, PoiFeature, RawFeatures, RoadFeature};
use crate::config::BuildConfig;
use crate::geometry::{NodeId, Planar};
use crate::graph::Properties;

pub fn props(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

pub fn road(line: LineString) -> RoadFeature {
    RoadFeature::new(line, Properties::new())
}

pub fn poi(x: f64, y: f64) -> PoiFeature {
    PoiFeature::new(Point::new(x, y), props(json!({ "amenity": "taxi" })))
}

pub fn build_planar(raw: RawFeatures) -> Network {
    let (network, _) = build_base_network(raw, &Planar, &BuildConfig::default())
        .expect("fixture network should build");
    network
}

pub const A: (f64, f64) = (0.0, 0.0);
pub const B: (f64, f64) = (100.0, 0.0);
pub const C: (f64, f64) = (200.0, 0.0);
pub const MIDPOINT: (f64, f64) = (150.0, 0.0);

pub fn id((x, y): (f64, f64)) -> NodeId {
    NodeId::new(x, y)
}

/// The path A-B-C as two roads, with a taxi rank half a metre off the
/// middle of B-C.
pub fn path_abc() -> RawFeatures {
    RawFeatures::new(
        vec![
            road(wkt! { LINESTRING(0.0 0.0, 100.0 0.0) }),
            road(wkt! { LINESTRING(100.0 0.0, 200.0 0.0) }),
        ],
        vec![poi(150.0, 0.5)],
    )
}

/// A square block with a spur, ranks on three of its sides.
///
/// ```text
///  (0,100) ---- (100,100) ---- (200,100)
///     |             |
///  (0,0)   ----  (100,0)
/// ```
pub fn block() -> RawFeatures {
    let mut required = road(wkt! { LINESTRING(0.0 0.0, 100.0 0.0) });
    required.properties = props(json!({ "name": "south", "required": true }));

    RawFeatures::new(
        vec![
            required,
            road(wkt! { LINESTRING(100.0 0.0, 100.0 100.0) }),
            road(wkt! { LINESTRING(100.0 100.0, 0.0 100.0, 0.0 0.0) }),
            road(wkt! { LINESTRING(100.0 100.0, 200.0 100.0) }),
        ],
        vec![
            poi(50.0, 0.2),
            poi(100.0, 40.0),
            poi(0.3, 60.0),
            poi(170.0, 100.0),
        ],
    )
}

/// Two roads with no shared vertex, a rank on each.
pub fn islands() -> RawFeatures {
    RawFeatures::new(
        vec![
            road(wkt! { LINESTRING(0.0 0.0, 100.0 0.0) }),
            road(wkt! { LINESTRING(1000.0 0.0, 1100.0 0.0) }),
        ],
        vec![poi(50.0, 0.0), poi(1050.0, 0.0)],
    )
}
