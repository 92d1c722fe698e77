use geo::{wkt, LineString, Point};
use geojson::GeoJson;
use serde_json::json;

use crate::build::{build_base_network, PoiFeature, RawFeatures};
use crate::config::BuildConfig;
use crate::fixture::{self, build_planar, id, path_abc, poi, road, A, B, C, MIDPOINT};
use crate::geometry::Planar;

#[test_log::test]
fn path_with_midpoint_rank() {
    let network = build_planar(path_abc());
    let graph = &network.graph;

    assert_eq!(graph.node_count(), 4);
    assert_eq!(graph.edge_count(), 3);

    let midpoint = graph.node(&id(MIDPOINT)).expect("midpoint must be spliced in");
    assert!(midpoint.is_taxi_rank);
    assert!(!midpoint.is_depot);
    assert_eq!(midpoint.demand(), 1);
    assert_eq!(graph.taxi_ranks(), vec![id(MIDPOINT)]);

    for end in [A, B, C] {
        assert!(!graph.node(&id(end)).expect("endpoint").is_taxi_rank);
    }
}

#[test_log::test]
fn split_keeps_endpoints_connected() {
    let network = build_planar(path_abc());
    let graph = &network.graph;

    assert!(graph.edge(id(B), id(C)).is_none(), "replaced edge must be gone");
    assert!(graph.has_path(id(B), id(C)));
    assert!(graph.has_path(id(A), id(C)));

    let halves = [
        graph.edge(id(B), id(MIDPOINT)).expect("B half"),
        graph.edge(id(MIDPOINT), id(C)).expect("C half"),
    ];

    for half in halves {
        approx::assert_relative_eq!(half.weight, 50.0);
        assert_eq!(half.feature, Some(1));
    }
}

#[test_log::test]
fn build_is_idempotent() {
    let first = build_planar(fixture::block());
    let second = build_planar(fixture::block());

    assert_eq!(first.graph.node_count(), second.graph.node_count());
    assert_eq!(first.graph.edge_count(), second.graph.edge_count());

    let identities = |network: &crate::build::Network| {
        network.graph.nodes().map(|node| node.id).collect::<Vec<_>>()
    };
    assert_eq!(identities(&first), identities(&second));
    assert_eq!(first.graph.taxi_ranks(), second.graph.taxi_ranks());
}

#[test_log::test]
fn coincident_points_collapse() {
    let mut raw = path_abc();
    raw.pois.push(poi(150.0, -0.25));
    raw.pois.push(poi(150.0, 0.5));

    let (network, report) =
        build_base_network(raw, &Planar, &BuildConfig::default()).expect("should build");

    assert_eq!(report.integrated_pois, 3);
    assert_eq!(network.graph.node_count(), 4);
    assert_eq!(network.graph.edge_count(), 3);
    assert_eq!(network.graph.taxi_ranks().len(), 1);
}

#[test_log::test]
fn point_on_vertex_tags_it() {
    let mut raw = path_abc();
    raw.pois = vec![poi(100.0, 0.0)];

    let network = build_planar(raw);

    assert_eq!(network.graph.node_count(), 3);
    assert_eq!(network.graph.edge_count(), 2);
    assert!(network.graph.node(&id(B)).expect("B").is_taxi_rank);
}

#[test_log::test]
fn distant_point_is_skipped() {
    let mut raw = path_abc();
    raw.pois = vec![poi(150.0, 5.0)];

    let (network, report) =
        build_base_network(raw, &Planar, &BuildConfig::default()).expect("should build");

    assert_eq!(report.integrated_pois, 0);
    assert_eq!(report.skipped_pois, 1);
    assert_eq!(network.graph.node_count(), 3);
    assert!(network.graph.taxi_ranks().is_empty());

    // A wider tolerance admits the same point.
    let mut raw = path_abc();
    raw.pois = vec![poi(150.0, 5.0)];
    let config = BuildConfig { poi_tolerance: 10.0 };
    let (network, report) = build_base_network(raw, &Planar, &config).expect("should build");

    assert_eq!(report.integrated_pois, 1);
    assert_eq!(network.graph.taxi_ranks(), vec![id(MIDPOINT)]);
}

#[test_log::test]
fn invalid_features_are_skipped() {
    let mut raw = path_abc();
    raw.roads.push(road(LineString::from(vec![(5.0, 5.0)])));
    raw.roads.push(road(wkt! { LINESTRING(7.0 7.0, 7.0 7.0) }));
    raw.pois.push(PoiFeature::new(Point::new(f64::NAN, 0.0), Default::default()));

    let (network, report) =
        build_base_network(raw, &Planar, &BuildConfig::default()).expect("should build");

    assert_eq!(report.roads, 2);
    assert_eq!(report.skipped_roads, 2);
    assert_eq!(report.integrated_pois, 1);
    assert_eq!(report.skipped_pois, 1);
    assert_eq!(network.roads.len(), 2);
    assert_eq!(network.graph.node_count(), 4);
}

#[test_log::test]
fn no_usable_road_is_fatal() {
    let raw = RawFeatures::new(
        vec![road(LineString::from(vec![(5.0, 5.0)]))],
        vec![poi(5.0, 5.0)],
    );

    let err = build_base_network(raw, &Planar, &BuildConfig::default())
        .expect_err("nothing to build from");
    assert_eq!(err.code(), "invalid_geometry");
}

#[test_log::test]
fn demand_property_sets_node_demand() {
    let mut raw = path_abc();
    raw.pois = vec![PoiFeature::new(
        Point::new(150.0, 0.0),
        fixture::props(json!({ "demand": 3, "name": "Rossio" })),
    )];

    let network = build_planar(raw);
    let node = network.graph.node(&id(MIDPOINT)).expect("midpoint");

    assert_eq!(node.demand(), 3);
    assert_eq!(node.properties.get("name"), Some(&json!("Rossio")));
}

#[test_log::test]
fn reads_mixed_feature_collection() {
    let geojson = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": { "name": "a" },
              "geometry": { "type": "LineString", "coordinates": [[0, 0], [1, 0]] } },
            { "type": "Feature", "properties": { "name": "b" },
              "geometry": { "type": "MultiLineString",
                            "coordinates": [[[1, 0], [2, 0]], [[2, 0], [2, 1]]] } },
            { "type": "Feature", "properties": { "amenity": "taxi" },
              "geometry": { "type": "Point", "coordinates": [0.5, 0] } },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon",
                            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]] } },
            { "type": "Feature", "properties": {},
              "geometry": { "type": "LineString", "coordinates": [[3, 3]] } },
            { "type": "Feature", "properties": {}, "geometry": null }
        ]
    }"#
    .parse::<GeoJson>()
    .expect("valid geojson");

    let raw = RawFeatures::from_geojson(geojson).expect("should read");

    assert_eq!(raw.roads.len(), 3);
    assert_eq!(raw.pois.len(), 1);
    assert_eq!(raw.roads[1].properties.get("name"), Some(&json!("b")));
    assert_eq!(raw.roads[2].properties.get("name"), Some(&json!("b")));
}
