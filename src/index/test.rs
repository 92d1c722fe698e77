use geo::{wkt, Point};

use crate::fixture::{self, road};
use crate::index::RoadIndex;

#[test_log::test]
fn nearest_road() {
    let roads = fixture::block().roads;
    let index = RoadIndex::build(&roads);

    assert_eq!(index.size(), 4);
    assert_eq!(index.nearest(Point::new(50.0, -3.0)).expect("south"), 0);
    assert_eq!(index.nearest(Point::new(104.0, 50.0)).expect("east"), 1);
    assert_eq!(index.nearest(Point::new(-2.0, 50.0)).expect("west"), 2);
    assert_eq!(index.nearest(Point::new(180.0, 120.0)).expect("spur"), 3);
}

#[test_log::test]
fn nearest_uses_line_distance_not_envelope() {
    // The diagonal's envelope contains the query, but the flat road is closer.
    let roads = vec![
        road(wkt! { LINESTRING(0.0 0.0, 100.0 100.0) }),
        road(wkt! { LINESTRING(0.0 80.0, 30.0 80.0) }),
    ];
    let index = RoadIndex::build(&roads);

    assert_eq!(index.nearest(Point::new(10.0, 75.0)).expect("flat"), 1);
}

#[test_log::test]
fn nearest_within_radius() {
    let index = RoadIndex::build(&fixture::path_abc().roads);

    let (feature, distance) = index
        .nearest_within(Point::new(150.0, 20.0), 25.0)
        .expect("road within radius");
    assert_eq!(feature, 1);
    approx::assert_relative_eq!(distance, 20.0);

    assert!(index.nearest_within(Point::new(150.0, 30.0), 25.0).is_none());
}

#[test_log::test]
fn empty_index_reports_not_found() {
    let index = RoadIndex::build(&[]);

    assert!(index.is_empty());
    let err = index.nearest(Point::new(0.0, 0.0)).expect_err("nothing indexed");
    assert_eq!(err.code(), "not_found");
}
