use itertools::Itertools;

use std::time::Duration;

use crate::config::DepotConfig;
use crate::depot::DepotManager;
use crate::fixture::{self, build_planar, id, path_abc, A, B, MIDPOINT};
use crate::geometry::{NodeId, Planar};
use crate::graph::RoadGraph;
use crate::routing::{
    solve_routing, CostMatrix, Formulator, RoutingModel, SolveOutcome, Solver, Weighting,
    UNREACHABLE,
};

fn assert_valid(routes: &[crate::routing::Route], graph: &RoadGraph, depot: NodeId, capacity: u64) {
    for route in routes {
        assert_eq!(route.nodes().first(), Some(&depot));
        assert_eq!(route.nodes().last(), Some(&depot));
        assert!(route.load() <= capacity);
        assert!(!route.services().contains(&depot));
    }

    let visited = routes
        .iter()
        .flat_map(|route| route.services().iter().copied())
        .sorted()
        .collect::<Vec<_>>();

    let expected = graph
        .taxi_ranks()
        .into_iter()
        .filter(|rank| *rank != depot)
        .collect::<Vec<_>>();

    assert_eq!(visited, expected, "every service exactly once");
}

#[test_log::test]
fn single_vehicle_visits_the_midpoint() {
    let manager = DepotManager::new(build_planar(path_abc()), Planar, DepotConfig::default());
    let (graph, depot) = manager.insert_depot(1.0, 1.0).expect("depot near A");
    assert_eq!(depot, id(A));

    let routes = solve_routing(&graph, depot, 1, 1).expect("feasible");

    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].nodes(), &[id(A), id(MIDPOINT), id(A)]);
    assert_eq!(routes[0].load(), 1);
    assert_eq!(routes[0].cost(), 300);
}

#[test_log::test]
fn every_vehicle_gets_a_route() {
    let graph = build_planar(path_abc()).graph;
    let routes = solve_routing(&graph, id(A), 3, 4).expect("feasible");

    assert_eq!(routes.len(), 3);
    assert_eq!(routes.iter().filter(|route| route.is_idle()).count(), 2);
    for (vehicle, route) in routes.iter().enumerate() {
        assert_eq!(route.vehicle(), vehicle);
    }

    let idle = routes.iter().find(|route| route.is_idle()).expect("idle");
    assert_eq!(idle.nodes(), &[id(A), id(A)]);
    assert_eq!(idle.cost(), 0);
}

#[test_log::test]
fn routes_cover_every_rank_within_capacity() {
    let network = build_planar(fixture::block());
    let graph = &network.graph;

    for (vehicles, capacity) in [(2, 2), (3, 2), (1, 4), (4, 1)] {
        let routes = solve_routing(graph, id(A), vehicles, capacity).expect("feasible");

        assert_eq!(routes.len(), vehicles);
        assert_valid(&routes, graph, id(A), u64::from(capacity));
    }
}

#[test_log::test]
fn depot_on_a_rank_is_not_a_service() {
    let graph = build_planar(fixture::block()).graph;
    let depot = id((50.0, 0.0));

    let routes = solve_routing(&graph, depot, 2, 2).expect("feasible");

    assert_valid(&routes, &graph, depot, 2);
    assert_eq!(routes.iter().map(|route| route.services().len()).sum::<usize>(), 3);
}

#[test_log::test]
fn demand_over_fleet_capacity_is_infeasible() {
    let graph = build_planar(fixture::block()).graph;

    let err = solve_routing(&graph, id(A), 1, 3).expect_err("four ranks, room for three");
    assert_eq!(err.code(), "infeasible_routing");

    let err = solve_routing(&graph, id(A), 4, 0).expect_err("no room at all");
    assert_eq!(err.code(), "infeasible_routing");
}

#[test_log::test]
fn disconnected_rank_is_infeasible() {
    let graph = build_planar(fixture::islands()).graph;

    let err = solve_routing(&graph, id(A), 2, 4).expect_err("the far island is unreachable");
    assert_eq!(err.code(), "infeasible_routing");
}

#[test_log::test]
fn malformed_requests() {
    let graph = build_planar(path_abc()).graph;

    let err = solve_routing(&graph, id(A), 0, 4).expect_err("no vehicles");
    assert_eq!(err.code(), "invalid_request");

    let err = solve_routing(&graph, id((7.0, 7.0)), 1, 4).expect_err("no such depot");
    assert_eq!(err.code(), "node_not_found");
}

#[test_log::test]
fn zero_time_limit_keeps_constructed_routes() {
    let graph = build_planar(path_abc()).graph;
    let formulator = Formulator::default().with_time_limit(Duration::ZERO);

    let routes = formulator
        .solve_routing(&graph, id(A), 1, 1)
        .expect("construction needs no search time");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].nodes(), &[id(A), id(MIDPOINT), id(A)]);
}

#[test_log::test]
fn formulation_orders_nodes_deterministically() {
    let graph = build_planar(fixture::block()).graph;
    let formulation = Formulator::default()
        .formulate(&graph, id(B), 2, 2)
        .expect("formulates");

    assert_eq!(formulation.nodes()[0], id(B));
    assert_eq!(&formulation.nodes()[1..], graph.taxi_ranks().as_slice());

    let model = formulation.model();
    assert_eq!(model.depot, 0);
    assert_eq!(model.demands, vec![0, 1, 1, 1, 1]);
    assert_eq!(model.costs.len(), 5);
    for i in 0..model.len() {
        assert_eq!(model.costs.get(i, i), 0);
        for j in 0..model.len() {
            assert_eq!(model.costs.get(i, j), model.costs.get(j, i));
        }
    }
}

#[test_log::test]
fn matrix_marks_unreachable_pairs() {
    let graph = build_planar(fixture::islands()).graph;
    let nodes = [id(A), id((50.0, 0.0)), id((1050.0, 0.0))];
    let matrix = CostMatrix::build(&graph, &nodes, Weighting::Distance);

    assert_eq!(matrix.get(0, 1), 50);
    assert_eq!(matrix.get(0, 2), UNREACHABLE);
    assert_eq!(matrix.get(2, 1), UNREACHABLE);
    assert!(!matrix.is_reachable(1, 2));
}

#[test_log::test]
fn coverage_discounts_required_roads_only() {
    let graph = build_planar(fixture::block()).graph;
    let nodes = [id(A), id(B), id((100.0, 100.0))];

    let plain = CostMatrix::build(&graph, &nodes, Weighting::Distance);
    let coverage = CostMatrix::build(&graph, &nodes, Weighting::Coverage { discount: 0.95 });

    assert_eq!(plain.get(0, 1), 100);
    assert_eq!(coverage.get(0, 1), 95);
    assert_eq!(coverage.get(1, 2), plain.get(1, 2));
    assert_eq!(graph.edge(id(A), id((50.0, 0.0))).expect("edge").weight, 50.0);
}

#[test_log::test]
fn route_coordinates_are_geographic() {
    let graph = build_planar(path_abc()).graph;
    let routes = solve_routing(&graph, id(A), 1, 1).expect("feasible");

    let coordinates = routes[0].coordinates(&graph, &Planar).expect("unprojects");
    assert_eq!(coordinates, vec![(0.0, 0.0), (0.0, 150.0), (0.0, 0.0)]);
}

/// Returns canned output regardless of the model.
struct Canned(SolveOutcome);

impl Solver for Canned {
    fn solve(&self, _: &RoutingModel, _: Duration) -> SolveOutcome {
        self.0.clone()
    }
}

#[test_log::test]
fn invalid_solver_output_is_rejected() {
    let graph = build_planar(fixture::block()).graph;
    let solve = |outcome: SolveOutcome| {
        Formulator::new(Canned(outcome)).solve_routing(&graph, id(A), 2, 4)
    };

    let cases = [
        vec![vec![0, 1, 2, 3, 4, 0], vec![0, 1, 0]],
        vec![vec![0, 1, 2, 0]],
        vec![vec![1, 2, 3, 4, 0]],
        vec![vec![0, 1, 2, 0, 3, 4, 0]],
        vec![vec![0, 1, 0], vec![0, 2, 0], vec![0, 3, 4, 0]],
        vec![vec![0, 1, 2, 3, 9, 0]],
    ];

    for sequences in cases {
        let err = solve(SolveOutcome::Solved(sequences.clone()))
            .expect_err(&format!("{sequences:?} must be rejected"));
        assert_eq!(err.code(), "infeasible_routing");
    }

    let routes = solve(SolveOutcome::Solved(vec![vec![], vec![0, 4, 3, 2, 1, 0]]))
        .expect("valid output");
    assert!(routes[0].is_idle());
    assert_eq!(routes[1].services().len(), 4);

    let err = solve(SolveOutcome::Infeasible("engine says no".to_string()))
        .expect_err("infeasible");
    assert_eq!(err.code(), "infeasible_routing");

    let err = solve(SolveOutcome::TimedOut).expect_err("timed out");
    assert_eq!(err.code(), "solver_timeout");
}
