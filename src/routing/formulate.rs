use itertools::Itertools;
use log::{debug, info, warn};

use std::time::{Duration, Instant};

use crate::config::RoutingConfig;
use crate::error::{Error, Result};
use crate::geometry::NodeId;
use crate::graph::RoadGraph;
use crate::routing::matrix::{Cost, CostMatrix, Weighting};
use crate::routing::solver::{SolveOutcome, Solver, SplitSolver};
use crate::routing::{Route, RoutingModel};

/// A routing request translated into solver indices.
///
/// Index 0 is always the depot; the remaining indices are the taxi ranks of
/// the working graph, sorted by identity, so positional solver output maps
/// back to the same nodes on every run.
#[derive(Debug, Clone)]
pub struct Formulation {
    nodes: Vec<NodeId>,
    model: RoutingModel,
}

impl Formulation {
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn model(&self) -> &RoutingModel {
        &self.model
    }

    pub fn depot(&self) -> NodeId {
        self.nodes[self.model.depot]
    }

    /// Maps per-vehicle index sequences back onto node identities.
    ///
    /// The sequences are checked rather than trusted: each must leave from and
    /// return to the depot without passing through it, every service must be
    /// visited exactly once, no vehicle may exceed its capacity, and no leg
    /// may join locations without a connecting path. Vehicles the solver left
    /// out receive an idle `[depot, depot]` route.
    pub fn decode(&self, sequences: Vec<Vec<usize>>) -> Result<Vec<Route>> {
        let model = &self.model;
        if sequences.len() > model.vehicles {
            return Err(Error::InfeasibleRouting(format!(
                "solver returned {} routes for {} vehicles",
                sequences.len(),
                model.vehicles
            )));
        }

        let mut visited = vec![false; model.len()];
        let mut routes = Vec::with_capacity(model.vehicles);

        for (vehicle, sequence) in sequences.into_iter().enumerate() {
            if sequence.is_empty() {
                routes.push(self.idle(vehicle));
                continue;
            }

            self.check_sequence(vehicle, &sequence, &mut visited)?;

            let load = model.load(&sequence);
            let cost = sequence
                .iter()
                .tuple_windows()
                .map(|(a, b)| model.costs.get(*a, *b))
                .sum::<Cost>();

            let nodes = sequence.iter().map(|index| self.nodes[*index]).collect();
            routes.push(Route::new(vehicle, nodes, load, cost));
        }

        if let Some(missed) = model.services().find(|index| !visited[*index]) {
            return Err(Error::InfeasibleRouting(format!(
                "service {} was left unvisited",
                self.nodes[missed]
            )));
        }

        for vehicle in routes.len()..model.vehicles {
            routes.push(self.idle(vehicle));
        }

        Ok(routes)
    }

    fn idle(&self, vehicle: usize) -> Route {
        let depot = self.depot();
        Route::new(vehicle, vec![depot, depot], 0, 0)
    }

    fn check_sequence(
        &self,
        vehicle: usize,
        sequence: &[usize],
        visited: &mut [bool],
    ) -> Result<()> {
        let model = &self.model;
        let violation = |reason: String| -> Result<()> {
            Err(Error::InfeasibleRouting(format!("vehicle {vehicle}: {reason}")))
        };

        if sequence.len() < 2
            || sequence.first() != Some(&model.depot)
            || sequence.last() != Some(&model.depot)
        {
            return violation(format!(
                "route {sequence:?} does not start and end at the depot"
            ));
        }

        for index in &sequence[1..sequence.len() - 1] {
            if *index >= model.len() {
                return violation(format!("unknown location index {index}"));
            }

            if *index == model.depot {
                return violation("route returns to the depot mid-way".to_string());
            }

            if std::mem::replace(&mut visited[*index], true) {
                return violation(format!("service {} is visited twice", self.nodes[*index]));
            }
        }

        let load = model.load(sequence);
        if load > u64::from(model.capacity) {
            return violation(format!("load {load} exceeds capacity {}", model.capacity));
        }

        if model.crosses_unreachable(sequence) {
            return violation("route travels between disconnected locations".to_string());
        }

        Ok(())
    }
}

/// Formulates capacitated routing requests over a working graph and drives a
/// [`Solver`] to answer them.
#[derive(Debug, Clone)]
pub struct Formulator<S: Solver = SplitSolver> {
    solver: S,
    weighting: Weighting,
    time_limit: Duration,
}

impl Default for Formulator<SplitSolver> {
    fn default() -> Self {
        Formulator::new(SplitSolver)
    }
}

impl Formulator<SplitSolver> {
    pub fn from_config(config: &RoutingConfig) -> Self {
        let weighting = match config.edge_coverage {
            true => Weighting::Coverage {
                discount: config.coverage_discount,
            },
            false => Weighting::Distance,
        };

        Formulator::new(SplitSolver)
            .with_weighting(weighting)
            .with_time_limit(config.time_limit())
    }
}

impl<S: Solver> Formulator<S> {
    pub fn new(solver: S) -> Self {
        Formulator {
            solver,
            weighting: Weighting::Distance,
            time_limit: RoutingConfig::default().time_limit(),
        }
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Builds the solver model for routing `vehicles` vehicles of `capacity`
    /// from `depot` through every taxi rank of `graph`.
    pub fn formulate(
        &self,
        graph: &RoadGraph,
        depot: NodeId,
        vehicles: usize,
        capacity: u32,
    ) -> Result<Formulation> {
        if vehicles == 0 {
            return Err(Error::InvalidRequest(
                "at least one vehicle is required".to_string(),
            ));
        }

        if !graph.contains_node(&depot) {
            return Err(Error::NodeNotFound(depot));
        }

        let nodes = std::iter::once(depot)
            .chain(graph.taxi_ranks().into_iter().filter(|id| *id != depot))
            .collect::<Vec<_>>();

        let demands = nodes
            .iter()
            .enumerate()
            .map(|(index, id)| match index {
                0 => 0,
                _ => graph.node(id).map_or(1, |node| node.demand()),
            })
            .collect::<Vec<_>>();

        let costs = CostMatrix::build(graph, &nodes, self.weighting);

        let unreachable = (1..nodes.len())
            .filter(|index| !costs.is_reachable(0, *index))
            .count();
        if unreachable > 0 {
            warn!("{unreachable} taxi ranks cannot be reached from depot {depot}");
        }

        Ok(Formulation {
            nodes,
            model: RoutingModel {
                costs,
                demands,
                capacity,
                vehicles,
                depot: 0,
            },
        })
    }

    /// Routes the fleet from `depot` through every taxi rank of `graph`.
    ///
    /// Returns exactly one route per vehicle. Weighting applies to the costs
    /// first; capacity is then enforced by the solver as an independent
    /// constraint.
    ///
    /// # Errors
    ///
    /// [`Error::InfeasibleRouting`] when no assignment satisfies capacity and
    /// connectivity, [`Error::SolverTimeout`] when the solver finds nothing
    /// within the time limit, [`Error::InvalidRequest`] for an empty fleet,
    /// and [`Error::NodeNotFound`] when the depot is not part of `graph`.
    pub fn solve_routing(
        &self,
        graph: &RoadGraph,
        depot: NodeId,
        vehicles: usize,
        capacity: u32,
    ) -> Result<Vec<Route>> {
        let start_time = Instant::now();
        let formulation = self.formulate(graph, depot, vehicles, capacity)?;
        debug!("Formulation took: {:?}", start_time.elapsed());

        let services = formulation.nodes.len() - 1;
        info!("Routing {services} taxi ranks with {vehicles} vehicles of capacity {capacity}");

        match self.solver.solve(&formulation.model, self.time_limit) {
            SolveOutcome::Solved(sequences) => {
                let routes = formulation.decode(sequences)?;
                info!(
                    "Finished. {} active routes, total cost {} in {}ms",
                    routes.iter().filter(|route| !route.is_idle()).count(),
                    routes.iter().map(Route::cost).sum::<Cost>(),
                    start_time.elapsed().as_millis()
                );
                Ok(routes)
            }
            SolveOutcome::Infeasible(reason) => Err(Error::InfeasibleRouting(reason)),
            SolveOutcome::TimedOut => Err(Error::SolverTimeout(self.time_limit)),
        }
    }
}

/// Routes the fleet with the built-in solver and plain distance costs.
pub fn solve_routing(
    graph: &RoadGraph,
    depot: NodeId,
    vehicles: usize,
    capacity: u32,
) -> Result<Vec<Route>> {
    Formulator::default().solve_routing(graph, depot, vehicles, capacity)
}
