use log::debug;

use std::cmp::Reverse;
use std::iter::once;
use std::time::{Duration, Instant};

use crate::routing::matrix::Cost;
use crate::routing::solver::{SolveOutcome, Solver};
use crate::routing::RoutingModel;

const INFINITE: Cost = Cost::MAX;

/// Built-in route-first, cluster-second solver.
///
/// A cheapest-arc giant tour over every service is cut into at most one trip
/// per vehicle by an exact split, falling back to first-fit-decreasing
/// packing when no split fits the fleet, and to an exhaustive packing search
/// when neither does. Routes are then improved with 2-opt and relocate moves
/// until no move helps or the time limit passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitSolver;

impl Solver for SplitSolver {
    fn solve(&self, model: &RoutingModel, time_limit: Duration) -> SolveOutcome {
        let start_time = Instant::now();
        let deadline = start_time + time_limit;

        if let Some(reason) = capacity_violation(model) {
            return SolveOutcome::Infeasible(reason);
        }

        let services = model.services().collect::<Vec<_>>();
        if services.is_empty() {
            return SolveOutcome::Solved(vec![]);
        }

        let tour = cheapest_arc_tour(model, &services);
        let constructed = split(model, &tour).or_else(|| first_fit_decreasing(model, &tour));
        let mut routes = match constructed {
            Some(routes) => routes,
            None => match exact_packing(model, &tour, deadline) {
                Packing::Packed(routes) => routes,
                Packing::Impossible => {
                    return SolveOutcome::Infeasible(format!(
                        "no assignment packs {} services into {} vehicles of capacity {}",
                        services.len(),
                        model.vehicles,
                        model.capacity
                    ));
                }
                Packing::Expired => return SolveOutcome::TimedOut,
            },
        };

        let passes = improve(model, &mut routes, deadline);

        if let Some(route) = routes
            .iter()
            .find(|route| model.crosses_unreachable(&with_depot(model, route)))
        {
            return SolveOutcome::Infeasible(format!(
                "no path connects the depot with every stop of {route:?}"
            ));
        }

        debug!(
            "Split solver produced {} routes costing {} after {passes} passes in {:?}",
            routes.len(),
            routes.iter().map(|route| model.tour_cost(route)).sum::<Cost>(),
            start_time.elapsed()
        );

        SolveOutcome::Solved(
            routes
                .iter()
                .map(|route| with_depot(model, route))
                .collect(),
        )
    }
}

fn with_depot(model: &RoutingModel, services: &[usize]) -> Vec<usize> {
    once(model.depot)
        .chain(services.iter().copied())
        .chain(once(model.depot))
        .collect()
}

fn capacity_violation(model: &RoutingModel) -> Option<String> {
    if model.vehicles == 0 {
        return Some("the fleet is empty".to_string());
    }

    if let Some(index) = model
        .services()
        .find(|index| model.demands[*index] > model.capacity)
    {
        return Some(format!(
            "location {index} demands {} but a vehicle carries {}",
            model.demands[index], model.capacity
        ));
    }

    let services = model.services().collect::<Vec<_>>();
    let total = model.load(&services);
    if total > model.fleet_capacity() {
        return Some(format!(
            "total demand {total} exceeds the fleet capacity of {}",
            model.fleet_capacity()
        ));
    }

    None
}

/// Orders `services` by repeatedly travelling to the cheapest unvisited one,
/// starting from the depot.
fn cheapest_arc_tour(model: &RoutingModel, services: &[usize]) -> Vec<usize> {
    let mut remaining = services.to_vec();
    let mut tour = Vec::with_capacity(remaining.len());
    let mut current = model.depot;

    while let Some(position) = remaining
        .iter()
        .enumerate()
        .min_by_key(|(_, next)| model.costs.get(current, **next))
        .map(|(position, _)| position)
    {
        current = remaining.remove(position);
        tour.push(current);
    }

    tour
}

/// Optimal division of `tour`, kept in order, into at most one trip per
/// vehicle. `potential[k][j]` holds the cheapest cost of serving the first
/// `j` stops with exactly `k` trips.
fn split(model: &RoutingModel, tour: &[usize]) -> Option<Vec<Vec<usize>>> {
    let n = tour.len();
    let fleet = model.vehicles.min(n);
    let capacity = u64::from(model.capacity);

    let mut potential = vec![vec![INFINITE; n + 1]; fleet + 1];
    let mut pred = vec![vec![0usize; n + 1]; fleet + 1];
    potential[0][0] = 0;

    for k in 0..fleet {
        for i in 0..n {
            let base = potential[k][i];
            if base == INFINITE {
                continue;
            }

            let mut load = 0u64;
            let mut distance: Cost = 0;
            for j in i..n {
                load += u64::from(model.demands[tour[j]]);
                if load > capacity {
                    break;
                }

                distance += match j == i {
                    true => model.costs.get(model.depot, tour[j]),
                    false => model.costs.get(tour[j - 1], tour[j]),
                };

                let total = base
                    .saturating_add(distance)
                    .saturating_add(model.costs.get(tour[j], model.depot));

                if total < potential[k + 1][j + 1] {
                    potential[k + 1][j + 1] = total;
                    pred[k + 1][j + 1] = i;
                }
            }
        }
    }

    let (mut trips, _) = (1..=fleet)
        .map(|k| (k, potential[k][n]))
        .filter(|(_, cost)| *cost < INFINITE)
        .min_by_key(|(_, cost)| *cost)?;

    let mut routes = Vec::with_capacity(trips);
    let mut end = n;
    while trips > 0 {
        let start = pred[trips][end];
        routes.push(tour[start..end].to_vec());
        end = start;
        trips -= 1;
    }

    routes.reverse();
    Some(routes)
}

/// Packs the heaviest services first into the first vehicle with room left,
/// then orders each vehicle's stops by cheapest arc.
fn first_fit_decreasing(model: &RoutingModel, tour: &[usize]) -> Option<Vec<Vec<usize>>> {
    let capacity = u64::from(model.capacity);

    let mut order = tour.to_vec();
    order.sort_by_key(|index| Reverse(model.demands[*index]));

    let mut bins: Vec<(u64, Vec<usize>)> = Vec::new();
    for service in order {
        let demand = u64::from(model.demands[service]);
        match bins.iter().position(|bin| bin.0 + demand <= capacity) {
            Some(at) => {
                bins[at].0 += demand;
                bins[at].1.push(service);
            }
            None if bins.len() < model.vehicles => bins.push((demand, vec![service])),
            None => return None,
        }
    }

    Some(
        bins.into_iter()
            .map(|(_, members)| cheapest_arc_tour(model, &members))
            .collect(),
    )
}

enum Packing {
    Packed(Vec<Vec<usize>>),
    Impossible,
    Expired,
}

/// Exhaustive assignment of services to vehicles, heaviest first. Vehicles
/// carrying the same load are interchangeable, so a service is only tried in
/// one of them.
fn exact_packing(model: &RoutingModel, tour: &[usize], deadline: Instant) -> Packing {
    let mut order = tour.to_vec();
    order.sort_by_key(|index| Reverse(model.demands[*index]));

    let mut search = PackingSearch {
        model,
        order: &order,
        loads: vec![0; model.vehicles],
        assignment: vec![0; order.len()],
        deadline,
    };

    match search.assign(0) {
        Some(true) => {
            let mut bins = vec![Vec::new(); model.vehicles];
            for (service, vehicle) in order.iter().zip(&search.assignment) {
                bins[*vehicle].push(*service);
            }

            Packing::Packed(
                bins.into_iter()
                    .filter(|members| !members.is_empty())
                    .map(|members| cheapest_arc_tour(model, &members))
                    .collect(),
            )
        }
        Some(false) => Packing::Impossible,
        None => Packing::Expired,
    }
}

struct PackingSearch<'a> {
    model: &'a RoutingModel,
    order: &'a [usize],
    loads: Vec<u64>,
    assignment: Vec<usize>,
    deadline: Instant,
}

impl PackingSearch<'_> {
    /// Places `order[at..]`. `None` once the deadline has passed.
    fn assign(&mut self, at: usize) -> Option<bool> {
        let Some(service) = self.order.get(at) else {
            return Some(true);
        };

        if Instant::now() >= self.deadline {
            return None;
        }

        let capacity = u64::from(self.model.capacity);
        let demand = u64::from(self.model.demands[*service]);

        let mut tried = Vec::new();
        for vehicle in 0..self.loads.len() {
            let load = self.loads[vehicle];
            if load + demand > capacity || tried.contains(&load) {
                continue;
            }
            tried.push(load);

            self.loads[vehicle] += demand;
            self.assignment[at] = vehicle;
            if self.assign(at + 1)? {
                return Some(true);
            }
            self.loads[vehicle] -= demand;
        }

        Some(false)
    }
}

/// Local search over the routes until no move improves the total cost.
/// Returns the number of passes made.
fn improve(model: &RoutingModel, routes: &mut Vec<Vec<usize>>, deadline: Instant) -> usize {
    // Idle vehicles may take over stops during relocation.
    routes.resize(model.vehicles.max(routes.len()), Vec::new());

    let mut passes = 0;
    while Instant::now() < deadline {
        passes += 1;

        let mut improved = false;
        for route in routes.iter_mut() {
            improved |= two_opt(model, route, deadline);
        }
        improved |= relocate(model, routes, deadline);

        if !improved {
            break;
        }
    }

    routes.retain(|route| !route.is_empty());
    passes
}

fn two_opt(model: &RoutingModel, route: &mut [usize], deadline: Instant) -> bool {
    let mut best = model.tour_cost(route);
    let mut improved = false;
    let mut changed = true;

    while changed {
        changed = false;
        for i in 0..route.len() {
            for j in i + 1..route.len() {
                if Instant::now() >= deadline {
                    return improved;
                }

                route[i..=j].reverse();
                let cost = model.tour_cost(route);
                if cost < best {
                    best = cost;
                    improved = true;
                    changed = true;
                } else {
                    route[i..=j].reverse();
                }
            }
        }
    }

    improved
}

/// Moves single stops into whichever other route absorbs them most cheaply.
fn relocate(model: &RoutingModel, routes: &mut [Vec<usize>], deadline: Instant) -> bool {
    let capacity = u64::from(model.capacity);
    let mut improved = false;

    for from in 0..routes.len() {
        let mut i = 0;
        while i < routes[from].len() {
            if Instant::now() >= deadline {
                return improved;
            }

            let service = routes[from][i];
            let demand = u64::from(model.demands[service]);

            let mut without = routes[from].clone();
            without.remove(i);
            let saving = model.tour_cost(&routes[from]) - model.tour_cost(&without);

            let mut best: Option<(usize, usize, Cost)> = None;
            for (to, route) in routes.iter().enumerate() {
                if to == from || model.load(route) + demand > capacity {
                    continue;
                }

                let base = model.tour_cost(route);
                for position in 0..=route.len() {
                    let mut with = route.clone();
                    with.insert(position, service);

                    let delta = model.tour_cost(&with) - base - saving;
                    if delta < 0 && best.map_or(true, |(_, _, current)| delta < current) {
                        best = Some((to, position, delta));
                    }
                }
            }

            match best {
                Some((to, position, _)) => {
                    routes[from].remove(i);
                    routes[to].insert(position, service);
                    improved = true;
                }
                None => i += 1,
            }
        }
    }

    improved
}
