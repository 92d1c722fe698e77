use log::debug;
use rayon::prelude::*;

use std::fmt::{Debug, Formatter};
use std::time::Instant;

use crate::geometry::NodeId;
use crate::graph::{Edge, RoadGraph, Weight};

/// Integer travel cost, as consumed by the solver.
pub type Cost = i64;

/// Cost of a pair with no connecting path. Large enough to dominate any real
/// route, small enough that sums over a whole tour stay far from overflow.
pub const UNREACHABLE: Cost = 1_000_000_000;

/// How road edges are costed when building the matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Weighting {
    /// Plain edge length.
    #[default]
    Distance,

    /// Edge length, with edges flagged `required` discounted by `discount` so
    /// routes favour covering them.
    Coverage { discount: f64 },
}

impl Weighting {
    #[inline]
    pub fn cost(&self, edge: &Edge) -> Weight {
        match self {
            Weighting::Coverage { discount } if edge.is_required() => edge.weight * discount,
            _ => edge.weight,
        }
    }
}

/// Dense, row-major matrix of shortest-path costs between the nodes of a
/// routing request.
#[derive(Clone, PartialEq, Eq)]
pub struct CostMatrix {
    size: usize,
    costs: Vec<Cost>,
}

impl Debug for CostMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "CostMatrix {}x{}", self.size, self.size)?;
        for row in self.costs.chunks(self.size.max(1)) {
            writeln!(f, "  {row:?}")?;
        }
        Ok(())
    }
}

impl CostMatrix {
    /// Builds a matrix from explicit rows. Every row must be as long as there
    /// are rows.
    pub fn from_rows(rows: Vec<Vec<Cost>>) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|row| row.len() != size) {
            return None;
        }

        Some(CostMatrix {
            size,
            costs: rows.into_iter().flatten().collect(),
        })
    }

    /// Shortest-path costs over `graph` between every pair of `nodes`, in the
    /// given order. One search runs per source, in parallel.
    pub fn build(graph: &RoadGraph, nodes: &[NodeId], weighting: Weighting) -> Self {
        let start_time = Instant::now();

        let costs = nodes
            .par_iter()
            .flat_map_iter(|source| {
                let distances = graph.distances_from(*source, |edge| weighting.cost(edge));
                nodes.iter().map(move |target| {
                    if source == target {
                        return 0;
                    }

                    distances
                        .get(target)
                        .map(|distance| (distance.round() as Cost).min(UNREACHABLE - 1))
                        .unwrap_or(UNREACHABLE)
                })
            })
            .collect::<Vec<Cost>>();

        debug!(
            "Cost matrix for {} nodes took: {:?}",
            nodes.len(),
            start_time.elapsed()
        );

        CostMatrix {
            size: nodes.len(),
            costs,
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> Cost {
        self.costs[from * self.size + to]
    }

    pub fn row(&self, from: usize) -> &[Cost] {
        &self.costs[from * self.size..(from + 1) * self.size]
    }

    #[inline]
    pub fn is_reachable(&self, from: usize, to: usize) -> bool {
        self.get(from, to) < UNREACHABLE
    }
}
