//! The boundary between the formulation and the search engine that solves it.

pub mod split;


use std::time::Duration;

use crate::routing::RoutingModel;

#[doc(inline)]
pub use split::SplitSolver;

/// Result of a single solver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// One index sequence per used vehicle. Each sequence starts and ends at
    /// the depot; vehicles left out are unused.
    Solved(Vec<Vec<usize>>),

    /// No assignment satisfies the model's constraints.
    Infeasible(String),

    /// The time limit passed before any assignment was found.
    TimedOut,
}

/// A capacitated vehicle routing engine.
///
/// Implementations must return within roughly `time_limit`, and must report
/// infeasibility instead of an assignment that travels between locations
/// with no connecting path.
pub trait Solver: Send + Sync {
    fn solve(&self, model: &RoutingModel, time_limit: Duration) -> SolveOutcome;
}

impl<S: Solver + ?Sized> Solver for &S {
    fn solve(&self, model: &RoutingModel, time_limit: Duration) -> SolveOutcome {
        (**self).solve(model, time_limit)
    }
}
