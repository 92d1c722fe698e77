//! Capacitated fleet routing over a working graph: cost matrix construction,
//! the solver-facing model, and decoding of solver output into routes.

pub mod formulate;
pub mod matrix;
pub mod model;
pub mod route;
pub mod solver;

#[cfg(test)]
mod test;

#[doc(inline)]
pub use formulate::{solve_routing, Formulation, Formulator};
#[doc(inline)]
pub use matrix::{Cost, CostMatrix, Weighting, UNREACHABLE};
#[doc(inline)]
pub use model::RoutingModel;
#[doc(inline)]
pub use route::Route;
#[doc(inline)]
pub use solver::{SolveOutcome, Solver, SplitSolver};
