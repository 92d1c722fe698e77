use std::time::Duration;

use strum::AsRefStr;
use thiserror::Error;

use crate::geometry::NodeId;

/// Every failure the crate can surface.
///
/// Each variant carries a stable, machine readable reason code obtained via
/// [`Error::code`], so a caller can tell "no road near that point" apart from
/// "no route exists" without parsing the message.
#[derive(Debug, Error, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Error {
    /// A malformed or empty input feature.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The query point has no road within the permitted radius.
    #[error("no road within {radius}m of ({x:.3}, {y:.3}), nearest is {distance:.3}m away")]
    OutOfNetwork {
        x: f64,
        y: f64,
        radius: f64,
        distance: f64,
    },

    /// The coordinate lies outside the valid domain of the projection.
    #[error("projection failed: {0}")]
    Projection(String),

    /// The solver found no assignment satisfying every constraint.
    #[error("no feasible routing: {0}")]
    InfeasibleRouting(String),

    /// The solver exhausted its time budget before producing an assignment.
    #[error("solver exceeded its time limit of {0:?}")]
    SolverTimeout(Duration),

    #[error("spatial index is empty")]
    NotFound,

    /// Splitting a road at a point did not yield exactly two pieces.
    #[error("splitting feature {feature} produced {pieces} segment(s)")]
    Split { feature: usize, pieces: usize },

    #[error("node {0} is not part of the graph")]
    NodeNotFound(NodeId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),
}

impl Error {
    /// Stable reason code, e.g. `out_of_network` or `infeasible_routing`.
    pub fn code(&self) -> &str {
        self.as_ref()
    }
}

impl From<geojson::Error> for Error {
    fn from(value: geojson::Error) -> Self {
        Error::GeoJson(Box::new(value))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
