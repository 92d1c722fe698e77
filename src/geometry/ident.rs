use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

use geo::{Coord, Point};
use serde::{Deserialize, Serialize};

/// Number of fractional digits retained in a [`NodeId`].
pub const PRECISION: usize = 8;

const SCALE: f64 = 100_000_000.0;
const SCALE_INT: i64 = 100_000_000;

/// Stable identity of a graph node, derived purely from its planar position.
///
/// Both coordinates are rounded to [`PRECISION`] fractional digits and kept as
/// scaled integers, so two insertions of the same physical point always map to
/// the same identity, across calls and across process restarts.
///
/// The textual form is `"<x>_<y>"` with exactly eight fractional digits, and is
/// what the identity serialises to.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct NodeId {
    x: i64,
    y: i64,
}

impl NodeId {
    pub fn new(x: f64, y: f64) -> Self {
        NodeId {
            x: (x * SCALE).round() as i64,
            y: (y * SCALE).round() as i64,
        }
    }

    /// The rounded x coordinate the identity was derived from.
    pub fn x(&self) -> f64 {
        self.x as f64 / SCALE
    }

    /// The rounded y coordinate the identity was derived from.
    pub fn y(&self) -> f64 {
        self.y as f64 / SCALE
    }
}

impl From<Point> for NodeId {
    fn from(value: Point) -> Self {
        NodeId::new(value.x(), value.y())
    }
}

impl From<Coord> for NodeId {
    fn from(value: Coord) -> Self {
        NodeId::new(value.x, value.y)
    }
}

fn write_fixed(f: &mut Formatter<'_>, value: i64) -> std::fmt::Result {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let scale = SCALE_INT as u64;

    write!(
        f,
        "{sign}{}.{:0width$}",
        magnitude / scale,
        magnitude % scale,
        width = PRECISION
    )
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write_fixed(f, self.x)?;
        f.write_str("_")?;
        write_fixed(f, self.y)
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({self})")
    }
}

fn parse_fixed(part: &str) -> Option<i64> {
    let (negative, digits) = match part.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, part),
    };

    let (whole, fraction) = digits.split_once('.')?;
    if fraction.len() != PRECISION || whole.is_empty() {
        return None;
    }

    let whole = whole.parse::<i64>().ok()?;
    let fraction = fraction.parse::<i64>().ok()?;
    let magnitude = whole.checked_mul(SCALE_INT)?.checked_add(fraction)?;

    Some(if negative { -magnitude } else { magnitude })
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once('_')
            .ok_or_else(|| format!("node identity {s:?} has no separator"))?;

        match (parse_fixed(x), parse_fixed(y)) {
            (Some(x), Some(y)) => Ok(NodeId { x, y }),
            _ => Err(format!("node identity {s:?} is not fixed-precision")),
        }
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for NodeId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
