use geo::{Coord, Distance, Euclidean, Line, LineString, Point};

use crate::geometry::NodeId;

/// Default tolerance (in working CRS units) under which a point is considered
/// to lie on a line.
pub const SPLIT_TOLERANCE: f64 = 0.1;

/// The result of projecting a point onto a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    /// Nearest position upon the line.
    pub position: Point,
    /// Distance between the queried point and [`Snap::position`].
    pub distance: f64,
    /// Index of the segment (`coords[segment]..coords[segment + 1]`) holding the position.
    pub segment: usize,
    /// Fraction along the segment, `0.0` at its start and `1.0` at its end.
    pub fraction: f64,
}

/// Projects `point` onto a single segment, returning the position and the
/// clamped fraction along it.
pub fn project_onto_segment(line: Line, point: Point) -> (Point, f64) {
    let delta = line.delta();
    let length_2 = delta.x * delta.x + delta.y * delta.y;

    // Degenerate segment, both ends coincide.
    if length_2 == 0.0 {
        return (Point(line.start), 0.0);
    }

    let offset = point.0 - line.start;
    let fraction = ((offset.x * delta.x + offset.y * delta.y) / length_2).clamp(0.0, 1.0);
    let position = Coord {
        x: line.start.x + delta.x * fraction,
        y: line.start.y + delta.y * fraction,
    };

    (Point(position), fraction)
}

/// Distance from `point` to the nearest position upon the segment.
pub fn segment_distance(line: Line, point: Point) -> f64 {
    let (position, _) = project_onto_segment(line, point);
    Euclidean.distance(position, point)
}

/// Returns the nearest point on `line` to `point`.
///
/// Yields `None` only for a line without any segment.
pub fn snap_point_to_line(line: &LineString, point: Point) -> Option<Snap> {
    line.lines()
        .enumerate()
        .map(|(segment, part)| {
            let (position, fraction) = project_onto_segment(part, point);
            Snap {
                position,
                distance: Euclidean.distance(position, point),
                segment,
                fraction,
            }
        })
        // First segment wins ties, keeping the result deterministic.
        .fold(None, |best: Option<Snap>, snap| match best {
            Some(best) if best.distance <= snap.distance => Some(best),
            _ => Some(snap),
        })
}

/// Splits `line` at the position nearest to `point`.
///
/// When the point lies farther than `tolerance` from the line, the line is
/// returned unchanged as the only element, signalling that the point is not on
/// it. Otherwise the returned pieces are the parts of the line on either side
/// of the snapped position; a position landing on one of the line's endpoints
/// degenerates to a single piece.
pub fn split_line_at_point(line: &LineString, point: Point, tolerance: f64) -> Vec<LineString> {
    let Some(snap) = snap_point_to_line(line, point) else {
        return vec![line.clone()];
    };

    if snap.distance > tolerance {
        return vec![line.clone()];
    }

    let coords = &line.0;
    let at = NodeId::from(snap.position);

    // Locate the cut relative to the vertices: either on an existing vertex, or
    // strictly inside a segment.
    let vertex = coords.iter().position(|c| NodeId::from(*c) == at);

    let (head, tail): (Vec<Coord>, Vec<Coord>) = match vertex {
        Some(index) => (coords[..=index].to_vec(), coords[index..].to_vec()),
        None => {
            let mut head = coords[..=snap.segment].to_vec();
            head.push(snap.position.0);

            let mut tail = vec![snap.position.0];
            tail.extend_from_slice(&coords[snap.segment + 1..]);
            (head, tail)
        }
    };

    [head, tail]
        .into_iter()
        .filter(|part| part.len() >= 2)
        .map(LineString::new)
        .collect()
}

/// Planar length of a line, the sum of its segment lengths.
pub fn planar_length(line: &LineString) -> f64 {
    line.lines()
        .map(|part| Euclidean.distance(Point(part.start), Point(part.end)))
        .sum()
}
