use geo::{Distance, Euclidean, Line, Point};

use crate::graph::FxIndexMap;

/// Where an earlier depot was placed, so a later request close by lands on
/// the same node identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct DepotSite {
    pub requested: Point,
    pub position: Point,
    pub feature: usize,
    pub segment: Line,
}

type Cell = (i64, i64);

/// Depot sites bucketed on a grid one merge radius wide, so every site within
/// the radius of a point sits in the point's cell or one of its eight
/// neighbours.
///
/// Cells are held in least-recently-used order. Once more than `capacity`
/// sites are held, the stalest cells are forgotten.
#[derive(Debug)]
pub(crate) struct SiteRegistry {
    radius: f64,
    capacity: usize,
    cells: FxIndexMap<Cell, Vec<DepotSite>>,
    len: usize,
}

impl SiteRegistry {
    pub fn new(radius: f64, capacity: usize) -> Self {
        SiteRegistry {
            radius,
            capacity,
            cells: FxIndexMap::default(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// The site requested nearest to `point`, if strictly within the radius.
    pub fn nearby(&mut self, point: Point) -> Option<DepotSite> {
        if self.radius <= 0.0 {
            return None;
        }

        let (x, y) = self.cell(point);
        let (cell, site) = (x.saturating_sub(1)..=x.saturating_add(1))
            .flat_map(|x| (y.saturating_sub(1)..=y.saturating_add(1)).map(move |y| (x, y)))
            .filter_map(|cell| Some((cell, self.cells.get(&cell)?)))
            .flat_map(|(cell, sites)| sites.iter().map(move |site| (cell, *site)))
            .map(|(cell, site)| (cell, site, Euclidean.distance(site.requested, point)))
            .filter(|(_, _, distance)| *distance < self.radius)
            .min_by(|(_, _, a), (_, _, b)| a.total_cmp(b))
            .map(|(cell, site, _)| (cell, site))?;

        self.touch(cell);
        Some(site)
    }

    pub fn record(&mut self, site: DepotSite) {
        if self.radius <= 0.0 {
            return;
        }

        let cell = self.cell(site.requested);
        self.cells.entry(cell).or_default().push(site);
        self.touch(cell);
        self.len += 1;

        // The newest cell, last in order, always survives.
        while self.len > self.capacity && self.cells.len() > 1 {
            let Some((_, forgotten)) = self.cells.shift_remove_index(0) else {
                break;
            };
            self.len -= forgotten.len();
        }
    }

    fn cell(&self, point: Point) -> Cell {
        (
            (point.x() / self.radius).floor() as i64,
            (point.y() / self.radius).floor() as i64,
        )
    }

    fn touch(&mut self, cell: Cell) {
        if let Some(index) = self.cells.get_index_of(&cell) {
            let last = self.cells.len() - 1;
            self.cells.move_index(index, last);
        }
    }
}
