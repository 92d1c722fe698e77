use crate::routing::matrix::{CostMatrix, Cost, UNREACHABLE};

/// The solver-facing view of a routing request, expressed purely in matrix
/// indices.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingModel {
    pub costs: CostMatrix,
    pub demands: Vec<u32>,
    pub capacity: u32,
    pub vehicles: usize,
    pub depot: usize,
}

impl RoutingModel {
    /// Number of locations, the depot included.
    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Every location index other than the depot, ascending.
    pub fn services(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |index| *index != self.depot)
    }

    pub fn total_demand(&self) -> u64 {
        self.demands.iter().map(|demand| u64::from(*demand)).sum()
    }

    pub fn fleet_capacity(&self) -> u64 {
        u64::from(self.capacity) * self.vehicles as u64
    }

    /// Load of a sequence of locations.
    pub fn load(&self, sequence: &[usize]) -> u64 {
        sequence
            .iter()
            .map(|index| u64::from(self.demands[*index]))
            .sum()
    }

    /// Cost of visiting `services` in order, leaving from and returning to the
    /// depot.
    pub fn tour_cost(&self, services: &[usize]) -> Cost {
        let Some((first, last)) = services.first().zip(services.last()) else {
            return 0;
        };

        let inner = services
            .windows(2)
            .map(|pair| self.costs.get(pair[0], pair[1]))
            .sum::<Cost>();

        self.costs.get(self.depot, *first) + inner + self.costs.get(*last, self.depot)
    }

    /// Whether any consecutive pair of `sequence` lacks a connecting path.
    pub fn crosses_unreachable(&self, sequence: &[usize]) -> bool {
        sequence
            .windows(2)
            .any(|pair| self.costs.get(pair[0], pair[1]) >= UNREACHABLE)
    }
}
