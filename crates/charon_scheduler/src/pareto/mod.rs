//! Non-dominated refuel points of every (vertex, trip) pair.

pub mod dense;
pub mod objectives;
pub mod sparse;

use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{info, instrument};

use crate::{
    problem::{
        entity::Vertex, instance::Instance, refuel_point::RefuelPointIdx, trip::TripIdx,
    },
    utils::threads::Threads,
};

pub type Frontier = SmallVec<[RefuelPointIdx; 4]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParetoStrategy {
    /// All trips and refuel points of one origin at once.
    Dense,
    /// One pair at a time, skipping pairs without a direct connection in time.
    Sparse,
    /// Dense when the concurrent working set fits in the budget.
    Auto { memory_budget_bytes: usize },
}

impl Default for ParetoStrategy {
    fn default() -> Self {
        ParetoStrategy::Auto {
            memory_budget_bytes: 256 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParetoParams {
    pub strategy: ParetoStrategy,
    pub threads: Threads,
}

impl ParetoParams {
    fn resolve(&self, instance: &Instance) -> ParetoStrategy {
        match self.strategy {
            ParetoStrategy::Auto {
                memory_budget_bytes,
            } => {
                let working_set = self.threads.number_of_threads()
                    * dense::origin_memory(
                        instance.trips().len(),
                        instance.refuel_points().len(),
                    );
                if working_set <= memory_budget_bytes {
                    ParetoStrategy::Dense
                } else {
                    ParetoStrategy::Sparse
                }
            }
            strategy => strategy,
        }
    }
}

/// Frontier table, `num_vertices x num_trips`, each frontier sorted ascending.
#[derive(Clone, Debug, PartialEq)]
pub struct ParetoTable {
    num_vertices: usize,
    num_trips: usize,
    frontiers: Vec<Frontier>,
}

impl ParetoTable {
    #[instrument(skip_all, level = "debug")]
    pub fn compute(instance: &Instance, params: &ParetoParams) -> Self {
        let strategy = params.resolve(instance);
        info!(
            "Computing Pareto frontiers for {} vertices, {} trips and {} refuel points with {:?}",
            instance.num_vertices(),
            instance.trips().len(),
            instance.refuel_points().len(),
            strategy
        );

        let vertices = instance.vertices().collect::<Vec<_>>();
        let rows = params.threads.install(|| {
            vertices
                .par_iter()
                .map(|&from| match strategy {
                    ParetoStrategy::Dense => dense::origin_frontiers(instance, from),
                    _ => sparse::origin_frontiers(instance, from),
                })
                .collect::<Vec<_>>()
        });

        Self {
            num_vertices: vertices.len(),
            num_trips: instance.trips().len(),
            frontiers: rows.into_iter().flatten().collect(),
        }
    }

    /// `(num_vertices, num_trips)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.num_vertices, self.num_trips)
    }

    pub fn frontier(&self, instance: &Instance, from: Vertex, to: TripIdx) -> &[RefuelPointIdx] {
        &self.frontiers[instance.vertex_index(from) * self.num_trips + to.get()]
    }

    pub fn num_entries(&self) -> usize {
        self.frontiers.iter().map(|frontier| frontier.len()).sum()
    }

    /// Nested lists of refuel point positions, one row per vertex.
    pub fn to_rows(&self) -> Vec<Vec<Vec<usize>>> {
        if self.num_trips == 0 {
            return vec![Vec::new(); self.num_vertices];
        }

        self.frontiers
            .chunks(self.num_trips)
            .map(|row| {
                row.iter()
                    .map(|frontier| frontier.iter().map(|r| r.get()).collect())
                    .collect()
            })
            .collect()
    }

    /// Returns `None` when rows are ragged.
    pub fn from_rows(rows: Vec<Vec<Vec<usize>>>) -> Option<Self> {
        let num_vertices = rows.len();
        let num_trips = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != num_trips) {
            return None;
        }

        let frontiers = rows
            .into_iter()
            .flatten()
            .map(|frontier| {
                let mut frontier = frontier
                    .into_iter()
                    .map(RefuelPointIdx::new)
                    .collect::<Frontier>();
                frontier.sort();
                frontier
            })
            .collect();

        Some(Self {
            num_vertices,
            num_trips,
            frontiers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{problem::vehicle::VehicleIdx, test_utils};

    #[test]
    fn test_strategies_agree_on_chain() {
        let instance = test_utils::create_chain_instance(5, 4);

        let dense = ParetoTable::compute(
            &instance,
            &ParetoParams {
                strategy: ParetoStrategy::Dense,
                threads: Threads::Single,
            },
        );
        let sparse = ParetoTable::compute(
            &instance,
            &ParetoParams {
                strategy: ParetoStrategy::Sparse,
                threads: Threads::Multi(2),
            },
        );

        assert_eq!(dense, sparse);
        assert!(dense.num_entries() > 0);
    }

    #[test]
    fn test_auto_strategy_respects_budget() {
        let instance = test_utils::create_chain_instance(3, 2);

        let tiny = ParetoParams {
            strategy: ParetoStrategy::Auto {
                memory_budget_bytes: 0,
            },
            threads: Threads::Single,
        };
        assert_eq!(tiny.resolve(&instance), ParetoStrategy::Sparse);
        assert_eq!(
            ParetoParams::default().resolve(&instance),
            ParetoStrategy::Dense
        );
    }

    #[test]
    fn test_rows_round_trip() {
        let instance = test_utils::create_chain_instance(4, 3);
        let table = ParetoTable::compute(&instance, &ParetoParams::default());

        let restored = ParetoTable::from_rows(table.to_rows()).unwrap();

        assert_eq!(restored, table);
        assert!(ParetoTable::from_rows(vec![vec![vec![]], vec![]]).is_none());
    }

    #[test]
    fn test_unreachable_refuel_point_still_dominates() {
        let instance = test_utils::create_dominated_refuel_instance();
        let vehicle = Vertex::Vehicle(VehicleIdx::new(0));
        let trip = TripIdx::new(0);

        let close = RefuelPointIdx::new(0);
        let far = RefuelPointIdx::new(1);
        assert!(objectives::recharge_window(&instance, vehicle, trip, close) < 0.0);
        assert!(objectives::recharge_window(&instance, vehicle, trip, far) >= 0.0);

        for strategy in [ParetoStrategy::Dense, ParetoStrategy::Sparse] {
            let table = ParetoTable::compute(
                &instance,
                &ParetoParams {
                    strategy,
                    threads: Threads::Single,
                },
            );
            assert!(
                table.frontier(&instance, vehicle, trip).is_empty(),
                "{strategy:?}"
            );
        }
        assert!(sparse::pair_frontier(&instance, vehicle, trip).is_empty());
    }

    #[test]
    fn test_infeasible_pairs_are_empty() {
        let instance = test_utils::create_chain_instance(3, 2);
        let table = ParetoTable::compute(&instance, &ParetoParams::default());

        // The last trip never precedes the first one.
        let frontier = table.frontier(&instance, Vertex::Trip(TripIdx::new(2)), TripIdx::new(0));
        assert!(frontier.is_empty());
    }
}
