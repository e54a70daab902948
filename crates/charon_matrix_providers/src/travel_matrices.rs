use serde::{Deserialize, Serialize};

/// TravelMatrices holds the travel distances (meters) and times (seconds)
/// from a list of sources to a list of targets.
/// Stored as flat vectors, row-major by source.
///
/// A pair without route is `f64::INFINITY`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    pub num_sources: usize,
    pub num_targets: usize,

    #[serde(with = "crate::nullable_floats")]
    pub distances: Vec<f64>,
    #[serde(with = "crate::nullable_floats")]
    pub times: Vec<f64>,
}

impl TravelMatrices {
    pub fn new(num_sources: usize, num_targets: usize) -> Self {
        let len = num_sources * num_targets;
        Self {
            num_sources,
            num_targets,
            distances: vec![f64::INFINITY; len],
            times: vec![f64::INFINITY; len],
        }
    }

    pub fn from_rows(distances: Vec<Vec<f64>>, times: Vec<Vec<f64>>) -> Self {
        let num_sources = distances.len();
        let num_targets = distances.first().map_or(0, |row| row.len());

        Self {
            num_sources,
            num_targets,
            distances: distances.into_iter().flatten().collect(),
            times: times.into_iter().flatten().collect(),
        }
    }

    #[inline(always)]
    fn index(&self, source: usize, target: usize) -> usize {
        source * self.num_targets + target
    }

    #[inline(always)]
    pub fn distance(&self, source: usize, target: usize) -> f64 {
        self.distances[self.index(source, target)]
    }

    #[inline(always)]
    pub fn time(&self, source: usize, target: usize) -> f64 {
        self.times[self.index(source, target)]
    }

    pub fn set(&mut self, source: usize, target: usize, distance: f64, time: f64) {
        let index = self.index(source, target);
        self.distances[index] = distance;
        self.times[index] = time;
    }

    /// Copies `block` into the region starting at (`row_offset`, `col_offset`).
    pub fn assign_block(&mut self, row_offset: usize, col_offset: usize, block: &TravelMatrices) {
        for row in 0..block.num_sources {
            let dst = self.index(row_offset + row, col_offset);
            let src = block.index(row, 0);

            self.distances[dst..dst + block.num_targets]
                .copy_from_slice(&block.distances[src..src + block.num_targets]);
            self.times[dst..dst + block.num_targets]
                .copy_from_slice(&block.times[src..src + block.num_targets]);
        }
    }

    pub fn distance_rows(&self) -> Vec<Vec<f64>> {
        self.distances
            .chunks(self.num_targets.max(1))
            .map(|row| row.to_vec())
            .collect()
    }

    pub fn time_rows(&self) -> Vec<Vec<f64>> {
        self.times
            .chunks(self.num_targets.max(1))
            .map(|row| row.to_vec())
            .collect()
    }
}

impl std::hash::Hash for TravelMatrices {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_usize(self.num_sources);
        state.write_usize(self.num_targets);
        for d in &self.distances {
            state.write_u64(d.to_bits());
        }
        for t in &self.times {
            state.write_u64(t.to_bits());
        }
    }
}
