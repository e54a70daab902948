use std::sync::Arc;

use charon_matrix_providers::travel_matrices::TravelMatrices;

pub type Distance = f64;
pub type Time = f64;

/// Travel distances (meters) and times (seconds) between extended vertices.
///
/// Rows are indexed by the place a vehicle leaves (a trip's destination), columns by the
/// place it has to reach (a trip's origin). Stored flat: `index = from * size + to`.
#[derive(Clone, Debug)]
pub struct TravelMatrix {
    distances: Arc<Vec<Distance>>,
    times: Arc<Vec<Time>>,
    size: usize,
}

impl TravelMatrix {
    pub fn new(distances: Vec<Vec<Distance>>, times: Vec<Vec<Time>>) -> Self {
        let size = distances.len();

        TravelMatrix {
            distances: Arc::new(distances.into_iter().flatten().collect()),
            times: Arc::new(times.into_iter().flatten().collect()),
            size,
        }
    }

    /// Returns `None` when the provider matrices are not square.
    pub fn from_travel_matrices(matrices: TravelMatrices) -> Option<Self> {
        if matrices.num_sources != matrices.num_targets
            || matrices.distances.len() != matrices.num_sources * matrices.num_targets
            || matrices.times.len() != matrices.distances.len()
        {
            return None;
        }

        Some(Self {
            distances: Arc::new(matrices.distances),
            times: Arc::new(matrices.times),
            size: matrices.num_sources,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_consistent(&self) -> bool {
        self.distances.len() == self.size * self.size && self.times.len() == self.size * self.size
    }

    #[inline(always)]
    fn index(&self, from: usize, to: usize) -> usize {
        from * self.size + to
    }

    #[inline(always)]
    pub fn distance(&self, from: usize, to: usize) -> Distance {
        self.distances[self.index(from, to)]
    }

    #[inline(always)]
    pub fn time(&self, from: usize, to: usize) -> Time {
        self.times[self.index(from, to)]
    }

    /// Keeps the rows and columns in `indices`, in that order.
    pub fn restrict(&self, indices: &[usize]) -> Self {
        let size = indices.len();
        let mut distances = Vec::with_capacity(size * size);
        let mut times = Vec::with_capacity(size * size);

        for &from in indices {
            for &to in indices {
                distances.push(self.distance(from, to));
                times.push(self.time(from, to));
            }
        }

        Self {
            distances: Arc::new(distances),
            times: Arc::new(times),
            size,
        }
    }

    pub fn distance_rows(&self) -> Vec<Vec<Distance>> {
        self.distances
            .chunks(self.size.max(1))
            .map(|row| row.to_vec())
            .collect()
    }

    pub fn time_rows(&self) -> Vec<Vec<Time>> {
        self.times
            .chunks(self.size.max(1))
            .map(|row| row.to_vec())
            .collect()
    }
}
