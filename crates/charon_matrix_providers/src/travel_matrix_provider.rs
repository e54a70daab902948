use serde::{Deserialize, Serialize};

use crate::travel_matrices::TravelMatrices;

#[derive(Deserialize, Serialize, Debug, Clone)]
pub enum TravelMatrixProvider {
    /// OSRM table service, one block per request, blocks spread over `hosts`.
    Osrm {
        hosts: Vec<String>,
        profile: String,
        max_table_size: usize,
    },
    AsTheCrowFlies {
        speed_kmh: f64,
    },

    Custom {
        matrices: TravelMatrices,
    },
}

impl std::hash::Hash for TravelMatrixProvider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            // Hosts serve the same road network, they are not part of the key
            TravelMatrixProvider::Osrm { profile, .. } => {
                state.write_u8(0);
                profile.hash(state);
            }
            TravelMatrixProvider::AsTheCrowFlies { speed_kmh } => {
                state.write_u8(1);
                state.write_u64(speed_kmh.to_bits());
            }
            TravelMatrixProvider::Custom { matrices } => {
                state.write_u8(2);
                matrices.hash(state);
            }
        }
    }
}
