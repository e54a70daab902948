use geo::{Distance, Haversine};

use crate::travel_matrices::TravelMatrices;

pub fn as_the_crow_flies_matrices<P>(sources: &[P], targets: &[P], speed_kmh: f64) -> TravelMatrices
where
    for<'a> &'a P: Into<geo::Point>,
{
    let speed = speed_kmh / 3.6;
    let mut matrices = TravelMatrices::new(sources.len(), targets.len());

    for (i, from) in sources.iter().enumerate() {
        let from: geo::Point = from.into();
        for (j, to) in targets.iter().enumerate() {
            let to: geo::Point = to.into();
            let distance = Haversine.distance(from, to);
            matrices.set(i, j, distance, distance / speed);
        }
    }

    matrices
}
