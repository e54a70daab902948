mod setup;

use charon_scheduler::{
    pareto::{ParetoParams, ParetoStrategy, ParetoTable},
    taskgraph::builder::{TaskGraphParams, build_taskgraph},
    utils::threads::Threads,
};
use proptest::prelude::*;

use setup::{CityParams, create_city_instance};

prop_compose! {
    fn city_params()
    (
        num_vehicles in 1..4usize,
        num_trips in 1..25usize,
        num_refuel_points in 0..8usize,
        seed in any::<u64>(),
    ) -> CityParams {
        CityParams {
            num_vehicles,
            num_trips,
            num_refuel_points,
            seed,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn dense_and_sparse_frontiers_agree(params in city_params()) {
        let instance = create_city_instance(&params);

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

        prop_assert_eq!(dense, sparse);
    }

    #[test]
    fn build_does_not_depend_on_chunking(params in city_params(), chunk_size in 1..10usize) {
        let instance = create_city_instance(&params);

        let single = build_taskgraph(
            &instance,
            &TaskGraphParams {
                threads: Threads::Single,
                chunk_size: 1000,
                ..TaskGraphParams::default()
            },
        );
        let chunked = build_taskgraph(
            &instance,
            &TaskGraphParams {
                threads: Threads::Multi(3),
                chunk_size,
                ..TaskGraphParams::default()
            },
        );

        prop_assert_eq!(
            single.edges().collect::<Vec<_>>(),
            chunked.edges().collect::<Vec<_>>()
        );
    }
}
