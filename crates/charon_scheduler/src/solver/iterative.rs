//! Local re-optimisation of the customers a solution serves most expensively.
//!
//! Every customer gets a ratio between what it costs inside the solution and what
//! its route would cost on its own. Customers above a threshold are reviewed in
//! groups of neighbours in time: the duties around them are cut open, solved again
//! by the external solver and merged back when the result is not more expensive.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use fxhash::FxHashMap;
use jiff::SignedDuration;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    mosel::{
        export::subproblem_document,
        solution_io::{FormatError, load_partial_duties},
        writer::save_document,
    },
    problem::{
        customer::{CustomerIdx, RouteIdx},
        entity::Vertex,
        instance::Instance,
        trip::TripIdx,
    },
    solution::{evaluator::Evaluation, solution::Solution, validator::ValidationError},
    subproblem::{
        extractor::{SubproblemError, SubproblemParams, extract_subproblem},
        merge::{MergeError, merge_partial_solution},
    },
    taskgraph::graph::TaskGraph,
};

use super::external::{SolverError, SubproblemSolver};

/// Slack when comparing costs of two solutions.
const COST_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ImprovementError {
    #[error("Initial solution is invalid: {0}")]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Subproblem(#[from] SubproblemError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug)]
pub struct IterationParams {
    pub max_iterations: usize,
    /// Customers re-optimised together
    pub max_customers: usize,
    /// Customers with a lower cost ratio are left alone
    pub min_ratio: f64,
    /// Time distance to the worst customer within which others join it
    pub neighbourhood: SignedDuration,
    pub subproblem: SubproblemParams,
    /// Folder receiving the subproblem and partial solution files
    pub work_dir: PathBuf,
    /// Prefix of the files written to `work_dir`
    pub name: String,
    pub compress: bool,
}

impl Default for IterationParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_customers: 5,
            min_ratio: 2.0,
            neighbourhood: SignedDuration::from_hours(1),
            subproblem: SubproblemParams::default(),
            work_dir: std::env::temp_dir(),
            name: String::from("subproblem"),
            compress: false,
        }
    }
}

/// Cost of every route on its own: its fixed cost plus the cost of driving its trips.
pub fn estimated_costs(instance: &Instance) -> Vec<f64> {
    instance
        .routes()
        .iter()
        .enumerate()
        .map(|(route, data)| {
            instance.route_cost(RouteIdx::new(route))
                + data
                    .trips()
                    .iter()
                    .map(|&trip| instance.trip_cost(trip))
                    .sum::<f64>()
        })
        .collect()
}

/// Share of its duty each trip is responsible for.
///
/// A trip pays for itself, an equal part of the vehicle cost, half of the deadheads
/// around it, and a part of every refuel detour taken after it proportional to
/// the fuel it consumed since the previous refuel.
fn trip_costs(instance: &Instance, solution: &Solution) -> FxHashMap<TripIdx, f64> {
    let mut costs = FxHashMap::default();

    for (vehicle, duty) in solution.duties() {
        let trips = duty.trips().collect::<Vec<_>>();
        if trips.is_empty() {
            continue;
        }

        let vehicle_share = instance.coefficients().cost_per_vehicle / trips.len() as f64;
        for (i, &trip) in trips.iter().enumerate() {
            let previous = i
                .checked_sub(1)
                .map_or(Vertex::Vehicle(vehicle), |j| Vertex::Trip(trips[j]));
            let next = trips
                .get(i + 1)
                .map_or(0.0, |&next| instance.cost(trip, next));

            costs.insert(
                trip,
                instance.trip_cost(trip)
                    + vehicle_share
                    + (instance.cost(previous, trip) + next) / 2.0,
            );
        }

        let mut segment: Vec<TripIdx> = Vec::new();
        for hop in duty.hops(vehicle) {
            if let Some(refuel_point) = hop.refuel_point {
                let detour = (instance.cost(hop.from, refuel_point)
                    + instance.cost(refuel_point, hop.to)
                    - instance.cost(hop.from, hop.to))
                .max(0.0);

                let fuel = segment
                    .iter()
                    .map(|&trip| instance.trip_fuel(trip))
                    .sum::<f64>();
                if segment.is_empty() || fuel <= 0.0 {
                    *costs.entry(hop.to).or_default() += detour;
                } else {
                    for &trip in &segment {
                        *costs.entry(trip).or_default() +=
                            detour * instance.trip_fuel(trip) / fuel;
                    }
                }
                segment.clear();
            }
            segment.push(hop.to);
        }
    }

    costs
}

/// Cost of every customer inside `solution`: its selected route plus the shares of its trips.
pub fn improved_costs(
    instance: &Instance,
    solution: &Solution,
) -> Result<BTreeMap<CustomerIdx, f64>, ValidationError> {
    let costs = trip_costs(instance, solution);

    Ok(solution
        .selected_routes(instance)?
        .into_iter()
        .map(|(customer, route)| {
            let trips = instance
                .route(route)
                .trips()
                .iter()
                .map(|trip| costs.get(trip).copied().unwrap_or_default())
                .sum::<f64>();
            (customer, instance.route_cost(route) + trips)
        })
        .collect())
}

/// Improved over estimated cost of every customer.
pub fn cost_ratios(
    instance: &Instance,
    solution: &Solution,
) -> Result<BTreeMap<CustomerIdx, f64>, ValidationError> {
    let estimated = estimated_costs(instance);
    let selected = solution.selected_routes(instance)?;

    Ok(improved_costs(instance, solution)?
        .into_iter()
        .map(|(customer, improved)| {
            let estimate = selected
                .get(&customer)
                .map_or(0.0, |route| estimated[route.get()]);
            let ratio = if estimate > 0.0 {
                improved / estimate
            } else if improved > 0.0 {
                f64::INFINITY
            } else {
                1.0
            };
            (customer, ratio)
        })
        .collect())
}

fn ratio_of(ratios: &BTreeMap<CustomerIdx, f64>, customer: CustomerIdx) -> f64 {
    ratios.get(&customer).copied().unwrap_or_default()
}

fn highest_ratio(
    candidates: &BTreeSet<CustomerIdx>,
    ratios: &BTreeMap<CustomerIdx, f64>,
) -> Option<CustomerIdx> {
    candidates
        .iter()
        .copied()
        .max_by(|&a, &b| ratio_of(ratios, a).total_cmp(&ratio_of(ratios, b)))
}

/// Candidates around the worst one: those whose trips all start within
/// `neighbourhood` of its earliest trip, worst first.
pub fn critical_customers(
    instance: &Instance,
    candidates: &BTreeSet<CustomerIdx>,
    ratios: &BTreeMap<CustomerIdx, f64>,
    max_customers: usize,
    neighbourhood: SignedDuration,
) -> Vec<CustomerIdx> {
    let Some(worst) = highest_ratio(candidates, ratios) else {
        return Vec::new();
    };

    let time = instance.earliest_start(worst);
    let (low, high) = (
        time.saturating_sub(neighbourhood),
        time.saturating_add(neighbourhood),
    );

    let mut selected = candidates
        .iter()
        .copied()
        .filter(|&customer| {
            instance.earliest_start(customer) >= low && instance.latest_start(customer) <= high
        })
        .collect::<Vec<_>>();
    selected.sort_by(|&a, &b| ratio_of(ratios, b).total_cmp(&ratio_of(ratios, a)));
    selected.truncate(max_customers);

    selected
}

#[derive(Clone, Debug, Serialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Ids of the re-optimised customers
    pub customers: Vec<usize>,
    /// Evaluation of the merged solution, absent when it was invalid
    pub evaluation: Option<Evaluation>,
    pub accepted: bool,
}

pub struct ImprovementOutcome {
    pub solution: Solution,
    pub evaluation: Evaluation,
    pub history: Vec<IterationRecord>,
}

pub struct IterativeImprovement<'a, S> {
    instance: &'a Instance,
    graph: &'a TaskGraph,
    solver: S,
    params: IterationParams,
}

impl<'a, S> IterativeImprovement<'a, S>
where
    S: SubproblemSolver,
{
    /// `graph` must be the unsplit task graph of `instance`.
    pub fn new(
        instance: &'a Instance,
        graph: &'a TaskGraph,
        solver: S,
        params: IterationParams,
    ) -> Self {
        Self {
            instance,
            graph,
            solver,
            params,
        }
    }

    fn paths(&self, iteration: usize) -> (PathBuf, PathBuf) {
        let extension = if self.params.compress { "txt.gz" } else { "txt" };
        let name = &self.params.name;

        (
            self.params
                .work_dir
                .join(format!("{name}.{iteration}.hsp.{extension}")),
            self.params
                .work_dir
                .join(format!("{name}.{iteration}.hsp.solution.{extension}")),
        )
    }

    #[instrument(skip_all, level = "debug")]
    pub async fn run(&self, initial: Solution) -> Result<ImprovementOutcome, ImprovementError> {
        let instance = self.instance;
        initial.validate(instance)?;
        tokio::fs::create_dir_all(&self.params.work_dir).await?;

        let ratios = cost_ratios(instance, &initial)?;
        let mut reviewed = ratios
            .iter()
            .filter(|(_, ratio)| **ratio >= self.params.min_ratio)
            .map(|(customer, _)| *customer)
            .collect::<BTreeSet<_>>();
        info!(
            "Reviewing {} of {} customers",
            reviewed.len(),
            ratios.len()
        );

        let mut current = initial;
        let mut evaluation = current.evaluate_detailed(instance);
        let mut history = Vec::new();
        let mut iteration = 0;

        while !reviewed.is_empty() && iteration < self.params.max_iterations {
            let critical = critical_customers(
                instance,
                &reviewed,
                &ratios,
                self.params.max_customers,
                self.params.neighbourhood,
            );
            if critical.is_empty() {
                if let Some(worst) = highest_ratio(&reviewed, &ratios) {
                    warn!(
                        "Customer {} spans more than the neighbourhood, skipping it",
                        instance.customer(worst).id()
                    );
                    reviewed.remove(&worst);
                }
                continue;
            }

            iteration += 1;
            for customer in &critical {
                reviewed.remove(customer);
            }
            info!(
                "Iteration {}: customers {}, {} left",
                iteration,
                critical
                    .iter()
                    .map(|&customer| format!(
                        "{} ({:.1})",
                        instance.customer(customer).id(),
                        ratio_of(&ratios, customer)
                    ))
                    .collect::<Vec<_>>()
                    .join(", "),
                reviewed.len()
            );

            let subproblem = extract_subproblem(
                instance,
                self.graph,
                &current,
                &critical,
                &self.params.subproblem,
            )?;

            let (input, output) = self.paths(iteration);
            save_document(&input, &subproblem_document(instance, &subproblem))?;
            self.solver.solve(&input, &output).await?;

            let partial = load_partial_duties(&output, instance)?;
            let merged =
                merge_partial_solution(instance, &current, &partial, &subproblem.end_points)?;

            let (merged_evaluation, accepted) = match merged.validate(instance) {
                Ok(()) => {
                    let merged_evaluation = merged.evaluate_detailed(instance);
                    let accepted = merged_evaluation.cost <= evaluation.cost + COST_TOLERANCE;
                    (Some(merged_evaluation), accepted)
                }
                Err(error) => {
                    warn!("Merged solution is invalid: {error}");
                    (None, false)
                }
            };

            if let (true, Some(merged_evaluation)) = (accepted, merged_evaluation) {
                info!(
                    "Accepted: cost {:.1} -> {:.1}, vehicles {} -> {}",
                    evaluation.cost,
                    merged_evaluation.cost,
                    evaluation.vehicles_used,
                    merged_evaluation.vehicles_used
                );
                current = merged;
                evaluation = merged_evaluation;
            } else {
                debug!("Rejected iteration {}", iteration);
            }

            history.push(IterationRecord {
                iteration,
                customers: critical
                    .iter()
                    .map(|&customer| instance.customer(customer).id())
                    .collect(),
                evaluation: merged_evaluation,
                accepted,
            });
        }

        Ok(ImprovementOutcome {
            solution: current,
            evaluation,
            history,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        problem::{refuel_point::RefuelPointIdx, vehicle::VehicleIdx},
        solution::duty::{Duty, DutyStop},
        taskgraph::builder::{TaskGraphParams, build_taskgraph},
        test_utils,
    };

    fn duty(stops: &[DutyStop]) -> Duty {
        Duty::new(stops.to_vec())
    }

    fn trip(index: usize) -> DutyStop {
        DutyStop::Trip(TripIdx::new(index))
    }

    #[test]
    fn test_ratios_charge_half_of_the_deadheads() {
        let instance = test_utils::create_chain_instance(3, 0);
        let solution = Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            duty(&[trip(0), trip(1), trip(2)]),
        )]));

        let ratios = cost_ratios(&instance, &solution).unwrap();
        let customer = |i| instance.customer_of(TripIdx::new(i));

        // Trips cost 5 on their own, deadheads between them 5.
        assert!((ratios[&customer(0)] - 1.5).abs() < 1e-9);
        assert!((ratios[&customer(1)] - 2.0).abs() < 1e-9);
        assert!((ratios[&customer(2)] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_refuel_detour_is_charged_to_previous_trips() {
        let instance = test_utils::create_chain_instance(2, 1);
        let direct = Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            duty(&[trip(0), trip(1)]),
        )]));
        let refuel = Solution::new(BTreeMap::from([(
            VehicleIdx::new(0),
            duty(&[
                trip(0),
                DutyStop::RefuelPoint(RefuelPointIdx::new(0)),
                trip(1),
            ]),
        )]));

        let first = instance.customer_of(TripIdx::new(0));
        let second = instance.customer_of(TripIdx::new(1));
        let direct_costs = improved_costs(&instance, &direct).unwrap();
        let refuel_costs = improved_costs(&instance, &refuel).unwrap();

        let refuel_point = RefuelPointIdx::new(0);
        let detour = instance.cost(TripIdx::new(0), refuel_point)
            + instance.cost(refuel_point, TripIdx::new(1))
            - instance.cost(TripIdx::new(0), TripIdx::new(1));

        assert!(detour > 0.0);
        assert!((refuel_costs[&first] - direct_costs[&first] - detour).abs() < 1e-9);
        assert!((refuel_costs[&second] - direct_costs[&second]).abs() < 1e-9);
    }

    #[test]
    fn test_critical_customers_around_worst() {
        // Trips start at 08:00, 09:00, ..., 12:00.
        let instance = test_utils::create_chain_instance(5, 0);
        let customers = (0..5)
            .map(|i| instance.customer_of(TripIdx::new(i)))
            .collect::<Vec<_>>();
        let ratios = customers
            .iter()
            .copied()
            .zip([1.0, 3.0, 2.5, 2.0, 5.0])
            .collect::<BTreeMap<_, _>>();
        let candidates = customers.iter().copied().collect::<BTreeSet<_>>();

        let critical = critical_customers(
            &instance,
            &candidates,
            &ratios,
            5,
            SignedDuration::from_hours(1),
        );
        assert_eq!(critical, vec![customers[4], customers[3]]);

        let critical = critical_customers(
            &instance,
            &candidates,
            &ratios,
            1,
            SignedDuration::from_hours(1),
        );
        assert_eq!(critical, vec![customers[4]]);

        assert!(
            critical_customers(
                &instance,
                &BTreeSet::new(),
                &ratios,
                5,
                SignedDuration::from_hours(1)
            )
            .is_empty()
        );
    }

    /// Writes a fixed partial solution whatever the subproblem.
    struct FixedSolver {
        content: String,
    }

    impl SubproblemSolver for FixedSolver {
        async fn solve(&self, input: &Path, output: &Path) -> Result<(), SolverError> {
            assert!(input.exists());
            std::fs::write(output, &self.content).map_err(|source| SolverError::Spawn {
                program: String::from("fixed"),
                source,
            })
        }
    }

    fn work_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("charon-iterative-{}-{}", std::process::id(), name))
    }

    fn two_vehicle_setup() -> (Instance, Solution) {
        let instance = test_utils::create_test_instance(
            2,
            vec![
                test_utils::TestTrip::new(0, 30, 5000.0),
                test_utils::TestTrip::new(60, 30, 5000.0),
            ],
            vec![],
        );
        let solution = Solution::new(BTreeMap::from([
            (VehicleIdx::new(0), duty(&[trip(0), trip(1)])),
            (VehicleIdx::new(1), Duty::default()),
        ]));

        (instance, solution)
    }

    fn params(name: &str) -> IterationParams {
        IterationParams {
            max_iterations: 1,
            min_ratio: 0.0,
            work_dir: work_dir(name),
            ..IterationParams::default()
        }
    }

    #[tokio::test]
    async fn test_cheaper_partial_solution_is_accepted() {
        let (instance, initial) = two_vehicle_setup();
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let content = format!(
            "Duties: [\n\t(\"{}\") [\"{}\"]\n\t(\"{}\") [\"{}\"]\n]\n",
            instance.identity(VehicleIdx::new(0)),
            instance.identity(TripIdx::new(0)),
            instance.identity(VehicleIdx::new(1)),
            instance.identity(TripIdx::new(1)),
        );
        let params = params("accept");
        let work_dir = params.work_dir.clone();

        let outcome = IterativeImprovement::new(&instance, &graph, FixedSolver { content }, params)
            .run(initial.clone())
            .await
            .unwrap();
        std::fs::remove_dir_all(work_dir).unwrap();

        assert_eq!(outcome.history.len(), 1);
        assert!(outcome.history[0].accepted);
        assert!(outcome.evaluation.cost < initial.evaluate(&instance));
        assert_eq!(
            outcome.solution.duty(VehicleIdx::new(1)).unwrap().stops(),
            &[trip(1)]
        );
    }

    #[tokio::test]
    async fn test_invalid_partial_solution_is_rejected() {
        let (instance, initial) = two_vehicle_setup();
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let content = format!(
            "Duties: [(\"{}\") [\"{}\"]]\n",
            instance.identity(VehicleIdx::new(0)),
            instance.identity(TripIdx::new(0)),
        );
        let params = params("reject");
        let work_dir = params.work_dir.clone();

        let outcome = IterativeImprovement::new(&instance, &graph, FixedSolver { content }, params)
            .run(initial.clone())
            .await
            .unwrap();
        std::fs::remove_dir_all(work_dir).unwrap();

        assert_eq!(outcome.history.len(), 1);
        assert!(!outcome.history[0].accepted);
        assert!(outcome.history[0].evaluation.is_none());
        assert_eq!(outcome.solution, initial);
    }

    #[tokio::test]
    async fn test_missing_work_dir_is_created() {
        let (instance, initial) = two_vehicle_setup();
        let graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let root = work_dir("nested");
        let params = IterationParams {
            work_dir: root.join("runs").join("first"),
            ..params("nested")
        };
        let content = format!(
            "Duties: [(\"{}\") [\"{}\"]]\n",
            instance.identity(VehicleIdx::new(0)),
            instance.identity(TripIdx::new(0)),
        );
        let (input, _) = IterativeImprovement::new(
            &instance,
            &graph,
            FixedSolver {
                content: content.clone(),
            },
            params.clone(),
        )
        .paths(1);

        IterativeImprovement::new(&instance, &graph, FixedSolver { content }, params)
            .run(initial)
            .await
            .unwrap();

        assert!(input.exists());
        std::fs::remove_dir_all(root).unwrap();
    }
}
