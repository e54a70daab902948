use jiff::{SignedDuration, civil::DateTime};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::problem::{
    customer::{CustomerIdx, RouteIdx},
    entity::Scheduled,
    instance::Instance,
    splitpoint::{Splitpoint, SplitpointIdx},
    trip::TripIdx,
};

use super::{
    edge::EdgeAttributes,
    graph::TaskGraph,
    node::Node,
};

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Cut times must be strictly increasing, {0} follows {1}")]
    UnorderedCuts(DateTime, DateTime),

    #[error("Split length must be positive, got {0}")]
    InvalidLength(SignedDuration),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitPolicy {
    /// A trip is cut off by its own start time.
    #[default]
    ByTime,
    /// A trip is cut off by the earliest start of its customer's trips.
    ByCustomer,
}

impl SplitPolicy {
    fn key(&self, instance: &Instance, trip: TripIdx) -> DateTime {
        match self {
            SplitPolicy::ByTime => instance.trip(trip).start_time(),
            SplitPolicy::ByCustomer => instance.earliest_start(instance.customer_of(trip)),
        }
    }
}

/// One time slice of a split graph.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitInterval {
    /// Cut closing the interval, or the instance end for the last one
    pub end: DateTime,
    /// Splitpoints created at `end`
    pub splitpoints: Vec<SplitpointIdx>,
    /// Trips assigned to the interval
    pub trips: Vec<TripIdx>,
    /// Customers whose last trip falls in the interval
    pub closed_customers: Vec<CustomerIdx>,
    /// Routes whose last trip falls in the interval
    pub closed_routes: Vec<RouteIdx>,
}

/// Cuts at `start + k * length` for every `k >= 1` strictly before `end`.
pub fn split_times(
    start: DateTime,
    length: SignedDuration,
    end: DateTime,
) -> Result<Vec<DateTime>, SplitError> {
    if length <= SignedDuration::ZERO {
        return Err(SplitError::InvalidLength(length));
    }

    let mut cuts = Vec::new();
    let mut current = start;
    while let Ok(next) = current.checked_add(length) {
        if next >= end {
            break;
        }
        cuts.push(next);
        current = next;
    }

    Ok(cuts)
}

/// Token of the splitpoint placed in front of `endpoint` by cut number `cut`.
pub fn splitpoint_token(endpoint: &str, cut: usize) -> String {
    format!("Split{}_{}", endpoint, cut + 1)
}

/// Redirects every edge `s -> e` with `s` in `startpoints` through a new splitpoint in front of `e`.
fn split_single(
    graph: &mut TaskGraph,
    instance: &Instance,
    startpoints: &[Node],
    endpoints: &[TripIdx],
    time: DateTime,
    cut: usize,
) -> Vec<SplitpointIdx> {
    let mut splitpoints = Vec::with_capacity(endpoints.len());

    for &endpoint in endpoints {
        let token = splitpoint_token(&instance.identity(endpoint), cut);
        let splitpoint = graph.add_splitpoint(Splitpoint::new(token, time, endpoint, cut));
        let splitpoint_node = Node::Splitpoint(splitpoint);

        graph.add_edge(splitpoint_node, Node::Trip(endpoint), EdgeAttributes::ZERO);

        for &startpoint in startpoints {
            if let Some(attributes) = graph.remove_edge(startpoint, Node::Trip(endpoint)) {
                graph.add_edge(startpoint, splitpoint_node, attributes);
            }
        }

        splitpoints.push(splitpoint);
    }

    splitpoints
}

/// Splits `graph` in place at every cut and returns one interval per cut plus a last one.
///
/// The graph before the split is not kept; clone it first when both are needed.
#[instrument(skip_all, level = "debug")]
pub fn split_taskgraph(
    graph: &mut TaskGraph,
    instance: &Instance,
    cuts: &[DateTime],
    policy: SplitPolicy,
) -> Result<Vec<SplitInterval>, SplitError> {
    for pair in cuts.windows(2) {
        if pair[1] <= pair[0] {
            return Err(SplitError::UnorderedCuts(pair[1], pair[0]));
        }
    }

    let mut startpoints = instance
        .vehicle_indices()
        .map(Node::Vehicle)
        .collect::<Vec<_>>();
    let mut remaining = instance.trip_indices().collect::<Vec<_>>();
    let mut intervals = Vec::with_capacity(cuts.len() + 1);

    for (cut, &time) in cuts.iter().enumerate() {
        let (closed, open): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|&trip| policy.key(instance, trip) < time);

        startpoints.extend(closed.iter().map(|&trip| Node::Trip(trip)));
        let splitpoints = split_single(graph, instance, &startpoints, &open, time, cut);
        startpoints.extend(splitpoints.iter().map(|&splitpoint| Node::Splitpoint(splitpoint)));

        debug!(
            "Cut {} at {}: {} trips closed, {} splitpoints",
            cut + 1,
            time,
            closed.len(),
            splitpoints.len()
        );

        intervals.push(SplitInterval {
            end: time,
            splitpoints,
            trips: closed,
            closed_customers: Vec::new(),
            closed_routes: Vec::new(),
        });
        remaining = open;
    }

    let end = instance
        .horizon()
        .map(|(_, finish)| finish)
        .or(cuts.last().copied())
        .unwrap_or(DateTime::MAX);
    intervals.push(SplitInterval {
        end,
        splitpoints: Vec::new(),
        trips: remaining,
        closed_customers: Vec::new(),
        closed_routes: Vec::new(),
    });

    assign_closed(instance, &mut intervals);

    info!(
        "Split task graph into {} intervals with {} splitpoints",
        intervals.len(),
        graph.splitpoints().len()
    );

    Ok(intervals)
}

/// A route or customer is closed by the interval holding its last trip.
fn assign_closed(instance: &Instance, intervals: &mut [SplitInterval]) {
    let mut interval_of = vec![0; instance.trips().len()];
    for (index, interval) in intervals.iter().enumerate() {
        for trip in &interval.trips {
            interval_of[trip.get()] = index;
        }
    }

    for (route_idx, route) in instance.routes().iter().enumerate() {
        if let Some(last) = route.trips().iter().map(|trip| interval_of[trip.get()]).max() {
            intervals[last].closed_routes.push(RouteIdx::new(route_idx));
        }
    }

    for customer in instance.customer_indices() {
        let last = instance
            .customer(customer)
            .routes()
            .iter()
            .flat_map(|&route| instance.route(route).trips())
            .map(|trip| interval_of[trip.get()])
            .max();
        if let Some(last) = last {
            intervals[last].closed_customers.push(customer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        problem::entity::Identified,
        taskgraph::builder::{TaskGraphParams, build_taskgraph},
        test_utils,
    };

    fn datetime(value: &str) -> DateTime {
        value.parse().unwrap()
    }

    #[test]
    fn test_split_times() {
        let cuts = split_times(
            datetime("2015-10-01T08:00:00"),
            SignedDuration::from_hours(1),
            datetime("2015-10-01T11:00:00"),
        )
        .unwrap();

        assert_eq!(
            cuts,
            vec![
                datetime("2015-10-01T09:00:00"),
                datetime("2015-10-01T10:00:00")
            ]
        );
        assert!(
            split_times(
                datetime("2015-10-01T08:00:00"),
                SignedDuration::ZERO,
                datetime("2015-10-01T11:00:00")
            )
            .is_err()
        );
    }

    #[test]
    fn test_split_redirects_edges() {
        let instance = test_utils::create_chain_instance(4, 0);
        let mut graph = build_taskgraph(&instance, &TaskGraphParams::default());
        let original = graph.clone();

        // Trips start at 08:00, 09:00, 10:00 and 11:00.
        let intervals = split_taskgraph(
            &mut graph,
            &instance,
            &[datetime("2015-10-01T09:30:00")],
            SplitPolicy::ByTime,
        )
        .unwrap();

        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[0].trips, vec![TripIdx::new(0), TripIdx::new(1)]);
        assert_eq!(intervals[1].trips, vec![TripIdx::new(2), TripIdx::new(3)]);
        assert_eq!(intervals[0].splitpoints.len(), 2);

        let splitpoint = intervals[0].splitpoints[0];
        let endpoint = graph.splitpoint(splitpoint).successor();
        assert_eq!(
            graph.splitpoint(splitpoint).identity(),
            format!("Split{}_1", instance.identity(endpoint))
        );

        let first = Node::Trip(TripIdx::new(0));
        assert!(!graph.has_edge(first, Node::Trip(endpoint)));
        assert_eq!(
            graph.edge(first, Node::Splitpoint(splitpoint)),
            original.edge(first, Node::Trip(endpoint))
        );
        assert_eq!(
            graph.edge(Node::Splitpoint(splitpoint), Node::Trip(endpoint)),
            Some(&EdgeAttributes::ZERO)
        );
        assert!(graph.is_acyclic());
    }

    #[test]
    fn test_splitpoints_chain_across_cuts() {
        let instance = test_utils::create_chain_instance(3, 0);
        let mut graph = build_taskgraph(&instance, &TaskGraphParams::default());

        let intervals = split_taskgraph(
            &mut graph,
            &instance,
            &[
                datetime("2015-10-01T08:30:00"),
                datetime("2015-10-01T09:30:00"),
            ],
            SplitPolicy::ByTime,
        )
        .unwrap();

        let last_trip = Node::Trip(TripIdx::new(2));
        let first_cut = intervals[0]
            .splitpoints
            .iter()
            .find(|&&p| graph.splitpoint(p).successor() == TripIdx::new(2))
            .copied()
            .unwrap();
        let second_cut = intervals[1]
            .splitpoints
            .iter()
            .find(|&&p| graph.splitpoint(p).successor() == TripIdx::new(2))
            .copied()
            .unwrap();

        assert!(graph.has_edge(Node::Splitpoint(first_cut), Node::Splitpoint(second_cut)));
        assert!(!graph.has_edge(Node::Splitpoint(first_cut), last_trip));
        assert!(graph.has_edge(Node::Splitpoint(second_cut), last_trip));
        assert_eq!(intervals[2].closed_customers.len(), 1);
    }

    #[test]
    fn test_unordered_cuts_are_rejected() {
        let instance = test_utils::create_chain_instance(2, 0);
        let mut graph = build_taskgraph(&instance, &TaskGraphParams::default());

        assert!(
            split_taskgraph(
                &mut graph,
                &instance,
                &[
                    datetime("2015-10-01T09:30:00"),
                    datetime("2015-10-01T08:30:00"),
                ],
                SplitPolicy::ByCustomer,
            )
            .is_err()
        );
    }
}
