use std::sync::OnceLock;

use fxhash::FxHashMap;
use jiff::{SignedDuration, civil::DateTime};
use rand::{Rng, seq::index::sample};
use thiserror::Error;
use tracing::debug;

use crate::{
    pareto::{ParetoParams, ParetoTable},
    utils::time::{duration_from_seconds, seconds_between},
};

use super::{
    coefficients::Coefficients,
    customer::{Customer, CustomerIdx, Route, RouteIdx},
    entity::{Entity, Identified, Located, Scheduled, Vertex},
    point::Point,
    refuel_point::{RefuelPoint, RefuelPointIdx},
    travel_matrix::TravelMatrix,
    trip::{Trip, TripIdx},
    vehicle::{Vehicle, VehicleIdx},
};

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("Instance has no travel matrix")]
    MissingTravelMatrix,

    #[error("Travel matrix has size {actual}, expected {expected}")]
    TravelMatrixSize { expected: usize, actual: usize },

    #[error("Pareto table covers {actual:?} pairs, expected {expected:?}")]
    ParetoTableSize {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Identity {0} is used by more than one entity")]
    DuplicateIdentity(String),

    #[error("Customer {0} has no route")]
    CustomerWithoutRoute(usize),

    #[error("Route {0} has no trip")]
    RouteWithoutTrip(usize),

    #[error("Fuel per meter must be positive, got {0}")]
    InvalidFuelPerMeter(f64),

    #[error("Unknown {kind} {index}")]
    UnknownIndex { kind: &'static str, index: usize },
}

/// Maps identity tokens back to the entities of one instance.
#[derive(Clone, Debug, Default)]
pub struct IdentityDictionary {
    entities: FxHashMap<String, Entity>,
}

impl IdentityDictionary {
    pub fn resolve(&self, token: &str) -> Option<Entity> {
        self.entities.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Points used to query the travel matrix of an instance.
pub struct ExtendedLocations {
    /// Row locations: where vehicles leave each extended vertex
    pub departures: Vec<Point>,
    /// Column locations: where vehicles must be to visit each extended vertex
    pub arrivals: Vec<Point>,
}

pub struct Instance {
    name: Option<String>,
    coefficients: Coefficients,
    vehicles: Vec<Vehicle>,
    trips: Vec<Trip>,
    refuel_points: Vec<RefuelPoint>,
    customers: Vec<Customer>,
    routes: Vec<Route>,
    trip_routes: Vec<RouteIdx>,
    travel_matrix: TravelMatrix,
    pareto: OnceLock<ParetoTable>,
}

impl Instance {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn coefficients(&self) -> &Coefficients {
        &self.coefficients
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn refuel_points(&self) -> &[RefuelPoint] {
        &self.refuel_points
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn vehicle(&self, vehicle: VehicleIdx) -> &Vehicle {
        &self.vehicles[vehicle]
    }

    pub fn trip(&self, trip: TripIdx) -> &Trip {
        &self.trips[trip]
    }

    pub fn refuel_point(&self, refuel_point: RefuelPointIdx) -> &RefuelPoint {
        &self.refuel_points[refuel_point]
    }

    pub fn customer(&self, customer: CustomerIdx) -> &Customer {
        &self.customers[customer]
    }

    pub fn route(&self, route: RouteIdx) -> &Route {
        &self.routes[route]
    }

    pub fn travel_matrix(&self) -> &TravelMatrix {
        &self.travel_matrix
    }

    pub fn vehicle_indices(&self) -> impl DoubleEndedIterator<Item = VehicleIdx> + Clone + use<> {
        VehicleIdx::range(self.vehicles.len())
    }

    pub fn trip_indices(&self) -> impl DoubleEndedIterator<Item = TripIdx> + Clone + use<> {
        TripIdx::range(self.trips.len())
    }

    pub fn refuel_point_indices(
        &self,
    ) -> impl DoubleEndedIterator<Item = RefuelPointIdx> + Clone + use<> {
        RefuelPointIdx::range(self.refuel_points.len())
    }

    pub fn customer_indices(&self) -> impl DoubleEndedIterator<Item = CustomerIdx> + Clone + use<> {
        CustomerIdx::range(self.customers.len())
    }

    /// Vehicles followed by trips.
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + Clone + use<> {
        self.vehicle_indices()
            .map(Vertex::Vehicle)
            .chain(self.trip_indices().map(Vertex::Trip))
    }

    pub fn num_vertices(&self) -> usize {
        self.vehicles.len() + self.trips.len()
    }

    pub fn num_extended_vertices(&self) -> usize {
        self.num_vertices() + self.refuel_points.len()
    }

    /// Position in `[vehicles, trips]`.
    #[inline]
    pub fn vertex_index(&self, vertex: Vertex) -> usize {
        match vertex {
            Vertex::Vehicle(vehicle) => vehicle.get(),
            Vertex::Trip(trip) => self.vehicles.len() + trip.get(),
        }
    }

    pub fn vertex_at(&self, index: usize) -> Option<Vertex> {
        if index < self.vehicles.len() {
            Some(Vertex::Vehicle(VehicleIdx::new(index)))
        } else if index < self.num_vertices() {
            Some(Vertex::Trip(TripIdx::new(index - self.vehicles.len())))
        } else {
            None
        }
    }

    /// Position in `[vehicles, trips, refuel points]`, the travel matrix index.
    #[inline]
    pub fn extended_index(&self, entity: Entity) -> usize {
        match entity {
            Entity::Vehicle(vehicle) => vehicle.get(),
            Entity::Trip(trip) => self.vehicles.len() + trip.get(),
            Entity::RefuelPoint(refuel_point) => {
                self.vehicles.len() + self.trips.len() + refuel_point.get()
            }
        }
    }

    /// Meters driven from `from` to `to`.
    #[inline]
    pub fn distance(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> f64 {
        self.travel_matrix.distance(
            self.extended_index(from.into()),
            self.extended_index(to.into()),
        )
    }

    /// Seconds driven from `from` to `to`.
    #[inline]
    pub fn time(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> f64 {
        self.travel_matrix
            .time(self.extended_index(from.into()), self.extended_index(to.into()))
    }

    pub fn travel_duration(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> SignedDuration {
        duration_from_seconds(self.time(from, to))
    }

    /// Tank fraction consumed from `from` to `to`.
    #[inline]
    pub fn fuel(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> f64 {
        self.distance(from, to) * self.coefficients.fuel_per_meter
    }

    /// Distance cost from `from` to `to`.
    #[inline]
    pub fn cost(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> f64 {
        self.distance(from, to) * self.coefficients.cost_per_meter
    }

    /// Distance cost plus the vehicle cost when leaving the vehicle itself.
    pub fn deadhead_cost(&self, from: impl Into<Entity>, to: impl Into<Entity>) -> f64 {
        let from = from.into();
        let vehicle_cost = match from {
            Entity::Vehicle(_) => self.coefficients.cost_per_vehicle,
            _ => 0.0,
        };

        self.cost(from, to) + vehicle_cost
    }

    pub fn trip_fuel(&self, trip: TripIdx) -> f64 {
        self.trips[trip].distance() * self.coefficients.fuel_per_meter
    }

    pub fn trip_cost(&self, trip: TripIdx) -> f64 {
        self.trips[trip].distance() * self.coefficients.cost_per_meter
    }

    pub fn max_range(&self) -> f64 {
        self.coefficients.max_range()
    }

    pub fn route_of(&self, trip: TripIdx) -> RouteIdx {
        self.trip_routes[trip.get()]
    }

    pub fn customer_of(&self, trip: TripIdx) -> CustomerIdx {
        self.routes[self.route_of(trip)].customer
    }

    pub fn route_cost(&self, route: RouteIdx) -> f64 {
        self.routes[route].cost
    }

    fn customer_trip_starts(&self, customer: CustomerIdx) -> impl Iterator<Item = DateTime> + '_ {
        self.customers[customer]
            .routes
            .iter()
            .flat_map(|&route| self.routes[route].trips.iter())
            .map(|&trip| self.trips[trip].start_time())
    }

    /// Earliest start among all trips of all routes of `customer`.
    pub fn earliest_start(&self, customer: CustomerIdx) -> DateTime {
        self.customer_trip_starts(customer)
            .min()
            .unwrap_or(DateTime::MAX)
    }

    /// Latest start among all trips of all routes of `customer`.
    pub fn latest_start(&self, customer: CustomerIdx) -> DateTime {
        self.customer_trip_starts(customer)
            .max()
            .unwrap_or(DateTime::MIN)
    }

    pub fn start_time(&self, vertex: Vertex) -> DateTime {
        match vertex {
            Vertex::Vehicle(vehicle) => self.vehicles[vehicle].start_time(),
            Vertex::Trip(trip) => self.trips[trip].start_time(),
        }
    }

    pub fn finish_time(&self, vertex: Vertex) -> DateTime {
        match vertex {
            Vertex::Vehicle(vehicle) => self.vehicles[vehicle].finish_time(),
            Vertex::Trip(trip) => self.trips[trip].finish_time(),
        }
    }

    /// Seconds between the end of `from` and the start of `to`.
    #[inline]
    pub fn slack(&self, from: Vertex, to: TripIdx) -> f64 {
        seconds_between(self.finish_time(from), self.trips[to].start_time())
    }

    /// First vehicle or trip start, and last trip finish.
    pub fn horizon(&self) -> Option<(DateTime, DateTime)> {
        let start = self
            .vehicles
            .iter()
            .map(|vehicle| vehicle.start_time())
            .chain(self.trips.iter().map(|trip| trip.start_time()))
            .min()?;
        let finish = self
            .trips
            .iter()
            .map(|trip| trip.finish_time())
            .chain(self.vehicles.iter().map(|vehicle| vehicle.finish_time()))
            .max()?;

        Some((start, finish))
    }

    pub fn identity(&self, entity: impl Into<Entity>) -> String {
        match entity.into() {
            Entity::Vehicle(vehicle) => self.vehicles[vehicle].identity(),
            Entity::Trip(trip) => self.trips[trip].identity(),
            Entity::RefuelPoint(refuel_point) => self.refuel_points[refuel_point].identity(),
        }
    }

    pub fn dictionary(&self) -> IdentityDictionary {
        let mut entities = FxHashMap::default();
        for vehicle in self.vehicle_indices() {
            entities.insert(self.identity(vehicle), Entity::Vehicle(vehicle));
        }
        for trip in self.trip_indices() {
            entities.insert(self.identity(trip), Entity::Trip(trip));
        }
        for refuel_point in self.refuel_point_indices() {
            entities.insert(self.identity(refuel_point), Entity::RefuelPoint(refuel_point));
        }

        IdentityDictionary { entities }
    }

    /// Frontier table, computed on first use.
    pub fn pareto_table(&self, params: &ParetoParams) -> &ParetoTable {
        self.pareto
            .get_or_init(|| ParetoTable::compute(self, params))
    }

    pub fn cached_pareto_table(&self) -> Option<&ParetoTable> {
        self.pareto.get()
    }

    /// Keeps the given vehicles, customers and refuel points. The frontier table is dropped.
    pub fn subinstance(
        &self,
        vehicles: &[VehicleIdx],
        customers: &[CustomerIdx],
        refuel_points: &[RefuelPointIdx],
    ) -> Result<Instance, InstanceError> {
        let mut kept_customers = customers.to_vec();
        kept_customers.sort();
        kept_customers.dedup();

        for &vehicle in vehicles {
            if vehicle.get() >= self.vehicles.len() {
                return Err(InstanceError::UnknownIndex {
                    kind: "vehicle",
                    index: vehicle.get(),
                });
            }
        }
        for &customer in &kept_customers {
            if customer.get() >= self.customers.len() {
                return Err(InstanceError::UnknownIndex {
                    kind: "customer",
                    index: customer.get(),
                });
            }
        }
        for &refuel_point in refuel_points {
            if refuel_point.get() >= self.refuel_points.len() {
                return Err(InstanceError::UnknownIndex {
                    kind: "refuel point",
                    index: refuel_point.get(),
                });
            }
        }

        let mut trip_map: FxHashMap<TripIdx, TripIdx> = FxHashMap::default();
        let kept_trips = self
            .trip_indices()
            .filter(|&trip| kept_customers.binary_search(&self.customer_of(trip)).is_ok())
            .collect::<Vec<_>>();
        for (new, &old) in kept_trips.iter().enumerate() {
            trip_map.insert(old, TripIdx::new(new));
        }

        let mut routes = Vec::new();
        let mut new_customers = Vec::with_capacity(kept_customers.len());
        for (new_customer, &customer) in kept_customers.iter().enumerate() {
            let mut customer_routes = Vec::new();
            for &route in &self.customers[customer].routes {
                let route = &self.routes[route];
                customer_routes.push(RouteIdx::new(routes.len()));
                routes.push(Route {
                    id: route.id,
                    cost: route.cost,
                    customer: CustomerIdx::new(new_customer),
                    trips: route.trips.iter().map(|trip| trip_map[trip]).collect(),
                });
            }
            new_customers.push(Customer {
                id: self.customers[customer].id,
                routes: customer_routes,
            });
        }

        let mut trip_routes = vec![RouteIdx::default(); kept_trips.len()];
        for (route_idx, route) in routes.iter().enumerate() {
            for &trip in &route.trips {
                trip_routes[trip.get()] = RouteIdx::new(route_idx);
            }
        }

        let indices = vehicles
            .iter()
            .map(|&vehicle| self.extended_index(vehicle.into()))
            .chain(kept_trips.iter().map(|&trip| self.extended_index(trip.into())))
            .chain(
                refuel_points
                    .iter()
                    .map(|&refuel_point| self.extended_index(refuel_point.into())),
            )
            .collect::<Vec<_>>();

        debug!(
            "Subinstance with {} vehicles, {} customers, {} trips, {} refuel points",
            vehicles.len(),
            new_customers.len(),
            kept_trips.len(),
            refuel_points.len()
        );

        Ok(Instance {
            name: self.name.clone(),
            coefficients: self.coefficients,
            vehicles: vehicles.iter().map(|&v| self.vehicles[v].clone()).collect(),
            trips: kept_trips.iter().map(|&t| self.trips[t].clone()).collect(),
            refuel_points: refuel_points
                .iter()
                .map(|&r| self.refuel_points[r].clone())
                .collect(),
            customers: new_customers,
            routes,
            trip_routes,
            travel_matrix: self.travel_matrix.restrict(&indices),
            pareto: OnceLock::new(),
        })
    }

    /// Random subinstance keeping `round(fraction * len)` of each entity kind.
    pub fn sample_subinstance<R: Rng + ?Sized>(
        &self,
        fraction: f64,
        rng: &mut R,
    ) -> Result<Instance, InstanceError> {
        let fraction = fraction.clamp(0.0, 1.0);
        let amount = |len: usize| ((fraction * len as f64).round() as usize).min(len);

        let mut vehicles = sample(rng, self.vehicles.len(), amount(self.vehicles.len()))
            .into_iter()
            .map(VehicleIdx::new)
            .collect::<Vec<_>>();
        vehicles.sort();
        let customers = sample(rng, self.customers.len(), amount(self.customers.len()))
            .into_iter()
            .map(CustomerIdx::new)
            .collect::<Vec<_>>();
        let mut refuel_points = sample(
            rng,
            self.refuel_points.len(),
            amount(self.refuel_points.len()),
        )
        .into_iter()
        .map(RefuelPointIdx::new)
        .collect::<Vec<_>>();
        refuel_points.sort();

        self.subinstance(&vehicles, &customers, &refuel_points)
    }
}

pub struct RouteInput {
    pub id: usize,
    pub cost: f64,
    pub trips: Vec<Trip>,
}

pub struct CustomerInput {
    pub id: usize,
    pub routes: Vec<RouteInput>,
}

#[derive(Default)]
pub struct InstanceBuilder {
    name: Option<String>,
    coefficients: Coefficients,
    vehicles: Vec<Vehicle>,
    refuel_points: Vec<RefuelPoint>,
    customers: Vec<CustomerInput>,
    travel_matrix: Option<TravelMatrix>,
    pareto: Option<ParetoTable>,
}

impl InstanceBuilder {
    pub fn set_name(&mut self, name: String) -> &mut InstanceBuilder {
        self.name = Some(name);
        self
    }

    pub fn set_coefficients(&mut self, coefficients: Coefficients) -> &mut InstanceBuilder {
        self.coefficients = coefficients;
        self
    }

    pub fn set_vehicles(&mut self, vehicles: Vec<Vehicle>) -> &mut InstanceBuilder {
        self.vehicles = vehicles;
        self
    }

    pub fn add_vehicle(&mut self, vehicle: Vehicle) -> &mut InstanceBuilder {
        self.vehicles.push(vehicle);
        self
    }

    pub fn set_refuel_points(&mut self, refuel_points: Vec<RefuelPoint>) -> &mut InstanceBuilder {
        self.refuel_points = refuel_points;
        self
    }

    pub fn add_refuel_point(&mut self, refuel_point: RefuelPoint) -> &mut InstanceBuilder {
        self.refuel_points.push(refuel_point);
        self
    }

    pub fn add_customer(&mut self, customer: CustomerInput) -> &mut InstanceBuilder {
        self.customers.push(customer);
        self
    }

    /// Matrix over extended vertices in the order given by `extended_locations`.
    pub fn set_travel_matrix(&mut self, travel_matrix: TravelMatrix) -> &mut InstanceBuilder {
        self.travel_matrix = Some(travel_matrix);
        self
    }

    pub fn set_pareto_table(&mut self, pareto: ParetoTable) -> &mut InstanceBuilder {
        self.pareto = Some(pareto);
        self
    }

    /// Trips in instance order as (customer, route, trip) positions of the inputs.
    fn trip_order(&self) -> Vec<(usize, usize, usize)> {
        let mut order = self
            .customers
            .iter()
            .enumerate()
            .flat_map(|(c, customer)| {
                customer.routes.iter().enumerate().flat_map(move |(r, route)| {
                    (0..route.trips.len()).map(move |t| (c, r, t))
                })
            })
            .collect::<Vec<_>>();

        order.sort_by(|&(c1, r1, t1), &(c2, r2, t2)| {
            let a = &self.customers[c1].routes[r1].trips[t1];
            let b = &self.customers[c2].routes[r2].trips[t2];
            a.schedule_cmp(b)
        });

        order
    }

    /// Locations of the extended vertices, in the order the travel matrix must follow.
    pub fn extended_locations(&self) -> ExtendedLocations {
        let trips = self
            .trip_order()
            .into_iter()
            .map(|(c, r, t)| &self.customers[c].routes[r].trips[t])
            .collect::<Vec<_>>();

        let departures = self
            .vehicles
            .iter()
            .map(|vehicle| vehicle.departure())
            .chain(trips.iter().map(|trip| trip.departure()))
            .chain(self.refuel_points.iter().map(|point| point.departure()))
            .collect();
        let arrivals = self
            .vehicles
            .iter()
            .map(|vehicle| vehicle.arrival())
            .chain(trips.iter().map(|trip| trip.arrival()))
            .chain(self.refuel_points.iter().map(|point| point.arrival()))
            .collect();

        ExtendedLocations {
            departures,
            arrivals,
        }
    }

    pub fn build(self) -> Result<Instance, InstanceError> {
        if !(self.coefficients.fuel_per_meter > 0.0) {
            return Err(InstanceError::InvalidFuelPerMeter(
                self.coefficients.fuel_per_meter,
            ));
        }

        for customer in &self.customers {
            if customer.routes.is_empty() {
                return Err(InstanceError::CustomerWithoutRoute(customer.id));
            }
            if let Some(route) = customer.routes.iter().find(|route| route.trips.is_empty()) {
                return Err(InstanceError::RouteWithoutTrip(route.id));
            }
        }

        let order = self.trip_order();
        let mut positions: FxHashMap<(usize, usize, usize), TripIdx> = FxHashMap::default();
        for (index, &key) in order.iter().enumerate() {
            positions.insert(key, TripIdx::new(index));
        }

        let mut routes = Vec::new();
        let mut customers = Vec::with_capacity(self.customers.len());
        let mut trip_routes = vec![RouteIdx::default(); order.len()];
        for (c, customer) in self.customers.iter().enumerate() {
            let mut customer_routes = Vec::with_capacity(customer.routes.len());
            for (r, route) in customer.routes.iter().enumerate() {
                let route_idx = RouteIdx::new(routes.len());
                let mut trips = (0..route.trips.len())
                    .map(|t| positions[&(c, r, t)])
                    .collect::<Vec<_>>();
                trips.sort();
                for &trip in &trips {
                    trip_routes[trip.get()] = route_idx;
                }
                customer_routes.push(route_idx);
                routes.push(Route {
                    id: route.id,
                    cost: route.cost,
                    customer: CustomerIdx::new(c),
                    trips,
                });
            }
            customers.push(Customer {
                id: customer.id,
                routes: customer_routes,
            });
        }

        let mut inputs = self.customers;
        let mut slots: Vec<Option<Trip>> = vec![None; order.len()];
        for (c, customer) in inputs.iter_mut().enumerate() {
            for (r, route) in customer.routes.iter_mut().enumerate() {
                for (t, trip) in route.trips.drain(..).enumerate() {
                    slots[positions[&(c, r, t)].get()] = Some(trip);
                }
            }
        }
        let trips = slots.into_iter().flatten().collect::<Vec<_>>();

        let travel_matrix = self
            .travel_matrix
            .ok_or(InstanceError::MissingTravelMatrix)?;
        let expected = self.vehicles.len() + trips.len() + self.refuel_points.len();
        if travel_matrix.size() != expected || !travel_matrix.is_consistent() {
            return Err(InstanceError::TravelMatrixSize {
                expected,
                actual: travel_matrix.size(),
            });
        }

        let pareto = OnceLock::new();
        if let Some(table) = self.pareto {
            let expected = (self.vehicles.len() + trips.len(), trips.len());
            if table.dimensions() != expected {
                return Err(InstanceError::ParetoTableSize {
                    expected,
                    actual: table.dimensions(),
                });
            }
            let _ = pareto.set(table);
        }

        let instance = Instance {
            name: self.name,
            coefficients: self.coefficients,
            vehicles: self.vehicles,
            trips,
            refuel_points: self.refuel_points,
            customers,
            routes,
            trip_routes,
            travel_matrix,
            pareto,
        };

        let dictionary = instance.dictionary();
        if dictionary.len() != instance.num_extended_vertices() {
            let mut seen = fxhash::FxHashSet::default();
            let duplicate = (0..instance.num_extended_vertices())
                .map(|index| instance.identity(instance.entity_at(index)))
                .find(|token| !seen.insert(token.clone()))
                .unwrap_or_default();
            return Err(InstanceError::DuplicateIdentity(duplicate));
        }

        Ok(instance)
    }
}

impl Instance {
    /// Entity at a travel matrix index.
    pub fn entity_at(&self, index: usize) -> Entity {
        if index < self.vehicles.len() {
            Entity::Vehicle(VehicleIdx::new(index))
        } else if index < self.num_vertices() {
            Entity::Trip(TripIdx::new(index - self.vehicles.len()))
        } else {
            Entity::RefuelPoint(RefuelPointIdx::new(index - self.num_vertices()))
        }
    }
}
