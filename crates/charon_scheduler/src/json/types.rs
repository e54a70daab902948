use std::collections::BTreeMap;

use charon_matrix_providers::nullable_floats;
use jiff::civil::DateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    problem::{
        coefficients::Coefficients,
        entity::Scheduled,
        instance::{CustomerInput, Instance, InstanceBuilder, RouteInput},
        point::Point,
        refuel_point::RefuelPoint,
        travel_matrix::TravelMatrix,
        trip::{Trip, TripBuilder},
        vehicle::{Vehicle, VehicleBuilder},
    },
    taskgraph::{edge::EdgeAttributes, node::NodeAttributes},
    utils::time::datetime_format,
};

pub trait FromInstance<T> {
    fn from_instance(value: T, instance: &Instance) -> Self;
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "Instance")]
pub struct JsonInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub fuelpermeter: f64,
    pub refuelpersecond: f64,
    pub costpermeter: f64,
    pub costpercar: f64,
    pub vehicles: Vec<JsonVehicle>,
    pub refuelpoints: Vec<JsonRefuelPoint>,
    pub customers: Vec<JsonCustomer>,

    /// Seconds between extended vertices, `null` when there is no route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<JsonMatrix>,

    /// Meters between extended vertices, `null` when there is no route
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<JsonMatrix>,

    /// Frontier refuel point positions per origin vertex and trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paretorefuelpoints: Option<Vec<Vec<Vec<usize>>>>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JsonMatrix(
    #[serde(with = "nullable_floats::nested")]
    #[schemars(with = "Vec<Vec<Option<f64>>>")]
    pub Vec<Vec<f64>>,
);

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Vehicle")]
pub struct JsonVehicle {
    pub id: String,
    #[serde(with = "datetime_format")]
    #[schemars(with = "String")]
    pub start_time: DateTime,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default = "full_tank")]
    pub fuel: f64,
}

fn full_tank() -> f64 {
    1.0
}

impl From<&Vehicle> for JsonVehicle {
    fn from(value: &Vehicle) -> Self {
        JsonVehicle {
            id: value.id().to_owned(),
            start_time: value.start_time(),
            longitude: value.location().lon(),
            latitude: value.location().lat(),
            fuel: value.fuel(),
        }
    }
}

impl From<JsonVehicle> for Vehicle {
    fn from(value: JsonVehicle) -> Self {
        let mut builder = VehicleBuilder::default();
        builder
            .set_id(value.id)
            .set_start_time(value.start_time)
            .set_location(Point::new(value.longitude, value.latitude))
            .set_fuel(value.fuel);

        builder.build()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "RefuelPoint")]
pub struct JsonRefuelPoint {
    pub id: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl From<&RefuelPoint> for JsonRefuelPoint {
    fn from(value: &RefuelPoint) -> Self {
        JsonRefuelPoint {
            id: value.id().to_owned(),
            longitude: value.location().lon(),
            latitude: value.location().lat(),
        }
    }
}

impl From<JsonRefuelPoint> for RefuelPoint {
    fn from(value: JsonRefuelPoint) -> Self {
        RefuelPoint::new(value.id, Point::new(value.longitude, value.latitude))
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Trip")]
pub struct JsonTrip {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(with = "datetime_format")]
    #[schemars(with = "String")]
    pub start_time: DateTime,
    #[serde(with = "datetime_format")]
    #[schemars(with = "String")]
    pub finish_time: DateTime,
    /// Meters driven with the customer
    pub distance: f64,
    #[serde(default)]
    pub servicedrive: bool,
    pub start_longitude: f64,
    pub start_latitude: f64,
    pub finish_longitude: f64,
    pub finish_latitude: f64,
}

impl From<&Trip> for JsonTrip {
    fn from(value: &Trip) -> Self {
        JsonTrip {
            id: value.id().to_owned(),
            location_id: value.location_id(),
            start_time: value.start_time(),
            finish_time: value.finish_time(),
            distance: value.distance(),
            servicedrive: value.is_service_drive(),
            start_longitude: value.start_loc().lon(),
            start_latitude: value.start_loc().lat(),
            finish_longitude: value.finish_loc().lon(),
            finish_latitude: value.finish_loc().lat(),
        }
    }
}

impl From<JsonTrip> for Trip {
    fn from(value: JsonTrip) -> Self {
        let mut builder = TripBuilder::default();
        builder
            .set_id(value.id)
            .set_start_time(value.start_time)
            .set_finish_time(value.finish_time)
            .set_distance(value.distance)
            .set_service_drive(value.servicedrive)
            .set_start_loc(Point::new(value.start_longitude, value.start_latitude))
            .set_finish_loc(Point::new(value.finish_longitude, value.finish_latitude));

        if let Some(location_id) = value.location_id {
            builder.set_location_id(location_id);
        }

        builder.build()
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Route")]
pub struct JsonRoute {
    pub id: usize,
    /// Cost of the route outside of the vehicles, walking and transit legs included
    pub cost: f64,
    pub trips: Vec<JsonTrip>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Customer")]
pub struct JsonCustomer {
    pub id: usize,
    pub routes: Vec<JsonRoute>,
}

impl From<&Instance> for JsonInstance {
    fn from(instance: &Instance) -> Self {
        let coefficients = instance.coefficients();
        let matrix = instance.travel_matrix();

        JsonInstance {
            name: instance.name().map(str::to_owned),
            fuelpermeter: coefficients.fuel_per_meter,
            refuelpersecond: coefficients.refuel_per_second,
            costpermeter: coefficients.cost_per_meter,
            costpercar: coefficients.cost_per_vehicle,
            vehicles: instance.vehicles().iter().map(JsonVehicle::from).collect(),
            refuelpoints: instance
                .refuel_points()
                .iter()
                .map(JsonRefuelPoint::from)
                .collect(),
            customers: instance
                .customers()
                .iter()
                .map(|customer| JsonCustomer {
                    id: customer.id(),
                    routes: customer
                        .routes()
                        .iter()
                        .map(|&route| {
                            let route = instance.route(route);
                            JsonRoute {
                                id: route.id(),
                                cost: route.cost(),
                                trips: route
                                    .trips()
                                    .iter()
                                    .map(|&trip| JsonTrip::from(instance.trip(trip)))
                                    .collect(),
                            }
                        })
                        .collect(),
                })
                .collect(),
            time: Some(JsonMatrix(matrix.time_rows())),
            dist: Some(JsonMatrix(matrix.distance_rows())),
            paretorefuelpoints: instance.cached_pareto_table().map(|table| table.to_rows()),
        }
    }
}

impl JsonInstance {
    /// Builder holding everything but the Pareto table, which needs validating first.
    ///
    /// The travel matrix is only set when both `time` and `dist` are present.
    pub fn into_builder(self) -> (InstanceBuilder, Option<Vec<Vec<Vec<usize>>>>) {
        let mut builder = InstanceBuilder::default();

        if let Some(name) = self.name {
            builder.set_name(name);
        }

        builder
            .set_coefficients(Coefficients {
                fuel_per_meter: self.fuelpermeter,
                refuel_per_second: self.refuelpersecond,
                cost_per_meter: self.costpermeter,
                cost_per_vehicle: self.costpercar,
            })
            .set_vehicles(self.vehicles.into_iter().map(Vehicle::from).collect())
            .set_refuel_points(
                self.refuelpoints
                    .into_iter()
                    .map(RefuelPoint::from)
                    .collect(),
            );

        for customer in self.customers {
            builder.add_customer(CustomerInput {
                id: customer.id,
                routes: customer
                    .routes
                    .into_iter()
                    .map(|route| RouteInput {
                        id: route.id,
                        cost: route.cost,
                        trips: route.trips.into_iter().map(Trip::from).collect(),
                    })
                    .collect(),
            });
        }

        if let (Some(JsonMatrix(times)), Some(JsonMatrix(distances))) = (self.time, self.dist) {
            builder.set_travel_matrix(TravelMatrix::new(distances, times));
        }

        (builder, self.paretorefuelpoints)
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "TaskGraph")]
pub struct JsonTaskGraph {
    pub graph: JsonGraphMetadata,
    pub nodes: Vec<JsonNode>,
    /// Outgoing edges of every node with at least one, keyed by node tokens
    pub successors: BTreeMap<String, BTreeMap<String, JsonEdge>>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "GraphMetadata")]
pub struct JsonGraphMetadata {
    pub ds: String,
    pub de: String,
    pub fuelpermeter: f64,
    pub refuelpersecond: f64,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Node")]
pub struct JsonNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ft: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splitpoint: Option<JsonSplitpoint>,
}

impl JsonNode {
    pub fn new(id: String, attributes: &NodeAttributes) -> Self {
        JsonNode {
            id,
            f0: attributes.f0,
            ft: attributes.ft,
            ct: attributes.ct,
            fmin: attributes.fmin,
            fmax: attributes.fmax,
            splitpoint: None,
        }
    }

    pub fn attributes(&self) -> NodeAttributes {
        NodeAttributes {
            f0: self.f0,
            ft: self.ft,
            ct: self.ct,
            fmin: self.fmin,
            fmax: self.fmax,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Splitpoint")]
pub struct JsonSplitpoint {
    #[serde(with = "datetime_format")]
    #[schemars(with = "String")]
    pub time: DateTime,
    /// Token of the trip the splitpoint leads to
    pub successor: String,
    pub cut: usize,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Edge")]
pub struct JsonEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refuelpoint: Option<String>,
    pub fe: f64,
    pub fg: f64,
    pub fh: f64,
    pub fd: f64,
    pub fr: f64,
    pub ce: f64,
    pub cd: f64,
}

impl FromInstance<&EdgeAttributes> for JsonEdge {
    fn from_instance(value: &EdgeAttributes, instance: &Instance) -> Self {
        JsonEdge {
            refuelpoint: value
                .refuel_point
                .map(|refuel_point| instance.identity(refuel_point)),
            fe: value.fe,
            fg: value.fg,
            fh: value.fh,
            fd: value.fd,
            fr: value.fr,
            ce: value.ce,
            cd: value.cd,
        }
    }
}
