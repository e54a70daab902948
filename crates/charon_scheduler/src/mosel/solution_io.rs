use std::{collections::BTreeMap, path::Path};

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    problem::{
        entity::{Entity, Vertex},
        instance::{IdentityDictionary, Instance},
        vehicle::VehicleIdx,
    },
    solution::{
        duty::{Duty, DutyStop},
        solution::{FuelState, Solution},
    },
    storage::read_string,
};

use super::{
    parser::{ParseError, parse_document},
    value::{Document, Value},
    writer::save_document,
};

#[derive(Debug, Error)]
pub enum FormatError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Missing definition {0}")]
    MissingKey(&'static str),

    #[error("{key} must be a {expected}, found a {found}")]
    Shape {
        key: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown token {0}")]
    UnknownToken(String),

    #[error("{token} cannot appear in {key}")]
    UnexpectedEntity { key: &'static str, token: String },

    #[error("{key} of {vehicle} has {actual} values, expected {expected}")]
    FuelLength {
        key: &'static str,
        vehicle: String,
        expected: usize,
        actual: usize,
    },
}

const DUTIES: &str = "Duties";
const FUEL_MIN: &str = "Fuel_Min";
const FUEL_MAX: &str = "Fuel_Max";

fn table<'a>(
    document: &'a Document,
    key: &'static str,
) -> Result<Option<&'a [(Vec<Value>, Value)]>, FormatError> {
    match document.get(key) {
        None => Ok(None),
        Some(value) => value.as_table().map(Some).ok_or(FormatError::Shape {
            key,
            expected: "table",
            found: value.kind(),
        }),
    }
}

fn list<'a>(key: &'static str, value: &'a Value) -> Result<&'a [Value], FormatError> {
    value.as_list().ok_or(FormatError::Shape {
        key,
        expected: "list",
        found: value.kind(),
    })
}

/// Text token, or the integer written without quotes.
fn token(key: &'static str, value: &Value) -> Result<String, FormatError> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        Value::Integer(integer) => Ok(integer.to_string()),
        other => Err(FormatError::Shape {
            key,
            expected: "token",
            found: other.kind(),
        }),
    }
}

fn resolve(dictionary: &IdentityDictionary, token: &str) -> Result<Entity, FormatError> {
    dictionary
        .resolve(token)
        .ok_or_else(|| FormatError::UnknownToken(token.to_owned()))
}

fn index_entity(
    dictionary: &IdentityDictionary,
    key: &'static str,
    index: &[Value],
) -> Result<Entity, FormatError> {
    match index {
        [single] => resolve(dictionary, &token(key, single)?),
        _ => Err(FormatError::Shape {
            key,
            expected: "single index",
            found: "tuple",
        }),
    }
}

/// Stops of a duty, `None` for the blank padding the solver writes.
fn raw_stops(
    dictionary: &IdentityDictionary,
    value: &Value,
) -> Result<Vec<Option<DutyStop>>, FormatError> {
    list(DUTIES, value)?
        .iter()
        .map(|value| {
            let token = token(DUTIES, value)?;
            if token.is_empty() {
                return Ok(None);
            }
            let entity = resolve(dictionary, &token)?;
            DutyStop::try_from(entity)
                .map(Some)
                .map_err(|_| FormatError::UnexpectedEntity { key: DUTIES, token })
        })
        .collect()
}

fn fuel_values(key: &'static str, value: &Value) -> Result<Vec<f64>, FormatError> {
    list(key, value)?
        .iter()
        .map(|value| {
            value.as_f64().ok_or(FormatError::Shape {
                key,
                expected: "number",
                found: value.kind(),
            })
        })
        .collect()
}

fn fuel_by_vehicle(
    instance: &Instance,
    dictionary: &IdentityDictionary,
    document: &Document,
    key: &'static str,
) -> Result<Option<BTreeMap<VehicleIdx, Vec<f64>>>, FormatError> {
    let Some(entries) = table(document, key)? else {
        return Ok(None);
    };

    let mut values = BTreeMap::new();
    for (index, value) in entries {
        match index_entity(dictionary, key, index)? {
            Entity::Vehicle(vehicle) => {
                values.insert(vehicle, fuel_values(key, value)?);
            }
            entity => {
                return Err(FormatError::UnexpectedEntity {
                    key,
                    token: instance.identity(entity),
                });
            }
        }
    }

    Ok(Some(values))
}

/// Reads `Duties` and, when both are present, `Fuel_Min` and `Fuel_Max`.
pub fn parse_solution(document: &Document, instance: &Instance) -> Result<Solution, FormatError> {
    let dictionary = instance.dictionary();
    let duties = table(document, DUTIES)?.ok_or(FormatError::MissingKey(DUTIES))?;

    let mut raw = BTreeMap::new();
    for (index, value) in duties {
        let vehicle = match index_entity(&dictionary, DUTIES, index)? {
            Entity::Vehicle(vehicle) => vehicle,
            entity => {
                return Err(FormatError::UnexpectedEntity {
                    key: DUTIES,
                    token: instance.identity(entity),
                });
            }
        };
        raw.insert(vehicle, raw_stops(&dictionary, value)?);
    }

    let mut solution = Solution::new(
        raw.iter()
            .map(|(&vehicle, stops)| (vehicle, stops.iter().flatten().copied().collect()))
            .collect(),
    );

    let fuel_min = fuel_by_vehicle(instance, &dictionary, document, FUEL_MIN)?;
    let fuel_max = fuel_by_vehicle(instance, &dictionary, document, FUEL_MAX)?;
    if let (Some(fuel_min), Some(fuel_max)) = (fuel_min, fuel_max) {
        for (vehicle, stops) in &raw {
            let (Some(min), Some(max)) = (fuel_min.get(vehicle), fuel_max.get(vehicle)) else {
                continue;
            };
            for (key, values) in [(FUEL_MIN, min), (FUEL_MAX, max)] {
                if values.len() != stops.len() + 1 {
                    return Err(FormatError::FuelLength {
                        key,
                        vehicle: instance.identity(*vehicle),
                        expected: stops.len() + 1,
                        actual: values.len(),
                    });
                }
            }

            solution.set_fuel_state(
                Vertex::Vehicle(*vehicle),
                FuelState {
                    min: min[0],
                    max: max[0],
                },
            );
            for (i, stop) in stops.iter().enumerate() {
                if let Some(DutyStop::Trip(trip)) = stop {
                    solution.set_fuel_state(
                        Vertex::Trip(*trip),
                        FuelState {
                            min: min[i + 1],
                            max: max[i + 1],
                        },
                    );
                }
            }
        }
    }

    debug!(
        "Parsed {} duties, fuel states: {}",
        raw.len(),
        solution.has_fuel_states()
    );

    Ok(solution)
}

/// Reads partial duties keyed by their start point, a vehicle or a trip.
pub fn parse_partial_duties(
    document: &Document,
    instance: &Instance,
) -> Result<BTreeMap<Vertex, Duty>, FormatError> {
    let dictionary = instance.dictionary();
    let duties = table(document, DUTIES)?.ok_or(FormatError::MissingKey(DUTIES))?;

    duties
        .iter()
        .map(|(index, value)| {
            let entity = index_entity(&dictionary, DUTIES, index)?;
            let start = Vertex::try_from(entity).map_err(|entity| FormatError::UnexpectedEntity {
                key: DUTIES,
                token: instance.identity(entity),
            })?;
            let duty = raw_stops(&dictionary, value)?.into_iter().flatten().collect();

            Ok((start, duty))
        })
        .collect()
}

/// `Duties`, plus `Fuel_Min` and `Fuel_Max` when the solution carries fuel states.
pub fn solution_document(instance: &Instance, solution: &Solution) -> Document {
    let mut document = Document::new();

    document.insert(
        DUTIES,
        Value::Table(
            solution
                .duties()
                .map(|(vehicle, duty)| {
                    (
                        vec![Value::Text(instance.identity(vehicle))],
                        Value::texts(
                            duty.stops()
                                .iter()
                                .map(|&stop| instance.identity(Entity::from(stop))),
                        ),
                    )
                })
                .collect(),
        ),
    );

    if solution.has_fuel_states() {
        let fuel = |select: fn(FuelState) -> f64| {
            Value::Table(
                solution
                    .duties()
                    .map(|(vehicle, duty)| {
                        let mut current = solution
                            .fuel_state(Vertex::Vehicle(vehicle))
                            .map_or(instance.vehicle(vehicle).fuel(), select);
                        let mut values = vec![current];
                        // Refuel points repeat the last trip value.
                        for stop in duty.stops() {
                            let state = stop
                                .trip()
                                .and_then(|trip| solution.fuel_state(Vertex::Trip(trip)));
                            if let Some(state) = state {
                                current = select(state);
                            }
                            values.push(current);
                        }
                        (vec![Value::Text(instance.identity(vehicle))], Value::reals(values))
                    })
                    .collect(),
            )
        };

        document
            .insert(FUEL_MIN, fuel(|state| state.min))
            .insert(FUEL_MAX, fuel(|state| state.max));
    }

    document
}

pub fn save_solution(path: &Path, instance: &Instance, solution: &Solution) -> Result<(), FormatError> {
    save_document(path, &solution_document(instance, solution))?;
    info!("Saved solution to {}", path.display());

    Ok(())
}

pub fn load_solution(path: &Path, instance: &Instance) -> Result<Solution, FormatError> {
    let document = parse_document(&read_string(path)?)?;
    let solution = parse_solution(&document, instance)?;
    info!("Loaded solution from {}", path.display());

    Ok(solution)
}

pub fn load_partial_duties(
    path: &Path,
    instance: &Instance,
) -> Result<BTreeMap<Vertex, Duty>, FormatError> {
    let document = parse_document(&read_string(path)?)?;
    parse_partial_duties(&document, instance)
}
