use crate::define_index_newtype;

use super::{
    entity::{Identified, Located},
    point::Point,
};

define_index_newtype!(RefuelPointIdx, RefuelPoint);

#[derive(Clone, Debug, PartialEq)]
pub struct RefuelPoint {
    id: String,
    location: Point,
}

impl RefuelPoint {
    pub fn new(id: String, location: Point) -> Self {
        Self { id, location }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn location(&self) -> Point {
        self.location
    }
}

impl Located for RefuelPoint {
    fn departure(&self) -> Point {
        self.location
    }

    fn arrival(&self) -> Point {
        self.location
    }
}

impl Identified for RefuelPoint {
    fn identity(&self) -> String {
        format!("RefuelPoint{}", self.id)
    }
}
