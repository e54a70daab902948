use jiff::civil::DateTime;

use crate::define_index_newtype;

use super::{
    entity::{Identified, Scheduled},
    trip::TripIdx,
};

define_index_newtype!(SplitpointIdx, Splitpoint);

/// Transfer node inserted in front of `successor` when a graph is cut at `time`.
/// Only lives inside a split task graph.
#[derive(Clone, Debug, PartialEq)]
pub struct Splitpoint {
    token: String,
    time: DateTime,
    successor: TripIdx,
    cut: usize,
}

impl Splitpoint {
    pub fn new(token: String, time: DateTime, successor: TripIdx, cut: usize) -> Self {
        Self {
            token,
            time,
            successor,
            cut,
        }
    }

    pub fn time(&self) -> DateTime {
        self.time
    }

    pub fn successor(&self) -> TripIdx {
        self.successor
    }

    /// Index of the cut that created the splitpoint.
    pub fn cut(&self) -> usize {
        self.cut
    }
}

impl Scheduled for Splitpoint {
    fn start_time(&self) -> DateTime {
        self.time
    }

    fn finish_time(&self) -> DateTime {
        self.time
    }
}

impl Identified for Splitpoint {
    fn identity(&self) -> String {
        self.token.clone()
    }
}
