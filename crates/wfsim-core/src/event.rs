//! Simulation events.

use std::cmp::Ordering;
use std::fmt::Debug;

use serde::Serialize;

/// Identifier of an event, assigned sequentially by the owning [`SimulationState`](crate::SimulationState).
pub type EventId = u64;

/// Payload carried by an event.
///
/// The priority breaks ties between events scheduled for the same time: lower values are processed first.
pub trait EventData: Clone + Debug + Serialize {
    /// Returns the tie-break priority of this payload.
    fn priority(&self) -> u8 {
        0
    }
}

/// Timestamped event with a typed payload.
#[derive(Clone, Debug, Serialize)]
pub struct Event<T: EventData> {
    pub id: EventId,
    pub time: f64,
    pub data: T,
}

impl<T: EventData> Eq for Event<T> {}

impl<T: EventData> PartialEq for Event<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted so that BinaryHeap pops the earliest event first.
impl<T: EventData> Ord for Event<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.data.priority().cmp(&self.data.priority()))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl<T: EventData> PartialOrd for Event<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
