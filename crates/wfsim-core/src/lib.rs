//! Minimal discrete-event engine: a time-ordered queue of typed events with cancellation,
//! a seeded random generator and logging macros.

pub mod event;
pub mod log;
mod state;

pub use colored;
pub use event::{Event, EventData, EventId};
pub use state::{SimulationState, EPSILON};
