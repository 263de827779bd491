//! Simulation events exchanged between the simulator and schedulers.

use serde::Serialize;

use wfsim_core::EventData;

/// Kind of a simulation event.
///
/// The declaration order is the processing order of events occurring at the same time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EventKind {
    TaskStarted,
    TaskFinished,
    TaskFailed,
    ResourceDown,
    ResourceUp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    TaskStarted { task: usize, resource: usize, slot: usize },
    TaskFinished { task: usize, resource: usize, slot: usize },
    TaskFailed { task: usize, resource: usize, slot: usize },
    ResourceDown { resource: usize },
    ResourceUp { resource: usize },
}

impl SimEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::TaskStarted { .. } => EventKind::TaskStarted,
            SimEvent::TaskFinished { .. } => EventKind::TaskFinished,
            SimEvent::TaskFailed { .. } => EventKind::TaskFailed,
            SimEvent::ResourceDown { .. } => EventKind::ResourceDown,
            SimEvent::ResourceUp { .. } => EventKind::ResourceUp,
        }
    }

    pub fn task(&self) -> Option<usize> {
        match *self {
            SimEvent::TaskStarted { task, .. }
            | SimEvent::TaskFinished { task, .. }
            | SimEvent::TaskFailed { task, .. } => Some(task),
            SimEvent::ResourceDown { .. } | SimEvent::ResourceUp { .. } => None,
        }
    }

    pub fn resource(&self) -> usize {
        match *self {
            SimEvent::TaskStarted { resource, .. }
            | SimEvent::TaskFinished { resource, .. }
            | SimEvent::TaskFailed { resource, .. }
            | SimEvent::ResourceDown { resource }
            | SimEvent::ResourceUp { resource } => resource,
        }
    }
}

impl EventData for SimEvent {
    fn priority(&self) -> u8 {
        self.kind() as u8
    }
}

/// Simulation event with its time and id.
pub type Event = wfsim_core::Event<SimEvent>;
