//! Simulation execution log.

use std::fmt::{Display, Formatter};
use std::fs::File;

use serde::{Deserialize, Serialize};

use crate::config::WorkflowConfig;
use crate::resource::{Resource, ResourceConfig};
use crate::workflow::Workflow;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    TaskScheduled {
        time: f64,
        task: usize,
        resource: usize,
    },
    TaskStarted {
        time: f64,
        task: usize,
        resource: usize,
        slot: usize,
    },
    TaskFinished {
        time: f64,
        task: usize,
        resource: usize,
        slot: usize,
    },
    TaskFailed {
        time: f64,
        task: usize,
        resource: usize,
        slot: usize,
    },
    TaskLost {
        time: f64,
        task: usize,
        resource: usize,
    },
    ResourceDown {
        time: f64,
        resource: usize,
    },
    ResourceUp {
        time: f64,
        resource: usize,
    },
}

impl TraceEvent {
    pub fn time(&self) -> f64 {
        match self {
            TraceEvent::TaskScheduled { time, .. }
            | TraceEvent::TaskStarted { time, .. }
            | TraceEvent::TaskFinished { time, .. }
            | TraceEvent::TaskFailed { time, .. }
            | TraceEvent::TaskLost { time, .. }
            | TraceEvent::ResourceDown { time, .. }
            | TraceEvent::ResourceUp { time, .. } => *time,
        }
    }

    pub fn task(&self) -> Option<usize> {
        match *self {
            TraceEvent::TaskScheduled { task, .. }
            | TraceEvent::TaskStarted { task, .. }
            | TraceEvent::TaskFinished { task, .. }
            | TraceEvent::TaskFailed { task, .. }
            | TraceEvent::TaskLost { task, .. } => Some(task),
            TraceEvent::ResourceDown { .. } | TraceEvent::ResourceUp { .. } => None,
        }
    }
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceEvent::TaskScheduled { task, resource, .. } => write!(f, "task {task} scheduled on {resource}"),
            TraceEvent::TaskStarted { task, resource, .. } => write!(f, "task {task} started on {resource}"),
            TraceEvent::TaskFinished { task, resource, .. } => write!(f, "task {task} finished on {resource}"),
            TraceEvent::TaskFailed { task, resource, .. } => write!(f, "task {task} failed on {resource}"),
            TraceEvent::TaskLost { task, resource, .. } => write!(f, "task {task} lost on {resource}"),
            TraceEvent::ResourceDown { resource, .. } => write!(f, "resource {resource} down"),
            TraceEvent::ResourceUp { resource, .. } => write!(f, "resource {resource} up"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct TraceLog {
    pub resources: Vec<ResourceConfig>,
    pub workflow: WorkflowConfig,
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn log_workflow(&mut self, workflow: &Workflow, resources: &[Resource]) {
        self.workflow = WorkflowConfig::from_workflow(workflow);
        self.resources = resources.iter().map(ResourceConfig::from_resource).collect();
    }

    pub fn save_to_file(&self, filename: &str) -> Result<(), std::io::Error> {
        serde_json::to_writer_pretty(File::create(filename)?, self)?;
        Ok(())
    }
}
