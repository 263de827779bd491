//! Error types.

use std::borrow::Borrow;

use thiserror::Error;

/// Malformed workflow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("size of tasks ({tasks}) should be equal to size of dependency lists ({dependencies})")]
    SizeMismatch { tasks: usize, dependencies: usize },
    #[error("dependency {pred} -> {succ} references unknown task")]
    UnknownTask { pred: usize, succ: usize },
    #[error("negative weight {weight} in workflow")]
    NegativeWeight { weight: f64 },
    #[error("there is a cycle through dependency {pred} -> {succ}")]
    Cycle { pred: usize, succ: usize },
}

/// Scheduler action violating the scheduling contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("wrong action: unknown task {0}")]
    UnknownTask(usize),
    #[error("wrong action: unknown resource {0}")]
    UnknownResource(usize),
    #[error("wrong action: task {0} already completed")]
    TaskCompleted(usize),
    #[error("wrong action: task {task} is already running on resource {resource}")]
    TaskRunning { task: usize, resource: usize },
    #[error("wrong action: resource {0} is down")]
    ResourceDown(usize),
    #[error("wrong action: no empty slots on resource {0}")]
    NoFreeSlot(usize),
    #[error("wrong action: task {pred} must be completed before task {task}")]
    DependencyNotDone { task: usize, pred: usize },
}

/// Fatal error terminating a simulation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("resource {resource} is already {}", up_or_down(.up))]
    DuplicateStateTransition { resource: usize, up: bool },
    #[error("unknown resource {0}")]
    UnknownResource(usize),
    #[error("invalid failure of resource {resource}: start {start}, duration {duration}")]
    InvalidFailure { resource: usize, start: f64, duration: f64 },
    #[error("simulation can be run only once")]
    AlreadyRun,
}

fn up_or_down<B: Borrow<bool>>(up: B) -> &'static str {
    if *up.borrow() {
        "up"
    } else {
        "down"
    }
}

/// Error while loading a simulation configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("can't parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),
    #[error("wrong scheduler: {0}")]
    UnknownScheduler(String),
    #[error("invalid value of {field}: {value}")]
    InvalidValue { field: String, value: f64 },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
