//! Simulation configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SimulationError};
use crate::resource::{Resource, ResourceConfig};
use crate::scheduler::Settings;
use crate::scheduler_resolver::{default_scheduler_resolver, SchedulerParams};
use crate::simulator::{ResourceFailure, Simulator};
use crate::workflow::Workflow;

fn default_seed() -> u64 {
    123
}

fn invalid_value<S: Into<String>>(field: S, value: f64) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        value,
    }
}

/// Dependency `from -> to` as it appears in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Workflow as a list of task weights and a list of edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub tasks: Vec<f64>,
    pub edges: Vec<EdgeConfig>,
}

impl WorkflowConfig {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        let edges = (0..workflow.task_count())
            .flat_map(|to| {
                workflow
                    .predecessors(to)
                    .iter()
                    .map(move |&(from, weight)| EdgeConfig { from, to, weight })
            })
            .collect();
        Self {
            tasks: workflow.tasks().iter().map(|t| t.weight).collect(),
            edges,
        }
    }

    pub fn build(&self) -> Result<Workflow, SimulationError> {
        let mut workflow = Workflow::new();
        for &weight in self.tasks.iter() {
            workflow.add_task(weight);
        }
        for edge in self.edges.iter() {
            workflow.add_dependency(edge.from, edge.to, edge.weight)?;
        }
        Ok(workflow)
    }
}

/// Complete description of a simulation run.
///
/// ```yaml
/// scheduler: adaptive[hide_profile=true]
/// settings:
///   net_speed: 1.0
///   optimize_transfers: true
///   task_fail_prob: 0.1
/// workflow:
///   tasks: [2.0, 4.0, 5.0, 3.0]
///   edges:
///     - {from: 0, to: 1, weight: 1.0}
/// resources:
///   - {slots: 2, speed: 1.0, delay: 0.1}
/// resource_failures:
///   - {resource: 0, start: 1.0, duration: 2.0}
/// seed: 123
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub scheduler: String,
    pub settings: Settings,
    pub workflow: WorkflowConfig,
    pub resources: Vec<ResourceConfig>,
    #[serde(default)]
    pub resource_failures: Vec<ResourceFailure>,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl SimulationConfig {
    /// Reads the config from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&data),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&data),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(data)?)
    }

    /// Checks numeric settings and resource parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;
        if !(settings.net_speed > 0.) {
            return Err(invalid_value("settings.net_speed", settings.net_speed));
        }
        if !(0. ..=1.).contains(&settings.task_fail_prob) {
            return Err(invalid_value("settings.task_fail_prob", settings.task_fail_prob));
        }
        for (id, resource) in self.resources.iter().enumerate() {
            if resource.slots == 0 {
                return Err(invalid_value(format!("resources[{id}].slots"), 0.));
            }
            if !(resource.speed > 0. && resource.speed.is_finite()) {
                return Err(invalid_value(format!("resources[{id}].speed"), resource.speed));
            }
            if !(resource.delay >= 0. && resource.delay.is_finite()) {
                return Err(invalid_value(format!("resources[{id}].delay"), resource.delay));
            }
        }
        Ok(())
    }

    /// Creates a simulator with the workflow, resources, outages and scheduler from the config.
    pub fn build(&self) -> Result<Simulator, ConfigError> {
        self.validate()?;
        let params = SchedulerParams::from_str(&self.scheduler)
            .ok_or_else(|| ConfigError::UnknownScheduler(self.scheduler.clone()))?;
        let scheduler =
            default_scheduler_resolver(&params).ok_or_else(|| ConfigError::UnknownScheduler(self.scheduler.clone()))?;
        let workflow = self.workflow.build()?;

        let mut sim = Simulator::new(self.seed, workflow, scheduler, self.settings.clone());
        for (id, resource) in self.resources.iter().enumerate() {
            sim.add_resource(Resource::from_config(id, resource));
        }
        for failure in self.resource_failures.iter() {
            sim.inject_resource_failure(failure.resource, failure.start, failure.duration)?;
        }
        Ok(sim)
    }
}
