//! Workflow execution simulation.

use std::collections::BTreeMap;
use std::rc::Rc;

use itertools::Itertools;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use wfsim_core::{log_debug, log_info, EventId, SimulationState};

use crate::error::{ActionError, SimulationError};
use crate::event::{Event, SimEvent};
use crate::resource::Resource;
use crate::run_stats::RunStats;
use crate::scheduler::{Action, Scheduler, Settings};
use crate::trace_log::{TraceEvent, TraceLog};
use crate::workflow::Workflow;

/// Upper bound of the uniform multiplier applied to dispatch delays and to the time before a failure.
const UNIFORM_SPREAD: f64 = 1.1;
/// Relative standard deviation of task durations.
const DURATION_STD: f64 = 0.1;

/// Outage of a resource: it goes down at `start` and comes back up after `duration`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceFailure {
    pub resource: usize,
    pub start: f64,
    pub duration: f64,
}

#[derive(Clone, Copy, Debug)]
struct InFlight {
    start_event: EventId,
    end_event: EventId,
    slot: usize,
    started: bool,
}

/// Simulates execution of a workflow on a set of resources under the control of a scheduler.
///
/// The simulator owns the true state of resources and tasks. The scheduler only gets the events and returns
/// actions, each action is validated and turned into a pair of start and end events with randomized times.
pub struct Simulator {
    workflow: Rc<Workflow>,
    resources: Vec<Resource>,
    scheduler: Box<dyn Scheduler>,
    settings: Settings,
    state: SimulationState<SimEvent>,
    failures: Vec<ResourceFailure>,
    completed: Vec<bool>,
    task_failures: Vec<u32>,
    in_flight: Vec<Option<usize>>,
    running: Vec<BTreeMap<usize, InFlight>>,
    trace_log: TraceLog,
    run_stats: RunStats,
    has_run: bool,
}

impl Simulator {
    pub fn new(seed: u64, workflow: Workflow, scheduler: Box<dyn Scheduler>, settings: Settings) -> Self {
        Self {
            workflow: Rc::new(workflow),
            resources: Vec::new(),
            scheduler,
            settings,
            state: SimulationState::new(seed),
            failures: Vec::new(),
            completed: Vec::new(),
            task_failures: Vec::new(),
            in_flight: Vec::new(),
            running: Vec::new(),
            trace_log: TraceLog::new(),
            run_stats: RunStats::default(),
            has_run: false,
        }
    }

    /// Adds a resource, returns its id.
    pub fn add_resource(&mut self, mut resource: Resource) -> usize {
        let id = self.resources.len();
        resource.id = id;
        self.resources.push(resource);
        id
    }

    /// Schedules an outage of the resource.
    pub fn inject_resource_failure(
        &mut self,
        resource: usize,
        start: f64,
        duration: f64,
    ) -> Result<(), SimulationError> {
        if resource >= self.resources.len() {
            return Err(SimulationError::UnknownResource(resource));
        }
        if !(start >= 0. && duration >= 0. && (start + duration).is_finite()) {
            return Err(SimulationError::InvalidFailure {
                resource,
                start,
                duration,
            });
        }
        self.failures.push(ResourceFailure {
            resource,
            start,
            duration,
        });
        Ok(())
    }

    pub fn name(&self) -> &str {
        "simulator"
    }

    pub fn time(&self) -> f64 {
        self.state.time()
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn completed(&self) -> &[bool] {
        &self.completed
    }

    pub fn completion_time(&self) -> &[Option<f64>] {
        &self.run_stats.completion_time
    }

    pub fn task_location(&self) -> &[Option<usize>] {
        &self.run_stats.task_location
    }

    pub fn task_failures(&self) -> &[u32] {
        &self.task_failures
    }

    pub fn trace_log(&self) -> &TraceLog {
        &self.trace_log
    }

    pub fn run_stats(&self) -> &RunStats {
        &self.run_stats
    }

    /// Runs the simulation until there are no more events.
    ///
    /// Can be called only once. Stops at the first fatal error: malformed workflow, invalid scheduler action
    /// or repeated resource state transition.
    pub fn run(&mut self) -> Result<RunStats, SimulationError> {
        if self.has_run {
            return Err(SimulationError::AlreadyRun);
        }
        self.has_run = true;
        self.workflow.check_correctness()?;

        let task_count = self.workflow.task_count();
        self.completed = vec![false; task_count];
        self.task_failures = vec![0; task_count];
        self.in_flight = vec![None; task_count];
        self.running = vec![BTreeMap::new(); self.resources.len()];
        self.run_stats = RunStats::new(task_count);
        self.trace_log.log_workflow(&self.workflow, &self.resources);

        if self.settings.logging {
            let edges = (0..task_count)
                .flat_map(|succ| self.workflow.predecessors(succ).iter().map(move |&(pred, _)| (pred, succ)))
                .map(|(pred, succ)| format!("{pred}-{succ}"))
                .join(" ");
            log_info!(self, "edges: {}", edges);
        }

        let actions = self
            .scheduler
            .init(self.workflow.clone(), self.resources.clone(), &self.settings);
        self.run_stats.set_expected_makespan(self.scheduler.expected_makespan());
        self.apply_actions(actions)?;

        for failure in self.failures.iter() {
            self.state
                .add_event_at(SimEvent::ResourceDown { resource: failure.resource }, failure.start);
            self.state.add_event_at(
                SimEvent::ResourceUp { resource: failure.resource },
                failure.start + failure.duration,
            );
        }

        while let Some(event) = self.state.next_event() {
            self.process_event(&event)?;
            let actions = self.scheduler.notify(&event);
            self.apply_actions(actions)?;
        }

        self.run_stats.set_invalidated_events(self.state.discarded_count());
        log_info!(self, "time spent: {:.3}", self.time());
        log_info!(
            self,
            "tasks completed: {} / {}",
            self.completed.iter().filter(|&&c| c).count(),
            task_count
        );
        Ok(self.run_stats.clone())
    }

    fn process_event(&mut self, event: &Event) -> Result<(), SimulationError> {
        let time = event.time;
        match event.data {
            SimEvent::TaskStarted { task, resource, slot } => {
                if let Some(in_flight) = self.running[resource].get_mut(&task) {
                    in_flight.started = true;
                }
                self.run_stats.set_task_start(task, time);
                self.log_event(TraceEvent::TaskStarted {
                    time,
                    task,
                    resource,
                    slot,
                });
            }
            SimEvent::TaskFinished { task, resource, slot } => {
                self.end_task(task, resource, slot);
                self.completed[task] = true;
                self.run_stats.set_task_finish(task, resource, time);
                self.log_event(TraceEvent::TaskFinished {
                    time,
                    task,
                    resource,
                    slot,
                });
            }
            SimEvent::TaskFailed { task, resource, slot } => {
                self.end_task(task, resource, slot);
                self.task_failures[task] += 1;
                self.run_stats.set_task_failed(task, time);
                self.log_event(TraceEvent::TaskFailed {
                    time,
                    task,
                    resource,
                    slot,
                });
            }
            SimEvent::ResourceDown { resource } => {
                if !self.resources[resource].is_up {
                    return Err(SimulationError::DuplicateStateTransition { resource, up: false });
                }
                self.resources[resource].is_up = false;
                self.log_event(TraceEvent::ResourceDown { time, resource });
                let lost = std::mem::take(&mut self.running[resource]);
                for (task, in_flight) in lost.into_iter() {
                    log_debug!(
                        self,
                        "invalidating events {} and {} of task {}",
                        in_flight.start_event,
                        in_flight.end_event,
                        task
                    );
                    if !in_flight.started {
                        self.state.cancel_event(in_flight.start_event);
                    }
                    self.state.cancel_event(in_flight.end_event);
                    self.resources[resource].release_slot(in_flight.slot);
                    self.in_flight[task] = None;
                    self.run_stats.set_task_lost(task, time);
                    self.log_event(TraceEvent::TaskLost { time, task, resource });
                }
            }
            SimEvent::ResourceUp { resource } => {
                if self.resources[resource].is_up {
                    return Err(SimulationError::DuplicateStateTransition { resource, up: true });
                }
                self.resources[resource].is_up = true;
                self.resources[resource].refill();
                self.log_event(TraceEvent::ResourceUp { time, resource });
            }
        }
        Ok(())
    }

    fn end_task(&mut self, task: usize, resource: usize, slot: usize) {
        self.running[resource].remove(&task);
        self.in_flight[task] = None;
        self.resources[resource].release_slot(slot);
    }

    fn apply_actions(&mut self, actions: Vec<Action>) -> Result<(), SimulationError> {
        for action in actions.into_iter() {
            self.apply_action(action)?;
        }
        Ok(())
    }

    fn validate_action(&self, action: &Action) -> Result<(), ActionError> {
        let Action { task, resource } = *action;
        if resource >= self.resources.len() {
            return Err(ActionError::UnknownResource(resource));
        }
        if task >= self.workflow.task_count() {
            return Err(ActionError::UnknownTask(task));
        }
        if self.completed[task] {
            return Err(ActionError::TaskCompleted(task));
        }
        if let Some(running_on) = self.in_flight[task] {
            return Err(ActionError::TaskRunning {
                task,
                resource: running_on,
            });
        }
        if !self.resources[resource].is_up {
            return Err(ActionError::ResourceDown(resource));
        }
        if !self.resources[resource].has_free_slot() {
            return Err(ActionError::NoFreeSlot(resource));
        }
        if let Some(&(pred, _)) = self
            .workflow
            .predecessors(task)
            .iter()
            .find(|&&(pred, _)| !self.completed[pred])
        {
            return Err(ActionError::DependencyNotDone { task, pred });
        }
        Ok(())
    }

    fn apply_action(&mut self, action: Action) -> Result<(), SimulationError> {
        self.validate_action(&action)?;
        let Action { task, resource } = action;
        let slot = self.resources[resource]
            .take_slot()
            .ok_or(ActionError::NoFreeSlot(resource))?;

        let now = self.time();
        let delay = self.resources[resource].delay;
        let mut start = now + delay * self.state.gen_range(0. ..UNIFORM_SPREAD);
        for &(pred, weight) in self.workflow.predecessors(task).iter() {
            if self.settings.optimize_transfers && self.run_stats.task_location[pred] == Some(resource) {
                continue;
            }
            start = start.max(now + self.settings.transfer_time(weight));
        }

        let duration = self.workflow.task(task).weight / self.resources[resource].speed;
        let can_fail = self
            .settings
            .max_task_failures
            .map_or(true, |max| self.task_failures[task] < max);
        let end = if can_fail && self.state.with_prob(self.settings.task_fail_prob) {
            let finish = start + duration * self.state.gen_range(0. ..UNIFORM_SPREAD);
            (SimEvent::TaskFailed { task, resource, slot }, finish)
        } else {
            let noise: f64 = self.state.sample_from_distribution(&StandardNormal);
            let finish = start + (duration * (1. + DURATION_STD * noise)).max(0.);
            (SimEvent::TaskFinished { task, resource, slot }, finish)
        };

        let start_event = self
            .state
            .add_event_at(SimEvent::TaskStarted { task, resource, slot }, start);
        let end_event = self.state.add_event_at(end.0, end.1);
        self.running[resource].insert(
            task,
            InFlight {
                start_event,
                end_event,
                slot,
                started: false,
            },
        );
        self.in_flight[task] = Some(resource);
        self.run_stats.set_task_dispatch();
        self.trace_log.log_event(TraceEvent::TaskScheduled {
            time: now,
            task,
            resource,
        });
        log_debug!(self, "task {} scheduled on {} slot {}", task, resource, slot);
        Ok(())
    }

    fn log_event(&mut self, event: TraceEvent) {
        if self.settings.logging {
            log_info!(self, "{}", event);
        } else {
            log_debug!(self, "{}", event);
        }
        self.trace_log.log_event(event);
    }
}
