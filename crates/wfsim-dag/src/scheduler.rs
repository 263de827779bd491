//! Scheduler contract and the scheduler-side view of the simulation.

use std::collections::BTreeSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::event::{Event, SimEvent};
use crate::resource::Resource;
use crate::workflow::Workflow;

/// Request to start a task on a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Action {
    pub task: usize,
    pub resource: usize,
}

impl Action {
    pub fn new(task: usize, resource: usize) -> Self {
        Self { task, resource }
    }
}

fn default_true() -> bool {
    true
}

/// Simulation settings shared by the simulator and schedulers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Data weights are divided by this value to get transfer times.
    pub net_speed: f64,
    /// Whether to skip transfer time when predecessor and successor run on the same resource.
    pub optimize_transfers: bool,
    /// Probability of a task attempt to fail (used by the simulator only).
    pub task_fail_prob: f64,
    /// Whether to log each processed event at the info level.
    #[serde(default = "default_true")]
    pub logging: bool,
    /// After this many failures of a task its further attempts always succeed (unlimited by default).
    #[serde(default)]
    pub max_task_failures: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            net_speed: 1.,
            optimize_transfers: true,
            task_fail_prob: 0.,
            logging: true,
            max_task_failures: None,
        }
    }
}

impl Settings {
    pub fn transfer_time(&self, data_weight: f64) -> f64 {
        data_weight / self.net_speed
    }
}

/// Scheduling policy.
///
/// The scheduler never observes the simulator state directly: it gets the workflow and a copy of resources
/// in [`init`](Scheduler::init) and then learns about every change only through [`notify`](Scheduler::notify).
pub trait Scheduler {
    /// Called once before the simulation starts, returns the first actions.
    fn init(&mut self, workflow: Rc<Workflow>, resources: Vec<Resource>, settings: &Settings) -> Vec<Action>;
    /// Called for every processed event, returns the actions reacting to it.
    fn notify(&mut self, event: &Event) -> Vec<Action>;
    fn name(&self) -> &str;
    /// Makespan of the initial plan, for schedulers which build one.
    fn expected_makespan(&self) -> Option<f64> {
        None
    }
}

/// Scheduler-side mirror of the simulation, updated only from events.
///
/// Tracks the completion flags, which tasks are in flight and where, and the slots of each resource
/// as the scheduler sees them.
pub struct SchedulerState {
    name: String,
    pub workflow: Rc<Workflow>,
    pub resources: Vec<Resource>,
    pub settings: Settings,
    pub completed: Vec<bool>,
    pub scheduled: Vec<bool>,
    pub task_slot: Vec<Option<usize>>,
    pub tasks_on_res: Vec<BTreeSet<usize>>,
    pub current_time: f64,
}

impl SchedulerState {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            workflow: Rc::new(Workflow::new()),
            resources: Vec::new(),
            settings: Settings::default(),
            completed: Vec::new(),
            scheduled: Vec::new(),
            task_slot: Vec::new(),
            tasks_on_res: Vec::new(),
            current_time: 0.,
        }
    }

    pub fn init(&mut self, workflow: Rc<Workflow>, resources: Vec<Resource>, settings: &Settings) {
        let task_count = workflow.task_count();
        self.tasks_on_res = vec![BTreeSet::new(); resources.len()];
        self.workflow = workflow;
        self.resources = resources;
        self.settings = settings.clone();
        self.completed = vec![false; task_count];
        self.scheduled = vec![false; task_count];
        self.task_slot = vec![None; task_count];
        self.current_time = 0.;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn task_count(&self) -> usize {
        self.completed.len()
    }

    /// Returns whether every predecessor of the task is completed.
    pub fn dependencies_done(&self, task: usize) -> bool {
        self.workflow.predecessors(task).iter().all(|&(pred, _)| self.completed[pred])
    }

    /// Returns whether the task can be dispatched: not completed, not in flight, all dependencies done.
    pub fn is_ready(&self, task: usize) -> bool {
        !self.completed[task] && !self.scheduled[task] && self.dependencies_done(task)
    }

    /// Records the dispatch of a task to the given slot of a resource.
    pub fn dispatch(&mut self, task: usize, resource: usize, slot: usize) -> Action {
        self.scheduled[task] = true;
        self.task_slot[task] = Some(slot);
        self.tasks_on_res[resource].insert(task);
        Action::new(task, resource)
    }

    /// Applies the common bookkeeping for the event.
    ///
    /// Returns the tasks which are no longer in flight without being completed (failed or lost with their
    /// resource), they are marked as not scheduled.
    pub fn apply(&mut self, event: &Event) -> Vec<usize> {
        self.current_time = event.time;
        match event.data {
            SimEvent::TaskStarted { .. } => Vec::new(),
            SimEvent::TaskFinished { task, resource, .. } => {
                self.release(task, resource);
                self.completed[task] = true;
                Vec::new()
            }
            SimEvent::TaskFailed { task, resource, .. } => {
                self.release(task, resource);
                self.scheduled[task] = false;
                vec![task]
            }
            SimEvent::ResourceDown { resource } => {
                self.resources[resource].is_up = false;
                let lost = std::mem::take(&mut self.tasks_on_res[resource]);
                for &task in lost.iter() {
                    if let Some(slot) = self.task_slot[task].take() {
                        self.resources[resource].release_slot(slot);
                    }
                    self.scheduled[task] = false;
                }
                lost.into_iter().collect()
            }
            SimEvent::ResourceUp { resource } => {
                self.resources[resource].is_up = true;
                self.resources[resource].refill();
                Vec::new()
            }
        }
    }

    fn release(&mut self, task: usize, resource: usize) {
        self.tasks_on_res[resource].remove(&task);
        if let Some(slot) = self.task_slot[task].take() {
            self.resources[resource].release_slot(slot);
        }
    }
}
