use std::rc::Rc;

use wfsim_core::{log_debug, log_info};

use crate::event::{Event, SimEvent};
use crate::resource::Resource;
use crate::scheduler::{Action, Scheduler, SchedulerState, Settings};
use crate::scheduler_resolver::SchedulerParams;
use crate::schedulers::common::{calc_ranks, CostModel, ListPlanner};
use crate::schedulers::equivalence::structural_classes;
use crate::workflow::Workflow;

/// Task costs learned from observed durations.
///
/// With a hidden profile the planner sees unit task and data weights, unit speeds and zero delays
/// until durations of finished tasks are observed. A task is then estimated by the mean duration of its
/// structural class, or by the mean over all observations if its class was never seen.
#[derive(Clone, Debug, Default)]
pub struct LearnedCosts {
    hide_profile: bool,
    classes: Vec<usize>,
    class_stats: Vec<(f64, u32)>,
    global_stats: (f64, u32),
}

impl LearnedCosts {
    pub fn new(hide_profile: bool, classes: Vec<usize>) -> Self {
        let class_count = classes.iter().map(|&c| c + 1).max().unwrap_or(0);
        Self {
            hide_profile,
            classes,
            class_stats: vec![(0., 0); class_count],
            global_stats: (0., 0),
        }
    }

    pub fn observe(&mut self, task: usize, duration: f64) {
        let stats = &mut self.class_stats[self.classes[task]];
        stats.0 += duration;
        stats.1 += 1;
        self.global_stats.0 += duration;
        self.global_stats.1 += 1;
    }

    /// Mean observed duration for the task, `None` if nothing was observed yet.
    pub fn estimate(&self, task: usize) -> Option<f64> {
        let (sum, count) = self.class_stats[self.classes[task]];
        if count > 0 {
            return Some(sum / count as f64);
        }
        let (sum, count) = self.global_stats;
        if count > 0 {
            return Some(sum / count as f64);
        }
        None
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }
}

impl CostModel for LearnedCosts {
    fn task_weight(&self, workflow: &Workflow, task: usize) -> f64 {
        if self.hide_profile {
            self.estimate(task).unwrap_or(1.)
        } else {
            workflow.task(task).weight
        }
    }

    fn data_weight(&self, weight: f64) -> f64 {
        if self.hide_profile {
            1.
        } else {
            weight
        }
    }

    fn speed(&self, resource: &Resource) -> f64 {
        if self.hide_profile {
            1.
        } else {
            resource.speed
        }
    }

    fn delay(&self, resource: &Resource) -> f64 {
        if self.hide_profile {
            0.
        } else {
            resource.delay
        }
    }
}

/// HEFT with continuous replanning and online cost learning.
///
/// The plan of all not yet dispatched tasks is rebuilt after every change of the state, and ranks are
/// recomputed after every completion from the updated duration estimates. Tasks lost with a failed
/// resource simply go back to planning.
pub struct AdaptiveScheduler {
    state: SchedulerState,
    planner: ListPlanner,
    costs: LearnedCosts,
    successors: Vec<Vec<(usize, f64)>>,
    ranks: Vec<f64>,
    start_times: Vec<Option<f64>>,
    hide_profile: bool,
    expected_makespan: Option<f64>,
}

impl AdaptiveScheduler {
    pub fn new(hide_profile: bool) -> Self {
        Self {
            state: SchedulerState::new("adaptive"),
            planner: ListPlanner::new(0, &[]),
            costs: LearnedCosts::default(),
            successors: Vec::new(),
            ranks: Vec::new(),
            start_times: Vec::new(),
            hide_profile,
            expected_makespan: None,
        }
    }

    /// Reads the optional `hide_profile` flag (true by default), returns `None` if it is malformed.
    pub fn from_scheduler_params(params: &SchedulerParams) -> Option<Self> {
        Some(Self::new(params.get_or("hide_profile", true)?))
    }

    pub fn ranks(&self) -> &[f64] {
        &self.ranks
    }

    pub fn costs(&self) -> &LearnedCosts {
        &self.costs
    }

    pub fn planner(&self) -> &ListPlanner {
        &self.planner
    }

    fn update_ranks(&mut self) {
        self.ranks = calc_ranks(
            &self.state.workflow,
            &self.successors,
            &self.state.resources,
            &self.state.settings,
            &self.costs,
        );
    }

    fn replan(&mut self) -> f64 {
        let state = &self.state;
        self.planner.build(
            &state.workflow,
            &state.resources,
            &state.settings,
            &self.costs,
            &self.ranks,
            state.current_time,
            |task| state.scheduled[task] || state.completed[task],
        )
    }
}

impl Default for AdaptiveScheduler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Scheduler for AdaptiveScheduler {
    fn init(&mut self, workflow: Rc<Workflow>, resources: Vec<Resource>, settings: &Settings) -> Vec<Action> {
        self.state.init(workflow.clone(), resources, settings);
        self.planner = ListPlanner::new(workflow.task_count(), &self.state.resources);
        self.costs = LearnedCosts::new(self.hide_profile, structural_classes(&workflow));
        self.successors = workflow.successors();
        self.start_times = vec![None; workflow.task_count()];
        log_debug!(
            self.state,
            "{} structural classes for {} tasks",
            self.costs.class_stats.len(),
            workflow.task_count()
        );
        self.update_ranks();
        let makespan = self.replan();
        log_info!(self.state, "expected makespan: {:.3}", makespan);
        self.expected_makespan = Some(makespan);
        self.planner.dispatch(&mut self.state, &self.costs)
    }

    fn notify(&mut self, event: &Event) -> Vec<Action> {
        let unscheduled = self.state.apply(event);
        match event.data {
            SimEvent::TaskStarted { task, .. } => {
                self.start_times[task] = Some(event.time);
                return Vec::new();
            }
            SimEvent::TaskFinished { task, .. } => {
                if let Some(start) = self.start_times[task].take() {
                    self.costs.observe(task, event.time - start);
                }
                self.planner.task_eft[task] = event.time;
                if let Some(planned) = self.planner.plan[task] {
                    self.planner.slot_free_time[planned.resource][planned.slot] = event.time;
                }
                self.update_ranks();
            }
            SimEvent::TaskFailed { task, .. } => {
                self.start_times[task] = None;
                if let Some(planned) = self.planner.plan[task] {
                    self.planner.slot_free_time[planned.resource][planned.slot] = event.time;
                }
            }
            SimEvent::ResourceDown { .. } => {
                for task in unscheduled {
                    self.start_times[task] = None;
                }
            }
            SimEvent::ResourceUp { resource } => {
                self.planner.slot_free_time[resource] = vec![event.time; self.state.resources[resource].slots];
            }
        }
        self.replan();
        self.planner.dispatch(&mut self.state, &self.costs)
    }

    fn name(&self) -> &str {
        self.state.name()
    }

    fn expected_makespan(&self) -> Option<f64> {
        self.expected_makespan
    }
}
