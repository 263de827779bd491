use std::rc::Rc;

use wfsim_core::{log_debug, log_info};

use crate::event::{Event, SimEvent};
use crate::resource::Resource;
use crate::scheduler::{Action, Scheduler, SchedulerState, Settings};
use crate::schedulers::common::{calc_ranks, ExactCosts, ListPlanner, ScheduledTask};
use crate::workflow::Workflow;

/// Static HEFT scheduler.
///
/// Builds the full plan once in [`init`](Scheduler::init) and then only follows it: each slot runs its planned
/// tasks in the order of planned start times. Failed tasks return to their planned slot. When a resource goes
/// down, its in-flight and pending tasks are moved to the least loaded slots of the remaining resources;
/// the plan itself is never rebuilt.
pub struct HeftScheduler {
    state: SchedulerState,
    planner: ListPlanner,
    ranks: Vec<f64>,
    expected_makespan: Option<f64>,
}

impl HeftScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::new("heft"),
            planner: ListPlanner::new(0, &[]),
            ranks: Vec::new(),
            expected_makespan: None,
        }
    }

    /// Returns the planner with the current plan.
    pub fn planner(&self) -> &ListPlanner {
        &self.planner
    }

    pub fn ranks(&self) -> &[f64] {
        &self.ranks
    }

    fn plan(&mut self) {
        let workflow = self.state.workflow.clone();
        self.planner = ListPlanner::new(workflow.task_count(), &self.state.resources);
        self.ranks = calc_ranks(
            &workflow,
            &workflow.successors(),
            &self.state.resources,
            &self.state.settings,
            &ExactCosts,
        );
        let makespan = self.planner.build(
            &workflow,
            &self.state.resources,
            &self.state.settings,
            &ExactCosts,
            &self.ranks,
            self.state.current_time,
            |_| false,
        );
        for (task, planned) in self.planner.plan.iter().enumerate() {
            if let Some(planned) = planned {
                log_debug!(
                    self.state,
                    "scheduling [heft] task {} on resource {} slot {} on time {:.3}-{:.3}",
                    task,
                    planned.resource,
                    planned.slot,
                    planned.est,
                    planned.eft
                );
            }
        }
        log_info!(self.state, "expected makespan: {:.3}", makespan);
        self.expected_makespan = Some(makespan);
    }

    // Moves every pending task of the resource to the least loaded slot among up resources,
    // keeping its planned start as the queue key.
    fn relocate(&mut self, resource: usize) {
        let mut load = Vec::new();
        for r in self.state.resources.iter().filter(|r| r.is_up) {
            for slot in 0..r.slots {
                let finish = self.planner.queues[r.id][slot]
                    .iter()
                    .filter_map(|entry| self.planner.plan[entry.task].map(|p| p.eft))
                    .fold(self.planner.slot_free_time[r.id][slot], f64::max);
                load.push((finish, r.id, slot));
            }
        }
        if load.is_empty() {
            return;
        }

        let mut entries = Vec::new();
        for queue in self.planner.queues[resource].iter_mut() {
            entries.extend(std::mem::take(queue));
        }
        entries.sort();
        for entry in entries.into_iter() {
            let index = load
                .iter()
                .enumerate()
                .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let (finish, target, slot) = load[index];
            let time = self.planner.task_time(
                entry.task,
                &self.state.resources[target],
                &self.state.workflow,
                &self.state.settings,
                &ExactCosts,
            );
            let est = entry.start_time.max(finish);
            if let Some(planned) = self.planner.plan[entry.task].as_mut() {
                planned.resource = target;
                planned.slot = slot;
                planned.eft = est + time;
            }
            self.planner.queues[target][slot].insert(ScheduledTask {
                start_time: entry.start_time,
                task: entry.task,
            });
            load[index].0 = est + time;
            log_debug!(
                self.state,
                "moving task {} from resource {} to resource {} slot {}",
                entry.task,
                resource,
                target,
                slot
            );
        }
    }
}

impl Default for HeftScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for HeftScheduler {
    fn init(&mut self, workflow: Rc<Workflow>, resources: Vec<Resource>, settings: &Settings) -> Vec<Action> {
        self.state.init(workflow, resources, settings);
        self.plan();
        self.planner.dispatch(&mut self.state, &ExactCosts)
    }

    fn notify(&mut self, event: &Event) -> Vec<Action> {
        let unscheduled = self.state.apply(event);
        match event.data {
            SimEvent::TaskFinished { task, .. } => {
                self.planner.task_eft[task] = event.time;
            }
            SimEvent::TaskFailed { .. } => {
                for task in unscheduled {
                    self.planner.requeue(task);
                }
            }
            SimEvent::ResourceDown { resource } => {
                for task in unscheduled {
                    self.planner.requeue(task);
                }
                self.relocate(resource);
            }
            SimEvent::TaskStarted { .. } | SimEvent::ResourceUp { .. } => {}
        }
        self.planner.dispatch(&mut self.state, &ExactCosts)
    }

    fn name(&self) -> &str {
        self.state.name()
    }

    fn expected_makespan(&self) -> Option<f64> {
        self.expected_makespan
    }
}
