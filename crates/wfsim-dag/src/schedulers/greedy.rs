use std::rc::Rc;

use wfsim_core::log_debug;

use crate::event::Event;
use crate::resource::Resource;
use crate::scheduler::{Action, Scheduler, SchedulerState, Settings};
use crate::workflow::Workflow;

/// Assigns every ready task to the first resource which is up and has a free slot.
///
/// Tasks are scanned in id order, no durations are estimated. Failed tasks and tasks lost with a failed
/// resource become ready again and are retried on the next pass.
pub struct GreedyScheduler {
    state: SchedulerState,
}

impl GreedyScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::new("greedy"),
        }
    }

    fn assign_available(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for task in 0..self.state.task_count() {
            if !self.state.is_ready(task) {
                continue;
            }
            for resource in 0..self.state.resources.len() {
                if !self.state.resources[resource].is_up {
                    continue;
                }
                if let Some(slot) = self.state.resources[resource].take_slot() {
                    log_debug!(self.state, "scheduling task {} on resource {}", task, resource);
                    actions.push(self.state.dispatch(task, resource, slot));
                    break;
                }
            }
        }
        actions
    }
}

impl Default for GreedyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for GreedyScheduler {
    fn init(&mut self, workflow: Rc<Workflow>, resources: Vec<Resource>, settings: &Settings) -> Vec<Action> {
        self.state.init(workflow, resources, settings);
        self.assign_available()
    }

    fn notify(&mut self, event: &Event) -> Vec<Action> {
        self.state.apply(event);
        self.assign_available()
    }

    fn name(&self) -> &str {
        self.state.name()
    }
}
