use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Contains metrics collected from a simulation run.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct RunStats {
    /// Makespan expected by the scheduling algorithm (for planning algorithms only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_makespan: Option<f64>,
    /// Completion time of the last task.
    pub makespan: f64,
    pub completed_tasks: usize,
    pub total_tasks: usize,
    /// Number of failed task attempts.
    pub task_failures: usize,
    /// Number of task attempts lost because their resource went down.
    pub lost_tasks: usize,
    /// Number of queued events discarded because their task was lost.
    pub invalidated_events: u64,
    /// Total execution time of all task attempts, including failed and lost ones.
    pub total_task_time: f64,
    /// Maximum number of slots in use at once over all resources.
    pub max_used_slots: usize,
    pub completion_time: Vec<Option<f64>>,
    pub task_location: Vec<Option<usize>>,

    #[serde(skip)]
    task_starts: HashMap<usize, f64>,
    #[serde(skip)]
    current_slots: usize,
}

impl RunStats {
    pub fn new(total_tasks: usize) -> Self {
        Self {
            total_tasks,
            completion_time: vec![None; total_tasks],
            task_location: vec![None; total_tasks],
            ..Default::default()
        }
    }

    pub fn set_expected_makespan(&mut self, makespan: Option<f64>) {
        self.expected_makespan = makespan;
    }

    pub fn set_task_dispatch(&mut self) {
        self.current_slots += 1;
        self.max_used_slots = self.max_used_slots.max(self.current_slots);
    }

    pub fn set_task_start(&mut self, task: usize, time: f64) {
        self.task_starts.insert(task, time);
    }

    pub fn set_task_finish(&mut self, task: usize, resource: usize, time: f64) {
        self.end_attempt(task, time);
        self.completed_tasks += 1;
        self.completion_time[task] = Some(time);
        self.task_location[task] = Some(resource);
        self.makespan = self.makespan.max(time);
    }

    pub fn set_task_failed(&mut self, task: usize, time: f64) {
        self.end_attempt(task, time);
        self.task_failures += 1;
    }

    pub fn set_task_lost(&mut self, task: usize, time: f64) {
        self.end_attempt(task, time);
        self.lost_tasks += 1;
    }

    pub fn set_invalidated_events(&mut self, count: u64) {
        self.invalidated_events = count;
    }

    fn end_attempt(&mut self, task: usize, time: f64) {
        self.current_slots -= 1;
        if let Some(start) = self.task_starts.remove(&task) {
            self.total_task_time += time - start;
        }
    }
}
