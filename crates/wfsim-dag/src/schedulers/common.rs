use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::resource::Resource;
use crate::scheduler::{Action, SchedulerState, Settings};
use crate::workflow::Workflow;

/// Lower bound for task weight used in estimates, keeps every planned duration positive.
pub const MIN_TASK_WEIGHT: f64 = 1e-3;
/// Fraction of the resource dispatch delay accounted in duration estimates.
pub const DELAY_DAMPING: f64 = 0.55;

/// Costs seen by a planning scheduler.
pub trait CostModel {
    fn task_weight(&self, workflow: &Workflow, task: usize) -> f64 {
        workflow.task(task).weight
    }

    fn data_weight(&self, weight: f64) -> f64 {
        weight
    }

    fn speed(&self, resource: &Resource) -> f64 {
        resource.speed
    }

    fn delay(&self, resource: &Resource) -> f64 {
        resource.delay
    }
}

/// True costs taken from the workflow and resources.
pub struct ExactCosts;

impl CostModel for ExactCosts {}

#[derive(Clone, Copy, Debug)]
pub struct Interval {
    pub start: f64,
    pub finish: f64,
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then(self.finish.total_cmp(&other.finish))
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Interval {}

/// Busy intervals of a single resource slot.
///
/// Always contains the sentinel interval `(-1, free_from)`, so there is an interval before any ready time.
#[derive(Clone, Debug)]
pub struct Timeline {
    intervals: BTreeSet<Interval>,
}

impl Timeline {
    pub fn new(free_from: f64) -> Self {
        let mut intervals = BTreeSet::new();
        intervals.insert(Interval {
            start: -1.,
            finish: free_from,
        });
        Self { intervals }
    }

    /// Returns the earliest start time not before `ready_time` at which the slot is free for `duration`.
    pub fn earliest_start(&self, ready_time: f64, duration: f64) -> f64 {
        let key = Interval {
            start: ready_time,
            finish: -1.,
        };
        let mut current = self.intervals.range(..key).next_back().copied().unwrap_or(Interval {
            start: -1.,
            finish: 0.,
        });
        for next in self.intervals.range(key..) {
            if ready_time.max(current.finish) + duration >= next.start {
                current = *next;
            } else {
                break;
            }
        }
        ready_time.max(current.finish)
    }

    pub fn insert(&mut self, start: f64, finish: f64) {
        self.intervals.insert(Interval { start, finish });
    }

    /// Returns booked intervals without the sentinel.
    pub fn intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().skip(1)
    }
}

/// Entry of a slot queue: task and its planned start time.
#[derive(Clone, Copy, Debug)]
pub struct ScheduledTask {
    pub start_time: f64,
    pub task: usize,
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_time
            .total_cmp(&other.start_time)
            .then(self.task.cmp(&other.task))
    }
}

impl PartialEq for ScheduledTask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledTask {}

/// Placement of a task in a plan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedTask {
    pub resource: usize,
    pub slot: usize,
    pub est: f64,
    pub eft: f64,
}

/// Returns the average time of processing a unit of weight over all resource slots.
pub fn average_resource_time<C: CostModel>(resources: &[Resource], costs: &C) -> f64 {
    let total_slots = resources.iter().map(|r| r.slots).sum::<usize>();
    if total_slots == 0 {
        return 1.;
    }
    resources
        .iter()
        .map(|r| r.slots as f64 / costs.speed(r))
        .sum::<f64>()
        / total_slots as f64
}

/// Computes upward ranks: the longest weighted path from each task to any sink.
///
/// Uses an explicit stack instead of recursion, `None` marks tasks whose rank is not computed yet.
pub fn calc_ranks<C: CostModel>(
    workflow: &Workflow,
    successors: &[Vec<(usize, f64)>],
    resources: &[Resource],
    settings: &Settings,
    costs: &C,
) -> Vec<f64> {
    let total_tasks = workflow.task_count();
    let avg_resource_time = average_resource_time(resources, costs);
    let mut ranks: Vec<Option<f64>> = vec![None; total_tasks];
    let mut on_stack = vec![false; total_tasks];
    let mut next_child = vec![0; total_tasks];
    let mut stack = Vec::new();

    for root in 0..total_tasks {
        if ranks[root].is_some() {
            continue;
        }
        stack.push(root);
        on_stack[root] = true;
        while let Some(&v) = stack.last() {
            if let Some(&(succ, _)) = successors[v].get(next_child[v]) {
                next_child[v] += 1;
                if ranks[succ].is_none() && !on_stack[succ] {
                    stack.push(succ);
                    on_stack[succ] = true;
                }
                continue;
            }
            stack.pop();
            on_stack[v] = false;
            let mut rank: f64 = 0.;
            for &(succ, weight) in successors[v].iter() {
                let transfer = settings.transfer_time(costs.data_weight(weight));
                rank = rank.max(transfer + ranks[succ].unwrap_or(0.));
            }
            rank += costs.task_weight(workflow, v).max(MIN_TASK_WEIGHT) * avg_resource_time;
            ranks[v] = Some(rank);
        }
    }

    ranks.into_iter().map(|rank| rank.unwrap_or(0.)).collect()
}

/// Earliest-finish-time list planner with per-slot interval packing.
///
/// Keeps the current plan of every task, and for every resource slot the queue of tasks planned on it
/// in the order of planned start times.
pub struct ListPlanner {
    pub plan: Vec<Option<PlannedTask>>,
    pub task_eft: Vec<f64>,
    pub queues: Vec<Vec<BTreeSet<ScheduledTask>>>,
    pub slot_free_time: Vec<Vec<f64>>,
    timelines: Vec<Vec<Timeline>>,
}

impl ListPlanner {
    pub fn new(task_count: usize, resources: &[Resource]) -> Self {
        Self {
            plan: vec![None; task_count],
            task_eft: vec![0.; task_count],
            queues: resources
                .iter()
                .map(|r| (0..r.slots).map(|_| BTreeSet::new()).collect())
                .collect(),
            slot_free_time: resources.iter().map(|r| vec![0.; r.slots]).collect(),
            timelines: resources
                .iter()
                .map(|r| (0..r.slots).map(|_| Timeline::new(0.)).collect())
                .collect(),
        }
    }

    /// Estimated time of running the task on the resource, including input transfers.
    pub fn task_time<C: CostModel>(
        &self,
        task: usize,
        resource: &Resource,
        workflow: &Workflow,
        settings: &Settings,
        costs: &C,
    ) -> f64 {
        let mut transfer_time: f64 = 0.;
        for &(pred, weight) in workflow.predecessors(task).iter() {
            if settings.optimize_transfers && self.plan[pred].map(|p| p.resource) == Some(resource.id) {
                continue;
            }
            transfer_time = transfer_time.max(settings.transfer_time(costs.data_weight(weight)));
        }
        let weight = costs.task_weight(workflow, task).max(MIN_TASK_WEIGHT);
        transfer_time + weight / costs.speed(resource) + costs.delay(resource) * DELAY_DAMPING
    }

    /// Rebuilds the plan for all tasks not matching `skip`, in decreasing rank order.
    ///
    /// Each task goes to the (resource, slot) pair where it can start earliest; ties go to the earlier finish,
    /// then to the lowest resource id and slot. Returns the planned makespan.
    pub fn build<C, F>(
        &mut self,
        workflow: &Workflow,
        resources: &[Resource],
        settings: &Settings,
        costs: &C,
        ranks: &[f64],
        current_time: f64,
        skip: F,
    ) -> f64
    where
        C: CostModel,
        F: Fn(usize) -> bool,
    {
        for (resource, slots) in self.timelines.iter_mut().enumerate() {
            for (slot, timeline) in slots.iter_mut().enumerate() {
                *timeline = Timeline::new(self.slot_free_time[resource][slot]);
                self.queues[resource][slot].clear();
            }
        }

        let mut tasks = (0..workflow.task_count()).filter(|&t| !skip(t)).collect::<Vec<_>>();
        tasks.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));

        let mut makespan: f64 = 0.;
        for task in tasks.into_iter() {
            let ready_time = workflow
                .predecessors(task)
                .iter()
                .map(|&(pred, _)| self.task_eft[pred])
                .fold(current_time, f64::max);

            let mut best: Option<(f64, f64, usize, usize)> = None;
            for resource in resources.iter().filter(|r| r.is_up) {
                let time = self.task_time(task, resource, workflow, settings, costs);
                for (slot, timeline) in self.timelines[resource.id].iter().enumerate() {
                    let start = timeline.earliest_start(ready_time, time);
                    let better = match best {
                        None => true,
                        Some((best_start, best_finish, _, _)) => {
                            start < best_start || (start == best_start && start + time < best_finish)
                        }
                    };
                    if better {
                        best = Some((start, start + time, resource.id, slot));
                    }
                }
            }

            let Some((start, finish, resource, slot)) = best else {
                self.plan[task] = None;
                continue;
            };
            self.timelines[resource][slot].insert(start, finish);
            self.queues[resource][slot].insert(ScheduledTask { start_time: start, task });
            self.plan[task] = Some(PlannedTask {
                resource,
                slot,
                est: start,
                eft: finish,
            });
            self.task_eft[task] = finish;
            makespan = makespan.max(finish);
        }
        makespan
    }

    /// Returns the busy intervals of a slot from the last plan.
    pub fn timeline(&self, resource: usize, slot: usize) -> &Timeline {
        &self.timelines[resource][slot]
    }

    /// Puts the task back into the queue of its planned slot.
    pub fn requeue(&mut self, task: usize) {
        if let Some(planned) = self.plan[task] {
            self.queues[planned.resource][planned.slot].insert(ScheduledTask {
                start_time: planned.est,
                task,
            });
        }
    }

    /// Starts queue heads whose dependencies are done on free slots of up resources.
    pub fn dispatch<C: CostModel>(&mut self, state: &mut SchedulerState, costs: &C) -> Vec<Action> {
        let mut actions = Vec::new();
        for resource in 0..state.resources.len() {
            if !state.resources[resource].is_up {
                continue;
            }
            for slot in 0..state.resources[resource].slots {
                if !state.resources[resource].is_slot_free(slot) {
                    continue;
                }
                let Some(&head) = self.queues[resource][slot].first() else {
                    continue;
                };
                if !state.is_ready(head.task) {
                    continue;
                }
                self.queues[resource][slot].remove(&head);
                state.resources[resource].take_exact_slot(slot);
                let time =
                    self.task_time(head.task, &state.resources[resource], &state.workflow, &state.settings, costs);
                let eft = state.current_time + time;
                self.task_eft[head.task] = eft;
                self.slot_free_time[resource][slot] = eft;
                // the planned start is kept as the queue key for requeueing
                self.plan[head.task] = Some(PlannedTask {
                    resource,
                    slot,
                    est: head.start_time,
                    eft,
                });
                actions.push(state.dispatch(head.task, resource, slot));
            }
        }
        actions
    }
}
