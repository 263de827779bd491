//! Structural equivalence of workflow tasks.

use std::collections::HashMap;

use crate::workflow::Workflow;

fn class_id<K: std::hash::Hash + Eq>(ids: &mut HashMap<K, usize>, key: K) -> usize {
    let next = ids.len();
    *ids.entry(key).or_insert(next)
}

/// Partitions tasks into classes of structurally indistinguishable tasks.
///
/// Forward classes are assigned in topological order: tasks get the same class iff the multisets of their
/// predecessors' forward classes are equal (so all entry tasks share a class). Backward classes are assigned
/// in reverse order from the multisets of `(backward, forward)` classes of successors. The resulting class
/// is the pair of both, renumbered densely in the order of task ids.
///
/// The workflow must be acyclic.
pub fn structural_classes(workflow: &Workflow) -> Vec<usize> {
    let task_count = workflow.task_count();
    let order = workflow.topological_order();
    let successors = workflow.successors();

    let mut forward = vec![0; task_count];
    let mut forward_ids = HashMap::new();
    for &task in order.iter() {
        let mut key = workflow
            .predecessors(task)
            .iter()
            .map(|&(pred, _)| forward[pred])
            .collect::<Vec<_>>();
        key.sort_unstable();
        forward[task] = class_id(&mut forward_ids, key);
    }

    let mut backward = vec![0; task_count];
    let mut backward_ids = HashMap::new();
    for &task in order.iter().rev() {
        let mut key = successors[task]
            .iter()
            .map(|&(succ, _)| (backward[succ], forward[succ]))
            .collect::<Vec<_>>();
        key.sort_unstable();
        backward[task] = class_id(&mut backward_ids, key);
    }

    let mut ids = HashMap::new();
    (0..task_count)
        .map(|task| class_id(&mut ids, (forward[task], backward[task])))
        .collect()
}
