//! Workflow model.

use serde::Serialize;

use crate::error::GraphError;

/// Represents a workflow task.
///
/// The weight is an abstract amount of work, task duration on a resource is `weight / speed`.
#[derive(Clone, Debug, Serialize)]
pub struct Task {
    pub id: usize,
    pub weight: f64,
}

/// Represents a workflow as a DAG of tasks connected by weighted data dependencies.
///
/// Dependencies are stored per task as a list of `(predecessor, data weight)` pairs:
/// a task can start only after all of its predecessors are completed.
#[derive(Clone, Debug, Default)]
pub struct Workflow {
    tasks: Vec<Task>,
    dependencies: Vec<Vec<(usize, f64)>>,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates workflow from task weights and per-task predecessor lists without validating them.
    ///
    /// Use [`check_correctness`](Self::check_correctness) before simulating such workflow.
    pub fn from_parts(weights: Vec<f64>, dependencies: Vec<Vec<(usize, f64)>>) -> Self {
        Self {
            tasks: weights
                .into_iter()
                .enumerate()
                .map(|(id, weight)| Task { id, weight })
                .collect(),
            dependencies,
        }
    }

    /// Adds a task with given weight, returns its id.
    pub fn add_task(&mut self, weight: f64) -> usize {
        let id = self.tasks.len();
        self.tasks.push(Task { id, weight });
        self.dependencies.push(Vec::new());
        id
    }

    /// Adds a dependency: `pred` must be completed before `succ` starts, `weight` units of data are transferred.
    pub fn add_dependency(&mut self, pred: usize, succ: usize, weight: f64) -> Result<(), GraphError> {
        if pred >= self.tasks.len() || succ >= self.dependencies.len() {
            return Err(GraphError::UnknownTask { pred, succ });
        }
        if weight < 0. {
            return Err(GraphError::NegativeWeight { weight });
        }
        self.dependencies[succ].push((pred, weight));
        Ok(())
    }

    pub fn task(&self, id: usize) -> &Task {
        &self.tasks[id]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(|d| d.len()).sum()
    }

    /// Returns `(predecessor, data weight)` pairs of the task.
    pub fn predecessors(&self, task: usize) -> &[(usize, f64)] {
        &self.dependencies[task]
    }

    /// Returns the inverted dependency lists: `(successor, data weight)` pairs for each task.
    pub fn successors(&self) -> Vec<Vec<(usize, f64)>> {
        let mut successors = vec![Vec::new(); self.tasks.len()];
        for (succ, deps) in self.dependencies.iter().enumerate() {
            for &(pred, weight) in deps.iter() {
                successors[pred].push((succ, weight));
            }
        }
        successors
    }

    /// Checks that workflow is a valid DAG.
    ///
    /// Numbers tasks in depth-first postorder over predecessor lists: for a valid edge `pred -> succ`
    /// the predecessor is always finished first, so `postorder(succ) <= postorder(pred)` means a cycle.
    pub fn check_correctness(&self) -> Result<(), GraphError> {
        if self.tasks.len() != self.dependencies.len() {
            return Err(GraphError::SizeMismatch {
                tasks: self.tasks.len(),
                dependencies: self.dependencies.len(),
            });
        }
        for task in self.tasks.iter() {
            if task.weight < 0. {
                return Err(GraphError::NegativeWeight { weight: task.weight });
            }
        }
        for (succ, deps) in self.dependencies.iter().enumerate() {
            for &(pred, weight) in deps.iter() {
                if pred >= self.tasks.len() {
                    return Err(GraphError::UnknownTask { pred, succ });
                }
                if weight < 0. {
                    return Err(GraphError::NegativeWeight { weight });
                }
            }
        }

        let postorder = self.postorder();
        for (succ, deps) in self.dependencies.iter().enumerate() {
            for &(pred, _) in deps.iter() {
                if postorder[succ] <= postorder[pred] {
                    return Err(GraphError::Cycle { pred, succ });
                }
            }
        }
        Ok(())
    }

    // Iterative DFS over predecessor lists, `next_child[v]` is the position in the list of v
    // to continue from when v is on top of the stack again.
    fn postorder(&self) -> Vec<usize> {
        let n = self.tasks.len();
        let mut visited = vec![false; n];
        let mut next_child = vec![0; n];
        let mut postorder = vec![0; n];
        let mut counter = 0;
        let mut stack = Vec::new();
        for root in 0..n {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            stack.push(root);
            while let Some(&v) = stack.last() {
                if let Some(&(pred, _)) = self.dependencies[v].get(next_child[v]) {
                    next_child[v] += 1;
                    if !visited[pred] {
                        visited[pred] = true;
                        stack.push(pred);
                    }
                } else {
                    stack.pop();
                    postorder[v] = counter;
                    counter += 1;
                }
            }
        }
        postorder
    }

    /// Returns tasks in topological order (predecessors first), ties broken by task id.
    ///
    /// The workflow must be acyclic, otherwise the tasks on cycles are missing from the result.
    pub fn topological_order(&self) -> Vec<usize> {
        let successors = self.successors();
        let mut in_degree = self.dependencies.iter().map(|d| d.len()).collect::<Vec<_>>();
        let mut ready = std::collections::BTreeSet::new();
        for (task, &degree) in in_degree.iter().enumerate() {
            if degree == 0 {
                ready.insert(task);
            }
        }
        let mut order = Vec::with_capacity(self.tasks.len());
        while let Some(task) = ready.pop_first() {
            order.push(task);
            for &(succ, _) in successors[task].iter() {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.insert(succ);
                }
            }
        }
        order
    }

    /// Returns the diamond workflow: `0 -> {1, 2} -> 3` with weights 2, 4, 5, 3.
    pub fn diamond() -> Self {
        Self::from_parts(
            vec![2., 4., 5., 3.],
            vec![vec![], vec![(0, 1.)], vec![(0, 1.)], vec![(1, 1.), (2, 1.)]],
        )
    }

    /// Returns the 10-task sample workflow from the HEFT paper by Topcuoglu et al.
    pub fn topcuoglu() -> Self {
        let weights = vec![14., 13., 11., 13., 12., 13., 7., 5., 18., 21.];
        let edges = [
            (0, 1, 18.),
            (0, 2, 12.),
            (0, 3, 9.),
            (0, 4, 11.),
            (0, 5, 14.),
            (1, 7, 19.),
            (1, 8, 16.),
            (2, 6, 23.),
            (3, 7, 27.),
            (3, 8, 23.),
            (4, 8, 13.),
            (5, 7, 15.),
            (6, 9, 17.),
            (7, 9, 11.),
            (8, 9, 13.),
        ];
        let mut dependencies = vec![Vec::new(); weights.len()];
        for (pred, succ, weight) in edges {
            dependencies[succ].push((pred, weight));
        }
        Self::from_parts(weights, dependencies)
    }
}
