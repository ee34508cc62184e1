use std::collections::{BTreeMap, BTreeSet};

use super::domain::TaskId;

/// Which stage a task node executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageRole {
    Credentials,
    NationalImportance,
    Synthesis,
}

/// Node of the evaluation graph; edges point from dependencies to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNode {
    pub id: TaskId,
    pub role: StageRole,
    pub depends_on: Vec<TaskId>,
}

/// Directed acyclic graph of evaluation tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    /// Validated construction for hand-built graphs; production runs use [`TaskGraph::niw`].
    #[cfg(test)]
    pub(crate) fn new(nodes: Vec<TaskNode>) -> Result<Self, GraphError> {
        let graph = Self { nodes };
        graph.layers()?;
        Ok(graph)
    }

    /// Two independent producers (`task_1`, `task_2`) feeding one consumer (`task_3`).
    pub fn niw() -> Self {
        let credentials = TaskId::ordinal(1);
        let importance = TaskId::ordinal(2);
        Self {
            nodes: vec![
                TaskNode {
                    id: credentials.clone(),
                    role: StageRole::Credentials,
                    depends_on: Vec::new(),
                },
                TaskNode {
                    id: importance.clone(),
                    role: StageRole::NationalImportance,
                    depends_on: Vec::new(),
                },
                TaskNode {
                    id: TaskId::ordinal(3),
                    role: StageRole::Synthesis,
                    depends_on: vec![credentials, importance],
                },
            ],
        }
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, id: &TaskId) -> Option<&TaskNode> {
        self.nodes.iter().find(|node| &node.id == id)
    }

    /// Kahn layering: every node appears after all of its dependencies, and nodes in
    /// the same layer are mutually independent. Layer members keep declaration order.
    pub fn layers(&self) -> Result<Vec<Vec<&TaskNode>>, GraphError> {
        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(GraphError::DuplicateTask(node.id.clone()));
            }
        }

        let mut remaining: BTreeMap<&TaskId, usize> = BTreeMap::new();
        for node in &self.nodes {
            for dependency in &node.depends_on {
                if !seen.contains(dependency) {
                    return Err(GraphError::UnknownDependency {
                        task: node.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
            remaining.insert(&node.id, node.depends_on.len());
        }

        let mut layers = Vec::new();
        let mut placed = BTreeSet::new();
        while placed.len() < self.nodes.len() {
            let layer = self
                .nodes
                .iter()
                .filter(|node| !placed.contains(&node.id))
                .filter(|node| remaining.get(&node.id) == Some(&0))
                .collect::<Vec<_>>();

            if layer.is_empty() {
                let stuck = self
                    .nodes
                    .iter()
                    .filter(|node| !placed.contains(&node.id))
                    .map(|node| node.id.clone())
                    .collect();
                return Err(GraphError::Cycle(stuck));
            }

            for node in &layer {
                placed.insert(node.id.clone());
            }
            for node in &self.nodes {
                let resolved = node
                    .depends_on
                    .iter()
                    .filter(|dependency| layer.iter().any(|done| &done.id == *dependency))
                    .count();
                if let Some(count) = remaining.get_mut(&node.id) {
                    *count -= resolved;
                }
            }

            layers.push(layer);
        }

        Ok(layers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("task {0} is declared more than once")]
    DuplicateTask(TaskId),
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },
    #[error("tasks {0:?} form a dependency cycle")]
    Cycle(Vec<TaskId>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: usize, role: StageRole, depends_on: &[usize]) -> TaskNode {
        TaskNode {
            id: TaskId::ordinal(id),
            role,
            depends_on: depends_on.iter().copied().map(TaskId::ordinal).collect(),
        }
    }

    #[test]
    fn niw_graph_has_two_producers_and_one_join() {
        let graph = TaskGraph::niw();
        let layers = graph.layers().expect("acyclic");

        assert_eq!(layers.len(), 2);
        let first = layers[0].iter().map(|node| node.role).collect::<Vec<_>>();
        assert_eq!(first, vec![StageRole::Credentials, StageRole::NationalImportance]);
        assert_eq!(layers[1].len(), 1);
        assert_eq!(layers[1][0].role, StageRole::Synthesis);
        assert_eq!(layers[1][0].id.as_str(), "task_3");
    }

    #[test]
    fn rejects_cycles() {
        let result = TaskGraph::new(vec![
            node(1, StageRole::Credentials, &[2]),
            node(2, StageRole::NationalImportance, &[1]),
        ]);
        assert!(matches!(result, Err(GraphError::Cycle(stuck)) if stuck.len() == 2));
    }

    #[test]
    fn rejects_unknown_dependencies_and_duplicates() {
        assert!(matches!(
            TaskGraph::new(vec![node(1, StageRole::Synthesis, &[9])]),
            Err(GraphError::UnknownDependency { .. })
        ));
        assert!(matches!(
            TaskGraph::new(vec![
                node(1, StageRole::Credentials, &[]),
                node(1, StageRole::NationalImportance, &[]),
            ]),
            Err(GraphError::DuplicateTask(_))
        ));
    }
}
