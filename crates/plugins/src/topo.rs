//! Incremental topological ordering.
//!
//! Nodes are added one at a time, each with a group name and the groups it
//! must come after. Constraints pointing at groups that were not added (yet)
//! are ignored until such a group shows up. Every insertion re-sorts the
//! whole list, so the node that makes the constraints unsatisfiable is the
//! one rejected. Among nodes that are ready, the one inserted first wins,
//! which keeps the order deterministic.

use std::collections::HashMap;

/// The constraints can no longer be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CycleError;

struct Node<T> {
    group: String,
    after: Vec<String>,
    value: T,
}

pub(crate) struct Topo<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Topo<T> {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add `value` in `group`, ordered after every node in `after`.
    ///
    /// On a cycle the node is not kept and the previous order stands.
    pub(crate) fn add(
        &mut self,
        value: T,
        group: impl Into<String>,
        after: Vec<String>,
    ) -> Result<(), CycleError> {
        self.nodes.push(Node {
            group: group.into(),
            after,
            value,
        });

        if self.sort().is_none() {
            self.nodes.pop();
            return Err(CycleError);
        }
        Ok(())
    }

    /// Node indices in a valid order, or `None` when there is a cycle.
    fn sort(&self) -> Option<Vec<usize>> {
        let mut groups: HashMap<&str, Vec<usize>> = HashMap::new();
        for (seq, node) in self.nodes.iter().enumerate() {
            groups.entry(node.group.as_str()).or_default().push(seq);
        }

        let predecessors: Vec<Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                node.after
                    .iter()
                    .filter_map(|group| groups.get(group.as_str()))
                    .flatten()
                    .copied()
                    .collect()
            })
            .collect();

        let mut placed = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let next = (0..self.nodes.len()).find(|&seq| {
                !placed[seq] && predecessors[seq].iter().all(|&pred| placed[pred])
            })?;
            placed[next] = true;
            order.push(next);
        }

        Some(order)
    }

    /// Consume the structure, returning values in sorted order.
    pub(crate) fn into_sorted(self) -> Vec<T> {
        let order = self.sort().unwrap_or_default();
        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|node| Some(node.value)).collect();
        order
            .into_iter()
            .filter_map(|seq| slots.get_mut(seq).and_then(Option::take))
            .collect()
    }
}
