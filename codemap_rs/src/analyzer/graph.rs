use std::collections::{BTreeMap, HashMap};

use crate::types::DependencyEdge;

use super::cycles;

/// Adjacency-list graph over root-relative file identifiers.
///
/// Only internal edges become arcs. External edges are kept on the side for
/// reporting and never take part in cycle detection. Node order is the order
/// in which identifiers first appear in the edge list, and each node's
/// targets keep first-seen order without duplicates.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<usize>>,
    external: Vec<DependencyEdge>,
}

impl DependencyGraph {
    pub fn build(edges: &[DependencyEdge]) -> Self {
        let mut graph = Self::default();
        for edge in edges {
            if edge.is_external {
                graph.external.push(edge.clone());
            } else {
                graph.add_arc(&edge.from, &edge.to);
            }
        }
        graph
    }

    pub fn add_arc(&mut self, from: &str, to: &str) {
        let from = self.intern(from);
        let to = self.intern(to);
        let targets = &mut self.adjacency[from];
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    fn intern(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id.to_string());
        self.index.insert(id.to_string(), idx);
        self.adjacency.push(Vec::new());
        idx
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Ordered targets of `id`; empty for unknown nodes and leaves.
    pub fn targets(&self, id: &str) -> Vec<&str> {
        self.index
            .get(id)
            .map(|&idx| {
                self.adjacency[idx]
                    .iter()
                    .map(|&t| self.nodes[t].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Files that import `id` directly.
    pub fn importers_of(&self, id: &str) -> Vec<&str> {
        let Some(&target) = self.index.get(id) else {
            return Vec::new();
        };
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, targets)| targets.contains(&target))
            .map(|(from, _)| self.nodes[from].as_str())
            .collect()
    }

    /// Plain `file -> [targets]` view, only for nodes with outgoing arcs.
    pub fn to_adjacency_map(&self) -> BTreeMap<String, Vec<String>> {
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, targets)| !targets.is_empty())
            .map(|(idx, targets)| {
                (
                    self.nodes[idx].clone(),
                    targets.iter().map(|&t| self.nodes[t].clone()).collect(),
                )
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn arc_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn external_edges(&self) -> &[DependencyEdge] {
        &self.external
    }

    /// One cycle per back-edge met during a single depth-first pass.
    /// See [`cycles::detect_cycles`].
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        cycles::detect_cycles(self)
    }

    pub(crate) fn successors(&self, idx: usize) -> &[usize] {
        &self.adjacency[idx]
    }

    pub(crate) fn node(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeKind;

    #[test]
    fn external_edges_are_not_arcs() {
        let edges = vec![
            DependencyEdge::local("a.ts", "b.ts".into(), EdgeKind::Import),
            DependencyEdge::external("a.ts", "react", EdgeKind::Import),
            DependencyEdge::local("a.ts", "b.ts".into(), EdgeKind::Require),
            DependencyEdge::local("b.ts", "c.ts".into(), EdgeKind::Import),
        ];
        let graph = DependencyGraph::build(&edges);
        assert_eq!(graph.nodes(), &["a.ts", "b.ts", "c.ts"]);
        assert_eq!(graph.targets("a.ts"), vec!["b.ts"]);
        assert_eq!(graph.arc_count(), 2);
        assert!(!graph.contains("react"));
        assert_eq!(graph.external_edges().len(), 1);
        assert_eq!(graph.importers_of("c.ts"), vec!["b.ts"]);
        assert!(graph.targets("missing").is_empty());

        let map = graph.to_adjacency_map();
        assert_eq!(map.len(), 2);
        assert_eq!(map["b.ts"], vec!["c.ts".to_string()]);
    }
}
