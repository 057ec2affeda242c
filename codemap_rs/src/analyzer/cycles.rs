//! Circular import detection.
//!
//! A single depth-first pass over the internal arcs. Every back-edge (an arc
//! into a node still on the current path) reports the path slice from that
//! node to the current one. That is one cycle per back-edge, not an
//! enumeration of all elementary cycles, and the same ring is reported once.

use crate::types::DependencyEdge;

use super::graph::DependencyGraph;

/// Convenience wrapper: build the graph from `edges` and detect its cycles.
pub fn find_cycles(edges: &[DependencyEdge]) -> Vec<Vec<String>> {
    DependencyGraph::build(edges).detect_cycles()
}

/// Iterative DFS so deep import chains cannot blow the stack.
///
/// Roots are visited in node insertion order; a node finished under one root
/// is never re-entered. A self-loop yields a single-node cycle.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let n = graph.node_count();
    let mut visited = vec![false; n];
    // Position of each node on the current path, if it is on it.
    let mut on_path: Vec<Option<usize>> = vec![None; n];
    let mut path: Vec<usize> = Vec::new();
    let mut cycles = Vec::new();

    for root in 0..n {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        on_path[root] = Some(0);
        path.push(root);
        // (node, index of the next successor to look at)
        let mut frames: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(&(node, next)) = frames.last() {
            let successors = graph.successors(node);
            if next >= successors.len() {
                frames.pop();
                path.pop();
                on_path[node] = None;
                continue;
            }

            let top = frames.len() - 1;
            frames[top].1 += 1;
            let target = successors[next];

            if let Some(start) = on_path[target] {
                cycles.push(path[start..].iter().map(|&i| graph.node(i).to_string()).collect());
            } else if !visited[target] {
                visited[target] = true;
                on_path[target] = Some(path.len());
                path.push(target);
                frames.push((target, 0));
            }
        }
    }

    cycles
}

/// One-line rendering, long rings collapsed in the middle.
pub fn format_cycle(cycle: &[String]) -> String {
    let Some(first) = cycle.first() else {
        return String::new();
    };
    if cycle.len() > 12 {
        format!(
            "{} -> ... ({} intermediate) ... -> {} -> {}",
            cycle[..5].join(" -> "),
            cycle.len() - 10,
            cycle[cycle.len() - 5..].join(" -> "),
            first
        )
    } else {
        format!("{} -> {}", cycle.join(" -> "), first)
    }
}
