//! Circular-reference analysis over the bundle dependency graph.
//!
//! A bundle may reference content in another bundle, but a reference cycle
//! would make load ordering impossible, so a cycle anywhere in a variant's
//! dependency map is fatal. Detection is an iterative pruning pass: every
//! bundle whose remaining dependency list is empty is removed and struck
//! from the other bundles' lists, repeated to a fixed point. Whatever
//! survives participates in at least one cycle and is reported together
//! with its residual dependencies as evidence.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

/// Bundles that survived pruning, each with its residual dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
  pub participants: Vec<(String, Vec<String>)>,
}

impl std::fmt::Display for CycleReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    for (bundle, residual) in &self.participants {
      writeln!(f, "  {} -> [{}]", bundle, residual.join(", "))?;
    }
    Ok(())
  }
}

/// Errors from dependency-graph analysis.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("circular bundle references detected:\n{0}")]
  Cycle(CycleReport),
}

/// Transient graph built from one manifest's dependency map.
///
/// Nodes are bundle names, edges run from a dependency to its dependent.
/// Dependencies naming a bundle outside the map are treated as external and
/// carry no edge; they cannot participate in a cycle among these bundles.
pub struct DependencyGraph {
  graph: DiGraph<String, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
  /// Build a graph from a `bundle -> [dependency, ...]` map.
  pub fn from_dependencies(dependencies: &BTreeMap<String, Vec<String>>) -> Self {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for name in dependencies.keys() {
      let idx = graph.add_node(name.clone());
      nodes.insert(name.clone(), idx);
    }

    for (name, deps) in dependencies {
      let dependent_idx = nodes[name];
      for dep in deps {
        if let Some(&dep_idx) = nodes.get(dep) {
          // Edge from dependency to dependent
          graph.add_edge(dep_idx, dependent_idx, ());
        }
      }
    }

    Self { graph, nodes }
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Prune zero-dependency bundles to a fixed point and fail on a residue.
  ///
  /// Worst case O(V·E) with the naive rescan per pass, which is fine at the
  /// expected graph sizes (low hundreds of bundles).
  pub fn check_acyclic(&self) -> Result<(), GraphError> {
    let mut remaining: HashSet<NodeIndex> = self.graph.node_indices().collect();

    loop {
      let ready: Vec<NodeIndex> = remaining
        .iter()
        .filter(|&&idx| {
          self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .all(|dep| !remaining.contains(&dep))
        })
        .copied()
        .collect();

      if ready.is_empty() {
        break;
      }
      for idx in ready {
        remaining.remove(&idx);
      }
    }

    if remaining.is_empty() {
      return Ok(());
    }

    let mut participants: Vec<(String, Vec<String>)> = remaining
      .iter()
      .map(|&idx| {
        let mut residual: Vec<String> = self
          .graph
          .neighbors_directed(idx, Direction::Incoming)
          .filter(|dep| remaining.contains(dep))
          .map(|dep| self.graph[dep].clone())
          .collect();
        residual.sort();
        (self.graph[idx].clone(), residual)
      })
      .collect();
    participants.sort();

    Err(GraphError::Cycle(CycleReport { participants }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn deps(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
      .iter()
      .map(|(name, list)| {
        (
          name.to_string(),
          list.iter().map(|d| d.to_string()).collect(),
        )
      })
      .collect()
  }

  fn cycle_participants(map: &BTreeMap<String, Vec<String>>) -> Vec<String> {
    match DependencyGraph::from_dependencies(map).check_acyclic() {
      Err(GraphError::Cycle(report)) => report.participants.into_iter().map(|(n, _)| n).collect(),
      Ok(()) => Vec::new(),
    }
  }

  #[test]
  fn empty_graph_is_acyclic() {
    let graph = DependencyGraph::from_dependencies(&BTreeMap::new());
    assert!(graph.is_empty());
    assert!(graph.check_acyclic().is_ok());
  }

  #[test]
  fn diamond_is_acyclic() {
    let map = deps(&[
      ("a", &[]),
      ("b", &["a"]),
      ("c", &["a"]),
      ("d", &["b", "c"]),
    ]);
    assert!(DependencyGraph::from_dependencies(&map).check_acyclic().is_ok());
  }

  #[test]
  fn two_node_cycle_is_reported() {
    let map = deps(&[("a", &["b"]), ("b", &["a"])]);
    assert_eq!(cycle_participants(&map), vec!["a", "b"]);
  }

  #[test]
  fn three_node_cycle_is_reported() {
    let map = deps(&[("a", &["c"]), ("b", &["a"]), ("c", &["b"])]);
    assert_eq!(cycle_participants(&map), vec!["a", "b", "c"]);
  }

  #[test]
  fn acyclic_nodes_are_pruned_around_a_cycle() {
    // x -> y -> z is acyclic; (p, q) is an isolated cyclic pair.
    let map = deps(&[
      ("x", &[]),
      ("y", &["x"]),
      ("z", &["y"]),
      ("p", &["q"]),
      ("q", &["p"]),
    ]);
    assert_eq!(cycle_participants(&map), vec!["p", "q"]);
  }

  #[test]
  fn self_reference_is_a_cycle() {
    let map = deps(&[("a", &["a"])]);
    assert_eq!(cycle_participants(&map), vec!["a"]);
  }

  #[test]
  fn external_dependencies_carry_no_edge() {
    // b depends on something outside the map; no cycle possible.
    let map = deps(&[("b", &["outside"])]);
    assert!(DependencyGraph::from_dependencies(&map).check_acyclic().is_ok());
  }

  #[test]
  fn report_lists_residual_dependencies() {
    let map = deps(&[("a", &["b"]), ("b", &["a"])]);
    match DependencyGraph::from_dependencies(&map).check_acyclic() {
      Err(GraphError::Cycle(report)) => {
        assert_eq!(
          report.participants,
          vec![
            ("a".to_string(), vec!["b".to_string()]),
            ("b".to_string(), vec!["a".to_string()]),
          ]
        );
        let text = report.to_string();
        assert!(text.contains("a -> [b]"));
        assert!(text.contains("b -> [a]"));
      }
      other => panic!("expected cycle, got {:?}", other),
    }
  }
}
