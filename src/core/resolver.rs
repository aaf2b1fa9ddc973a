//! Layer dependency resolution
//!
//! Computes a fetch order in which derived layers come after the layers
//! they are computed from.

use std::collections::HashSet;

use crate::core::layers::{self, LayerSpec};
use crate::error::ResolverError;

/// Dependency graph for layers
///
/// Nodes keep their insertion order, so the sort is deterministic and
/// unrelated layers stay where the caller put them.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Adjacency list in insertion order: layer -> prerequisites
    edges: Vec<(String, Vec<String>)>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer to the graph
    ///
    /// Prerequisites not added as nodes themselves are ignored by the sort.
    pub fn add_layer(&mut self, name: &str, prerequisites: Vec<String>) {
        if let Some(entry) = self.edges.iter_mut().find(|(n, _)| n == name) {
            entry.1 = prerequisites;
        } else {
            self.edges.push((name.to_string(), prerequisites));
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.edges.iter().any(|(n, _)| n == name)
    }

    fn prerequisites(&self, name: &str) -> &[String] {
        self.edges
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, deps)| deps.as_slice())
    }

    /// Compute topological sort (fetch order)
    ///
    /// Returns layers in order such that prerequisites come before dependents.
    pub fn topological_sort(&self) -> Result<Vec<String>, ResolverError> {
        let mut visited = HashSet::new();
        let mut temp_visited = HashSet::new();
        let mut result = Vec::new();
        let mut cycle_path = Vec::new();

        for (node, _) in &self.edges {
            if !visited.contains(node) {
                self.visit(
                    node,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                    &mut cycle_path,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        temp_visited: &mut HashSet<String>,
        result: &mut Vec<String>,
        cycle_path: &mut Vec<String>,
    ) -> Result<(), ResolverError> {
        if temp_visited.contains(node) {
            cycle_path.push(node.to_string());
            return Err(ResolverError::CircularDependency {
                cycle: cycle_path.clone(),
            });
        }

        if visited.contains(node) {
            return Ok(());
        }

        temp_visited.insert(node.to_string());
        cycle_path.push(node.to_string());

        for dep in self.prerequisites(node) {
            if self.contains(dep) {
                self.visit(dep, visited, temp_visited, result, cycle_path)?;
            }
        }

        cycle_path.pop();
        temp_visited.remove(node);
        visited.insert(node.to_string());
        result.push(node.to_string());

        Ok(())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }
}

/// Order catalog layers so declared prerequisites are fetched first
///
/// Layers keep their relative input order otherwise. A prerequisite that is
/// not part of `names` is ignored.
pub fn resolve_layer_order<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>, ResolverError> {
    let mut graph = DependencyGraph::new();
    for name in names {
        let name = name.as_ref();
        let deps = layers::find(name)
            .map(|l| l.depends_on.iter().map(ToString::to_string).collect())
            .unwrap_or_default();
        graph.add_layer(name, deps);
    }
    graph.topological_sort()
}

/// Resolved list of layers to fetch
#[derive(Debug, Clone)]
pub struct FetchPlan {
    steps: Vec<&'static LayerSpec>,
}

impl FetchPlan {
    /// Build a plan for the enabled layers
    ///
    /// Unknown names are rejected. Missing prerequisites are added as
    /// fetch-only steps.
    pub fn new<S: AsRef<str>>(enabled: &[S]) -> Result<Self, ResolverError> {
        let mut names: Vec<String> = Vec::new();
        for name in enabled {
            let layer = layers::require(name.as_ref())?;
            if !names.iter().any(|n| n == layer.name) {
                names.push(layer.name.to_string());
            }
        }

        let mut i = 0;
        while i < names.len() {
            let layer = layers::require(&names[i])?;
            for dep in layer.depends_on {
                if !names.iter().any(|n| n == dep) {
                    tracing::debug!("Adding prerequisite layer '{dep}' for '{}'", layer.name);
                    names.push((*dep).to_string());
                }
            }
            i += 1;
        }

        let steps = resolve_layer_order(&names)?
            .iter()
            .map(|n| layers::require(n))
            .collect::<Result<_, _>>()?;

        Ok(Self { steps })
    }

    /// Layers in fetch order
    pub fn steps(&self) -> &[&'static LayerSpec] {
        &self.steps
    }

    /// Layer names in fetch order
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|l| l.name).collect()
    }

    /// Number of fetch steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing is fetched
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether a layer is part of the plan
    pub fn contains(&self, name: &str) -> bool {
        self.steps.iter().any(|l| l.name == name)
    }
}
