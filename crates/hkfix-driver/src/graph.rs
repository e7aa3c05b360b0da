//! Package dependency graph
//!
//! Nodes are units (by position in the run), edges point from a dependency
//! to its dependents, so a topological order is leaf-first.

use crate::error::{DriverError, Result};
use hkfix_frontend::UnitHeader;
use hkfix_source::{QualifiedName, UnitId};
use petgraph::algo::{has_path_connecting, tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Dependencies between the units of one run
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    ids: Vec<UnitId>,
    inner: DiGraphMap<usize, ()>,
}

impl DependencyGraph {
    /// Build the graph from pre-parsed headers
    ///
    /// Unit X depends on unit Y when one of X's imports names Y's package,
    /// taking the longest package of the program that prefixes the import.
    /// Imports of the unit's own package and of the root package add nothing.
    ///
    /// Within a package, X depends on Y when X applies a name Y declares at
    /// top level. Such an edge is dropped when it would close a cycle, so
    /// units of one package that refer to each other keep the order of the
    /// first edge added.
    #[must_use]
    pub fn build(units: &[(UnitId, UnitHeader)]) -> Self {
        let mut by_package: HashMap<QualifiedName, Vec<usize>> = HashMap::new();
        for (node, (_, header)) in units.iter().enumerate() {
            by_package.entry(header.package_name()).or_default().push(node);
        }

        let mut inner = DiGraphMap::new();
        for node in 0..units.len() {
            inner.add_node(node);
        }

        for (node, (_, header)) in units.iter().enumerate() {
            let own = header.package_name();
            for target in header.import_targets() {
                let Some(package) = longest_known_prefix(&by_package, &target) else {
                    continue;
                };
                if *package == own {
                    continue;
                }
                for &dependency in &by_package[package] {
                    inner.add_edge(dependency, node, ());
                }
            }
        }

        for (node, (_, header)) in units.iter().enumerate() {
            let siblings = &by_package[&header.package_name()];
            for name in header.referenced.difference(&header.declared) {
                for &dependency in siblings {
                    if dependency == node || !units[dependency].1.declared.contains(name) {
                        continue;
                    }
                    if has_path_connecting(&inner, node, dependency, None) {
                        debug!(unit = %units[node].0, name = %name, "same-package edge would close a cycle");
                        continue;
                    }
                    inner.add_edge(dependency, node, ());
                }
            }
        }

        Self {
            ids: units.iter().map(|(id, _)| id.clone()).collect(),
            inner,
        }
    }

    /// Number of units
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the graph has no units
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of dependency edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Units `node` depends on directly
    #[must_use]
    pub fn dependencies(&self, node: usize) -> Vec<&UnitId> {
        let mut deps: Vec<usize> = self
            .inner
            .neighbors_directed(node, Direction::Incoming)
            .collect();
        deps.sort_unstable();
        deps.into_iter().map(|n| &self.ids[n]).collect()
    }

    /// Unit positions in leaf-first order
    ///
    /// # Errors
    /// Returns [`DriverError::DependencyCycle`] naming the units of the
    /// first strongly connected component found
    pub fn leaf_first(&self) -> Result<Vec<usize>> {
        toposort(&self.inner, None).map_err(|cycle| {
            let start = cycle.node_id();
            let units: BTreeSet<String> = tarjan_scc(&self.inner)
                .into_iter()
                .find(|component| component.contains(&start))
                .unwrap_or_else(|| vec![start])
                .into_iter()
                .map(|n| self.ids[n].to_string())
                .collect();
            DriverError::DependencyCycle {
                units: units.into_iter().collect(),
            }
        })
    }
}

fn longest_known_prefix<'p>(
    packages: &'p HashMap<QualifiedName, Vec<usize>>,
    name: &QualifiedName,
) -> Option<&'p QualifiedName> {
    packages
        .keys()
        .filter(|p| !p.is_empty() && p.is_prefix_of(name))
        .max_by_key(|p| p.len())
}
