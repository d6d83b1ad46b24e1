// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Dependency ordering of one page's assets.
//!
//! A `depends` reference names another asset by origin or by name. Assets
//! are placed after everything they depend on; among assets that are ready
//! at the same time, higher priority goes first, then declaration order.
//! Assets caught in a cycle are reported as blocked instead of ordered.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};

use crate::asset::AssetRef;

/// Result of ordering one bundle list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetOrdering {
    /// Indices into the input, in output order.
    pub ordered: Vec<usize>,
    /// Indices that could not be placed because of a dependency cycle,
    /// in input order.
    pub blocked: Vec<usize>,
}

impl AssetOrdering {
    /// True if every input was placed.
    pub fn is_complete(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Orders assets so every asset follows the assets it depends on.
///
/// Dependencies are matched against the other members of `assets` only;
/// references to assets outside the list are ignored. Among assets that are
/// ready at the same time, higher priority goes first, then input order.
/// Assets caught in a cycle, or depending on one, end up in `blocked`.
pub fn order_assets(assets: &[AssetRef]) -> AssetOrdering {
    let count = assets.len();

    // edges[dep] = assets that must wait for dep
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0usize; count];

    for (index, asset) in assets.iter().enumerate() {
        let mut seen = HashSet::new();
        for reference in asset.dependencies() {
            let Some(dep) = assets.iter().position(|a| a.answers_to(reference)) else {
                continue;
            };
            if seen.insert(dep) {
                edges[dep].push(index);
                in_degree[index] += 1;
            }
        }
    }

    topo_sort(assets, &edges, in_degree)
}

/// Kahn's algorithm with a priority-ordered ready set.
fn topo_sort(assets: &[AssetRef], edges: &[Vec<usize>], mut in_degree: Vec<usize>) -> AssetOrdering {
    let mut ready: BTreeSet<(Reverse<i32>, usize)> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| (Reverse(assets[index].priority()), index))
        .collect();

    let mut ordered = Vec::with_capacity(assets.len());
    while let Some(next) = ready.pop_first() {
        let index = next.1;
        ordered.push(index);
        for &dependent in &edges[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert((Reverse(assets[dependent].priority()), dependent));
            }
        }
    }

    let placed: HashSet<usize> = ordered.iter().copied().collect();
    let blocked = (0..assets.len()).filter(|i| !placed.contains(i)).collect();

    AssetOrdering { ordered, blocked }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{Asset, AssetType};
    use std::sync::Arc;

    fn js(origin: &str) -> Asset {
        Asset::from_content(AssetType::Javascript, origin, origin.as_bytes().to_vec())
    }

    fn names(assets: &[AssetRef], indices: &[usize]) -> Vec<String> {
        indices.iter().map(|i| assets[*i].name().to_string()).collect()
    }

    #[test]
    fn test_no_dependencies_keeps_input_order() {
        let assets: Vec<AssetRef> = vec![Arc::new(js("/c.js")), Arc::new(js("/a.js")), Arc::new(js("/b.js"))];
        let ordering = order_assets(&assets);
        assert!(ordering.is_complete());
        assert_eq!(names(&assets, &ordering.ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_dependency_moves_before_dependent() {
        let assets: Vec<AssetRef> = vec![
            Arc::new(js("/app.js").with_dependency("/vendor.js")),
            Arc::new(js("/vendor.js")),
        ];
        let ordering = order_assets(&assets);
        assert_eq!(names(&assets, &ordering.ordered), vec!["vendor", "app"]);
    }

    #[test]
    fn test_priority_breaks_ties() {
        let assets: Vec<AssetRef> = vec![
            Arc::new(js("/low.js")),
            Arc::new(js("/high.js").with_priority(10)),
            Arc::new(js("/mid.js").with_priority(5)),
        ];
        let ordering = order_assets(&assets);
        assert_eq!(names(&assets, &ordering.ordered), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_dependency_by_name_and_missing_dependency() {
        let assets: Vec<AssetRef> = vec![
            Arc::new(js("/widget.js").with_dependency("jquery").with_dependency("/not-here.js")),
            Arc::new(js("/lib/jquery.js")),
        ];
        let ordering = order_assets(&assets);
        assert!(ordering.is_complete());
        assert_eq!(names(&assets, &ordering.ordered), vec!["jquery", "widget"]);
    }

    #[test]
    fn test_cycle_blocks_only_affected_assets() {
        let assets: Vec<AssetRef> = vec![
            Arc::new(js("/free.js")),
            Arc::new(js("/a.js").with_dependency("/c.js")),
            Arc::new(js("/b.js").with_dependency("/a.js")),
            Arc::new(js("/c.js").with_dependency("/b.js")),
            Arc::new(js("/tail.js").with_dependency("/c.js")),
        ];
        let ordering = order_assets(&assets);
        assert!(!ordering.is_complete());
        assert_eq!(names(&assets, &ordering.ordered), vec!["free"]);
        assert_eq!(names(&assets, &ordering.blocked), vec!["a", "b", "c", "tail"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let assets: Vec<AssetRef> = vec![Arc::new(js("/me.js").with_dependency("/me.js"))];
        let ordering = order_assets(&assets);
        assert!(ordering.ordered.is_empty());
        assert_eq!(ordering.blocked, vec![0]);
    }
}
