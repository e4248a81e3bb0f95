// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The equation dependency graph and the algorithms over it.  Everything
//! here is iterative: analysis must not stack-overflow on very large or
//! pathologically cyclic models.

use std::collections::BTreeSet;

use smallvec::SmallVec;

/// A directed graph over dense node ids; an edge `a -> b` reads "a
/// depends on b".
#[derive(Clone, Debug, Default)]
pub struct Graph {
    adjacency: Vec<SmallVec<[u32; 4]>>,
}

impl Graph {
    pub fn new(len: usize) -> Self {
        Graph {
            adjacency: vec![SmallVec::new(); len],
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn add_edge(&mut self, from: usize, to: usize) {
        let to = to as u32;
        if !self.adjacency[from].contains(&to) {
            self.adjacency[from].push(to);
        }
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.adjacency[node].contains(&(node as u32))
    }

    pub fn edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[node].iter().map(|w| *w as usize)
    }

    /// Tarjan's strongly-connected-components algorithm with an explicit
    /// frame stack.  Member lists come out sorted; the component list
    /// itself is in reverse topological order (dependencies first), and is
    /// deterministic for a given graph.
    pub fn strongly_connected_components(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;

        let n = self.adjacency.len();
        let mut index = vec![UNVISITED; n];
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0usize;
        let mut components: Vec<Vec<usize>> = Vec::new();

        // (node, next-edge cursor)
        let mut frames: Vec<(usize, usize)> = Vec::new();

        for start in 0..n {
            if index[start] != UNVISITED {
                continue;
            }
            frames.push((start, 0));

            while let Some(frame) = frames.last_mut() {
                let v = frame.0;
                if frame.1 == 0 {
                    index[v] = next_index;
                    lowlink[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }

                if frame.1 < self.adjacency[v].len() {
                    let w = self.adjacency[v][frame.1] as usize;
                    frame.1 += 1;
                    if index[w] == UNVISITED {
                        frames.push((w, 0));
                    } else if on_stack[w] {
                        lowlink[v] = lowlink[v].min(index[w]);
                    }
                } else {
                    frames.pop();
                    if let Some(parent) = frames.last() {
                        let p = parent.0;
                        lowlink[p] = lowlink[p].min(lowlink[v]);
                    }
                    if lowlink[v] == index[v] {
                        let mut component = Vec::new();
                        loop {
                            let w = stack.pop().unwrap();
                            on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        component.sort_unstable();
                        components.push(component);
                    }
                }
            }
        }

        components
    }
}

/// The acyclic condensation of a graph: each strongly connected component
/// collapsed to one super-node.
#[derive(Clone, Debug)]
pub struct Condensation {
    /// member node ids per component, sorted ascending
    pub components: Vec<Vec<usize>>,
    /// node id -> component index
    pub component_of: Vec<usize>,
    /// component -> the components it depends on (self-edges dropped)
    pub deps: Vec<BTreeSet<usize>>,
    /// whether each component is non-trivial (size > 1, or a self-loop)
    pub non_trivial: Vec<bool>,
}

impl Condensation {
    pub fn new(graph: &Graph) -> Self {
        let components = graph.strongly_connected_components();

        let mut component_of = vec![0usize; graph.len()];
        for (i, component) in components.iter().enumerate() {
            for node in component.iter() {
                component_of[*node] = i;
            }
        }

        let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); components.len()];
        for node in 0..graph.len() {
            let from = component_of[node];
            for to_node in graph.edges(node) {
                let to = component_of[to_node];
                if from != to {
                    deps[from].insert(to);
                }
            }
        }

        let non_trivial = components
            .iter()
            .map(|component| component.len() > 1 || graph.has_self_loop(component[0]))
            .collect();

        Condensation {
            components,
            component_of,
            deps,
            non_trivial,
        }
    }

    /// A total order over components satisfying every dependency edge.
    /// Ties among simultaneously-ready components break towards the
    /// lowest member node id, so the order is stable for a given model
    /// regardless of traversal incidentals.
    pub fn topo_order(&self) -> Vec<usize> {
        let n = self.components.len();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];
        for (component, deps) in self.deps.iter().enumerate() {
            pending[component] = deps.len();
            for dep in deps.iter() {
                dependents[*dep].push(component);
            }
        }

        // ready set keyed by (lowest member node, component id)
        let mut ready: BTreeSet<(usize, usize)> = (0..n)
            .filter(|c| pending[*c] == 0)
            .map(|c| (self.components[c][0], c))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(&(key, component)) = ready.iter().next() {
            ready.remove(&(key, component));
            order.push(component);
            for dependent in dependents[component].iter() {
                pending[*dependent] -= 1;
                if pending[*dependent] == 0 {
                    ready.insert((self.components[*dependent][0], *dependent));
                }
            }
        }

        debug_assert_eq!(n, order.len());
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acyclic_graph_has_singleton_components() {
        // 0 -> 1 -> 2, 0 -> 2
        let mut g = Graph::new(3);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(0, 2);

        let sccs = g.strongly_connected_components();
        assert_eq!(3, sccs.len());
        assert!(sccs.iter().all(|c| c.len() == 1));

        let condensation = Condensation::new(&g);
        assert!(condensation.non_trivial.iter().all(|nt| !nt));

        // dependencies come before dependents
        let order = condensation.topo_order();
        let position = |node: usize| {
            order
                .iter()
                .position(|c| condensation.components[*c][0] == node)
                .unwrap()
        };
        assert!(position(2) < position(1));
        assert!(position(1) < position(0));
    }

    #[test]
    fn test_cycle_is_one_component() {
        // 0 -> 1 -> 2 -> 0, plus 3 depending on the cycle
        let mut g = Graph::new(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 0);
        g.add_edge(3, 1);

        let condensation = Condensation::new(&g);
        assert_eq!(2, condensation.components.len());

        let cycle = condensation.component_of[0];
        assert_eq!(vec![0, 1, 2], condensation.components[cycle]);
        assert!(condensation.non_trivial[cycle]);
        assert!(!condensation.non_trivial[condensation.component_of[3]]);

        let order = condensation.topo_order();
        assert_eq!(cycle, order[0]);
    }

    #[test]
    fn test_self_loop_is_non_trivial() {
        let mut g = Graph::new(2);
        g.add_edge(0, 0);

        let condensation = Condensation::new(&g);
        assert!(condensation.non_trivial[condensation.component_of[0]]);
        assert!(!condensation.non_trivial[condensation.component_of[1]]);
    }

    #[test]
    fn test_topo_tie_break_is_declaration_order() {
        // 1, 2, 3 all independent; 0 depends on all of them
        let mut g = Graph::new(4);
        g.add_edge(0, 1);
        g.add_edge(0, 2);
        g.add_edge(0, 3);

        let condensation = Condensation::new(&g);
        let order: Vec<usize> = condensation
            .topo_order()
            .into_iter()
            .map(|c| condensation.components[c][0])
            .collect();
        assert_eq!(vec![1, 2, 3, 0], order);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        // a 100k-node chain would blow a recursive implementation
        let n = 100_000;
        let mut g = Graph::new(n);
        for i in 0..n - 1 {
            g.add_edge(i, i + 1);
        }

        let sccs = g.strongly_connected_components();
        assert_eq!(n, sccs.len());
    }
}
