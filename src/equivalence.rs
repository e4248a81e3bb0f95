// Copyright 2026 The Odegen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Variables live in an arena addressed by stable indices; equivalence
//! networks are index sets over that arena, so there are no cyclic
//! ownership pointers anywhere in the pipeline.

use std::collections::HashMap;

use serde::Serialize;

use crate::ast::Expr0;
use crate::common::Ident;
use crate::datamodel::Model;

/// Index of a variable in the arena.  Assigned in component-then-
/// declaration order, so ids are deterministic for a given model.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VariableId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct VariableRecord {
    pub component: Ident,
    pub name: Ident,
    pub units: Ident,
    pub initial: Option<Expr0>,
}

impl VariableRecord {
    /// "component.name", the form diagnostics use to identify a variable.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.component, self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableArena {
    records: Vec<VariableRecord>,
    index: HashMap<(Ident, Ident), VariableId>,
}

impl VariableArena {
    pub fn from_model(model: &Model) -> Self {
        let mut arena = VariableArena::default();
        for component in model.components.iter() {
            for variable in component.variables.iter() {
                let id = VariableId(arena.records.len());
                arena.records.push(VariableRecord {
                    component: component.name.clone(),
                    name: variable.name.clone(),
                    units: variable.units.clone(),
                    initial: variable.initial.clone(),
                });
                arena
                    .index
                    .insert((component.name.clone(), variable.name.clone()), id);
            }
        }
        arena
    }

    pub fn lookup(&self, component: &str, name: &str) -> Option<VariableId> {
        self.index
            .get(&(component.to_owned(), name.to_owned()))
            .copied()
    }

    pub fn get(&self, id: VariableId) -> &VariableRecord {
        &self.records[id.0]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &VariableRecord)> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| (VariableId(i), record))
    }
}

/// Disjoint sets over arena indices.  `find` uses iterative path halving;
/// no recursion anywhere.
#[derive(Clone, Debug)]
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(len: usize) -> Self {
        UnionFind {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        // always hang the larger root off the smaller one: the class
        // representative is then exactly the lowest arena index, which
        // keeps downstream stages order-independent
        if ra < rb {
            self.parent[rb] = ra;
        } else {
            self.parent[ra] = rb;
        }
    }
}

/// The resolved equivalence classes: every variable maps to its canonical
/// representative (the first-declared member).
#[derive(Clone, Debug, PartialEq)]
pub struct EquivalenceClasses {
    rep: Vec<VariableId>,
}

impl EquivalenceClasses {
    pub fn build(len: usize, pairs: &[(VariableId, VariableId)]) -> Self {
        let mut sets = UnionFind::new(len);
        for (a, b) in pairs.iter() {
            sets.union(a.0, b.0);
        }

        // with min-root unions the root already is the lowest index
        let rep = (0..len).map(|i| VariableId(sets.find(i))).collect();
        EquivalenceClasses { rep }
    }

    pub fn representative(&self, id: VariableId) -> VariableId {
        self.rep[id.0]
    }

    pub fn is_representative(&self, id: VariableId) -> bool {
        self.rep[id.0] == id
    }

    /// Non-representative members grouped under their representative, in
    /// arena order.
    pub fn merged_members(&self) -> Vec<(VariableId, VariableId)> {
        self.rep
            .iter()
            .enumerate()
            .filter(|(i, rep)| VariableId(*i) != **rep)
            .map(|(i, rep)| (VariableId(i), *rep))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{Component, Variable};

    #[test]
    fn test_arena_ids_are_declaration_ordered() {
        let model = Model::new("m")
            .with_component(
                Component::new("a")
                    .with_variable(Variable::new("x", "second"))
                    .with_variable(Variable::new("y", "second")),
            )
            .with_component(Component::new("b").with_variable(Variable::new("z", "second")));

        let arena = VariableArena::from_model(&model);
        assert_eq!(3, arena.len());
        assert_eq!(Some(VariableId(0)), arena.lookup("a", "x"));
        assert_eq!(Some(VariableId(1)), arena.lookup("a", "y"));
        assert_eq!(Some(VariableId(2)), arena.lookup("b", "z"));
        assert_eq!(None, arena.lookup("b", "x"));
        assert_eq!("b.z", arena.get(VariableId(2)).qualified_name());
    }

    #[test]
    fn test_representative_is_first_declared() {
        // 0-3-4 merge transitively; 1 and 2 stay singletons
        let pairs = vec![
            (VariableId(3), VariableId(4)),
            (VariableId(4), VariableId(0)),
        ];
        let classes = EquivalenceClasses::build(5, &pairs);

        assert_eq!(VariableId(0), classes.representative(VariableId(0)));
        assert_eq!(VariableId(0), classes.representative(VariableId(3)));
        assert_eq!(VariableId(0), classes.representative(VariableId(4)));
        assert_eq!(VariableId(1), classes.representative(VariableId(1)));
        assert!(classes.is_representative(VariableId(2)));
        assert!(!classes.is_representative(VariableId(3)));

        assert_eq!(
            vec![
                (VariableId(3), VariableId(0)),
                (VariableId(4), VariableId(0))
            ],
            classes.merged_members()
        );
    }

    #[test]
    fn test_union_order_does_not_change_representative() {
        let forward = vec![
            (VariableId(1), VariableId(2)),
            (VariableId(2), VariableId(4)),
        ];
        let backward = vec![
            (VariableId(4), VariableId(2)),
            (VariableId(2), VariableId(1)),
        ];

        let a = EquivalenceClasses::build(5, &forward);
        let b = EquivalenceClasses::build(5, &backward);
        assert_eq!(a, b);
    }
}
