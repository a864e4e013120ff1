// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Property-based tests for replica convergence.

use std::collections::HashSet;

use causal_tree::Atom;
use causal_tree::AtomId;
use causal_tree::AtomValue;
use causal_tree::CausalTree;
use proptest::prelude::*;
use uuid::Uuid;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Op {
    #[default]
    Root,
    Insert(char),
    Delete,
}

impl AtomValue for Op {
    fn is_childless(&self) -> bool {
        return *self == Op::Delete;
    }

    fn is_priority(&self) -> bool {
        return *self == Op::Delete;
    }
}

const REPLICAS: usize = 3;

/// A random edit on one replica, or a one-way sync between two.
#[derive(Clone, Debug)]
enum Action {
    Insert { replica: usize, cause: usize, ch: char },
    Delete { replica: usize, target: usize },
    Sync { from: usize, to: usize },
}

fn arbitrary_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..REPLICAS, any::<usize>(), prop::char::range('a', 'z'))
            .prop_map(|(replica, cause, ch)| Action::Insert { replica, cause, ch }),
        1 => (0..REPLICAS, any::<usize>())
            .prop_map(|(replica, target)| Action::Delete { replica, target }),
        1 => (0..REPLICAS, 0..REPLICAS)
            .prop_map(|(from, to)| Action::Sync { from, to }),
    ]
}

fn replicas() -> Vec<CausalTree<Op>> {
    // Creation clocks out of uuid order, so syncing renumbers sites
    let clocks = [30, 10, 20];
    return (0..REPLICAS)
        .map(|i| CausalTree::new(Uuid::from_u128(i as u128 + 1), clocks[i]))
        .collect();
}

/// Pick an atom that may take children.
fn pick_parent(tree: &CausalTree<Op>, pick: usize) -> AtomId {
    let atoms = tree.weave().atoms();
    let atom = &atoms[pick % atoms.len()];
    if atom.is_childless() {
        return atom.cause;
    }
    return atom.id;
}

fn apply(trees: &mut [CausalTree<Op>], action: &Action) {
    match action {
        Action::Insert { replica, cause, ch } => {
            let tree = &mut trees[*replica];
            let cause = pick_parent(tree, *cause);
            tree.add_atom(Op::Insert(*ch), cause).unwrap();
        }
        Action::Delete { replica, target } => {
            let tree = &mut trees[*replica];
            let target = pick_parent(tree, *target);
            if target != AtomId::ROOT {
                tree.add_atom(Op::Delete, target).unwrap();
            }
        }
        Action::Sync { from, to } => {
            let remote = trees[*from].clone();
            trees[*to].integrate(remote).unwrap();
        }
    }
}

fn run(actions: &[Action]) -> Vec<CausalTree<Op>> {
    let mut trees = replicas();
    for action in actions {
        apply(&mut trees, action);
    }
    return trees;
}

fn merged(a: &CausalTree<Op>, b: &CausalTree<Op>) -> CausalTree<Op> {
    let mut out = a.clone();
    out.integrate(b.clone()).unwrap();
    return out;
}

/// Atoms of a replica keyed by (site uuid, index), so replicas with
/// different site numbering can be compared.
fn global_ids(tree: &CausalTree<Op>, atoms: &[Atom<Op>]) -> Vec<(Uuid, i32)> {
    return atoms
        .iter()
        .map(|atom| (tree.site_uuid(atom.id.site).unwrap(), atom.id.index))
        .collect();
}

// =============================================================================
// Validity
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every replica stays valid through edits and syncs
    #[test]
    fn replicas_stay_valid(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        let mut trees = replicas();
        for action in &actions {
            apply(&mut trees, action);
            for tree in &trees {
                prop_assert_eq!(tree.validate(), Ok(()));
            }
        }
    }

    /// Every atom comes after its cause and its reference
    #[test]
    fn causes_precede_effects(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        for tree in run(&actions) {
            let weave = tree.weave();
            for atom in weave.atoms().iter().skip(1) {
                let here = weave.position(atom.id).unwrap();
                let cause = weave.position(atom.cause).unwrap();
                prop_assert!(cause < here);
                prop_assert!(weave.atom(atom.cause).unwrap().timestamp < atom.timestamp);
            }
        }
    }

    /// Yarns, positions and the weft agree with the atom list
    #[test]
    fn caches_match_atoms(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        for tree in run(&actions) {
            let weave = tree.weave();
            let mut yarn_total = 0;
            for (site, index) in weave.weft().iter() {
                let yarn = weave.yarn(site);
                prop_assert_eq!(yarn.len() as i32, index + 1);
                for (i, atom) in yarn.iter().enumerate() {
                    prop_assert_eq!(atom.id, AtomId::new(site, i as i32));
                    prop_assert_eq!(weave.atom(atom.id).map(|found| found.id), Some(atom.id));
                }
                yarn_total += yarn.len();
            }
            prop_assert_eq!(yarn_total, weave.len());
            for (position, atom) in weave.atoms().iter().enumerate() {
                prop_assert_eq!(weave.position(atom.id), Some(position));
            }
        }
    }
}

// =============================================================================
// Merge laws
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// a + b == b + a
    #[test]
    fn merge_commutes(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        let trees = run(&actions);
        let ab = merged(&trees[0], &trees[1]);
        let ba = merged(&trees[1], &trees[0]);

        prop_assert_eq!(ab.weave().atoms(), ba.weave().atoms());
        prop_assert_eq!(ab.site_index(), ba.site_index());
        prop_assert_eq!(ab.weave().weft(), ba.weave().weft());
    }

    /// (a + b) + c == a + (b + c)
    #[test]
    fn merge_associates(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        let trees = run(&actions);
        let left = merged(&merged(&trees[0], &trees[1]), &trees[2]);
        let right = merged(&trees[0], &merged(&trees[1], &trees[2]));

        prop_assert_eq!(left.weave().atoms(), right.weave().atoms());
        prop_assert_eq!(left.site_index(), right.site_index());
    }

    /// a + a == a
    #[test]
    fn merge_is_idempotent(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        for tree in run(&actions) {
            let twice = merged(&tree, &tree);
            prop_assert_eq!(&twice, &tree);
        }
    }

    /// Merging keeps the relative order of every atom each side already had
    #[test]
    fn merge_preserves_local_order(actions in prop::collection::vec(arbitrary_action(), 0..60)) {
        let trees = run(&actions);
        let all = merged(&merged(&trees[0], &trees[1]), &trees[2]);
        let order = global_ids(&all, all.weave().atoms());

        for tree in &trees {
            let local = global_ids(tree, tree.weave().atoms());
            let known: HashSet<(Uuid, i32)> = local.iter().copied().collect();
            let restricted: Vec<(Uuid, i32)> =
                order.iter().copied().filter(|id| known.contains(id)).collect();
            prop_assert_eq!(restricted, local);
            prop_assert!(all.superset(tree));
        }
    }

    /// A merged replica accepts new local edits anywhere
    #[test]
    fn merged_replica_keeps_editing(
        actions in prop::collection::vec(arbitrary_action(), 0..60),
        picks in prop::collection::vec(any::<usize>(), 1..10),
    ) {
        let trees = run(&actions);
        let mut all = merged(&merged(&trees[0], &trees[1]), &trees[2]);
        for pick in picks {
            let cause = pick_parent(&all, pick);
            all.add_atom(Op::Insert('z'), cause).unwrap();
        }
        prop_assert_eq!(all.validate(), Ok(()));
    }
}
