// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Serialization tests: what crosses the wire, and what gets rejected.

#![cfg(feature = "serde")]

use causal_tree::AtomId;
use causal_tree::AtomValue;
use causal_tree::CausalTree;
use causal_tree::SiteIndex;
use causal_tree::Weave;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

// =============================================================================
// Test helpers
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
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

fn sample() -> CausalTree<Op> {
    let mut a = CausalTree::new(Uuid::from_u128(1), 20);
    let (h, _) = a.add_atom(Op::Insert('h'), AtomId::ROOT).unwrap();
    let (i, _) = a.add_atom(Op::Insert('i'), h).unwrap();

    let mut b = CausalTree::new(Uuid::from_u128(2), 10);
    b.integrate(a.clone()).unwrap();
    let i = AtomId::new(2, i.index);
    b.add_atom(Op::Delete, i).unwrap();
    b.add_atom_with_reference(Op::Insert('!'), AtomId::ROOT, i).unwrap();

    a.integrate(b).unwrap();
    return a;
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn causal_tree_round_trips() {
    let tree = sample();
    let text = serde_json::to_string(&tree).unwrap();
    let back: CausalTree<Op> = serde_json::from_str(&text).unwrap();

    assert_eq!(back, tree);
    assert_eq!(back.weave().weft(), tree.weave().weft());
    assert_eq!(back.owner_uuid(), Some(Uuid::from_u128(1)));
    assert!(back.validate().is_ok());
}

#[test]
fn restored_replica_keeps_editing() {
    let tree = sample();
    let text = serde_json::to_string(&tree).unwrap();
    let mut back: CausalTree<Op> = serde_json::from_str(&text).unwrap();

    let mut live = tree.clone();
    let (from_back, _) = back.add_atom(Op::Insert('?'), AtomId::ROOT).unwrap();
    let (from_live, _) = live.add_atom(Op::Insert('?'), AtomId::ROOT).unwrap();
    assert_eq!(from_back, from_live);
    assert_eq!(back, live);
}

#[test]
fn wire_shape() {
    let tree = sample();
    let value = serde_json::to_value(&tree).unwrap();

    let sites = value["site_index"].as_array().unwrap();
    assert_eq!(sites.len(), 3);
    assert_eq!(sites[0], json!({ "clock": 0, "id": Uuid::nil() }));

    let weave = &value["weave"];
    assert_eq!(weave["owner"], json!(2));
    assert_eq!(weave["clock"], json!(tree.weave().clock().time()));
    assert_eq!(weave["atoms"].as_array().unwrap().len(), tree.weave().len());
    assert_eq!(weave["atoms"][0]["id"], json!({ "site": 0, "index": 0 }));
}

#[test]
fn missing_reference_defaults_to_null() {
    let value = json!({
        "owner": 1,
        "atoms": [
            { "id": { "site": 0, "index": 0 }, "cause": { "site": 0, "index": 0 }, "timestamp": 0, "value": "Root" },
            { "id": { "site": 1, "index": 0 }, "cause": { "site": 0, "index": 0 }, "timestamp": 1, "value": { "Insert": "x" } },
        ],
        "clock": 2,
    });
    let weave: Weave<Op> = serde_json::from_value(value).unwrap();
    assert!(weave.atom(AtomId::new(1, 0)).unwrap().reference.is_null());
}

// =============================================================================
// Rejection
// =============================================================================

#[test]
fn rejects_dangling_cause() {
    let mut value = serde_json::to_value(sample()).unwrap();
    value["weave"]["atoms"][1]["cause"] = json!({ "site": 9, "index": 0 });
    assert!(serde_json::from_value::<CausalTree<Op>>(value).is_err());
}

#[test]
fn rejects_reordered_atoms() {
    let mut value = serde_json::to_value(sample()).unwrap();
    let atoms = value["weave"]["atoms"].as_array_mut().unwrap();
    let last = atoms.len() - 1;
    atoms.swap(1, last);
    assert!(serde_json::from_value::<CausalTree<Op>>(value).is_err());
}

#[test]
fn rejects_stale_clock() {
    let mut value = serde_json::to_value(sample()).unwrap();
    value["weave"]["clock"] = json!(1);
    assert!(serde_json::from_value::<CausalTree<Op>>(value).is_err());
}

#[test]
fn rejects_unknown_owner() {
    let mut value = serde_json::to_value(sample()).unwrap();
    value["weave"]["owner"] = json!(7);
    assert!(serde_json::from_value::<CausalTree<Op>>(value).is_err());
}

#[test]
fn rejects_unsorted_site_index() {
    let mut value = serde_json::to_value(sample()).unwrap();
    value["site_index"].as_array_mut().unwrap().swap(1, 2);
    assert!(serde_json::from_value::<CausalTree<Op>>(value).is_err());

    let headless = json!([{ "clock": 4, "id": Uuid::from_u128(1) }]);
    assert!(serde_json::from_value::<SiteIndex>(headless).is_err());
}
