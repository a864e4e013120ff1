// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! CRDT building blocks for the causal tree.

pub mod atom;
pub mod causal_tree;
pub mod primitives;
pub mod weave;

pub use atom::Atom;
pub use atom::AtomValue;
pub use causal_tree::CausalTree;
pub use weave::Weave;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
///
/// Merging consumes the other replica: clone it first if it is still
/// needed.
pub trait Crdt: Sized {
    /// Why a merge can fail. `Infallible` for the simple lattices.
    type Error;

    /// Merge another instance into this one.
    fn integrate(&mut self, other: Self) -> Result<(), Self::Error>;
}
