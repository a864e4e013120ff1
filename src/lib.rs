// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Causal Tree - an ordered, convergent, replicated sequence of atoms.
//!
//! Every edit is an immutable atom that names the atom it was made after.
//! Atoms form a tree rooted at a single root atom, and the tree is kept
//! linearized in a canonical depth-first order (the weave). Any two
//! replicas that have seen the same atoms hold the same weave, no matter
//! in which order they merged.
//!
//! # Quick Start
//!
//! ```
//! use causal_tree::AtomId;
//! use causal_tree::AtomValue;
//! use causal_tree::CausalTree;
//! use uuid::Uuid;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! enum Edit {
//!     #[default]
//!     Start,
//!     Insert(char),
//!     Delete,
//! }
//!
//! impl AtomValue for Edit {
//!     fn is_childless(&self) -> bool {
//!         return *self == Edit::Delete;
//!     }
//!
//!     fn is_priority(&self) -> bool {
//!         return *self == Edit::Delete;
//!     }
//! }
//!
//! // Two replicas, each owned by its own site
//! let mut alice = CausalTree::new(Uuid::from_u128(1), 1);
//! let (h, _) = alice.add_atom(Edit::Insert('h'), AtomId::ROOT).unwrap();
//!
//! let mut bob = alice.clone();
//! bob.transfer_to_new_owner(Uuid::from_u128(2), 2);
//!
//! alice.add_atom(Edit::Insert('i'), h).unwrap();
//! bob.add_atom(Edit::Delete, h).unwrap();
//!
//! // Merging consumes the remote copy
//! alice.integrate(bob.clone()).unwrap();
//! bob.integrate(alice.clone()).unwrap();
//! assert_eq!(alice.weave().atoms(), bob.weave().atoms());
//! ```

pub mod crdt;
pub mod error;

pub use crdt::Crdt;
pub use crdt::atom::Atom;
pub use crdt::atom::AtomValue;
pub use crdt::causal_tree::CausalTree;
pub use crdt::primitives::AtomId;
pub use crdt::primitives::LamportClock;
pub use crdt::primitives::SiteId;
pub use crdt::primitives::SiteIndex;
pub use crdt::primitives::Weft;
pub use crdt::weave::Weave;
pub use error::InsertError;
pub use error::MergeError;
pub use error::ValidationError;
