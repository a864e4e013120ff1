// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Atoms: the immutable units of change in a causal tree.
//!
//! An atom records who made it (`id`), what it hangs off of (`cause`),
//! an optional weak `reference` to any other older atom, its Lamport
//! `timestamp`, and a payload `value`. Once created, only the site ids
//! inside it may change, and only when the site index renumbers.
//!
//! Deleting is not a mutation: a delete is a new childless atom caused by
//! its target.

#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::primitives::AtomId;
use super::primitives::Clock;
use super::primitives::SiteRemap;

/// Behaviour the weave needs from an atom payload.
///
/// The root atom is created with `V::default()`.
pub trait AtomValue: Clone + Default {
    /// No atom may ever name this one as its cause.
    fn is_childless(&self) -> bool {
        return false;
    }

    /// Sorts ahead of every non-priority sibling, regardless of timestamp.
    fn is_priority(&self) -> bool {
        return false;
    }

    /// Rewrite any site ids embedded in the value.
    fn remap_indices(&mut self, _map: &SiteRemap) {}
}

/// One node of the causal tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atom<V> {
    /// Identity: (site, yarn index).
    pub id: AtomId,
    /// Parent in the causal tree. Equal to `id` only for the root.
    pub cause: AtomId,
    /// Optional weak reference, `AtomId::NULL` if absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference: AtomId,
    /// Lamport timestamp, greater than the cause's and the reference's.
    pub timestamp: Clock,
    /// Payload.
    pub value: V,
}

impl<V: AtomValue> Atom<V> {
    /// Create an atom without a reference.
    pub fn new(id: AtomId, cause: AtomId, timestamp: Clock, value: V) -> Atom<V> {
        return Atom {
            id,
            cause,
            reference: AtomId::NULL,
            timestamp,
            value,
        };
    }

    /// Create the root atom.
    pub fn root() -> Atom<V> {
        return Atom::new(AtomId::ROOT, AtomId::ROOT, 0, V::default());
    }

    /// Attach a weak reference.
    pub fn with_reference(mut self, reference: AtomId) -> Atom<V> {
        self.reference = reference;
        return self;
    }

    /// Check if this is the root atom.
    #[inline]
    pub fn is_root(&self) -> bool {
        return self.id == self.cause;
    }

    /// Check if no atom may name this one as its cause.
    #[inline]
    pub fn is_childless(&self) -> bool {
        return self.value.is_childless();
    }

    /// Check if this atom sorts ahead of ordinary siblings.
    #[inline]
    pub fn is_priority(&self) -> bool {
        return self.value.is_priority();
    }

    /// Rewrite every site id in the atom through a remap table.
    pub fn remap_indices(&mut self, map: &SiteRemap) {
        self.id.remap(map);
        self.cause.remap(map);
        self.reference.remap(map);
        self.value.remap_indices(map);
    }

    /// The sibling order law: does `self` come before `other`?
    ///
    /// Only meaningful for two atoms with the same cause. Priority atoms
    /// come first, then newer timestamps, then higher site ids.
    pub fn sibling_precedes(&self, other: &Atom<V>) -> bool {
        if self.id == other.id {
            return false;
        }
        if self.is_priority() != other.is_priority() {
            return self.is_priority();
        }
        if self.timestamp != other.timestamp {
            return self.timestamp > other.timestamp;
        }
        return self.id.site > other.id.site;
    }
}
