// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! The weave: a causal tree of atoms, linearized.
//!
//! The weave keeps every atom twice:
//!
//! 1. **Atoms**, in canonical causal order. Each atom is followed directly
//!    by its causal block (all of its descendants), and siblings are laid
//!    out by the sibling order law: priority first, then newest timestamp,
//!    then highest site id. Reading this list front to back is how a
//!    document gets rendered.
//!
//! 2. **Yarns**, the same atoms sorted by (site, index). Each site owns
//!    one contiguous range, and since a yarn has no gaps, an atom id maps
//!    straight to a slot: `yarns[range.start + index]`.
//!
//! On top of that the weave caches its weft and an `AtomId -> position`
//! index into the atom list. Single inserts patch the caches in place;
//! merges and remaps rebuild them by sort-and-scan.
//!
//! Complexity:
//! - atom lookup by id: O(1)
//! - position lookup by id: O(1) average
//! - add_atom: O(n) (shifting the atom list and position index)
//! - causal_block: O(block size)
//! - integrate: O(n log n), dominated by the cache rebuild

mod merge;
mod validate;

use std::cmp::Ordering;
use std::ops::Range;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::atom::Atom;
use super::atom::AtomValue;
use super::primitives::AtomId;
use super::primitives::CONTROL_SITE;
use super::primitives::LamportClock;
use super::primitives::NULL_INDEX;
use super::primitives::NULL_SITE;
use super::primitives::SiteId;
use super::primitives::SiteRemap;
use super::primitives::Weft;
use super::primitives::id::remap_site;
use crate::error::InsertError;
use crate::error::ValidationError;

/// A causal tree of atoms in canonical order, with lookup caches.
#[derive(Clone, Debug)]
pub struct Weave<V> {
    /// The site new local atoms are created under.
    owner: SiteId,
    /// All atoms in canonical causal order.
    atoms: Vec<Atom<V>>,
    /// All atoms sorted by (site, index).
    yarns: Vec<Atom<V>>,
    /// The slice of `yarns` belonging to each site.
    yarns_map: FxHashMap<SiteId, Range<usize>>,
    /// Highest index present per site.
    weft: Weft,
    /// Position of each atom in `atoms`.
    positions: FxHashMap<AtomId, usize>,
    /// Source of timestamps, always ahead of every atom.
    clock: LamportClock,
}

impl<V: AtomValue> Weave<V> {
    /// Create a weave holding only the root atom.
    pub fn new(owner: SiteId) -> Weave<V> {
        let mut weave = Weave {
            owner,
            atoms: vec![Atom::root()],
            yarns: Vec::new(),
            yarns_map: FxHashMap::default(),
            weft: Weft::new(),
            positions: FxHashMap::default(),
            clock: LamportClock::with_time(1),
        };
        weave.generate_cache_by_sorting_atoms();
        return weave;
    }

    /// Rebuild a weave from its serialized parts.
    ///
    /// The caches are derived from `atoms` the same way they are after a
    /// merge, and the result is validated.
    pub fn from_parts(
        owner: SiteId,
        atoms: Vec<Atom<V>>,
        clock: LamportClock,
    ) -> Result<Weave<V>, ValidationError> {
        let mut weave = Weave {
            owner,
            atoms,
            yarns: Vec::new(),
            yarns_map: FxHashMap::default(),
            weft: Weft::new(),
            positions: FxHashMap::default(),
            clock,
        };
        weave.generate_cache_by_sorting_atoms();
        weave.validate()?;
        return Ok(weave);
    }

    /// The site local atoms are created under.
    #[inline]
    pub fn owner(&self) -> SiteId {
        return self.owner;
    }

    pub(crate) fn set_owner(&mut self, owner: SiteId) {
        self.owner = owner;
    }

    /// The lamport clock. Its time is the next timestamp to be used.
    #[inline]
    pub fn clock(&self) -> LamportClock {
        return self.clock;
    }

    /// Number of atoms, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        return self.atoms.len();
    }

    /// Always false: a weave always holds its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.atoms.is_empty();
    }

    /// All atoms in canonical causal order.
    #[inline]
    pub fn atoms(&self) -> &[Atom<V>] {
        return &self.atoms;
    }

    /// The atoms of one site, in creation order.
    pub fn yarn(&self, site: SiteId) -> &[Atom<V>] {
        return match self.yarns_map.get(&site) {
            Some(range) => &self.yarns[range.clone()],
            None => &[],
        };
    }

    /// Look up an atom by id.
    pub fn atom(&self, id: AtomId) -> Option<&Atom<V>> {
        if id.index < 0 {
            return None;
        }
        let range = self.yarns_map.get(&id.site)?;
        let slot = range.start + id.index as usize;
        if slot >= range.end {
            return None;
        }
        let atom = &self.yarns[slot];
        if atom.id != id {
            return None;
        }
        return Some(atom);
    }

    /// Position of an atom in the canonical order.
    #[inline]
    pub fn position(&self, id: AtomId) -> Option<usize> {
        return self.positions.get(&id).copied();
    }

    /// Check if the weave holds an atom.
    #[inline]
    pub fn contains(&self, id: AtomId) -> bool {
        return self.positions.contains_key(&id);
    }

    /// Highest index present for each site that has atoms.
    #[inline]
    pub fn weft(&self) -> &Weft {
        return &self.weft;
    }

    /// The weft plus a `NULL_INDEX` entry for the owner if it has no
    /// atoms yet.
    pub fn complete_weft(&self) -> Weft {
        let mut weft = self.weft.clone();
        weft.update(self.owner, NULL_INDEX);
        return weft;
    }

    /// Check that this weave holds every atom of `other`.
    /// Both weaves must share a site id space.
    pub fn superset(&self, other: &Weave<V>) -> bool {
        return self.weft.is_superset(&other.weft);
    }

    /// Order two atoms of this weave by their canonical position.
    pub fn causal_order(&self, a: AtomId, b: AtomId) -> Option<Ordering> {
        let a = self.position(a)?;
        let b = self.position(b)?;
        return Some(a.cmp(&b));
    }

    /// The range of positions covered by an atom and all its descendants.
    pub fn causal_block(&self, id: AtomId) -> Option<Range<usize>> {
        let position = self.position(id)?;
        return Some(self.causal_block_at(position));
    }

    /// The direct children of an atom, in sibling order.
    pub fn children(&self, id: AtomId) -> impl Iterator<Item = &Atom<V>> + '_ {
        let block = self.causal_block(id).unwrap_or(0..0);
        return self.atoms[block]
            .iter()
            .filter(move |atom| atom.cause == id && atom.id != id);
    }

    /// The canonical order restricted to atoms included in `weft`:
    /// the weave as it looked at an earlier revision.
    pub fn atoms_in_weft<'a>(&'a self, weft: &'a Weft) -> impl Iterator<Item = &'a Atom<V>> + 'a {
        return self.atoms.iter().filter(move |atom| weft.included(atom.id));
    }

    /// Create a new atom under the owner site, caused by `cause`.
    ///
    /// Returns the new atom's id and its position in the canonical order.
    /// On error the weave is left untouched.
    pub fn add_atom(&mut self, value: V, cause: AtomId) -> Result<(AtomId, usize), InsertError> {
        return self.add_atom_with_reference(value, cause, AtomId::NULL);
    }

    /// Like `add_atom`, with a weak reference to another atom.
    pub fn add_atom_with_reference(
        &mut self,
        value: V,
        cause: AtomId,
        reference: AtomId,
    ) -> Result<(AtomId, usize), InsertError> {
        if self.owner == NULL_SITE || self.owner == CONTROL_SITE {
            return Err(InsertError::InvalidOwner(self.owner));
        }
        let head = self.position(cause).ok_or(InsertError::CauseNotFound(cause))?;
        if self.atoms[head].is_childless() {
            return Err(InsertError::ChildlessParent(cause));
        }
        if !reference.is_null() && !self.contains(reference) {
            return Err(InsertError::ReferenceNotFound(reference));
        }

        let index = self.weft.get(self.owner).unwrap_or(NULL_INDEX) + 1;
        let id = AtomId::new(self.owner, index);
        let timestamp = self.clock.increment();
        let atom = Atom::new(id, cause, timestamp, value).with_reference(reference);

        let position = self.insertion_point(head, &atom);
        self.atoms.insert(position, atom.clone());
        self.update_caches(atom, position);

        trace!(%id, %cause, timestamp, position, "added atom");
        return Ok((id, position));
    }

    /// Where a freshly stamped atom goes, given its cause's position.
    ///
    /// The new atom is the newest in the weave, so it leads its siblings,
    /// except that ordinary atoms must still trail any priority siblings.
    fn insertion_point(&self, head: usize, atom: &Atom<V>) -> usize {
        let mut position = head + 1;
        if atom.is_priority() {
            return position;
        }
        while position < self.atoms.len() {
            let next = &self.atoms[position];
            if next.cause != atom.cause || !next.is_priority() {
                break;
            }
            position = self.causal_block_at(position).end;
        }
        return position;
    }

    /// The causal block of the atom at `position`.
    ///
    /// The block ends at the first atom whose parent is older than the
    /// head: such a parent must be an ancestor of the head, so the atom is
    /// not a descendant.
    pub(crate) fn causal_block_at(&self, position: usize) -> Range<usize> {
        let head = self.atoms[position].timestamp;
        let mut end = position + 1;
        while end < self.atoms.len() {
            let parent = match self.atom(self.atoms[end].cause) {
                Some(parent) => parent,
                None => break,
            };
            if parent.timestamp < head {
                break;
            }
            end += 1;
        }
        return position..end;
    }

    /// Patch the caches after inserting `atom` at `position` in the atom
    /// list. The atom must be the newest of its yarn.
    fn update_caches(&mut self, atom: Atom<V>, position: usize) {
        for slot in self.positions.values_mut() {
            if *slot >= position {
                *slot += 1;
            }
        }
        self.positions.insert(atom.id, position);
        self.weft.update_atom(atom.id);

        let site = atom.id.site;
        let slot = match self.yarns_map.get(&site) {
            Some(range) => range.end,
            None => self
                .yarns_map
                .iter()
                .filter(|(other, _)| **other > site)
                .map(|(_, range)| range.start)
                .min()
                .unwrap_or(self.yarns.len()),
        };
        self.yarns.insert(slot, atom);
        for (other, range) in self.yarns_map.iter_mut() {
            if *other != site && range.start >= slot {
                range.start += 1;
                range.end += 1;
            }
        }
        self.yarns_map
            .entry(site)
            .and_modify(|range| range.end += 1)
            .or_insert(slot..slot + 1);
    }

    /// Rebuild yarns, weft and positions from the atom list.
    fn generate_cache_by_sorting_atoms(&mut self) {
        self.yarns = self.atoms.clone();
        self.yarns.sort_by_key(|atom| atom.id);

        self.yarns_map.clear();
        self.weft = Weft::new();
        let mut start = 0;
        for i in 0..self.yarns.len() {
            let id = self.yarns[i].id;
            self.weft.update_atom(id);
            let last = i + 1 == self.yarns.len() || self.yarns[i + 1].id.site != id.site;
            if last {
                self.yarns_map.insert(id.site, start..i + 1);
                start = i + 1;
            }
        }

        self.positions.clear();
        self.positions.reserve(self.atoms.len());
        for (position, atom) in self.atoms.iter().enumerate() {
            self.positions.insert(atom.id, position);
        }
    }

    /// Rewrite every site id in the weave through a remap table.
    pub fn remap_indices(&mut self, map: &SiteRemap) {
        if map.is_empty() {
            return;
        }
        self.owner = remap_site(map, self.owner);
        for atom in self.atoms.iter_mut() {
            atom.remap_indices(map);
        }
        self.generate_cache_by_sorting_atoms();
    }
}

impl<V: PartialEq> PartialEq for Weave<V> {
    /// Caches are derived, so only the serialized parts are compared.
    fn eq(&self, other: &Self) -> bool {
        return self.owner == other.owner && self.clock == other.clock && self.atoms == other.atoms;
    }
}

impl<V: Eq> Eq for Weave<V> {}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;
    use serde::de::Error;
    use tracing::warn;

    use super::Atom;
    use super::AtomValue;
    use super::LamportClock;
    use super::SiteId;
    use super::Weave;

    #[derive(Serialize)]
    #[serde(rename = "Weave")]
    struct WeaveRef<'a, V> {
        owner: SiteId,
        atoms: &'a [Atom<V>],
        clock: LamportClock,
    }

    #[derive(Deserialize)]
    #[serde(rename = "Weave")]
    struct WeaveData<V> {
        owner: SiteId,
        atoms: Vec<Atom<V>>,
        clock: LamportClock,
    }

    impl<V: AtomValue + Serialize> Serialize for Weave<V> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let data = WeaveRef {
                owner: self.owner,
                atoms: &self.atoms,
                clock: self.clock,
            };
            return data.serialize(serializer);
        }
    }

    impl<'de, V: AtomValue + Deserialize<'de>> Deserialize<'de> for Weave<V> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let data = WeaveData::<V>::deserialize(deserializer)?;
            return Weave::from_parts(data.owner, data.atoms, data.clock).map_err(|error| {
                warn!(%error, "rejected invalid weave");
                return D::Error::custom(error);
            });
        }
    }
}
