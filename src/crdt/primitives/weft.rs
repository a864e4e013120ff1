// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Weft: a per-site causal frontier.
//!
//! A weft maps each site to the highest yarn index known for it, meaning
//! "everything up to and including this index has been seen". Because
//! yarns never have gaps, this is enough to answer inclusion queries.
//!
//! A *complete* weft also carries an entry (possibly `NULL_INDEX`) for
//! every site the replica knows about, so wefts of replicas that share a
//! site space can be compared structurally.
//!
//! Complexity:
//! - update: O(1) average
//! - included: O(1) average
//! - is_superset: O(n) in the other weft's entries
//! - compare: O(max site id)

use std::cmp::Ordering;
use std::convert::Infallible;

use rustc_hash::FxHashMap;
#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::id::AtomId;
use super::id::NULL_INDEX;
use super::id::NULL_SITE;
use super::id::SiteId;
use super::id::YarnIndex;
use crate::crdt::Crdt;

/// A mapping from site to the highest included yarn index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Weft {
    mapping: FxHashMap<SiteId, YarnIndex>,
}

impl Weft {
    /// Create an empty weft.
    pub fn new() -> Weft {
        return Weft {
            mapping: FxHashMap::default(),
        };
    }

    /// Raise the entry for `site` to at least `index`.
    /// The null site is ignored.
    pub fn update(&mut self, site: SiteId, index: YarnIndex) {
        if site == NULL_SITE {
            return;
        }
        let entry = self.mapping.entry(site).or_insert(index);
        *entry = (*entry).max(index);
    }

    /// Raise the entry for the atom's site to at least the atom's index.
    #[inline]
    pub fn update_atom(&mut self, id: AtomId) {
        self.update(id.site, id.index);
    }

    /// The highest included index for a site, if the site has an entry.
    #[inline]
    pub fn get(&self, site: SiteId) -> Option<YarnIndex> {
        return self.mapping.get(&site).copied();
    }

    /// Check whether an atom lies within this frontier.
    /// The null atom is vacuously included.
    pub fn included(&self, id: AtomId) -> bool {
        if id.is_null() {
            return true;
        }
        return match self.mapping.get(&id.site) {
            Some(&index) => index >= id.index,
            None => false,
        };
    }

    /// Check that every entry in `other` is covered by this weft.
    /// A site missing locally fails the check, even for `NULL_INDEX`.
    pub fn is_superset(&self, other: &Weft) -> bool {
        for (site, index) in &other.mapping {
            match self.mapping.get(site) {
                Some(local) if local >= index => {}
                _ => return false,
            }
        }
        return true;
    }

    /// Number of sites with an entry.
    #[inline]
    pub fn len(&self) -> usize {
        return self.mapping.len();
    }

    /// Check if the weft has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.mapping.is_empty();
    }

    /// Iterate over all (site, index) entries in site order.
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, YarnIndex)> + '_ {
        let mut entries: Vec<(SiteId, YarnIndex)> =
            self.mapping.iter().map(|(s, i)| (*s, *i)).collect();
        entries.sort_unstable();
        return entries.into_iter();
    }

    /// Lay the weft out as a dense array indexed by site, padded with
    /// `NULL_INDEX` up to `len`.
    fn dense(&self, len: usize) -> Vec<YarnIndex> {
        let mut dense = vec![NULL_INDEX; len];
        for (site, index) in &self.mapping {
            dense[*site as usize] = *index;
        }
        return dense;
    }

    fn dense_len(&self) -> usize {
        return self
            .mapping
            .keys()
            .map(|site| *site as usize + 1)
            .max()
            .unwrap_or(0);
    }
}

impl Crdt for Weft {
    type Error = Infallible;

    fn integrate(&mut self, other: Weft) -> Result<(), Infallible> {
        for (site, index) in other.mapping {
            self.update(site, index);
        }
        return Ok(());
    }
}

impl PartialOrd for Weft {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

/// Lexicographic over the dense per-site arrays. Site ids are small and
/// contiguous, so this stays cheap. Ties between explicit `NULL_INDEX`
/// entries and missing ones fall back to the sorted key sets, keeping the
/// order consistent with map equality.
impl Ord for Weft {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.dense_len().max(other.dense_len());
        return self.dense(len).cmp(&other.dense(len)).then_with(|| {
            let mut ours: Vec<SiteId> = self.mapping.keys().copied().collect();
            let mut theirs: Vec<SiteId> = other.mapping.keys().copied().collect();
            ours.sort_unstable();
            theirs.sort_unstable();
            return ours.cmp(&theirs);
        });
    }
}

impl FromIterator<(SiteId, YarnIndex)> for Weft {
    fn from_iter<T: IntoIterator<Item = (SiteId, YarnIndex)>>(iter: T) -> Self {
        let mut weft = Weft::new();
        for (site, index) in iter {
            weft.update(site, index);
        }
        return weft;
    }
}
