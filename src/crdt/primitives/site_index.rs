// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Site index mapping globally unique site uuids to compact site ids.
//!
//! Atoms store a 16-bit `SiteId` instead of a 16-byte uuid. The site id
//! of a uuid is its position in a list of (clock, uuid) keys kept sorted,
//! so two replicas that know the same sites assign the same ids, and the
//! relative order of any two site ids is the same everywhere.
//!
//! The price is that adding a site can shift the ids of every site after
//! it. Merging returns the first position that changed so callers can
//! remap their weaves; see [`SiteIndex::index_map`].
//!
//! Position 0 always holds the nil uuid at clock 0: the control site that
//! owns the root atom.
//!
//! Complexity:
//! - add_site: O(n)
//! - site_for: O(n)
//! - uuid_for: O(1)
//! - integrate: O(n + m)
//! - Maximum 65,535 sites (`u16::MAX` reserved for the null site)

use rustc_hash::FxHashSet;
#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::id::CONTROL_SITE;
use super::id::Clock;
use super::id::NULL_SITE;
use super::id::SiteId;
use super::id::SiteRemap;
use crate::crdt::Crdt;
use crate::error::MergeError;
use crate::error::ValidationError;

/// One entry of the site index. Sorts by clock, then uuid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiteIndexKey {
    /// When the site was created.
    pub clock: Clock,
    /// The globally unique site identifier.
    pub id: Uuid,
}

impl SiteIndexKey {
    /// The entry of the control site.
    pub const CONTROL: SiteIndexKey = SiteIndexKey {
        clock: 0,
        id: Uuid::nil(),
    };
}

/// A sorted table of sites. Position in the table is the site id.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<SiteIndexKey>", into = "Vec<SiteIndexKey>"))]
pub struct SiteIndex {
    entries: Vec<SiteIndexKey>,
}

impl Default for SiteIndex {
    fn default() -> Self {
        return Self::new();
    }
}

impl SiteIndex {
    /// Create a site index holding only the control site.
    pub fn new() -> SiteIndex {
        return SiteIndex {
            entries: vec![SiteIndexKey::CONTROL],
        };
    }

    /// Build a site index from serialized keys, checking its invariants.
    pub fn from_keys(entries: Vec<SiteIndexKey>) -> Result<SiteIndex, ValidationError> {
        let index = SiteIndex { entries };
        index.validate()?;
        return Ok(index);
    }

    /// Get or insert a site, returning its id.
    ///
    /// If the uuid is already known, returns its existing id and ignores
    /// `clock`. Otherwise inserts it at its sorted position, which shifts
    /// the id of every later site by one.
    ///
    /// Panics if trying to add more than 65,535 sites.
    pub fn add_site(&mut self, id: Uuid, clock: Clock) -> SiteId {
        if let Some(site) = self.site_for(id) {
            return site;
        }
        assert!(self.entries.len() < NULL_SITE as usize, "too many sites (max 65535)");

        let key = SiteIndexKey { clock, id };
        let position = self.entries.partition_point(|entry| *entry < key);
        self.entries.insert(position, key);
        return position as SiteId;
    }

    /// Get the id of a site, if it is known.
    pub fn site_for(&self, id: Uuid) -> Option<SiteId> {
        return self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .map(|position| position as SiteId);
    }

    /// Get the uuid of a site id, if it exists.
    #[inline]
    pub fn uuid_for(&self, site: SiteId) -> Option<Uuid> {
        return self.key_for(site).map(|key| key.id);
    }

    /// Get the full entry of a site id, if it exists.
    #[inline]
    pub fn key_for(&self, site: SiteId) -> Option<SiteIndexKey> {
        if site == NULL_SITE {
            return None;
        }
        return self.entries.get(site as usize).copied();
    }

    /// Get the number of sites, including the control site.
    #[inline]
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Always false: the control site is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Iterate over all (site, key) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &SiteIndexKey)> {
        return self
            .entries
            .iter()
            .enumerate()
            .map(|(i, key)| (i as SiteId, key));
    }

    /// Iterate over all site ids, including the control site.
    pub fn sites(&self) -> impl Iterator<Item = SiteId> + use<> {
        return (0..self.entries.len()).map(|i| i as SiteId);
    }

    /// Check that no uuid is listed in both indices with different
    /// creation clocks. Such indices cannot be merged.
    pub fn check_compatible(&self, other: &SiteIndex) -> Result<(), MergeError> {
        for key in &other.entries {
            if let Some(site) = self.site_for(key.id) {
                if self.entries[site as usize] != *key {
                    return Err(MergeError::SiteConflict(key.id));
                }
            }
        }
        return Ok(());
    }

    /// Merge the entries of `other` into this index.
    ///
    /// The two indices must pass [`SiteIndex::check_compatible`].
    /// Returns the first position whose entry changed, or `None` if
    /// nothing was added. Every site id at or after that position may now
    /// refer to a different uuid.
    pub fn integrate(&mut self, other: &SiteIndex) -> Option<usize> {
        let mut first_change = None;
        let mut i = 0;
        let mut j = 0;

        while j < other.entries.len() {
            let theirs = other.entries[j];
            if i >= self.entries.len() {
                assert!(self.entries.len() < NULL_SITE as usize, "too many sites (max 65535)");
                self.entries.push(theirs);
                first_change = first_change.or(Some(i));
                i += 1;
                j += 1;
                continue;
            }

            let ours = self.entries[i];
            if ours < theirs {
                i += 1;
            } else if ours > theirs {
                assert!(self.entries.len() < NULL_SITE as usize, "too many sites (max 65535)");
                self.entries.insert(i, theirs);
                first_change = first_change.or(Some(i));
                i += 1;
                j += 1;
            } else {
                i += 1;
                j += 1;
            }
        }

        return first_change;
    }

    /// Check that entries are strictly sorted, start with the control site
    /// and hold no duplicate uuids.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.entries.first() != Some(&SiteIndexKey::CONTROL) {
            return Err(ValidationError::InvalidSiteIndex(CONTROL_SITE as usize));
        }
        if self.entries.len() > NULL_SITE as usize {
            return Err(ValidationError::InvalidSiteIndex(NULL_SITE as usize));
        }

        let mut seen = FxHashSet::default();
        for (i, key) in self.entries.iter().enumerate() {
            if i > 0 && self.entries[i - 1] >= *key {
                return Err(ValidationError::InvalidSiteIndex(i));
            }
            if !seen.insert(key.id) {
                return Err(ValidationError::InvalidSiteIndex(i));
            }
        }
        return Ok(());
    }

    /// Compute how the site ids of `local` move once `remote` is merged
    /// into it.
    ///
    /// The returned table maps old ids to new ids and only lists ids that
    /// change. Calling this with the arguments swapped gives the table for
    /// the remote side; both land in the same id space.
    pub fn index_map(local: &SiteIndex, remote: &SiteIndex) -> SiteRemap {
        let mut map = SiteRemap::default();
        let mut merged = local.clone();
        let first_change = match merged.integrate(remote) {
            Some(position) => position,
            None => return map,
        };

        let mut targets = FxHashSet::default();
        for old in first_change..local.entries.len() {
            let key = local.entries[old];
            let new = match merged.entries.binary_search(&key) {
                Ok(new) => new,
                Err(_) => panic!("site {} vanished while merging site indices", old),
            };
            assert!(targets.insert(new), "site remap collision on {}", new);
            if new != old {
                map.insert(old as SiteId, new as SiteId);
            }
        }

        if !map.is_empty() {
            debug!(remapped = map.len(), first_change, "computed site remap");
        }
        return map;
    }
}

impl Crdt for SiteIndex {
    type Error = MergeError;

    fn integrate(&mut self, other: SiteIndex) -> Result<(), MergeError> {
        self.check_compatible(&other)?;
        SiteIndex::integrate(self, &other);
        return Ok(());
    }
}

impl TryFrom<Vec<SiteIndexKey>> for SiteIndex {
    type Error = ValidationError;

    fn try_from(entries: Vec<SiteIndexKey>) -> Result<Self, Self::Error> {
        return SiteIndex::from_keys(entries);
    }
}

impl From<SiteIndex> for Vec<SiteIndexKey> {
    fn from(index: SiteIndex) -> Self {
        return index.entries;
    }
}
