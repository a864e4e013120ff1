// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Identifier types for atoms and sites.
//!
//! # Identifier Hierarchy
//!
//! - `SiteId`: compact local index of a replica, assigned by the site index
//! - `YarnIndex`: per-site sequence number, starting at 0
//! - `AtomId`: identifies one atom as (site, index)
//!
//! # Sentinels
//!
//! The sentinel values `NULL_SITE`, `NULL_INDEX` and `AtomId::NULL` keep
//! their meaning on the wire. Inside the crate, prefer `AtomId::get` to
//! turn a possibly-null id into an `Option`.

use std::fmt;

use rustc_hash::FxHashMap;
#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

/// Compact, replica-local site identifier (an index into the site index).
pub type SiteId = u16;

/// Per-site sequence number of an atom.
pub type YarnIndex = i32;

/// Lamport timestamp.
pub type Clock = u64;

/// Sentinel meaning "no site".
pub const NULL_SITE: SiteId = SiteId::MAX;

/// The site of the implicit root atom.
pub const CONTROL_SITE: SiteId = 0;

/// Sentinel meaning "no index". Smaller than every real index, so that
/// `max(NULL_INDEX, x) == x`.
pub const NULL_INDEX: YarnIndex = -1;

/// A translation table from old site ids to new site ids.
///
/// Sites missing from the table keep their id.
pub type SiteRemap = FxHashMap<SiteId, SiteId>;

/// Translate a site through a remap table.
#[inline]
pub fn remap_site(map: &SiteRemap, site: SiteId) -> SiteId {
    if site == NULL_SITE {
        return site;
    }
    return map.get(&site).copied().unwrap_or(site);
}

/// An atom identifier.
///
/// The ordering is by (site, index). It exists for bookkeeping only and
/// says nothing about where the atom lives in the causal tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AtomId {
    /// The site that created the atom.
    pub site: SiteId,
    /// The position of the atom in its site's yarn.
    pub index: YarnIndex,
}

impl AtomId {
    /// The "no atom" sentinel.
    pub const NULL: AtomId = AtomId {
        site: NULL_SITE,
        index: NULL_INDEX,
    };

    /// The id of the root atom every weave starts with.
    pub const ROOT: AtomId = AtomId {
        site: CONTROL_SITE,
        index: 0,
    };

    /// Create a new atom ID.
    pub const fn new(site: SiteId, index: YarnIndex) -> AtomId {
        return AtomId { site, index };
    }

    /// Check if this is the null sentinel.
    #[inline]
    pub fn is_null(&self) -> bool {
        return *self == AtomId::NULL;
    }

    /// `None` for the null sentinel, `Some(self)` otherwise.
    #[inline]
    pub fn get(self) -> Option<AtomId> {
        if self.is_null() {
            return None;
        }
        return Some(self);
    }

    /// Inverse of `get`.
    #[inline]
    pub fn from_option(id: Option<AtomId>) -> AtomId {
        return id.unwrap_or(AtomId::NULL);
    }

    /// Rewrite the site through a remap table.
    #[inline]
    pub fn remap(&mut self, map: &SiteRemap) {
        self.site = remap_site(map, self.site);
    }
}

impl Default for AtomId {
    fn default() -> Self {
        return AtomId::NULL;
    }
}

impl fmt::Debug for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "AtomId(null)");
        }
        return write!(f, "AtomId({}:{})", self.site, self.index);
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "null");
        }
        return write!(f, "{}:{}", self.site, self.index);
    }
}
