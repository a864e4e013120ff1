// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! A replica: a site index and a weave sharing one site id space.
//!
//! Weaves only speak in compact site ids, which are positions in a site
//! index. Two replicas that have seen different sites number them
//! differently, so merging starts by computing how each side's ids move
//! once the two site indices are combined, rewriting both weaves into the
//! combined numbering, and only then merging the weaves.

use tracing::debug;
use uuid::Uuid;

use super::Crdt;
use super::atom::AtomValue;
use super::primitives::AtomId;
use super::primitives::Clock;
use super::primitives::NULL_INDEX;
use super::primitives::SiteId;
use super::primitives::SiteIndex;
use super::primitives::Weft;
use super::weave::Weave;
use crate::error::InsertError;
use crate::error::MergeError;
use crate::error::ValidationError;

/// A site index and a weave, kept in the same site id space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CausalTree<V> {
    site_index: SiteIndex,
    weave: Weave<V>,
}

impl<V: AtomValue> CausalTree<V> {
    /// Create a replica owned by a fresh site.
    ///
    /// `clock` is the site's creation time; it decides where the site
    /// lands in every site index it is merged into.
    pub fn new(id: Uuid, clock: Clock) -> CausalTree<V> {
        let mut site_index = SiteIndex::new();
        let owner = site_index.add_site(id, clock);
        return CausalTree {
            site_index,
            weave: Weave::new(owner),
        };
    }

    /// Create a replica owned by a fresh site with a random uuid.
    pub fn with_random_site(clock: Clock) -> CausalTree<V> {
        return CausalTree::new(Uuid::new_v4(), clock);
    }

    /// Combine a site index and a weave that already share an id space.
    pub fn from_parts(site_index: SiteIndex, weave: Weave<V>) -> Result<CausalTree<V>, ValidationError> {
        let tree = CausalTree { site_index, weave };
        tree.validate()?;
        return Ok(tree);
    }

    /// Split the replica back into its site index and weave.
    pub fn into_parts(self) -> (SiteIndex, Weave<V>) {
        return (self.site_index, self.weave);
    }

    /// The table of sites this replica knows.
    pub fn site_index(&self) -> &SiteIndex {
        return &self.site_index;
    }

    /// The atoms, in canonical order with their caches.
    pub fn weave(&self) -> &Weave<V> {
        return &self.weave;
    }

    /// The site local atoms are created under.
    pub fn owner(&self) -> SiteId {
        return self.weave.owner();
    }

    /// The uuid of the owner site.
    pub fn owner_uuid(&self) -> Option<Uuid> {
        return self.site_index.uuid_for(self.weave.owner());
    }

    /// The uuid behind a site id, if the site is known.
    pub fn site_uuid(&self, site: SiteId) -> Option<Uuid> {
        return self.site_index.uuid_for(site);
    }

    /// The site id of a uuid, if the site is known.
    pub fn site_for(&self, id: Uuid) -> Option<SiteId> {
        return self.site_index.site_for(id);
    }

    /// Create a new atom as the owner. See [`Weave::add_atom`].
    pub fn add_atom(&mut self, value: V, cause: AtomId) -> Result<(AtomId, usize), InsertError> {
        return self.weave.add_atom(value, cause);
    }

    /// Create a new atom with a weak reference as the owner.
    pub fn add_atom_with_reference(
        &mut self,
        value: V,
        cause: AtomId,
        reference: AtomId,
    ) -> Result<(AtomId, usize), InsertError> {
        return self.weave.add_atom_with_reference(value, cause, reference);
    }

    /// The weave's weft, with a `NULL_INDEX` entry for every known site
    /// that has no atoms yet.
    pub fn complete_weft(&self) -> Weft {
        let mut weft = self.weave.complete_weft();
        for site in self.site_index.sites() {
            weft.update(site, NULL_INDEX);
        }
        return weft;
    }

    /// Check that this replica knows every site and every atom `other`
    /// knows. The two replicas may number their sites differently.
    pub fn superset(&self, other: &CausalTree<V>) -> bool {
        let ours = self.complete_weft();
        for (site, index) in other.complete_weft().iter() {
            let local = other
                .site_index
                .uuid_for(site)
                .and_then(|id| self.site_index.site_for(id));
            let local = match local {
                Some(local) => local,
                None => return false,
            };
            match ours.get(local) {
                Some(known) if known >= index => {}
                _ => return false,
            }
        }
        return true;
    }

    /// Merge another replica into this one.
    ///
    /// Both site indices are combined first and both weaves are rewritten
    /// into the combined numbering; then the weaves are merged. On error
    /// this replica is left as it was.
    pub fn integrate(&mut self, other: CausalTree<V>) -> Result<(), MergeError> {
        let CausalTree {
            site_index: remote_index,
            weave: mut remote,
        } = other;

        self.site_index.check_compatible(&remote_index)?;
        let local_map = SiteIndex::index_map(&self.site_index, &remote_index);
        let remote_map = SiteIndex::index_map(&remote_index, &self.site_index);
        remote.remap_indices(&remote_map);

        if local_map.is_empty() {
            self.weave.integrate(remote)?;
        } else {
            let mut weave = self.weave.clone();
            weave.remap_indices(&local_map);
            weave.integrate(remote)?;
            self.weave = weave;
        }
        self.site_index.integrate(&remote_index);

        debug!(
            local_remapped = local_map.len(),
            remote_remapped = remote_map.len(),
            sites = self.site_index.len(),
            atoms = self.weave.len(),
            "integrated causal tree"
        );
        return Ok(());
    }

    /// Make `id` the owner of this replica, adding it to the site index
    /// if it is new. Returns the owner's site id.
    ///
    /// Adding a site may renumber existing sites, in which case the weave
    /// is rewritten to match.
    pub fn transfer_to_new_owner(&mut self, id: Uuid, clock: Clock) -> SiteId {
        if let Some(site) = self.site_index.site_for(id) {
            if site != self.weave.owner() {
                debug!(%id, site, "transferred ownership to known site");
                self.weave.set_owner(site);
            }
            return site;
        }

        let mut added = SiteIndex::new();
        added.add_site(id, clock);
        let map = SiteIndex::index_map(&self.site_index, &added);
        self.weave.remap_indices(&map);
        self.site_index.integrate(&added);

        let site = self.site_index.add_site(id, clock);
        self.weave.set_owner(site);
        debug!(%id, site, remapped = map.len(), "transferred ownership to new site");
        return site;
    }

    /// Validate the site index, the weave, and that every site the weave
    /// uses (including the owner) is listed in the site index.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.site_index.validate()?;
        self.weave.validate()?;

        let known = self.site_index.len();
        let owner = self.weave.owner();
        if owner as usize >= known {
            return Err(ValidationError::UnknownSite(owner));
        }
        for (site, _) in self.weave.weft().iter() {
            if site as usize >= known {
                return Err(ValidationError::UnknownSite(site));
            }
        }
        return Ok(());
    }
}

impl<V: AtomValue> Crdt for CausalTree<V> {
    type Error = MergeError;

    fn integrate(&mut self, other: CausalTree<V>) -> Result<(), MergeError> {
        return CausalTree::integrate(self, other);
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;
    use serde::de::Error;
    use tracing::warn;

    use super::AtomValue;
    use super::CausalTree;
    use super::SiteIndex;
    use super::Weave;

    #[derive(Serialize)]
    #[serde(rename = "CausalTree")]
    struct CausalTreeRef<'a, V: AtomValue> {
        site_index: &'a SiteIndex,
        weave: &'a Weave<V>,
    }

    #[derive(Deserialize)]
    #[serde(rename = "CausalTree")]
    struct CausalTreeData<V: AtomValue> {
        site_index: SiteIndex,
        weave: Weave<V>,
    }

    impl<V: AtomValue + Serialize> Serialize for CausalTree<V> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let data = CausalTreeRef {
                site_index: &self.site_index,
                weave: &self.weave,
            };
            return data.serialize(serializer);
        }
    }

    impl<'de, V: AtomValue + Deserialize<'de>> Deserialize<'de> for CausalTree<V> {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let data = CausalTreeData::<V>::deserialize(deserializer)?;
            return CausalTree::from_parts(data.site_index, data.weave).map_err(|error| {
                warn!(%error, "rejected invalid causal tree");
                return D::Error::custom(error);
            });
        }
    }
}
