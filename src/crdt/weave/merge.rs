// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Merging two weaves.
//!
//! Both weaves are in canonical order, and the canonical order of any
//! shared atoms is the same in both. The merge walks the two atom lists
//! with one cursor each and emits a fused list:
//!
//! 1. Identical atoms are emitted once; the root always comes first.
//! 2. If one side already holds the other side's current atom (checked
//!    against its weft), that side is ahead: emit its atoms up to the
//!    shared one.
//! 3. Otherwise the two atoms are concurrent. Find where their ancestry
//!    splits, compare the two diverging siblings, and emit the whole
//!    causal block of the winner.
//!
//! Step 3 only triggers on genuinely concurrent edits, and only walks the
//! atoms added since the split.

use std::cmp::Ordering;

use tracing::debug;

use super::Weave;
use crate::crdt::Crdt;
use crate::crdt::atom::Atom;
use crate::crdt::atom::AtomValue;
use crate::error::MergeError;

/// Order two atoms using only trivial rules: identity and the root.
fn basic_order<V: AtomValue>(local: &Atom<V>, remote: &Atom<V>) -> Result<Ordering, MergeError> {
    if local.id == remote.id {
        return Ok(Ordering::Equal);
    }
    if local.is_root() {
        return Ok(Ordering::Less);
    }
    if remote.is_root() {
        return Ok(Ordering::Greater);
    }
    return Err(MergeError::InsufficientInformation(local.id, remote.id));
}

impl<V: AtomValue> Weave<V> {
    /// Merge another weave into this one.
    ///
    /// Both weaves must already share one site id space (see
    /// `CausalTree::integrate`) and each must be valid. The remote weave
    /// is consumed. If the walk finds atoms it cannot order, an error is
    /// returned and this weave is left as it was.
    pub fn integrate(&mut self, other: Weave<V>) -> Result<(), MergeError> {
        let local = &self.atoms;
        let remote = &other.atoms;
        let local_weft = self.complete_weft();
        let remote_weft = other.complete_weft();

        let mut merged: Vec<Atom<V>> = Vec::with_capacity(local.len().max(remote.len()));
        let mut fast_forwards = 0usize;
        let mut conflicts = 0usize;
        let mut i = 0;
        let mut j = 0;

        while j < remote.len() {
            if i >= local.len() {
                merged.push(remote[j].clone());
                j += 1;
                continue;
            }

            match basic_order(&local[i], &remote[j]) {
                Ok(Ordering::Equal) => {
                    merged.push(local[i].clone());
                    i += 1;
                    j += 1;
                    continue;
                }
                Ok(Ordering::Less) => {
                    merged.push(local[i].clone());
                    i += 1;
                    continue;
                }
                Ok(Ordering::Greater) => {
                    merged.push(remote[j].clone());
                    j += 1;
                    continue;
                }
                Err(MergeError::InsufficientInformation(..)) => {}
                Err(error) => return Err(error),
            }

            let local_id = local[i].id;
            let remote_id = remote[j].id;

            if local_weft.included(remote_id) {
                // Local is ahead: everything before the shared atom is new.
                let target = self
                    .position(remote_id)
                    .ok_or(MergeError::FastForwardOverrun(remote_id))?;
                if target <= i {
                    return Err(MergeError::Corrupted {
                        local: local_id,
                        remote: remote_id,
                    });
                }
                merged.extend_from_slice(&local[i..target]);
                i = target;
                fast_forwards += 1;
            } else if remote_weft.included(local_id) {
                let target = other
                    .position(local_id)
                    .ok_or(MergeError::FastForwardOverrun(local_id))?;
                if target <= j {
                    return Err(MergeError::Corrupted {
                        local: local_id,
                        remote: remote_id,
                    });
                }
                merged.extend_from_slice(&remote[j..target]);
                j = target;
                fast_forwards += 1;
            } else {
                conflicts += 1;
                match self.concurrent_order(&local[i], &other, &remote[j])? {
                    Ordering::Less => {
                        let block = self.causal_block_at(i);
                        i = block.end;
                        merged.extend_from_slice(&local[block]);
                    }
                    Ordering::Greater => {
                        let block = other.causal_block_at(j);
                        j = block.end;
                        merged.extend_from_slice(&remote[block]);
                    }
                    Ordering::Equal => {
                        return Err(MergeError::Corrupted {
                            local: local_id,
                            remote: remote_id,
                        });
                    }
                }
            }
        }

        if i < local.len() {
            merged.extend_from_slice(&local[i..]);
        }

        debug!(
            local = self.atoms.len(),
            remote = other.atoms.len(),
            merged = merged.len(),
            fast_forwards,
            conflicts,
            "integrated weave"
        );

        self.atoms = merged;
        self.generate_cache_by_sorting_atoms();
        let Ok(()) = self.clock.integrate(other.clock);
        return Ok(());
    }

    /// Order a local atom against a remote atom that neither side shares.
    ///
    /// Climbs both ancestries towards their last common ancestor, always
    /// stepping from the younger atom (an ancestor is strictly older than
    /// its descendants), then applies the sibling order law to the two
    /// children of that ancestor on either path.
    fn concurrent_order(
        &self,
        local: &Atom<V>,
        other: &Weave<V>,
        remote: &Atom<V>,
    ) -> Result<Ordering, MergeError> {
        let mut a = local;
        let mut b = remote;
        let mut a_child: Option<&Atom<V>> = None;
        let mut b_child: Option<&Atom<V>> = None;
        let mut steps = self.len() + other.len();

        while a.id != b.id {
            if steps == 0 {
                return Err(MergeError::Corrupted {
                    local: local.id,
                    remote: remote.id,
                });
            }
            steps -= 1;

            if a.timestamp >= b.timestamp && !a.is_root() {
                a_child = Some(a);
                a = self.atom(a.cause).ok_or(MergeError::UnknownAtom(a.cause))?;
            } else if !b.is_root() {
                b_child = Some(b);
                b = other.atom(b.cause).ok_or(MergeError::UnknownAtom(b.cause))?;
            } else {
                return Err(MergeError::Corrupted {
                    local: local.id,
                    remote: remote.id,
                });
            }
        }

        return match (a_child, b_child) {
            (None, None) => Ok(Ordering::Equal),
            // The local atom is an ancestor of the remote one
            (None, Some(_)) => Ok(Ordering::Less),
            (Some(_), None) => Ok(Ordering::Greater),
            (Some(x), Some(y)) => {
                if x.sibling_precedes(y) {
                    Ok(Ordering::Less)
                } else if y.sibling_precedes(x) {
                    Ok(Ordering::Greater)
                } else {
                    Err(MergeError::Corrupted {
                        local: local.id,
                        remote: remote.id,
                    })
                }
            }
        };
    }
}

impl<V: AtomValue> Crdt for Weave<V> {
    type Error = MergeError;

    fn integrate(&mut self, other: Weave<V>) -> Result<(), MergeError> {
        return Weave::integrate(self, other);
    }
}
