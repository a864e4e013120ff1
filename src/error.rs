// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Error types for the causal tree.
//!
//! - [`InsertError`]: a local insertion was rejected; the weave is untouched.
//! - [`ValidationError`]: a weave or site index breaks a structural
//!   invariant. Run validation on anything received from a peer before
//!   merging it.
//! - [`MergeError`]: the merge walk met atoms it could not order. With
//!   validated input this does not happen, so treat it as corruption.

use thiserror::Error;
use uuid::Uuid;

use crate::crdt::primitives::AtomId;
use crate::crdt::primitives::SiteId;

/// Errors from inserting a single atom.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum InsertError {
    /// The declared cause is not in the weave.
    #[error("cannot locate causing atom {0}")]
    CauseNotFound(AtomId),

    /// The declared cause may never have children.
    #[error("appending to childless parent {0}")]
    ChildlessParent(AtomId),

    /// The weak reference is not in the weave.
    #[error("cannot locate referenced atom {0}")]
    ReferenceNotFound(AtomId),

    /// The owner site is not a valid site id.
    #[error("site {0} cannot own atoms")]
    InvalidOwner(SiteId),
}

/// A structural invariant that a weave or site index violates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The weave has no atoms at all.
    #[error("weave has no atoms")]
    NoAtoms,

    /// The first atom is not the root.
    #[error("first atom is not the root")]
    MissingRoot,

    /// The same atom id occurs twice.
    #[error("atom {0} occurs more than once")]
    DuplicateAtom(AtomId),

    /// An atom's cause is not in the weave.
    #[error("atom {0} has no parent in the weave")]
    TreeAtomIsUnparented(AtomId),

    /// An atom is outside its cause's causal block.
    #[error("atom {0} is not inside its parent's causal block")]
    CausalityViolation(AtomId),

    /// An atom's timestamp is not greater than its cause's.
    #[error("atom {0} is not causally aware of its parent")]
    AtomUnawareOfParent(AtomId),

    /// An atom's reference is missing or not older than the atom.
    #[error("atom {0} is not causally aware of its reference")]
    AtomUnawareOfReference(AtomId),

    /// An atom has a childless cause.
    #[error("atom {0} has a childless parent")]
    ChildlessAtomHasChildren(AtomId),

    /// Two siblings are out of sibling order.
    #[error("atom {0} is out of sibling order")]
    IncorrectTreeAtomOrder(AtomId),

    /// A site's yarn skips an index.
    #[error("yarn of site {0} is not contiguous")]
    YarnGap(SiteId),

    /// The lamport clock is not ahead of every timestamp.
    #[error("lamport clock is behind atom {0}")]
    ClockBehind(AtomId),

    /// The yarn caches disagree with the atom list.
    #[error("yarn caches do not match the weave")]
    CacheMismatch,

    /// The site index is unsorted or holds a duplicate uuid.
    #[error("site index is malformed at position {0}")]
    InvalidSiteIndex(usize),

    /// A site used by the weave is not in the site index.
    #[error("site {0} is not in the site index")]
    UnknownSite(SiteId),
}

/// Errors from merging two weaves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The cheap comparison could not order the atoms.
    #[error("insufficient information to order {0} and {1}")]
    InsufficientInformation(AtomId, AtomId),

    /// An atom needed for comparison is missing from its weave.
    #[error("atom {0} is missing from its weave")]
    UnknownAtom(AtomId),

    /// A fast-forward ran off the end of a weave.
    #[error("fast-forward to atom {0} ran past the end of the weave")]
    FastForwardOverrun(AtomId),

    /// Two atoms could not be ordered by any rule.
    #[error("atoms {local} and {remote} cannot be ordered")]
    Corrupted {
        /// The local atom.
        local: AtomId,
        /// The remote atom.
        remote: AtomId,
    },

    /// The two site indices list one uuid with different creation clocks.
    #[error("site {0} has conflicting creation clocks")]
    SiteConflict(Uuid),
}
