// model = "claude-opus-4-5"
// created = 2026-10-19
// modified = 2026-10-19
// driver = "Isaac Clayton"

//! Structural validation of a weave.
//!
//! Checked in one pass over the yarns and one over the atoms:
//!
//! - yarns are sorted, gap-free, free of duplicates and agree with the
//!   weft and the position index
//! - the root comes first and is the only self-caused atom
//! - every atom sits inside its parent's causal block (checked with a
//!   stack of open ancestors)
//! - timestamps grow along causes and references
//! - childless atoms have no children
//! - siblings follow the sibling order law
//! - the clock is ahead of every timestamp

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use smallvec::smallvec;

use super::Weave;
use crate::crdt::atom::AtomValue;
use crate::crdt::primitives::AtomId;
use crate::error::ValidationError;

impl<V: AtomValue> Weave<V> {
    /// Check every structural invariant of the weave.
    ///
    /// Run this on any weave received from a peer before merging it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.atoms.is_empty() {
            return Err(ValidationError::NoAtoms);
        }
        let root = &self.atoms[0];
        if root.id != AtomId::ROOT || !root.is_root() {
            return Err(ValidationError::MissingRoot);
        }

        self.validate_yarns()?;

        // Positions of the ancestors of the current atom, innermost last.
        let mut open: SmallVec<[usize; 32]> = smallvec![0];
        // Last child seen for each parent position.
        let mut last_child: FxHashMap<usize, usize> = FxHashMap::default();
        let mut newest = root;

        for (i, atom) in self.atoms.iter().enumerate().skip(1) {
            if atom.is_root() {
                return Err(ValidationError::CausalityViolation(atom.id));
            }
            let parent_position = self
                .position(atom.cause)
                .ok_or(ValidationError::TreeAtomIsUnparented(atom.id))?;
            if parent_position >= i {
                return Err(ValidationError::CausalityViolation(atom.id));
            }

            let parent = &self.atoms[parent_position];
            if parent.is_childless() {
                return Err(ValidationError::ChildlessAtomHasChildren(parent.id));
            }
            if atom.timestamp <= parent.timestamp {
                return Err(ValidationError::AtomUnawareOfParent(atom.id));
            }
            if !atom.reference.is_null() {
                match self.atom(atom.reference) {
                    Some(reference) if reference.timestamp < atom.timestamp => {}
                    _ => return Err(ValidationError::AtomUnawareOfReference(atom.id)),
                }
            }

            // Close every block that ends before this atom
            while let Some(&top) = open.last() {
                if top == parent_position {
                    break;
                }
                open.pop();
            }
            if open.is_empty() {
                return Err(ValidationError::CausalityViolation(atom.id));
            }
            open.push(i);

            if let Some(&previous) = last_child.get(&parent_position) {
                if !self.atoms[previous].sibling_precedes(atom) {
                    return Err(ValidationError::IncorrectTreeAtomOrder(atom.id));
                }
            }
            last_child.insert(parent_position, i);

            if atom.timestamp > newest.timestamp {
                newest = atom;
            }
        }

        if self.clock.time() <= newest.timestamp {
            return Err(ValidationError::ClockBehind(newest.id));
        }
        return Ok(());
    }

    fn validate_yarns(&self) -> Result<(), ValidationError> {
        if self.yarns.len() != self.atoms.len() {
            return Err(ValidationError::CacheMismatch);
        }
        for pair in self.yarns.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(ValidationError::DuplicateAtom(pair[0].id));
            }
            if pair[0].id > pair[1].id {
                return Err(ValidationError::CacheMismatch);
            }
        }
        if self.positions.len() != self.atoms.len() || self.weft.len() != self.yarns_map.len() {
            return Err(ValidationError::CacheMismatch);
        }

        let mut covered = 0;
        for (site, range) in &self.yarns_map {
            if range.is_empty() || range.end > self.yarns.len() {
                return Err(ValidationError::CacheMismatch);
            }
            for (expected, atom) in self.yarns[range.clone()].iter().enumerate() {
                if atom.id.site != *site {
                    return Err(ValidationError::CacheMismatch);
                }
                if atom.id.index != expected as i32 {
                    return Err(ValidationError::YarnGap(*site));
                }
                match self.positions.get(&atom.id) {
                    Some(&position) if self.atoms[position].id == atom.id => {}
                    _ => return Err(ValidationError::CacheMismatch),
                }
            }
            let last = self.yarns[range.end - 1].id.index;
            if self.weft.get(*site) != Some(last) {
                return Err(ValidationError::CacheMismatch);
            }
            covered += range.len();
        }
        if covered != self.yarns.len() {
            return Err(ValidationError::CacheMismatch);
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::atom::Atom;
    use crate::crdt::primitives::LamportClock;

    #[derive(Clone, Debug, Default, PartialEq)]
    enum Op {
        #[default]
        Root,
        Insert(char),
        Delete,
    }

    impl AtomValue for Op {
        fn is_childless(&self) -> bool {
            return *self == Op::Delete;
        }

        fn is_priority(&self) -> bool {
            return *self == Op::Delete;
        }
    }

    fn atom(site: u16, index: i32, cause: AtomId, timestamp: u64, value: Op) -> Atom<Op> {
        return Atom::new(AtomId::new(site, index), cause, timestamp, value);
    }

    fn rebuild(atoms: Vec<Atom<Op>>) -> Result<Weave<Op>, ValidationError> {
        return Weave::from_parts(1, atoms, LamportClock::with_time(100));
    }

    #[test]
    fn accepts_well_formed_weave() {
        let a = AtomId::new(1, 0);
        let atoms = vec![
            Atom::root(),
            atom(1, 1, AtomId::ROOT, 3, Op::Insert('y')),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
            atom(1, 2, a, 4, Op::Delete),
        ];
        assert!(rebuild(atoms).is_ok());
    }

    #[test]
    fn rejects_missing_root() {
        let atoms = vec![atom(1, 0, AtomId::ROOT, 1, Op::Insert('x'))];
        assert_eq!(rebuild(atoms).err(), Some(ValidationError::MissingRoot));
    }

    #[test]
    fn rejects_duplicates() {
        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
        ];
        assert_eq!(rebuild(atoms).err(), Some(ValidationError::DuplicateAtom(AtomId::new(1, 0))));
    }

    #[test]
    fn rejects_yarn_gaps() {
        let atoms = vec![Atom::root(), atom(1, 1, AtomId::ROOT, 1, Op::Insert('x'))];
        assert_eq!(rebuild(atoms).err(), Some(ValidationError::YarnGap(1)));
    }

    #[test]
    fn rejects_unparented_atoms() {
        let atoms = vec![Atom::root(), atom(1, 0, AtomId::new(2, 0), 1, Op::Insert('x'))];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::TreeAtomIsUnparented(AtomId::new(1, 0)))
        );
    }

    #[test]
    fn rejects_child_before_parent() {
        let atoms = vec![
            Atom::root(),
            atom(1, 1, AtomId::new(1, 0), 2, Op::Insert('y')),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::CausalityViolation(AtomId::new(1, 1)))
        );
    }

    #[test]
    fn rejects_atom_outside_parent_block() {
        // x's child appears after y's block has started
        let x = AtomId::new(1, 0);
        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
            atom(1, 1, AtomId::ROOT, 0, Op::Insert('y')),
            atom(1, 2, x, 3, Op::Insert('z')),
        ];
        assert!(matches!(
            rebuild(atoms).err(),
            Some(ValidationError::AtomUnawareOfParent(_)) | Some(ValidationError::CausalityViolation(_))
        ));

        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 2, Op::Insert('x')),
            atom(1, 1, AtomId::ROOT, 1, Op::Insert('y')),
            atom(1, 2, x, 3, Op::Insert('z')),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::CausalityViolation(AtomId::new(1, 2)))
        );
    }

    #[test]
    fn rejects_stale_timestamps() {
        let x = AtomId::new(1, 0);
        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 5, Op::Insert('x')),
            atom(1, 1, x, 5, Op::Insert('y')),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::AtomUnawareOfParent(AtomId::new(1, 1)))
        );
    }

    #[test]
    fn rejects_stale_reference() {
        let atoms = vec![
            Atom::root(),
            atom(1, 1, AtomId::ROOT, 2, Op::Insert('y')),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')).with_reference(AtomId::new(1, 1)),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::AtomUnawareOfReference(AtomId::new(1, 0)))
        );
    }

    #[test]
    fn rejects_children_of_childless_atoms() {
        let del = AtomId::new(1, 0);
        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 1, Op::Delete),
            atom(1, 1, del, 2, Op::Insert('x')),
        ];
        assert_eq!(rebuild(atoms).err(), Some(ValidationError::ChildlessAtomHasChildren(del)));
    }

    #[test]
    fn rejects_misordered_siblings() {
        let atoms = vec![
            Atom::root(),
            atom(1, 0, AtomId::ROOT, 1, Op::Insert('x')),
            atom(1, 1, AtomId::ROOT, 2, Op::Insert('y')),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::IncorrectTreeAtomOrder(AtomId::new(1, 1)))
        );

        // Priority siblings must lead
        let atoms = vec![
            Atom::root(),
            atom(1, 1, AtomId::ROOT, 2, Op::Insert('y')),
            atom(1, 0, AtomId::ROOT, 1, Op::Delete),
        ];
        assert_eq!(
            rebuild(atoms).err(),
            Some(ValidationError::IncorrectTreeAtomOrder(AtomId::new(1, 0)))
        );
    }

    #[test]
    fn rejects_clock_behind() {
        let atoms = vec![Atom::root(), atom(1, 0, AtomId::ROOT, 7, Op::Insert('x'))];
        let result = Weave::from_parts(1, atoms, LamportClock::with_time(7));
        assert_eq!(result.err(), Some(ValidationError::ClockBehind(AtomId::new(1, 0))));
    }

    #[test]
    fn rejects_corrupted_caches() {
        let mut weave: Weave<Op> = Weave::new(1);
        weave.add_atom(Op::Insert('x'), AtomId::ROOT).unwrap();
        weave.yarns.pop();
        assert_eq!(weave.validate(), Err(ValidationError::CacheMismatch));
    }
}
