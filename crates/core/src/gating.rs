//! Cell read/write/init gating (spec.md §4.1).
//!
//! Every access path checks readability; every mutation checks
//! writability; initialization is a distinct, weaker privilege that an
//! all-zero header also satisfies. This module is the only place that
//! flips `Cell`'s header bits directly — `cell.rs` exposes the bit
//! predicates, this module enforces the preconditions spec.md §4.1 lists
//! for each operation.

use crate::cell::{header_bits, Cell, COPY_MASK, PERSISTENCE_MASK};
use crate::heart::{Heart, Lift};
use std::fmt;

/// A gate violation: caller misuse, not a corrupted header. Surfaced to
/// `quill-runtime::rescue::fail`'s polymorphic "any other value" entry
/// point (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    /// `erase` was asked to erase a cell that is neither poisoned nor
    /// well-formed (spec.md §4.1: "tolerating only previously poisoned or
    /// previously well-formed cells").
    NotErasable,
    /// `copy`'s source is not readable.
    SourceNotReadable,
    /// `copy`'s destination is not initable.
    DestNotInitable,
    /// `blit`'s destination is neither poison nor erased.
    DestNotBlittable,
    /// An antiform or quasiform cell claimed a heart outside the
    /// restricted isotopic subset (spec.md §3.1).
    NonIsotopicHeart(Heart),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::NotErasable => f.write_str("cell is not in an erasable state"),
            GateError::SourceNotReadable => f.write_str("copy source is not readable"),
            GateError::DestNotInitable => f.write_str("copy destination is not initable"),
            GateError::DestNotBlittable => f.write_str("blit destination is not poison or erased"),
            GateError::NonIsotopicHeart(h) => {
                write!(f, "heart {h} is not in the restricted antiform/quasiform subset")
            }
        }
    }
}

impl std::error::Error for GateError {}

/// Validate the spec.md §3.1 restriction: "Antiform + heart must be from a
/// restricted subset" (and symmetrically for quasiform).
pub fn check_isotopic(heart: Heart, lift: Lift) -> Result<(), GateError> {
    let restricted = matches!(lift, Lift::Antiform | Lift::Quasiform);
    if restricted && !heart.is_isotopic() {
        Err(GateError::NonIsotopicHeart(heart))
    } else {
        Ok(())
    }
}

/// Set header to zero, tolerating only previously poisoned or previously
/// well-formed cells (spec.md §4.1).
pub fn erase(cell: &mut Cell) -> Result<(), GateError> {
    if !cell.is_erased() && !cell.is_readable() && !is_poisoned(cell) {
        return Err(GateError::NotErasable);
    }
    cell.set_header_bits(0);
    *cell = Cell::ERASED;
    Ok(())
}

/// Same as [`erase`], no preconditions — for raw memory (spec.md §4.1).
pub fn force_erase(cell: &mut Cell) {
    *cell = Cell::ERASED;
}

fn is_poisoned(cell: &Cell) -> bool {
    cell.header_bits() & header_bits::READABLE_MASK
        == header_bits::BASE | header_bits::CELL | header_bits::UNREADABLE
}

/// Mark unreadable and unwritable, preserving the persistence mask — used
/// for array guard slots (spec.md §4.1).
pub fn poison(cell: &mut Cell) {
    let persistence = cell.persistence_bits();
    *cell = Cell::ERASED;
    cell.set_header_bits(
        header_bits::BASE | header_bits::CELL | header_bits::UNREADABLE | persistence,
    );
}

/// Write-only sentinel preserving persistence bits (spec.md §4.1).
pub fn unreadable(cell: &mut Cell) {
    poison(cell);
}

/// Copy: source must be readable, destination must be initable. Header
/// bits are masked by [`COPY_MASK`] (spec.md §4.1, §8 invariant 4).
pub fn copy(dst: &mut Cell, src: &Cell) -> Result<(), GateError> {
    if !src.is_readable() {
        return Err(GateError::SourceNotReadable);
    }
    if !dst.is_initable() {
        return Err(GateError::DestNotInitable);
    }
    let dst_persistence = dst.persistence_bits();
    let mut copied = *src;
    copied.set_header_bits((src.header_bits() & COPY_MASK) | dst_persistence);
    *dst = copied;
    Ok(())
}

/// Copy then invalidate the source to the erased state (spec.md §4.1).
pub fn move_cell(dst: &mut Cell, src: &mut Cell) -> Result<(), GateError> {
    copy(dst, src)?;
    force_erase(src);
    Ok(())
}

/// Raw overwrite; destination must be poison or erased (spec.md §4.1).
pub fn blit(dst: &mut Cell, src: &Cell) -> Result<(), GateError> {
    if !dst.is_erased() && !is_poisoned(dst) {
        return Err(GateError::DestNotBlittable);
    }
    *dst = *src;
    Ok(())
}
