//! API handle: a root-flagged cell held outside the evaluator (spec.md §6).
//!
//! Grounded on the teacher's `memory_stats.rs` guard pattern of "a value
//! that marks something live on construction and unmarks it on drop" —
//! here the mark is [`crate::stub::StubFlags::ROOT`] rather than a thread
//! counter. An `ApiHandle` stays reachable across any rescue unwind
//! (spec.md §4.5 step 4: live API references must still observe a
//! FAILED stub rather than dangle), and `release` is the caller's way to
//! hand the slot back; there is no implicit `Drop`-based release because
//! the handle does not own the pool it roots into.

use crate::cell::Cell;
use crate::stub::{StubFlags, StubId, StubPool};

/// An externally held, root-flagged reference into a [`StubPool`].
///
/// Holding an `ApiHandle` keeps its stub out of the GC's collectible set
/// (spec.md §6: "API handles root their referent"). Released explicitly,
/// or implicitly when `quill-runtime`'s polymorphic failure entry point
/// takes ownership of an error handle and converts it to a propagating
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiHandle(StubId);

impl ApiHandle {
    /// Root `id` in `pool`. Idempotent: rooting an already-rooted stub
    /// just sets the bit again.
    pub fn root(pool: &mut StubPool, id: StubId) -> Self {
        let mut flags = pool.flags(id);
        flags.insert(StubFlags::ROOT);
        pool.set_flags(id, flags);
        ApiHandle(id)
    }

    pub fn stub_id(self) -> StubId {
        self.0
    }

    /// Clear the ROOT flag, making the stub collectible again once
    /// nothing else references it. Does not free the stub directly —
    /// that remains the GC's or the manuals-stack's job (spec.md §5).
    pub fn release(self, pool: &mut StubPool) {
        let mut flags = pool.flags(self.0);
        flags.remove(StubFlags::ROOT);
        pool.set_flags(self.0, flags);
    }

    pub fn is_rooted(self, pool: &StubPool) -> bool {
        pool.flags(self.0).contains(StubFlags::ROOT)
    }

    /// Read the handle's current cell content, when its stub carries one
    /// or two cells directly (spec.md §3.2 "pairing" stubs) rather than
    /// an array. Returns `None` for array-bodied stubs, whose cells are
    /// read through `ArrayStub` instead.
    pub fn cell(self, pool: &StubPool, slot: usize) -> Option<Cell> {
        let stub = pool.get(self.0)?;
        match &stub.body {
            crate::stub::StubBody::Cells(cells) => cells.get(slot).copied(),
            _ => None,
        }
    }
}
