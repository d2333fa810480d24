//! Stub & Array: uniform-sized managed memory cells (spec.md §3.2).
//!
//! Grounded on two teacher precedents: `tagged_stack.rs`'s raw
//! `alloc`/`realloc`'d array of fixed-size slots (the allocation strategy),
//! and `memory_stats.rs`'s per-slot flags (the bookkeeping strategy). A
//! `Stub` here is index-addressed rather than pointer-addressed — spec.md
//! §9 leaves the exact addressing mode open ("pointer into the Stub pool")
//! and an index is the safe-Rust rendition of the same idea: a
//! [`StubId`] is the "pointer" the spec talks about, the pool owns the
//! backing storage, and the GC's mark phase (out of scope here, per
//! spec.md §6) would walk `StubId`s instead of raw pointers.
//!
//! The teacher's `SeqString` splits string storage into an arena-fast-path
//! and a global-heap path; `StubBody::InlineString`/`HeapString` reuses
//! that split, but an inline fixed-size buffer instead of a bump arena,
//! because stubs need individual free/promote lifecycle (root/managed/
//! marked per spec.md §4.1) that a bulk-reset bump arena cannot give one
//! item at a time.

use crate::symbol::Symbol;
use std::fmt;

/// Handle to a [`Stub`] inside a [`StubPool`]. Spec.md's "pointer into the
/// Stub pool"; zero is reserved as the null handle so `Slot(0)` (the inert
/// default) never aliases a live stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StubId(u32);

impl StubId {
    pub const NULL: StubId = StubId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub(crate) fn to_raw(self) -> u64 {
        self.0 as u64
    }

    pub(crate) fn from_raw(raw: u64) -> Self {
        StubId(raw as u32)
    }

    fn index(self) -> usize {
        debug_assert!(!self.is_null());
        (self.0 - 1) as usize
    }

    fn from_index(idx: usize) -> Self {
        StubId(idx as u32 + 1)
    }
}

/// Per-stub persistence/lifecycle flags (spec.md §4.1, §4.5 FAILED bit).
///
/// A small hand-rolled bitset rather than an external crate: the teacher
/// pack does not reach for `bitflags` anywhere, preferring raw integer
/// masks with named `const`s (see `header_bits` in `cell.rs`), so this
/// follows the same idiom at stub granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StubFlags(u8);

impl StubFlags {
    /// Reachable from an API root handle (spec.md §6).
    pub const ROOT: StubFlags = StubFlags(0x01);
    /// Owned by the GC's managed set (vs. a "manual" stub awaiting
    /// promotion or explicit free, spec.md §5).
    pub const MANAGED: StubFlags = StubFlags(0x02);
    /// Set during GC mark phase.
    pub const MARKED: StubFlags = StubFlags(0x04);
    /// Set by consumers during a rescue unwind on a running action's
    /// varlist, so live API references observe the failure
    /// (spec.md §4.5 step 4).
    pub const FAILED: StubFlags = StubFlags(0x08);

    pub const fn empty() -> Self {
        StubFlags(0)
    }

    pub fn contains(self, other: StubFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StubFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: StubFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for StubFlags {
    type Output = StubFlags;
    fn bitor(self, rhs: StubFlags) -> StubFlags {
        StubFlags(self.0 | rhs.0)
    }
}

/// What kind of array this stub is (spec.md §3.2: "optional source
/// metadata" distinguishes scanned source arrays from synthesized ones).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayFlavor {
    Plain,
    Varlist,
    Keylist,
}

/// File/line provenance for a scanned array (spec.md §3.2, consumed by
/// error construction's FILE/LINE fields, §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub file: Symbol,
    pub line: u32,
}

/// An array stub: length, flavor, optional source metadata, and the
/// element storage. Element storage is an opaque `Vec<u64>` of packed
/// cells at this layer (quill-core does not depend on quill-runtime's
/// `Varlist`/`Cell` consumer logic) — quill-runtime reinterprets these
/// slots through [`crate::cell::Cell`].
#[derive(Debug, Clone)]
pub struct ArrayStub {
    pub flavor: ArrayFlavor,
    pub source: Option<SourceInfo>,
    pub(crate) cells: Vec<crate::cell::Cell>,
}

impl ArrayStub {
    pub fn new(flavor: ArrayFlavor) -> Self {
        ArrayStub {
            flavor,
            source: None,
            cells: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[crate::cell::Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut Vec<crate::cell::Cell> {
        &mut self.cells
    }
}

/// The content a stub carries (spec.md §3.2: "inline content... a pointer
/// to heap-allocated content, or one or two cells directly").
pub enum StubBody {
    /// Short string stored inline in the stub (teacher: `SeqString`'s
    /// arena fast path, adapted to per-stub inline storage).
    InlineString { len: u8, bytes: [u8; INLINE_STRING_CAP] },
    /// Longer string, heap-allocated (teacher: `SeqString`'s global path).
    HeapString(String),
    /// An array (block/varlist/keylist).
    Array(ArrayStub),
    /// A "pairing" stub: two cells directly, no separate array allocation
    /// (spec.md §3.2).
    Cells(Box<[crate::cell::Cell; 2]>),
}

/// Inline string capacity before a stub falls back to heap storage.
pub const INLINE_STRING_CAP: usize = 23;

impl fmt::Debug for StubBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubBody::InlineString { len, .. } => write!(f, "InlineString(len={len})"),
            StubBody::HeapString(s) => write!(f, "HeapString({s:?})"),
            StubBody::Array(a) => write!(f, "Array(len={}, flavor={:?})", a.len(), a.flavor),
            StubBody::Cells(_) => write!(f, "Cells"),
        }
    }
}

impl StubBody {
    pub fn inline_string(s: &str) -> Option<Self> {
        if s.len() > INLINE_STRING_CAP {
            return None;
        }
        let mut bytes = [0u8; INLINE_STRING_CAP];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Some(StubBody::InlineString {
            len: s.len() as u8,
            bytes,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StubBody::InlineString { len, bytes } => {
                std::str::from_utf8(&bytes[..*len as usize]).ok()
            }
            StubBody::HeapString(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayStub> {
        match self {
            StubBody::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayStub> {
        match self {
            StubBody::Array(a) => Some(a),
            _ => None,
        }
    }
}

/// A single managed memory cell (spec.md §3.2).
pub struct Stub {
    pub flags: StubFlags,
    pub body: StubBody,
}

/// Uniform-sized managed memory pool (spec.md §3.2, §5 "two processes in
/// the same address space must not share any Stub or cell" — enforced here
/// simply by each [`StubPool`] being an owned, non-shared value; nothing
/// hands out raw pointers into it).
///
/// The teacher's `arena.rs` backs short-lived string content with a
/// bump allocator reset in bulk at strand exit. A `Stub`'s content here is
/// freed and reused one slot at a time (see `free`/`free_list` below),
/// which is the opposite access pattern a bump arena is good at — bulk
/// reset has nothing to reset to when any one of a thousand live stubs
/// might be the next one freed. `StubBody::InlineString`/`HeapString`
/// therefore use a fixed inline buffer and `String` respectively rather
/// than arena content; see DESIGN.md for this dependency drop.
pub struct StubPool {
    slots: Vec<Option<Stub>>,
    free_list: Vec<u32>,
    stats: crate::stats::PoolStats,
}

impl StubPool {
    pub fn with_capacity(capacity: usize) -> Self {
        StubPool {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            stats: crate::stats::PoolStats::default(),
        }
    }

    pub fn stats(&self) -> crate::stats::PoolStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Allocate a new stub, reusing a freed slot if one exists.
    pub fn alloc(&mut self, body: StubBody) -> StubId {
        let stub = Stub {
            flags: StubFlags::empty(),
            body,
        };
        self.stats.record_alloc();
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(stub);
            tracing::debug!(slot = idx, "stub pool reused freed slot");
            StubId::from_index(idx as usize)
        } else {
            self.slots.push(Some(stub));
            let idx = self.slots.len() - 1;
            if self.slots.len().is_power_of_two() {
                tracing::debug!(len = self.slots.len(), "stub pool grew");
            }
            StubId::from_index(idx)
        }
    }

    pub fn get(&self, id: StubId) -> Option<&Stub> {
        self.slots.get(id.index())?.as_ref()
    }

    pub fn get_mut(&mut self, id: StubId) -> Option<&mut Stub> {
        self.slots.get_mut(id.index())?.as_mut()
    }

    /// Free a stub unconditionally. Callers are responsible for the
    /// manuals-stack discipline of spec.md §5 — this is the mechanical
    /// primitive, not the policy.
    pub fn free(&mut self, id: StubId) {
        let idx = id.index();
        if self.slots.get(idx).and_then(|s| s.as_ref()).is_some() {
            self.slots[idx] = None;
            self.free_list.push(idx as u32);
            self.stats.record_free();
        }
    }

    pub fn flags(&self, id: StubId) -> StubFlags {
        self.get(id).map(|s| s.flags).unwrap_or(StubFlags::empty())
    }

    pub fn set_flags(&mut self, id: StubId, flags: StubFlags) {
        if let Some(stub) = self.get_mut(id) {
            stub.flags = flags;
        }
    }

    /// Mark every stub above `mark` (by allocation index) as FAILED,
    /// leaving it in the pool for any still-live API reference to observe
    /// (spec.md §4.5 step 4 "Unwind"). Used by `quill-runtime`'s rescue
    /// scope.
    pub fn mark_failed_above(&mut self, mark: usize) {
        for slot in self.slots.iter_mut().skip(mark).flatten() {
            slot.flags.insert(StubFlags::FAILED);
        }
    }
}

impl Default for StubPool {
    fn default() -> Self {
        Self::with_capacity(crate::config::EngineConfig::default().initial_stub_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_free_reuses_slot() {
        let mut pool = StubPool::with_capacity(4);
        let a = pool.alloc(StubBody::inline_string("hi").unwrap());
        assert_eq!(pool.len(), 1);
        pool.free(a);
        assert_eq!(pool.len(), 0);
        let b = pool.alloc(StubBody::inline_string("bye").unwrap());
        assert_eq!(a, b, "freed slot should be reused");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn inline_string_round_trips() {
        let mut pool = StubPool::with_capacity(4);
        let id = pool.alloc(StubBody::inline_string("hello").unwrap());
        assert_eq!(pool.get(id).unwrap().body.as_str(), Some("hello"));
    }

    #[test]
    fn inline_string_rejects_too_long() {
        let long = "x".repeat(INLINE_STRING_CAP + 1);
        assert!(StubBody::inline_string(&long).is_none());
    }

    #[test]
    fn heap_string_round_trips() {
        let mut pool = StubPool::with_capacity(4);
        let long = "y".repeat(100);
        let id = pool.alloc(StubBody::HeapString(long.clone()));
        assert_eq!(pool.get(id).unwrap().body.as_str(), Some(long.as_str()));
    }

    #[test]
    fn null_stub_id_is_distinct_from_any_allocation() {
        let mut pool = StubPool::with_capacity(4);
        let a = pool.alloc(StubBody::inline_string("a").unwrap());
        assert_ne!(a, StubId::NULL);
        assert!(StubId::NULL.is_null());
    }

    #[test]
    fn mark_failed_above_only_marks_newer_stubs() {
        let mut pool = StubPool::with_capacity(4);
        let _older = pool.alloc(StubBody::inline_string("old").unwrap());
        let mark = pool.len();
        let newer = pool.alloc(StubBody::inline_string("new").unwrap());
        pool.mark_failed_above(mark);
        assert!(pool.flags(newer).contains(StubFlags::FAILED));
    }
}
