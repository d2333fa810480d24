//! The four LIFO resource stacks of spec.md §5: mold buffer, manuals,
//! guarded-object stack, data stack. Each is snapshot/truncate-able, the
//! primitive [`crate::rescue::RescueScope`] builds on.
//!
//! Grounded on the teacher's `tagged_stack.rs` (a raw growable array of
//! fixed-size entries with push/pop/mark-style indices) generalized to
//! an arbitrary element type, since all four stacks here differ only in
//! what they hold, not in their LIFO/snapshot discipline.

use quill_core::StubId;

/// A LIFO, mark/truncate-able stack (spec.md §5: "all four are LIFO and
/// snapshot-truncatable").
#[derive(Debug, Clone, Default)]
pub struct ResourceStack<T> {
    items: Vec<T>,
}

impl<T> ResourceStack<T> {
    pub fn new() -> Self {
        ResourceStack { items: Vec::new() }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Capture the current depth (spec.md §4.5 step 1 "Snapshot").
    pub fn mark(&self) -> usize {
        self.items.len()
    }

    /// Truncate back to a prior mark (spec.md §4.5 step 4 "Unwind").
    /// Panics if `mark` is deeper than the current stack — that would
    /// indicate a corrupted snapshot, not caller misuse of this API.
    pub fn truncate_to(&mut self, mark: usize) {
        assert!(mark <= self.items.len(), "truncate_to target is below current depth");
        self.items.truncate(mark);
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

/// Data stack: cells pushed by evaluator primitives (spec.md §5).
pub type DataStack = ResourceStack<quill_core::Cell>;

/// Guarded-object stack: GC roots added by C code, here by the embedding
/// boundary (spec.md §5, §6).
pub type GuardedStack = ResourceStack<StubId>;

/// Manuals stack: unmanaged stubs awaiting promotion or explicit free
/// (Glossary: "Manuals").
pub type ManualsStack = ResourceStack<StubId>;

/// Mold (string-building) buffer: process-global in the source, modeled
/// here as one growable `String` with the same mark/truncate discipline
/// (spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct MoldBuffer {
    buf: String,
}

impl MoldBuffer {
    pub fn new() -> Self {
        MoldBuffer { buf: String::new() }
    }

    pub fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn mark(&self) -> usize {
        self.buf.len()
    }

    pub fn truncate_to(&mut self, mark: usize) {
        assert!(mark <= self.buf.len(), "truncate_to target is below current length");
        self.buf.truncate(mark);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_and_truncate_restores_depth() {
        let mut stack: DataStack = ResourceStack::new();
        stack.push(quill_core::Cell::ERASED);
        let mark = stack.mark();
        stack.push(quill_core::Cell::ERASED);
        stack.push(quill_core::Cell::ERASED);
        stack.truncate_to(mark);
        assert_eq!(stack.len(), mark);
    }

    #[test]
    fn mold_buffer_truncates_to_mark() {
        let mut mold = MoldBuffer::new();
        mold.push_str("abc");
        let mark = mold.mark();
        mold.push_str("def");
        mold.truncate_to(mark);
        assert_eq!(mold.as_str(), "abc");
    }

    #[test]
    #[should_panic]
    fn truncate_to_rejects_a_mark_above_current_depth() {
        let mut stack: DataStack = ResourceStack::new();
        stack.truncate_to(1);
    }
}
