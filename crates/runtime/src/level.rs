//! Level (Frame): the execution record for one call or evaluation step
//! (spec.md §3.6).
//!
//! `LevelId` is index-based into a [`LevelStack`], the same safe-Rust
//! rendition `quill_core::stub::StubId` uses for the "pointer into the
//! Stub pool" spec.md leaves unspecified — here a "prior level pointer."
//! The topmost level is always `LevelStack::top()`; `prior` is encoded
//! implicitly by stack position rather than an explicit linked pointer,
//! since within one engine there is exactly one call stack (spec.md §5:
//! "exactly one 'current' scope at any time").

use quill_core::{Cell, StubId};

/// What a level is doing right now (spec.md §4.4 WHERE construction:
/// "levels in the process of gathering arguments are distinguished").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Executor {
    /// Fulfilling an action's arguments; not yet dispatched.
    FulfillingArgs,
    /// Running the action's dispatcher body.
    Dispatching,
    /// Invoking an intrinsic predicate directly (spec.md §4.8): no
    /// varlist is built for this level.
    IntrinsicDispatch,
    /// A plain evaluation step with no action involved.
    Evaluating,
}

/// Execution record for one call or evaluation step (spec.md §3.6).
#[derive(Debug, Clone)]
pub struct Level {
    pub label: Option<quill_core::Symbol>,
    pub executor: Executor,
    pub output: Cell,
    pub spare: Cell,
    pub scratch: Cell,
    /// Non-null while this level owns a varlist (fulfilling or
    /// dispatching an action), per spec.md §3.6: "Levels own varlists
    /// only when an action is being fulfilled or dispatched."
    pub varlist_stub: Option<StubId>,
    /// Reserved by an in-flight intrinsic call (spec.md §4.8): while
    /// `true`, `spare`/`scratch` must be treated as unreadable by the
    /// caller.
    pub reserved: bool,
}

impl Level {
    pub fn new(executor: Executor) -> Self {
        Level {
            label: None,
            executor,
            output: Cell::ERASED,
            spare: Cell::ERASED,
            scratch: Cell::ERASED,
            varlist_stub: None,
            reserved: false,
        }
    }

    /// True while a running action owns this level (spec.md §4.5 step 4:
    /// "if it is a running action, drop it and mark its varlist FAILED").
    pub fn is_running_action(&self) -> bool {
        matches!(self.executor, Executor::Dispatching) && self.varlist_stub.is_some()
    }
}

/// The call stack: a LIFO sequence of [`Level`]s. The topmost entry is
/// "the current level"; `mark`/`truncate_to` give rescue's unwind
/// (spec.md §4.5 step 4) the same snapshot discipline as the four
/// resource stacks in `crate::resources`.
#[derive(Debug, Clone, Default)]
pub struct LevelStack {
    levels: Vec<Level>,
}

impl LevelStack {
    pub fn new() -> Self {
        LevelStack { levels: Vec::new() }
    }

    pub fn push(&mut self, level: Level) {
        self.levels.push(level);
    }

    pub fn top(&self) -> Option<&Level> {
        self.levels.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Level> {
        self.levels.last_mut()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn mark(&self) -> usize {
        self.levels.len()
    }

    /// Unwind every level above `mark` (spec.md §4.5 step 4): for each,
    /// if it owns a varlist and is a running action, mark that varlist
    /// FAILED in `stubs` before dropping it.
    pub fn truncate_to(&mut self, mark: usize, stubs: &mut quill_core::StubPool) {
        assert!(mark <= self.levels.len(), "truncate_to target is above current depth");
        while self.levels.len() > mark {
            let level = self.levels.pop().expect("len > mark implies non-empty");
            if level.is_running_action() {
                if let Some(stub) = level.varlist_stub {
                    let mut flags = stubs.flags(stub);
                    flags.insert(quill_core::StubFlags::FAILED);
                    stubs.set_flags(stub, flags);
                }
            }
        }
    }

    /// Build the WHERE backtrace (spec.md §4.4): one label per invoked
    /// (not fulfilling) action level, from topmost downward.
    pub fn where_block(&self) -> Vec<quill_core::Symbol> {
        self.levels
            .iter()
            .rev()
            .filter(|l| !matches!(l.executor, Executor::FulfillingArgs))
            .filter_map(|l| l.label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::StubPool;

    #[test]
    fn truncate_to_marks_running_actions_failed() {
        let mut stubs = StubPool::with_capacity(4);
        let stub = stubs.alloc(quill_core::StubBody::Array(quill_core::ArrayStub::new(quill_core::ArrayFlavor::Varlist)));
        let mut levels = LevelStack::new();
        let mark = levels.mark();
        let mut running = Level::new(Executor::Dispatching);
        running.varlist_stub = Some(stub);
        levels.push(running);
        levels.truncate_to(mark, &mut stubs);
        assert!(stubs.flags(stub).contains(quill_core::StubFlags::FAILED));
        assert_eq!(levels.len(), mark);
    }

    #[test]
    fn where_block_skips_fulfilling_levels() {
        let mut symbols_owner = quill_core::SymbolTable::new();
        let a = symbols_owner.intern("foo");
        let b = symbols_owner.intern("bar");
        let mut levels = LevelStack::new();
        let mut fulfilling = Level::new(Executor::FulfillingArgs);
        fulfilling.label = Some(a);
        levels.push(fulfilling);
        let mut dispatching = Level::new(Executor::Dispatching);
        dispatching.label = Some(b);
        levels.push(dispatching);
        assert_eq!(levels.where_block(), vec![b]);
    }
}
