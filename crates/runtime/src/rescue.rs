//! Failure Scope (Abrupt Failure): snapshot/register/body/unwind/deliver
//! (spec.md §4.5).
//!
//! Open Question resolution (DESIGN.md): the source implements this via
//! `setjmp`/`longjmp` (spec.md §9). This crate takes design note §9's
//! option (a) — a `Result`-type return propagated through every
//! fallible function, with [`RescueScope::run`] as the thin
//! snapshot+unwind combinator — because the teacher's own nonlocal-exit
//! precedent (`may`'s coroutine yield/resume in `scheduler.rs`) is
//! already return-based, not stack-unwinding.

use crate::error_record::ErrorRecord;
use crate::level::LevelStack;
use crate::resources::{DataStack, GuardedStack, ManualsStack, MoldBuffer};
use crate::throw::{Abort, Thrown};
use quill_core::StubPool;

/// A delivered abrupt failure: the error record the rescue point
/// receives (spec.md §4.5 step 5 "Deliver").
#[derive(Debug, Clone)]
pub struct Failure {
    pub error: ErrorRecord,
}

impl Failure {
    pub fn new(error: ErrorRecord) -> Self {
        Failure { error }
    }
}

/// Captured depths of every LIFO resource at scope entry (spec.md §4.5
/// step 1 "Snapshot").
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    data_mark: usize,
    guarded_mark: usize,
    manuals_mark: usize,
    mold_mark: usize,
    level_mark: usize,
    stub_mark: usize,
}

/// The four LIFO resource stacks plus the level (call) stack and the
/// stub pool, bundled so [`RescueScope::run`] can snapshot and unwind
/// all of them together. `Engine` (in `crate::engine`) owns one of
/// these; tests construct their own for isolation.
pub struct Resources {
    pub stubs: StubPool,
    pub data: DataStack,
    pub guarded: GuardedStack,
    pub manuals: ManualsStack,
    pub mold: MoldBuffer,
    pub levels: LevelStack,
}

impl Resources {
    pub fn new() -> Self {
        Self::with_stub_capacity(quill_core::EngineConfig::default().initial_stub_capacity)
    }

    /// Build resources with a stub pool sized up front (SPEC_FULL.md
    /// §2.3: `EngineConfig::initial_stub_capacity`), for embedders that
    /// know their workload size ahead of time.
    pub fn with_stub_capacity(capacity: usize) -> Self {
        Resources {
            stubs: StubPool::with_capacity(capacity),
            data: DataStack::new(),
            guarded: GuardedStack::new(),
            manuals: ManualsStack::new(),
            mold: MoldBuffer::new(),
            levels: LevelStack::new(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            data_mark: self.data.mark(),
            guarded_mark: self.guarded.mark(),
            manuals_mark: self.manuals.mark(),
            mold_mark: self.mold.mark(),
            level_mark: self.levels.mark(),
            stub_mark: self.stubs.len(),
        }
    }

    /// Spec.md §4.5 step 4 "Unwind": truncate every resource to its
    /// snapshotted depth, marking abandoned running-action varlists
    /// FAILED as it goes.
    fn unwind_to(&mut self, snap: Snapshot) {
        self.levels.truncate_to(snap.level_mark, &mut self.stubs);
        self.data.truncate_to(snap.data_mark);
        self.guarded.truncate_to(snap.guarded_mark);
        self.manuals.truncate_to(snap.manuals_mark);
        self.mold.truncate_to(snap.mold_mark);
        self.stubs.mark_failed_above(snap.stub_mark);
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot-registered nonlocal-exit region (spec.md §4.5). One
/// `RescueScope` is "current" at a time per spec.md §5; nesting is
/// modeled by Rust's own call stack — an inner `RescueScope::run` call
/// happening inside an outer one's `body` closure nests strictly,
/// matching spec.md §5's "nested rescue scopes nest strictly."
pub struct RescueScope;

/// What `RescueScope::run`'s body may hand back besides success: an
/// abrupt failure (caught and delivered by this scope) or a throw,
/// which this scope does *not* catch — it propagates to the next
/// scope out, exactly as spec.md §5's HALT/throw semantics require
/// (scenario S6). Either way this scope's own resources are unwound
/// to its entry snapshot before delivery.
pub enum Delivered<T> {
    Ok(T),
    Failed(Failure),
    Threw(Thrown),
}

impl RescueScope {
    /// Snapshot, register (implicitly — there is one dynamic scope per
    /// call to `run`, nested via the Rust call stack), run `body`,
    /// unwind on failure or throw, and deliver. A throw is still not
    /// *caught* here — it propagates to the next scope out as
    /// `Delivered::Threw`, exactly as spec.md §5's HALT semantics
    /// require (scenario S6) — but this scope's own resources are
    /// truncated back to its own entry snapshot first, same as on
    /// `Fail`, so that the level a throw is passing through never
    /// leaks that level's pushes into the scope it unwinds to.
    pub fn run<T>(resources: &mut Resources, body: impl FnOnce(&mut Resources) -> Result<T, Abort>) -> Delivered<T> {
        let snapshot = resources.snapshot();
        match body(resources) {
            Ok(value) => Delivered::Ok(value),
            Err(Abort::Fail(failure)) => {
                tracing::debug!("rescue scope caught a fail, unwinding to snapshot");
                resources.unwind_to(snapshot);
                debug_assert_balanced(resources, snapshot);
                Delivered::Failed(failure)
            }
            Err(Abort::Throw(thrown)) => {
                tracing::debug!(halt = thrown.is_halt(), "rescue scope unwinding to snapshot, not catching");
                resources.unwind_to(snapshot);
                debug_assert_balanced(resources, snapshot);
                Delivered::Threw(thrown)
            }
        }
    }
}

/// Debug balance checks (spec.md §4.5 "Debug balance checks"): after
/// unwinding, every resource must be back at its snapshotted depth.
#[cfg(debug_assertions)]
fn debug_assert_balanced(resources: &Resources, snap: Snapshot) {
    assert_eq!(resources.data.mark(), snap.data_mark, "unbalanced data stack after rescue unwind");
    assert_eq!(resources.guarded.mark(), snap.guarded_mark, "unbalanced guarded-object stack after rescue unwind");
    assert_eq!(resources.manuals.mark(), snap.manuals_mark, "leaked manual stubs after rescue unwind");
    assert_eq!(resources.mold.mark(), snap.mold_mark, "unbalanced mold buffer after rescue unwind");
    assert_eq!(resources.levels.mark(), snap.level_mark, "unbalanced level stack after rescue unwind");
}

#[cfg(not(debug_assertions))]
fn debug_assert_balanced(_resources: &Resources, _snap: Snapshot) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_record::ErrorRecord;
    use crate::throw::ThrowLabel;
    use quill_core::{Heart, Lift, Sigil, Slot, SymbolTable};

    fn int_cell(n: i64) -> quill_core::Cell {
        quill_core::Cell::new(Heart::Integer, Sigil::None, Lift::Plain, Slot(0), [Slot::from_i64(n), Slot(0)])
    }

    /// Scenario S2 (spec.md §8): push 3 cells, raise a user error via
    /// text; rescue exits with stack depth restored and delivers "boom".
    #[test]
    fn scenario_s2_rescue_restores_stack_depth_and_delivers_message() {
        let mut resources = Resources::new();
        let pre_depth = resources.data.mark();
        let mut symbols = SymbolTable::new();

        let outcome = RescueScope::run(&mut resources, |r| {
            r.data.push(int_cell(1));
            r.data.push(int_cell(2));
            r.data.push(int_cell(3));
            let error = ErrorRecord::from_text(&mut symbols, "boom");
            Err(Abort::Fail(Failure::new(error)))
        });

        assert_eq!(resources.data.mark(), pre_depth, "spec.md §8 invariant 5");
        match outcome {
            Delivered::Failed(failure) => {
                assert_eq!(failure.error.format_message(&symbols), "boom");
            }
            _ => panic!("expected a delivered failure"),
        }
    }

    /// Scenario S6 (spec.md §8): HALT inside nested scopes A ⊃ B is not
    /// swallowed by B; A receives it, and A's snapshot is preserved
    /// until A's own handler runs.
    #[test]
    fn scenario_s6_halt_propagates_through_an_inner_scope() {
        let mut resources = Resources::new();

        let outcome = RescueScope::run(&mut resources, |outer| {
            outer.data.push(int_cell(1));
            let a_mark = outer.data.mark();

            let inner_outcome: Delivered<()> = RescueScope::run(&mut *outer, |inner| {
                inner.data.push(int_cell(2));
                let halt_cell = quill_core::Cell::new(Heart::Space, Sigil::None, Lift::Antiform, Slot(0), [Slot(0); 2]);
                Err(Abort::Throw(Thrown::new(ThrowLabel::Halt, halt_cell)))
            });

            match inner_outcome {
                Delivered::Threw(thrown) if thrown.is_halt() => {
                    assert_eq!(outer.data.mark(), a_mark, "B's own unwind must not touch A's pushes");
                    Err(Abort::Throw(thrown))
                }
                _ => panic!("expected B to observe and repropagate HALT"),
            }
        });

        match outcome {
            Delivered::Threw(thrown) => assert!(thrown.is_halt()),
            _ => panic!("expected A to receive the HALT"),
        }
    }

    #[test]
    fn successful_body_does_not_unwind() {
        let mut resources = Resources::new();
        resources.data.push(int_cell(9));
        let outcome = RescueScope::run(&mut resources, |r| {
            r.data.push(int_cell(10));
            Ok::<_, Abort>(())
        });
        assert!(matches!(outcome, Delivered::Ok(())));
        assert_eq!(resources.data.len(), 2);
    }
}
