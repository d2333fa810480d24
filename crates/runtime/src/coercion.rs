//! Argument Coercion (spec.md §4.7): the bounded decay/unlift passes a
//! parameter may apply to an argument atom before typechecking it.
//!
//! Grounded on the same `Result`-propagation choice `crate::rescue` makes
//! (DESIGN.md): coercion returns `Result<Stable, Failure>` rather than
//! mutating in place, so a rejected coercion flows straight into a
//! `RescueScope` as an `Abort::Fail` without a separate translation step.

use crate::error_record::ErrorRecord;
use crate::rescue::Failure;
use crate::typespec::{typecheck, Spec};
use crate::varlist::Varlist;
use quill_core::{Atom, Cell, Datatype, Lift, Sigil, Slot, Stable, StubPool, SymbolTable};

/// Explicit refinement flags a parameter may carry (spec.md §4.7 step 4):
/// each short-circuits the corresponding common case without consulting
/// the parameter's spec at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refinements {
    pub any_stable_ok: bool,
    pub any_atom_ok: bool,
    pub null_definitely_ok: bool,
    pub void_definitely_ok: bool,
    pub trash_definitely_ok: bool,
    pub space_definitely_ok: bool,
}

/// One parameter's coercion policy: an optional type spec plus
/// refinement flags, and whether it meta-annotates (step 1) or accepts
/// actions via `:unrun` (step 3).
pub struct Param<'a> {
    pub spec: Option<Spec<'a>>,
    pub meta: bool,
    pub accepts_actions: bool,
    pub refinements: Refinements,
}

/// Unlift a quoted/quasiform cell by one level (spec.md §4.7 step 1):
/// quoted depth `n` becomes `n - 1` (or plain, at depth 0); quasiform
/// becomes plain.
fn unlift_once(cell: &Cell) -> Cell {
    let mut unlifted = *cell;
    match cell.lift() {
        Some(Lift::Quoted(0)) | Some(Lift::Quasiform) => set_lift(&mut unlifted, Lift::Plain),
        Some(Lift::Quoted(n)) => set_lift(&mut unlifted, Lift::Quoted(n - 1)),
        _ => {}
    }
    unlifted
}

/// Re-lift a cell back to `lift` (spec.md §4.7 step 1: "Re-lift before
/// returning regardless of outcome"). Rebuilds via `Cell::new` since
/// `Cell` exposes no direct lift-byte setter.
fn relift(cell: Cell, lift: Lift) -> Cell {
    Cell::new(cell.heart(), cell.sigil(), lift, cell.extra(), [cell.payload(0), cell.payload(1)])
}

fn set_lift(cell: &mut Cell, lift: Lift) {
    *cell = relift(*cell, lift);
}

/// Strip antiform lift from an action-antiform cell (spec.md §4.7 step
/// 3: "strip the antiform lift and retry once").
fn strip_action_antiform(cell: &Cell) -> Cell {
    relift(*cell, Lift::Plain)
}

fn type_mismatch(symbols: &mut SymbolTable, expected: &str) -> ErrorRecord {
    ErrorRecord::from_text(symbols, &format!("expected {expected}"))
}

/// Coerce `value` against `param`, applying spec.md §4.7's five steps in
/// order. `decayed` tracks whether a decay pass (step 2 or 3) has
/// already happened this call — a second attempt is an invariant
/// violation the spec forbids outright, asserted rather than handled,
/// since it indicates a caller bug rather than a reachable failure.
pub fn coerce(
    param: &Param,
    value: Atom,
    binding: &Varlist,
    symbols: &mut SymbolTable,
    intrinsics: &crate::intrinsic::IntrinsicTable,
    stubs: &StubPool,
) -> Result<Stable, Failure> {
    let mut decayed = false;

    // Step 4: explicit refinements short-circuit before any spec check.
    let datatype = value.cell().datatype();
    if param.refinements.any_atom_ok {
        return Ok(force_stable(value));
    }
    if param.refinements.null_definitely_ok && datatype == Datatype::Null {
        return Ok(force_stable(value));
    }
    if param.refinements.void_definitely_ok && datatype == Datatype::Void {
        return Ok(force_stable(value));
    }
    if param.refinements.trash_definitely_ok && datatype == Datatype::Trash {
        return Ok(force_stable(value));
    }
    if param.refinements.space_definitely_ok && datatype == Datatype::SpacePlain {
        return Ok(force_stable(value));
    }
    if param.refinements.any_stable_ok && !datatype.is_unstable() {
        return Ok(force_stable(value));
    }

    // Step 1: meta-annotated parameter unlifts quoted/quasiform once,
    // typechecks the underlying heart, then re-lifts regardless.
    if param.meta && matches!(value.cell().lift(), Some(Lift::Quasiform) | Some(Lift::Quoted(_))) {
        let original_lift = value.cell().lift().expect("matched above");
        let unlifted = unlift_once(value.cell());
        let matched = match &param.spec {
            Some(spec) => typecheck(spec, &Atom::from_cell(unlifted), binding, symbols, intrinsics, stubs)
                .map_err(|_| Failure::new(type_mismatch(symbols, "meta value")))?,
            None => true,
        };
        let relifted = relift(unlifted, original_lift);
        if matched {
            return Ok(force_stable(Atom::from_cell(relifted)));
        }
        return Err(Failure::new(type_mismatch(symbols, "meta-annotated parameter")));
    }

    // Step 3: `:unrun` parameters accept an action antiform by stripping
    // the antiform lift and retrying the spec once.
    if param.accepts_actions && datatype == Datatype::ActionAntiform {
        debug_assert!(!decayed, "spec.md §4.7: coercion may decay at most once");
        decayed = true;
        let stripped = strip_action_antiform(value.cell());
        let matched = match &param.spec {
            Some(spec) => typecheck(spec, &Atom::from_cell(stripped), binding, symbols, intrinsics, stubs)
                .map_err(|_| Failure::new(type_mismatch(symbols, "action")))?,
            None => true,
        };
        if matched {
            return Ok(force_stable(Atom::from_cell(stripped)));
        }
        return Err(Failure::new(type_mismatch(symbols, "unrun action")));
    }

    // Step 2: a stable-only parameter rejects an unstable antiform
    // unless a single decay would produce a matching value. There is no
    // general decay target in this core (pack decomposition belongs to
    // the out-of-scope evaluator), so the only decay this implements is
    // the step-3 action-antiform strip above; any other unstable input
    // reaching here is rejected outright.
    if datatype.is_unstable() {
        debug_assert!(!decayed, "spec.md §4.7: coercion may decay at most once");
        return Err(Failure::new(type_mismatch(symbols, "stable value")));
    }

    // Step 5: unconstrained parameter accepts any (stable) atom.
    let Some(spec) = &param.spec else {
        return Ok(force_stable(value));
    };

    let matched =
        typecheck(spec, &value, binding, symbols, intrinsics, stubs).map_err(|_| Failure::new(type_mismatch(symbols, "argument")))?;
    if matched {
        Ok(force_stable(value))
    } else {
        Err(Failure::new(type_mismatch(symbols, "argument")))
    }
}

/// Narrow to [`Stable`] once the unstable case has already been ruled
/// out by the caller (every call site above either rejected unstable
/// input or short-circuited via a refinement flag).
fn force_stable(value: Atom) -> Stable {
    Stable::try_from(value).expect("caller already excluded unstable antiforms")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::IntrinsicTable;
    use crate::varlist::Archetype;
    use quill_core::Heart;

    fn int_cell(n: i64) -> Cell {
        Cell::new(Heart::Integer, Sigil::None, Lift::Plain, Slot(0), [Slot::from_i64(n), Slot(0)])
    }

    #[test]
    fn unconstrained_parameter_accepts_any_atom() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let binding = Varlist::new(Archetype::Object, symbols.intern("ctx"));
        let param = Param { spec: None, meta: false, accepts_actions: false, refinements: Refinements::default() };

        let result = coerce(&param, Atom::from_cell(int_cell(7)), &binding, &mut symbols, &intrinsics, &stubs);

        assert!(result.is_ok());
    }

    #[test]
    fn any_atom_ok_refinement_short_circuits_the_spec() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let binding = Varlist::new(Archetype::Object, symbols.intern("ctx"));
        let param = Param {
            spec: Some(Spec::Datatype(Datatype::TextString)),
            meta: false,
            accepts_actions: false,
            refinements: Refinements { any_atom_ok: true, ..Default::default() },
        };

        let result = coerce(&param, Atom::from_cell(int_cell(1)), &binding, &mut symbols, &intrinsics, &stubs);

        assert!(result.is_ok(), "any-atom-ok bypasses the integer-vs-text mismatch");
    }

    #[test]
    fn unstable_antiform_is_rejected_without_a_matching_refinement() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let binding = Varlist::new(Archetype::Object, symbols.intern("ctx"));
        let param = Param { spec: None, meta: false, accepts_actions: false, refinements: Refinements::default() };
        let barrier = Cell::new(Heart::Comma, Sigil::None, Lift::Antiform, Slot(0), [Slot(0); 2]);

        let result = coerce(&param, Atom::from_cell(barrier), &binding, &mut symbols, &intrinsics, &stubs);

        assert!(result.is_err(), "spec.md §4.7 step 2: unstable input rejected without a decay target");
    }

    #[test]
    fn unrun_parameter_strips_action_antiform_and_matches() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let binding = Varlist::new(Archetype::Object, symbols.intern("ctx"));
        let param = Param {
            spec: Some(Spec::Datatype(Datatype::ActionPlain)),
            meta: false,
            accepts_actions: true,
            refinements: Refinements::default(),
        };
        let action_antiform = Cell::new(Heart::Action, Sigil::None, Lift::Antiform, Slot(0), [Slot(0); 2]);

        let result = coerce(&param, Atom::from_cell(action_antiform), &binding, &mut symbols, &intrinsics, &stubs);

        assert!(result.is_ok(), "spec.md §4.7 step 3");
        assert_eq!(result.unwrap().cell().lift(), Some(Lift::Plain));
    }
}
