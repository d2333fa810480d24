//! Type Specification Evaluator (spec.md §3.7, §4.6).
//!
//! `typecheck` implements the form table of §4.6 verbatim. Dispatching a
//! non-intrinsic predicate action would require building a frame through
//! the full evaluator trampoline, which is out of scope here (spec.md
//! §1, §5: "C7 invokes C8 where possible, otherwise builds a frame
//! through the (external) evaluator") — that path returns
//! [`CoreError::NonIntrinsicDispatchUnsupported`] rather than being
//! silently stubbed out, so a caller can tell "not matched" apart from
//! "this core cannot evaluate that spec form."

use crate::error::CoreError;
use crate::intrinsic::IntrinsicTable;
use crate::varlist::Varlist;
use quill_core::{Atom, Datatype, ExtraHeartId, Heart, StubPool, Symbol, SymbolTable};

/// A tag-form spec: `<null>` / `<void>` match literal antiforms by name
/// (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSpec {
    Null,
    Void,
}

/// A single quasiform match target: a specific antiform identified by
/// heart, and (for Word antiforms) the keyword symbol it must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuasiformMatch {
    pub heart: Heart,
    pub symbol: Option<Symbol>,
}

/// One predicate callable without a frame: wraps the identity the
/// intrinsic table looks dispatch functions up by (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicId(pub Symbol);

/// A type specification (spec.md §3.7, §4.6): a borrowed view over one
/// of the forms the spec's table enumerates. The same `Spec` value may
/// be evaluated repeatedly without mutation (§3.7).
#[derive(Debug, Clone)]
pub enum Spec<'a> {
    /// A datatype cell: match if `v`'s projected type equals this
    /// datatype.
    Datatype(Datatype),
    /// `[A B C ...]`: match-any.
    Block(&'a [Spec<'a>]),
    /// `(A B C ...)`: match-all.
    Group(&'a [Spec<'a>]),
    /// A word: look up in `binding`, treat the result as a spec
    /// recursively.
    Word(Symbol),
    /// `<null>` / `<void>`.
    Tag(TagSpec),
    /// `~word~`: a specific non-pack antiform.
    Quasiform(QuasiformMatch),
    /// `~[T1 T2 ...]~`: match a pack antiform item-wise; lengths must
    /// be equal (spec.md §8 invariant 10).
    QuasiformPack(&'a [Spec<'a>]),
    /// `'X`: match stable plain values literally, by structural
    /// equality.
    Quoted(quill_core::Cell),
    /// A predicate action, looked up by [`IntrinsicId`] when it can
    /// dispatch as an intrinsic (spec.md §4.8); non-intrinsic predicate
    /// dispatch is out of scope (see module docs).
    Predicate(IntrinsicId),
}

/// Does `v`'s projected datatype opt into this predicate's defaults when
/// `v` is void (spec.md §4.6 "Edge cases": "most predicates opt out
/// unless the spec explicitly lists `<void>`")? Only `Tag(Void)` and a
/// `Datatype` matching the void projection itself opt in; every other
/// form rejects a void input without inspecting it further.
fn voids_out(spec: &Spec, datatype: Datatype) -> bool {
    datatype == Datatype::Void && !matches!(spec, Spec::Tag(TagSpec::Void) | Spec::Datatype(Datatype::Void))
}

/// Structural equality sufficient for `Spec::Quoted` (spec.md §4.6): the
/// full generic per-datatype comparator is out of scope (spec.md §6), so
/// this compares the fields every heart actually uses here: heart,
/// sigil, lift and the two payload slots verbatim.
fn cells_structurally_equal(a: &quill_core::Cell, b: &quill_core::Cell) -> bool {
    a.heart() == b.heart() && a.sigil() == b.sigil() && a.lift() == b.lift() && a.payload(0) == b.payload(0) && a.payload(1) == b.payload(1)
}

/// Evaluate `spec` against `value` in `binding` (spec.md §4.6). `stubs`
/// is the pool backing `value` and every nested item a pack spec reads
/// out of it (spec.md §3.2's array storage) — callers hold it already,
/// since it is part of the same [`crate::rescue::Resources`] bundle
/// `value`'s cells were built against.
pub fn typecheck(
    spec: &Spec,
    value: &Atom,
    binding: &Varlist,
    symbols: &SymbolTable,
    intrinsics: &IntrinsicTable,
    stubs: &StubPool,
) -> Result<bool, CoreError> {
    let datatype = value.cell().datatype();

    // Edge case: void input opts out of most predicates by default
    // (spec.md §4.6), except the forms that explicitly ask for it.
    if voids_out(spec, datatype) {
        return Ok(false);
    }

    match spec {
        Spec::Datatype(expected) => Ok(datatype_matches(*expected, datatype)),

        // Invariant 8: typecheck [T] against v == typecheck T against v
        // for any non-block T — a one-element block degenerates to its
        // element, and match-any of zero alternatives is false.
        Spec::Block(alts) => {
            for alt in *alts {
                if typecheck(alt, value, binding, symbols, intrinsics, stubs)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }

        // Invariant 9: match-all, first mismatch fails.
        Spec::Group(parts) => {
            for part in *parts {
                if !typecheck(part, value, binding, symbols, intrinsics, stubs)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }

        Spec::Word(name) => match binding.get_by_key(*name) {
            Some(bound) => {
                let nested = Spec::from_bound_cell(bound);
                typecheck(&nested, value, binding, symbols, intrinsics, stubs)
            }
            None => Ok(false),
        },

        Spec::Tag(TagSpec::Null) => Ok(datatype == Datatype::Null),
        Spec::Tag(TagSpec::Void) => Ok(datatype == Datatype::Void),

        Spec::Quasiform(target) => Ok(quasiform_matches(*target, value)),

        // Invariant 10: pack antiform matched item-wise; length mismatch
        // fails outright.
        Spec::QuasiformPack(items) => match pack_items(value, stubs) {
            Some(values) if values.len() == items.len() => {
                for (item_spec, item_value) in items.iter().zip(values.iter()) {
                    if !typecheck(item_spec, item_value, binding, symbols, intrinsics, stubs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        },

        Spec::Quoted(literal) => Ok(cells_structurally_equal(literal, value.cell())),

        Spec::Predicate(id) => match intrinsics.get(*id) {
            Some(dispatch) => Ok(dispatch(value.cell())),
            None => Err(CoreError::NonIntrinsicDispatchUnsupported { name: symbols.resolve(id.0).to_string() }),
        },
    }
}

fn datatype_matches(expected: Datatype, actual: Datatype) -> bool {
    match (expected, actual) {
        (Datatype::Extension(a), Datatype::Extension(b)) => extension_matches(a, b),
        _ => expected == actual,
    }
}

fn extension_matches(a: ExtraHeartId, b: ExtraHeartId) -> bool {
    a == b
}

fn quasiform_matches(target: QuasiformMatch, value: &Atom) -> bool {
    let cell = value.cell();
    if cell.lift() != Some(quill_core::Lift::Antiform) || cell.heart() != target.heart {
        return false;
    }
    match target.symbol {
        None => true,
        Some(expected) => cell.heart() == Heart::Word && cell.payload(0).0 as u32 == expected.to_raw(),
    }
}

/// A pack is a Block antiform (Glossary: "Pack"); its items live in the
/// array stub `extra` points at. A null `extra` `StubId` is a pack with
/// no backing array yet allocated — the empty pack `~[]~`, zero items —
/// distinct from the void antiform `~()~`, which is a Group antiform
/// (see `Cell::antiform_datatype`'s doc comment) and never reaches this
/// function (`voids_out` filters it in `typecheck` before any non-void
/// spec form is evaluated). Anything not shaped as a Block antiform
/// returns `None` so the caller's length check fails.
fn pack_items(value: &Atom, stubs: &StubPool) -> Option<Vec<Atom>> {
    let cell = value.cell();
    if cell.lift() != Some(quill_core::Lift::Antiform) || cell.heart() != Heart::Block {
        return None;
    }
    let stub_id = cell.extra().as_stub();
    if stub_id.is_null() {
        return Some(Vec::new());
    }
    let array = stubs.get(stub_id)?.body.as_array()?;
    Some(array.cells().iter().copied().map(Atom::from_cell).collect())
}

impl<'a> Spec<'a> {
    /// Interpret an already-bound cell as a spec form, for `Spec::Word`'s
    /// "treat result as spec recursively" rule (spec.md §4.6). Only the
    /// datatype-cell case is reachable from a plain lookup without a
    /// borrowed arena of sub-specs; richer nested forms are constructed
    /// directly by callers that hold the binding's backing array.
    fn from_bound_cell(cell: &quill_core::Cell) -> Spec<'static> {
        Spec::Datatype(cell.datatype())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intrinsic::IntrinsicTable;
    use crate::varlist::Archetype;
    use quill_core::{Lift, Sigil, Slot};

    fn atom_of(heart: Heart, lift: Lift, payload0: i64) -> Atom {
        Atom::from_cell(quill_core::Cell::new(heart, Sigil::None, lift, Slot(0), [Slot::from_i64(payload0), Slot(0)]))
    }

    #[test]
    fn invariant_8_single_element_block_degenerates_to_its_member() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let value = atom_of(Heart::Integer, Lift::Plain, 1);
        let t = Spec::Datatype(Datatype::Integer);
        let block = Spec::Block(&[Spec::Datatype(Datatype::Integer)]);
        assert_eq!(
            typecheck(&t, &value, &binding, &symbols, &intrinsics, &stubs).unwrap(),
            typecheck(&block, &value, &binding, &symbols, &intrinsics, &stubs).unwrap()
        );
    }

    #[test]
    fn invariant_9_group_requires_every_part_to_match() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let value = atom_of(Heart::Integer, Lift::Plain, 1);
        let all_match = Spec::Group(&[Spec::Datatype(Datatype::Integer), Spec::Datatype(Datatype::Integer)]);
        let one_fails = Spec::Group(&[Spec::Datatype(Datatype::Integer), Spec::Datatype(Datatype::Decimal)]);
        assert!(typecheck(&all_match, &value, &binding, &symbols, &intrinsics, &stubs).unwrap());
        assert!(!typecheck(&one_fails, &value, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }

    #[test]
    fn empty_block_never_matches() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let value = atom_of(Heart::Integer, Lift::Plain, 1);
        let empty: Spec = Spec::Block(&[]);
        assert!(!typecheck(&empty, &value, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }

    /// Scenario S3 (spec.md §8): `integer?` registered as intrinsic;
    /// typecheck `[integer! text!]` against `42` succeeds via the
    /// intrinsic path, no sub-level constructed.
    #[test]
    fn scenario_s3_intrinsic_predicate_matches_without_a_sub_level() {
        let mut symbols = SymbolTable::new();
        let mut intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let id = IntrinsicId(symbols.intern("integer?"));
        intrinsics.register(id, |cell| cell.heart() == Heart::Integer);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let value = atom_of(Heart::Integer, Lift::Plain, 42);
        let spec = Spec::Block(&[Spec::Datatype(Datatype::Integer), Spec::Datatype(Datatype::TextString)]);
        assert!(typecheck(&spec, &value, &binding, &symbols, &intrinsics, &stubs).unwrap());
        let via_predicate = Spec::Predicate(id);
        assert!(typecheck(&via_predicate, &value, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }

    /// Scenario S5 (spec.md §8): `<null>` matches the null antiform,
    /// not the integer 0.
    #[test]
    fn scenario_s5_null_tag_matches_only_the_null_antiform() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let null_symbol_id = symbols.lookup("null").unwrap().to_raw();
        let null_value = Atom::from_cell(quill_core::Cell::new(
            Heart::Word,
            Sigil::None,
            Lift::Antiform,
            Slot(0),
            [Slot(null_symbol_id as u64), Slot(0)],
        ));
        let zero = atom_of(Heart::Integer, Lift::Plain, 0);
        let spec = Spec::Tag(TagSpec::Null);
        assert!(typecheck(&spec, &null_value, &binding, &symbols, &intrinsics, &stubs).unwrap());
        assert!(!typecheck(&spec, &zero, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }

    /// Scenario S4 (spec.md §8): `~[integer! word!]~` against the pack
    /// whose two elements are `42` and `foo` matches item-wise (§8
    /// invariant 10); a length mismatch against the same pack fails
    /// before any item is even compared.
    #[test]
    fn scenario_s4_pack_matches_item_wise_against_its_real_array() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let mut stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);

        let foo = symbols.intern("foo");
        let mut array = quill_core::ArrayStub::new(quill_core::ArrayFlavor::Plain);
        array.cells_mut().push(quill_core::Cell::new(Heart::Integer, Sigil::None, Lift::Plain, Slot(0), [Slot::from_i64(42), Slot(0)]));
        array
            .cells_mut()
            .push(quill_core::Cell::new(Heart::Word, Sigil::None, Lift::Plain, Slot(0), [Slot(foo.to_raw() as u64), Slot(0)]));
        let stub_id = stubs.alloc(quill_core::StubBody::Array(array));
        let pack = Atom::from_cell(quill_core::Cell::new(
            Heart::Block,
            Sigil::None,
            Lift::Antiform,
            Slot::from_stub(stub_id),
            [Slot(0); 2],
        ));

        let matching_pattern = Spec::QuasiformPack(&[Spec::Datatype(Datatype::Integer), Spec::Datatype(Datatype::WordPlain)]);
        assert!(typecheck(&matching_pattern, &pack, &binding, &symbols, &intrinsics, &stubs).unwrap());

        let wrong_item_pattern = Spec::QuasiformPack(&[Spec::Datatype(Datatype::TextString), Spec::Datatype(Datatype::WordPlain)]);
        assert!(!typecheck(&wrong_item_pattern, &pack, &binding, &symbols, &intrinsics, &stubs).unwrap());

        let length_mismatch_pattern = Spec::QuasiformPack(&[Spec::Datatype(Datatype::Integer)]);
        assert!(!typecheck(&length_mismatch_pattern, &pack, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }

    /// A Block antiform with no backing array allocated (`extra` is the
    /// null `StubId`) is the empty pack `~[]~` — zero items, so only the
    /// zero-arity pack spec matches it.
    #[test]
    fn empty_pack_matches_only_the_zero_arity_pack_spec() {
        let mut symbols = SymbolTable::new();
        let intrinsics = IntrinsicTable::new();
        let stubs = StubPool::with_capacity(4);
        let root = symbols.intern("object");
        let binding = Varlist::new(Archetype::Object, root);
        let empty_pack = Atom::from_cell(quill_core::Cell::new(Heart::Block, Sigil::None, Lift::Antiform, Slot(0), [Slot(0); 2]));

        let zero_item_pattern = Spec::QuasiformPack(&[]);
        assert!(typecheck(&zero_item_pattern, &empty_pack, &binding, &symbols, &intrinsics, &stubs).unwrap());

        let two_item_pattern = Spec::QuasiformPack(&[Spec::Datatype(Datatype::Integer), Spec::Datatype(Datatype::WordPlain)]);
        assert!(!typecheck(&two_item_pattern, &empty_pack, &binding, &symbols, &intrinsics, &stubs).unwrap());
    }
}
