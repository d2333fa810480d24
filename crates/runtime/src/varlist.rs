//! Varlist (Context): ordered name→value mapping (spec.md §3.4).
//!
//! Grounded on the teacher's `value.rs` `VariantData`/map-backed value
//! shapes for "own the storage, hand back named fields" — but a varlist
//! additionally needs order (slot 0 is always the rootvar) plus O(1)
//! lookup, so storage here is an ordered `Vec` with a parallel `HashMap`
//! index, matching the "linear or hashed (impl choice)" note in spec.md
//! §3.4; hashed was chosen because Error construction and typecheck are
//! both lookup-heavy call paths (§4.4, §4.6).

use quill_core::{Cell, Heart, Sigil, Symbol};
use std::collections::HashMap;

/// What a varlist's rootvar (slot 0) marks it as (spec.md §3.4: "the heart
/// mark that distinguishes object / error / frame / module").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Archetype {
    Object,
    Error,
    Frame,
    Module,
}

impl Archetype {
    pub fn heart(self) -> Heart {
        match self {
            Archetype::Object => Heart::ObjectCtx,
            Archetype::Error => Heart::ErrorCtx,
            Archetype::Frame => Heart::Frame,
            Archetype::Module => Heart::Module,
        }
    }
}

/// An ordered name→value mapping (spec.md §3.4). Slot 0 is always the
/// rootvar; named lookups skip it the way the source's "find symbol in
/// context" is specified to (the rootvar carries the archetype mark, not
/// a user-visible field).
#[derive(Debug, Clone)]
pub struct Varlist {
    archetype: Archetype,
    keys: Vec<Symbol>,
    cells: Vec<Cell>,
    index: HashMap<Symbol, u32>,
}

impl Varlist {
    /// Build an empty varlist of the given archetype; slot 0 is
    /// synthesized as the rootvar and is not addressable by `find`.
    pub fn new(archetype: Archetype, rootvar_symbol: Symbol) -> Self {
        let rootvar = Cell::new(archetype.heart(), Sigil::None, quill_core::Lift::Plain, quill_core::Slot(0), [
            quill_core::Slot(0),
            quill_core::Slot(0),
        ]);
        Varlist {
            archetype,
            keys: vec![rootvar_symbol],
            cells: vec![rootvar],
            index: HashMap::new(),
        }
    }

    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Number of addressable (non-rootvar) slots.
    pub fn len(&self) -> usize {
        self.cells.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a new named slot, returning its 0-based addressable index.
    pub fn push(&mut self, key: Symbol, value: Cell) -> u32 {
        self.keys.push(key);
        self.cells.push(value);
        let idx = (self.cells.len() - 2) as u32;
        self.index.insert(key, idx);
        idx
    }

    /// `find symbol in context` (spec.md §3.4): hashed lookup.
    pub fn find(&self, key: Symbol) -> Option<u32> {
        self.index.get(&key).copied()
    }

    pub fn get(&self, idx: u32) -> Option<&Cell> {
        self.cells.get(idx as usize + 1)
    }

    pub fn get_mut(&mut self, idx: u32) -> Option<&mut Cell> {
        self.cells.get_mut(idx as usize + 1)
    }

    pub fn get_by_key(&self, key: Symbol) -> Option<&Cell> {
        self.find(key).and_then(|idx| self.get(idx))
    }

    pub fn key_at(&self, idx: u32) -> Option<Symbol> {
        self.keys.get(idx as usize + 1).copied()
    }

    /// Iterate addressable `(key, value)` pairs in slot order, skipping
    /// the rootvar.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Cell)> {
        self.keys.iter().zip(self.cells.iter()).skip(1).map(|(k, c)| (*k, c))
    }
}

/// GC mark-phase contract stand-in (spec.md §6: "for every readable
/// varlist, visit every slot"). The actual mark algorithm is out of
/// scope; this trait is the seam a future GC crate implements against.
pub trait Mark {
    fn trace(&self, visit: &mut dyn FnMut(quill_core::StubId));
}

impl Mark for Varlist {
    fn trace(&self, visit: &mut dyn FnMut(quill_core::StubId)) {
        for cell in &self.cells {
            if cell.is_readable() && !cell.has_flag(quill_core::cell::header_bits::DONT_MARK_PAYLOAD0) {
                visit(cell.payload(0).as_stub());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Lift, Slot, SymbolTable};

    fn int_cell(n: i64) -> Cell {
        Cell::new(Heart::Integer, Sigil::None, Lift::Plain, Slot(0), [Slot::from_i64(n), Slot(0)])
    }

    #[test]
    fn push_and_find_round_trip() {
        let mut table = SymbolTable::new();
        let root_sym = table.intern("object");
        let x = table.intern("x");
        let mut vl = Varlist::new(Archetype::Object, root_sym);
        let idx = vl.push(x, int_cell(10));
        assert_eq!(vl.find(x), Some(idx));
        assert_eq!(vl.get(idx).unwrap().payload(0).as_i64(), 10);
    }

    #[test]
    fn rootvar_is_not_addressable_via_find() {
        let mut table = SymbolTable::new();
        let root_sym = table.intern("object");
        let vl = Varlist::new(Archetype::Object, root_sym);
        assert_eq!(vl.find(root_sym), None);
        assert_eq!(vl.len(), 0);
    }

    #[test]
    fn iter_skips_the_rootvar() {
        let mut table = SymbolTable::new();
        let root_sym = table.intern("object");
        let a = table.intern("a");
        let b = table.intern("b");
        let mut vl = Varlist::new(Archetype::Object, root_sym);
        vl.push(a, int_cell(1));
        vl.push(b, int_cell(2));
        let names: Vec<_> = vl.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec![a, b]);
    }
}
