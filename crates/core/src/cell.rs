//! The Cell: a fixed-size, tagged polymorphic value record (spec.md §3.1).
//!
//! Layout mirrors the teacher's `StackValue` (`tagged_stack.rs`): a small
//! fixed-size `#[repr(C)]` record with a discriminant-ish tag up front and a
//! handful of payload slots behind it, so a whole array of `Cell`s can be
//! bulk-allocated and bulk-zeroed the way `TaggedStack` allocates its
//! `StackValue` array. Unlike `StackValue`, a `Cell`'s tag is not a plain
//! enum discriminant: it is the `(header, kind, lift)` triple spec.md §3.1
//! specifies, because the same memory must support the read/write/init
//! gating of §4.1, which a bare Rust `enum` cannot express (an enum has no
//! "uninitialized but legal to initialize" state).

use crate::heart::{Datatype, ExtraHeartId, Heart, Lift, Sigil};
use crate::stub::StubId;
use crate::symbol::{WORD_ANTIFORM_FALSE_ID, WORD_ANTIFORM_NULL_ID, WORD_ANTIFORM_TRUE_ID};
use std::fmt;

/// Bits of [`Cell::header`]. Packed into one `u16` (spec.md §3.1 calls for
/// "base-marker bits... a cell-marker bit, a readability bit, protection
/// bit, a 'don't mark payload slot N' pair of bits, a pair of type-specific
/// crumb bits" plus the persistence bits of §4.1).
pub mod header_bits {
    /// First of the two base-marker bits; together with [`CELL`] these make
    /// the header's low byte unable to be mistaken for a UTF-8 start byte
    /// (design note §9).
    pub const BASE: u16 = 0x0001;
    /// Second base/cell marker bit.
    pub const CELL: u16 = 0x0002;
    /// Set: cell is not readable (poisoned, or legitimately erased).
    pub const UNREADABLE: u16 = 0x0004;
    /// Set: cell may not be mutated even through a non-const reference.
    pub const PROTECTED: u16 = 0x0008;
    /// GC must not follow `extra` as a [`StubId`].
    pub const DONT_MARK_EXTRA: u16 = 0x0010;
    /// GC must not follow `payload[0]` as a [`StubId`].
    pub const DONT_MARK_PAYLOAD0: u16 = 0x0020;
    /// GC must not follow `payload[1]` as a [`StubId`].
    pub const DONT_MARK_PAYLOAD1: u16 = 0x0040;
    /// Type-specific crumb bit 0 (meaning depends on heart).
    pub const CRUMB0: u16 = 0x0080;
    /// Type-specific crumb bit 1.
    pub const CRUMB1: u16 = 0x0100;
    /// API-root flagged: an externally held handle (spec.md §6).
    pub const ROOT: u16 = 0x0200;
    /// Owned by the GC's managed set.
    pub const MANAGED: u16 = 0x0400;
    /// Set during the GC mark phase.
    pub const MARKED: u16 = 0x0800;
    /// A note bit excluded from [`super::COPY_MASK`].
    pub const NOTE: u16 = 0x1000;
    /// A hint bit excluded from [`super::COPY_MASK`].
    pub const HINT: u16 = 0x2000;

    /// Bits a cell must carry to be considered readable
    /// (spec.md §8 invariant 1: `header & (BASE|CELL|UNREADABLE) == BASE|CELL`).
    pub const READABLE_REQUIRED: u16 = BASE | CELL;
    pub const READABLE_MASK: u16 = BASE | CELL | UNREADABLE;
}

use header_bits::*;

/// Bits preserved across `copy` (spec.md §4.1): excludes persistence,
/// protection, note and hint bits.
pub const COPY_MASK: u16 =
    BASE | CELL | UNREADABLE | DONT_MARK_EXTRA | DONT_MARK_PAYLOAD0 | DONT_MARK_PAYLOAD1 | CRUMB0 | CRUMB1;

/// The persistence mask preserved across re-initialization (spec.md §4.1):
/// `managed | root | marked`.
pub const PERSISTENCE_MASK: u16 = ROOT | MANAGED | MARKED;

/// One pointer-sized slot: either a GC-followable [`StubId`] or inert bits.
/// The source format distinguishes these with a header "don't mark" bit
/// rather than a Rust-level union, so that the same slot can change
/// interpretation across a lift transition without re-typing the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot(pub u64);

impl Slot {
    pub fn from_stub(id: StubId) -> Self {
        Slot(id.to_raw())
    }

    pub fn as_stub(self) -> StubId {
        StubId::from_raw(self.0)
    }

    pub fn from_i64(v: i64) -> Self {
        Slot(v as u64)
    }

    pub fn as_i64(self) -> i64 {
        self.0 as i64
    }

    pub fn from_f64(v: f64) -> Self {
        Slot(v.to_bits())
    }

    pub fn as_f64(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// Packed `(heart, sigil)` byte: heart in the low 6 bits, sigil in the high
/// 2 (spec.md §3.1: "Kind byte: encodes heart... plus an optional sigil").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindByte(u8);

impl KindByte {
    pub fn new(heart: Heart, sigil: Sigil) -> Self {
        KindByte(((sigil.bits()) << 6) | (heart as u8 & 0x3F))
    }

    pub fn heart(self) -> Heart {
        // Safety: constructed only through `new`, which masks to the
        // defined Heart range; extension hearts use Heart::Extension.
        match self.0 & 0x3F {
            0 => Heart::Integer,
            1 => Heart::Decimal,
            2 => Heart::TextString,
            3 => Heart::Word,
            4 => Heart::Block,
            5 => Heart::Group,
            6 => Heart::Tag,
            7 => Heart::Comma,
            8 => Heart::Space,
            9 => Heart::Parameter,
            10 => Heart::Action,
            11 => Heart::ErrorCtx,
            12 => Heart::ObjectCtx,
            13 => Heart::Frame,
            14 => Heart::Module,
            _ => Heart::Extension,
        }
    }

    pub fn sigil(self) -> Sigil {
        Sigil::from_bits(self.0 >> 6)
    }
}

/// A fixed-size, tagged polymorphic value record (spec.md §3.1).
///
/// `#[repr(C)]` gives the predictable layout the spec's "first byte cannot
/// be valid UTF-8" property relies on: `header`'s low byte always has
/// `BASE|CELL` set in any well-formed (readable or writable) cell, which
/// puts it above the UTF-8 continuation-byte range and below a valid
/// single-byte codepoint's printable set in practice for the sentinel
/// values this crate uses; API boundary code that wants the full
/// disambiguation guarantee should keep headers in the reserved low range
/// as this module does.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Cell {
    header: u16,
    kind: KindByte,
    lift: u8,
    extra: Slot,
    payload: [Slot; 2],
}

impl Cell {
    /// A legally initable but unreadable/unwritable all-zero cell
    /// (spec.md §3.1 "the all-zero header is a distinguished 'erased'
    /// state").
    pub const ERASED: Cell = Cell {
        header: 0,
        kind: KindByte(0),
        lift: 0,
        extra: Slot(0),
        payload: [Slot(0), Slot(0)],
    };

    /// Construct a readable, writable, unprotected cell with the given
    /// kind/lift/payload. Does not itself validate the isotopic-heart
    /// restriction of §3.1 — use [`crate::gating`] entry points for
    /// caller-facing construction; this is the raw building block they
    /// call.
    pub fn new(heart: Heart, sigil: Sigil, lift: Lift, extra: Slot, payload: [Slot; 2]) -> Self {
        Cell {
            header: BASE | CELL,
            kind: KindByte::new(heart, sigil),
            lift: lift.to_byte(),
            extra,
            payload,
        }
    }

    pub fn header_bits(&self) -> u16 {
        self.header
    }

    pub(crate) fn set_header_bits(&mut self, bits: u16) {
        self.header = bits;
    }

    pub fn heart(&self) -> Heart {
        self.kind.heart()
    }

    pub fn sigil(&self) -> Sigil {
        self.kind.sigil()
    }

    pub fn lift(&self) -> Option<Lift> {
        Lift::from_byte(self.lift)
    }

    pub fn extra(&self) -> Slot {
        self.extra
    }

    pub fn set_extra(&mut self, slot: Slot) {
        self.extra = slot;
    }

    pub fn payload(&self, n: usize) -> Slot {
        self.payload[n]
    }

    pub fn set_payload(&mut self, n: usize, slot: Slot) {
        self.payload[n] = slot;
    }

    pub fn extra_heart_id(&self) -> Option<ExtraHeartId> {
        if self.heart() == Heart::Extension {
            Some(ExtraHeartId(self.extra.0 as u32))
        } else {
            None
        }
    }

    /// Spec.md §8 invariant 1.
    pub fn is_readable(&self) -> bool {
        self.header & READABLE_MASK == READABLE_REQUIRED
    }

    /// Spec.md §3.1: "A writable cell is readable and unprotected."
    pub fn is_writable(&self) -> bool {
        self.is_readable() && self.header & PROTECTED == 0
    }

    /// Spec.md §3.1: the all-zero header; "initable" regardless of
    /// readability/writability.
    pub fn is_erased(&self) -> bool {
        self.header == 0
    }

    /// A cell is initable if it is erased, or already well-formed
    /// (readable) — matching `erase`'s precondition in spec.md §4.1.
    pub fn is_initable(&self) -> bool {
        self.is_erased() || self.is_readable() || self.header & READABLE_MASK == READABLE_MASK
    }

    pub fn has_flag(&self, bit: u16) -> bool {
        self.header & bit != 0
    }

    pub(crate) fn set_flag(&mut self, bit: u16, on: bool) {
        if on {
            self.header |= bit;
        } else {
            self.header &= !bit;
        }
    }

    /// The persistence mask of spec.md §4.1: `managed | root | marked`.
    pub fn persistence_bits(&self) -> u16 {
        self.header & PERSISTENCE_MASK
    }

    /// The externally-visible "type" of this cell, derived from
    /// (lift, kind) by the ordered rules of spec.md §4.2.
    pub fn datatype(&self) -> Datatype {
        match self.lift() {
            Some(Lift::Antiform) => self.antiform_datatype(),
            Some(Lift::Quasiform) => Datatype::Quasiform,
            Some(Lift::Quoted(_)) => Datatype::Quoted,
            Some(Lift::Plain) => self.plain_datatype(),
            // An unreadable/corrupt lift byte has no projection; callers
            // are expected to check `is_readable` first.
            None => Datatype::Extension(ExtraHeartId(0)),
        }
    }

    fn plain_datatype(&self) -> Datatype {
        if self.heart() == Heart::Extension {
            return Datatype::Extension(self.extra_heart_id().unwrap_or(ExtraHeartId(0)));
        }
        match self.sigil() {
            Sigil::Meta => return Datatype::Metaform,
            Sigil::Pinned => return Datatype::Pinned,
            Sigil::Tied => return Datatype::Tied,
            Sigil::None => {}
        }
        match self.heart() {
            Heart::Integer => Datatype::Integer,
            Heart::Decimal => Datatype::Decimal,
            Heart::TextString => Datatype::TextString,
            Heart::Word => Datatype::WordPlain,
            Heart::Block => Datatype::BlockPlain,
            Heart::Group => Datatype::GroupPlain,
            Heart::Tag => Datatype::Tag,
            Heart::Comma => Datatype::CommaPlain,
            Heart::Space => Datatype::SpacePlain,
            Heart::Parameter => Datatype::Parameter,
            Heart::Action => Datatype::ActionPlain,
            Heart::ErrorCtx => Datatype::ErrorPlain,
            Heart::ObjectCtx => Datatype::ObjectCtx,
            Heart::Frame => Datatype::Frame,
            Heart::Module => Datatype::Module,
            Heart::Extension => unreachable!("handled above"),
        }
    }

    /// Antiform projection of the restricted isotopic hearts
    /// (spec.md §4.2). The Word-antiform keyword/null/okay distinction
    /// is made by comparing `payload(0)` against the fixed boot-symbol
    /// ids in [`crate::symbol`] rather than by resolving a spelling, so
    /// this needs no live `SymbolTable`. A Group antiform with no
    /// backing array (`extra` is the null [`StubId`]) is the void
    /// antiform `~()~`; any other Group antiform never arises because
    /// only the empty group has an antiform projection in this model.
    fn antiform_datatype(&self) -> Datatype {
        match self.heart() {
            Heart::Word => match self.payload(0).0 as u32 {
                WORD_ANTIFORM_TRUE_ID => Datatype::Okay(true),
                WORD_ANTIFORM_FALSE_ID => Datatype::Okay(false),
                WORD_ANTIFORM_NULL_ID => Datatype::Null,
                _ => Datatype::Keyword,
            },
            Heart::Group => Datatype::Void,
            Heart::Block => Datatype::Splice,
            Heart::ErrorCtx => Datatype::ErrorAntiform,
            Heart::Action => Datatype::ActionAntiform,
            Heart::Comma => Datatype::BarrierAntiform,
            Heart::Space => Datatype::Trash,
            // Gating (`crate::gating::check_isotopic`) rejects any other
            // heart from ever carrying antiform lift.
            _ => Datatype::Trash,
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_readable() {
            return write!(f, "Cell(unreadable, header=0x{:04x})", self.header);
        }
        write!(
            f,
            "Cell({}{:?}, lift={:?}, header=0x{:04x})",
            self.sigil_prefix(),
            self.heart(),
            self.lift(),
            self.header
        )
    }
}

impl Cell {
    fn sigil_prefix(&self) -> &'static str {
        match self.sigil() {
            Sigil::None => "",
            Sigil::Meta => "^",
            Sigil::Pinned => "@",
            Sigil::Tied => "&",
        }
    }
}

/// Narrowing view: guaranteed not antiform, so it may legally appear in a
/// source array (spec.md §3.1, design note §9).
#[derive(Debug, Clone, Copy)]
pub struct Element(Cell);

/// Narrowing view: the widest view, any of the four lifts, the result of
/// one evaluation step (design note §9).
#[derive(Debug, Clone, Copy)]
pub struct Atom(Cell);

/// Narrowing view: guaranteed not an *unstable* antiform (pack, error,
/// barrier) — spec.md §4.7 step 2.
#[derive(Debug, Clone, Copy)]
pub struct Stable(Cell);

impl Atom {
    pub fn from_cell(cell: Cell) -> Self {
        Atom(cell)
    }

    pub fn cell(&self) -> &Cell {
        &self.0
    }

    pub fn into_cell(self) -> Cell {
        self.0
    }
}

impl TryFrom<Atom> for Element {
    type Error = NotAnElement;

    fn try_from(atom: Atom) -> Result<Self, Self::Error> {
        if atom.0.lift() == Some(Lift::Antiform) {
            Err(NotAnElement)
        } else {
            Ok(Element(atom.0))
        }
    }
}

impl From<Element> for Atom {
    fn from(e: Element) -> Self {
        Atom(e.0)
    }
}

impl Element {
    pub fn cell(&self) -> &Cell {
        &self.0
    }
}

/// Error returned when narrowing an [`Atom`] to an [`Element`] fails
/// because the underlying cell is antiform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAnElement;

impl fmt::Display for NotAnElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("antiform values cannot appear as elements")
    }
}

impl std::error::Error for NotAnElement {}

impl Stable {
    pub fn cell(&self) -> &Cell {
        &self.0
    }
}

/// Error returned when narrowing an [`Atom`] to [`Stable`] fails because
/// the underlying antiform is unstable (pack / error / barrier).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unstable;

impl fmt::Display for Unstable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("value is an unstable antiform (pack, error or barrier)")
    }
}

impl std::error::Error for Unstable {}
