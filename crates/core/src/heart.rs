//! Heart, Sigil, Lift and the derived Datatype.
//!
//! `Heart` is the structural type identity of a cell, independent of the
//! quote/quasi/antiform lifting layered on top of it (spec.md §3.1, §4.2).
//! Only a representative subset of the ~64 hearts a full implementation
//! would carry is modeled here — enough to exercise every rule in §4.2 and
//! every restricted-subset invariant in §3.1. New hearts slot into the
//! match arms of `Heart::is_isotopic` and `Cell::datatype` without touching
//! the gating or typecheck code, which only ever go through those two
//! functions.

use std::fmt;

/// The structural type of a cell's payload, independent of lift/sigil.
///
/// Order is not significant; `Heart` is stored as a single byte in
/// [`crate::cell::KindByte`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Heart {
    Integer = 0,
    Decimal,
    TextString,
    Word,
    Block,
    Group,
    Tag,
    Comma,
    Space,
    Parameter,
    Action,
    ErrorCtx,
    ObjectCtx,
    Frame,
    Module,
    /// A user-defined datatype. `Cell::extra_heart` carries the
    /// identity; two Extension cells project the same `Datatype` iff
    /// their `ExtraHeartId`s match (spec.md §4.2).
    Extension,
}

impl Heart {
    /// Restricted subset of hearts spec.md §3.1 allows in antiform (and,
    /// symmetrically, quasiform) lift. Every other heart is a hard gating
    /// error if an antiform/quasiform cell claims it.
    pub fn is_isotopic(self) -> bool {
        matches!(
            self,
            Heart::Word
                | Heart::Block
                | Heart::Group
                | Heart::Comma
                | Heart::Space
                | Heart::Action
                | Heart::ErrorCtx
        )
    }
}

impl fmt::Display for Heart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Heart::Integer => "integer!",
            Heart::Decimal => "decimal!",
            Heart::TextString => "text!",
            Heart::Word => "word!",
            Heart::Block => "block!",
            Heart::Group => "group!",
            Heart::Tag => "tag!",
            Heart::Comma => "comma!",
            Heart::Space => "space!",
            Heart::Parameter => "parameter!",
            Heart::Action => "action!",
            Heart::ErrorCtx => "error!",
            Heart::ObjectCtx => "object!",
            Heart::Frame => "frame!",
            Heart::Module => "module!",
            Heart::Extension => "extension!",
        };
        f.write_str(name)
    }
}

/// A 2-bit ornament orthogonal to heart and lift (spec.md §3.1, Glossary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Sigil {
    #[default]
    None = 0,
    Meta = 1,
    Pinned = 2,
    Tied = 3,
}

impl Sigil {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Sigil::None,
            1 => Sigil::Meta,
            2 => Sigil::Pinned,
            _ => Sigil::Tied,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// The four-way coarse classification layered over every heart
/// (spec.md §3.1).
///
/// Quoted depth is folded into the same byte: `Lift::Quoted(n)` for `n >= 1`
/// corresponds to the source's `LIFT_BYTE - 3 == n` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lift {
    Antiform,
    Plain,
    Quasiform,
    Quoted(u8),
}

impl Lift {
    /// Raw encoding used by [`crate::cell::LiftByte`]: 1/2/3 for the first
    /// three forms, `3 + depth` for quoted, matching spec.md §3.1 exactly
    /// ("`LIFT_BYTE − 3` is the depth").
    pub fn to_byte(self) -> u8 {
        match self {
            Lift::Antiform => 1,
            Lift::Plain => 2,
            Lift::Quasiform => 3,
            Lift::Quoted(depth) => 3 + depth,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => None,
            1 => Some(Lift::Antiform),
            2 => Some(Lift::Plain),
            3 => Some(Lift::Quasiform),
            n => Some(Lift::Quoted(n - 3)),
        }
    }
}

/// Stable identity for an extension (user-defined) datatype.
///
/// Two extension cells project the same [`Datatype`] iff their
/// `ExtraHeartId`s are equal (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtraHeartId(pub u32);

/// The externally-visible "type" of a cell, derived from (lift, kind) by
/// the ordered rules of spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    // Plain, no sigil: the heart itself.
    Integer,
    Decimal,
    TextString,
    WordPlain,
    BlockPlain,
    GroupPlain,
    Tag,
    CommaPlain,
    SpacePlain,
    Parameter,
    ActionPlain,
    ErrorPlain,
    ObjectCtx,
    Frame,
    Module,
    Extension(ExtraHeartId),

    // Plain + sigil.
    Metaform,
    Pinned,
    Tied,

    // Surface lifts.
    Quasiform,
    Quoted,

    // Antiform projections of the isotopic hearts (spec.md §3.1, §4.2).
    /// Word antiform `~null~`.
    Null,
    /// Word antiform `~true~` / `~false~` ("okay"/logic keywords).
    Okay(bool),
    /// Any other Word antiform keyword (e.g. `~custom~`).
    Keyword,
    /// Group antiform, empty: the void antiform `~()~`.
    Void,
    /// Block antiform: a pack (multi-value return) or an argument splice,
    /// distinguished by the consuming context, not by type (Glossary:
    /// "Pack").
    Splice,
    /// ErrorCtx antiform: a "soft failure" a caller may inspect or
    /// re-raise (spec.md §4.5, §7).
    ErrorAntiform,
    /// Action antiform: a callable action value.
    ActionAntiform,
    /// Comma antiform: an evaluator barrier.
    BarrierAntiform,
    /// Space antiform: the invalid-but-writable trash sentinel (Glossary).
    Trash,
}

impl Datatype {
    /// True for antiform projections that spec.md §4.7 step 2 calls
    /// "unstable": pack, error, barrier. These are disallowed wherever a
    /// `Stable` value is required unless a single decay pass resolves them.
    pub fn is_unstable(self) -> bool {
        matches!(
            self,
            Datatype::Splice | Datatype::ErrorAntiform | Datatype::BarrierAntiform
        )
    }

    pub fn is_antiform(self) -> bool {
        matches!(
            self,
            Datatype::Null
                | Datatype::Okay(_)
                | Datatype::Keyword
                | Datatype::Void
                | Datatype::Splice
                | Datatype::ErrorAntiform
                | Datatype::ActionAntiform
                | Datatype::BarrierAntiform
                | Datatype::Trash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lift_byte_roundtrip() {
        for (lift, byte) in [
            (Lift::Antiform, 1),
            (Lift::Plain, 2),
            (Lift::Quasiform, 3),
            (Lift::Quoted(1), 4),
            (Lift::Quoted(5), 8),
        ] {
            assert_eq!(lift.to_byte(), byte);
            assert_eq!(Lift::from_byte(byte), Some(lift));
        }
    }

    #[test]
    fn isotopic_hearts_are_the_restricted_subset() {
        assert!(Heart::Word.is_isotopic());
        assert!(Heart::Block.is_isotopic());
        assert!(Heart::ErrorCtx.is_isotopic());
        assert!(!Heart::Integer.is_isotopic());
        assert!(!Heart::TextString.is_isotopic());
        assert!(!Heart::Tag.is_isotopic());
    }

    #[test]
    fn unstable_datatypes_are_exactly_pack_error_barrier() {
        assert!(Datatype::Splice.is_unstable());
        assert!(Datatype::ErrorAntiform.is_unstable());
        assert!(Datatype::BarrierAntiform.is_unstable());
        assert!(!Datatype::Null.is_unstable());
        assert!(!Datatype::Trash.is_unstable());
        assert!(!Datatype::Integer.is_unstable());
    }

    #[test]
    fn extension_identity_is_by_id() {
        let a = Datatype::Extension(ExtraHeartId(7));
        let b = Datatype::Extension(ExtraHeartId(7));
        let c = Datatype::Extension(ExtraHeartId(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
