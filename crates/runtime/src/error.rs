//! Infrastructure errors: Rust-level failures internal to this crate pair
//! that have no business becoming a language-level Abrupt Failure
//! (SPEC_FULL.md §2.2).
//!
//! Modeled the way the teacher's `codegen::error::CodeGenError` is: a
//! plain enum with hand-written `Display`/`std::error::Error` impls, no
//! `thiserror` — the teacher pack never reaches for it.

use std::fmt;

/// A Rust-level error internal to `quill-core`/`quill-runtime`. Distinct
/// from [`crate::error_record::ErrorRecord`], which is language-level
/// data that flows through [`crate::rescue::RescueScope`] as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// No message template in the boot catalog matches `(category, id)`
    /// (spec.md §4.4 entry point 1).
    UnknownErrorTemplate { category: String, id: String },
    /// The variadic argument slice did not match the placeholder count
    /// the message template requires (spec.md §8 invariant 7).
    ArgCountMismatch { expected: usize, got: usize },
    /// `fail` was invoked before the error subsystem finished booting
    /// (spec.md §4.4: "boot-phase escape").
    ErrorSubsystemNotReady,
    /// A value passed to `from_value_or_context` was neither an error
    /// context nor convertible to one.
    NotAnErrorContext,
    /// Typecheck needed to dispatch a predicate that cannot run as an
    /// intrinsic (spec.md §4.6: "otherwise builds a frame through the
    /// (external) evaluator") — the full evaluator trampoline is out of
    /// scope here.
    NonIntrinsicDispatchUnsupported { name: String },
    /// Argument coercion attempted a second decay pass on the same
    /// value (spec.md §4.7: "a second decay attempt is an invariant
    /// violation").
    DoubleDecay,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::UnknownErrorTemplate { category, id } => {
                write!(f, "no error template for category `{category}`, id `{id}`")
            }
            CoreError::ArgCountMismatch { expected, got } => {
                write!(f, "error template expects {expected} argument(s), got {got}")
            }
            CoreError::ErrorSubsystemNotReady => f.write_str("error subsystem is not yet initialized"),
            CoreError::NotAnErrorContext => f.write_str("value is not an error context"),
            CoreError::NonIntrinsicDispatchUnsupported { name } => {
                write!(f, "predicate `{name}` cannot dispatch as an intrinsic and the evaluator is out of scope")
            }
            CoreError::DoubleDecay => f.write_str("argument coercion attempted a second decay pass"),
        }
    }
}

impl std::error::Error for CoreError {}
