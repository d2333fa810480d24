//! Diagnostics: the `R3_PROBE_FAILURES` verbose-failure print path
//! (SPEC_FULL.md §2.1/§4.4/§6).
//!
//! Grounded on two teacher patterns at once: `memory_stats.rs`'s
//! `OnceLock`-backed process-wide flag for "read the environment once,"
//! and the old `error.rs`'s thread-local slot for "per-thread state that
//! must not re-enter while already active" — repurposed here as a
//! re-entrancy guard instead of an FFI error channel, since molding a
//! failure can itself raise (e.g. while formatting one of its
//! placeholder cells), and a probe that called back into itself on that
//! second failure would recurse forever.

use crate::error_record::ErrorRecord;
use quill_core::SymbolTable;
use std::cell::Cell as RustCell;
use std::sync::OnceLock;

static PROBE_FAILURES: OnceLock<bool> = OnceLock::new();

thread_local! {
    static PROBING: RustCell<bool> = const { RustCell::new(false) };
}

/// Whether verbose failure printing is enabled, read once from
/// [`quill_core::config::PROBE_FAILURES_ENV`] (SPEC_FULL.md §2.1).
/// `init` lets an embedder pin the value directly (e.g. in tests)
/// instead of mutating process environment.
pub fn probe_failures_enabled() -> bool {
    *PROBE_FAILURES.get_or_init(|| quill_core::EngineConfig::from_env().probe_failures)
}

pub fn init_probe_failures(enabled: bool) {
    let _ = PROBE_FAILURES.set(enabled);
}

/// Called from `crate::rescue::RescueScope::run` when a body returns
/// `Abort::Fail` (SPEC_FULL.md §4.4). Prints the failure's molded form
/// via `tracing::error!` iff probing is enabled, guarding against
/// re-entrant calls triggered by molding the failure itself.
pub fn probe_failure(error: &ErrorRecord, symbols: &SymbolTable) {
    if !probe_failures_enabled() {
        return;
    }
    let already_probing = PROBING.with(|flag| flag.replace(true));
    if already_probing {
        tracing::warn!("suppressed re-entrant failure probe");
        return;
    }
    tracing::error!(molded = %error.mold(symbols), "raised failure");
    PROBING.with(|flag| flag.set(false));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_failure_does_not_panic_when_disabled() {
        init_probe_failures(false);
        let mut symbols = SymbolTable::new();
        let record = ErrorRecord::from_text(&mut symbols, "boom");
        probe_failure(&record, &symbols);
    }

    #[test]
    fn reentrant_probe_is_suppressed_not_recursed() {
        PROBING.with(|flag| flag.set(true));
        let mut symbols = SymbolTable::new();
        let record = ErrorRecord::from_text(&mut symbols, "boom");
        // With the flag already set this must return instead of
        // re-entering the probe path.
        probe_failure(&record, &symbols);
        PROBING.with(|flag| flag.set(false));
    }
}
