//! Engine configuration (SPEC_FULL.md §2.3).
//!
//! `spec.md` itself names exactly one piece of configuration —
//! `R3_PROBE_FAILURES` (spec.md §6). This module adds what an embedding
//! needs to boot reproducibly, sized the way the teacher hard-codes its own
//! constants (`DEFAULT_STACK_CAPACITY` in `tagged_stack.rs`,
//! `ARENA_RESET_THRESHOLD` in `arena.rs`).

use std::env;

/// Default initial stub-pool capacity. Scaled down from the teacher's
/// `DEFAULT_STACK_CAPACITY` (4096 raw stack values) because stubs here back
/// varlists and strings rather than a dense evaluation stack.
pub const DEFAULT_STUB_CAPACITY: usize = 1024;

/// Environment variable gating verbose failure printing (spec.md §6, §4.4).
pub const PROBE_FAILURES_ENV: &str = "R3_PROBE_FAILURES";

/// Boot-time configuration for a [`crate::stub::StubPool`] and, in
/// `quill-runtime`, the `Engine` built on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Initial capacity of the stub pool.
    pub initial_stub_capacity: usize,
    /// Print every raised failure as it occurs (spec.md §4.4). Embedders
    /// set this directly instead of relying on process environment, so
    /// tests do not have to fork or mutate global state to exercise the
    /// probe path.
    pub probe_failures: bool,
}

impl EngineConfig {
    /// Build a config from environment: `R3_PROBE_FAILURES` is probed the
    /// way spec.md §6 describes ("presence + nonzero value").
    pub fn from_env() -> Self {
        EngineConfig {
            initial_stub_capacity: DEFAULT_STUB_CAPACITY,
            probe_failures: probe_failures_enabled_in_env(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_stub_capacity: DEFAULT_STUB_CAPACITY,
            probe_failures: false,
        }
    }
}

fn probe_failures_enabled_in_env() -> bool {
    match env::var(PROBE_FAILURES_ENV) {
        Ok(val) => !val.is_empty() && val != "0",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_does_not_probe_failures() {
        assert!(!EngineConfig::default().probe_failures);
    }

    #[test]
    fn default_config_uses_documented_capacity() {
        assert_eq!(EngineConfig::default().initial_stub_capacity, DEFAULT_STUB_CAPACITY);
    }
}
