//! Engine: the aggregate owner of a symbol table plus the resources a
//! rescue scope snapshots and unwinds (spec.md §5).
//!
//! Deliberately does *not* `impl Send`/`Sync` for `Engine` — a
//! departure from the teacher, whose `Value` (`value.rs`) does carry
//! those impls to support its green-thread scheduler. Spec.md §5 is
//! explicit that this core's scheduling model is single-threaded
//! cooperative with "exactly one 'current' scope at any time" and that
//! two processes in the same address space must not share a Stub or
//! cell; an `Engine` that could cross a thread boundary would violate
//! that by construction, so the auto-trait is left unimplemented rather
//! than asserted away.

use crate::diagnostics::probe_failure;
use crate::rescue::{Delivered, Resources, RescueScope};
use crate::throw::Abort;
use quill_core::{EngineConfig, SymbolTable};

/// One Quill evaluation context: the symbol table plus every resource a
/// rescue scope snapshots (spec.md §5's "shared resources").
pub struct Engine {
    pub symbols: SymbolTable,
    pub resources: Resources,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        crate::diagnostics::init_probe_failures(config.probe_failures);
        Engine {
            symbols: SymbolTable::new(),
            resources: Resources::with_stub_capacity(config.initial_stub_capacity),
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Run `body` inside a fresh [`RescueScope`] (spec.md §4.5), probing
    /// (tracing) every delivered failure per SPEC_FULL.md §2.1/§4.4.
    /// Wrapping at this layer, rather than inside `RescueScope::run`
    /// itself, keeps `crate::rescue` ignorant of the symbol table it
    /// would otherwise need only to mold a diagnostic string.
    pub fn run_rescued<T>(&mut self, body: impl FnOnce(&mut Resources) -> Result<T, Abort>) -> Delivered<T> {
        let outcome = RescueScope::run(&mut self.resources, body);
        if let Delivered::Failed(failure) = &outcome {
            probe_failure(&failure.error, &self.symbols);
        }
        outcome
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
