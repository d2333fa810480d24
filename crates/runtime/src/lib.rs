//! Quill Runtime: the typecheck engine, abrupt-failure mechanism, and
//! execution bookkeeping built on top of `quill-core`'s Cell/Stub/Symbol
//! primitives.

pub mod coercion;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod error_record;
pub mod intrinsic;
pub mod level;
pub mod rescue;
pub mod resources;
pub mod throw;
pub mod typespec;
pub mod varlist;

pub use coercion::{coerce, Param, Refinements};
pub use engine::Engine;
pub use error::CoreError;
pub use error_record::{ErrorRecord, ErrorTemplate, MessageForm};
pub use intrinsic::{dispatch_intrinsic, IntrinsicFn, IntrinsicResult, IntrinsicTable};
pub use level::{Executor, Level, LevelStack};
pub use rescue::{Delivered, Failure, Resources, RescueScope, Snapshot};
pub use resources::{DataStack, GuardedStack, ManualsStack, MoldBuffer, ResourceStack};
pub use throw::{Abort, Outcome, ThrowLabel, Thrown};
pub use typespec::{typecheck, IntrinsicId, QuasiformMatch, Spec, TagSpec};
pub use varlist::{Archetype, Mark, Varlist};
