//! A composable engine for producing, transforming, and combining
//! time-varying sequences of values: cold `Signal`s observed through a
//! single-entry-point `Observer`, an algebra of operators over them, hot
//! `Subject`s and connectable signals for multicast, and a binding
//! boundary for consuming a non-failing signal into externally owned
//! state.
//!
//! Grounded throughout in `seen_std::reactive`'s module layout
//! (`observable`, `subject`, `scheduler`, `subscription`, `operators`),
//! generalized from that crate's compiler-internal usage to a
//! general-purpose library surface. See `DESIGN.md` for the
//! module-by-module grounding ledger.

pub mod binding;
pub mod cancellation;
pub mod connectable;
pub mod context;
pub mod error;
pub mod observer;
pub mod operators;
pub mod signal;
pub mod subject;

/// Re-exports covering the surface most consumers need: the signal type
/// and its error/cancellation/observer/context companions, plus the
/// subject and connectable-signal constructors. Operator methods are not
/// re-exported individually — they attach directly to `Signal` via the
/// `impl` blocks in `operators::*` and are available the moment
/// `Signal` is in scope.
pub mod prelude {
    pub use crate::binding::BindingTarget;
    pub use crate::cancellation::{Cancellation, CancellationBag};
    pub use crate::connectable::{publish, replay, replay_latest, share, ConnectableSignal, MulticastSubject};
    pub use crate::context::{ExecutionContext, ImmediateContext, MainLoopContext, ThreadPoolContext, VirtualTimeContext};
    pub use crate::error::{CoreResult, Never, ReactiveCoreError};
    pub use crate::observer::{BoxObserver, ClosureObserver, Event, FnObserver, Observer};
    pub use crate::signal::Signal;
    pub use crate::subject::{PassthroughSubject, PropertySubject, ReplaySubject};
}
