//! Ambient error type for programmer errors (invariant violations), as
//! distinct from the user-supplied `Failure` generic that flows through
//! `Event::Failed`. Grounded in `seen_common::error::SeenError`: one
//! `#[error(...)]` variant per failure family plus `xxx_error` constructors.

use thiserror::Error;

pub type CoreResult<T> = Result<T, ReactiveCoreError>;

/// Violations of this crate's invariants that the type system cannot
/// prevent. These are never returned from operator-building methods
/// (those are infallible by construction); they surface only from
/// debug assertions and from components, like `CompositeDisposable`'s
/// analog here, that are used across a boundary the caller controls.
#[derive(Error, Debug, Clone)]
pub enum ReactiveCoreError {
    #[error("event delivered after a terminal event: {message}")]
    EventAfterTerminal { message: String },

    #[error("double registration: {message}")]
    DoubleRegistration { message: String },
}

impl ReactiveCoreError {
    pub fn event_after_terminal(message: impl Into<String>) -> Self {
        Self::EventAfterTerminal {
            message: message.into(),
        }
    }

    pub fn double_registration(message: impl Into<String>) -> Self {
        Self::DoubleRegistration {
            message: message.into(),
        }
    }
}

/// The uninhabited "never fails" marker type for `Signal<T, Failure>`.
/// A `Signal<T, Never>` cannot produce `Event::Failed` — there is no
/// value of type `Never` to put in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Never {}
