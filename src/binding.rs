//! The binding sink boundary (§4.H): consuming a non-failing signal into
//! externally owned mutable state.
//!
//! No teacher equivalent exists — the Seen compiler never binds a stream
//! into UI state — so this is grounded instead in the general shape of
//! `seen_std::reactive::FnObserver` (a closure-backed observer) plus
//! `CompositeDisposable`'s external-ownership contract: the returned
//! cancellation is handed to the *target*, not kept by the caller.

use crate::cancellation::{Cancellation, CancellationBag};
use crate::context::ExecutionContext;
use crate::error::Never;
use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::sync::Arc;

/// An object a signal can bind into: it owns a cancellation bag (so the
/// binding tears down with the target) and an execution context (so
/// delivery happens where the target expects, e.g. a UI thread).
pub trait BindingTarget: Send + Sync {
    fn cancellation_bag(&self) -> &CancellationBag;
    fn execution_context(&self) -> Arc<dyn ExecutionContext>;
}

impl<T> Signal<T, Never>
where
    T: 'static + Send,
{
    /// Deliver each value to `closure`, run on `target`'s execution
    /// context. The signal's `Failure` is statically `Never`, so there is
    /// no error path to handle — this can never throw. The returned
    /// cancellation is also registered in `target`'s bag, so it tears
    /// down automatically with the target's own lifetime.
    pub fn bind<C, F>(&self, target: &C, closure: F) -> Cancellation
    where
        C: BindingTarget,
        F: FnMut(T) + Send + 'static,
    {
        let ctx = target.execution_context();
        let closure = Arc::new(Mutex::new(closure));
        let cancellation = self.observe(ClosureObserver::new(move |event| {
            if let Event::Next(value) = event {
                let closure = Arc::clone(&closure);
                ctx.schedule(Box::new(move || {
                    (closure.lock())(value);
                }));
            }
        }));
        target.cancellation_bag().add(cancellation.clone());
        cancellation
    }
}

impl<T> Signal<T, Never>
where
    T: 'static + Send,
{
    /// Rust has no key-path type, so the spec's key-path binding form
    /// collapses into this: bind directly into a field that is already
    /// shared as `Arc<Mutex<T>>` — the same shape `PropertySubject` uses
    /// internally for its current value — without writing out a setter
    /// closure by hand.
    pub fn bind_mutex<C>(&self, target: &C, cell: Arc<Mutex<T>>) -> Cancellation
    where
        C: BindingTarget,
    {
        self.bind(target, move |value| {
            *cell.lock() = value;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ImmediateContext;

    struct TestTarget {
        bag: CancellationBag,
        ctx: Arc<dyn ExecutionContext>,
    }

    impl TestTarget {
        fn new() -> Self {
            Self {
                bag: CancellationBag::new(),
                ctx: Arc::new(ImmediateContext::new()),
            }
        }
    }

    impl BindingTarget for TestTarget {
        fn cancellation_bag(&self) -> &CancellationBag {
            &self.bag
        }
        fn execution_context(&self) -> Arc<dyn ExecutionContext> {
            Arc::clone(&self.ctx)
        }
    }

    #[test]
    fn bind_delivers_values_on_targets_context() {
        let target = TestTarget::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        let _c = Signal::<i32, Never>::sequence([1, 2, 3]).bind(&target, move |v| {
            received2.lock().push(v);
        });
        assert_eq!(*received.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn bind_is_torn_down_with_targets_bag() {
        let target = TestTarget::new();
        let cell = Arc::new(Mutex::new(0));
        let _c = Signal::<i32, Never>::just(7).bind_mutex(&target, Arc::clone(&cell));
        assert_eq!(*cell.lock(), 7);
        target.bag.dispose();
    }
}
