//! Scheduling operators: moving subscription or delivery onto a chosen
//! execution context. Grounded in `seen_std::reactive::scheduler`'s
//! `Scheduler` trait, generalized from the teacher's "wrap the whole
//! subscribe call in schedule()" idiom.

use crate::cancellation::Cancellation;
use crate::context::ExecutionContext;
use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Defers the upstream subscription itself onto `ctx`, rather than
    /// running it synchronously on the calling thread. Disposing the
    /// returned cancellation before `ctx` has run the subscription
    /// prevents it from ever starting.
    pub fn subscribe_on(self, ctx: Arc<dyn ExecutionContext>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let cancelled = Arc::new(std::sync::atomic::AtomicBool::new(false));
            let inner: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let source = self.clone();
            let cancelled_for_job = Arc::clone(&cancelled);
            let inner_for_job = Arc::clone(&inner);
            ctx.schedule(Box::new(move || {
                if cancelled_for_job.load(std::sync::atomic::Ordering::SeqCst) {
                    return;
                }
                let cancellation = source.observe_boxed(observer);
                *inner_for_job.lock() = Some(cancellation);
            }));
            let ctx_for_teardown = Arc::clone(&ctx);
            Cancellation::new(move || {
                let cancelled = Arc::clone(&cancelled);
                let inner = Arc::clone(&inner);
                ctx_for_teardown.schedule(Box::new(move || {
                    cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
                    if let Some(c) = inner.lock().take() {
                        c.dispose();
                    }
                }));
            })
        })
    }

    /// Redelivers every event through `ctx`, so the downstream observer's
    /// `receive` calls run wherever `ctx` schedules them rather than on
    /// upstream's own calling thread.
    pub fn receive_on(self, ctx: Arc<dyn ExecutionContext>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let ctx = Arc::clone(&ctx);
            self.observe(ClosureObserver::new(move |event: Event<T, E>| {
                let observer = Arc::clone(&observer);
                ctx.schedule(Box::new(move || {
                    observer.lock().receive(event);
                }));
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ImmediateContext, MainLoopContext};
    use crate::error::Never;
    use parking_lot::Mutex as PMutex;

    #[test]
    fn subscribe_on_defers_subscription_to_the_context() {
        let main_loop = Arc::new(MainLoopContext::new());
        let ctx: Arc<dyn ExecutionContext> = main_loop.clone();
        let s = Signal::<i32, Never>::sequence([1, 2]).subscribe_on(ctx);

        let received = Arc::new(PMutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        let _c = s.observe_next(move |v| received2.lock().push(v));
        assert!(received.lock().is_empty());

        main_loop.drain();
        assert_eq!(*received.lock(), vec![1, 2]);
    }

    #[test]
    fn receive_on_redelivers_through_the_context() {
        let main_loop = Arc::new(MainLoopContext::new());
        let ctx: Arc<dyn ExecutionContext> = main_loop.clone();
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).receive_on(ctx);

        let received = Arc::new(PMutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        let _c = s.observe_next(move |v| received2.lock().push(v));
        assert!(received.lock().is_empty());

        main_loop.drain();
        assert_eq!(*received.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn receive_on_with_immediate_context_is_still_synchronous() {
        let ctx: Arc<dyn ExecutionContext> = Arc::new(ImmediateContext::new());
        let s = Signal::<i32, Never>::sequence([1, 2]).receive_on(ctx);
        let received = Arc::new(PMutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        let _c = s.observe_next(move |v| received2.lock().push(v));
        assert_eq!(*received.lock(), vec![1, 2]);
    }
}
