//! Timing and control operators: arming timers, gating delivery, and
//! re-subscribing on failure. Grounded in
//! `seen_std::reactive::operators::{TapObserver, RetryObserver}` and
//! `scheduler.rs`'s cancellable-timer idiom; `retry`/`catch_error` here
//! replace the teacher's versions, which drop the recovery signal and
//! forward the original error instead of re-subscribing.

use crate::cancellation::Cancellation;
use crate::context::ExecutionContext;
use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Arms a timer of length `after` on subscription and resets it on
    /// every `next`; if the timer fires before a terminal event, forwards
    /// `failed(with)` and tears down upstream. Cancellation disarms the
    /// timer.
    pub fn timeout(self, after: Duration, with: E, ctx: Arc<dyn ExecutionContext>) -> Signal<T, E>
    where
        E: Clone,
    {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let terminated = Arc::new(Mutex::new(false));
            let timer: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));

            fn arm<T, E>(
                ctx: &Arc<dyn ExecutionContext>,
                after: Duration,
                with: E,
                observer: &Arc<Mutex<crate::observer::BoxObserver<T, E>>>,
                terminated: &Arc<Mutex<bool>>,
                timer: &Arc<Mutex<Option<Cancellation>>>,
            ) where
                T: 'static + Send,
                E: 'static + Send + Clone,
            {
                let observer = Arc::clone(observer);
                let terminated = Arc::clone(terminated);
                let with = with.clone();
                let fired = ctx.schedule_after(
                    after,
                    Box::new(move || {
                        let mut terminated = terminated.lock();
                        if !*terminated {
                            *terminated = true;
                            observer.lock().receive(Event::Failed(with));
                        }
                    }),
                );
                if let Some(old) = timer.lock().replace(fired) {
                    old.dispose();
                }
            }

            arm(&ctx, after, with.clone(), &observer, &terminated, &timer);

            let upstream = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let terminated = Arc::clone(&terminated);
                let timer = Arc::clone(&timer);
                let ctx = Arc::clone(&ctx);
                let with = with.clone();
                move |event| {
                    if *terminated.lock() {
                        return;
                    }
                    match event {
                        Event::Next(v) => {
                            arm(&ctx, after, with.clone(), &observer, &terminated, &timer);
                            observer.lock().receive(Event::Next(v));
                        }
                        terminal => {
                            let mut terminated = terminated.lock();
                            if !*terminated {
                                *terminated = true;
                                if let Some(t) = timer.lock().take() {
                                    t.dispose();
                                }
                                observer.lock().receive(terminal);
                            }
                        }
                    }
                }
            }));

            Cancellation::new(move || {
                upstream.dispose();
                if let Some(t) = timer.lock().take() {
                    t.dispose();
                }
            })
        })
    }

    /// Gates delivery of `next` events by the latest boolean produced by
    /// `control`: while paused (control's latest value is `false`),
    /// upstream values are dropped, not buffered. Terminal events always
    /// pass through regardless of pause state.
    pub fn pausable(self, control: Signal<bool, E>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let paused = Arc::new(Mutex::new(true));

            let c_control = control.observe(ClosureObserver::new({
                let paused = Arc::clone(&paused);
                move |event| {
                    if let Event::Next(value) = event {
                        *paused.lock() = !value;
                    }
                }
            }));

            let c_source = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let paused = Arc::clone(&paused);
                move |event| match event {
                    Event::Next(v) => {
                        if !*paused.lock() {
                            observer.lock().receive(Event::Next(v));
                        }
                    }
                    other => observer.lock().receive(other),
                }
            }));

            Cancellation::new(move || {
                c_source.dispose();
                c_control.dispose();
            })
        })
    }

    /// On upstream failure, re-subscribes up to `n` more times (so `n + 1`
    /// attempts total, counting the initial one), then forwards the final
    /// failure. A successful attempt's values are forwarded as they occur.
    pub fn retry(self, n: u32) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let remaining = Arc::new(AtomicU32::new(n));
            let active: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let source = self.clone();

            struct Attempt<T, E> {
                source: Signal<T, E>,
                observer: Arc<Mutex<crate::observer::BoxObserver<T, E>>>,
                remaining: Arc<AtomicU32>,
                active: Arc<Mutex<Option<Cancellation>>>,
            }

            impl<T: 'static + Send, E: 'static + Send> Attempt<T, E> {
                fn run(self: &Arc<Self>) {
                    let attempt = Arc::clone(self);
                    let cancellation = self.source.observe(ClosureObserver::new(move |event| match event {
                        Event::Next(v) => attempt.observer.lock().receive(Event::Next(v)),
                        Event::Completed => attempt.observer.lock().receive(Event::Completed),
                        Event::Failed(e) => {
                            if attempt.remaining.load(Ordering::SeqCst) > 0 {
                                attempt.remaining.fetch_sub(1, Ordering::SeqCst);
                                log::debug!("retrying after failure, attempts remaining");
                                attempt.run();
                            } else {
                                attempt.observer.lock().receive(Event::Failed(e));
                            }
                        }
                    }));
                    *self.active.lock() = Some(cancellation);
                }
            }

            let attempt = Arc::new(Attempt {
                source,
                observer,
                remaining,
                active: Arc::clone(&active),
            });
            attempt.run();

            Cancellation::new(move || {
                if let Some(c) = active.lock().take() {
                    c.dispose();
                }
            })
        })
    }

    /// Runs the corresponding optional side effect at each lifecycle
    /// point, then forwards the event unchanged. `receive_cancel` runs iff
    /// the subscription is torn down before a terminal event was observed.
    pub fn handle_events(
        self,
        receive_subscription: Option<Box<dyn Fn() + Send + Sync>>,
        receive_output: Option<Box<dyn Fn(&T) + Send + Sync>>,
        receive_completion: Option<Box<dyn Fn(&Event<T, E>) + Send + Sync>>,
        receive_cancel: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Signal<T, E> {
        let receive_subscription = Arc::new(receive_subscription);
        let receive_output = Arc::new(receive_output);
        let receive_completion = Arc::new(receive_completion);
        let receive_cancel = Arc::new(receive_cancel);
        Signal::new(move |mut observer| {
            if let Some(f) = receive_subscription.as_ref() {
                f();
            }
            let reached_terminal = Arc::new(Mutex::new(false));
            let receive_output = Arc::clone(&receive_output);
            let receive_completion = Arc::clone(&receive_completion);
            let reached_terminal_for_events = Arc::clone(&reached_terminal);
            let inner = self.observe(ClosureObserver::new(move |event| {
                if let Event::Next(ref v) = event {
                    if let Some(f) = receive_output.as_ref() {
                        f(v);
                    }
                } else {
                    *reached_terminal_for_events.lock() = true;
                    if let Some(f) = receive_completion.as_ref() {
                        f(&event);
                    }
                }
                observer.receive(event);
            }));
            let receive_cancel = Arc::clone(&receive_cancel);
            Cancellation::new(move || {
                inner.dispose();
                if !*reached_terminal.lock() {
                    if let Some(f) = receive_cancel.as_ref() {
                        f();
                    }
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ImmediateContext, VirtualTimeContext};
    use crate::error::Never;
    use parking_lot::Mutex as PMutex;

    fn collect_events<T: 'static + Send + Clone, E: 'static + Send + Clone>(
        signal: &Signal<T, E>,
    ) -> Vec<Event<T, E>> {
        let received = Arc::new(PMutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        signal.observe(ClosureObserver::new(move |e| received2.lock().push(e)));
        Arc::try_unwrap(received).unwrap().into_inner()
    }

    #[test]
    fn timeout_passes_through_when_upstream_finishes_in_time() {
        let ctx: Arc<dyn ExecutionContext> = Arc::new(ImmediateContext::new());
        let s = Signal::<i32, &'static str>::sequence([1, 2]).timeout(Duration::from_secs(5), "late", ctx);
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(1), Event::Next(2), Event::Completed]
        );
    }

    #[test]
    fn timeout_fires_when_timer_elapses_before_terminal() {
        let virtual_ctx = Arc::new(VirtualTimeContext::new());
        let ctx: Arc<dyn ExecutionContext> = virtual_ctx.clone();
        let never: Signal<i32, &'static str> = Signal::never();
        let s = never.timeout(Duration::from_secs(1), "late", ctx);
        let events = Arc::new(PMutex::new(Vec::new()));
        let events2 = Arc::clone(&events);
        let _c = s.observe(ClosureObserver::new(move |e| events2.lock().push(e)));
        virtual_ctx.advance_time(Duration::from_secs(1));
        assert_eq!(*events.lock(), vec![Event::Failed("late")]);
    }

    #[test]
    fn retry_resubscribes_up_to_n_times_then_forwards_failure() {
        let attempts = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let attempts_for_source = Arc::clone(&attempts);
        let source: Signal<i32, &'static str> = Signal::new(move |mut observer| {
            attempts_for_source.fetch_add(1, Ordering::SeqCst);
            observer.receive(Event::Failed("boom"));
            Cancellation::non_disposable()
        });
        let s = source.retry(3);
        assert_eq!(collect_events(&s), vec![Event::Failed("boom")]);
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn pausable_drops_values_while_paused() {
        use crate::subject::PassthroughSubject;

        let control: PassthroughSubject<bool, Never> = PassthroughSubject::new();
        let source: PassthroughSubject<i32, Never> = PassthroughSubject::new();
        let gated = source.as_signal().pausable(control.as_signal());

        let received = Arc::new(PMutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        let _c = gated.observe_next(move |v| received2.lock().push(v));

        source.emit_next(1); // paused by default until control says otherwise
        control.emit_next(true);
        source.emit_next(2);
        control.emit_next(false);
        source.emit_next(3);
        control.emit_next(true);
        source.emit_next(4);

        assert_eq!(*received.lock(), vec![2, 4]);
    }

    #[test]
    fn handle_events_runs_lifecycle_hooks() {
        let started = Arc::new(PMutex::new(false));
        let outputs = Arc::new(PMutex::new(Vec::new()));
        let completed = Arc::new(PMutex::new(false));

        let started2 = Arc::clone(&started);
        let outputs2 = Arc::clone(&outputs);
        let completed2 = Arc::clone(&completed);

        let s = Signal::<i32, Never>::sequence([1, 2]).handle_events(
            Some(Box::new(move || *started2.lock() = true)),
            Some(Box::new(move |v: &i32| outputs2.lock().push(*v))),
            Some(Box::new(move |_event: &Event<i32, Never>| *completed2.lock() = true)),
            None,
        );

        assert_eq!(collect_events(&s), vec![Event::Next(1), Event::Next(2), Event::Completed]);
        assert!(*started.lock());
        assert_eq!(*outputs.lock(), vec![1, 2]);
        assert!(*completed.lock());
    }
}
