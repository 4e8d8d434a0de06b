//! Higher-order operators: the upstream signal produces further signals,
//! which this family flattens into a single stream of values. No teacher
//! equivalent — `seen_std::reactive::operators::FlatMapObserver` is an
//! acknowledged stub that drops every inner signal on the floor — so these
//! are built fresh from the shape of `combine.rs`'s multi-upstream
//! bookkeeping (a shared lock, a termination latch) generalized to an
//! unbounded, dynamically-growing set of inner subscriptions.

use crate::cancellation::{Cancellation, CancellationBag};
use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Maps each upstream value to an inner signal and merges all inner
    /// signals' values concurrently. Completes once upstream and every
    /// inner signal it produced have completed. Fails as soon as any side
    /// fails.
    pub fn flat_map_merge<U, F>(self, f: F) -> Signal<U, E>
    where
        U: 'static + Send,
        F: Fn(T) -> Signal<U, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let f = Arc::clone(&f);
            let bag = CancellationBag::new();
            let outstanding = Arc::new(AtomicUsize::new(1)); // upstream counts as one
            let terminated = Arc::new(Mutex::new(false));

            fn maybe_finish<T, E>(
                outstanding: &AtomicUsize,
                terminated: &Mutex<bool>,
                observer: &Mutex<crate::observer::BoxObserver<T, E>>,
            ) {
                if outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let mut terminated = terminated.lock();
                    if !*terminated {
                        *terminated = true;
                        observer.lock().receive(Event::Completed);
                    }
                }
            }

            let fail = {
                let observer = Arc::clone(&observer);
                let terminated = Arc::clone(&terminated);
                let bag = bag.clone();
                move |e: E| {
                    let mut terminated = terminated.lock();
                    if !*terminated {
                        *terminated = true;
                        observer.lock().receive(Event::Failed(e));
                    }
                    drop(terminated);
                    bag.dispose();
                }
            };

            let fail_for_upstream = fail.clone();
            let upstream = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let outstanding = Arc::clone(&outstanding);
                let terminated = Arc::clone(&terminated);
                let bag = bag.clone();
                let fail = fail.clone();
                move |event| match event {
                    Event::Next(v) => {
                        let inner = f(v);
                        outstanding.fetch_add(1, Ordering::SeqCst);
                        let observer = Arc::clone(&observer);
                        let outstanding = Arc::clone(&outstanding);
                        let terminated = Arc::clone(&terminated);
                        let fail = fail.clone();
                        let cancellation = inner.observe(ClosureObserver::new(move |event| match event {
                            Event::Next(v) => {
                                if !*terminated.lock() {
                                    observer.lock().receive(Event::Next(v));
                                }
                            }
                            Event::Completed => maybe_finish(&outstanding, &terminated, &observer),
                            Event::Failed(e) => fail(e),
                        }));
                        bag.add(cancellation);
                    }
                    Event::Completed => maybe_finish(&outstanding, &terminated, &observer),
                    Event::Failed(e) => fail_for_upstream(e),
                }
            }));
            bag.add(upstream);

            Cancellation::new(move || bag.dispose())
        })
    }

    /// Maps each upstream value to an inner signal, subscribing to only the
    /// most recent one — switching tears down the previous inner
    /// subscription immediately. Completes once upstream and the current
    /// inner signal have both completed.
    pub fn flat_map_latest<U, F>(self, f: F) -> Signal<U, E>
    where
        U: 'static + Send,
        F: Fn(T) -> Signal<U, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let f = Arc::clone(&f);
            let current_inner: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let upstream_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let upstream_done = Arc::new(Mutex::new(false));
            let inner_done = Arc::new(Mutex::new(true));
            let terminated = Arc::new(Mutex::new(false));
            let generation = Arc::new(AtomicUsize::new(0));

            let upstream = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let current_inner = Arc::clone(&current_inner);
                let upstream_cancellation = Arc::clone(&upstream_cancellation);
                let upstream_done = Arc::clone(&upstream_done);
                let inner_done = Arc::clone(&inner_done);
                let terminated = Arc::clone(&terminated);
                let generation = Arc::clone(&generation);
                move |event| match event {
                    Event::Next(v) => {
                        if let Some(old) = current_inner.lock().take() {
                            old.dispose();
                        }
                        let my_generation = generation.fetch_add(1, Ordering::SeqCst) + 1;
                        *inner_done.lock() = false;
                        let inner = f(v);
                        let observer = Arc::clone(&observer);
                        let upstream_cancellation = Arc::clone(&upstream_cancellation);
                        let upstream_done = Arc::clone(&upstream_done);
                        let inner_done = Arc::clone(&inner_done);
                        let terminated = Arc::clone(&terminated);
                        let generation = Arc::clone(&generation);
                        let cancellation = inner.observe(ClosureObserver::new(move |event| {
                            if generation.load(Ordering::SeqCst) != my_generation {
                                return;
                            }
                            match event {
                                Event::Next(v) => {
                                    if !*terminated.lock() {
                                        observer.lock().receive(Event::Next(v));
                                    }
                                }
                                Event::Completed => {
                                    *inner_done.lock() = true;
                                    if *upstream_done.lock() {
                                        let mut terminated = terminated.lock();
                                        if !*terminated {
                                            *terminated = true;
                                            observer.lock().receive(Event::Completed);
                                        }
                                    }
                                }
                                Event::Failed(e) => {
                                    let mut terminated = terminated.lock();
                                    if !*terminated {
                                        *terminated = true;
                                        observer.lock().receive(Event::Failed(e));
                                    }
                                    drop(terminated);
                                    if let Some(c) = upstream_cancellation.lock().take() {
                                        c.dispose();
                                    }
                                }
                            }
                        }));
                        *current_inner.lock() = Some(cancellation);
                    }
                    Event::Completed => {
                        *upstream_done.lock() = true;
                        if *inner_done.lock() {
                            let mut terminated = terminated.lock();
                            if !*terminated {
                                *terminated = true;
                                observer.lock().receive(Event::Completed);
                            }
                        }
                    }
                    Event::Failed(e) => {
                        let mut terminated = terminated.lock();
                        if !*terminated {
                            *terminated = true;
                            observer.lock().receive(Event::Failed(e));
                        }
                        drop(terminated);
                        if let Some(c) = current_inner.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *upstream_cancellation.lock() = Some(upstream.clone());

            Cancellation::new(move || {
                upstream.dispose();
                if let Some(c) = current_inner.lock().take() {
                    c.dispose();
                }
            })
        })
    }

    /// Maps each upstream value to an inner signal, running them strictly
    /// one at a time in the order upstream produced them.
    pub fn flat_map_concat<U, F>(self, f: F) -> Signal<U, E>
    where
        U: 'static + Send,
        F: Fn(T) -> Signal<U, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let f = Arc::clone(&f);
            let queue: Arc<Mutex<VecDeque<Signal<U, E>>>> = Arc::new(Mutex::new(VecDeque::new()));
            let active: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let upstream_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let upstream_done = Arc::new(Mutex::new(false));
            let terminated = Arc::new(Mutex::new(false));

            struct Runner<U, E> {
                observer: Arc<Mutex<crate::observer::BoxObserver<U, E>>>,
                queue: Arc<Mutex<VecDeque<Signal<U, E>>>>,
                active: Arc<Mutex<Option<Cancellation>>>,
                upstream_cancellation: Arc<Mutex<Option<Cancellation>>>,
                upstream_done: Arc<Mutex<bool>>,
                terminated: Arc<Mutex<bool>>,
            }

            impl<U: 'static + Send, E: 'static + Send> Runner<U, E> {
                fn finish_if_done(&self) {
                    if *self.upstream_done.lock() && self.queue.lock().is_empty() {
                        let mut terminated = self.terminated.lock();
                        if !*terminated {
                            *terminated = true;
                            self.observer.lock().receive(Event::Completed);
                        }
                    }
                }

                fn run_next(self: &Arc<Self>) {
                    let next = self.queue.lock().pop_front();
                    let Some(next) = next else {
                        self.finish_if_done();
                        return;
                    };
                    let runner = Arc::clone(self);
                    let cancellation = next.observe(ClosureObserver::new(move |event| match event {
                        Event::Next(v) => {
                            if !*runner.terminated.lock() {
                                runner.observer.lock().receive(Event::Next(v));
                            }
                        }
                        Event::Completed => runner.run_next(),
                        Event::Failed(e) => {
                            let mut terminated = runner.terminated.lock();
                            if !*terminated {
                                *terminated = true;
                                runner.observer.lock().receive(Event::Failed(e));
                            }
                            drop(terminated);
                            if let Some(c) = runner.upstream_cancellation.lock().take() {
                                c.dispose();
                            }
                        }
                    }));
                    *self.active.lock() = Some(cancellation);
                }
            }

            let runner = Arc::new(Runner {
                observer: Arc::clone(&observer),
                queue: Arc::clone(&queue),
                active: Arc::clone(&active),
                upstream_cancellation: Arc::clone(&upstream_cancellation),
                upstream_done: Arc::clone(&upstream_done),
                terminated: Arc::clone(&terminated),
            });

            let upstream = self.observe(ClosureObserver::new({
                let queue = Arc::clone(&queue);
                let upstream_done = Arc::clone(&upstream_done);
                let active = Arc::clone(&active);
                let runner = Arc::clone(&runner);
                move |event| match event {
                    Event::Next(v) => {
                        queue.lock().push_back(f(v));
                        if active.lock().is_none() {
                            runner.run_next();
                        }
                    }
                    Event::Completed => {
                        *upstream_done.lock() = true;
                        if active.lock().is_none() {
                            runner.finish_if_done();
                        }
                    }
                    Event::Failed(e) => {
                        let mut terminated = runner.terminated.lock();
                        if !*terminated {
                            *terminated = true;
                            runner.observer.lock().receive(Event::Failed(e));
                        }
                        drop(terminated);
                        if let Some(c) = active.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *upstream_cancellation.lock() = Some(upstream.clone());

            Cancellation::new(move || {
                upstream.dispose();
                if let Some(c) = active.lock().take() {
                    c.dispose();
                }
            })
        })
    }
}

impl<T, E> Signal<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send,
{
    /// Recovers from a failure by mapping the error to a replacement
    /// signal and switching to it; upstream values are forwarded as-is
    /// until (and unless) a failure occurs.
    pub fn flat_map_error<F>(self, f: F) -> Signal<T, E>
    where
        F: Fn(E) -> Signal<T, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let f = Arc::clone(&f);
            let recovery: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let recovery_for_closure = Arc::clone(&recovery);
            let observer_for_closure = Arc::clone(&observer);
            let upstream = self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => observer_for_closure.lock().receive(Event::Next(v)),
                Event::Completed => observer_for_closure.lock().receive(Event::Completed),
                Event::Failed(e) => {
                    let replacement = f(e);
                    let observer = Arc::clone(&observer_for_closure);
                    let cancellation = replacement.observe(ClosureObserver::new(move |event| {
                        observer.lock().receive(event);
                    }));
                    *recovery_for_closure.lock() = Some(cancellation);
                }
            }));
            Cancellation::new(move || {
                upstream.dispose();
                if let Some(c) = recovery.lock().take() {
                    c.dispose();
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn flat_map_merge_flattens_inner_signals() {
        let s = Signal::<i32, Never>::sequence([1, 2]).flat_map_merge(|x| Signal::sequence([x, x * 10]));
        let mut values: Vec<i32> = collect_events(&s)
            .into_iter()
            .filter_map(|e| e.as_next().copied())
            .collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 10, 20]);
    }

    #[test]
    fn flat_map_concat_preserves_order_across_inner_signals() {
        let s = Signal::<i32, Never>::sequence([1, 2]).flat_map_concat(|x| Signal::sequence([x, x * 10]));
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next(1),
                Event::Next(10),
                Event::Next(2),
                Event::Next(20),
                Event::Completed
            ]
        );
    }

    #[test]
    fn flat_map_latest_switches_away_from_prior_inner_signal() {
        let s = Signal::<i32, Never>::sequence([1, 2]).flat_map_latest(|x| Signal::just(x));
        assert_eq!(collect_events(&s), vec![Event::Next(1), Event::Next(2), Event::Completed]);
    }

    #[test]
    fn flat_map_error_recovers_with_a_replacement_signal() {
        let s: Signal<i32, &'static str> =
            Signal::failed("boom").flat_map_error(|_| Signal::sequence([1, 2]));
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(1), Event::Next(2), Event::Completed]
        );
    }
}
