//! Combinators over two signals: each subscribes both sides and correlates
//! their events under a shared lock, so the two producers' events are
//! still delivered to the downstream observer one at a time (§5).
//! Grounded in `seen_std::reactive::observable::Observable::{merge, zip}`.

use crate::cancellation::Cancellation;
use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Emits `(latest_self, latest_other)` whenever either side produces a
    /// value, once both sides have produced at least one. Completes once
    /// both sides have completed; fails as soon as either side fails.
    pub fn combine_latest<U>(self, other: Signal<U, E>) -> Signal<(T, U), E>
    where
        T: Clone,
        U: 'static + Send + Clone,
    {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let latest_self: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
            let latest_other: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));
            let self_done = Arc::new(Mutex::new(false));
            let other_done = Arc::new(Mutex::new(false));
            let terminated = Arc::new(Mutex::new(false));
            let self_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let other_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));

            fn finish<T, E>(
                terminated: &Mutex<bool>,
                observer: &Mutex<crate::observer::BoxObserver<T, E>>,
                event: Event<T, E>,
            ) {
                let mut terminated = terminated.lock();
                if !*terminated {
                    *terminated = true;
                    observer.lock().receive(event);
                }
            }

            let c1 = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let latest_self = Arc::clone(&latest_self);
                let latest_other = Arc::clone(&latest_other);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let other_cancellation = Arc::clone(&other_cancellation);
                move |event| match event {
                    Event::Next(v) => {
                        *latest_self.lock() = Some(v.clone());
                        if let Some(u) = latest_other.lock().clone() {
                            if !*terminated.lock() {
                                observer.lock().receive(Event::Next((v, u)));
                            }
                        }
                    }
                    Event::Completed => {
                        *self_done.lock() = true;
                        if *other_done.lock() {
                            finish(&terminated, &observer, Event::Completed);
                        }
                    }
                    Event::Failed(e) => {
                        finish(&terminated, &observer, Event::Failed(e));
                        if let Some(c) = other_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *self_cancellation.lock() = Some(c1.clone());

            let c2 = other.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let latest_self = Arc::clone(&latest_self);
                let latest_other = Arc::clone(&latest_other);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let self_cancellation = Arc::clone(&self_cancellation);
                move |event| match event {
                    Event::Next(u) => {
                        *latest_other.lock() = Some(u.clone());
                        if let Some(v) = latest_self.lock().clone() {
                            if !*terminated.lock() {
                                observer.lock().receive(Event::Next((v, u)));
                            }
                        }
                    }
                    Event::Completed => {
                        *other_done.lock() = true;
                        if *self_done.lock() {
                            finish(&terminated, &observer, Event::Completed);
                        }
                    }
                    Event::Failed(e) => {
                        finish(&terminated, &observer, Event::Failed(e));
                        if let Some(c) = self_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *other_cancellation.lock() = Some(c2.clone());

            Cancellation::new(move || {
                c1.dispose();
                c2.dispose();
            })
        })
    }

    /// Emits pairwise `(self[i], other[i])`, buffering whichever side runs
    /// ahead. A side's completion only ends the zip once its own buffered
    /// surplus is exhausted — buffered values from a completed side can
    /// still be paired against values the other side has yet to produce.
    pub fn zip<U>(self, other: Signal<U, E>) -> Signal<(T, U), E>
    where
        U: 'static + Send,
    {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let self_buffer: Arc<Mutex<VecDeque<T>>> = Arc::new(Mutex::new(VecDeque::new()));
            let other_buffer: Arc<Mutex<VecDeque<U>>> = Arc::new(Mutex::new(VecDeque::new()));
            let self_done = Arc::new(Mutex::new(false));
            let other_done = Arc::new(Mutex::new(false));
            let terminated = Arc::new(Mutex::new(false));
            let self_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let other_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));

            fn finish<T, E>(
                terminated: &Mutex<bool>,
                observer: &Mutex<crate::observer::BoxObserver<T, E>>,
                event: Event<T, E>,
            ) {
                let mut terminated = terminated.lock();
                if !*terminated {
                    *terminated = true;
                    observer.lock().receive(event);
                }
            }

            // A side is exhausted once it is done and has no buffered
            // surplus left to offer the other side — no further pair can
            // ever be formed past that point.
            fn check_exhausted<T, U, E>(
                self_done: &Mutex<bool>,
                self_buffer: &Mutex<VecDeque<T>>,
                other_done: &Mutex<bool>,
                other_buffer: &Mutex<VecDeque<U>>,
                terminated: &Mutex<bool>,
                observer: &Mutex<crate::observer::BoxObserver<T, E>>,
            ) {
                let self_exhausted = *self_done.lock() && self_buffer.lock().is_empty();
                let other_exhausted = *other_done.lock() && other_buffer.lock().is_empty();
                if self_exhausted || other_exhausted {
                    finish(terminated, observer, Event::Completed);
                }
            }

            let c1 = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let self_buffer = Arc::clone(&self_buffer);
                let other_buffer = Arc::clone(&other_buffer);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let other_cancellation = Arc::clone(&other_cancellation);
                move |event| match event {
                    Event::Next(v) => {
                        if *terminated.lock() {
                            return;
                        }
                        if let Some(u) = other_buffer.lock().pop_front() {
                            observer.lock().receive(Event::Next((v, u)));
                            check_exhausted(&self_done, &self_buffer, &other_done, &other_buffer, &terminated, &observer);
                        } else {
                            self_buffer.lock().push_back(v);
                        }
                    }
                    Event::Completed => {
                        *self_done.lock() = true;
                        check_exhausted(&self_done, &self_buffer, &other_done, &other_buffer, &terminated, &observer);
                    }
                    Event::Failed(e) => {
                        finish(&terminated, &observer, Event::Failed(e));
                        if let Some(c) = other_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *self_cancellation.lock() = Some(c1.clone());

            let c2 = other.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let self_buffer = Arc::clone(&self_buffer);
                let other_buffer = Arc::clone(&other_buffer);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let self_cancellation = Arc::clone(&self_cancellation);
                move |event| match event {
                    Event::Next(u) => {
                        if *terminated.lock() {
                            return;
                        }
                        if let Some(v) = self_buffer.lock().pop_front() {
                            observer.lock().receive(Event::Next((v, u)));
                            check_exhausted(&self_done, &self_buffer, &other_done, &other_buffer, &terminated, &observer);
                        } else {
                            other_buffer.lock().push_back(u);
                        }
                    }
                    Event::Completed => {
                        *other_done.lock() = true;
                        check_exhausted(&self_done, &self_buffer, &other_done, &other_buffer, &terminated, &observer);
                    }
                    Event::Failed(e) => {
                        finish(&terminated, &observer, Event::Failed(e));
                        if let Some(c) = self_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *other_cancellation.lock() = Some(c2.clone());

            Cancellation::new(move || {
                c1.dispose();
                c2.dispose();
            })
        })
    }

    /// Interleaves both sides as events arrive; completes once both have
    /// completed, fails as soon as either fails.
    pub fn merge(self, other: Signal<T, E>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let self_done = Arc::new(Mutex::new(false));
            let other_done = Arc::new(Mutex::new(false));
            let terminated = Arc::new(Mutex::new(false));
            let self_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let other_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));

            let c1 = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let other_cancellation = Arc::clone(&other_cancellation);
                move |event| match event {
                    Event::Next(v) => {
                        if !*terminated.lock() {
                            observer.lock().receive(Event::Next(v));
                        }
                    }
                    Event::Completed => {
                        *self_done.lock() = true;
                        if *other_done.lock() {
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
                        if let Some(c) = other_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *self_cancellation.lock() = Some(c1.clone());

            let c2 = other.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let self_done = Arc::clone(&self_done);
                let other_done = Arc::clone(&other_done);
                let terminated = Arc::clone(&terminated);
                let self_cancellation = Arc::clone(&self_cancellation);
                move |event| match event {
                    Event::Next(v) => {
                        if !*terminated.lock() {
                            observer.lock().receive(Event::Next(v));
                        }
                    }
                    Event::Completed => {
                        *other_done.lock() = true;
                        if *self_done.lock() {
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
                        if let Some(c) = self_cancellation.lock().take() {
                            c.dispose();
                        }
                    }
                }
            }));
            *other_cancellation.lock() = Some(c2.clone());

            Cancellation::new(move || {
                c1.dispose();
                c2.dispose();
            })
        })
    }

    /// Subscribes to both sides; whichever produces its first event wins,
    /// and the other side is disposed immediately.
    pub fn amb(self, other: Signal<T, E>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let winner: Arc<Mutex<Option<u8>>> = Arc::new(Mutex::new(None));
            let other_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let self_cancellation: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));

            let c1 = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let winner = Arc::clone(&winner);
                let other_cancellation = Arc::clone(&other_cancellation);
                move |event| {
                    let mut winner = winner.lock();
                    match *winner {
                        None => {
                            *winner = Some(1);
                            drop(winner);
                            if let Some(c) = other_cancellation.lock().take() {
                                c.dispose();
                            }
                            observer.lock().receive(event);
                        }
                        Some(1) => observer.lock().receive(event),
                        _ => {}
                    }
                }
            }));
            *self_cancellation.lock() = Some(c1.clone());

            let c2 = other.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let winner = Arc::clone(&winner);
                let self_cancellation = Arc::clone(&self_cancellation);
                move |event| {
                    let mut winner = winner.lock();
                    match *winner {
                        None => {
                            *winner = Some(2);
                            drop(winner);
                            if let Some(c) = self_cancellation.lock().take() {
                                c.dispose();
                            }
                            observer.lock().receive(event);
                        }
                        Some(2) => observer.lock().receive(event),
                        _ => {}
                    }
                }
            }));
            *other_cancellation.lock() = Some(c2.clone());

            Cancellation::new(move || {
                c1.dispose();
                c2.dispose();
            })
        })
    }

    /// Emits `(self_value, latest_other)` each time `self` produces a
    /// value, provided `other` has produced at least one value by then;
    /// `other`'s completion and failure are ignored, only its values
    /// matter.
    pub fn with_latest_from<U>(self, other: Signal<U, E>) -> Signal<(T, U), E>
    where
        U: 'static + Send + Clone,
    {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let latest_other: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));

            let c2 = other.observe(ClosureObserver::new({
                let latest_other = Arc::clone(&latest_other);
                move |event| {
                    if let Event::Next(u) = event {
                        *latest_other.lock() = Some(u);
                    }
                }
            }));

            let c1 = self.observe(ClosureObserver::new({
                let observer = Arc::clone(&observer);
                let latest_other = Arc::clone(&latest_other);
                let c2_for_failure = c2.clone();
                move |event| match event {
                    Event::Next(v) => {
                        if let Some(u) = latest_other.lock().clone() {
                            observer.lock().receive(Event::Next((v, u)));
                        }
                    }
                    Event::Completed => observer.lock().receive(Event::Completed),
                    Event::Failed(e) => {
                        observer.lock().receive(Event::Failed(e));
                        c2_for_failure.dispose();
                    }
                }
            }));

            Cancellation::new(move || {
                c1.dispose();
                c2.dispose();
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
    fn zip_pairs_values_positionally() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).zip(Signal::sequence(["a", "b", "c"]));
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next((1, "a")),
                Event::Next((2, "b")),
                Event::Next((3, "c")),
                Event::Completed
            ]
        );
    }

    #[test]
    fn merge_interleaves_both_sources_synchronously() {
        let s = Signal::<i32, Never>::sequence([1, 2]).merge(Signal::sequence([3, 4]));
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next(1),
                Event::Next(2),
                Event::Next(3),
                Event::Next(4),
                Event::Completed
            ]
        );
    }

    #[test]
    fn combine_latest_waits_for_both_sides() {
        let s = Signal::<i32, Never>::just(1).combine_latest(Signal::just("x"));
        assert_eq!(collect_events(&s), vec![Event::Next((1, "x")), Event::Completed]);
    }

    #[test]
    fn amb_takes_the_first_side_to_emit() {
        let s = Signal::<i32, Never>::sequence([1, 2]).amb(Signal::sequence([9, 9]));
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(1), Event::Next(2), Event::Completed]
        );
    }

    #[test]
    fn with_latest_from_pairs_each_self_value_with_latest_other() {
        let s = Signal::<i32, Never>::just(1).with_latest_from(Signal::just("x"));
        assert_eq!(collect_events(&s), vec![Event::Next((1, "x")), Event::Completed]);
    }
}
