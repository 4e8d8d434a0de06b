//! Injecting values into a sequence: values from outside upstream's own
//! production, spliced in at a fixed position.
//! Grounded in `seen_std::reactive::observable::Observable::concat`.

use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Emits `value` first, then forwards upstream unchanged.
    pub fn prepend(self, value: T) -> Signal<T, E>
    where
        T: Clone,
    {
        Signal::new(move |mut observer| {
            observer.receive(Event::Next(value.clone()));
            self.observe(ClosureObserver::new(move |event| observer.receive(event)))
        })
    }

    /// Forwards upstream; once it completes, subscribes to `other` and
    /// forwards that in turn. A failure from either side is forwarded
    /// immediately without starting `other`.
    pub fn append(self, other: Signal<T, E>) -> Signal<T, E> {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let other = other.clone();
            let observer_for_first = Arc::clone(&observer);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Completed => {
                    other.observe_boxed(Box::new(ClosureObserver::new({
                        let observer = Arc::clone(&observer_for_first);
                        move |event| observer.lock().receive(event)
                    })));
                }
                other_event => observer_for_first.lock().receive(other_event),
            }))
        })
    }

    /// If upstream completes without ever emitting a value, emits `value`
    /// before completing; otherwise forwards upstream unchanged.
    pub fn replace_empty(self, value: T) -> Signal<T, E>
    where
        T: Clone,
    {
        Signal::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let produced = Arc::new(std::sync::atomic::AtomicBool::new(false));
            let value = value.clone();
            let produced_for_closure = Arc::clone(&produced);
            let observer_for_closure = Arc::clone(&observer);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    produced_for_closure.store(true, std::sync::atomic::Ordering::SeqCst);
                    observer_for_closure.lock().receive(Event::Next(v));
                }
                Event::Completed => {
                    if !produced_for_closure.load(std::sync::atomic::Ordering::SeqCst) {
                        observer_for_closure.lock().receive(Event::Next(value.clone()));
                    }
                    observer_for_closure.lock().receive(Event::Completed);
                }
                Event::Failed(e) => observer_for_closure.lock().receive(Event::Failed(e)),
            }))
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
    fn prepend_emits_value_before_upstream() {
        let s = Signal::<i32, Never>::sequence([2, 3]).prepend(1);
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(1), Event::Next(2), Event::Next(3), Event::Completed]
        );
    }

    #[test]
    fn append_chains_second_signal_after_first_completes() {
        let s = Signal::<i32, Never>::sequence([1, 2]).append(Signal::sequence([3, 4]));
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
    fn append_skips_second_signal_on_failure() {
        let s: Signal<i32, &'static str> = Signal::failed("boom").append(Signal::sequence([9]));
        assert_eq!(collect_events(&s), vec![Event::Failed("boom")]);
    }

    #[test]
    fn replace_empty_substitutes_value_when_upstream_produces_nothing() {
        let s = Signal::<i32, Never>::completed().replace_empty(42);
        assert_eq!(collect_events(&s), vec![Event::Next(42), Event::Completed]);
    }

    #[test]
    fn replace_empty_leaves_nonempty_upstream_alone() {
        let s = Signal::<i32, Never>::sequence([1]).replace_empty(42);
        assert_eq!(collect_events(&s), vec![Event::Next(1), Event::Completed]);
    }
}
