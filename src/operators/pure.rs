//! Pure transformers: stateless per event, preserve termination.
//! Grounded in `seen_std::reactive::operators::{MapObserver, FilterObserver}`.

use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Emits `f(x)` for each upstream `next(x)`; passes terminals through.
    pub fn map<U, F>(self, f: F) -> Signal<U, E>
    where
        U: 'static + Send,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |mut observer| {
            let f = Arc::clone(&f);
            self.observe(ClosureObserver::new(move |event| {
                observer.receive(event.map(|v| f(v)));
            }))
        })
    }

    /// Emits `x` iff `predicate(&x)`.
    pub fn filter<F>(self, predicate: F) -> Signal<T, E>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let predicate = Arc::new(predicate);
        Signal::new(move |mut observer| {
            let predicate = Arc::clone(&predicate);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    if predicate(&v) {
                        observer.receive(Event::Next(v));
                    }
                }
                other => observer.receive(other),
            }))
        })
    }

    /// Swallows all `next` events; passes terminals through.
    pub fn ignore_output(self) -> Signal<T, E> {
        Signal::new(move |mut observer| {
            self.observe(ClosureObserver::new(move |event| {
                if event.is_terminal() {
                    observer.receive(event);
                }
            }))
        })
    }

    /// Replaces `failed(_)` with `completed`. `log` optionally emits a
    /// `log::warn!` side effect with the suppressed error's `Debug` form,
    /// the logging sink named in spec.md §6.
    pub fn suppress_error(self, log: bool) -> Signal<T, crate::error::Never>
    where
        E: std::fmt::Debug,
    {
        Signal::new(move |mut observer| {
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => observer.receive(Event::Next(v)),
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => {
                    if log {
                        log::warn!("suppressed error: {:?}", e);
                    }
                    observer.receive(Event::Completed);
                }
            }))
        })
    }

    /// Replaces `failed(_)` with `next(v); completed`.
    pub fn replace_error(self, value: T) -> Signal<T, crate::error::Never>
    where
        T: Clone,
    {
        Signal::new(move |mut observer| {
            let value = value.clone();
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => observer.receive(Event::Next(v)),
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(_) => {
                    observer.receive(Event::Next(value.clone()));
                    observer.receive(Event::Completed);
                }
            }))
        })
    }
}

impl<U, E> Signal<Option<U>, E>
where
    U: 'static + Send,
    E: 'static + Send,
{
    /// For optional element types, emits only non-empty values.
    pub fn ignore_nils(self) -> Signal<U, E> {
        Signal::new(move |mut observer| {
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(Some(v)) => observer.receive(Event::Next(v)),
                Event::Next(None) => {}
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Substitutes `default` for each empty upstream value.
    pub fn replace_nils(self, default: U) -> Signal<U, E>
    where
        U: Clone,
    {
        Signal::new(move |mut observer| {
            let default = default.clone();
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(Some(v)) => observer.receive(Event::Next(v)),
                Event::Next(None) => observer.receive(Event::Next(default.clone())),
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Never;

    fn collect<T: 'static + Send + Clone, E: 'static + Send + Clone>(
        signal: &Signal<T, E>,
    ) -> Vec<Event<T, E>> {
        let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let received2 = Arc::clone(&received);
        signal.observe(ClosureObserver::new(move |e| received2.lock().push(e)));
        Arc::try_unwrap(received).unwrap().into_inner()
    }

    #[test]
    fn map_transforms_values() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).map(|x| x * 2);
        assert_eq!(
            collect(&s),
            vec![Event::Next(2), Event::Next(4), Event::Next(6), Event::Completed]
        );
    }

    #[test]
    fn filter_keeps_matching_values() {
        let s = Signal::<i32, Never>::sequence(0..10).filter(|x| x % 2 == 0);
        assert_eq!(
            collect(&s),
            vec![
                Event::Next(0),
                Event::Next(2),
                Event::Next(4),
                Event::Next(6),
                Event::Next(8),
                Event::Completed
            ]
        );
    }

    #[test]
    fn ignore_output_drops_all_next() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).ignore_output();
        assert_eq!(collect(&s), vec![Event::Completed]);
    }

    #[test]
    fn suppress_error_replaces_failure_with_completion() {
        let s = Signal::<i32, &'static str>::failed("boom").suppress_error(false);
        assert_eq!(collect(&s), vec![Event::Completed]);
    }

    #[test]
    fn replace_error_emits_fallback_then_completes() {
        let s = Signal::<i32, &'static str>::failed("boom").replace_error(-1);
        assert_eq!(collect(&s), vec![Event::Next(-1), Event::Completed]);
    }

    #[test]
    fn ignore_nils_drops_none() {
        let s: Signal<Option<i32>, Never> = Signal::sequence([Some(1), None, Some(2)]);
        assert_eq!(
            collect(&s.ignore_nils()),
            vec![Event::Next(1), Event::Next(2), Event::Completed]
        );
    }

    #[test]
    fn replace_nils_substitutes_default() {
        let s: Signal<Option<i32>, Never> = Signal::sequence([Some(1), None, Some(2)]);
        assert_eq!(
            collect(&s.replace_nils(0)),
            vec![Event::Next(1), Event::Next(0), Event::Next(2), Event::Completed]
        );
    }
}
