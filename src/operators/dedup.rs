//! Deduplication: suppress a value equal to its immediate predecessor.
//! Grounded in `seen_std::reactive::operators` pairwise-comparison idiom
//! shared with `ScanObserver`.

use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Suppresses a value when `eq(previous, current)` holds; the first
    /// value is always forwarded since it has no predecessor.
    pub fn remove_duplicates_by<F>(self, eq: F) -> Signal<T, E>
    where
        T: Clone,
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let eq = Arc::new(eq);
        Signal::new(move |mut observer| {
            let previous: Mutex<Option<T>> = Mutex::new(None);
            let eq = Arc::clone(&eq);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut guard = previous.lock();
                    let is_duplicate = guard.as_ref().is_some_and(|prev| eq(prev, &v));
                    if !is_duplicate {
                        *guard = Some(v.clone());
                        drop(guard);
                        observer.receive(Event::Next(v));
                    }
                }
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Suppresses a value equal (via `PartialEq`) to its immediate
    /// predecessor.
    pub fn remove_duplicates(self) -> Signal<T, E>
    where
        T: Clone + PartialEq,
    {
        self.remove_duplicates_by(|a, b| a == b)
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
    fn remove_duplicates_drops_consecutive_repeats() {
        let s = Signal::<i32, Never>::sequence([1, 1, 2, 2, 2, 3, 1]).remove_duplicates();
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next(1),
                Event::Next(2),
                Event::Next(3),
                Event::Next(1),
                Event::Completed
            ]
        );
    }

    #[test]
    fn remove_duplicates_by_uses_custom_equivalence() {
        let s = Signal::<i32, Never>::sequence([1, -1, 2, -2, 2]).remove_duplicates_by(|a, b| a.abs() == b.abs());
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(1), Event::Next(2), Event::Next(-2), Event::Completed]
        );
    }
}
