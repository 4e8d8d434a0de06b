//! Scans and accumulators: each output depends on all prior inputs via a
//! running accumulator held in the wrapper observer's closed-over state.
//! Grounded in `seen_std::reactive::operators::ScanObserver`.

use crate::observer::{ClosureObserver, Event};
use crate::signal::Signal;
use std::sync::Arc;

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Emits the running accumulator `seed, f(seed, x0), f(f(seed, x0), x1), ...`
    /// — one output per input, including the seed itself before the first
    /// upstream value.
    pub fn scan<A, F>(self, seed: A, f: F) -> Signal<A, E>
    where
        A: 'static + Send + Clone,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |mut observer| {
            let f = Arc::clone(&f);
            let seed = seed.clone();
            observer.receive(Event::Next(seed.clone()));
            let accumulator = parking_lot::Mutex::new(seed);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut guard = accumulator.lock();
                    *guard = f(guard.clone(), v);
                    observer.receive(Event::Next(guard.clone()));
                }
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Like [`scan`](Self::scan), but emits only the final accumulator,
    /// once, on completion — never an intermediate value.
    pub fn reduce<A, F>(self, seed: A, f: F) -> Signal<A, E>
    where
        A: 'static + Send + Clone,
        F: Fn(A, T) -> A + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Signal::new(move |mut observer| {
            let f = Arc::clone(&f);
            let accumulator = parking_lot::Mutex::new(seed.clone());
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut guard = accumulator.lock();
                    *guard = f(guard.clone(), v);
                }
                Event::Completed => {
                    observer.receive(Event::Next(accumulator.lock().clone()));
                    observer.receive(Event::Completed);
                }
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Buffers every upstream value and emits the whole sequence as one
    /// `Vec`, once, on completion.
    pub fn collect(self) -> Signal<Vec<T>, E>
    where
        T: Clone,
    {
        self.reduce(Vec::new(), |mut acc, v| {
            acc.push(v);
            acc
        })
    }

    /// Emits `(previous, current)` pairs for every upstream value, `previous`
    /// being `None` for the first value since it has no predecessor.
    pub fn zip_previous(self) -> Signal<(Option<T>, T), E>
    where
        T: Clone,
    {
        Signal::new(move |mut observer| {
            let previous: parking_lot::Mutex<Option<T>> = parking_lot::Mutex::new(None);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut guard = previous.lock();
                    let prev = guard.replace(v.clone());
                    observer.receive(Event::Next((prev, v)));
                }
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
    fn scan_emits_seed_then_running_totals() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).scan(0, |acc, x| acc + x);
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next(0),
                Event::Next(1),
                Event::Next(3),
                Event::Next(6),
                Event::Completed
            ]
        );
    }

    #[test]
    fn reduce_emits_only_final_total() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).reduce(0, |acc, x| acc + x);
        assert_eq!(collect_events(&s), vec![Event::Next(6), Event::Completed]);
    }

    #[test]
    fn collect_buffers_into_one_vec() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).collect();
        assert_eq!(
            collect_events(&s),
            vec![Event::Next(vec![1, 2, 3]), Event::Completed]
        );
    }

    #[test]
    fn zip_previous_pairs_each_value_with_its_predecessor() {
        let s = Signal::<i32, Never>::sequence([1, 2, 3]).zip_previous();
        assert_eq!(
            collect_events(&s),
            vec![
                Event::Next((None, 1)),
                Event::Next((Some(1), 2)),
                Event::Next((Some(2), 3)),
                Event::Completed
            ]
        );
    }
}
