//! Counting and positional operators: behavior keyed off each event's
//! position in the sequence rather than its value.
//! Grounded in `seen_std::reactive::operators::{TakeObserver, SkipObserver}`.

use crate::cancellation::Cancellation;
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
    /// Emits at most the first `max_length` values, then completes —
    /// disposing the upstream subscription as soon as the limit is hit so
    /// an infinite source is torn down rather than drained.
    pub fn prefix(self, max_length: usize) -> Signal<T, E> {
        if max_length == 0 {
            return Signal::completed();
        }
        Signal::new(move |mut observer| {
            let count = AtomicUsize::new(0);
            let cell: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let cell_for_closure = Arc::clone(&cell);
            let inner = self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let seen = count.fetch_add(1, Ordering::SeqCst) + 1;
                    if seen <= max_length {
                        observer.receive(Event::Next(v));
                    }
                    if seen >= max_length {
                        observer.receive(Event::Completed);
                        if let Some(c) = cell_for_closure.lock().take() {
                            c.dispose();
                        }
                    }
                }
                other => observer.receive(other),
            }));
            *cell.lock() = Some(inner.clone());
            inner
        })
    }

    /// Emits the first value only, then completes.
    pub fn first(self) -> Signal<T, E> {
        self.prefix(1)
    }

    /// Buffers the last `max_length` values, emitting them (in order) when
    /// upstream completes; emits nothing if upstream fails or never
    /// produces a value.
    pub fn suffix(self, max_length: usize) -> Signal<T, E>
    where
        T: Clone,
    {
        Signal::new(move |mut observer| {
            let buffer: Mutex<VecDeque<T>> = Mutex::new(VecDeque::with_capacity(max_length));
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    if max_length > 0 {
                        let mut buffer = buffer.lock();
                        if buffer.len() == max_length {
                            buffer.pop_front();
                        }
                        buffer.push_back(v);
                    }
                }
                Event::Completed => {
                    for v in buffer.lock().drain(..) {
                        observer.receive(Event::Next(v));
                    }
                    observer.receive(Event::Completed);
                }
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Emits only the last value, then completes.
    pub fn last(self) -> Signal<T, E>
    where
        T: Clone,
    {
        self.suffix(1)
    }

    /// Skips the first `n` values, forwarding the rest unchanged.
    pub fn drop_first(self, n: usize) -> Signal<T, E> {
        Signal::new(move |mut observer| {
            let count = AtomicUsize::new(0);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    if count.fetch_add(1, Ordering::SeqCst) >= n {
                        observer.receive(Event::Next(v));
                    }
                }
                other => observer.receive(other),
            }))
        })
    }

    /// Withholds the last `n` values — each value is only forwarded once
    /// `n` more values have arrived behind it. On error, any withheld
    /// values are discarded and the error is forwarded immediately.
    pub fn drop_last(self, n: usize) -> Signal<T, E> {
        if n == 0 {
            return self;
        }
        Signal::new(move |mut observer| {
            let buffer: Mutex<VecDeque<T>> = Mutex::new(VecDeque::with_capacity(n));
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut buffer = buffer.lock();
                    buffer.push_back(v);
                    if buffer.len() > n {
                        let ready = buffer.pop_front().expect("just checked len > n");
                        drop(buffer);
                        observer.receive(Event::Next(ready));
                    }
                }
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Emits only the value at zero-based position `index`, then completes.
    /// Completes without emitting if upstream produces fewer than
    /// `index + 1` values.
    pub fn output_at(self, index: usize) -> Signal<T, E> {
        Signal::new(move |mut observer| {
            let count = AtomicUsize::new(0);
            let cell: Arc<Mutex<Option<Cancellation>>> = Arc::new(Mutex::new(None));
            let cell_for_closure = Arc::clone(&cell);
            let inner = self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let seen = count.fetch_add(1, Ordering::SeqCst);
                    if seen == index {
                        observer.receive(Event::Next(v));
                        observer.receive(Event::Completed);
                        if let Some(c) = cell_for_closure.lock().take() {
                            c.dispose();
                        }
                    }
                }
                other => observer.receive(other),
            }));
            *cell.lock() = Some(inner.clone());
            inner
        })
    }

    /// Groups upstream values into non-overlapping `Vec`s of exactly
    /// `size` values; a final short chunk is discarded on completion, not
    /// flushed (§8 scenario S3).
    pub fn buffer(self, size: usize) -> Signal<Vec<T>, E> {
        assert!(size > 0, "buffer size must be positive");
        Signal::new(move |mut observer| {
            let pending: Mutex<Vec<T>> = Mutex::new(Vec::with_capacity(size));
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut pending = pending.lock();
                    pending.push(v);
                    if pending.len() == size {
                        let chunk = std::mem::replace(&mut *pending, Vec::with_capacity(size));
                        drop(pending);
                        observer.receive(Event::Next(chunk));
                    }
                }
                Event::Completed => observer.receive(Event::Completed),
                Event::Failed(e) => observer.receive(Event::Failed(e)),
            }))
        })
    }

    /// Emits a new inner window signal every `size` upstream values — each
    /// one a hot signal fed the next `size` upstream values and then
    /// completed. The outer signal completes when upstream does (any
    /// in-progress window is left to complete on its own: it has already
    /// received everything upstream will ever give it).
    pub fn window(self, size: usize) -> Signal<Signal<T, E>, E>
    where
        T: Clone,
        E: Clone,
    {
        assert!(size > 0, "window size must be positive");
        Signal::new(move |mut observer| {
            // Each inner window is a replay subject rather than a plain
            // passthrough: it must still hand its full contents to an
            // observer that subscribes only after the window has already
            // filled and sealed (the common case when windows are produced
            // and consumed synchronously).
            let current: Mutex<Option<(crate::subject::ReplaySubject<T, E>, usize)>> =
                Mutex::new(None);
            self.observe(ClosureObserver::new(move |event| match event {
                Event::Next(v) => {
                    let mut guard = current.lock();
                    if guard.is_none() {
                        let subject = crate::subject::ReplaySubject::new(size);
                        observer.receive(Event::Next(subject.as_signal()));
                        *guard = Some((subject, 0));
                    }
                    let (subject, count) = guard.as_mut().expect("just populated above");
                    subject.emit_next(v);
                    *count += 1;
                    if *count == size {
                        subject.emit_completed();
                        *guard = None;
                    }
                }
                Event::Completed => {
                    if let Some((subject, _)) = current.lock().take() {
                        subject.emit_completed();
                    }
                    observer.receive(Event::Completed);
                }
                Event::Failed(e) => {
                    if let Some((subject, _)) = current.lock().take() {
                        subject.emit_failed(e.clone());
                    }
                    observer.receive(Event::Failed(e));
                }
            }))
        })
    }
}
