//! Subjects: hot producers that are both observers and signals (§3, §4.E).
//!
//! Grounded in `seen_std::reactive::subject::{Subject, BehaviorSubject,
//! ReplaySubject}`: an id-keyed registry of observers behind a lock,
//! mutated on attach/detach/emit. Unlike the teacher's `Subject` (which
//! requires `&mut self` to emit, so only a single owner can feed it),
//! subjects here hold their registry behind `Arc` + lock so multiple
//! producer threads can emit concurrently (§5's "shared resources" model),
//! matching how `CompositeDisposable`'s id-keyed map is built for
//! concurrent add/remove.

use crate::cancellation::Cancellation;
use crate::observer::{BoxObserver, ClosureObserver, Event, Observer};
use crate::signal::Signal;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Registry<T, E> {
    observers: Mutex<HashMap<u64, BoxObserver<T, E>>>,
    next_id: AtomicU64,
    terminal: Mutex<Option<Event<T, E>>>,
}

impl<T, E> Registry<T, E> {
    fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            terminal: Mutex::new(None),
        }
    }

    fn is_sealed(&self) -> bool {
        self.terminal.lock().is_some()
    }

    /// Attach a fresh observer; returns its id so the caller can detach it
    /// later. Returns `None` if the subject is already sealed — per §4.E
    /// a passthrough subject's late subscribers "see only future events",
    /// and there are none once it has terminated.
    fn attach(&self, observer: BoxObserver<T, E>) -> Option<u64> {
        if self.is_sealed() {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut observers = self.observers.lock();
        debug_assert!(
            !observers.contains_key(&id),
            "{}",
            crate::error::ReactiveCoreError::double_registration(format!(
                "observer id {id} already attached"
            ))
        );
        observers.insert(id, observer);
        id.into()
    }

    fn detach(&self, id: u64) {
        self.observers.lock().remove(&id);
    }

    /// Deliver `event` to every currently attached observer, then seal the
    /// registry and drop them if the event was terminal.
    fn emit(&self, event: Event<T, E>)
    where
        T: Clone,
        E: Clone,
    {
        if self.is_sealed() {
            debug_assert!(
                false,
                "{}",
                crate::error::ReactiveCoreError::event_after_terminal(
                    "emit called after the registry already delivered a terminal event"
                )
            );
            return;
        }
        let is_terminal = event.is_terminal();
        if is_terminal {
            *self.terminal.lock() = Some(event.clone());
        }
        let mut observers = self.observers.lock();
        for observer in observers.values_mut() {
            observer.receive(event.clone());
        }
        if is_terminal {
            observers.clear();
        }
    }
}

/// A hot multicast source: delivers each event to every currently
/// attached observer. Late subscribers see only future events.
pub struct PassthroughSubject<T, E> {
    registry: Arc<Registry<T, E>>,
}

impl<T, E> Clone for PassthroughSubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T, E> PassthroughSubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn observer_count(&self) -> usize {
        self.registry.observers.lock().len()
    }

    pub fn emit(&self, event: Event<T, E>) {
        self.registry.emit(event);
    }

    pub fn emit_next(&self, value: T) {
        self.emit(Event::Next(value));
    }

    pub fn emit_completed(&self) {
        self.emit(Event::Completed);
    }

    pub fn emit_failed(&self, error: E) {
        self.emit(Event::Failed(error));
    }

    /// A boxed observer that forwards every event it receives into this
    /// subject; lets a subject sit downstream of an ordinary pipeline
    /// (as `publish`/`share` do in `connectable.rs`).
    pub fn as_observer(&self) -> BoxObserver<T, E> {
        let subject = self.clone();
        Box::new(ClosureObserver::new(move |event| subject.emit(event)))
    }

    pub fn as_signal(&self) -> Signal<T, E> {
        let registry = Arc::clone(&self.registry);
        Signal::new(move |observer| {
            let registry = Arc::clone(&registry);
            match registry.attach(observer) {
                Some(id) => {
                    let registry_for_teardown = Arc::clone(&registry);
                    Cancellation::new(move || registry_for_teardown.detach(id))
                }
                None => Cancellation::non_disposable(),
            }
        })
    }
}

impl<T, E> Default for PassthroughSubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Retains the last `limit` next-events plus any terminal event, and
/// replays them to each new subscriber before forwarding live events.
pub struct ReplaySubject<T, E> {
    registry: Arc<Registry<T, E>>,
    buffer: Arc<Mutex<VecDeque<T>>>,
    limit: usize,
}

impl<T, E> Clone for ReplaySubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            buffer: Arc::clone(&self.buffer),
            limit: self.limit,
        }
    }
}

impl<T, E> ReplaySubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    pub fn new(limit: usize) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(limit))),
            limit,
        }
    }

    /// Holds `buffer`'s lock across both the buffer update and the registry
    /// delivery, so a concurrent `as_signal()` subscribe — which takes the
    /// same lock across its snapshot-then-attach sequence — can never
    /// observe a value via the replayed snapshot and then again via live
    /// delivery (or vice versa).
    pub fn emit(&self, event: Event<T, E>) {
        let mut buffer = self.buffer.lock();
        if self.limit > 0 {
            if let Event::Next(ref value) = event {
                if buffer.len() == self.limit {
                    buffer.pop_front();
                }
                buffer.push_back(value.clone());
            }
        }
        self.registry.emit(event);
    }

    pub fn emit_next(&self, value: T) {
        self.emit(Event::Next(value));
    }

    pub fn emit_completed(&self) {
        self.emit(Event::Completed);
    }

    pub fn emit_failed(&self, error: E) {
        self.emit(Event::Failed(error));
    }

    pub fn as_observer(&self) -> BoxObserver<T, E> {
        let subject = self.clone();
        Box::new(ClosureObserver::new(move |event| subject.emit(event)))
    }

    pub fn as_signal(&self) -> Signal<T, E> {
        let registry = Arc::clone(&self.registry);
        let buffer = Arc::clone(&self.buffer);
        Signal::new(move |mut observer| {
            // Held across the snapshot, the terminal check, and the attach
            // so this sequence is atomic with respect to `emit`, which
            // takes the same lock across its own update-then-deliver.
            let buffer_guard = buffer.lock();
            for value in buffer_guard.iter() {
                observer.receive(Event::Next(value.clone()));
            }
            let terminal = registry.terminal.lock().clone();
            if let Some(terminal) = terminal {
                drop(buffer_guard);
                observer.receive(terminal);
                return Cancellation::non_disposable();
            }
            let cancellation = match registry.attach(observer) {
                Some(id) => {
                    let registry_for_teardown = Arc::clone(&registry);
                    Cancellation::new(move || registry_for_teardown.detach(id))
                }
                None => Cancellation::non_disposable(),
            };
            drop(buffer_guard);
            cancellation
        })
    }
}

/// A replay-1 subject always in the `next` state: it holds a current
/// value and never terminates from the outside. Every new subscriber
/// immediately receives the current value, then future updates.
pub struct PropertySubject<T, E> {
    registry: Arc<Registry<T, E>>,
    current: Arc<Mutex<T>>,
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<T, E> Clone for PropertySubject<T, E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            current: Arc::clone(&self.current),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, E> PropertySubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    pub fn new(initial: T) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            current: Arc::new(Mutex::new(initial)),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn value(&self) -> T {
        self.current.lock().clone()
    }

    /// Holds `current`'s lock across both the value update and the registry
    /// delivery, matching `as_signal()`'s own snapshot-then-attach critical
    /// section so the two can never interleave into a double delivery.
    pub fn set(&self, value: T) {
        let mut current = self.current.lock();
        *current = value.clone();
        self.registry.emit(Event::Next(value));
    }

    /// No-op: a property never terminates from the outside (§4.E).
    pub fn emit_completed(&self) {}

    /// No-op: a property never terminates from the outside (§4.E).
    pub fn emit_failed(&self, _error: E) {}

    pub fn as_observer(&self) -> BoxObserver<T, E> {
        let subject = self.clone();
        Box::new(ClosureObserver::new(move |event| {
            if let Event::Next(v) = event {
                subject.set(v);
            }
        }))
    }

    pub fn as_signal(&self) -> Signal<T, E> {
        let registry = Arc::clone(&self.registry);
        let current = Arc::clone(&self.current);
        Signal::new(move |mut observer| {
            let current_guard = current.lock();
            observer.receive(Event::Next(current_guard.clone()));
            let cancellation = match registry.attach(observer) {
                Some(id) => {
                    let registry_for_teardown = Arc::clone(&registry);
                    Cancellation::new(move || registry_for_teardown.detach(id))
                }
                None => Cancellation::non_disposable(),
            };
            drop(current_guard);
            cancellation
        })
    }
}
