//! Connectable / multicast signals (§4.G): `publish`, `replay`, `share`,
//! `replayLatest`.
//!
//! Grounded in `seen_std::reactive::subject::{Subject::as_observable,
//! BehaviorSubject, ReplaySubject}`'s "emit buffered state, then forward
//! live" subscribe shape, generalized into an explicit `connect()` step
//! and a refcounted auto-connect wrapper (`share`) that the teacher has no
//! equivalent of.

use crate::cancellation::Cancellation;
use crate::observer::{BoxObserver, ClosureObserver, Event};
use crate::signal::Signal;
use crate::subject::{PassthroughSubject, ReplaySubject};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Anything that can act as the multicast fan-out point behind a
/// [`ConnectableSignal`]: a passthrough subject for `publish`, a replay-n
/// subject for `replay`.
pub trait MulticastSubject<T, E>: Send + Sync {
    fn as_observer(&self) -> BoxObserver<T, E>;
    fn as_signal(&self) -> Signal<T, E>;
}

impl<T, E> MulticastSubject<T, E> for PassthroughSubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    fn as_observer(&self) -> BoxObserver<T, E> {
        PassthroughSubject::as_observer(self)
    }
    fn as_signal(&self) -> Signal<T, E> {
        PassthroughSubject::as_signal(self)
    }
}

impl<T, E> MulticastSubject<T, E> for ReplaySubject<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    fn as_observer(&self) -> BoxObserver<T, E> {
        ReplaySubject::as_observer(self)
    }
    fn as_signal(&self) -> Signal<T, E> {
        ReplaySubject::as_signal(self)
    }
}

/// A signal whose upstream subscription is explicitly started by
/// [`connect`](Self::connect) and shared among all observers thereafter.
pub struct ConnectableSignal<T, E, S> {
    source: Signal<T, E>,
    subject: S,
    upstream: Arc<Mutex<Option<Cancellation>>>,
}

impl<T, E, S> ConnectableSignal<T, E, S>
where
    T: 'static + Send,
    E: 'static + Send,
    S: MulticastSubject<T, E>,
{
    pub fn new(source: Signal<T, E>, subject: S) -> Self {
        Self {
            source,
            subject,
            upstream: Arc::new(Mutex::new(None)),
        }
    }

    /// Subscribe once to the upstream source, fanning its events out
    /// through the underlying subject. Calling `connect` again before
    /// disconnecting returns the same cancellation without re-subscribing
    /// (§8 invariant 4: a connectable signal runs its upstream exactly
    /// once per connection).
    pub fn connect(&self) -> Cancellation {
        let mut upstream = self.upstream.lock();
        if let Some(existing) = upstream.as_ref() {
            return existing.clone();
        }
        let cancellation = self.source.observe_boxed(self.subject.as_observer());
        *upstream = Some(cancellation.clone());
        cancellation
    }

    /// Tear down the current upstream subscription, if any, so a later
    /// `connect()` subscribes afresh.
    pub fn disconnect(&self) {
        if let Some(cancellation) = self.upstream.lock().take() {
            cancellation.dispose();
        }
    }

    /// The multicast signal observers attach to. Subscribing before
    /// `connect()` attaches an observer that receives nothing until
    /// `connect()` runs.
    pub fn signal(&self) -> Signal<T, E> {
        self.subject.as_signal()
    }
}

/// `publish()`: wraps a cold signal into a passthrough multicast.
pub fn publish<T, E>(source: Signal<T, E>) -> ConnectableSignal<T, E, PassthroughSubject<T, E>>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    ConnectableSignal::new(source, PassthroughSubject::new())
}

/// `replay(limit:)`: like `publish`, but interposes a replay-n subject —
/// each observer first receives up to `limit` buffered values (and any
/// seen terminal), then live events.
pub fn replay<T, E>(
    source: Signal<T, E>,
    limit: usize,
) -> ConnectableSignal<T, E, ReplaySubject<T, E>>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    ConnectableSignal::new(source, ReplaySubject::new(limit))
}

/// `share()`: `publish` with automatic reference-counted connect/disconnect
/// — upstream is subscribed on the first observer and cancelled when the
/// last one leaves.
pub fn share<T, E>(source: Signal<T, E>) -> Signal<T, E>
where
    T: 'static + Send + Clone,
    E: 'static + Send + Clone,
{
    let connectable = Arc::new(publish(source));
    let refcount = Arc::new(AtomicUsize::new(0));

    Signal::new(move |observer| {
        let inner = connectable.signal().observe_boxed(observer);
        if refcount.fetch_add(1, Ordering::SeqCst) == 0 {
            connectable.connect();
        }
        let connectable = Arc::clone(&connectable);
        let refcount = Arc::clone(&refcount);
        Cancellation::new(move || {
            inner.dispose();
            if refcount.fetch_sub(1, Ordering::SeqCst) == 1 {
                connectable.disconnect();
            }
        })
    })
}

/// `replayLatest(when:)`: emits the most recent upstream value each time
/// `trigger` produces an event, provided upstream has produced at least
/// one value. Completes when upstream completes.
pub fn replay_latest<T, U, E>(source: Signal<T, E>, trigger: Signal<U, E>) -> Signal<T, E>
where
    T: 'static + Send + Clone,
    U: 'static + Send,
    E: 'static + Send + Clone,
{
    Signal::new(move |observer| {
        let observer = Arc::new(Mutex::new(observer));
        let latest: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));
        let done = Arc::new(Mutex::new(false));

        let latest_for_source = Arc::clone(&latest);
        let observer_for_source = Arc::clone(&observer);
        let done_for_source = Arc::clone(&done);
        let source_cancellation = source.observe(ClosureObserver::new(move |event| {
            if *done_for_source.lock() {
                return;
            }
            match event {
                Event::Next(value) => {
                    *latest_for_source.lock() = Some(value);
                }
                Event::Completed => {
                    *done_for_source.lock() = true;
                    observer_for_source.lock().receive(Event::Completed);
                }
                Event::Failed(e) => {
                    *done_for_source.lock() = true;
                    observer_for_source.lock().receive(Event::Failed(e));
                }
            }
        }));

        let observer_for_trigger = Arc::clone(&observer);
        let done_for_trigger = Arc::clone(&done);
        let trigger_cancellation = trigger.observe(ClosureObserver::new(move |event| {
            if *done_for_trigger.lock() {
                return;
            }
            if let Event::Next(_) = event {
                if let Some(value) = latest.lock().clone() {
                    observer_for_trigger.lock().receive(Event::Next(value));
                }
            }
        }));

        Cancellation::new(move || {
            source_cancellation.dispose();
            trigger_cancellation.dispose();
        })
    })
}
