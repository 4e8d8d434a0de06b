//! The one-way event protocol delivered to consumers (§4.C).
//!
//! Narrower than the teacher's three-method `Observer<T>`
//! (`on_next`/`on_error`/`on_completed` in
//! `seen_std::reactive::{mod,observable}.rs`): here the observer is a
//! single entry point accepting a tagged `Event`, matching the data model
//! in spec.md §3. Operator wrapper observers match on the incoming event
//! the way the teacher's `MapObserver`/`FilterObserver` match on calls,
//! just inside one function body instead of three trait methods.

/// A value produced by a signal: either a new element, or one of the two
/// terminal cases. After a terminal event, no further event may be
/// delivered to the observer that received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T, E> {
    Next(T),
    Completed,
    Failed(E),
}

impl<T, E> Event<T, E> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Event::Next(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Event<U, E> {
        match self {
            Event::Next(v) => Event::Next(f(v)),
            Event::Completed => Event::Completed,
            Event::Failed(e) => Event::Failed(e),
        }
    }

    pub fn map_error<F>(self, f: impl FnOnce(E) -> F) -> Event<T, F> {
        match self {
            Event::Next(v) => Event::Next(v),
            Event::Completed => Event::Completed,
            Event::Failed(e) => Event::Failed(f(e)),
        }
    }

    pub fn as_next(&self) -> Option<&T> {
        match self {
            Event::Next(v) => Some(v),
            _ => None,
        }
    }
}

/// The sink to which events are delivered. Owned by the subscription it
/// belongs to; producers must never deliver an event after a terminal one
/// and must deliver events to a single observer in serialized fashion
/// (§5): no two `receive` calls for the same observer overlap in time.
pub trait Observer<T, E>: Send {
    fn receive(&mut self, event: Event<T, E>);
}

pub type BoxObserver<T, E> = Box<dyn Observer<T, E> + Send>;

/// Adapts three closures into an [`Observer`], for callers that would
/// rather not match on `Event` themselves. Grounded in
/// `seen_std::reactive::FnObserver`.
pub struct FnObserver<N, C, F> {
    on_next: N,
    on_completed: C,
    on_failed: F,
}

impl<T, E, N, C, F> FnObserver<N, C, F>
where
    N: FnMut(T) + Send,
    C: FnMut() + Send,
    F: FnMut(E) + Send,
{
    pub fn new(on_next: N, on_completed: C, on_failed: F) -> Self {
        Self {
            on_next,
            on_completed,
            on_failed,
        }
    }
}

impl<T, E, N, C, F> Observer<T, E> for FnObserver<N, C, F>
where
    N: FnMut(T) + Send,
    C: FnMut() + Send,
    F: FnMut(E) + Send,
{
    fn receive(&mut self, event: Event<T, E>) {
        match event {
            Event::Next(v) => (self.on_next)(v),
            Event::Completed => (self.on_completed)(),
            Event::Failed(e) => (self.on_failed)(e),
        }
    }
}

/// Wraps a single `FnMut(Event<T, E>)` closure as an [`Observer`], for the
/// (many) operators whose wrapper observer is a straight-line
/// transform-and-forward with no extra state worth naming a struct for.
pub struct ClosureObserver<T, E, F> {
    f: F,
    _marker: std::marker::PhantomData<fn(T, E)>,
}

impl<T, E, F> ClosureObserver<T, E, F>
where
    F: FnMut(Event<T, E>) + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, E, F> Observer<T, E> for ClosureObserver<T, E, F>
where
    F: FnMut(Event<T, E>) + Send,
{
    fn receive(&mut self, event: Event<T, E>) {
        (self.f)(event)
    }
}
