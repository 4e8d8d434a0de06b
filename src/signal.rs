//! Cold producers: a function from observer to cancellation, plus
//! constructors (§4.D). Grounded in `seen_std::reactive::observable::Observable`.

use crate::cancellation::{Cancellation, CancellationBag};
use crate::context::ExecutionContext;
use crate::observer::{BoxObserver, Event, Observer};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

type StartFn<T, E> = dyn Fn(BoxObserver<T, E>) -> Cancellation + Send + Sync;

/// A lazy description of a producer. Carries no state of its own; `start`
/// is invoked once per [`observe`](Self::observe) call, so a `Signal` is
/// cold by construction — each subscription runs its own production
/// (§8 invariant 4).
pub struct Signal<T, E> {
    start: Arc<StartFn<T, E>>,
}

impl<T, E> Clone for Signal<T, E> {
    fn clone(&self) -> Self {
        Self {
            start: Arc::clone(&self.start),
        }
    }
}

impl<T, E> Signal<T, E>
where
    T: 'static + Send,
    E: 'static + Send,
{
    /// Build a signal from its subscribe behavior.
    pub fn new<F>(start: F) -> Self
    where
        F: Fn(BoxObserver<T, E>) -> Cancellation + Send + Sync + 'static,
    {
        Self {
            start: Arc::new(start),
        }
    }

    /// Begin production into `observer`. Disposing the returned
    /// cancellation tears down everything reachable only through this
    /// subscription.
    pub fn observe<O>(&self, observer: O) -> Cancellation
    where
        O: Observer<T, E> + 'static,
    {
        (self.start)(Box::new(observer))
    }

    pub fn observe_boxed(&self, observer: BoxObserver<T, E>) -> Cancellation {
        (self.start)(observer)
    }

    /// Convenience subscription taking only an on-next closure; errors and
    /// completion are silently dropped.
    pub fn observe_next<F>(&self, mut on_next: F) -> Cancellation
    where
        F: FnMut(T) + Send + 'static,
    {
        self.observe(crate::observer::ClosureObserver::new(move |event| {
            if let Event::Next(v) = event {
                on_next(v)
            }
        }))
    }

    /// Emits `value` then completes.
    pub fn just(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move |mut observer| {
            observer.receive(Event::Next(value.clone()));
            observer.receive(Event::Completed);
            Cancellation::non_disposable()
        })
    }

    /// Emits each element of `items` in order, then completes. Finite.
    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone,
    {
        let items: Vec<T> = items.into_iter().collect();
        Self::new(move |mut observer| {
            for item in items.iter() {
                observer.receive(Event::Next(item.clone()));
            }
            observer.receive(Event::Completed);
            Cancellation::non_disposable()
        })
    }

    /// Emits each element of `items`, delayed by `period` between
    /// emissions, sourced from `ctx` rather than blocking the calling
    /// thread. Replaces the teacher's `Observable::interval`, whose own
    /// comment admits it is a `thread::sleep`-based placeholder.
    pub fn sequence_with_interval<I>(items: I, period: Duration, ctx: Arc<dyn ExecutionContext>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Clone,
    {
        let items: Arc<Vec<T>> = Arc::new(items.into_iter().collect());
        Self::new(move |observer| {
            let observer = Arc::new(Mutex::new(observer));
            let bag = CancellationBag::new();
            schedule_emission(Arc::clone(&items), 0, period, Arc::clone(&ctx), observer, bag.clone());
            Cancellation::new(move || bag.dispose())
        })
    }

    /// Never emits and never terminates.
    pub fn never() -> Self {
        Self::new(|_observer| Cancellation::non_disposable())
    }

    /// Completes immediately without emitting any value.
    pub fn completed() -> Self {
        Self::new(|mut observer| {
            observer.receive(Event::Completed);
            Cancellation::non_disposable()
        })
    }

    /// Fails immediately with `error`.
    pub fn failed(error: E) -> Self
    where
        E: Clone,
    {
        Self::new(move |mut observer| {
            observer.receive(Event::Failed(error.clone()));
            Cancellation::non_disposable()
        })
    }
}

fn schedule_emission<T, E>(
    items: Arc<Vec<T>>,
    index: usize,
    period: Duration,
    ctx: Arc<dyn ExecutionContext>,
    observer: Arc<Mutex<BoxObserver<T, E>>>,
    bag: CancellationBag,
) where
    T: 'static + Send + Clone,
    E: 'static + Send,
{
    if index >= items.len() {
        observer.lock().receive(Event::Completed);
        return;
    }
    let ctx_for_next = Arc::clone(&ctx);
    let bag_for_next = bag.clone();
    let timer = ctx.schedule_after(
        period,
        Box::new(move || {
            observer.lock().receive(Event::Next(items[index].clone()));
            schedule_emission(items, index + 1, period, ctx_for_next, observer, bag_for_next);
        }),
    );
    bag.add(timer);
}
