//! Cancellation primitives: one-shot release handles and composite bags.
//!
//! Grounded in `seen_std::reactive::subscription::{Subscription, Disposable,
//! CompositeDisposable}`: a `Mutex<Vec<Box<dyn FnOnce>>>` holds teardown
//! actions, an `AtomicBool` compare-exchange makes disposal idempotent, and
//! actions run outside the lock. Unlike the teacher's `Subscription`, the
//! inner state here lives behind a single `Arc` so that `Cancellation` can
//! implement identity-based `PartialEq`/`Eq`/`Hash`.

use parking_lot::Mutex;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type DisposeAction = Box<dyn FnOnce() + Send>;

struct Inner {
    disposed: AtomicBool,
    actions: Mutex<Vec<DisposeAction>>,
}

/// A handle that triggers release of some resource exactly once.
///
/// Cloning a `Cancellation` does not duplicate the resource: all clones
/// share the same inner state and disposing any of them disposes all.
#[derive(Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

impl Cancellation {
    /// Create a cancellation that runs `action` on first [`dispose`](Self::dispose).
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                actions: Mutex::new(vec![Box::new(action)]),
            }),
        }
    }

    /// A cancellation with nothing to release. Disposing it is a no-op.
    pub fn non_disposable() -> Self {
        Self {
            inner: Arc::new(Inner {
                disposed: AtomicBool::new(false),
                actions: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Run an additional teardown action when this cancellation is disposed.
    /// If it is already disposed, the action runs immediately.
    pub fn add_action<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_disposed() {
            action();
            return;
        }
        let mut actions = self.inner.actions.lock();
        // Re-check under the lock: dispose() may have run between the
        // is_disposed() check above and acquiring the lock.
        if self.inner.disposed.load(Ordering::SeqCst) {
            drop(actions);
            action();
        } else {
            actions.push(Box::new(action));
        }
    }

    /// Trigger release. Idempotent: the second and later calls are no-ops.
    pub fn dispose(&self) {
        if self
            .inner
            .disposed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let actions = std::mem::take(&mut *self.inner.actions.lock());
            for action in actions {
                action();
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl PartialEq for Cancellation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Cancellation {}

impl Hash for Cancellation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as usize).hash(state);
    }
}

/// A set of cancellations that are all disposed together.
///
/// Adding to an already-disposed bag disposes the added cancellation
/// immediately instead of holding onto it.
#[derive(Clone)]
pub struct CancellationBag {
    inner: Arc<Inner2>,
}

struct Inner2 {
    disposed: AtomicBool,
    members: Mutex<Vec<Cancellation>>,
}

impl CancellationBag {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner2 {
                disposed: AtomicBool::new(false),
                members: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn add(&self, cancellation: Cancellation) {
        if self.inner.disposed.load(Ordering::SeqCst) {
            cancellation.dispose();
            return;
        }
        let mut members = self.inner.members.lock();
        if self.inner.disposed.load(Ordering::SeqCst) {
            drop(members);
            cancellation.dispose();
        } else {
            members.push(cancellation);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Dispose every member and the bag itself. Idempotent.
    pub fn dispose(&self) {
        if self
            .inner
            .disposed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let members = std::mem::take(&mut *self.inner.members.lock());
            for member in members {
                member.dispose();
            }
        }
    }
}

impl Default for CancellationBag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn dispose_is_idempotent() {
        let count = Arc::new(AtomicU32::new(0));
        let count2 = Arc::clone(&count);
        let c = Cancellation::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!c.is_disposed());
        c.dispose();
        c.dispose();
        c.dispose();
        assert!(c.is_disposed());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_disposable_is_a_no_op() {
        let c = Cancellation::non_disposable();
        c.dispose();
        assert!(c.is_disposed());
    }

    #[test]
    fn add_action_after_dispose_runs_immediately() {
        let count = Arc::new(AtomicU32::new(0));
        let c = Cancellation::non_disposable();
        c.dispose();
        let count2 = Arc::clone(&count);
        c.add_action(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bag_disposes_all_members() {
        let count = Arc::new(AtomicU32::new(0));
        let bag = CancellationBag::new();
        for _ in 0..3 {
            let count2 = Arc::clone(&count);
            bag.add(Cancellation::new(move || {
                count2.fetch_add(1, Ordering::SeqCst);
            }));
        }
        bag.dispose();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn bag_disposes_late_additions_immediately() {
        let count = Arc::new(AtomicU32::new(0));
        let bag = CancellationBag::new();
        bag.dispose();
        let count2 = Arc::clone(&count);
        bag.add(Cancellation::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancellations_are_identity_hashable() {
        use std::collections::HashSet;
        let a = Cancellation::non_disposable();
        let b = Cancellation::non_disposable();
        let a_clone = a.clone();

        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(b.clone());
        set.insert(a_clone);

        assert_eq!(set.len(), 2);
        assert!(set.contains(&a));
        assert!(set.contains(&b));
    }
}
