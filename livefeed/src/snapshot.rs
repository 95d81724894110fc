use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::FeedError;
use crate::item::FeedItem;
use crate::types::FeedMode;

/// Immutable view of the feed published after every committed change.
///
/// `items` is shared with the engine's window: as long as nothing observable
/// changes, readers keep getting the same `Arc` back and can use pointer
/// identity to skip re-renders.
#[derive(Clone, Debug)]
pub struct FeedSnapshot<I> {
    /// Window contents in display order (oldest first, newest last).
    pub items: Arc<Vec<I>>,
    pub mode: FeedMode,
    /// True while a pagination or live rebind cycle is in flight.
    pub loading: bool,
    /// True when the viewport is pinned to the live edge and new arrivals
    /// should scroll into view.
    pub should_auto_scroll: bool,
    /// Most recent surfaced failure, cleared when the next cycle starts.
    pub error: Option<FeedError>,
}

impl<I> FeedSnapshot<I> {
    fn observably_equal(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
            && self.mode == other.mode
            && self.loading == other.loading
            && self.should_auto_scroll == other.should_auto_scroll
            && self.error == other.error
    }
}

type Listener<I> = Arc<dyn Fn(&Arc<FeedSnapshot<I>>) + Send + Sync>;

struct Registry<I> {
    current: Mutex<Arc<FeedSnapshot<I>>>,
    listeners: Mutex<Vec<(u64, Listener<I>)>>,
    next_listener_id: AtomicU64,
}

/// Engine-side half of the snapshot channel. Owns the registry and decides
/// whether a candidate snapshot is an observable change at all.
pub(crate) struct SnapshotPublisher<I> {
    registry: Arc<Registry<I>>,
}

impl<I: FeedItem> SnapshotPublisher<I> {
    pub(crate) fn new(initial: FeedSnapshot<I>) -> Self {
        Self {
            registry: Arc::new(Registry {
                current: Mutex::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn reader(&self) -> SnapshotReader<I> {
        SnapshotReader {
            registry: Arc::clone(&self.registry),
        }
    }

    /// Commits `candidate` if it differs observably from the current
    /// snapshot. Listeners run exactly once per commit, outside the state
    /// lock, in subscription order.
    pub(crate) fn publish(&self, candidate: FeedSnapshot<I>) -> bool {
        let published = {
            let mut current = self
                .registry
                .current
                .lock()
                .expect("snapshot lock poisoned");
            if current.observably_equal(&candidate) {
                return false;
            }
            let next = Arc::new(candidate);
            *current = Arc::clone(&next);
            next
        };
        let listeners: Vec<Listener<I>> = {
            let guard = self
                .registry
                .listeners
                .lock()
                .expect("snapshot lock poisoned");
            guard.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(&published);
        }
        true
    }
}

/// Cloneable read handle over the published snapshots.
pub struct SnapshotReader<I> {
    registry: Arc<Registry<I>>,
}

impl<I> Clone for SnapshotReader<I> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<I: FeedItem> SnapshotReader<I> {
    /// The latest committed snapshot. Two calls with no intervening commit
    /// return the same `Arc`.
    pub fn get(&self) -> Arc<FeedSnapshot<I>> {
        Arc::clone(
            &self
                .registry
                .current
                .lock()
                .expect("snapshot lock poisoned"),
        )
    }

    /// Registers a change listener. The listener fires once per committed
    /// snapshot until the returned [`Subscription`] is dropped.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Arc<FeedSnapshot<I>>) + Send + Sync + 'static,
    ) -> Subscription<I> {
        let id = self.registry.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .listeners
            .lock()
            .expect("snapshot lock poisoned")
            .push((id, Arc::new(listener)));
        Subscription {
            registry: Arc::downgrade(&self.registry),
            id,
        }
    }
}

/// RAII guard for a snapshot listener; dropping it unsubscribes.
pub struct Subscription<I> {
    registry: Weak<Registry<I>>,
    id: u64,
}

impl<I> Drop for Subscription<I> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if let Ok(mut listeners) = registry.listeners.lock() {
                listeners.retain(|(id, _)| *id != self.id);
            }
        }
    }
}
