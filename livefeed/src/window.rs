use std::sync::Arc;

use crate::item::FeedItem;
use crate::types::QueryOrder;

/// The bounded slice of the timeline currently held in memory.
///
/// Items are stored in display order: ascending sort key, oldest first,
/// newest last, regardless of the order the backing query returned them in.
/// The storage is an `Arc<Vec<I>>` so snapshots can share the window without
/// copying; the `Arc` is swapped only when the item id sequence actually
/// changes, which is what lets consumers use pointer identity as a cheap
/// "did anything move" check.
#[derive(Clone, Debug)]
pub struct ItemWindow<I> {
    items: Arc<Vec<I>>,
}

impl<I> Default for ItemWindow<I> {
    fn default() -> Self {
        Self {
            items: Arc::new(Vec::new()),
        }
    }
}

impl<I: FeedItem> ItemWindow<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the current items, as published in snapshots.
    pub fn shared(&self) -> Arc<Vec<I>> {
        Arc::clone(&self.items)
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&I> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&I> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&I> {
        self.items.last()
    }

    /// Display index of the item with the given id.
    pub fn position(&self, id: &I::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == *id)
    }

    /// Replaces the window with a freshly fetched page.
    ///
    /// `order` is the ordering the page arrived in; descending pages are
    /// reversed into display order here. Returns `false` without touching
    /// the storage when the incoming id sequence matches the current one,
    /// so a redundant provider callback costs one comparison pass and no
    /// re-render.
    pub fn ingest(&mut self, mut page: Vec<I>, order: QueryOrder) -> bool {
        if order == QueryOrder::Desc {
            page.reverse();
        }
        if self.same_id_sequence(&page) {
            return false;
        }
        debug_validate(&page);
        self.items = Arc::new(page);
        true
    }

    fn same_id_sequence(&self, page: &[I]) -> bool {
        self.items.len() == page.len()
            && self
                .items
                .iter()
                .zip(page.iter())
                .all(|(current, incoming)| current.id() == incoming.id())
    }
}

/// Window invariants: keys non-decreasing, ids unique. Checked in debug
/// builds only; a provider that violates them is broken upstream.
fn debug_validate<I: FeedItem>(items: &[I]) {
    #[cfg(debug_assertions)]
    {
        for pair in items.windows(2) {
            debug_assert!(
                pair[0].sort_key() <= pair[1].sort_key(),
                "window keys must be non-decreasing: {} > {}",
                pair[0].sort_key(),
                pair[1].sort_key()
            );
        }
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for item in items {
            debug_assert!(
                seen.insert(item.id()),
                "duplicate item id in window: {:?}",
                item.id()
            );
        }
    }
    #[cfg(not(debug_assertions))]
    let _ = items;
}
