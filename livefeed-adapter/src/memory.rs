//! In-memory chat store with injectable latency and failures.
//!
//! Backs the simulation harness and the examples. Rows live in a single
//! `Arc<Mutex<_>>` shared by the source and every handle it hands out, so a
//! rebind observes writes that landed while it slept.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use livefeed::{CursorOp, FeedItem, QueryOrder, Selection, SortKey, SourceError};
use tokio::sync::watch;
use tracing::trace;

use crate::source::{LiveResultHandle, OrderedQuerySource};

/// Timestamp of the first seeded message, in epoch milliseconds.
pub const SEED_EPOCH_MS: i64 = 1_700_000_000_000;
/// Milliseconds between consecutive seeded messages.
pub const SEED_INTERVAL_MS: i64 = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChatMessage {
    pub id: u64,
    pub timestamp: i64,
    pub author: String,
    pub text: String,
}

impl FeedItem for ChatMessage {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn sort_key(&self) -> SortKey {
        self.timestamp
    }
}

/// Builds `count` messages spaced [`SEED_INTERVAL_MS`] apart starting at
/// [`SEED_EPOCH_MS`].
pub fn seed_messages(count: usize) -> Vec<ChatMessage> {
    (0..count)
        .map(|i| ChatMessage {
            id: i as u64,
            timestamp: SEED_EPOCH_MS + i as i64 * SEED_INTERVAL_MS,
            author: format!("user-{}", i % 7),
            text: format!("Seed message #{i:03}"),
        })
        .collect()
}

struct MemoryInner {
    rows: Vec<ChatMessage>,
    deleted: HashSet<u64>,
    selection: Option<Selection>,
    latency: Duration,
    fail_next: bool,
    queries: u64,
    generation: u64,
    changes: Option<watch::Sender<u64>>,
    next_id: u64,
}

/// Shared in-memory source. Cloning is cheap and every clone sees the same
/// rows, so tests keep one clone to mutate while the driver owns another.
#[derive(Clone)]
pub struct MemorySource {
    inner: Arc<Mutex<MemoryInner>>,
}

/// Live handle bound by [`MemorySource::query`].
#[derive(Clone)]
pub struct MemoryHandle {
    inner: Arc<Mutex<MemoryInner>>,
}

fn notify(inner: &mut MemoryInner) {
    inner.generation += 1;
    if let Some(tx) = &inner.changes {
        let _ = tx.send(inner.generation);
    }
}

/// Applies the bound selection to the current rows: tombstones filtered,
/// cursor bound applied on the sort key, page ordered and truncated.
fn evaluate(inner: &MemoryInner) -> Vec<ChatMessage> {
    let Some(selection) = inner.selection else {
        return Vec::new();
    };
    let mut matched: Vec<ChatMessage> = inner
        .rows
        .iter()
        .filter(|m| !inner.deleted.contains(&m.id))
        .filter(|m| match selection.cursor {
            Some(cursor) => match cursor.op {
                CursorOp::Le => m.timestamp <= cursor.boundary,
                CursorOp::Ge => m.timestamp >= cursor.boundary,
            },
            None => true,
        })
        .cloned()
        .collect();
    matched.sort_by_key(|m| (m.timestamp, m.id));
    match selection.order {
        QueryOrder::Desc => {
            matched.reverse();
            matched.truncate(selection.limit);
        }
        QueryOrder::Asc => matched.truncate(selection.limit),
    }
    matched
}

impl MemorySource {
    pub fn new() -> Self {
        Self::with_messages(Vec::new())
    }

    /// Source preloaded with [`seed_messages`]`(count)`.
    pub fn seeded(count: usize) -> Self {
        Self::with_messages(seed_messages(count))
    }

    pub fn with_messages(rows: Vec<ChatMessage>) -> Self {
        let next_id = rows.iter().map(|m| m.id + 1).max().unwrap_or(0);
        let (tx, _rx) = watch::channel(0u64);
        Self {
            inner: Arc::new(Mutex::new(MemoryInner {
                rows,
                deleted: HashSet::new(),
                selection: None,
                latency: Duration::ZERO,
                fail_next: false,
                queries: 0,
                generation: 0,
                changes: Some(tx),
                next_id,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory source lock poisoned")
    }

    /// Appends a message one interval after the newest row and notifies the
    /// change feed. Returns the new id.
    pub fn send_message(&self, author: &str, text: &str) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let timestamp = inner
            .rows
            .last()
            .map_or(SEED_EPOCH_MS, |m| m.timestamp + SEED_INTERVAL_MS);
        inner.rows.push(ChatMessage {
            id,
            timestamp,
            author: author.to_string(),
            text: text.to_string(),
        });
        notify(&mut inner);
        trace!(target: "livefeed::memory", id, "message appended");
        id
    }

    /// Tombstones a row. Returns false for ids that are unknown or already
    /// deleted.
    pub fn delete(&self, id: u64) -> bool {
        let mut inner = self.lock();
        let known = inner.rows.iter().any(|m| m.id == id);
        if known && inner.deleted.insert(id) {
            notify(&mut inner);
            return true;
        }
        false
    }

    /// Round-trip delay applied to every subsequent query and rebind.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Makes exactly the next query or rebind fail with
    /// [`SourceError::Rejected`].
    pub fn fail_next_query(&self) {
        self.lock().fail_next = true;
    }

    /// Total queries and rebinds attempted, failed ones included.
    pub fn query_count(&self) -> u64 {
        self.lock().queries
    }

    /// Closes the change feed. Bound handles keep answering `items` but
    /// their receivers error out, which the driver reports as a stale
    /// handle.
    pub fn disconnect(&self) {
        self.lock().changes = None;
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHandle {
    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().expect("memory source lock poisoned")
    }
}

#[async_trait]
impl OrderedQuerySource for MemorySource {
    type Item = ChatMessage;
    type Handle = MemoryHandle;

    async fn query(
        &self,
        selection: Selection,
    ) -> Result<(MemoryHandle, watch::Receiver<u64>), SourceError> {
        let (latency, fail) = {
            let mut inner = self.lock();
            inner.queries += 1;
            let fail = inner.fail_next;
            inner.fail_next = false;
            (inner.latency, fail)
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if fail {
            return Err(SourceError::Rejected("injected failure".into()));
        }
        let receiver = {
            let mut inner = self.lock();
            inner.selection = Some(selection);
            let Some(tx) = &inner.changes else {
                return Err(SourceError::Disconnected);
            };
            tx.subscribe()
        };
        trace!(target: "livefeed::memory", limit = selection.limit, live = selection.is_live(), "selection bound");
        Ok((MemoryHandle { inner: Arc::clone(&self.inner) }, receiver))
    }
}

#[async_trait]
impl LiveResultHandle for MemoryHandle {
    type Item = ChatMessage;

    fn items(&self) -> Vec<ChatMessage> {
        evaluate(&self.lock())
    }

    async fn update_selection(&self, selection: Selection) -> Result<(), SourceError> {
        let (latency, fail, disconnected) = {
            let mut inner = self.lock();
            inner.queries += 1;
            let fail = inner.fail_next;
            inner.fail_next = false;
            (inner.latency, fail, inner.changes.is_none())
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if disconnected {
            return Err(SourceError::Disconnected);
        }
        if fail {
            return Err(SourceError::Rejected("injected failure".into()));
        }
        self.lock().selection = Some(selection);
        trace!(target: "livefeed::memory", limit = selection.limit, live = selection.is_live(), "selection rebound");
        Ok(())
    }
}
