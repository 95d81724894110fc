//! Windowed pagination and scroll anchoring for live, ordered feeds.
//!
//! `livefeed` keeps a bounded window over an append-mostly timeline (chat
//! messages, logs, activity streams) and moves that window as the user
//! scrolls, without ever letting content jump under their finger. The
//! centerpiece is [`FeedEngine`], a synchronous state machine that:
//!
//! - tails the newest edge in [`FeedMode::Live`] and auto-scrolls new
//!   arrivals into view while the viewport is pinned to the bottom;
//! - pages into history when the user scrolls within a configurable
//!   threshold of the loaded top, by sliding the query range rather than
//!   growing the window;
//! - pages back toward the newest edge on reversal and re-enters `Live`
//!   once a forward fetch comes up short;
//! - captures a [`ScrollAnchor`] before every window swap and asks the host
//!   to restore it in the same commit, so mutations are pixel-stable;
//! - publishes [`FeedSnapshot`]s whose `Arc` identity only changes when
//!   something observable changed.
//!
//! The engine performs no I/O and knows nothing about UI toolkits or async
//! runtimes. It consumes scroll/layout/provider events through `on_*` sinks
//! and hands back [`Effect`] values describing the queries to run and the
//! corrective scrolls to apply. The companion `livefeed-adapter` crate
//! supplies a tokio driver, an in-memory provider, and a simulation harness
//! built on that contract.
//!
//! # Feature flags
//!
//! - `serde`: `Serialize`/`Deserialize` for the plain data types (modes,
//!   cursors, selections, metrics, options, anchors).
//! - `tracing`: internal diagnostics under the `livefeed` target. Off by
//!   default; the engine is silent without it.

#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod anchor;
mod cursor;
mod engine;
mod error;
mod item;
mod metrics;
mod options;
mod snapshot;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use anchor::{capture_anchor, AnchorFallback, ScrollAnchor};
pub use cursor::{ContinuationCursor, CursorOp, Selection};
pub use engine::{Effect, FeedEngine};
pub use error::{FeedError, SourceError};
pub use item::FeedItem;
pub use metrics::{ScrollMetrics, ScrollSample, ScrollTracker};
pub use options::FeedOptions;
pub use snapshot::{FeedSnapshot, SnapshotReader, Subscription};
pub use types::{FeedMode, QueryOrder, ScrollDirection, SortKey};
pub use window::ItemWindow;
