//! Tokio plumbing for the [`livefeed`] engine.
//!
//! The engine itself is synchronous and effect-driven; this crate supplies
//! the async half: source traits for bound live queries
//! ([`OrderedQuerySource`], [`LiveResultHandle`]), an event-loop driver that
//! executes engine effects ([`FeedDriver`]), a layout surface abstraction
//! ([`RenderSurface`]) with a deterministic simulation ([`SimSurface`]), an
//! in-memory chat store for tests and demos ([`MemorySource`]), and a
//! scripted-scroll harness ([`FeedHarness`]) that measures anchor drift in
//! pixels.

#![forbid(unsafe_code)]

mod driver;
mod harness;
mod memory;
mod source;
mod surface;


pub use driver::{FeedDriver, FeedHandle};
pub use harness::{AnchorReport, FeedHarness, DEFAULT_EPSILON};
pub use memory::{
    seed_messages, ChatMessage, MemoryHandle, MemorySource, SEED_EPOCH_MS, SEED_INTERVAL_MS,
};
pub use source::{LiveResultHandle, OrderedQuerySource};
pub use surface::{RenderSurface, SimSurface};
