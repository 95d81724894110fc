/// Ordering key shared by every feed item.
///
/// Milliseconds since the epoch in the common case, but any monotonically
/// comparable `i64` works. Ties are allowed; providers are expected to break
/// them with a stable secondary ordering (usually the item id).
pub type SortKey = i64;

/// Which edge of the timeline the engine is currently bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeedMode {
    /// Tailing the newest edge. Incoming items land at the bottom of the
    /// window and may auto-scroll the viewport.
    Live,
    /// Paging into history, away from the newest edge.
    Backward,
    /// Paging back toward the newest edge after a backward excursion.
    Forward,
}

impl FeedMode {
    pub fn is_live(self) -> bool {
        self == FeedMode::Live
    }
}

/// Direction of a scroll movement in content space.
///
/// `Forward` means the offset grew (toward newer items at the bottom of the
/// feed), `Backward` means it shrank (toward older items at the top).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScrollDirection {
    Forward,
    Backward,
}

/// Result ordering requested from the backing provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueryOrder {
    /// Oldest first. Used when paging forward.
    Asc,
    /// Newest first. Used for the live tail and backward pages.
    Desc,
}
