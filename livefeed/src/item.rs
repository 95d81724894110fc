use std::fmt;
use std::hash::Hash;

use crate::types::SortKey;

/// An item that can live in a feed window.
///
/// The engine never inspects payloads. It only needs a stable identity (to
/// diff windows and anchor the viewport across mutations) and an ordering
/// key (to derive continuation cursors). Implementations should return the
/// same id and key for the same logical item across queries; an item whose
/// key changes between fetches will confuse cursor derivation.
pub trait FeedItem {
    /// Stable identity, unique within a window.
    type Id: Clone + Eq + Hash + fmt::Debug;

    fn id(&self) -> Self::Id;

    /// Position of this item on the shared timeline.
    fn sort_key(&self) -> SortKey;
}
