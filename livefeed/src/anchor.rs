use crate::item::FeedItem;
use crate::window::ItemWindow;

/// A visible item pinned across a window mutation.
///
/// Captured before the window is replaced, applied after: scrolling to
/// `new_item_top - viewport_offset` puts the item back at the exact screen
/// position it occupied before, which is what makes prepending history to a
/// chat feed invisible to the user.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollAnchor<Id> {
    pub id: Id,
    /// Display index at capture time. Informational; restoration looks the
    /// id up again because the index shifts with the window.
    pub index: usize,
    /// `item_top - scroll_offset` at capture time. Negative when the item
    /// straddles the viewport top.
    pub viewport_offset: f64,
}

/// Where to land when the anchor id no longer exists in the new window,
/// e.g. because the provider deleted the anchor item mid-cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorFallback<Id> {
    /// Scroll to offset zero.
    ContentTop,
    /// Scroll the given item to the viewport top.
    ItemTop(Id),
}

/// Picks the window item intersecting the content-space point `probe` and
/// records its screen position relative to `scroll_offset`.
///
/// `measure` maps an item id to its current content-space top; items it
/// cannot measure are skipped. The scan exploits display order: the match
/// is the last measured item whose top is at or above the probe, so an item
/// starting exactly at the probe point wins over the one ending there.
/// Returns `None` only for an empty or entirely unmeasured window.
pub fn capture_anchor<I: FeedItem>(
    window: &ItemWindow<I>,
    probe: f64,
    scroll_offset: f64,
    measure: &mut impl FnMut(&I::Id) -> Option<f64>,
) -> Option<ScrollAnchor<I::Id>> {
    let mut best: Option<(usize, I::Id, f64)> = None;
    for (index, item) in window.items().iter().enumerate() {
        let id = item.id();
        let Some(top) = measure(&id) else { continue };
        if top <= probe || best.is_none() {
            best = Some((index, id, top));
        }
        if top > probe {
            break;
        }
    }
    best.map(|(index, id, top)| ScrollAnchor {
        id,
        index,
        viewport_offset: top - scroll_offset,
    })
}
