use crate::types::{QueryOrder, ScrollDirection, SortKey};

/// Comparison applied to the ordering key at a continuation boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CursorOp {
    /// `sort_key <= boundary`, used when paging into history.
    Le,
    /// `sort_key >= boundary`, used when catching back up.
    Ge,
}

/// Where the next page starts, derived from the anchor item of the cycle
/// that issued it.
///
/// The boundary is inclusive on both sides: the anchor item itself appears
/// in the page it derives, which guarantees at least one row of overlap
/// between consecutive windows and keeps the anchor restorable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContinuationCursor {
    pub boundary: SortKey,
    pub op: CursorOp,
    pub direction: ScrollDirection,
}

impl ContinuationCursor {
    /// Cursor for a page of items at or older than `boundary`.
    pub fn backward(boundary: SortKey) -> Self {
        Self {
            boundary,
            op: CursorOp::Le,
            direction: ScrollDirection::Backward,
        }
    }

    /// Cursor for a page of items at or newer than `boundary`.
    pub fn forward(boundary: SortKey) -> Self {
        Self {
            boundary,
            op: CursorOp::Ge,
            direction: ScrollDirection::Forward,
        }
    }
}

/// Complete description of one provider query: an optional continuation
/// cursor, the result ordering, and the page limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selection {
    pub cursor: Option<ContinuationCursor>,
    pub order: QueryOrder,
    pub limit: usize,
}

impl Selection {
    /// The canonical live query: newest `limit` items, no cursor.
    ///
    /// Every return to [`FeedMode::Live`](crate::FeedMode) re-issues exactly
    /// this selection so the live edge always has one well-known shape.
    pub fn live(limit: usize) -> Self {
        Self {
            cursor: None,
            order: QueryOrder::Desc,
            limit,
        }
    }

    /// A continuation page. The ordering follows the cursor direction:
    /// backward pages fetch newest-first so the limit trims the old end,
    /// forward pages fetch oldest-first so it trims the new end.
    pub fn continuation(cursor: ContinuationCursor, limit: usize) -> Self {
        let order = match cursor.direction {
            ScrollDirection::Backward => QueryOrder::Desc,
            ScrollDirection::Forward => QueryOrder::Asc,
        };
        Self {
            cursor: Some(cursor),
            order,
            limit,
        }
    }

    pub fn is_live(&self) -> bool {
        self.cursor.is_none()
    }
}
