use std::collections::HashMap;

use livefeed::FeedItem;

/// Minimal layout surface the driver measures and scrolls.
///
/// A real UI implements this over its list view; tests use [`SimSurface`].
/// Coordinates are content-space pixels with the oldest loaded item at 0.
pub trait RenderSurface<I: FeedItem> {
    /// Replaces the rendered items with a new window, oldest first, and
    /// relayouts.
    fn apply_items(&mut self, items: &[I]);

    /// Content-space top of an item, if it is currently rendered.
    fn item_top(&self, id: &I::Id) -> Option<f64>;

    fn content_height(&self) -> f64;

    fn viewport_height(&self) -> f64;

    fn set_viewport_height(&mut self, height: f64);

    fn scroll_offset(&self) -> f64;

    fn set_scroll_offset(&mut self, offset: f64);
}

/// Deterministic layout simulation: uniform row height with per-item
/// overrides, stacked top to bottom with no spacing.
pub struct SimSurface<I: FeedItem> {
    ids: Vec<I::Id>,
    tops: HashMap<I::Id, f64>,
    overrides: HashMap<I::Id, f64>,
    row_height: f64,
    content_height: f64,
    viewport_height: f64,
    scroll_offset: f64,
}

impl<I: FeedItem> SimSurface<I> {
    pub fn new(viewport_height: f64, row_height: f64) -> Self {
        Self {
            ids: Vec::new(),
            tops: HashMap::new(),
            overrides: HashMap::new(),
            row_height,
            content_height: 0.0,
            viewport_height,
            scroll_offset: 0.0,
        }
    }

    /// Overrides the rendered height of one item and relayouts, the way a
    /// real cell would after measuring its content.
    pub fn set_row_height(&mut self, id: I::Id, height: f64) {
        self.overrides.insert(id, height);
        self.relayout();
    }

    pub fn height_of(&self, id: &I::Id) -> f64 {
        self.overrides.get(id).copied().unwrap_or(self.row_height)
    }

    /// Rendered items intersecting the viewport as `(id, screen_y)` pairs,
    /// top to bottom.
    pub fn visible(&self) -> Vec<(I::Id, f64)> {
        let viewport_end = self.scroll_offset + self.viewport_height;
        self.ids
            .iter()
            .filter_map(|id| {
                let top = *self.tops.get(id)?;
                let bottom = top + self.height_of(id);
                (top < viewport_end && bottom > self.scroll_offset)
                    .then(|| (id.clone(), top - self.scroll_offset))
            })
            .collect()
    }

    /// Largest offset that still fills the viewport.
    pub fn max_scroll(&self) -> f64 {
        (self.content_height - self.viewport_height).max(0.0)
    }

    fn relayout(&mut self) {
        let mut cursor = 0.0;
        for id in &self.ids {
            self.tops.insert(id.clone(), cursor);
            cursor += self.overrides.get(id).copied().unwrap_or(self.row_height);
        }
        self.content_height = cursor;
    }
}

impl<I: FeedItem> RenderSurface<I> for SimSurface<I> {
    fn apply_items(&mut self, items: &[I]) {
        self.ids = items.iter().map(FeedItem::id).collect();
        self.tops.clear();
        self.relayout();
    }

    fn item_top(&self, id: &I::Id) -> Option<f64> {
        self.tops.get(id).copied()
    }

    fn content_height(&self) -> f64 {
        self.content_height
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset;
    }
}
