use crate::types::ScrollDirection;

/// Distances between the viewport and the edges of the loaded content,
/// plus the threshold they are compared against.
///
/// All values are in content-space pixels. Gaps may go negative during
/// bounce or before the first layout; callers compare, they do not index.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollMetrics {
    /// Pixels of loaded content above the viewport top.
    pub gap_to_top: f64,
    /// Pixels of loaded content below the viewport bottom.
    pub gap_to_bottom: f64,
    /// Crossing threshold: `viewport_height * buffer_ratio`.
    pub threshold: f64,
    /// Items currently in the window.
    pub item_count: usize,
}

/// One observed scroll event, classified.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollSample {
    pub offset: f64,
    /// `None` until the offset has moved at least once.
    pub direction: Option<ScrollDirection>,
    /// True only for events attributable to a real gesture: a drag is in
    /// progress and the event is not the echo of a programmatic correction.
    pub user_gesture: bool,
}

/// Tracks viewport geometry and classifies scroll events.
///
/// Two gates keep the pagination controller honest:
///
/// - events only count as user input between a drag-begin and the next
///   settle, so layout jitter cannot trigger queries;
/// - a corrective scroll issued by the engine itself is registered ahead of
///   time and its echo is swallowed, so anchor restoration can never feed
///   back into the threshold logic.
#[derive(Clone, Debug)]
pub struct ScrollTracker {
    scroll_offset: f64,
    content_height: f64,
    viewport_height: f64,
    buffer_ratio: f64,
    dragging: bool,
    direction: Option<ScrollDirection>,
    pending_programmatic: Option<f64>,
}

impl ScrollTracker {
    /// Tolerance when matching a scroll event against a registered
    /// programmatic target. Real surfaces quantize offsets.
    pub const PROGRAMMATIC_EPSILON: f64 = 0.5;

    pub fn new(buffer_ratio: f64) -> Self {
        Self {
            scroll_offset: 0.0,
            content_height: 0.0,
            viewport_height: 0.0,
            buffer_ratio,
            dragging: false,
            direction: None,
            pending_programmatic: None,
        }
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn content_height(&self) -> f64 {
        self.content_height
    }

    pub fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    pub fn set_content_height(&mut self, height: f64) {
        self.content_height = height;
    }

    /// Marks the start of a gesture. Events observed from here until
    /// [`settle`](Self::settle) report `user_gesture = true`.
    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Ends the gesture window, e.g. when the engine jumps to the live edge.
    pub fn settle(&mut self) {
        self.dragging = false;
        self.direction = None;
    }

    /// Registers an offset about to be applied programmatically so its echo
    /// is not mistaken for user input.
    pub fn expect_programmatic(&mut self, offset: f64) {
        self.pending_programmatic = Some(offset);
    }

    /// Ingests one scroll event and classifies it.
    pub fn observe(&mut self, offset: f64, content_height: f64, viewport_height: f64) -> ScrollSample {
        self.content_height = content_height;
        self.viewport_height = viewport_height;

        if let Some(expected) = self.pending_programmatic {
            if (offset - expected).abs() <= Self::PROGRAMMATIC_EPSILON {
                self.pending_programmatic = None;
                self.scroll_offset = offset;
                return ScrollSample {
                    offset,
                    direction: self.direction,
                    user_gesture: false,
                };
            }
        }

        match offset.partial_cmp(&self.scroll_offset) {
            Some(std::cmp::Ordering::Greater) => self.direction = Some(ScrollDirection::Forward),
            Some(std::cmp::Ordering::Less) => self.direction = Some(ScrollDirection::Backward),
            // Repeated offset or NaN: keep the previous direction.
            _ => {}
        }
        self.scroll_offset = offset;

        ScrollSample {
            offset,
            direction: self.direction,
            user_gesture: self.dragging,
        }
    }

    /// Current metrics for the given window population.
    pub fn metrics(&self, item_count: usize) -> ScrollMetrics {
        ScrollMetrics {
            gap_to_top: self.scroll_offset,
            gap_to_bottom: self.content_height - self.scroll_offset - self.viewport_height,
            threshold: self.viewport_height * self.buffer_ratio,
            item_count,
        }
    }
}
