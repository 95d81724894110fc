/// Tuning knobs for a [`FeedEngine`](crate::FeedEngine).
///
/// The defaults target a chat-style feed with ~40px rows and trigger
/// pagination three quarters of a viewport before the content runs out.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedOptions {
    /// Fraction of the viewport height used as the pagination threshold.
    /// A crossing fires when the remaining gap drops strictly below
    /// `viewport_height * buffer_ratio`.
    pub buffer_ratio: f64,
    /// Multiple of the viewport worth of rows fetched per page. Must be at
    /// least 2 so a fresh page always covers the viewport plus the threshold
    /// zone on both sides.
    pub query_factor: f64,
    /// Estimated height of one row, used only to size query limits before
    /// real measurements exist.
    pub estimated_row_height: f64,
    /// Lower bound for the page size regardless of viewport geometry.
    pub min_page_size: usize,
    /// How close to the bottom edge (in pixels) the viewport may drift while
    /// still counting as pinned to the live edge.
    pub auto_scroll_slack: f64,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            buffer_ratio: 0.75,
            query_factor: 3.0,
            estimated_row_height: 40.0,
            min_page_size: 20,
            auto_scroll_slack: 40.0,
        }
    }
}

impl FeedOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_ratio(mut self, ratio: f64) -> Self {
        self.buffer_ratio = ratio;
        self
    }

    pub fn with_query_factor(mut self, factor: f64) -> Self {
        self.query_factor = factor;
        self
    }

    pub fn with_estimated_row_height(mut self, height: f64) -> Self {
        self.estimated_row_height = height;
        self
    }

    pub fn with_min_page_size(mut self, size: usize) -> Self {
        self.min_page_size = size;
        self
    }

    pub fn with_auto_scroll_slack(mut self, slack: f64) -> Self {
        self.auto_scroll_slack = slack;
        self
    }

    /// Clamps out-of-range values instead of rejecting them. Applied once
    /// when the engine takes ownership of the options.
    pub(crate) fn sanitized(mut self) -> Self {
        if !self.buffer_ratio.is_finite() {
            self.buffer_ratio = 0.75;
        }
        self.buffer_ratio = self.buffer_ratio.clamp(0.1, 1.0);
        if !self.query_factor.is_finite() || self.query_factor < 2.0 {
            self.query_factor = 2.0;
        }
        if !self.estimated_row_height.is_finite() || self.estimated_row_height < 1.0 {
            self.estimated_row_height = 1.0;
        }
        if self.min_page_size == 0 {
            self.min_page_size = 1;
        }
        if !self.auto_scroll_slack.is_finite() || self.auto_scroll_slack < 0.0 {
            self.auto_scroll_slack = 0.0;
        }
        self
    }
}
