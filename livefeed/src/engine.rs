use std::fmt;

use crate::anchor::{capture_anchor, AnchorFallback, ScrollAnchor};
use crate::cursor::{ContinuationCursor, Selection};
use crate::error::{FeedError, SourceError};
use crate::item::FeedItem;
use crate::metrics::{ScrollMetrics, ScrollTracker};
use crate::options::FeedOptions;
use crate::snapshot::{FeedSnapshot, SnapshotPublisher, SnapshotReader};
use crate::types::{FeedMode, QueryOrder, ScrollDirection};
use crate::window::ItemWindow;

/// Side effect the engine asks its host to perform.
///
/// The engine is synchronous and owns no I/O; every sink returns at most one
/// effect and the host (an async driver, a UI binding, a test script) carries
/// it out and feeds the result back in.
pub enum Effect<I: FeedItem> {
    /// Run this selection against the provider, then report back through
    /// [`FeedEngine::on_selection_applied`] or
    /// [`FeedEngine::on_selection_failed`].
    IssueQuery(Selection),
    /// Re-measure the new layout and scroll so `anchor` returns to its
    /// captured screen position; fall back when the anchor id is gone.
    RestoreAnchor {
        anchor: ScrollAnchor<I::Id>,
        fallback: AnchorFallback<I::Id>,
    },
    /// Scroll the viewport to the newest item.
    ScrollToLatest,
}

impl<I: FeedItem> fmt::Debug for Effect<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::IssueQuery(selection) => f.debug_tuple("IssueQuery").field(selection).finish(),
            Effect::RestoreAnchor { anchor, fallback } => f
                .debug_struct("RestoreAnchor")
                .field("anchor", anchor)
                .field("fallback", fallback)
                .finish(),
            Effect::ScrollToLatest => f.write_str("ScrollToLatest"),
        }
    }
}

struct PendingCycle<Id> {
    selection: Selection,
    /// Captured at the threshold crossing. `None` marks a cycle that pins
    /// the viewport to the live edge instead of restoring a position.
    anchor: Option<ScrollAnchor<Id>>,
}

/// Windowed pagination and scroll anchoring for a live, ordered feed.
///
/// One engine instance owns the full feed state: the item window, the mode
/// (live tail vs. history excursion), the in-flight cycle, and the scroll
/// geometry. It is deliberately UI- and runtime-agnostic:
///
/// - scroll and layout events come in through `on_*` sinks;
/// - provider results come in through [`on_selection_applied`](Self::on_selection_applied)
///   and [`on_selection_failed`](Self::on_selection_failed);
/// - everything the engine wants done comes back out as an [`Effect`].
///
/// At most one provider cycle is in flight at a time; the `loading` flag in
/// the published snapshot doubles as that guard. A scroll reversal while a
/// page is loading simply waits for the cycle to finish, and a live jump
/// requested mid-cycle is queued and runs when the cycle resolves.
pub struct FeedEngine<I: FeedItem> {
    options: FeedOptions,
    window: ItemWindow<I>,
    tracker: ScrollTracker,
    mode: FeedMode,
    loading: bool,
    should_auto_scroll: bool,
    error: Option<FeedError>,
    limit: usize,
    initialized: bool,
    history_exhausted: bool,
    /// Ordering of the most recently applied selection; live updates from
    /// the provider arrive in this order until the next rebind.
    current_order: QueryOrder,
    pending: Option<PendingCycle<I::Id>>,
    last_cursor: Option<ContinuationCursor>,
    jump_queued: bool,
    publisher: SnapshotPublisher<I>,
}

impl<I: FeedItem> FeedEngine<I> {
    pub fn new(options: FeedOptions) -> Self {
        let options = options.sanitized();
        let window = ItemWindow::new();
        let publisher = SnapshotPublisher::new(FeedSnapshot {
            items: window.shared(),
            mode: FeedMode::Live,
            loading: false,
            should_auto_scroll: true,
            error: None,
        });
        Self {
            tracker: ScrollTracker::new(options.buffer_ratio),
            options,
            window,
            mode: FeedMode::Live,
            loading: false,
            should_auto_scroll: true,
            error: None,
            limit: 0,
            initialized: false,
            history_exhausted: false,
            current_order: QueryOrder::Desc,
            pending: None,
            last_cursor: None,
            jump_queued: false,
            publisher,
        }
    }

    /// Read handle for snapshots; cloneable and independent of the engine's
    /// lifetime.
    pub fn reader(&self) -> SnapshotReader<I> {
        self.publisher.reader()
    }

    /// Binds the engine to a viewport and issues the canonical live query.
    ///
    /// The query limit is derived here from the viewport height and stays
    /// fixed for the lifetime of the binding, so every window along a
    /// pagination walk has the same size.
    pub fn initialize(&mut self, viewport_height: f64) -> Option<Effect<I>> {
        self.tracker.set_viewport_height(viewport_height);
        self.limit = compute_limit(viewport_height, &self.options);
        self.initialized = true;
        self.mode = FeedMode::Live;
        self.loading = true;
        self.should_auto_scroll = true;
        self.error = None;
        self.history_exhausted = false;
        self.current_order = QueryOrder::Desc;
        self.last_cursor = None;
        self.jump_queued = false;
        let selection = Selection::live(self.limit);
        self.pending = Some(PendingCycle {
            selection,
            anchor: None,
        });
        lf_debug!(
            viewport_height,
            limit = self.limit,
            "initializing: issuing live query"
        );
        self.commit();
        Some(Effect::IssueQuery(selection))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Viewport layout event. The first one initializes the engine lazily;
    /// later ones just update the geometry (and with it the threshold).
    pub fn on_layout(&mut self, viewport_height: f64) -> Option<Effect<I>> {
        if !self.initialized {
            return self.initialize(viewport_height);
        }
        self.tracker.set_viewport_height(viewport_height);
        self.commit();
        None
    }

    /// The user put a finger (or wheel) down. Until the gesture settles,
    /// scroll events count as user input for the threshold logic.
    pub fn on_scroll_begin_drag(&mut self) {
        self.tracker.begin_drag();
        lf_trace!("drag began");
    }

    pub fn on_content_size_change(&mut self, content_height: f64) {
        self.tracker.set_content_height(content_height);
    }

    /// Registers a corrective scroll the host is about to apply, so its echo
    /// does not read as a gesture. Hosts call this right before handing the
    /// offset to the surface.
    pub fn note_programmatic_scroll(&mut self, offset: f64) {
        self.tracker.expect_programmatic(offset);
    }

    /// Scroll event sink and the pagination trigger point.
    ///
    /// `measure` maps an item id to its current content-space top; it is
    /// consulted only when a threshold actually crosses, to pick the anchor
    /// item at the viewport edge opposite the load direction.
    pub fn on_scroll(
        &mut self,
        offset: f64,
        content_height: f64,
        viewport_height: f64,
        mut measure: impl FnMut(&I::Id) -> Option<f64>,
    ) -> Option<Effect<I>> {
        let sample = self.tracker.observe(offset, content_height, viewport_height);
        if self.mode.is_live() {
            let metrics = self.tracker.metrics(self.window.len());
            self.should_auto_scroll = metrics.gap_to_bottom <= self.options.auto_scroll_slack;
        } else {
            self.should_auto_scroll = false;
        }
        let effect = if sample.user_gesture {
            self.maybe_paginate(sample.direction, &mut measure)
        } else {
            None
        };
        self.commit();
        effect
    }

    fn maybe_paginate(
        &mut self,
        direction: Option<ScrollDirection>,
        measure: &mut impl FnMut(&I::Id) -> Option<f64>,
    ) -> Option<Effect<I>> {
        let direction = direction?;
        if !self.initialized || self.loading || self.window.is_empty() {
            return None;
        }
        let metrics = self.tracker.metrics(self.window.len());
        let crossing = match direction {
            ScrollDirection::Backward => metrics.gap_to_top < metrics.threshold,
            ScrollDirection::Forward => metrics.gap_to_bottom < metrics.threshold,
        };
        if !crossing || self.at_boundary(direction) {
            return None;
        }

        // Anchor at the viewport edge opposite the load direction: those
        // rows sit deepest inside the next window and survive the swap.
        let probe = match direction {
            ScrollDirection::Backward => {
                self.tracker.scroll_offset() + self.tracker.viewport_height()
            }
            ScrollDirection::Forward => self.tracker.scroll_offset(),
        };
        let anchor = capture_anchor(&self.window, probe, self.tracker.scroll_offset(), measure)?;
        let boundary = self.window.get(anchor.index)?.sort_key();
        let cursor = match direction {
            ScrollDirection::Backward => ContinuationCursor::backward(boundary),
            ScrollDirection::Forward => ContinuationCursor::forward(boundary),
        };
        if self.last_cursor == Some(cursor) {
            lf_debug!(boundary, "duplicate continuation cursor ignored");
            return None;
        }

        let selection = Selection::continuation(cursor, self.limit);
        self.mode = match direction {
            ScrollDirection::Backward => FeedMode::Backward,
            ScrollDirection::Forward => FeedMode::Forward,
        };
        self.loading = true;
        self.should_auto_scroll = false;
        self.error = None;
        self.last_cursor = Some(cursor);
        self.pending = Some(PendingCycle {
            selection,
            anchor: Some(anchor),
        });
        lf_debug!(
            ?direction,
            boundary,
            limit = self.limit,
            "threshold crossed: issuing continuation query"
        );
        Some(Effect::IssueQuery(selection))
    }

    /// New result set pushed by the provider for the currently bound
    /// selection.
    ///
    /// When the viewport is pinned to the live edge the new tail scrolls
    /// into view; otherwise the first visible item is captured before the
    /// swap and restored after, so arrivals never move content under the
    /// user.
    pub fn on_source_update(
        &mut self,
        items: Vec<I>,
        mut measure: impl FnMut(&I::Id) -> Option<f64>,
    ) -> Option<Effect<I>> {
        let anchor = if self.should_auto_scroll {
            None
        } else {
            let offset = self.tracker.scroll_offset();
            capture_anchor(&self.window, offset, offset, &mut measure)
        };
        lf_trace!(count = items.len(), "source update received");
        if !self.window.ingest(items, self.current_order) {
            return None;
        }
        let effect = match anchor {
            Some(anchor) => Some(Effect::RestoreAnchor {
                anchor,
                fallback: self.fallback_for_window(),
            }),
            None => Some(Effect::ScrollToLatest),
        };
        self.commit();
        effect
    }

    /// The provider finished rebinding to `selection`; `items` is the new
    /// result set in selection order.
    pub fn on_selection_applied(&mut self, selection: Selection, items: Vec<I>) -> Option<Effect<I>> {
        let Some(pending) = self.pending.take() else {
            lf_warn!("selection resolved with no cycle pending; ignoring");
            return None;
        };
        if pending.selection != selection {
            lf_warn!("stale selection resolution ignored");
            self.pending = Some(pending);
            return None;
        }
        if self.jump_queued {
            self.jump_queued = false;
            lf_debug!("queued live jump supersedes the resolved page");
            let effect = self.begin_live_cycle();
            self.commit();
            return Some(effect);
        }

        let fetched = items.len();
        if let Some(cursor) = selection.cursor {
            if cursor.direction == ScrollDirection::Forward && fetched < selection.limit {
                // A short forward page means the range ran into the live
                // edge. Skip the partial window and rebind the canonical
                // live query in the same cycle; the anchor carries over.
                lf_debug!(
                    fetched,
                    limit = selection.limit,
                    "caught up to the live edge; rebinding live query"
                );
                let live = Selection::live(self.limit);
                self.pending = Some(PendingCycle {
                    selection: live,
                    anchor: pending.anchor,
                });
                self.last_cursor = None;
                return Some(Effect::IssueQuery(live));
            }
        }

        let changed = self.window.ingest(items, selection.order);
        self.current_order = selection.order;
        self.loading = false;

        let effect = match selection.cursor {
            None => {
                self.mode = FeedMode::Live;
                self.history_exhausted = fetched < selection.limit;
                self.last_cursor = None;
                match pending.anchor {
                    None => {
                        self.should_auto_scroll = true;
                        Some(Effect::ScrollToLatest)
                    }
                    Some(anchor) => {
                        let metrics = self.tracker.metrics(self.window.len());
                        self.should_auto_scroll =
                            metrics.gap_to_bottom <= self.options.auto_scroll_slack;
                        changed.then(|| Effect::RestoreAnchor {
                            anchor,
                            fallback: self.fallback_for_window(),
                        })
                    }
                }
            }
            Some(cursor) => {
                if cursor.direction == ScrollDirection::Backward {
                    self.history_exhausted = fetched < selection.limit;
                }
                match pending.anchor {
                    Some(anchor) if changed => Some(Effect::RestoreAnchor {
                        anchor,
                        fallback: self.fallback_for_window(),
                    }),
                    _ => None,
                }
            }
        };
        lf_debug!(fetched, changed, mode = ?self.mode, "selection applied");
        self.commit();
        effect
    }

    /// The provider rejected or failed the rebind. The window stays exactly
    /// as it was, the error surfaces in the snapshot, and nothing retries on
    /// its own; the next qualifying scroll derives a fresh cursor.
    pub fn on_selection_failed(
        &mut self,
        selection: Selection,
        error: SourceError,
    ) -> Option<Effect<I>> {
        let Some(pending) = self.pending.take() else {
            lf_warn!("selection failed with no cycle pending; ignoring");
            return None;
        };
        if pending.selection != selection {
            lf_warn!("stale selection failure ignored");
            self.pending = Some(pending);
            return None;
        }
        lf_warn!(%error, "continuation query failed; window retained");
        self.loading = false;
        self.last_cursor = None;
        self.error = Some(FeedError::ProviderQuery(error));
        if self.jump_queued {
            self.jump_queued = false;
            let effect = self.begin_live_cycle();
            self.commit();
            return Some(effect);
        }
        self.commit();
        None
    }

    /// The live change feed closed under the engine. Terminal for the
    /// current binding; surfaced so the UI can offer a reload.
    pub fn on_handle_stale(&mut self) {
        lf_warn!("live result handle went stale");
        self.error = Some(FeedError::StaleHandle);
        self.loading = false;
        self.pending = None;
        self.commit();
    }

    /// Explicit return to the newest edge, e.g. a "jump to latest" button.
    ///
    /// With an error surfaced this re-issues the live query even when the
    /// mode is already [`FeedMode::Live`], making it the recovery action
    /// after a failed bind.
    pub fn jump_to_live(&mut self) -> Option<Effect<I>> {
        lf_debug!("jump to live requested");
        self.request_live_edge()
    }

    /// The local user sent a message; the feed snaps back to the live edge
    /// so the echo of their own message is visible when it arrives.
    pub fn on_message_sent(&mut self) -> Option<Effect<I>> {
        lf_debug!("message sent; returning to the live edge");
        self.request_live_edge()
    }

    fn request_live_edge(&mut self) -> Option<Effect<I>> {
        if self.loading {
            if self
                .pending
                .as_ref()
                .is_some_and(|p| p.selection.is_live() && p.anchor.is_none())
            {
                lf_trace!("live rebind already in flight");
                return None;
            }
            lf_debug!("cycle in flight; queueing live jump");
            self.jump_queued = true;
            return None;
        }
        if self.mode.is_live() && self.error.is_none() {
            self.should_auto_scroll = true;
            self.tracker.settle();
            self.commit();
            return Some(Effect::ScrollToLatest);
        }
        // Live with an error surfaced falls through: the jump re-issues the
        // live query instead of just scrolling, so it doubles as the retry
        // for a failed bind.
        let effect = self.begin_live_cycle();
        self.commit();
        Some(effect)
    }

    fn begin_live_cycle(&mut self) -> Effect<I> {
        let selection = Selection::live(self.limit);
        self.pending = Some(PendingCycle {
            selection,
            anchor: None,
        });
        self.loading = true;
        self.error = None;
        self.last_cursor = None;
        self.tracker.settle();
        lf_debug!(limit = self.limit, "rebinding canonical live query");
        Effect::IssueQuery(selection)
    }

    fn fallback_for_window(&self) -> AnchorFallback<I::Id> {
        match self.window.first() {
            Some(first) => AnchorFallback::ItemTop(first.id()),
            None => AnchorFallback::ContentTop,
        }
    }

    fn commit(&mut self) {
        self.publisher.publish(FeedSnapshot {
            items: self.window.shared(),
            mode: self.mode,
            loading: self.loading,
            should_auto_scroll: self.should_auto_scroll,
            error: self.error.clone(),
        });
    }

    /// True when paging further in `direction` cannot produce new items.
    pub fn at_boundary(&self, direction: ScrollDirection) -> bool {
        match direction {
            ScrollDirection::Backward => self.history_exhausted,
            ScrollDirection::Forward => self.mode.is_live(),
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn should_auto_scroll(&self) -> bool {
        self.should_auto_scroll
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn window(&self) -> &ItemWindow<I> {
        &self.window
    }

    pub fn metrics(&self) -> ScrollMetrics {
        self.tracker.metrics(self.window.len())
    }

    /// Page size derived at initialization; zero before the first layout.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn history_exhausted(&self) -> bool {
        self.history_exhausted
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }
}

/// Page size for a viewport: enough rows to cover `query_factor` viewports
/// at the estimated row height, floored at the configured minimum.
pub(crate) fn compute_limit(viewport_height: f64, options: &FeedOptions) -> usize {
    let span = viewport_height.max(0.0) * options.query_factor;
    let rows = (span / options.estimated_row_height).ceil();
    let rows = if rows.is_finite() && rows > 0.0 {
        rows as usize
    } else {
        0
    };
    rows.max(options.min_page_size)
}
