//! Event loop gluing the sync engine to an async source and a surface.
//!
//! The engine decides; the driver executes. Every engine call returns at
//! most one [`Effect`], and the driver turns it into real work: spawning the
//! single in-flight provider cycle, restoring the scroll position after a
//! window swap, or snapping to the newest row. UI threads talk to the loop
//! through a cloneable [`FeedHandle`] so they never block on the provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use livefeed::{
    AnchorFallback, Effect, FeedEngine, FeedItem, FeedOptions, FeedSnapshot, Selection,
    SnapshotReader, SourceError, Subscription,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::source::{LiveResultHandle, OrderedQuerySource};
use crate::surface::RenderSurface;

enum UiEvent {
    Scroll {
        offset: f64,
        content_height: f64,
        viewport_height: f64,
    },
    ScrollBeginDrag,
    ContentSizeChange {
        height: f64,
    },
    Layout {
        viewport_height: f64,
    },
    JumpToLive,
    MessageSent,
}

enum CycleOutcome<S: OrderedQuerySource> {
    /// First bind: carries the live handle and its change feed.
    Bound {
        selection: Selection,
        result: Result<(S::Handle, watch::Receiver<u64>), SourceError>,
    },
    /// Rebind of the existing handle.
    Rebound {
        selection: Selection,
        result: Result<(), SourceError>,
    },
}

type CycleFuture<S> = Pin<Box<dyn Future<Output = CycleOutcome<S>> + Send>>;

enum Wake<S: OrderedQuerySource> {
    Cycle(CycleOutcome<S>),
    SourceChanged(Result<(), watch::error::RecvError>),
    Ui(Option<UiEvent>),
}

/// Owns the engine, the surface, and the one in-flight provider cycle.
pub struct FeedDriver<S, R>
where
    S: OrderedQuerySource,
    R: RenderSurface<S::Item>,
{
    engine: FeedEngine<S::Item>,
    source: S,
    surface: R,
    live: Option<S::Handle>,
    changes: Option<watch::Receiver<u64>>,
    events: mpsc::UnboundedReceiver<UiEvent>,
    inflight: Option<CycleFuture<S>>,
}

/// Cheap cloneable front half: feeds UI events in, reads snapshots out.
pub struct FeedHandle<I: FeedItem> {
    events: mpsc::UnboundedSender<UiEvent>,
    reader: SnapshotReader<I>,
}

impl<S, R> FeedDriver<S, R>
where
    S: OrderedQuerySource + 'static,
    R: RenderSurface<S::Item>,
{
    pub fn new(options: FeedOptions, source: S, surface: R) -> (Self, FeedHandle<S::Item>) {
        let engine = FeedEngine::new(options);
        let reader = engine.reader();
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            engine,
            source,
            surface,
            live: None,
            changes: None,
            events: rx,
            inflight: None,
        };
        (driver, FeedHandle { events: tx, reader })
    }

    pub fn engine(&self) -> &FeedEngine<S::Item> {
        &self.engine
    }

    pub fn surface(&self) -> &R {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut R {
        &mut self.surface
    }

    /// Runs until every handle is dropped.
    pub async fn run(&mut self) {
        while self.step().await {}
    }

    async fn step(&mut self) -> bool {
        let Self {
            inflight,
            changes,
            events,
            ..
        } = self;
        let wake: Wake<S> = tokio::select! {
            outcome = async {
                match inflight.as_mut() {
                    Some(cycle) => cycle.await,
                    None => std::future::pending().await,
                }
            }, if inflight.is_some() => Wake::Cycle(outcome),
            result = async {
                match changes.as_mut() {
                    Some(rx) => rx.changed().await,
                    None => std::future::pending().await,
                }
            }, if changes.is_some() => Wake::SourceChanged(result),
            event = events.recv() => Wake::Ui(event),
        };
        match wake {
            Wake::Cycle(outcome) => {
                self.inflight = None;
                self.finish_cycle(outcome);
                true
            }
            Wake::SourceChanged(Ok(())) => {
                self.handle_source_changed();
                true
            }
            Wake::SourceChanged(Err(_)) => {
                self.changes = None;
                self.engine.on_handle_stale();
                true
            }
            Wake::Ui(Some(event)) => {
                self.handle_ui_event(event);
                true
            }
            Wake::Ui(None) => false,
        }
    }

    /// Drains queued events, finishes the in-flight cycle, and consumes
    /// pending change ticks until nothing is left to do. Test entry point:
    /// with a paused clock this settles injected latency deterministically.
    pub async fn run_until_idle(&mut self) {
        loop {
            let mut progressed = false;
            while let Ok(event) = self.events.try_recv() {
                self.handle_ui_event(event);
                progressed = true;
            }
            if let Some(cycle) = self.inflight.take() {
                let outcome = cycle.await;
                self.finish_cycle(outcome);
                progressed = true;
            }
            if let Some(rx) = self.changes.as_mut() {
                match rx.has_changed() {
                    Ok(true) => {
                        rx.borrow_and_update();
                        self.handle_source_changed();
                        progressed = true;
                    }
                    Ok(false) => {}
                    Err(_) => {
                        self.changes = None;
                        self.engine.on_handle_stale();
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        let effect = match event {
            UiEvent::Scroll {
                offset,
                content_height,
                viewport_height,
            } => self
                .engine
                .on_scroll(offset, content_height, viewport_height, |id| {
                    self.surface.item_top(id)
                }),
            UiEvent::ScrollBeginDrag => {
                self.engine.on_scroll_begin_drag();
                None
            }
            UiEvent::ContentSizeChange { height } => {
                self.engine.on_content_size_change(height);
                None
            }
            UiEvent::Layout { viewport_height } => {
                self.surface.set_viewport_height(viewport_height);
                self.engine.on_layout(viewport_height)
            }
            UiEvent::JumpToLive => self.engine.jump_to_live(),
            UiEvent::MessageSent => self.engine.on_message_sent(),
        };
        if let Some(effect) = effect {
            self.apply_effect(effect);
        }
    }

    fn handle_source_changed(&mut self) {
        let Some(handle) = &self.live else {
            return;
        };
        let items = handle.items();
        trace!(target: "livefeed::driver", count = items.len(), "source change tick");
        let effect = self
            .engine
            .on_source_update(items, |id| self.surface.item_top(id));
        if let Some(effect) = effect {
            self.apply_effect(effect);
        }
    }

    fn finish_cycle(&mut self, outcome: CycleOutcome<S>) {
        let effect = match outcome {
            CycleOutcome::Bound { selection, result } => match result {
                Ok((handle, changes)) => {
                    let items = handle.items();
                    self.live = Some(handle);
                    self.changes = Some(changes);
                    self.engine.on_selection_applied(selection, items)
                }
                Err(error) => {
                    warn!(target: "livefeed::driver", %error, "initial bind failed");
                    self.engine.on_selection_failed(selection, error)
                }
            },
            CycleOutcome::Rebound { selection, result } => match result {
                Ok(()) => match &self.live {
                    Some(handle) => {
                        let items = handle.items();
                        self.engine.on_selection_applied(selection, items)
                    }
                    None => None,
                },
                Err(error) => {
                    warn!(target: "livefeed::driver", %error, "selection rebind failed");
                    self.engine.on_selection_failed(selection, error)
                }
            },
        };
        if let Some(effect) = effect {
            self.apply_effect(effect);
        }
    }

    fn apply_effect(&mut self, effect: Effect<S::Item>) {
        match effect {
            Effect::IssueQuery(selection) => self.start_cycle(selection),
            Effect::RestoreAnchor { anchor, fallback } => {
                self.sync_surface();
                let target = match self.surface.item_top(&anchor.id) {
                    Some(top) => top - anchor.viewport_offset,
                    None => {
                        debug!(target: "livefeed::driver", "anchor item gone; using fallback");
                        match fallback {
                            AnchorFallback::ItemTop(id) => {
                                self.surface.item_top(&id).unwrap_or(0.0)
                            }
                            AnchorFallback::ContentTop => 0.0,
                        }
                    }
                };
                self.scroll_programmatic(target);
            }
            Effect::ScrollToLatest => {
                self.sync_surface();
                let target = self.surface.content_height() - self.surface.viewport_height();
                self.scroll_programmatic(target.max(0.0));
            }
        }
    }

    fn start_cycle(&mut self, selection: Selection) {
        debug_assert!(self.inflight.is_none(), "engine keeps one cycle in flight");
        debug!(
            target: "livefeed::driver",
            limit = selection.limit,
            live = selection.is_live(),
            rebind = self.live.is_some(),
            "starting provider cycle"
        );
        let cycle: CycleFuture<S> = match &self.live {
            None => {
                let source = self.source.clone();
                Box::pin(async move {
                    let result = source.query(selection).await;
                    CycleOutcome::Bound { selection, result }
                })
            }
            Some(handle) => {
                let handle = handle.clone();
                Box::pin(async move {
                    let result = handle.update_selection(selection).await;
                    CycleOutcome::Rebound { selection, result }
                })
            }
        };
        self.inflight = Some(cycle);
    }

    /// Pushes the current window to the surface. Called before any
    /// programmatic reposition so measurements see the new layout.
    fn sync_surface(&mut self) {
        let items = self.engine.window().shared();
        self.surface.apply_items(&items);
    }

    fn scroll_programmatic(&mut self, target: f64) {
        let max = (self.surface.content_height() - self.surface.viewport_height()).max(0.0);
        let target = target.clamp(0.0, max);
        self.surface.set_scroll_offset(target);
        self.engine.note_programmatic_scroll(target);
        let content_height = self.surface.content_height();
        let viewport_height = self.surface.viewport_height();
        // Echo of a registered correction, never a gesture.
        let _ = self
            .engine
            .on_scroll(target, content_height, viewport_height, |id| {
                self.surface.item_top(id)
            });
    }
}

impl<I: FeedItem> FeedHandle<I> {
    /// Latest committed snapshot.
    pub fn snapshot(&self) -> Arc<FeedSnapshot<I>> {
        self.reader.get()
    }

    pub fn reader(&self) -> SnapshotReader<I> {
        self.reader.clone()
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&Arc<FeedSnapshot<I>>) + Send + Sync + 'static,
    ) -> Subscription<I> {
        self.reader.subscribe(listener)
    }

    pub fn on_scroll(&self, offset: f64, content_height: f64, viewport_height: f64) {
        self.send(UiEvent::Scroll {
            offset,
            content_height,
            viewport_height,
        });
    }

    pub fn on_scroll_begin_drag(&self) {
        self.send(UiEvent::ScrollBeginDrag);
    }

    pub fn on_content_size_change(&self, height: f64) {
        self.send(UiEvent::ContentSizeChange { height });
    }

    pub fn on_layout(&self, viewport_height: f64) {
        self.send(UiEvent::Layout { viewport_height });
    }

    pub fn jump_to_live(&self) {
        self.send(UiEvent::JumpToLive);
    }

    pub fn on_message_sent(&self) {
        self.send(UiEvent::MessageSent);
    }

    fn send(&self, event: UiEvent) {
        // A dropped driver makes every event moot.
        let _ = self.events.send(event);
    }
}

impl<I: FeedItem> Clone for FeedHandle<I> {
    fn clone(&self) -> Self {
        Self {
            events: self.events.clone(),
            reader: self.reader.clone(),
        }
    }
}
