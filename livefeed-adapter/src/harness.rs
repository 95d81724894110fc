//! Scripted-scroll harness over a simulated surface.
//!
//! Drives a [`FeedDriver`] the way a jittery finger would and measures what
//! the user would perceive: for every item that stays visible across a
//! step, the difference between where it lands on screen and where the
//! commanded scroll alone would have put it. Window swaps and programmatic
//! corrections happen between samples, so any anchoring mistake shows up
//! directly as deviation pixels.

use std::collections::HashMap;
use std::sync::Arc;

use livefeed::{FeedItem, FeedOptions, FeedSnapshot};

use crate::driver::{FeedDriver, FeedHandle};
use crate::source::OrderedQuerySource;
use crate::surface::{RenderSurface, SimSurface};

/// Pixel tolerance for anchor stability checks.
pub const DEFAULT_EPSILON: f64 = 0.5;

/// Worst-case screen drift observed over a scripted drag.
#[derive(Clone, Debug, Default)]
pub struct AnchorReport {
    pub steps: usize,
    /// Items that stayed visible across a step, summed over all steps.
    pub samples: usize,
    pub max_deviation: f64,
    pub worst_step: Option<usize>,
}

impl AnchorReport {
    pub fn is_stable(&self, epsilon: f64) -> bool {
        self.max_deviation < epsilon
    }

    fn record(&mut self, step: usize, deviation: f64) {
        self.samples += 1;
        if deviation > self.max_deviation {
            self.max_deviation = deviation;
            self.worst_step = Some(step);
        }
    }
}

pub struct FeedHarness<S: OrderedQuerySource + 'static> {
    driver: FeedDriver<S, SimSurface<S::Item>>,
    handle: FeedHandle<S::Item>,
}

impl<S: OrderedQuerySource + 'static> FeedHarness<S> {
    /// Builds a feed over `source` with a simulated surface and queues the
    /// initial layout. Call [`settle`](Self::settle) to finish booting.
    pub fn new(source: S, options: FeedOptions, viewport_height: f64) -> Self {
        let surface = SimSurface::new(viewport_height, options.estimated_row_height);
        let (driver, handle) = FeedDriver::new(options, source, surface);
        handle.on_layout(viewport_height);
        Self { driver, handle }
    }

    /// Runs the driver until queued events, the in-flight cycle, and change
    /// ticks are all consumed.
    pub async fn settle(&mut self) {
        self.driver.run_until_idle().await;
    }

    pub fn handle(&self) -> &FeedHandle<S::Item> {
        &self.handle
    }

    pub fn snapshot(&self) -> Arc<FeedSnapshot<S::Item>> {
        self.handle.snapshot()
    }

    pub fn driver(&self) -> &FeedDriver<S, SimSurface<S::Item>> {
        &self.driver
    }

    pub fn surface(&self) -> &SimSurface<S::Item> {
        self.driver.surface()
    }

    pub fn surface_mut(&mut self) -> &mut SimSurface<S::Item> {
        self.driver.surface_mut()
    }

    pub fn begin_drag(&mut self) {
        self.handle.on_scroll_begin_drag();
    }

    /// One commanded scroll of `delta` pixels, fully settled. Returns the
    /// worst deviation among items visible both before and after.
    pub async fn scroll_by(&mut self, delta: f64) -> f64 {
        self.step_deviations(delta)
            .await
            .into_iter()
            .fold(0.0, f64::max)
    }

    /// Scripted drag: `steps` scrolls of `step` pixels each, settling
    /// between them.
    pub async fn drag(&mut self, step: f64, steps: usize) -> AnchorReport {
        self.begin_drag();
        let mut report = AnchorReport {
            steps,
            ..AnchorReport::default()
        };
        for i in 0..steps {
            for deviation in self.step_deviations(step).await {
                report.record(i, deviation);
            }
        }
        report
    }

    async fn step_deviations(&mut self, delta: f64) -> Vec<f64> {
        let before = self.screen_positions();
        let from = self.surface().scroll_offset();
        let target = (from + delta).clamp(0.0, self.surface().max_scroll());
        let commanded = target - from;
        self.surface_mut().set_scroll_offset(target);
        let content_height = self.surface().content_height();
        let viewport_height = self.surface().viewport_height();
        self.handle.on_scroll(target, content_height, viewport_height);
        self.settle().await;
        let after = self.screen_positions();
        before
            .iter()
            .filter_map(|(id, screen_before)| {
                let screen_after = after.get(id)?;
                Some(((screen_after - screen_before) + commanded).abs())
            })
            .collect()
    }

    fn screen_positions(&self) -> HashMap<<S::Item as FeedItem>::Id, f64> {
        self.surface().visible().into_iter().collect()
    }
}
