//! Walks deep into history with the simulation harness and reports how far
//! any visible item drifted from where the commanded scrolling should have
//! left it.
//!
//! Run with `cargo run -p livefeed-adapter --example scroll_history`.

use livefeed::FeedOptions;
use livefeed_adapter::{FeedHarness, MemorySource};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt().init();

    let source = MemorySource::seeded(500);
    let options = FeedOptions::default().with_estimated_row_height(24.0);
    let mut harness = FeedHarness::new(source.clone(), options, 480.0);
    harness.settle().await;

    let report = harness.drag(-24.0, 120).await;
    println!("steps taken:     {}", report.steps);
    println!("items compared:  {}", report.samples);
    println!(
        "max deviation:   {:.3}px (step {:?})",
        report.max_deviation, report.worst_step
    );
    println!("queries issued:  {}", source.query_count());
    println!("final mode:      {:?}", harness.snapshot().mode);
}
