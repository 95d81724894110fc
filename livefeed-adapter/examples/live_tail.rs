//! Boots a seeded feed pinned to the live edge and tails new arrivals.
//!
//! Run with `cargo run -p livefeed-adapter --example live_tail`.

use std::time::Duration;

use livefeed::FeedOptions;
use livefeed_adapter::{FeedDriver, MemorySource, SimSurface};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("info,livefeed=debug")
        .init();

    let source = MemorySource::seeded(40);
    let surface = SimSurface::new(320.0, 40.0);
    let (mut driver, handle) = FeedDriver::new(FeedOptions::default(), source.clone(), surface);

    handle.on_layout(320.0);
    driver.run_until_idle().await;
    let snap = handle.snapshot();
    println!(
        "booted with {} of {} messages, mode {:?}",
        snap.items.len(),
        40,
        snap.mode
    );

    for i in 1..=3 {
        source.send_message("demo", &format!("live update {i}"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        driver.run_until_idle().await;
        let snap = handle.snapshot();
        let tail = snap.items.last().map(|m| m.text.as_str()).unwrap_or("-");
        println!("tail: {tail} (auto scroll: {})", snap.should_auto_scroll);
    }
}
