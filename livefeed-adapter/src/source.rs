use async_trait::async_trait;
use livefeed::{FeedItem, Selection, SourceError};
use tokio::sync::watch;

/// Async boundary to the backing store.
///
/// A feed binds one query at startup and then *rebinds* it as the user
/// pages, instead of issuing independent fetches; the handle returned here
/// is that long-lived binding. The watch channel ticks a generation counter
/// whenever the result set of the currently bound selection changes, from
/// either side: new rows arriving, rows deleted, or the selection itself
/// moving.
#[async_trait]
pub trait OrderedQuerySource: Clone + Send + Sync {
    type Item: FeedItem + Clone + Send + Sync + 'static;
    type Handle: LiveResultHandle<Item = Self::Item> + 'static;

    /// Binds `selection` and returns the live handle plus its change feed.
    async fn query(
        &self,
        selection: Selection,
    ) -> Result<(Self::Handle, watch::Receiver<u64>), SourceError>;
}

/// A bound live query over an ordered store.
#[async_trait]
pub trait LiveResultHandle: Clone + Send + Sync {
    type Item: FeedItem + Clone + Send + Sync + 'static;

    /// Current matches of the bound selection, in selection order (newest
    /// first for descending selections). Readable at any time.
    fn items(&self) -> Vec<Self::Item>;

    /// Atomically rebinds the handle to a new selection. On failure the
    /// previous selection stays bound and keeps delivering changes.
    async fn update_selection(&self, selection: Selection) -> Result<(), SourceError>;
}
