use thiserror::Error;

/// Failure reported by a backing query provider.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    /// The provider looked at the selection and refused it.
    #[error("query rejected by provider: {0}")]
    Rejected(String),
    /// The provider connection is gone.
    #[error("provider disconnected")]
    Disconnected,
}

/// Error surfaced through [`FeedSnapshot::error`](crate::FeedSnapshot).
///
/// Failures never tear down the feed: the previous window stays in place and
/// the error rides along in the snapshot until the next cycle clears it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// A continuation or live query failed inside the provider.
    #[error("continuation query failed: {0}")]
    ProviderQuery(#[from] SourceError),
    /// The live result handle stopped delivering changes mid-flight.
    #[error("live result handle went stale")]
    StaleHandle,
}
