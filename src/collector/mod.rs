//! Collectors turn a data source into [Item]s for a time window. [MultiCollector] runs all of
//! them and keeps one collector's failure from affecting the others.

pub mod git;

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    time::Duration,
};

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use crate::{
    models::{Item, SourceStatus},
    utils::time::TimeRange,
};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to scan directory {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("no repositories found")]
    NoRepositoriesFound,
    #[error("failed to collect from repo {}: {reason}", path.display())]
    RepositoryAccess { path: PathBuf, reason: String },
    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    Timeout { command: String, timeout: Duration },
    #[error("collection was cancelled")]
    Cancelled,
}

/// Contract every data source implements.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable identifier used for grouping and status reporting.
    fn name(&self) -> &'static str;

    /// Gathers items within `range`. Implementations should stop in-flight work once `cancel`
    /// fires.
    async fn collect(
        &self,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, CollectError>;
}

/// Items keyed by the name of the collector that produced them.
pub type ItemsBySource = HashMap<String, Vec<Item>>;
pub type StatusBySource = BTreeMap<String, SourceStatus>;

/// Combines multiple collectors.
pub struct MultiCollector {
    collectors: Vec<Box<dyn Collector>>,
}

impl MultiCollector {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// Runs every collector concurrently. Each run only produces a value; results are merged
    /// after all of them have finished.
    pub async fn collect_all(
        &self,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> (ItemsBySource, StatusBySource) {
        let runs = self.collectors.iter().map(|collector| {
            let span = info_span!("collect", source = collector.name());
            async move {
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(CollectError::Cancelled),
                    result = collector.collect(range, cancel) => result,
                };
                (collector.name(), result)
            }
            .instrument(span)
        });
        let results = join_all(runs).await;

        let mut items = ItemsBySource::new();
        let mut status = StatusBySource::new();
        for (name, result) in results {
            match result {
                Ok(collected) => {
                    info!("Collected {} items from {name}", collected.len());
                    items.insert(name.to_string(), collected);
                    status.insert(name.to_string(), SourceStatus::succeeded(name));
                }
                Err(e) => {
                    error!("Collector {name} failed: {e}");
                    status.insert(name.to_string(), SourceStatus::failed(name, e));
                }
            }
        }
        (items, status)
    }
}
