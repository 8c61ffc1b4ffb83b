//! Collects entry batches from concurrently running feed tasks.
//!
//! A single collector task owns the growing `Vec<Entry>`; producers send
//! whole batches through a channel, so each batch lands in one piece and
//! no producer ever touches the vector directly.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error};

use crate::model::Entry;

#[derive(Debug, Error)]
pub enum AggregateError {
    /// Entries collected so far are lost with the task
    #[error("Entry collector task failed: {0}")]
    Collector(#[from] JoinError),
}

/// Owns the collector task. Hand out [`AggregatorHandle`]s, then call [`Aggregator::finish`].
pub struct Aggregator {
    tx: mpsc::UnboundedSender<Vec<Entry>>,
    collector: JoinHandle<Vec<Entry>>,
}

/// Sending side given to each feed task.
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    tx: mpsc::UnboundedSender<Vec<Entry>>,
}

impl Aggregator {
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Entry>>();

        let collector = tokio::spawn(async move {
            let mut entries = Vec::new();
            while let Some(batch) = rx.recv().await {
                debug!(batch = batch.len(), total = entries.len() + batch.len(), "Appending entries");
                entries.extend(batch);
            }
            entries
        });

        Self { tx, collector }
    }

    pub fn handle(&self) -> AggregatorHandle {
        AggregatorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Waits until every handle is dropped and all sent batches are collected.
    ///
    /// Entries are in arrival order.
    pub async fn finish(self) -> Result<Vec<Entry>, AggregateError> {
        drop(self.tx);
        Ok(self.collector.await?)
    }
}

impl AggregatorHandle {
    /// Adds a batch as one unit.
    pub fn append(&self, entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        // The receiver lives until `finish`, which first waits for every handle to go away.
        if self.tx.send(entries).is_err() {
            error!("Entry collector stopped before all batches were appended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelImage;
    use chrono::{DateTime, Duration};
    use std::sync::Arc;

    fn batch(feed: &str, size: usize) -> Vec<Entry> {
        let image = Arc::new(ChannelImage {
            title: feed.to_string(),
            ..Default::default()
        });
        let base = DateTime::parse_from_rfc2822("Mon, 09 Dec 2024 12:00:00 GMT").unwrap();
        (0..size)
            .map(|i| Entry {
                published: base + Duration::minutes(i as i64),
                image: image.clone(),
                link: format!("https://example.com/{}/{}", feed, i),
                content: String::new(),
                title: format!("{} #{}", feed, i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_finish_without_appends_is_empty() {
        let aggregator = Aggregator::spawn();
        assert!(aggregator.finish().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_collector_is_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let collector = tokio::spawn(async { panic!("collector crashed") });
        let aggregator = Aggregator { tx, collector };

        let result = aggregator.finish().await;
        assert!(matches!(result, Err(AggregateError::Collector(_))));
    }

    #[tokio::test]
    async fn test_single_batch_kept_in_order() {
        let aggregator = Aggregator::spawn();
        aggregator.handle().append(batch("solo", 3));

        let entries = aggregator.finish().await.unwrap();
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["solo #0", "solo #1", "solo #2"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let aggregator = Aggregator::spawn();
        aggregator.handle().append(Vec::new());
        assert!(aggregator.finish().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_lose_nothing() {
        let aggregator = Aggregator::spawn();

        let mut tasks = Vec::new();
        let mut expected = 0;
        for task in 0..200 {
            let size = task % 7;
            expected += size;
            let handle = aggregator.handle();
            tasks.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                handle.append(batch(&format!("feed-{}", task), size));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let entries = aggregator.finish().await.unwrap();
        assert_eq!(entries.len(), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batches_never_interleave() {
        let aggregator = Aggregator::spawn();

        let mut tasks = Vec::new();
        for task in 0..50 {
            let handle = aggregator.handle();
            tasks.push(tokio::spawn(async move {
                handle.append(batch(&format!("feed-{}", task), 10));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let entries = aggregator.finish().await.unwrap();
        assert_eq!(entries.len(), 500);
        for chunk in entries.chunks(10) {
            let feed = &chunk[0].image.title;
            assert!(chunk.iter().all(|e| &e.image.title == feed));
        }
    }
}
