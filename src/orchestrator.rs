use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use crate::aggregator::{AggregateError, Aggregator, AggregatorHandle};
use crate::fetcher::{FetchError, Fetcher};
use crate::model::Entry;
use crate::parser::{parse_feed, ParseError};
use crate::sources::FeedSource;

/// How one feed task ended.
#[derive(Debug)]
pub enum FeedOutcome {
    Appended { entries: usize, skipped: usize },
    FetchFailed(FetchError),
    ParseFailed(ParseError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks spawned, one per source
    pub launched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items dropped across all feeds for unparseable dates
    pub skipped_entries: usize,
}

/// Result of a run: entries newest first.
#[derive(Debug)]
pub struct Digest {
    pub entries: Vec<Entry>,
    pub report: RunReport,
}

pub struct Orchestrator {
    fetcher: Fetcher,
}

impl Orchestrator {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Fetches every source concurrently and merges the results.
    ///
    /// One task is spawned per source before any is awaited. A failing feed
    /// is logged and contributes nothing; it never fails the run. Only losing
    /// the collected entries themselves is an error.
    pub async fn run(&self, sources: Vec<FeedSource>) -> Result<Digest, AggregateError> {
        info!("Fetching {} feeds", sources.len());

        let aggregator = Aggregator::spawn();
        let mut tasks = JoinSet::new();
        for source in sources {
            let fetcher = self.fetcher.clone();
            let handle = aggregator.handle();
            let span = info_span!("feed", account = %source.account());
            tasks.spawn(async move { process_feed(&fetcher, &source, &handle).await }.instrument(span));
        }

        let mut report = RunReport {
            launched: tasks.len(),
            ..RunReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(FeedOutcome::Appended { skipped, .. }) => {
                    report.succeeded += 1;
                    report.skipped_entries += skipped;
                }
                Ok(_) => report.failed += 1,
                Err(e) => {
                    error!("Feed task panicked: {}", e);
                    report.failed += 1;
                }
            }
        }

        let mut entries = aggregator.finish().await?;
        sort_by_recency(&mut entries);

        info!(
            launched = report.launched,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped_entries = report.skipped_entries,
            entries = entries.len(),
            "Feed fetch complete"
        );

        Ok(Digest { entries, report })
    }
}

/// Fetch, parse and append one feed.
async fn process_feed(
    fetcher: &Fetcher,
    source: &FeedSource,
    aggregator: &AggregatorHandle,
) -> FeedOutcome {
    let url = source.url();

    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!("Encountered an error while fetching feed {}: {}", url, e);
            return FeedOutcome::FetchFailed(e);
        }
    };

    let parsed = match parse_feed(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Encountered an error while parsing feed {}: {}", url, e);
            return FeedOutcome::ParseFailed(e);
        }
    };

    let entries = parsed.entries.len();
    info!("Fetched {} entries from {}", entries, url);
    aggregator.append(parsed.entries);

    FeedOutcome::Appended {
        entries,
        skipped: parsed.skipped,
    }
}

/// Newest first. The sort is stable, so entries with equal timestamps keep
/// the order in which their feeds finished.
pub fn sort_by_recency(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.published.cmp(&a.published));
}
