use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use serde_json::Value;
use tracing::debug;

use crate::TARGET_RECIPIENT;
use crate::api::{self, RequestsPage};
use crate::client::ClientConfig;
use crate::fees::extract_fees;
use crate::types::{FeeRecord, WalletResult};

/// Hard ceiling on pages ingested per wallet, counted on every path.
const MAX_PAGES: usize = 200;

/// Pause between successive pages, seconds.
const PAGE_PAUSE_MIN: f64 = 0.3;
const PAGE_PAUSE_MAX: f64 = 0.7;

/// What the driver should do after a page has been ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStep {
    /// Token advanced; pause briefly, then fetch the next page.
    Next,
    /// Page held only known records but carried a fresh token; refetch
    /// without pausing.
    Retry,
    /// Pagination is complete.
    Done,
}

/// Pagination state for one wallet.
///
/// Holds the continuation cursor, the set of request ids already seen, and
/// the fees accumulated so far. `ingest` is pure with respect to I/O, so
/// the whole stop/advance logic is testable without a network.
pub struct Paginator {
    wallet: String,
    target_recipient: String,
    continuation: Option<String>,
    seen_ids: HashSet<String>,
    fees: Vec<FeeRecord>,
    pages: usize,
}

impl Paginator {
    pub fn new(wallet: &str, target_recipient: &str) -> Self {
        Self {
            wallet: wallet.to_owned(),
            target_recipient: target_recipient.to_owned(),
            continuation: None,
            seen_ids: HashSet::new(),
            fees: Vec::new(),
            pages: 0,
        }
    }

    /// Cursor to send with the next fetch.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Ingest one fetched page: dedup its records, extract fees from the
    /// new ones, and advance the cursor.
    ///
    /// Records with a missing or empty `id` are dropped. A page of nothing
    /// but known records still moves the cursor forward when the API hands
    /// out a fresh token. Whatever the branch, the `MAX_PAGES`th page is
    /// always the last.
    pub fn ingest(&mut self, page: RequestsPage) -> PageStep {
        self.pages += 1;

        let Some(requests) = page.requests else {
            return PageStep::Done;
        };

        let mut fresh = Vec::new();
        let mut duplicates = 0usize;
        for request in requests {
            let id = request
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if id.is_empty() {
                continue;
            }
            if self.seen_ids.insert(id) {
                fresh.push(request);
            } else {
                duplicates += 1;
            }
        }
        debug!(
            "{}: page {}: {} new, {} duplicate",
            self.wallet,
            self.pages,
            fresh.len(),
            duplicates
        );

        // An empty-string token means the same as no token at all.
        let token = page.continuation.filter(|t| !t.is_empty());

        let step = if fresh.is_empty() {
            match token {
                Some(t) if self.continuation.as_deref() != Some(t.as_str()) => {
                    self.continuation = Some(t);
                    PageStep::Retry
                }
                _ => PageStep::Done,
            }
        } else {
            self.fees
                .extend(extract_fees(&fresh, &self.target_recipient));
            match token {
                Some(t) if self.continuation.as_deref() == Some(t.as_str()) => PageStep::Done,
                Some(t) => {
                    self.continuation = Some(t);
                    PageStep::Next
                }
                None => PageStep::Done,
            }
        };

        if self.pages >= MAX_PAGES {
            return PageStep::Done;
        }
        step
    }

    /// Finish the run, folding the accumulated fees into a result.
    pub fn into_result(self) -> WalletResult {
        WalletResult::new(self.wallet, self.fees)
    }
}

fn page_pause() -> Duration {
    let secs = rand::thread_rng().gen_range(PAGE_PAUSE_MIN..PAGE_PAUSE_MAX);
    Duration::from_secs_f64(secs)
}

/// Walk a wallet's full request history and aggregate its matching fees.
///
/// Fetch failures surface as a short history rather than an error; the
/// `Result` is the task boundary the orchestrator maps to a zero result.
pub async fn process_wallet(cfg: &ClientConfig, wallet: &str) -> Result<WalletResult> {
    let mut paginator = Paginator::new(wallet, TARGET_RECIPIENT);

    loop {
        let Some(page) = api::fetch_requests_page(cfg, wallet, paginator.continuation()).await
        else {
            break;
        };

        match paginator.ingest(page) {
            PageStep::Done => break,
            PageStep::Retry => {}
            PageStep::Next => tokio::time::sleep(page_pause()).await,
        }
    }

    Ok(paginator.into_result())
}
