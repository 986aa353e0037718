//! Pagination: drive the gateway page after page and fold the results into one
//! ordered, duplicate-free list.
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::decoder::PageResult;
use crate::error::{Result, SearchError};
use crate::gateway::{PageCursor, SearchGateway};
use crate::query::SearchQuery;
use crate::settings::TerminationPolicy;

/// `max_pages` at or below zero means a single page.
pub fn normalize_max_pages(max_pages: i64) -> u32 {
    if max_pages <= 0 {
        1
    } else {
        u32::try_from(max_pages).unwrap_or(u32::MAX)
    }
}

/// Why a walk ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No continuation token came back.
    Exhausted,
    PageCap,
    /// A page added nothing new under [`TerminationPolicy::StalePage`].
    StalePage,
    /// The storefront handed back the token it was just given.
    RepeatedToken,
}

/// The accumulator of one walk. Owned by the walk and dropped with it.
#[derive(Debug, Default)]
pub struct WalkState {
    ids: Vec<String>,
    seen: HashSet<String>,
    pages: u32,
    token: Option<String>,
    repeated_token: bool,
}

impl WalkState {
    /// Fold one page in; returns how many identifiers were new.
    pub fn absorb(&mut self, page: PageResult) -> usize {
        self.pages += 1;
        let mut added = 0;
        for id in page.ids {
            if !self.seen.contains(&id) {
                self.seen.insert(id.clone());
                self.ids.push(id);
                added += 1;
            }
        }
        let next = page.token.filter(|t| !t.trim().is_empty());
        self.repeated_token = next.is_some() && next == self.token;
        self.token = if self.repeated_token { None } else { next };
        added
    }

    fn cancelled(&self) -> SearchError {
        SearchError::Cancelled {
            pages: self.pages,
            partial: self.ids.clone(),
        }
    }
}

/// Outcome of a completed walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub ids: Vec<String>,
    pub pages: u32,
    pub stop: StopReason,
}

/// Mode-agnostic pagination over any [`SearchGateway`].
pub struct SearchWalker<G> {
    gateway: G,
}

impl<G: SearchGateway> SearchWalker<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Validate raw inputs, then walk. Invalid input never reaches the network.
    pub async fn search(
        &self,
        keyword: &str,
        country: &str,
        max_pages: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let query = SearchQuery::parse(keyword, country)?;
        self.walk(&query, max_pages, cancel).await
    }

    /// Ordered, de-duplicated identifiers across at most `max_pages` page calls.
    pub async fn walk(
        &self,
        query: &SearchQuery,
        max_pages: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        self.walk_report(query, max_pages, cancel)
            .await
            .map(|report| report.ids)
    }

    pub async fn walk_report(
        &self,
        query: &SearchQuery,
        max_pages: i64,
        cancel: &CancellationToken,
    ) -> Result<WalkReport> {
        let max_pages = normalize_max_pages(max_pages);
        let policy = self.gateway.termination();
        let mut state = WalkState::default();

        tracing::info!(
            keyword = %query.keyword,
            country = %query.country,
            max_pages,
            policy = ?policy,
            "search.walk.start"
        );

        let session = guarded(cancel, &state, self.gateway.bootstrap(query)).await?;
        let first = guarded(
            cancel,
            &state,
            self.gateway.fetch_page(query, &session, PageCursor::First),
        )
        .await?;
        let mut added = state.absorb(first);
        log_page(&state, added);

        let stop = loop {
            if policy == TerminationPolicy::StalePage && added == 0 {
                break StopReason::StalePage;
            }
            if state.repeated_token {
                tracing::warn!(
                    page = state.pages,
                    "search.walk.token_repeated"
                );
                break StopReason::RepeatedToken;
            }
            let Some(token) = state.token.clone() else {
                break StopReason::Exhausted;
            };
            if state.pages >= max_pages {
                break StopReason::PageCap;
            }
            let page = guarded(
                cancel,
                &state,
                self.gateway
                    .fetch_page(query, &session, PageCursor::Next(&token)),
            )
            .await?;
            added = state.absorb(page);
            log_page(&state, added);
        };

        tracing::info!(
            pages = state.pages,
            total = state.ids.len(),
            stop = ?stop,
            "search.walk.done"
        );
        Ok(WalkReport {
            pages: state.pages,
            ids: state.ids,
            stop,
        })
    }
}

/// Refuse to start `call` once cancelled, and abandon it if cancellation fires mid-flight.
async fn guarded<T>(
    cancel: &CancellationToken,
    state: &WalkState,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    if cancel.is_cancelled() {
        return Err(cancelled(state));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled(state)),
        res = call => res,
    }
}

fn cancelled(state: &WalkState) -> SearchError {
    tracing::info!(
        pages = state.pages,
        collected = state.ids.len(),
        "search.walk.cancelled"
    );
    state.cancelled()
}

fn log_page(state: &WalkState, added: usize) {
    tracing::debug!(
        page = state.pages,
        added,
        total = state.ids.len(),
        has_token = state.token.is_some(),
        "search.walk.page"
    );
}
