//! The `{encode, send, decode}` contract the walk depends on, and its one
//! concrete implementation against the storefront's batch endpoint.
use async_trait::async_trait;
use playscout_common::AccessMode;
use std::sync::Arc;

use crate::decoder::{FallbackDecoder, PageResult, PatternDecoder, ResponseDecoder, StructuralDecoder};
use crate::encoder::{RandomRequestIds, RequestEncoder, RequestIdSource};
use crate::error::Result;
use crate::query::SearchQuery;
use crate::session::{SessionBootstrap, SessionInfo};
use crate::settings::{StoreSettings, TerminationPolicy};
use crate::transport::{Outbound, Transport, batch_headers};

/// Which page to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor<'a> {
    First,
    Next(&'a str),
}

#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Acquire the session every page call of this query will reuse.
    async fn bootstrap(&self, query: &SearchQuery) -> Result<SessionInfo>;

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        session: &SessionInfo,
        cursor: PageCursor<'_>,
    ) -> Result<PageResult>;

    fn termination(&self) -> TerminationPolicy;
}

/// Talks to the batch endpoint in either access mode.
pub struct BatchGateway {
    transport: Arc<dyn Transport>,
    settings: Arc<StoreSettings>,
    bootstrap: SessionBootstrap,
    encoder: RequestEncoder,
    decoder: Box<dyn ResponseDecoder>,
}

impl BatchGateway {
    pub fn new(transport: Arc<dyn Transport>, settings: StoreSettings) -> Self {
        let settings = Arc::new(settings);
        let decoder: Box<dyn ResponseDecoder> = match settings.mode {
            AccessMode::AuthenticatedRpc => Box::new(FallbackDecoder::new(
                Box::new(StructuralDecoder),
                Box::new(PatternDecoder),
            )),
            AccessMode::PublicScrape => Box::new(PatternDecoder),
        };
        Self {
            bootstrap: SessionBootstrap::new(transport.clone(), settings.clone()),
            encoder: RequestEncoder::new(settings.clone(), Arc::new(RandomRequestIds)),
            transport,
            settings,
            decoder,
        }
    }

    /// Replace the random `_reqid` generator.
    pub fn with_request_ids(mut self, ids: Arc<dyn RequestIdSource>) -> Self {
        self.encoder = RequestEncoder::new(self.settings.clone(), ids);
        self
    }
}

#[async_trait]
impl SearchGateway for BatchGateway {
    async fn bootstrap(&self, query: &SearchQuery) -> Result<SessionInfo> {
        self.bootstrap.acquire(&query.keyword, &query.country).await
    }

    async fn fetch_page(
        &self,
        query: &SearchQuery,
        session: &SessionInfo,
        cursor: PageCursor<'_>,
    ) -> Result<PageResult> {
        let encoded = match cursor {
            PageCursor::First => self
                .encoder
                .encode_first(&query.keyword, &query.country, session),
            PageCursor::Next(token) => self.encoder.encode_next(token, &query.country, session),
        };
        let op = encoded.op;
        let request = Outbound::post(self.settings.batch_path.clone(), encoded.query, encoded.body)
            .with_headers(batch_headers(&self.settings));

        let raw = self.transport.execute(request).await?;
        let page = self.decoder.decode(&raw);
        tracing::debug!(
            rpc = op.rpc_id(),
            decoder = self.decoder.name(),
            ids = page.ids.len(),
            has_token = page.token.is_some(),
            bytes = raw.len(),
            "search.page.decoded"
        );
        Ok(page)
    }

    fn termination(&self) -> TerminationPolicy {
        self.settings.termination
    }
}
