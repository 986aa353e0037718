//! Keyword search over the Play storefront's private batch endpoint.
//!
//! A walk bootstraps a session from the HTML search surface, then pages
//! through batch-RPC responses until the storefront runs out of continuation
//! tokens, the page cap is reached, or the caller cancels. Two access modes
//! share the same walk:
//!
//! - `AuthenticatedRpc`: work surface, signed bodies, structural decoding.
//! - `PublicScrape`: public surface, unsigned bodies, pattern decoding, stops
//!   on the first page that adds nothing new.
//!
//! ```no_run
//! use playscout_common::AccessMode;
//! use playscout_http::HttpClient;
//! use playscout_search::{BatchGateway, SearchQuery, SearchWalker, StoreSettings};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let settings = StoreSettings::for_mode(AccessMode::PublicScrape);
//! let client = HttpClient::new(&settings.base_url)?;
//! let walker = SearchWalker::new(BatchGateway::new(Arc::new(client), settings));
//! let query = SearchQuery::parse("vpn", "us")?;
//! let ids = walker.walk(&query, 5, &CancellationToken::new()).await?;
//! println!("{ids:?}");
//! # Ok(()) }
//! ```

pub mod classify;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod gateway;
pub mod query;
pub mod session;
pub mod settings;
pub mod transport;
pub mod walk;

pub use decoder::{PageResult, ResponseDecoder};
pub use encoder::{RandomRequestIds, RequestIdSource, SequentialRequestIds};
pub use error::{Result, SearchError};
pub use gateway::{BatchGateway, PageCursor, SearchGateway};
pub use query::{CountryCode, Keyword, SearchQuery, ValidationError};
pub use session::SessionInfo;
pub use settings::{StoreSettings, Surface, TerminationPolicy};
pub use transport::Transport;
pub use walk::{SearchWalker, StopReason, WalkReport};
