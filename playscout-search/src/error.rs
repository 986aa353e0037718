use playscout_http::HttpError;

use crate::query::ValidationError;

/// Terminal failures of a search walk.
///
/// Decoding never appears here: a page that cannot be understood decodes to
/// nothing and the walk decides what that means.
#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("authorization token {key} not found on {surface}; batch calls need a valid session token")]
    Session { key: &'static str, surface: String },

    #[error("storefront returned {status}: {excerpt}")]
    Transport { status: u16, excerpt: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request could not be built: {0}")]
    Request(String),

    /// The caller's cancellation fired. `partial` holds what had been collected.
    #[error("search cancelled after {pages} page(s)")]
    Cancelled { pages: u32, partial: Vec<String> },
}

impl From<HttpError> for SearchError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Api {
                status, message, ..
            } => SearchError::Transport {
                status: status.as_u16(),
                excerpt: message,
            },
            HttpError::Build(msg) | HttpError::Url(msg) => SearchError::Request(msg),
            HttpError::Network(msg) => SearchError::Network(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
