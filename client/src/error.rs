use std::fmt;
use url::Url;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A request that never produced a complete response.
#[derive(thiserror::Error, Debug)]
#[error("Request to {url} failed")]
pub struct TransportError {
    pub url: Url,
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(url: &Url, source: impl Into<BoxError>) -> Self {
        Self {
            url: url.clone(),
            source: source.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Invalid cluster endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("Cannot establish connection with {url}")]
    Unreachable {
        url: Url,
        #[source]
        source: BoxError,
    },
    #[error("Node has no buckets/misconfigured")]
    MisconfiguredNode,
    #[error("Wrong bucket name: {0:?}")]
    WrongBucket(String),
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: Url, reason: String },
}

impl ClientError {
    pub(crate) fn unreachable(err: TransportError) -> Self {
        Self::Unreachable {
            url: err.url,
            source: err.source,
        }
    }

    pub(crate) fn malformed(url: &Url, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            url: url.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Displays an error followed by each of its sources, separated by `: `.
pub struct ErrorChain<'a>(pub &'a (dyn std::error::Error + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
