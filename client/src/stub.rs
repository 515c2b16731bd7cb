use crate::{
    HttpResponse,
    Method,
    Transport,
    TransportError,
};
use std::{
    collections::HashMap,
    io,
    sync::{
        Mutex,
        PoisonError,
    },
};
use url::Url;

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Unreachable,
}

/// In-memory transport answering from a table of canned replies and recording every request.
/// Requests without a canned reply fail as if the connection was refused.
#[derive(Debug, Default)]
pub struct StubTransport {
    replies: HashMap<(Method, String), Reply>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, method: Method, url: &str, body: impl Into<String>) -> Self {
        self.replies
            .insert((method, url.to_string()), Reply::Body(body.into()));
        self
    }

    pub fn with_json(self, method: Method, url: &str, body: &serde_json::Value) -> Self {
        self.with_body(method, url, body.to_string())
    }

    pub fn with_unreachable(mut self, method: Method, url: &str) -> Self {
        self.replies.insert((method, url.to_string()), Reply::Unreachable);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, u)| *m == method && u == url)
            .count()
    }
}

impl Transport for StubTransport {
    fn send(&self, method: Method, url: &Url) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method, url.to_string()));

        match self.replies.get(&(method, url.to_string())) {
            Some(Reply::Body(body)) => Ok(HttpResponse {
                status: 200,
                body: body.clone(),
            }),
            Some(Reply::Unreachable) | None => Err(TransportError::new(
                url,
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}
