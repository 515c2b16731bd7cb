use crate::{
    ClientError,
    TransportError,
};
use std::{
    fmt,
    time::Duration,
};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a single request and waits for the complete response.
///
/// Only failures to get a response at all are errors; the status code is handed to the caller
/// untouched because the cluster reports most problems in the body.
pub trait Transport {
    fn send(&self, method: Method, url: &Url) -> Result<HttpResponse, TransportError>;
}

/// Basic auth credentials attached to every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Without a `timeout` the reqwest default applies.
    pub fn new(credentials: Option<Credentials>, timeout: Option<Duration>) -> Result<Self, ClientError> {
        let mut builder = reqwest::blocking::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ClientError::HttpClient)?;
        Ok(Self { client, credentials })
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, url: &Url) -> Result<HttpResponse, TransportError> {
        let mut request = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_deref());
        }

        let response = request.send().map_err(|err| TransportError::new(url, err))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|err| TransportError::new(url, err))?;
        trace!(%method, %url, status, bytes = body.len(), "response received");

        Ok(HttpResponse { status, body })
    }
}
