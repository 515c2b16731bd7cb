use serde_json::Value;
use std::fmt;
use url::Url;

/// A node's view engine endpoint.
///
/// The cluster advertises the management port of every node; the view engine listens on
/// `8092` next to the default management port `8091` and on `9500` for everything else
/// (cluster_run style development nodes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    hostname: String,
    port: u16,
}

impl Node {
    pub const MANAGEMENT_PORT: &'static str = "8091";
    pub const VIEW_PORT: u16 = 8092;
    pub const DEV_VIEW_PORT: u16 = 9500;

    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Derives the view endpoint from an advertised `hostname:port`. Returns `None` when the
    /// port is missing.
    pub fn from_advertised(advertised: &str) -> Option<Self> {
        let (hostname, port) = advertised.rsplit_once(':')?;
        let port = if port == Self::MANAGEMENT_PORT {
            Self::VIEW_PORT
        } else {
            Self::DEV_VIEW_PORT
        };
        Some(Self::new(hostname, port))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

/// Identifier of a design document, e.g. `_design/dev_view1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewDocId(String);

impl ViewDocId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewDocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewDocId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One (node, design document) pair and the `_set_view` URL serving it. `base_url` always
/// ends with a slash so endpoint names can be joined onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTarget {
    pub node: Node,
    pub ddoc: ViewDocId,
    pub base_url: Url,
}

impl ViewTarget {
    pub fn new(node: Node, ddoc: ViewDocId, bucket: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(&format!("http://{node}/_set_view/{bucket}/{ddoc}/"))?;
        Ok(Self { node, ddoc, base_url })
    }

    pub fn endpoint(&self, name: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Btree,
    Utilization,
}

impl StatKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            StatKind::Btree => "_btree_stats",
            StatKind::Utilization => "_get_utilization_stats",
        }
    }
}

/// Stats payload of one view target. The payload is kept as opaque JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct StatSample {
    pub node: Node,
    pub ddoc: ViewDocId,
    pub payload: Value,
}
