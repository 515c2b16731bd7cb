use crate::{
    error::ErrorChain,
    ClientError,
    Credentials,
    HttpResponse,
    HttpTransport,
    Method,
    Node,
    StatKind,
    StatSample,
    Transport,
    ViewDocId,
    ViewTarget,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const RESET_ENDPOINT: &str = "_reset_utilization_stats";

#[derive(Debug, Deserialize)]
struct PoolDetails {
    #[serde(default)]
    nodes: Option<Vec<PoolNode>>,
}

#[derive(Debug, Deserialize)]
struct PoolNode {
    hostname: String,
}

#[derive(Debug, Deserialize)]
struct DesignDocs {
    rows: Vec<DesignDocRow>,
}

#[derive(Debug, Deserialize)]
struct DesignDocRow {
    doc: DesignDoc,
}

#[derive(Debug, Deserialize)]
struct DesignDoc {
    meta: DesignDocMeta,
}

#[derive(Debug, Deserialize)]
struct DesignDocMeta {
    id: String,
}

/// Outcome of resetting the utilization stats of every view target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub reset: usize,
    pub skipped: usize,
}

/// Talks to one cluster member for topology and to every node's view engine for stats.
///
/// Nothing is cached between calls: every operation rediscovers nodes and design documents.
#[derive(Debug)]
pub struct ClusterClient<T = HttpTransport> {
    base_url: Url,
    bucket: String,
    transport: T,
}

impl ClusterClient<HttpTransport> {
    pub fn connect(
        endpoint: &str,
        bucket: impl Into<String>,
        credentials: Option<Credentials>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        Self::with_transport(endpoint, bucket, HttpTransport::new(credentials, timeout)?)
    }
}

impl<T: Transport> ClusterClient<T> {
    /// `endpoint` is a `host:port` pair; a full `http://` URL is accepted as well.
    pub fn with_transport(endpoint: &str, bucket: impl Into<String>, transport: T) -> Result<Self, ClientError> {
        let url = if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("http://{endpoint}")
        };
        let base_url = Url::parse(&url).map_err(|source| ClientError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Self {
            base_url,
            bucket: bucket.into(),
            transport,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn cluster_url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|source| ClientError::InvalidEndpoint {
                endpoint: format!("{}{path}", self.base_url),
                source,
            })
    }

    fn request(&self, method: Method, url: &Url) -> Result<HttpResponse, ClientError> {
        debug!(%method, %url, "sending request");
        self.transport.send(method, url).map_err(ClientError::unreachable)
    }

    /// Lists the view endpoint of every node in the cluster.
    #[instrument(level = "debug", skip(self), fields(endpoint = %self.base_url))]
    pub fn discover_nodes(&self) -> Result<Vec<Node>, ClientError> {
        let url = self.cluster_url("/pools/default/")?;
        let response = self.request(Method::Get, &url)?;

        let value: Value = serde_json::from_str(&response.body).map_err(|err| ClientError::malformed(&url, err))?;
        if value.is_null() {
            return Err(ClientError::MisconfiguredNode);
        }
        let details: PoolDetails = serde_json::from_value(value).map_err(|err| ClientError::malformed(&url, err))?;
        let pool_nodes = details.nodes.ok_or(ClientError::MisconfiguredNode)?;

        let nodes = pool_nodes
            .iter()
            .map(|node| {
                Node::from_advertised(&node.hostname).ok_or_else(|| {
                    ClientError::malformed(&url, format!("node hostname {:?} has no port", node.hostname))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = nodes.len(), "discovered nodes");

        Ok(nodes)
    }

    /// Lists the design documents of the configured bucket.
    ///
    /// A body that is not JSON yields no documents; a `null` body or one without `rows` means
    /// the bucket does not exist.
    #[instrument(level = "debug", skip(self), fields(bucket = %self.bucket))]
    pub fn discover_view_documents(&self) -> Result<Vec<ViewDocId>, ClientError> {
        let url = self.cluster_url(&format!("/pools/default/buckets/{}/ddocs", self.bucket))?;
        let response = self.request(Method::Get, &url)?;

        let value: Value = match serde_json::from_str(&response.body) {
            Ok(value) => value,
            Err(err) => {
                warn!(%url, status = response.status, "Ignoring design document listing that is not JSON: {err}");
                return Ok(Vec::new());
            }
        };
        if value.is_null() {
            return Err(ClientError::WrongBucket(self.bucket.clone()));
        }
        let listing: DesignDocs =
            serde_json::from_value(value).map_err(|_| ClientError::WrongBucket(self.bucket.clone()))?;

        let ddocs: Vec<ViewDocId> = listing
            .rows
            .into_iter()
            .map(|row| ViewDocId::new(row.doc.meta.id))
            .collect();
        debug!(count = ddocs.len(), "discovered design documents");

        Ok(ddocs)
    }

    /// Cross product of nodes and design documents, nodes first. Design documents are listed
    /// once and reused for every node.
    pub fn build_view_targets(&self) -> Result<Vec<ViewTarget>, ClientError> {
        let nodes = self.discover_nodes()?;
        let ddocs = self.discover_view_documents()?;

        let mut targets = Vec::with_capacity(nodes.len() * ddocs.len());
        for node in &nodes {
            for ddoc in &ddocs {
                let target = ViewTarget::new(node.clone(), ddoc.clone(), &self.bucket).map_err(|err| {
                    ClientError::MalformedResponse {
                        url: self.base_url.clone(),
                        reason: format!("cannot build view URL for {node} and {ddoc}: {err}"),
                    }
                })?;
                targets.push(target);
            }
        }

        Ok(targets)
    }

    pub fn fetch_btree_stats(&self) -> Result<StatsIter<'_, T>, ClientError> {
        self.fetch_stats(StatKind::Btree)
    }

    pub fn fetch_utilization_stats(&self) -> Result<StatsIter<'_, T>, ClientError> {
        self.fetch_stats(StatKind::Utilization)
    }

    /// Discovers all view targets up front, then requests their stats one at a time as the
    /// returned iterator is advanced.
    pub fn fetch_stats(&self, kind: StatKind) -> Result<StatsIter<'_, T>, ClientError> {
        let targets = self.build_view_targets()?;
        Ok(StatsIter {
            client: self,
            kind,
            targets: targets.into_iter(),
        })
    }

    fn fetch_target(&self, target: &ViewTarget, kind: StatKind) -> Result<Value, ClientError> {
        let url = target
            .endpoint(kind.endpoint())
            .map_err(|err| ClientError::malformed(&target.base_url, err))?;
        let response = self.request(Method::Get, &url)?;
        serde_json::from_str(&response.body).map_err(|err| ClientError::malformed(&url, err))
    }

    /// Resets the utilization stats of every view target. Unreachable targets are skipped.
    pub fn reset_utilization_stats(&self) -> Result<ResetSummary, ClientError> {
        let mut summary = ResetSummary::default();

        for target in self.build_view_targets()? {
            let result = target
                .endpoint(RESET_ENDPOINT)
                .map_err(|err| ClientError::malformed(&target.base_url, err))
                .and_then(|url| self.request(Method::Post, &url));
            match result {
                Ok(response) => {
                    debug!(node = %target.node, ddoc = %target.ddoc, status = response.status, "reset utilization stats");
                    summary.reset += 1;
                }
                Err(err) => {
                    warn!(node = %target.node, ddoc = %target.ddoc, "Skipping utilization stats reset: {}", ErrorChain(&err));
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Lazily fetches the stats of each view target. Targets that cannot be reached or that do
/// not answer with JSON are logged and skipped.
#[derive(Debug)]
pub struct StatsIter<'a, T> {
    client: &'a ClusterClient<T>,
    kind: StatKind,
    targets: std::vec::IntoIter<ViewTarget>,
}

impl<T: Transport> Iterator for StatsIter<'_, T> {
    type Item = StatSample;

    fn next(&mut self) -> Option<Self::Item> {
        for target in self.targets.by_ref() {
            match self.client.fetch_target(&target, self.kind) {
                Ok(payload) => {
                    return Some(StatSample {
                        node: target.node,
                        ddoc: target.ddoc,
                        payload,
                    })
                }
                Err(err) => {
                    warn!(node = %target.node, ddoc = %target.ddoc, "Skipping view stats: {}", ErrorChain(&err));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.targets.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StubTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const POOLS: &str = "http://10.0.0.1:8091/pools/default/";
    const DDOCS: &str = "http://10.0.0.1:8091/pools/default/buckets/default/ddocs";

    fn topology(hostnames: &[&str]) -> Value {
        json!({
            "name": "default",
            "nodes": hostnames.iter().map(|h| json!({ "hostname": h, "status": "healthy" })).collect::<Vec<_>>(),
        })
    }

    fn ddocs(ids: &[&str]) -> Value {
        json!({
            "rows": ids.iter().map(|id| json!({ "doc": { "meta": { "id": id, "rev": "1-abc" }, "json": {} } })).collect::<Vec<_>>(),
        })
    }

    fn client(stub: StubTransport) -> ClusterClient<StubTransport> {
        ClusterClient::with_transport("10.0.0.1:8091", "default", stub).unwrap()
    }

    #[test]
    fn discovers_every_advertised_node() {
        let stub = StubTransport::new().with_json(
            Method::Get,
            POOLS,
            &topology(&["10.0.0.1:8091", "10.0.0.2:8091", "127.0.0.1:9001"]),
        );
        let nodes = client(stub).discover_nodes().unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::new("10.0.0.1", 8092),
                Node::new("10.0.0.2", 8092),
                Node::new("127.0.0.1", 9500),
            ]
        );
    }

    #[test]
    fn null_topology_is_fatal_and_stops_there() {
        let stub = StubTransport::new()
            .with_body(Method::Get, POOLS, "null")
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a"]));
        let client = client(stub);

        let err = client.fetch_btree_stats().unwrap_err();
        assert!(matches!(err, ClientError::MisconfiguredNode), "{err:?}");
        assert_eq!(client.transport().requests().len(), 1);
    }

    #[test]
    fn topology_without_nodes_is_misconfigured() {
        let stub = StubTransport::new().with_json(Method::Get, POOLS, &json!({ "name": "default" }));
        let err = client(stub).discover_nodes().unwrap_err();
        assert!(matches!(err, ClientError::MisconfiguredNode), "{err:?}");
    }

    #[test]
    fn unreachable_cluster_is_fatal() {
        let err = client(StubTransport::new()).discover_nodes().unwrap_err();
        assert!(matches!(err, ClientError::Unreachable { .. }), "{err:?}");
        assert!(err.to_string().contains("10.0.0.1:8091"));
    }

    #[test]
    fn topology_that_is_not_json_is_malformed() {
        let stub = StubTransport::new().with_body(Method::Get, POOLS, "<html>Unauthorized</html>");
        let err = client(stub).discover_nodes().unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse { .. }), "{err:?}");
    }

    #[test]
    fn lists_design_documents() {
        let stub = StubTransport::new().with_json(Method::Get, DDOCS, &ddocs(&["_design/a", "_design/dev_b"]));
        let ddocs = client(stub).discover_view_documents().unwrap();
        assert_eq!(ddocs, vec![ViewDocId::from("_design/a"), ViewDocId::from("_design/dev_b")]);
    }

    #[test]
    fn design_document_listing_that_is_not_json_is_empty() {
        let stub = StubTransport::new().with_body(Method::Get, DDOCS, "Requested resource not found.");
        assert_eq!(client(stub).discover_view_documents().unwrap(), vec![]);
    }

    #[test]
    fn null_design_document_listing_means_wrong_bucket() {
        let stub = StubTransport::new().with_body(Method::Get, DDOCS, "null");
        let err = client(stub).discover_view_documents().unwrap_err();
        assert!(matches!(err, ClientError::WrongBucket(ref bucket) if bucket == "default"), "{err:?}");
    }

    #[test]
    fn error_object_instead_of_listing_means_wrong_bucket() {
        let stub = StubTransport::new().with_json(Method::Get, DDOCS, &json!({ "error": "not_found" }));
        let err = client(stub).discover_view_documents().unwrap_err();
        assert!(matches!(err, ClientError::WrongBucket(_)), "{err:?}");
    }

    #[test]
    fn view_targets_are_the_cross_product() {
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091", "10.0.0.2:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a", "_design/b", "_design/c"]));
        let client = client(stub);

        let targets = client.build_view_targets().unwrap();
        assert_eq!(targets.len(), 6);
        assert_eq!(
            targets
                .iter()
                .map(|t| (t.node.to_string(), t.ddoc.to_string()))
                .collect::<Vec<_>>(),
            vec![
                ("10.0.0.1:8092".to_string(), "_design/a".to_string()),
                ("10.0.0.1:8092".to_string(), "_design/b".to_string()),
                ("10.0.0.1:8092".to_string(), "_design/c".to_string()),
                ("10.0.0.2:8092".to_string(), "_design/a".to_string()),
                ("10.0.0.2:8092".to_string(), "_design/b".to_string()),
                ("10.0.0.2:8092".to_string(), "_design/c".to_string()),
            ]
        );
        // Design documents are listed once, not once per node.
        assert_eq!(client.transport().count(Method::Get, DDOCS), 1);
    }

    #[test]
    fn fetches_btree_stats_per_target() {
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/dev_view1"]))
            .with_json(
                Method::Get,
                "http://10.0.0.1:8092/_set_view/default/_design/dev_view1/_btree_stats",
                &json!({ "id_btree": { "kv_count": 10 } }),
            );
        let client = client(stub);

        let samples: Vec<_> = client.fetch_btree_stats().unwrap().collect();
        assert_eq!(
            samples,
            vec![StatSample {
                node: Node::new("10.0.0.1", 8092),
                ddoc: "_design/dev_view1".into(),
                payload: json!({ "id_btree": { "kv_count": 10 } }),
            }]
        );
    }

    #[test]
    fn utilization_stats_use_get() {
        let url = "http://10.0.0.1:8092/_set_view/default/_design/a/_get_utilization_stats";
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a"]))
            .with_json(Method::Get, url, &json!({ "stats": [] }));
        let client = client(stub);

        let samples: Vec<_> = client.fetch_utilization_stats().unwrap().collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(client.transport().count(Method::Get, url), 1);
        assert_eq!(client.transport().count(Method::Post, url), 0);
    }

    #[test]
    fn unreachable_targets_are_skipped() {
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091", "10.0.0.2:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a"]))
            .with_unreachable(Method::Get, "http://10.0.0.1:8092/_set_view/default/_design/a/_btree_stats")
            .with_json(
                Method::Get,
                "http://10.0.0.2:8092/_set_view/default/_design/a/_btree_stats",
                &json!({ "ok": true }),
            );

        let samples: Vec<_> = client(stub).fetch_btree_stats().unwrap().collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].node, Node::new("10.0.0.2", 8092));
    }

    fn two_node_cluster() -> StubTransport {
        StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091", "10.0.0.2:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a"]))
    }

    #[test]
    fn btree_stats_that_are_not_json_are_skipped() {
        let stub = two_node_cluster()
            .with_body(
                Method::Get,
                "http://10.0.0.1:8092/_set_view/default/_design/a/_btree_stats",
                "<html>oops</html>",
            )
            .with_json(
                Method::Get,
                "http://10.0.0.2:8092/_set_view/default/_design/a/_btree_stats",
                &json!({ "id_btree": { "kv_count": 3 } }),
            );

        let samples: Vec<_> = client(stub).fetch_btree_stats().unwrap().collect();
        assert_eq!(
            samples,
            vec![StatSample {
                node: Node::new("10.0.0.2", 8092),
                ddoc: "_design/a".into(),
                payload: json!({ "id_btree": { "kv_count": 3 } }),
            }]
        );
    }

    #[test]
    fn utilization_stats_that_are_not_json_are_skipped() {
        let stub = two_node_cluster()
            .with_json(
                Method::Get,
                "http://10.0.0.1:8092/_set_view/default/_design/a/_get_utilization_stats",
                &json!({ "stats": [] }),
            )
            .with_body(
                Method::Get,
                "http://10.0.0.2:8092/_set_view/default/_design/a/_get_utilization_stats",
                "{\"truncated\": ",
            );

        let samples: Vec<_> = client(stub).fetch_utilization_stats().unwrap().collect();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].node, Node::new("10.0.0.1", 8092));
        assert_eq!(samples[0].payload, json!({ "stats": [] }));
    }

    #[test]
    fn stats_are_requested_lazily() {
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a", "_design/b"]))
            .with_json(
                Method::Get,
                "http://10.0.0.1:8092/_set_view/default/_design/a/_btree_stats",
                &json!({}),
            )
            .with_json(
                Method::Get,
                "http://10.0.0.1:8092/_set_view/default/_design/b/_btree_stats",
                &json!({}),
            );
        let client = client(stub);

        let mut stats = client.fetch_btree_stats().unwrap();
        assert_eq!(client.transport().requests().len(), 2);
        stats.next().unwrap();
        assert_eq!(client.transport().requests().len(), 3);
        stats.next().unwrap();
        assert!(stats.next().is_none());
        assert_eq!(client.transport().requests().len(), 4);
    }

    #[test]
    fn reset_posts_once_per_target() {
        let stub = StubTransport::new()
            .with_json(Method::Get, POOLS, &topology(&["10.0.0.1:8091", "10.0.0.2:9000"]))
            .with_json(Method::Get, DDOCS, &ddocs(&["_design/a", "_design/b"]))
            .with_body(
                Method::Post,
                "http://10.0.0.1:8092/_set_view/default/_design/a/_reset_utilization_stats",
                "",
            )
            .with_body(
                Method::Post,
                "http://10.0.0.1:8092/_set_view/default/_design/b/_reset_utilization_stats",
                "",
            )
            .with_body(
                Method::Post,
                "http://10.0.0.2:9500/_set_view/default/_design/a/_reset_utilization_stats",
                "",
            );
        let client = client(stub);

        let summary = client.reset_utilization_stats().unwrap();
        assert_eq!(summary, ResetSummary { reset: 3, skipped: 1 });

        let posts: Vec<_> = client
            .transport()
            .requests()
            .into_iter()
            .filter(|(method, _)| *method == Method::Post)
            .map(|(_, url)| url)
            .collect();
        assert_eq!(
            posts,
            vec![
                "http://10.0.0.1:8092/_set_view/default/_design/a/_reset_utilization_stats",
                "http://10.0.0.1:8092/_set_view/default/_design/b/_reset_utilization_stats",
                "http://10.0.0.2:9500/_set_view/default/_design/a/_reset_utilization_stats",
                "http://10.0.0.2:9500/_set_view/default/_design/b/_reset_utilization_stats",
            ]
        );
    }

    #[test]
    fn accepts_full_urls_as_endpoint() {
        let client = ClusterClient::with_transport("http://10.0.0.1:8091", "beer-sample", StubTransport::new()).unwrap();
        assert_eq!(client.bucket(), "beer-sample");
        assert_eq!(
            client.cluster_url("/pools/default/").unwrap().as_str(),
            "http://10.0.0.1:8091/pools/default/"
        );
    }
}
