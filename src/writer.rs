//! Saves stats payloads as one JSON file per (node, design document) pair.

use btrc_client::{
    ClusterClient,
    Node,
    StatSample,
    Transport,
    ViewDocId,
};
use btrc_config::Command;
use eyre::{
    bail,
    Context as _,
    Result,
};
use serde::Serialize as _;
use serde_json::{
    ser::PrettyFormatter,
    Serializer,
    Value,
};
use std::path::{
    Path,
    PathBuf,
};

const INDENT: &[u8] = b"    ";

#[derive(Debug, Clone)]
pub struct StatsWriter {
    output_dir: PathBuf,
}

impl StatsWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `{stats_type}_{node}{ddoc}.json` with `:` in the node and `/` in the design document
    /// id replaced by `_`.
    pub fn file_name(stats_type: &str, node: &Node, ddoc: &ViewDocId) -> String {
        format!(
            "{stats_type}_{}{}.json",
            node.to_string().replace(':', "_"),
            ddoc.as_str().replace('/', "_")
        )
    }

    /// Fetches the stats selected by `command` from every view target and saves them.
    /// Returns the written paths in the order the targets were visited.
    pub fn report_stats<T: Transport>(&self, client: &ClusterClient<T>, command: Command) -> Result<Vec<PathBuf>> {
        let samples = match command {
            Command::BtreeStats => client.fetch_btree_stats()?,
            Command::UtilStats => client.fetch_utilization_stats()?,
            Command::Reset => bail!("{command} does not produce stats files"),
        };
        self.write_all(command.as_ref(), samples)
    }

    pub fn write_all(&self, stats_type: &str, samples: impl IntoIterator<Item = StatSample>) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.output_dir)
            .wrap_err_with(|| format!("Failed to create output directory {:?}", self.output_dir))?;

        samples
            .into_iter()
            .map(|sample| self.write(stats_type, &sample))
            .collect()
    }

    /// Creates or overwrites the file for one sample.
    pub fn write(&self, stats_type: &str, sample: &StatSample) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(Self::file_name(stats_type, &sample.node, &sample.ddoc));
        info!("Saving {stats_type} stats to: {}", path.display());

        let content = to_sorted_json(&sample.payload).context("Failed to serialize stats")?;
        std::fs::write(&path, content).wrap_err_with(|| format!("Failed to write stats to {:?}", path))?;

        Ok(path)
    }
}

/// Pretty prints with a four space indent and object keys sorted at every depth.
pub fn to_sorted_json(value: &Value) -> serde_json::Result<String> {
    let mut value = value.clone();
    value.sort_all_objects();

    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;

    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
