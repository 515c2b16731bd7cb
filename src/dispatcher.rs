use crate::StatsWriter;
use btrc_client::{
    ClusterClient,
    Credentials,
    ResetSummary,
    Transport,
};
use btrc_config::{
    Command,
    Config,
};
use eyre::Result;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved(Vec<PathBuf>),
    Reset(ResetSummary),
}

/// Runs `command` against the cluster described by `config`.
pub fn run(config: &Config, endpoint: &str, command: Command) -> Result<Outcome> {
    let credentials = credentials(config);
    info!(endpoint, bucket = %config.bucket, authenticated = credentials.is_some(), %command, "starting");

    let client = ClusterClient::connect(endpoint, config.bucket.clone(), credentials, config.timeout())?;
    let writer = StatsWriter::new(&config.output_dir);
    execute(&client, &writer, command)
}

/// Basic auth needs a username; a lone password is ignored with a warning.
pub fn credentials(config: &Config) -> Option<Credentials> {
    match (&config.username, &config.password) {
        (Some(username), password) => Some(Credentials::new(username.clone(), password.clone())),
        (None, Some(_)) => {
            warn!("Ignoring password without a username [-u]; requests are sent unauthenticated");
            None
        }
        (None, None) => None,
    }
}

pub fn execute<T: Transport>(client: &ClusterClient<T>, writer: &StatsWriter, command: Command) -> Result<Outcome> {
    match command {
        Command::BtreeStats | Command::UtilStats => {
            let paths = writer.report_stats(client, command)?;
            info!(files = paths.len(), output_dir = ?writer.output_dir(), "{command} saved");
            Ok(Outcome::Saved(paths))
        }
        Command::Reset => {
            let summary = client.reset_utilization_stats()?;
            info!(reset = summary.reset, skipped = summary.skipped, "utilization stats reset");
            Ok(Outcome::Reset(summary))
        }
    }
}
