use crate::Command;
use clap::{
    error::ErrorKind,
    CommandFactory,
    Parser,
};
use std::path::PathBuf;

/// Collects view btree and utilization stats from every node of a cluster.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = "Example: btrc -n 127.0.0.1:8091 -b default -c btree_stats"
)]
pub struct Args {
    /// Node address used to discover the cluster.
    #[arg(short = 'n', long, value_name = "HOST:PORT", env = "BTRC_NODE")]
    pub node: Option<String>,

    /// Bucket whose views are inspected [default: default].
    #[arg(short = 'b', long, value_name = "BUCKET")]
    pub bucket: Option<String>,

    /// Username for basic authentication.
    #[arg(short = 'u', long, value_name = "USERNAME", env = "BTRC_USERNAME")]
    pub username: Option<String>,

    /// Password for basic authentication.
    #[arg(short = 'p', long, value_name = "PASSWORD", env = "BTRC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Stats command.
    #[arg(short = 'c', long, value_enum)]
    pub command: Command,

    /// Directory the stats files are written to [default: .].
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Per request timeout. The HTTP client default applies when omitted.
    #[arg(long = "timeout", value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Enables debug logging.
    #[arg(short = 'v', long, action)]
    pub verbose: bool,
}

impl Args {
    /// A usage error rendered the same way clap reports its own validation failures.
    pub fn usage_error(message: impl std::fmt::Display) -> clap::Error {
        Self::command().error(ErrorKind::MissingRequiredArgument, message)
    }
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(node) = &self.node {
                cache.insert("node".to_string(), node.clone().into());
            }
            if let Some(bucket) = &self.bucket {
                cache.insert("bucket".to_string(), bucket.clone().into());
            }
            if let Some(username) = &self.username {
                cache.insert("username".to_string(), username.clone().into());
            }
            if let Some(password) = &self.password {
                cache.insert("password".to_string(), password.clone().into());
            }
            if let Some(output_dir) = &self.output_dir {
                cache.insert("output_dir".to_string(), output_dir.to_string_lossy().to_string().into());
            }
            if let Some(timeout_secs) = self.timeout_secs {
                cache.insert("timeout_secs".to_string(), timeout_secs.into());
            }
            Ok(cache)
        }
    }
}
