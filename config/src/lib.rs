#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod command;

pub use app_config::get_config_dir;
pub use args::Args;
pub use command::Command;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashMap,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

/// Connection and output settings. Layered from the built-in defaults, the optional
/// `config.yaml` in the config directory and finally the command line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const CONFIG_FILE: &str = "config.yaml";

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        if let Some(node) = &self.node {
            cache.insert("node".to_string(), node.clone().into());
        }
        cache.insert("bucket".to_string(), self.bucket.clone().into());
        if let Some(username) = &self.username {
            cache.insert("username".to_string(), username.clone().into());
        }
        if let Some(password) = &self.password {
            cache.insert("password".to_string(), password.clone().into());
        }
        cache.insert(
            "output_dir".to_string(),
            self.output_dir.to_string_lossy().to_string().into(),
        );
        if let Some(timeout_secs) = self.timeout_secs {
            cache.insert("timeout_secs".to_string(), timeout_secs.into());
        }
        Ok(cache)
    }
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        Self::load(args, &get_config_dir())
    }

    /// Like [`Config::new`] but reads `config.yaml` from `config_dir`.
    pub fn load(args: &Args, config_dir: &Path) -> Result<Self, config::ConfigError> {
        let config_file = config_dir.join(CONFIG_FILE);
        debug!(?config_file, exists = config_file.exists(), "loading configuration");

        let cfg: Self = config::Config::builder()
            .add_source(Config::default())
            .add_source(
                config::File::from(config_file)
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(args.clone())
            .build()?
            .try_deserialize()?;

        Ok(cfg)
    }

    /// The cluster endpoint; its absence is reported as a usage error.
    pub fn endpoint(&self) -> Result<&str, clap::Error> {
        self.node
            .as_deref()
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .ok_or_else(|| Args::usage_error("Missing node address [-n]"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
