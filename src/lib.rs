//! # btrc
//!
//! Collects view statistics from every node of a cluster:
//!
//! 1. Discovers the nodes through `/pools/default/`
//! 2. Lists the design documents of a bucket
//! 3. Fetches `_btree_stats` or `_get_utilization_stats` of every (node, design document) pair
//!    and saves each payload to a JSON file, or resets the utilization stats
//!
//! ```bash
//! btrc -n 127.0.0.1:8091 -b default -c btree_stats
//! btrc -n 127.0.0.1:8091 -u Administrator -p password -c reset
//! ```

#[macro_use]
extern crate tracing;

pub mod dispatcher;
pub mod logging;
pub mod writer;

pub use dispatcher::{
    execute,
    run,
    Outcome,
};
pub use logging::init_logging;
pub use writer::StatsWriter;

pub fn init_errors() -> color_eyre::Result<()> {
    color_eyre::install()
}
