use btrc::{
    init_errors,
    init_logging,
};
use btrc_config::{
    Args,
    Config,
};
use clap::Parser;
use color_eyre::Result;

fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = Config::new(&args)?;
    let endpoint = match config.endpoint() {
        Ok(endpoint) => endpoint.to_string(),
        Err(err) => err.exit(),
    };

    btrc::run(&config, &endpoint, args.command)?;
    Ok(())
}
