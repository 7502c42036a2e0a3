use anyhow::Result;
use clap::Parser;
use voidpack_lib::{Config, DEFAULT_DRIVER};

mod runner;
mod spec;

use spec::CheckSpec;

#[derive(Parser, Debug)]
#[command(author, version, about = "Urban Void UI smoke checks", long_about = None)]
struct Cli {
    /// Browser driver command; the compiled payload path is appended as its
    /// final argument
    #[arg(long, env = "VOIDPACK_DRIVER")]
    driver: Option<String>,

    /// Configuration file (YAML or JSON), consulted for the driver setting
    #[arg(short, long)]
    config: Option<String>,

    /// Check spec files (YAML)
    #[arg(required = true)]
    specs: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let driver = cli
        .driver
        .clone()
        .or(file_config.driver)
        .unwrap_or_else(|| DEFAULT_DRIVER.to_string());

    // Checks run in order; the first failure stops the rest, there is no
    // partial-pass reporting
    for path in &cli.specs {
        let check = CheckSpec::load(path)?;
        runner::run_check(&check, &driver)?;
    }

    Ok(())
}
