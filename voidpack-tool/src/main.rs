use anyhow::Context;
use clap::Parser;
use log::debug;
use std::path::Path;
use std::{collections::HashMap, env, fs};
use voidpack_lib::{Config, Manifest};

mod fs_utils;
mod hooks;
mod packaging;

use fs_utils::{check_size_limit, encode_size, plan_run, total_size};
use packaging::{Compressor, package_sync};

#[derive(Parser, Debug)]
#[command(author, version, about = "Urban Void game packager", long_about = None)]
pub struct Cli {
    /// Archive filename (can be defined via config/env)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Standalone file to package (can be specified multiple times,
    /// replaces the default manifest files)
    #[arg(short, long)]
    pub file: Vec<String>,

    /// Directory to package recursively (can be specified multiple times,
    /// replaces the default manifest directories)
    #[arg(short, long)]
    pub dir: Vec<String>,

    /// Patterns to skip (can be specified multiple times)
    #[arg(short = 's', long)]
    pub skip: Vec<String>,

    /// Store entries uncompressed instead of deflating them
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub store: bool,

    /// Dry run (just list files and parameters)
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub dry: bool,

    /// Size limit for the planned inputs, e.g. 512Ki, 10Mi, 2GB (0 = unlimited)
    #[arg(short, long)]
    pub max_size: Option<String>,

    /// Command to execute before packaging
    #[arg(short, long)]
    pub before: Option<String>,

    /// Command to execute after packaging
    #[arg(short, long)]
    pub after: Option<String>,

    /// Generate YAML config to stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub generate_yaml_config: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Step 1: Read environment
    let env_config = read_env();

    // Step 2: Read config file (if exists)
    let mut file_config = Config::default();
    if let Some(path) = cli.config.clone().or(env_config.config.clone()) {
        file_config = Config::from_file(&path)?;
    }

    // Step 3: Merge configs: env < file < CLI
    let merged = merge_configs(env_config, file_config, cli_to_config(&cli));
    debug!("resolved config: {merged:?}");

    if merged.output.as_deref() == Some("") {
        eprintln!(
            "Error: output archive name (--output or config:output or VOIDPACK_OUTPUT) must not be empty"
        );
        std::process::exit(2);
    }

    let manifest = Manifest::resolve(&merged);

    // Generate YAML config if requested
    if cli.generate_yaml_config {
        let yaml = serde_yaml::to_string(&merged)?;
        println!("{yaml}");
        return Ok(());
    }

    // Dry run: list the plan without touching the filesystem
    if merged.dry.unwrap_or(false) {
        println!("--- DRY RUN ---");
        println!("{}", serde_yaml::to_string(&merged)?);
        let plan = plan_run(&manifest, &merged)?;
        for missing in &plan.missing {
            println!("Warning: {missing} not found");
        }
        let total = total_size(&plan.entries)?;
        println!("Total files: {}", plan.entries.len());
        println!("Total size: {}", encode_size(total));
        for entry in &plan.entries {
            println!("{} -> {}", entry.path.display(), entry.name_in_archive);
        }
        return Ok(());
    }

    if let Some(command) = &merged.before {
        hooks::run_hook("before", command)?;
    }

    // The before hook may generate inputs, so the plan is computed after it
    let plan = plan_run(&manifest, &merged)?;
    for missing in &plan.missing {
        println!("Warning: {missing} not found");
    }

    let total = total_size(&plan.entries)?;
    check_size_limit(&merged, total)?;

    // Replace, never merge: a stale archive goes away before writing begins
    let archive = Path::new(&manifest.archive);
    if archive.exists() {
        fs::remove_file(archive)
            .with_context(|| format!("removing stale archive {}", archive.display()))?;
    }

    let compressor = if merged.store.unwrap_or(false) {
        Compressor::Stored
    } else {
        Compressor::Deflate
    };
    package_sync(archive, compressor, plan.entries)?;
    println!("Successfully created {}", manifest.archive);

    if let Some(command) = &merged.after {
        hooks::run_hook("after", command)?;
    }

    Ok(())
}

/// Reads environment variables prefixed with VOIDPACK_
fn read_env() -> Config {
    let mut cfg = Config::default();
    let vars: HashMap<String, String> = env::vars().collect();

    macro_rules! get_env {
        ($key:expr) => {
            vars.get(&format!("VOIDPACK_{}", $key)).cloned()
        };
    }

    cfg.output = get_env!("OUTPUT");
    cfg.config = get_env!("CONFIG");
    cfg.files = get_env!("FILES").map(split_list);
    cfg.dirs = get_env!("DIRS").map(split_list);
    cfg.skip = get_env!("SKIP").map(split_list);
    cfg.store = get_env!("STORE").map(truthy);
    cfg.dry = get_env!("DRY").map(truthy);
    cfg.max_size = get_env!("MAX_SIZE");
    cfg.before = get_env!("BEFORE");
    cfg.after = get_env!("AFTER");
    cfg.driver = get_env!("DRIVER");
    cfg
}

fn split_list(value: String) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn truthy(value: String) -> bool {
    value == "true" || value == "1" || value.eq_ignore_ascii_case("yes")
}

/// Converts CLI struct into Config. Unset flags stay None so they do not
/// shadow config-file or environment values during the merge.
fn cli_to_config(cli: &Cli) -> Config {
    Config {
        output: cli.output.clone(),
        config: cli.config.clone(),
        files: if cli.file.is_empty() {
            None
        } else {
            Some(cli.file.clone())
        },
        dirs: if cli.dir.is_empty() {
            None
        } else {
            Some(cli.dir.clone())
        },
        skip: if cli.skip.is_empty() {
            None
        } else {
            Some(cli.skip.clone())
        },
        store: cli.store.then_some(true),
        dry: cli.dry.then_some(true),
        max_size: cli.max_size.clone(),
        before: cli.before.clone(),
        after: cli.after.clone(),
        driver: None,
    }
}

/// Merge configs by priority: env < file < cli
fn merge_configs(env: Config, file: Config, cli: Config) -> Config {
    fn pick<T: Clone>(env: Option<T>, file: Option<T>, cli: Option<T>) -> Option<T> {
        cli.or(file).or(env)
    }

    Config {
        output: pick(env.output, file.output, cli.output),
        config: pick(env.config, file.config, cli.config),
        files: pick(env.files, file.files, cli.files),
        dirs: pick(env.dirs, file.dirs, cli.dirs),
        skip: pick(env.skip, file.skip, cli.skip),
        store: pick(env.store, file.store, cli.store),
        dry: pick(env.dry, file.dry, cli.dry),
        max_size: pick(env.max_size, file.max_size, cli.max_size),
        before: pick(env.before, file.before, cli.before),
        after: pick(env.after, file.after, cli.after),
        driver: pick(env.driver, file.driver, cli.driver),
    }
}
