use anyhow::{Context, Result, anyhow};
use log::debug;
use serde::Serialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::spec::{CheckSpec, CheckStep};

/// What the driver receives: the check with the page resolved to a URL the
/// browser can open directly.
#[derive(Debug, Serialize)]
struct DriverPayload<'a> {
    name: &'a str,
    url: String,
    settle_ms: u64,
    steps: &'a [CheckStep],
}

/// Compiles the check into a driver payload, prepares the filesystem and
/// hands the payload to the driver command. A non-zero driver exit fails the
/// check immediately.
pub fn run_check(check: &CheckSpec, driver: &str) -> Result<()> {
    // Screenshot directories must exist before the browser tries to write
    for step in &check.steps {
        if let CheckStep::Screenshot { path } = step {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("creating screenshot directory {}", parent.display())
                })?;
            }
        }
    }

    let payload = DriverPayload {
        name: &check.name,
        url: page_url(&check.page)?,
        settle_ms: check.settle_ms,
        steps: &check.steps,
    };
    let payload_path = ensure_payload_dir()?.join(format!("{}.json", check.name));
    std::fs::write(&payload_path, serde_json::to_vec_pretty(&payload)?)
        .with_context(|| format!("writing {}", payload_path.display()))?;
    debug!("compiled payload {}", payload_path.display());

    run_driver(driver, &payload_path, &check.name)
}

/// Resolves a page path to a file:// URL against the working directory.
fn page_url(page: &str) -> Result<String> {
    let cwd = std::env::current_dir().context("resolving working directory")?;
    Ok(format!("file://{}/{page}", cwd.display()))
}

/// Ensures the payload directory exists under the current working directory.
/// Returns the path to it.
fn ensure_payload_dir() -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    let dir = cwd.join(".voidpack").join("smoke");

    if !dir.exists() {
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    Ok(dir)
}

/// Spawns the driver with the payload path appended, streaming its stdout to
/// the console in real time.
fn run_driver(driver: &str, payload: &Path, name: &str) -> Result<()> {
    let parts: Vec<&str> = driver.split_whitespace().collect();
    let program = parts.first().context("driver command is empty")?;
    let args = &parts[1..];

    let mut child = Command::new(program)
        .args(args)
        .arg(payload)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn driver: '{driver}'"))?;

    let stdout = child
        .stdout
        .take()
        .context("driver process did not have a stdout handle")?;

    for line in BufReader::new(stdout).lines() {
        let line = line.context("error reading output from driver process")?;
        println!("{line}");
    }

    let status = child.wait().context("failed to wait on driver process")?;

    if status.success() {
        println!("Check {name} passed");
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        Err(anyhow!("check '{name}' failed with driver exit code: {code}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_points_into_the_working_directory() {
        let url = page_url("index.html").unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/index.html"));
    }

    #[test]
    fn empty_driver_command_is_an_error() {
        assert!(run_driver("  ", Path::new("payload.json"), "x").is_err());
    }
}
