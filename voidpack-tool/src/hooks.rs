use anyhow::{Context, Result, anyhow};
use log::debug;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

/// Executes a configured hook command, streaming its stdout to the console
/// in real time.
///
/// The command string is split on whitespace; wrap anything that needs shell
/// features in `sh -c '...'`. A non-zero exit status aborts the packaging
/// run, so a failing before hook leaves any existing archive untouched.
pub fn run_hook(stage: &str, command: &str) -> Result<()> {
    debug!("running {stage} hook: {command}");

    let parts: Vec<&str> = command.split_whitespace().collect();
    let program = parts
        .first()
        .with_context(|| format!("{stage} hook command is empty"))?;
    let args = &parts[1..];

    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {stage} hook: '{command}'"))?;

    let stdout = child
        .stdout
        .take()
        .context("hook process did not have a stdout handle")?;

    for line in BufReader::new(stdout).lines() {
        let line = line.context("error reading output from hook process")?;
        println!("{line}");
    }

    let status = child.wait().context("failed to wait on hook process")?;

    if status.success() {
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        Err(anyhow!(
            "{stage} hook '{command}' failed with exit code: {code}"
        ))
    }
}
