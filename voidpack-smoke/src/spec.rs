use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_settle_ms() -> u64 {
    1000
}

/// One declarative smoke check: a page to load and the steps to run
/// against it, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSpec {
    pub name: String,
    /// Page path, resolved to a file:// URL against the working directory.
    pub page: String,
    /// Settle delay after navigation, before the first step runs.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default)]
    pub steps: Vec<CheckStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CheckStep {
    /// The element matching the selector must be visible.
    AssertVisible { selector: String },
    /// Read a computed CSS property. With `expect_contains` set the value is
    /// asserted; without it the value is only reported.
    ComputedStyle {
        selector: String,
        property: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_contains: Option<String>,
    },
    /// Run a script in the page (used to force screens visible).
    Eval { script: String },
    /// Capture a PNG screenshot to the given path.
    Screenshot { path: PathBuf },
}

impl CheckSpec {
    pub fn load(path: &str) -> Result<CheckSpec> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading check spec {path}"))?;
        serde_yaml::from_str(&content).with_context(|| format!("parsing check spec {path}"))
    }
}
