use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;

/// Archive name the packager produces when nothing else is configured.
pub static DEFAULT_ARCHIVE: &str = "urban_void_game.zip";

/// Driver command the smoke runner falls back to.
pub static DEFAULT_DRIVER: &str = "node smoke-driver.js";

/// Top-level files of the game tree that ship in the archive.
pub static DEFAULT_FILES: Lazy<Vec<String>> =
    Lazy::new(|| vec!["index.html".to_string(), "manifest.json".to_string()]);

/// Directories of the game tree that ship recursively.
pub static DEFAULT_DIRS: Lazy<Vec<String>> = Lazy::new(|| vec!["assets".to_string()]);

/// Configuration shared by the packager and the smoke runner. Every field is
/// optional so the three sources (environment, config file, CLI) can each
/// fill in only what they know about.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub output: Option<String>,
    pub config: Option<String>,
    pub files: Option<Vec<String>>,
    pub dirs: Option<Vec<String>>,
    pub skip: Option<Vec<String>>,
    pub store: Option<bool>,
    pub dry: Option<bool>,
    pub max_size: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
    pub driver: Option<String>,
}

impl Config {
    /// Reads YAML or JSON config from file, picked by extension.
    pub fn from_file(path: &str) -> Result<Config> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading config file {path}"))?;
        let cfg = if path.to_lowercase().ends_with(".json") {
            serde_json::from_str(&content).with_context(|| format!("parsing {path} as JSON"))?
        } else {
            serde_yaml::from_str(&content).with_context(|| format!("parsing {path} as YAML"))?
        };
        Ok(cfg)
    }
}

/// The resolved packaging manifest: what goes into the archive and what the
/// archive is called. Order is preserved from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub archive: String,
    pub files: Vec<String>,
    pub dirs: Vec<String>,
}

impl Manifest {
    /// Fills unset manifest fields from the game-tree defaults.
    pub fn resolve(config: &Config) -> Manifest {
        Manifest {
            archive: config
                .output
                .clone()
                .unwrap_or_else(|| DEFAULT_ARCHIVE.to_string()),
            files: config.files.clone().unwrap_or_else(|| DEFAULT_FILES.clone()),
            dirs: config.dirs.clone().unwrap_or_else(|| DEFAULT_DIRS.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn manifest_defaults_to_game_tree() {
        let m = Manifest::resolve(&Config::default());
        assert_eq!(m.archive, "urban_void_game.zip");
        assert_eq!(m.files, vec!["index.html", "manifest.json"]);
        assert_eq!(m.dirs, vec!["assets"]);
    }

    #[test]
    fn manifest_takes_configured_values() {
        let cfg = Config {
            output: Some("site.zip".into()),
            files: Some(vec!["game.html".into()]),
            dirs: Some(vec!["img".into(), "snd".into()]),
            ..Config::default()
        };
        let m = Manifest::resolve(&cfg);
        assert_eq!(m.archive, "site.zip");
        assert_eq!(m.files, vec!["game.html"]);
        assert_eq!(m.dirs, vec!["img", "snd"]);
    }

    #[test]
    fn empty_file_list_is_kept_empty() {
        let cfg = Config {
            files: Some(vec![]),
            ..Config::default()
        };
        assert!(Manifest::resolve(&cfg).files.is_empty());
    }

    #[test]
    fn config_from_yaml_file() {
        let mut f = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(f, "output: out.zip\ndirs:\n  - assets\n  - extra").unwrap();
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("out.zip"));
        assert_eq!(cfg.dirs, Some(vec!["assets".into(), "extra".into()]));
    }

    #[test]
    fn config_from_json_file() {
        let mut f = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(f, r#"{{"output": "out.zip", "store": true}}"#).unwrap();
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("out.zip"));
        assert_eq!(cfg.store, Some(true));
    }

    #[test]
    fn unknown_config_fields_are_ignored() {
        let mut f = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(f, "output: out.zip\nlegacy_field: 7").unwrap();
        let cfg = Config::from_file(f.path().to_str().unwrap()).unwrap();
        assert_eq!(cfg.output.as_deref(), Some("out.zip"));
    }
}
