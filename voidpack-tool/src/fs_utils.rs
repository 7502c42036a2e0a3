use anyhow::{Context, Result};
use glob::Pattern;
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};
use voidpack_lib::{Config, Manifest};

use crate::packaging::FileEntry;

/// The expanded manifest: entries to write, in archive order, plus every
/// configured input that was not found on disk.
#[derive(Debug, Default)]
pub struct PlannedRun {
    pub entries: Vec<FileEntry>,
    pub missing: Vec<String>,
}

/// Expands the manifest into the ordered entry list: standalone files first,
/// in manifest order, then each directory's files in walk order. Missing
/// inputs are collected instead of failing the run.
pub fn plan_run(manifest: &Manifest, config: &Config) -> Result<PlannedRun> {
    let skip_patterns = compile_skip_patterns(config)?;
    let mut plan = PlannedRun::default();

    for file in &manifest.files {
        let path = PathBuf::from(file);
        if !path.exists() {
            plan.missing.push(file.clone());
            continue;
        }
        if is_skipped(&path, &skip_patterns) {
            debug!("{file}: matched skip pattern");
            continue;
        }
        plan.entries.push(FileEntry {
            name_in_archive: archive_name(&path),
            path,
        });
    }

    for dir in &manifest.dirs {
        let path = PathBuf::from(dir);
        if !path.exists() {
            plan.missing.push(dir.clone());
            continue;
        }
        let mut found = Vec::new();
        walk_dir(&path, &skip_patterns, &mut found)?;
        debug!("{dir}: {} files", found.len());
        plan.entries.extend(found.into_iter().map(|p| FileEntry {
            name_in_archive: archive_name(&p),
            path: p,
        }));
    }

    Ok(plan)
}

/// The full walk path doubles as the path inside the archive; zip wants
/// forward slashes regardless of platform.
fn archive_name(path: &Path) -> String {
    path.to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

fn compile_skip_patterns(config: &Config) -> Result<Vec<Pattern>> {
    config
        .skip
        .as_ref()
        .map(|patterns| {
            patterns
                .iter()
                .map(|p| Pattern::new(p).with_context(|| format!("invalid skip pattern: {p}")))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()
        .map(Option::unwrap_or_default)
}

fn is_skipped(path: &Path, patterns: &[Pattern]) -> bool {
    let path_str = path.to_string_lossy();
    patterns.iter().any(|p| p.matches(&path_str))
}

/// Recursive walk in lexicographic filename order, so runs over the same
/// tree always discover files in the same order.
fn walk_dir(dir: &Path, patterns: &[Pattern], result: &mut Vec<PathBuf>) -> Result<()> {
    let mut children = fs::read_dir(dir)
        .with_context(|| format!("reading directory {dir:?}"))?
        .collect::<std::io::Result<Vec<_>>>()?;
    children.sort_by_key(|entry| entry.file_name());

    for entry in children {
        let path = entry.path();

        if is_skipped(&path, patterns) {
            continue;
        }

        if path.is_dir() {
            walk_dir(&path, patterns, result)?;
        } else {
            result.push(path);
        }
    }
    Ok(())
}

/// Compute total uncompressed size of all planned entries.
pub fn total_size(entries: &[FileEntry]) -> Result<u64> {
    let mut total: u64 = 0;
    for entry in entries {
        let meta = fs::metadata(&entry.path)
            .with_context(|| format!("reading metadata for {}", entry.path.display()))?;
        total += meta.len();
    }
    Ok(total)
}

/// Check the planned total against the configured limit.
/// If exceeded, exits with code 42.
pub fn check_size_limit(config: &Config, total: u64) -> Result<()> {
    if let Some(limit_str) = config.max_size.as_deref() {
        let limit = parse_size(limit_str)?;
        if limit > 0 && total > limit {
            eprintln!(
                "Error: total size {} bytes exceeds limit {} ({} bytes)",
                total, limit_str, limit
            );
            std::process::exit(42);
        }
    }
    Ok(())
}

/// Parse human-readable sizes in both binary (Ki/Mi/Gi) and decimal (KB/MB/GB) units.
/// Examples: "512Mi", "10Gi", "1MB", "500kb", "1024", "2.5GB"
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_ascii_lowercase();

    let (multiplier, number_str) = if s.ends_with("ki") {
        (1024_u64, &s[..s.len() - 2])
    } else if s.ends_with("mi") {
        (1024_u64.pow(2), &s[..s.len() - 2])
    } else if s.ends_with("gi") {
        (1024_u64.pow(3), &s[..s.len() - 2])
    } else if s.ends_with("ti") {
        (1024_u64.pow(4), &s[..s.len() - 2])
    } else if s.ends_with("kb") {
        (1000_u64, &s[..s.len() - 2])
    } else if s.ends_with("mb") {
        (1000_u64.pow(2), &s[..s.len() - 2])
    } else if s.ends_with("gb") {
        (1000_u64.pow(3), &s[..s.len() - 2])
    } else if s.ends_with("tb") {
        (1000_u64.pow(4), &s[..s.len() - 2])
    } else {
        (1_u64, s.as_str())
    };

    let number: f64 = number_str
        .trim()
        .parse()
        .with_context(|| format!("Invalid size format: {}", s))?;

    Ok((number * multiplier as f64) as u64)
}

/// Convert bytes into a human-friendly string using binary (KiB, MiB, GiB...) units.
pub fn encode_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if (size * 10.0) % 10.0 == 0.0 {
        format!("{:.0} {}", size, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path)
            .unwrap()
            .write_all(content.as_bytes())
            .unwrap();
    }

    #[test]
    fn walk_is_lexicographic_and_recursive() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "b.txt", "b");
        touch(&dir, "a.txt", "a");
        touch(&dir, "c/d.txt", "d");

        let mut found = Vec::new();
        walk_dir(dir.path(), &[], &mut found).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c/d.txt"]);
    }

    #[test]
    fn plan_collects_missing_inputs_and_keeps_order() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "index.html", "<html>");
        touch(&dir, "assets/icon.png", "png");

        let manifest = Manifest {
            archive: "out.zip".into(),
            files: vec![
                dir.path().join("index.html").to_string_lossy().into(),
                dir.path().join("manifest.json").to_string_lossy().into(),
            ],
            dirs: vec![dir.path().join("assets").to_string_lossy().into()],
        };
        let plan = plan_run(&manifest, &Config::default()).unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert!(plan.entries[0].name_in_archive.ends_with("index.html"));
        assert!(plan.entries[1].name_in_archive.ends_with("assets/icon.png"));
        assert_eq!(plan.missing.len(), 1);
        assert!(plan.missing[0].ends_with("manifest.json"));
    }

    #[test]
    fn skip_patterns_filter_walk_and_files() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "assets/keep.txt", "k");
        touch(&dir, "assets/junk.tmp", "j");

        let manifest = Manifest {
            archive: "out.zip".into(),
            files: vec![],
            dirs: vec![dir.path().join("assets").to_string_lossy().into()],
        };
        let config = Config {
            skip: Some(vec!["*.tmp".into()]),
            ..Config::default()
        };
        let plan = plan_run(&manifest, &config).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert!(plan.entries[0].name_in_archive.ends_with("keep.txt"));
    }

    #[test]
    fn invalid_skip_pattern_is_an_error() {
        let config = Config {
            skip: Some(vec!["[".into()]),
            ..Config::default()
        };
        let manifest = Manifest {
            archive: "out.zip".into(),
            files: vec![],
            dirs: vec![],
        };
        assert!(plan_run(&manifest, &config).is_err());
    }

    #[test]
    fn parse_size_units() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1Ki").unwrap(), 1024);
        assert_eq!(parse_size("512Mi").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
        assert_eq!(parse_size("2.5kb").unwrap(), 2500);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn encode_size_rounds_to_binary_units() {
        assert_eq!(encode_size(0), "0 B");
        assert_eq!(encode_size(512), "512 B");
        assert_eq!(encode_size(1024), "1 KiB");
        assert_eq!(encode_size(1536), "1.5 KiB");
        assert_eq!(encode_size(1024 * 1024), "1 MiB");
    }
}
