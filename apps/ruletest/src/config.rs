//! Configuration discovery and effective settings resolution.
//!
//! ruletest reads `ruletest.toml|yaml|yml` from the current directory (or the
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config.
//! Defaults:
//! - `engine`: `semgrep`
//! - `strict|json|deep`: false
//! - `optimizations`: `none`
//! - `save_archive`: true
//! - `jobs`: available parallelism
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::runner::default_jobs;
use crate::scanner::Optimizations;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_ENGINE: &str = "semgrep";

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `ruletest.toml|yaml`.
pub struct FileConfig {
    /// Rule config root, relative to the directory holding the file.
    pub config: Option<String>,
    pub engine: Option<String>,
    pub strict: Option<bool>,
    pub json: Option<bool>,
    pub deep: Option<bool>,
    pub optimizations: Option<Optimizations>,
    pub save_archive: Option<bool>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Default, Clone)]
/// Values given on the command line; `None` means not given.
pub struct Overrides {
    pub cwd: Option<PathBuf>,
    pub target: String,
    pub config: Option<String>,
    pub engine: Option<String>,
    pub strict: Option<bool>,
    pub json: Option<bool>,
    pub deep: Option<bool>,
    pub optimizations: Option<Optimizations>,
    pub save_archive: Option<bool>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by the binary after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub target: PathBuf,
    pub config: Option<PathBuf>,
    pub engine: String,
    pub strict: bool,
    pub json: bool,
    pub deep: bool,
    pub optimizations: Optimizations,
    pub save_archive: bool,
    pub jobs: usize,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `ruletest.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("ruletest.toml").exists()
            || cur.join("ruletest.yaml").exists()
            || cur.join("ruletest.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `FileConfig` from `ruletest.toml` or `ruletest.yaml|yml` if present.
pub fn load_config(root: &Path) -> Option<FileConfig> {
    let toml_path = root.join("ruletest.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        return match toml::from_str(&s) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                debug!("ignoring {}: {}", toml_path.display(), e);
                None
            }
        };
    }
    for yml in ["ruletest.yaml", "ruletest.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            return match serde_yaml::from_str(&s) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    debug!("ignoring {}: {}", p.display(), e);
                    None
                }
            };
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(cli: &Overrides) -> Effective {
    let start = cli.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_else(|| {
        debug!("No ruletest config under {}; using defaults.", repo_root.display());
        FileConfig::default()
    });

    let config = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| cfg.config.as_ref().map(|c| repo_root.join(c)));
    let engine = cli
        .engine
        .clone()
        .or(cfg.engine)
        .unwrap_or_else(|| DEFAULT_ENGINE.to_string());

    Effective {
        target: PathBuf::from(&cli.target),
        config,
        engine,
        strict: cli.strict.or(cfg.strict).unwrap_or(false),
        json: cli.json.or(cfg.json).unwrap_or(false),
        deep: cli.deep.or(cfg.deep).unwrap_or(false),
        optimizations: cli.optimizations.or(cfg.optimizations).unwrap_or_default(),
        save_archive: cli.save_archive.or(cfg.save_archive).unwrap_or(true),
        jobs: cli.jobs.or(cfg.jobs).unwrap_or_else(default_jobs),
        repo_root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn overrides(root: &Path) -> Overrides {
        Overrides {
            cwd: Some(root.to_path_buf()),
            target: "tests".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        let eff = resolve_effective(&overrides(dir.path()));
        assert_eq!(eff.engine, DEFAULT_ENGINE);
        assert!(!eff.strict && !eff.json && !eff.deep);
        assert!(eff.save_archive);
        assert_eq!(eff.optimizations, Optimizations::None);
        assert!(eff.jobs >= 1);
        assert!(eff.config.is_none());
    }

    #[test]
    fn test_unparseable_config_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ruletest.toml"), "strict = [").unwrap();
        let eff = resolve_effective(&overrides(dir.path()));
        assert_eq!(eff.repo_root, dir.path());
        assert!(!eff.strict);
        assert_eq!(eff.engine, DEFAULT_ENGINE);
    }

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("ruletest.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
config = "rules"
engine = "/opt/engine"
strict = true
optimizations = "all"
save_archive = false
jobs = 3
    "#
        )
        .unwrap();
        fs::create_dir(root.join("sub")).unwrap();

        let eff = resolve_effective(&overrides(&root.join("sub")));
        assert_eq!(eff.repo_root, root.join("sub").parent().unwrap());
        assert_eq!(eff.config, Some(root.join("rules")));
        assert_eq!(eff.engine, "/opt/engine");
        assert!(eff.strict);
        assert_eq!(eff.optimizations, Optimizations::All);
        assert!(!eff.save_archive);
        assert_eq!(eff.jobs, 3);
    }

    #[test]
    fn test_load_yaml_and_cli_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("ruletest.yaml"),
            "engine: from-yaml\njson: true\ndeep: true\n",
        )
        .unwrap();

        let mut cli = overrides(root);
        cli.engine = Some("from-cli".into());
        cli.json = Some(false);
        let eff = resolve_effective(&cli);
        assert_eq!(eff.engine, "from-cli");
        assert!(!eff.json);
        assert!(eff.deep);
    }
}
