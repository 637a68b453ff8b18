//! Pairing of rule configs, test targets, and fixtests by path.
//!
//! Pairing is purely name based: a config `rules/eqeq.yaml` owns every target
//! whose path relative to the target root, with all suffixes stripped, is
//! `rules/eqeq` (e.g. `rules/eqeq.py`, `rules/eqeq.test.yaml`). A fixtest is
//! a golden autofix result carrying the `.fixed` marker (`rules/eqeq.fixed.py`)
//! and the same final suffix as its target.
//!
//! When a root is a single file, relative paths on that side are measured from
//! the file's parent directory.

use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Final suffixes that mark a rule-config file.
pub const CONFIG_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];
/// Suffix preceding a config extension on YAML fixtures (`foo.test.yaml`).
pub const CONFIG_TEST_SUFFIX: &str = ".test";
/// Marker suffix for golden autofix files (`foo.fixed.py`).
pub const FIXTEST_SUFFIX: &str = ".fixed";

/// Dot-separated suffixes of the file name, each including its leading dot.
///
/// A leading dot (hidden file) does not start a suffix, and a name ending in
/// a dot has no suffixes at all.
pub fn suffixes(path: &Path) -> Vec<String> {
    let name = match path.file_name() {
        Some(n) => n.to_string_lossy(),
        None => return Vec::new(),
    };
    if name.ends_with('.') {
        return Vec::new();
    }
    name.trim_start_matches('.')
        .split('.')
        .skip(1)
        .map(|s| format!(".{}", s))
        .collect()
}

fn final_suffix(path: &Path) -> Option<String> {
    suffixes(path).pop()
}

pub fn is_config_suffix(path: &Path) -> bool {
    final_suffix(path)
        .map(|s| CONFIG_EXTENSIONS.contains(&s.as_str()))
        .unwrap_or(false)
}

pub fn is_config_test_suffix(path: &Path) -> bool {
    let sfx = suffixes(path);
    match sfx.as_slice() {
        [.., test, ext] => test == CONFIG_TEST_SUFFIX && CONFIG_EXTENSIONS.contains(&ext.as_str()),
        _ => false,
    }
}

pub fn is_config_fixtest_suffix(path: &Path) -> bool {
    suffixes(path).iter().any(|s| s == FIXTEST_SUFFIX)
}

pub fn final_suffix_matches(a: &Path, b: &Path) -> bool {
    final_suffix(a) == final_suffix(b)
}

/// Strip every trailing suffix from the last path component.
///
/// `a/foo.test.py` becomes `a/foo`.
pub fn remove_all_suffixes(path: &Path) -> PathBuf {
    let mut out = path.to_path_buf();
    loop {
        let sfx = match final_suffix(&out) {
            Some(s) => s,
            None => return out,
        };
        let name = out
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = name[..name.len() - sfx.len()].to_string();
        out.set_file_name(stem);
    }
}

/// True when `child1` under `parent1` and `child2` under `parent2` name the
/// same logical test once all suffixes are removed.
pub fn relatively_eq(parent1: &Path, child1: &Path, parent2: &Path, child2: &Path) -> bool {
    let rel1 = match pathdiff::diff_paths(child1, parent1) {
        Some(p) => p,
        None => return false,
    };
    let rel2 = match pathdiff::diff_paths(child2, parent2) {
        Some(p) => p,
        None => return false,
    };
    remove_all_suffixes(&rel1) == remove_all_suffixes(&rel2)
}

/// Directory that relative paths are measured from for a given root.
fn base_dir(root: &Path) -> PathBuf {
    if root.is_file() {
        root.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        root.to_path_buf()
    }
}

/// Recursively list everything below `root`, sorted.
fn walk(root: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&root.to_string_lossy())
    );
    let mut out: Vec<PathBuf> = match glob::glob(&pattern) {
        Ok(paths) => paths.filter_map(Result::ok).collect(),
        Err(e) => {
            debug!("cannot walk {}: {}", root.display(), e);
            Vec::new()
        }
    };
    out.sort();
    out
}

/// Whether the file or its directory below `root` is dot-prefixed.
fn is_hidden(root: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let starts_with_dot = |p: Option<&std::ffi::OsStr>| {
        p.map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false)
    };
    starts_with_dot(rel.file_name()) || starts_with_dot(rel.parent().and_then(Path::file_name))
}

/// Rule configs under `config_root`, or the root itself when it is a file.
pub fn config_files(config_root: &Path) -> Vec<PathBuf> {
    if config_root.is_file() {
        return vec![config_root.to_path_buf()];
    }
    walk(config_root)
        .into_iter()
        .filter(|p| p.is_file() && is_config_suffix(p) && !is_hidden(config_root, p))
        .collect()
}

/// A path may be a target when it is a plain source file or a YAML fixture,
/// and never when it is a fixtest.
fn has_target_suffix(path: &Path) -> bool {
    (is_config_test_suffix(path) || !is_config_suffix(path)) && !is_config_fixtest_suffix(path)
}

/// Map every config to the targets it is tested against.
///
/// Configs without targets are kept with an empty list so callers can report
/// them as missing tests.
pub fn config_targets(
    config_root: &Path,
    configs: &[PathBuf],
    target_root: &Path,
) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    if config_root.is_file() && target_root.is_file() {
        return BTreeMap::from([(config_root.to_path_buf(), vec![target_root.to_path_buf()])]);
    }

    let config_base = base_dir(config_root);
    let mut out = BTreeMap::new();
    if target_root.is_file() {
        let target_name = PathBuf::from(target_root.file_name().unwrap_or_default());
        for config in configs {
            let config_name = PathBuf::from(config.file_name().unwrap_or_default());
            let matched = has_target_suffix(target_root)
                && remove_all_suffixes(&config_name) == remove_all_suffixes(&target_name);
            let targets = if matched {
                vec![target_root.to_path_buf()]
            } else {
                Vec::new()
            };
            out.insert(config.clone(), targets);
        }
        return out;
    }

    let candidates: Vec<PathBuf> = walk(target_root)
        .into_iter()
        .filter(|t| t.is_file() && has_target_suffix(t))
        .collect();
    for config in configs {
        let targets: Vec<PathBuf> = candidates
            .iter()
            .filter(|t| relatively_eq(target_root, t, &config_base, config))
            .cloned()
            .collect();
        debug!("{} -> {} target(s)", config.display(), targets.len());
        out.insert(config.clone(), targets);
    }
    out
}

/// Pair each config's targets with the fixtests found under the target root.
pub fn config_fixtests(
    target_root: &Path,
    targets: &BTreeMap<PathBuf, Vec<PathBuf>>,
) -> BTreeMap<PathBuf, Vec<(PathBuf, PathBuf)>> {
    let base = base_dir(target_root);
    let fixtests: Vec<PathBuf> = walk(&base)
        .into_iter()
        .filter(|f| f.is_file() && is_config_fixtest_suffix(f))
        .collect();
    targets
        .iter()
        .map(|(config, config_targets)| {
            let pairs = config_targets
                .iter()
                .flat_map(|target| {
                    fixtests
                        .iter()
                        .filter(|f| {
                            final_suffix_matches(target, f) && relatively_eq(&base, target, &base, f)
                        })
                        .map(|f| (target.clone(), f.clone()))
                        .collect::<Vec<_>>()
                })
                .collect();
            (config.clone(), pairs)
        })
        .collect()
}

/// Whether any rule in the config declares an autofix (`fix` or `fix-regex`).
pub fn config_declares_fix(config: &Path) -> bool {
    let text = match fs::read_to_string(config) {
        Ok(s) => s,
        Err(e) => {
            debug!("cannot read {}: {}", config.display(), e);
            return false;
        }
    };
    let doc: YamlValue = match serde_yaml::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            debug!("cannot parse {}: {}", config.display(), e);
            return false;
        }
    };
    doc.get("rules")
        .and_then(YamlValue::as_sequence)
        .map(|rules| {
            rules
                .iter()
                .any(|r| r.get("fix").is_some() || r.get("fix-regex").is_some())
        })
        .unwrap_or(false)
}
