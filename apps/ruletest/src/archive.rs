//! Persist raw engine outputs as a gzipped tarball for CI artifacts.

use crate::error::HarnessError;
use flate2::{write::GzEncoder, Compression};
use serde_json::Value as Json;
use std::fs;
use std::path::{Path, PathBuf};
use tar::{Builder, Header};

pub const SAVE_TEST_OUTPUT_JSON: &str = "ruletest_runs_output.json";
pub const SAVE_TEST_OUTPUT_TAR: &str = "ruletest_runs_output.tar.gz";

/// Write `outputs` as JSON into `dir` and pack it into a `.tar.gz` next to it.
///
/// Returns the archive path.
pub fn save_outputs(outputs: &[Json], dir: &Path) -> Result<PathBuf, HarnessError> {
    let json_path = dir.join(SAVE_TEST_OUTPUT_JSON);
    let body = serde_json::to_vec_pretty(outputs)?;
    fs::write(&json_path, &body).map_err(|e| HarnessError::io(&json_path, e))?;

    let tar_path = dir.join(SAVE_TEST_OUTPUT_TAR);
    let file = fs::File::create(&tar_path).map_err(|e| HarnessError::io(&tar_path, e))?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    let mut header = Header::new_gnu();
    header.set_size(body.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append_data(&mut header, SAVE_TEST_OUTPUT_JSON, body.as_slice())
        .map_err(|e| HarnessError::io(&tar_path, e))?;
    builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .map_err(|e| HarnessError::io(&tar_path, e))?;
    Ok(tar_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use serde_json::json;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_archive_contains_outputs() {
        let dir = tempdir().unwrap();
        let outputs = vec![json!({"config": "a.yaml", "phase": "detection", "output": {"results": []}})];
        let tar_path = save_outputs(&outputs, dir.path()).unwrap();
        assert!(dir.path().join(SAVE_TEST_OUTPUT_JSON).exists());

        let mut archive = tar::Archive::new(GzDecoder::new(fs::File::open(tar_path).unwrap()));
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_string_lossy(), SAVE_TEST_OUTPUT_JSON);
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        let parsed: Vec<Json> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed, outputs);
    }
}
