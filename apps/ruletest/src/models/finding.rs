//! A single finding as reported by the engine.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
struct Position {
    line: usize,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
/// Shape of one entry in the engine's `results` array.
pub(crate) struct RawFinding {
    check_id: String,
    path: PathBuf,
    start: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Finding {
    pub check_id: String,
    pub path: PathBuf,
    /// 1-based starting line.
    pub start_line: usize,
}

impl Finding {
    pub fn new(check_id: impl Into<String>, path: impl Into<PathBuf>, start_line: usize) -> Self {
        Finding {
            check_id: check_id.into(),
            path: path.into(),
            start_line,
        }
    }
}

impl From<RawFinding> for Finding {
    fn from(raw: RawFinding) -> Self {
        Finding {
            check_id: raw.check_id,
            path: raw.path,
            start_line: raw.start.line,
        }
    }
}
