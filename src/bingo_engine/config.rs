use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bingo_engine::{
    error::{BingoError, Result},
    generator::{DEFAULT_COLS, DEFAULT_ROWS},
    points::PointsTable,
};

pub const DEFAULT_GUESS_WINDOW_SECONDS: u32 = 5 * 60;
pub const DEFAULT_DOC_URL: &str =
    "https://github.com/fusoyeahhh/beyond_chaos_bingo/blob/main/BINGO_RULES.md";

/// Session options, read from a JSON file.
///
/// Keys this crate does not know about (chat credentials, channel names) are
/// kept in `chat` for the chat adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Allow a later guess to replace an earlier one in the same category.
    pub overwrite: bool,
    pub points_for: PointsTable,
    /// Length of the guess window; the external timer enforces it.
    pub guess_window_seconds: u32,
    pub rows: usize,
    pub cols: usize,
    pub tracking_file: Option<PathBuf>,
    pub points_file: Option<PathBuf>,
    pub admins: BTreeSet<String>,
    pub doc_url: String,
    #[serde(flatten)]
    pub chat: serde_json::Map<String, serde_json::Value>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            overwrite: false,
            points_for: PointsTable::default(),
            guess_window_seconds: DEFAULT_GUESS_WINDOW_SECONDS,
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            tracking_file: None,
            points_file: None,
            admins: BTreeSet::new(),
            doc_url: DEFAULT_DOC_URL.to_string(),
            chat: serde_json::Map::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| BingoError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.admins.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bingo_engine::models::GuessCategory;

    #[test]
    fn empty_object_gives_defaults() {
        let cfg = SessionConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, SessionConfig::default());
        assert_eq!(cfg.guess_window_seconds, 300);
        assert_eq!(cfg.doc_url, DEFAULT_DOC_URL);
    }

    #[test]
    fn reads_known_and_keeps_unknown_keys() {
        let cfg = SessionConfig::from_json_str(
            r#"{
                "overwrite": true,
                "points_for": {"bingo": 3},
                "guess_window_seconds": 120,
                "tracking_file": "state.csv",
                "admins": ["fusoyeahhh"],
                "token": "oauth:abc",
                "initial_channels": ["bcbingo"]
            }"#,
        )
        .unwrap();
        assert!(cfg.overwrite);
        assert_eq!(cfg.points_for.value_for(GuessCategory::Bingo), 3);
        assert_eq!(cfg.points_for.value_for(GuessCategory::Miab), 1);
        assert_eq!(cfg.guess_window_seconds, 120);
        assert_eq!(cfg.tracking_file, Some(PathBuf::from("state.csv")));
        assert!(cfg.is_admin("fusoyeahhh"));
        assert!(!cfg.is_admin("kefka"));
        assert_eq!(cfg.chat["token"], "oauth:abc");
        assert!(!cfg.chat.contains_key("overwrite"));
    }

    #[test]
    fn bad_types_are_errors() {
        assert!(SessionConfig::from_json_str(r#"{"overwrite": "yes"}"#).is_err());
        assert!(matches!(
            SessionConfig::from_path("/nonexistent/bc_bingo.json"),
            Err(BingoError::Io(_))
        ));
    }
}
