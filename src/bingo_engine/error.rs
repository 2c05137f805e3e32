use std::path::PathBuf;

use thiserror::Error;

use crate::bingo_engine::models::{GuessCategory, SegmentPhase};

pub type Result<T> = std::result::Result<T, BingoError>;

#[derive(Debug, Error)]
pub enum BingoError {
    #[error("malformed option pool at row {row}: {reason}")]
    MalformedPool { row: usize, reason: String },
    #[error("segment {segment_index} category '{category}' needs {required} entries but only {available} are available")]
    InsufficientPool {
        segment_index: u32,
        category: String,
        required: usize,
        available: usize,
    },
    #[error("board {rows}x{cols} has {cells} drawable cells but {drawn} entries were drawn")]
    BoardSizeMismatch {
        rows: usize,
        cols: usize,
        cells: usize,
        drawn: usize,
    },
    #[error("invalid guess category '{0}' (expected one of bingo, miab, deaths)")]
    InvalidCategory(String),
    #[error("unknown category '{0}' (expected one of bingo, miab, deaths)")]
    UnknownCategory(String),
    #[error("invalid {category} value '{value}': must be {accepted}")]
    InvalidValue {
        category: GuessCategory,
        value: String,
        accepted: String,
    },
    #[error("segment {segment} is {phase}; cannot {action}")]
    InvalidPhase {
        segment: u32,
        phase: SegmentPhase,
        action: &'static str,
    },
    #[error("line {line} was already scored in segment {segment}")]
    LineAlreadyScored { segment: u32, line: String },
    #[error("malformed snapshot at row {row}: {reason}")]
    MalformedSnapshot { row: usize, reason: String },
    #[error("config error in {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BingoError {
    /// Pool and board failures stop a segment from starting; everything else
    /// is a rejected request local to one caller.
    pub fn is_fatal_to_segment(&self) -> bool {
        matches!(
            self,
            BingoError::MalformedPool { .. }
                | BingoError::InsufficientPool { .. }
                | BingoError::BoardSizeMismatch { .. }
        )
    }
}
