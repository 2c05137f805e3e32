use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bingo_engine::error::{BingoError, Result};

// ---------------------------------------------------------------------------
// Pool entries
// ---------------------------------------------------------------------------

/// Category name reserved for the free square of a segment.
pub const FREE_CATEGORY: &str = "free";

/// Label used when a segment's pool has no `free` entry.
pub const DEFAULT_FREE_LABEL: &str = "FREE";

/// One candidate square for a segment's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    pub segment_index: u32,
    pub category: String,
    /// How many squares of this category go on the board (≥ 1).
    pub required_count: usize,
    pub label: String,
}

impl OptionEntry {
    pub fn is_free(&self) -> bool {
        self.category.eq_ignore_ascii_case(FREE_CATEGORY)
    }
}

// ---------------------------------------------------------------------------
// Board
// ---------------------------------------------------------------------------

/// Presentation status of a square. Generation always produces `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Inactive,
    Active,
    Blocked,
}

impl CellState {
    /// Next state in the click cycle: inactive → active → blocked → inactive.
    pub fn cycle(self) -> Self {
        match self {
            CellState::Inactive => CellState::Active,
            CellState::Active   => CellState::Blocked,
            CellState::Blocked  => CellState::Inactive,
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellState::Inactive => write!(f, "inactive"),
            CellState::Active   => write!(f, "active"),
            CellState::Blocked  => write!(f, "blocked"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub label: String,
    /// Pool category the label was drawn from (`free` for the free cell).
    pub category: String,
    pub is_free: bool,
    pub state: CellState,
}

/// A populated board. Cells are stored column-major: `columns[col][row]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub segment_index: u32,
    pub seed: Option<u64>,
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<Vec<Cell>>,
}

impl Board {
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.columns.get(col).and_then(|c| c.get(row))
    }

    /// `(row, col)` of the free cell, if the board has one.
    pub fn free_cell(&self) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(c, column)| {
            column.iter().position(|cell| cell.is_free).map(|r| (r, c))
        })
    }

    /// Labels of every drawn (non-free) cell in column-major order.
    pub fn drawn_labels(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flatten()
            .filter(|cell| !cell.is_free)
            .map(|cell| cell.label.as_str())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Guesses
// ---------------------------------------------------------------------------

/// Accepted values for a bingo line guess: columns, rows and the two diagonals.
pub const ALLOWED_LINES: [&str; 12] = [
    "c1", "c2", "c3", "c4", "c5", "ll", "r1", "r2", "r3", "r4", "r5", "ul",
];

/// Returns the canonical form of `raw` if it is a valid bingo line.
pub fn normalize_line(raw: &str) -> Option<String> {
    let line = raw.trim().to_ascii_lowercase();
    ALLOWED_LINES.contains(&line.as_str()).then_some(line)
}

/// Guessable categories, in persisted column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessCategory {
    /// Which line completes first (categorical).
    Bingo,
    /// How many monster-in-a-box fights happen this segment (numeric).
    Miab,
    /// How many game overs happen this segment (numeric).
    Deaths,
}

impl GuessCategory {
    pub const ALL: [GuessCategory; 3] = [GuessCategory::Bingo, GuessCategory::Miab, GuessCategory::Deaths];

    pub fn name(self) -> &'static str {
        match self {
            GuessCategory::Bingo  => "bingo",
            GuessCategory::Miab   => "miab",
            GuessCategory::Deaths => "deaths",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, GuessCategory::Bingo)
    }

    /// Column position in ledger snapshots.
    pub fn column(self) -> usize {
        match self {
            GuessCategory::Bingo  => 0,
            GuessCategory::Miab   => 1,
            GuessCategory::Deaths => 2,
        }
    }
}

impl fmt::Display for GuessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GuessCategory {
    type Err = BingoError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        GuessCategory::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| BingoError::InvalidCategory(name.to_string()))
    }
}

/// A recorded guess or an observed outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuessValue {
    Line(String),
    Count(u32),
}

impl GuessValue {
    /// Parse a raw chat/CSV value for `category`, normalising bingo lines.
    pub fn parse(category: GuessCategory, raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if category.is_numeric() {
            trimmed
                .parse::<u32>()
                .map(GuessValue::Count)
                .map_err(|_| BingoError::InvalidValue {
                    category,
                    value: trimmed.to_string(),
                    accepted: "a non-negative whole number".to_string(),
                })
        } else {
            normalize_line(trimmed)
                .map(GuessValue::Line)
                .ok_or_else(|| invalid_line(trimmed))
        }
    }

    /// Check that the value's kind fits `category` and return its canonical form.
    pub fn validated(self, category: GuessCategory) -> Result<Self> {
        match (category.is_numeric(), self) {
            (true, GuessValue::Count(n)) => Ok(GuessValue::Count(n)),
            (false, GuessValue::Line(line)) => normalize_line(&line)
                .map(GuessValue::Line)
                .ok_or_else(|| invalid_line(&line)),
            (_, other) => Err(BingoError::InvalidValue {
                category,
                value: other.to_string(),
                accepted: if category.is_numeric() {
                    "a non-negative whole number".to_string()
                } else {
                    ALLOWED_LINES.join(", ")
                },
            }),
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            GuessValue::Count(n) => Some(*n),
            GuessValue::Line(_) => None,
        }
    }
}

fn invalid_line(value: &str) -> BingoError {
    BingoError::InvalidValue {
        category: GuessCategory::Bingo,
        value: value.to_string(),
        accepted: ALLOWED_LINES.join(", "),
    }
}

impl fmt::Display for GuessValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessValue::Line(line) => write!(f, "{}", line),
            GuessValue::Count(n)   => write!(f, "{}", n),
        }
    }
}

// ---------------------------------------------------------------------------
// Segment lifecycle
// ---------------------------------------------------------------------------

/// Open → Closed → Resolved → (reset) → Open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentPhase {
    /// Accepting guesses.
    Open,
    /// Guess window elapsed or closed by an admin.
    Closed,
    /// Outcome known, winners computed and points awarded.
    Resolved,
}

impl fmt::Display for SegmentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentPhase::Open     => write!(f, "open"),
            SegmentPhase::Closed   => write!(f, "closed"),
            SegmentPhase::Resolved => write!(f, "resolved"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Participant key reserved for the session-counter row.
pub const RESERVED_KEY: &str = "_";

/// Session-level counters persisted in the reserved snapshot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub segment: u32,
    pub miab: u32,
    pub deaths: u32,
}

impl Default for SessionCounters {
    fn default() -> Self {
        SessionCounters { segment: 1, miab: 0, deaths: 0 }
    }
}

impl SessionCounters {
    /// Observed count for a numeric category.
    pub fn count_for(&self, category: GuessCategory) -> Option<u32> {
        match category {
            GuessCategory::Bingo  => None,
            GuessCategory::Miab   => Some(self.miab),
            GuessCategory::Deaths => Some(self.deaths),
        }
    }
}

/// One participant's recorded guesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub participant: String,
    pub guesses: BTreeMap<GuessCategory, GuessValue>,
}

/// Point-in-time copy of a guess ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub counters: Option<SessionCounters>,
    pub rows: Vec<LedgerRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsRecord {
    pub participant: String,
    pub total_points: u32,
}
