//! # bc_bingo
//!
//! Core of a live bingo meta-game played alongside a streamed run.
//!
//! Each segment of the run gets its own board, drawn from a pool of
//! candidate squares, and viewers guess which line completes first and how
//! many times two countable events (monster-in-a-box fights and game overs)
//! happen. Guesses are scored when the segment ends and winners collect
//! points.
//!
//! ## How it works
//!
//! 1. Load an [`OptionPool`] from a segment CSV. Every square belongs to a
//!    category that says how many of its squares go on a board.
//! 2. Call [`generate_board`] with a [`BoardRequest`]: each category is drawn
//!    without replacement, the draws are shuffled together and laid out
//!    column by column around a free centre square.
//! 3. Record guesses in a [`GuessLedger`]. Each participant keeps one value
//!    per category; later guesses are rejected unless overwrite is enabled.
//! 4. [`resolve`] the winners: bingo lines must match exactly, counts use
//!    closest-without-exceeding. [`PointsLedger::award`] adds the points.
//!
//! [`BingoSession`] ties these together with the segment lifecycle, the
//! guess window and CSV persistence, for chat and web adapters to drive.
//!
//! ## Key features
//!
//! - **Deterministic**: the same pool, segment and seed always produce the
//!   same board.
//! - **Never under-filled**: a category with too few squares, or draws that
//!   don't fit the grid, is an error rather than a partial board.
//! - **Thread-safe**: ledgers lock internally; snapshots are point-in-time
//!   copies.
//!
//! ## Quick start
//!
//! ```rust
//! use bc_bingo::{generate_board, resolve, BoardRequest, GuessCategory, GuessLedger, GuessValue, OptionPool};
//!
//! let csv = "segment_index,type,choices,square\n\
//!            1,boss,8,Whelk\n1,boss,8,Vargas\n1,boss,8,Ultros\n1,boss,8,Dadaluma\n\
//!            1,boss,8,Ifrit\n1,boss,8,Shiva\n1,boss,8,Number 024\n1,boss,8,Number 128\n";
//! let pool = OptionPool::load(csv.as_bytes()).unwrap();
//!
//! let board = generate_board(&pool, &BoardRequest::new(1, 42).with_size(3, 3)).unwrap();
//! assert_eq!(board.drawn_labels().len(), 8);
//!
//! let ledger = GuessLedger::default();
//! ledger.guess_raw("terra", "deaths", "2").unwrap();
//! ledger.guess_raw("locke", "deaths", "4").unwrap();
//! let winners = resolve(&ledger, GuessCategory::Deaths, &GuessValue::Count(3)).unwrap();
//! assert!(winners.contains("terra"));
//! ```

pub mod bingo_engine;

// Convenience re-exports so callers can use `bc_bingo::generate_board`
// directly without reaching into `bingo_engine::`.
pub use bingo_engine::{
    closest_not_over, generate, generate_board, resolve, resolve_named, BingoError, BingoSession,
    Board, BoardRequest, Cell, CellState, GuessCategory, GuessLedger, GuessOutcome, GuessValue,
    Leaders, LedgerRow, LedgerSnapshot, OptionEntry, OptionGroup, OptionPool, PointsLedger,
    PointsRecord, PointsTable, Result, SegmentPhase, SegmentResult, SessionConfig,
    SessionCounters, WindowEvent,
};
