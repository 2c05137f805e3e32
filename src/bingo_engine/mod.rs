//! Core bingo engine: board generation, guess tracking, scoring.
//!
//! ## Module overview
//!
//! | Module      | Purpose |
//! |-------------|---------|
//! | `models`    | Shared types: pool entries, boards, guesses, snapshots |
//! | `error`     | `BingoError` and the crate `Result` alias |
//! | `pool`      | Option pool loading, validation, grouping by segment/category |
//! | `generator` | Seeded board generation `generate_board()` |
//! | `ledger`    | Guess ledger, one value per participant per category |
//! | `resolver`  | Winner resolution (exact line, closest-without-exceeding) |
//! | `points`    | Per-category point values and running totals |
//! | `storage`   | CSV files for ledger snapshots and point totals |
//! | `config`    | JSON session configuration |
//! | `session`   | Session state and segment lifecycle |
//! | `view`      | Read-only JSON views for rendering adapters |

pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod models;
pub mod points;
pub mod pool;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod view;

// Re-export the public API surface so callers can use
// `bingo_engine::generate_board` without reaching into sub-modules.
pub use config::SessionConfig;
pub use error::{BingoError, Result};
pub use generator::{generate, generate_board, BoardRequest};
pub use ledger::GuessLedger;
pub use models::{
    Board, Cell, CellState, GuessCategory, GuessValue, LedgerRow, LedgerSnapshot, OptionEntry,
    PointsRecord, SegmentPhase, SessionCounters,
};
pub use points::{PointsLedger, PointsTable};
pub use pool::{OptionGroup, OptionPool};
pub use resolver::{closest_not_over, resolve, resolve_named};
pub use session::{BingoSession, GuessOutcome, Leaders, SegmentResult, WindowEvent};
