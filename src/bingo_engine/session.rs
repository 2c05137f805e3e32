//! Session controller: the explicit state a chat or web adapter threads
//! through the core.
//!
//! A session owns the option pool, the guess ledger, the points ledger and
//! the segment lifecycle:
//!
//! ```text
//! start_segment ─► Open ──close / window──► Closed ──finish_segment──► Resolved
//!                   ▲                                                    │
//!                   └──────────────── advance_segment (reset) ◄──────────┘
//! ```
//!
//! Lock order is always session state, then ledger. Guess submission holds
//! the session lock so a guess can never land after the window closed.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bingo_engine::{
    config::SessionConfig,
    error::{BingoError, Result},
    generator::{generate_board, BoardRequest},
    ledger::{GuessLedger, ParticipantGuesses},
    models::{Board, GuessCategory, GuessValue, LedgerSnapshot, PointsRecord, SegmentPhase, SessionCounters},
    points::PointsLedger,
    pool::OptionPool,
    resolver::resolve,
    storage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessOutcome {
    Accepted,
    /// The participant already holds a value for this category.
    AlreadyGuessed,
    /// The segment is not open for guesses.
    NotAccepting,
}

/// Emitted by [`BingoSession::tick`] as the guess window runs down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowEvent {
    Reminder { minutes_left: u32 },
    Closed,
}

/// Who would win the numeric categories right now.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaders {
    pub miab: BTreeSet<String>,
    pub deaths: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub segment: u32,
    pub counters: SessionCounters,
    pub miab_winners: BTreeSet<String>,
    pub deaths_winners: BTreeSet<String>,
    /// Totals of everyone who scored, after the award.
    pub awarded: Vec<PointsRecord>,
}

#[derive(Debug)]
struct SessionState {
    phase: SegmentPhase,
    window_remaining: Option<u32>,
    board: Option<Arc<Board>>,
    /// Bingo lines already scored this segment.
    scored_lines: BTreeSet<String>,
}

#[derive(Debug)]
pub struct BingoSession {
    config: SessionConfig,
    pool: OptionPool,
    ledger: GuessLedger,
    points: PointsLedger,
    state: Mutex<SessionState>,
}

impl BingoSession {
    /// Build a session; point totals are loaded from `points_file` when it exists.
    /// Guesses stay closed until a segment is started or opened.
    pub fn new(config: SessionConfig, pool: OptionPool) -> Result<Self> {
        let ledger = GuessLedger::new(config.overwrite);
        let points = PointsLedger::new(config.points_for.clone());
        if let Some(path) = config.points_file.as_deref().filter(|p| p.exists()) {
            points.restore(storage::load_points(path)?);
            info!("loaded point totals from {}", path.display());
        }
        Ok(BingoSession {
            config,
            pool,
            ledger,
            points,
            state: Mutex::new(SessionState {
                phase: SegmentPhase::Closed,
                window_remaining: None,
                board: None,
                scored_lines: BTreeSet::new(),
            }),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn pool(&self) -> &OptionPool {
        &self.pool
    }

    pub fn ledger(&self) -> &GuessLedger {
        &self.ledger
    }

    pub fn points(&self) -> &PointsLedger {
        &self.points
    }

    pub fn phase(&self) -> SegmentPhase {
        self.state.lock().phase
    }

    pub fn segment(&self) -> u32 {
        self.ledger.counters().segment
    }

    pub fn counters(&self) -> SessionCounters {
        self.ledger.counters()
    }

    // -- read-only adapter surface ------------------------------------------

    pub fn current_board(&self) -> Option<Arc<Board>> {
        self.state.lock().board.clone()
    }

    pub fn ledger_snapshot(&self) -> LedgerSnapshot {
        self.ledger.snapshot()
    }

    pub fn points_snapshot(&self) -> Vec<PointsRecord> {
        self.points.snapshot()
    }

    pub fn guesses_for(&self, participant: &str) -> Option<ParticipantGuesses> {
        self.ledger.guesses_for(participant)
    }

    // -- segment lifecycle ----------------------------------------------------

    /// Generate the current segment's board and open guessing. A pool or board
    /// error leaves the session as it was. A resolved segment must be advanced
    /// before it can start again.
    pub fn start_segment(&self, seed: u64) -> Result<Arc<Board>> {
        let segment = self.segment();
        let phase = self.phase();
        if phase == SegmentPhase::Resolved {
            return Err(self.phase_error(phase, "start it"));
        }
        let request = BoardRequest::new(segment, seed).with_size(self.config.rows, self.config.cols);
        let board = match generate_board(&self.pool, &request) {
            Ok(board) => Arc::new(board),
            Err(e) => {
                error!("segment {segment} cannot start: {e}");
                return Err(e);
            }
        };

        let mut state = self.state.lock();
        // finish_segment may have run while the board was drawn
        if state.phase == SegmentPhase::Resolved {
            return Err(self.phase_error(state.phase, "start it"));
        }
        state.board = Some(board.clone());
        state.phase = SegmentPhase::Open;
        info!("segment {segment} started with seed {seed}");
        Ok(board)
    }

    pub fn open_guesses(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase == SegmentPhase::Resolved {
            return Err(self.phase_error(state.phase, "open guesses"));
        }
        state.phase = SegmentPhase::Open;
        info!("guesses for segment {} are open", self.segment());
        Ok(())
    }

    pub fn close_guesses(&self) {
        let mut state = self.state.lock();
        if state.phase == SegmentPhase::Open {
            state.phase = SegmentPhase::Closed;
            info!("guesses for segment {} are closed", self.segment());
        }
        state.window_remaining = None;
    }

    /// Arm the guess window countdown; returns its length in whole minutes.
    pub fn start_guess_window(&self) -> u32 {
        let seconds = self.config.guess_window_seconds;
        self.state.lock().window_remaining = Some(seconds);
        seconds / 60
    }

    /// Advance the guess window by `elapsed_secs`, as called by the external
    /// timer. Closes guessing when the window runs out.
    pub fn tick(&self, elapsed_secs: u32) -> Option<WindowEvent> {
        let mut state = self.state.lock();
        let remaining = state.window_remaining?;
        let left = remaining.saturating_sub(elapsed_secs);

        if left == 0 {
            state.window_remaining = None;
            if state.phase == SegmentPhase::Open {
                state.phase = SegmentPhase::Closed;
            }
            warn!("guess window for segment {} elapsed", self.segment());
            return Some(WindowEvent::Closed);
        }

        state.window_remaining = Some(left);
        // a whole minute boundary was crossed
        if (remaining - 1) / 60 > (left - 1) / 60 {
            return Some(WindowEvent::Reminder { minutes_left: left.div_ceil(60) });
        }
        None
    }

    pub fn window_remaining(&self) -> Option<u32> {
        self.state.lock().window_remaining
    }

    // -- guesses and counters -------------------------------------------------

    pub fn submit_guess(&self, participant: &str, category: &str, value: &str) -> Result<GuessOutcome> {
        let state = self.state.lock();
        if state.phase != SegmentPhase::Open {
            return Ok(GuessOutcome::NotAccepting);
        }
        let category: GuessCategory = category.parse()?;
        let value = GuessValue::parse(category, value)?;
        let outcome = if self.ledger.guess(participant, category, value)? {
            GuessOutcome::Accepted
        } else {
            GuessOutcome::AlreadyGuessed
        };
        drop(state);
        Ok(outcome)
    }

    /// Set an observed count (MiaB or deaths) to an absolute value.
    pub fn set_count(&self, category: GuessCategory, value: u32) -> Result<u32> {
        self.adjust(category, |count| *count = value)
    }

    /// Move an observed count by `delta`, clamping at zero.
    pub fn adjust_count(&self, category: GuessCategory, delta: i64) -> Result<u32> {
        self.adjust(category, |count| {
            let next = (i64::from(*count) + delta).clamp(0, i64::from(u32::MAX));
            *count = next as u32;
        })
    }

    fn adjust(&self, category: GuessCategory, f: impl FnOnce(&mut u32)) -> Result<u32> {
        if !category.is_numeric() {
            return Err(BingoError::InvalidCategory(category.to_string()));
        }
        let counters = self.ledger.update_counters(|c| match category {
            GuessCategory::Miab => f(&mut c.miab),
            _ => f(&mut c.deaths),
        });
        Ok(counters.count_for(category).unwrap_or_default())
    }

    /// Winners if the segment ended with the current counts. Awards nothing.
    pub fn current_leaders(&self) -> Result<Leaders> {
        let counters = self.ledger.counters();
        Ok(Leaders {
            miab: resolve(&self.ledger, GuessCategory::Miab, &GuessValue::Count(counters.miab))?,
            deaths: resolve(&self.ledger, GuessCategory::Deaths, &GuessValue::Count(counters.deaths))?,
        })
    }

    /// A bingo line was completed: score it and award the bingo points.
    /// Each line scores at most once per segment, and not after the segment
    /// is resolved.
    pub fn resolve_line(&self, line: &str) -> Result<BTreeSet<String>> {
        let line = GuessValue::parse(GuessCategory::Bingo, line)?;
        let mut state = self.state.lock();
        if state.phase == SegmentPhase::Resolved {
            return Err(self.phase_error(state.phase, "score a line"));
        }
        if !state.scored_lines.insert(line.to_string()) {
            return Err(BingoError::LineAlreadyScored { segment: self.segment(), line: line.to_string() });
        }
        let winners = resolve(&self.ledger, GuessCategory::Bingo, &line)?;
        self.points.award(&winners, GuessCategory::Bingo);
        info!("line {line} completed; winners: {winners:?}");
        Ok(winners)
    }

    /// Score both count categories against the current counters and award
    /// points. Moves the segment to `Resolved`; a second call is rejected.
    pub fn finish_segment(&self) -> Result<SegmentResult> {
        let mut state = self.state.lock();
        if state.phase == SegmentPhase::Resolved {
            return Err(self.phase_error(state.phase, "finish it again"));
        }
        let counters = self.ledger.counters();

        let miab_winners = resolve(&self.ledger, GuessCategory::Miab, &GuessValue::Count(counters.miab))?;
        let deaths_winners = resolve(&self.ledger, GuessCategory::Deaths, &GuessValue::Count(counters.deaths))?;
        let mut awarded = self.points.award(&miab_winners, GuessCategory::Miab);
        awarded.extend(self.points.award(&deaths_winners, GuessCategory::Deaths));
        // one record per participant, with their latest total
        awarded.reverse();
        let mut seen = BTreeSet::new();
        awarded.retain(|r| seen.insert(r.participant.clone()));
        awarded.sort_by(|a, b| a.participant.cmp(&b.participant));

        state.phase = SegmentPhase::Resolved;
        state.window_remaining = None;
        info!(
            "segment {} resolved: miab={} deaths={} winners={:?}/{:?}",
            counters.segment, counters.miab, counters.deaths, miab_winners, deaths_winners
        );
        Ok(SegmentResult {
            segment: counters.segment,
            counters,
            miab_winners,
            deaths_winners,
            awarded,
        })
    }

    /// Clear the ledger and counters and move to `next` (default: the next
    /// segment). Guessing reopens; the old board is discarded.
    pub fn advance_segment(&self, next: Option<u32>) -> u32 {
        let mut state = self.state.lock();
        self.ledger.reset();
        let counters = self.ledger.update_counters(|c| {
            c.segment = next.unwrap_or(c.segment + 1);
            c.miab = 0;
            c.deaths = 0;
        });
        state.board = None;
        state.window_remaining = None;
        state.scored_lines.clear();
        state.phase = SegmentPhase::Open;
        info!("advanced to segment {}", counters.segment);
        counters.segment
    }

    /// Resolve, save, and advance in one step. A failed save is logged and
    /// does not stop the segment from advancing.
    pub fn end_segment(&self, next: Option<u32>) -> Result<SegmentResult> {
        let result = self.finish_segment()?;
        if let Err(e) = self.persist() {
            error!("failed to save state for segment {}: {e}", result.segment);
        }
        self.advance_segment(next);
        Ok(result)
    }

    // -- persistence ------------------------------------------------------------

    /// Write the tracking and points files, whichever are configured.
    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.config.tracking_file {
            storage::save_ledger(path, &self.ledger.snapshot())?;
        }
        if let Some(path) = &self.config.points_file {
            storage::save_points(path, &self.points.snapshot())?;
        }
        Ok(())
    }

    /// Replace the ledger (and counters) from a tracking file. All or nothing.
    pub fn restore_ledger(&self, path: &Path) -> Result<()> {
        let snapshot = storage::load_ledger(path)?;
        self.ledger.restore(snapshot)?;
        info!("restored segment {} from {}", self.segment(), path.display());
        Ok(())
    }

    fn phase_error(&self, phase: SegmentPhase, action: &'static str) -> BingoError {
        BingoError::InvalidPhase { segment: self.segment(), phase, action }
    }
}
