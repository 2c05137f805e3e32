//! Guess ledger: one value per `(participant, category)` plus the session counters.
//!
//! All state sits behind a single `parking_lot::Mutex`, so every operation is
//! linearizable: a `reset` racing a `guess` lands entirely before or after it.
//! Snapshots clone under the lock and never expose live state.

use std::collections::BTreeMap;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::bingo_engine::{
    error::{BingoError, Result},
    models::{GuessCategory, GuessValue, LedgerRow, LedgerSnapshot, SessionCounters, RESERVED_KEY},
};

pub type ParticipantGuesses = BTreeMap<GuessCategory, GuessValue>;

#[derive(Debug, Default)]
struct LedgerState {
    overwrite: bool,
    counters: SessionCounters,
    rows: BTreeMap<String, ParticipantGuesses>,
}

#[derive(Debug, Default)]
pub struct GuessLedger {
    state: Mutex<LedgerState>,
}

impl GuessLedger {
    pub fn new(overwrite: bool) -> Self {
        GuessLedger {
            state: Mutex::new(LedgerState { overwrite, ..LedgerState::default() }),
        }
    }

    pub fn overwrite(&self) -> bool {
        self.state.lock().overwrite
    }

    pub fn set_overwrite(&self, overwrite: bool) {
        self.state.lock().overwrite = overwrite;
    }

    /// Record a guess. Returns `Ok(false)` without touching state when the
    /// participant already holds a value for `category` and overwrite is off.
    /// Participant ids are trimmed, as they are when read back from CSV.
    pub fn guess(&self, participant: &str, category: GuessCategory, value: GuessValue) -> Result<bool> {
        let participant = participant.trim();
        if participant.is_empty() || participant == RESERVED_KEY {
            return Err(BingoError::InvalidValue {
                category,
                value: participant.to_string(),
                accepted: "a non-empty participant name other than '_'".to_string(),
            });
        }
        let value = value.validated(category)?;

        let mut state = self.state.lock();
        let overwrite = state.overwrite;
        let guesses = state.rows.entry(participant.to_string()).or_default();
        if guesses.contains_key(&category) && !overwrite {
            debug!("{participant} already guessed {category}");
            return Ok(false);
        }
        debug!("{participant} guessed {category}={value}");
        guesses.insert(category, value);
        Ok(true)
    }

    /// String entry point for chat adapters. An empty value means "no guess".
    pub fn guess_raw(&self, participant: &str, category: &str, value: &str) -> Result<bool> {
        let category: GuessCategory = category.parse()?;
        if value.trim().is_empty() {
            return Ok(false);
        }
        let value = GuessValue::parse(category, value)?;
        self.guess(participant, category, value)
    }

    /// Remove a recorded guess; returns whether one existed.
    pub fn clear_guess(&self, participant: &str, category: GuessCategory) -> bool {
        let participant = participant.trim();
        let mut state = self.state.lock();
        let Some(guesses) = state.rows.get_mut(participant) else {
            return false;
        };
        let removed = guesses.remove(&category).is_some();
        if guesses.is_empty() {
            state.rows.remove(participant);
        }
        removed
    }

    pub fn guesses_for(&self, participant: &str) -> Option<ParticipantGuesses> {
        self.state.lock().rows.get(participant.trim()).cloned()
    }

    /// Every recorded value for one category, by participant.
    pub fn guesses_in(&self, category: GuessCategory) -> BTreeMap<String, GuessValue> {
        self.state
            .lock()
            .rows
            .iter()
            .filter_map(|(name, guesses)| guesses.get(&category).map(|v| (name.clone(), v.clone())))
            .collect()
    }

    pub fn participant_count(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn counters(&self) -> SessionCounters {
        self.state.lock().counters
    }

    /// Mutate the session counters atomically and return the new values.
    pub fn update_counters(&self, f: impl FnOnce(&mut SessionCounters)) -> SessionCounters {
        let mut state = self.state.lock();
        f(&mut state.counters);
        state.counters
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        LedgerSnapshot {
            counters: Some(state.counters),
            rows: state
                .rows
                .iter()
                .map(|(participant, guesses)| LedgerRow {
                    participant: participant.clone(),
                    guesses: guesses.clone(),
                })
                .collect(),
        }
    }

    /// Replace the whole ledger with `snapshot`, counters included. Every row
    /// is validated first; on error the ledger keeps its previous contents.
    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<()> {
        let mut rows: BTreeMap<String, ParticipantGuesses> = BTreeMap::new();
        for (i, row) in snapshot.rows.into_iter().enumerate() {
            let malformed = |reason: String| {
                warn!("rejecting ledger restore: {reason}");
                BingoError::MalformedSnapshot { row: i + 1, reason }
            };
            if row.participant == RESERVED_KEY || row.participant.trim().is_empty() {
                return Err(malformed(format!("'{}' is not a participant", row.participant)));
            }
            let mut guesses = ParticipantGuesses::new();
            for (category, value) in row.guesses {
                let value = value.validated(category).map_err(|e| malformed(e.to_string()))?;
                guesses.insert(category, value);
            }
            if rows.insert(row.participant.clone(), guesses).is_some() {
                return Err(malformed(format!("participant '{}' appears twice", row.participant)));
            }
        }
        rows.retain(|_, guesses| !guesses.is_empty());

        let mut state = self.state.lock();
        state.rows = rows;
        // no reserved row means a fresh segment 1
        state.counters = snapshot.counters.unwrap_or_default();
        debug!("restored ledger with {} participants", state.rows.len());
        Ok(())
    }

    /// Drop every participant row. Overwrite policy and counters are kept.
    pub fn reset(&self) {
        self.state.lock().rows.clear();
    }
}
