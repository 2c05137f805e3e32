use std::collections::{BTreeMap, BTreeSet};

use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bingo_engine::models::{GuessCategory, PointsRecord};

/// Points awarded per winning guess, by category. Unlisted categories are worth 1.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsTable(BTreeMap<GuessCategory, u32>);

impl PointsTable {
    pub fn value_for(&self, category: GuessCategory) -> u32 {
        self.0.get(&category).copied().unwrap_or(1)
    }

    pub fn with(mut self, category: GuessCategory, points: u32) -> Self {
        self.0.insert(category, points);
        self
    }
}

/// Running point totals per participant.
#[derive(Debug, Default)]
pub struct PointsLedger {
    points_for: PointsTable,
    totals: Mutex<BTreeMap<String, u32>>,
}

impl PointsLedger {
    pub fn new(points_for: PointsTable) -> Self {
        PointsLedger { points_for, totals: Mutex::new(BTreeMap::new()) }
    }

    pub fn points_for(&self) -> &PointsTable {
        &self.points_for
    }

    /// Add the category's point value to every winner and return their new totals.
    pub fn award(&self, winners: &BTreeSet<String>, category: GuessCategory) -> Vec<PointsRecord> {
        let value = self.points_for.value_for(category);
        let mut totals = self.totals.lock();
        winners
            .iter()
            .map(|winner| {
                let total = totals.entry(winner.clone()).or_insert(0);
                *total = total.saturating_add(value);
                info!("{winner} now has {total} points");
                PointsRecord { participant: winner.clone(), total_points: *total }
            })
            .collect()
    }

    pub fn total_for(&self, participant: &str) -> u32 {
        self.totals.lock().get(participant).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> Vec<PointsRecord> {
        self.totals
            .lock()
            .iter()
            .map(|(participant, &total_points)| PointsRecord {
                participant: participant.clone(),
                total_points,
            })
            .collect()
    }

    /// Replace every total with `records`; later duplicates win.
    pub fn restore(&self, records: Vec<PointsRecord>) {
        let totals = records
            .into_iter()
            .map(|r| (r.participant, r.total_points))
            .collect();
        *self.totals.lock() = totals;
    }

    /// Administrative wipe of all totals.
    pub fn reset(&self) {
        self.totals.lock().clear();
    }
}
