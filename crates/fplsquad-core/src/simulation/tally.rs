// Selection tally: how often each player appeared in a trial's squad.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::optimizer::Squad;
use crate::pool::PlayerPool;

/// Player id → number of trials in which the player was selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SelectionTally {
    counts: BTreeMap<u32, usize>,
}

impl SelectionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one appearance for every player in `squad`.
    pub fn record(&mut self, squad: &Squad) {
        for &id in &squad.player_ids {
            *self.counts.entry(id).or_default() += 1;
        }
    }

    pub fn count(&self, player_id: u32) -> usize {
        self.counts.get(&player_id).copied().unwrap_or(0)
    }

    /// `count / trials`, or 0 when there were no trials.
    pub fn frequency(&self, player_id: u32, trials: usize) -> f64 {
        if trials == 0 {
            0.0
        } else {
            self.count(player_id) as f64 / trials as f64
        }
    }

    /// Selection frequency for every pool player, in pool order.
    pub fn frequencies(&self, pool: &PlayerPool, trials: usize) -> Vec<f64> {
        pool.players()
            .iter()
            .map(|p| self.frequency(p.id, trials))
            .collect()
    }

    /// Sum-reduce another tally into this one.
    pub fn merge(&mut self, other: SelectionTally) {
        for (id, n) in other.counts {
            *self.counts.entry(id).or_default() += n;
        }
    }

    /// Number of distinct players selected at least once.
    pub fn distinct_players(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.counts.iter().map(|(&id, &n)| (id, n))
    }
}

/// Accumulated outcome of a batch of trials.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrialSummary {
    pub tally: SelectionTally,
    pub succeeded: usize,
    pub infeasible: usize,
}

impl TrialSummary {
    pub fn merge(mut self, other: TrialSummary) -> TrialSummary {
        self.tally.merge(other.tally);
        self.succeeded += other.succeeded;
        self.infeasible += other.infeasible;
        self
    }
}
