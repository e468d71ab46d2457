// Squad: the result of one optimizer call, plus its invariant checks.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::config::SquadRules;
use crate::pool::{Player, PlayerPool, Position};

/// A selected squad. `indices` are sorted pool indices; `player_ids` follow
/// the same order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Squad {
    pub indices: Vec<usize>,
    pub player_ids: Vec<u32>,
    pub total_price: u32,
    /// Sum of the objective column the squad was optimized for.
    pub total_objective: f64,
}

impl Squad {
    /// Build from solver output. Unknown indices are dropped here and caught
    /// by `check` against the expected size.
    pub fn from_indices(pool: &PlayerPool, mut indices: Vec<usize>, objective: &[f64]) -> Self {
        indices.sort_unstable();
        let player_ids = indices
            .iter()
            .filter_map(|&i| pool.get(i).map(|p| p.id))
            .collect();
        let total_price = indices
            .iter()
            .filter_map(|&i| pool.get(i).map(|p| p.price))
            .sum();
        let total_objective = indices
            .iter()
            .filter_map(|&i| objective.get(i))
            .sum();
        Squad {
            indices,
            player_ids,
            total_price,
            total_objective,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, player_id: u32) -> bool {
        self.player_ids.contains(&player_id)
    }

    /// Selected players in pool order.
    pub fn players<'a>(&'a self, pool: &'a PlayerPool) -> impl Iterator<Item = &'a Player> + 'a {
        self.indices.iter().filter_map(move |&i| pool.get(i))
    }

    /// Sum of base scores (not the objective the squad was solved for).
    pub fn total_score(&self, pool: &PlayerPool) -> f64 {
        self.players(pool).map(|p| p.score).sum()
    }

    /// Verify size, quotas, budget, team cap and uniqueness.
    pub fn check(&self, pool: &PlayerPool, rules: &SquadRules) -> Result<(), SquadViolation> {
        let mut seen = HashSet::with_capacity(self.indices.len());
        for &index in &self.indices {
            if pool.get(index).is_none() {
                return Err(SquadViolation::UnknownIndex { index });
            }
            if !seen.insert(index) {
                return Err(SquadViolation::DuplicatePlayer { index });
            }
        }

        let expected = rules.squad_size() as usize;
        if self.indices.len() != expected {
            return Err(SquadViolation::WrongSize {
                expected,
                actual: self.indices.len(),
            });
        }

        let players: Vec<&Player> = self.players(pool).collect();

        for position in Position::ALL {
            let actual = players.iter().filter(|p| p.position == position).count();
            let expected = rules.quotas.get(position) as usize;
            if actual != expected {
                return Err(SquadViolation::QuotaMismatch {
                    position,
                    expected,
                    actual,
                });
            }
        }

        let total: u64 = players.iter().map(|p| p.price as u64).sum();
        if total > rules.budget as u64 {
            return Err(SquadViolation::OverBudget {
                total,
                budget: rules.budget,
            });
        }

        let mut per_team: BTreeMap<u32, usize> = BTreeMap::new();
        for p in &players {
            *per_team.entry(p.team_id).or_default() += 1;
        }
        if let Some((&team_id, &count)) = per_team
            .iter()
            .find(|(_, count)| **count > rules.max_per_team as usize)
        {
            return Err(SquadViolation::TeamCapExceeded {
                team_id,
                count,
                cap: rules.max_per_team,
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SquadViolation {
    #[error("squad has {actual} players, expected {expected}")]
    WrongSize { expected: usize, actual: usize },

    #[error("squad has {actual} {position}s, expected {expected}")]
    QuotaMismatch {
        position: Position,
        expected: usize,
        actual: usize,
    },

    #[error("squad costs {total}, over the budget of {budget}")]
    OverBudget { total: u64, budget: u32 },

    #[error("squad has {count} players from team {team_id}, cap is {cap}")]
    TeamCapExceeded { team_id: u32, count: usize, cap: u32 },

    #[error("pool index {index} selected twice")]
    DuplicatePlayer { index: usize },

    #[error("pool index {index} does not exist")]
    UnknownIndex { index: usize },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
