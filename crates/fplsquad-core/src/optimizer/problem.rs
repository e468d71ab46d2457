// Solver-facing problem description and the backend seam.

use std::collections::BTreeSet;

use crate::config::SquadRules;
use crate::pool::{PlayerPool, Position};

/// Replace a missing or non-finite objective value with the neutral 0.
pub fn sanitize_coefficient(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Extra linear constraint `Σ coefficients[i] · x[i] ≥ minimum`.
///
/// Used by the lowest-price tie-break to hold the primary objective at its
/// optimum while a second solve minimizes spend.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveFloor {
    pub coefficients: Vec<f64>,
    pub minimum: f64,
}

/// Immutable 0/1 selection problem: maximize `Σ objective[i] · x[i]` subject
/// to the squad rules. Index `i` is the player's index in the pool.
#[derive(Debug, Clone)]
pub struct SquadProblem {
    pub objective: Vec<f64>,
    pub prices: Vec<u32>,
    pub positions: Vec<Position>,
    pub team_ids: Vec<u32>,
    pub rules: SquadRules,
    pub objective_floor: Option<ObjectiveFloor>,
}

impl SquadProblem {
    /// Build a problem over `pool` with the given objective column.
    ///
    /// Coefficients are sanitized; a short column is padded with zeros. The
    /// pool itself is never modified.
    pub fn from_pool(pool: &PlayerPool, objective: &[f64], rules: &SquadRules) -> Self {
        let players = pool.players();
        SquadProblem {
            objective: (0..players.len())
                .map(|i| sanitize_coefficient(objective.get(i).copied().unwrap_or(0.0)))
                .collect(),
            prices: players.iter().map(|p| p.price).collect(),
            positions: players.iter().map(|p| p.position).collect(),
            team_ids: players.iter().map(|p| p.team_id).collect(),
            rules: rules.clone(),
            objective_floor: None,
        }
    }

    pub fn len(&self) -> usize {
        self.objective.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objective.is_empty()
    }

    /// Indices of the players at `position`.
    pub fn members(&self, position: Position) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == position)
            .map(|(i, _)| i)
            .collect()
    }

    /// Distinct team ids, in ascending order.
    pub fn teams(&self) -> BTreeSet<u32> {
        self.team_ids.iter().copied().collect()
    }

    /// Indices of the players belonging to `team_id`.
    pub fn team_members(&self, team_id: u32) -> Vec<usize> {
        self.team_ids
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == team_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// Sum of the objective over `indices`.
    pub fn objective_of(&self, indices: &[usize]) -> f64 {
        indices.iter().filter_map(|&i| self.objective.get(i)).sum()
    }

    /// Same constraints, different objective column.
    pub fn with_objective(&self, objective: Vec<f64>) -> Self {
        SquadProblem {
            objective: objective.into_iter().map(sanitize_coefficient).collect(),
            ..self.clone()
        }
    }

    pub fn with_floor(mut self, floor: ObjectiveFloor) -> Self {
        self.objective_floor = Some(floor);
        self
    }
}

// ---------------------------------------------------------------------------
// Solver seam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("no squad satisfies the constraints")]
    Infeasible,

    #[error("solver failure: {0}")]
    Backend(String),
}

/// A 0/1 integer-programming backend.
///
/// Implementations return the selected pool indices of an optimal solution,
/// or `SolveError::Infeasible` when no selection satisfies the constraints.
/// They must not print anything and must be safe to call from several
/// threads at once.
pub trait SquadSolver: Send + Sync {
    fn solve(&self, problem: &SquadProblem) -> Result<Vec<usize>, SolveError>;

    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Player;

    fn pool() -> PlayerPool {
        let rows = [
            (1, Position::Goalkeeper, 45, 1),
            (2, Position::Defender, 50, 1),
            (3, Position::Defender, 55, 2),
            (4, Position::Forward, 80, 3),
        ];
        PlayerPool::new(
            rows.iter()
                .map(|&(id, position, price, team_id)| Player {
                    id,
                    name: format!("P{id}"),
                    position,
                    price,
                    team_id,
                    team_name: None,
                    score: 1.0,
                    volatility: None,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn non_finite_coefficients_sanitized() {
        let problem = SquadProblem::from_pool(
            &pool(),
            &[f64::NAN, 2.0, f64::NEG_INFINITY, f64::INFINITY],
            &SquadRules::default(),
        );
        assert_eq!(problem.objective, vec![0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn short_objective_padded_with_zero() {
        let problem = SquadProblem::from_pool(&pool(), &[3.0], &SquadRules::default());
        assert_eq!(problem.objective, vec![3.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn members_and_teams() {
        let problem = SquadProblem::from_pool(&pool(), &[0.0; 4], &SquadRules::default());
        assert_eq!(problem.members(Position::Defender), vec![1, 2]);
        assert!(problem.members(Position::Midfielder).is_empty());
        assert_eq!(problem.teams().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(problem.team_members(1), vec![0, 1]);
        assert_eq!(problem.prices, vec![45, 50, 55, 80]);
    }

    #[test]
    fn with_objective_keeps_constraints() {
        let problem = SquadProblem::from_pool(&pool(), &[1.0; 4], &SquadRules::default())
            .with_floor(ObjectiveFloor {
                coefficients: vec![1.0; 4],
                minimum: 2.0,
            });
        let swapped = problem.with_objective(vec![-45.0, -50.0, f64::NAN, -80.0]);
        assert_eq!(swapped.objective, vec![-45.0, -50.0, 0.0, -80.0]);
        assert_eq!(swapped.positions, problem.positions);
        assert!(swapped.objective_floor.is_some());
        assert_eq!(problem.objective_of(&[0, 3]), 2.0);
    }
}
