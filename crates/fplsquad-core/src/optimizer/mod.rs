// Constrained squad optimizer: validates inputs, drives a `SquadSolver`
// backend, applies the configured tie-break and verifies the result.

pub mod milp;
pub mod problem;
pub mod squad;

use tracing::{debug, error, warn};

use crate::config::{SquadRules, TieBreak};
use crate::pool::{PlayerPool, Position};

pub use milp::MilpSolver;
pub use problem::{sanitize_coefficient, ObjectiveFloor, SolveError, SquadProblem, SquadSolver};
pub use squad::{Squad, SquadViolation};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("no squad satisfies the budget, quota and team constraints")]
    Infeasible,

    #[error("objective has {actual} values for a pool of {expected} players")]
    ObjectiveLength { expected: usize, actual: usize },

    #[error("solver failure: {0}")]
    Solver(String),

    #[error("solver returned an invalid squad: {0}")]
    InvalidSolution(#[from] SquadViolation),
}

impl SelectionError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SelectionError::Infeasible)
    }
}

impl From<SolveError> for SelectionError {
    fn from(e: SolveError) -> Self {
        match e {
            SolveError::Infeasible => SelectionError::Infeasible,
            SolveError::Backend(msg) => SelectionError::Solver(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// SquadOptimizer
// ---------------------------------------------------------------------------

/// Picks the squad maximizing an objective column under `SquadRules`.
///
/// Never mutates the pool. Every returned squad has passed `Squad::check`.
#[derive(Debug, Clone)]
pub struct SquadOptimizer<S = MilpSolver> {
    solver: S,
    rules: SquadRules,
}

impl SquadOptimizer<MilpSolver> {
    pub fn new(rules: SquadRules) -> Self {
        Self::with_solver(MilpSolver::new(), rules)
    }
}

impl<S: SquadSolver> SquadOptimizer<S> {
    pub fn with_solver(solver: S, rules: SquadRules) -> Self {
        SquadOptimizer { solver, rules }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Optimize for the pool's base scores.
    pub fn select_by_score(&self, pool: &PlayerPool) -> Result<Squad, SelectionError> {
        self.select(pool, &pool.base_scores())
    }

    /// Optimize for `objective`, one value per pool player in pool order.
    ///
    /// Missing or non-finite values count as 0. Returns
    /// `SelectionError::Infeasible` when no squad satisfies the rules.
    pub fn select(&self, pool: &PlayerPool, objective: &[f64]) -> Result<Squad, SelectionError> {
        if objective.len() != pool.len() {
            return Err(SelectionError::ObjectiveLength {
                expected: pool.len(),
                actual: objective.len(),
            });
        }
        if let Some(reason) = infeasibility_reason(pool, &self.rules) {
            debug!("skipping solve: {}", reason);
            return Err(SelectionError::Infeasible);
        }

        let problem = SquadProblem::from_pool(pool, objective, &self.rules);
        let mut indices = self.solver.solve(&problem)?;

        if self.rules.tie_break == TieBreak::LowestPrice {
            indices = self.cheapest_optimum(&problem, indices);
        }

        let squad = Squad::from_indices(pool, indices, &problem.objective);
        if let Err(violation) = squad.check(pool, &self.rules) {
            error!(
                "{} backend returned an invalid squad: {}",
                self.solver.name(),
                violation
            );
            return Err(violation.into());
        }
        Ok(squad)
    }

    /// Second solve: keep the primary objective at its optimum (within a
    /// relative tolerance) and minimize total price.
    fn cheapest_optimum(&self, problem: &SquadProblem, first: Vec<usize>) -> Vec<usize> {
        let best = problem.objective_of(&first);
        let tolerance = 1e-6 * best.abs().max(1.0);
        let second = problem
            .with_objective(problem.prices.iter().map(|&p| -(p as f64)).collect())
            .with_floor(ObjectiveFloor {
                coefficients: problem.objective.clone(),
                minimum: best - tolerance,
            });
        match self.solver.solve(&second) {
            Ok(indices) => indices,
            Err(e) => {
                warn!("lowest-price tie-break failed, keeping first optimum: {}", e);
                first
            }
        }
    }
}

/// Cheap necessary conditions. `Some(reason)` means no squad can exist.
fn infeasibility_reason(pool: &PlayerPool, rules: &SquadRules) -> Option<String> {
    let size = rules.squad_size() as usize;
    if pool.len() < size {
        return Some(format!("pool has {} players, squad needs {}", pool.len(), size));
    }

    let mut cheapest_total: u64 = 0;
    for position in Position::ALL {
        let quota = rules.quotas.get(position) as usize;
        let mut prices: Vec<u32> = pool
            .players()
            .iter()
            .filter(|p| p.position == position)
            .map(|p| p.price)
            .collect();
        if prices.len() < quota {
            return Some(format!(
                "{} {}s available, quota is {}",
                prices.len(),
                position,
                quota
            ));
        }
        prices.sort_unstable();
        cheapest_total += prices.iter().take(quota).map(|&p| p as u64).sum::<u64>();
    }
    if cheapest_total > rules.budget as u64 {
        return Some(format!(
            "cheapest possible squad costs {}, budget is {}",
            cheapest_total, rules.budget
        ));
    }

    let teams: std::collections::HashSet<u32> = pool.players().iter().map(|p| p.team_id).collect();
    if teams.len() * (rules.max_per_team as usize) < size {
        return Some(format!(
            "{} teams at {} per team cannot fill {} places",
            teams.len(),
            rules.max_per_team,
            size
        ));
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
