// Binary integer program backend on `good_lp` with the pure-Rust `microlp`
// branch-and-bound solver.

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::trace;

use super::problem::{SolveError, SquadProblem, SquadSolver};
use crate::pool::Position;

/// Default `SquadSolver`. Stateless; one model is built per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

impl MilpSolver {
    pub fn new() -> Self {
        MilpSolver
    }
}

/// `Σ weights[i] · x[i]` over `indices`.
fn weighted_sum(x: &[Variable], weights: impl Fn(usize) -> f64, indices: &[usize]) -> Expression {
    indices.iter().map(|&i| weights(i) * x[i]).sum()
}

impl SquadSolver for MilpSolver {
    fn solve(&self, problem: &SquadProblem) -> Result<Vec<usize>, SolveError> {
        let n = problem.len();
        let rules = &problem.rules;

        // Empty position groups would turn into constant constraints; they
        // can never meet a positive quota anyway.
        for position in Position::ALL {
            let quota = rules.quotas.get(position) as usize;
            if problem.members(position).len() < quota {
                return Err(SolveError::Infeasible);
            }
        }
        if n == 0 {
            return Err(SolveError::Infeasible);
        }

        let all: Vec<usize> = (0..n).collect();
        let mut vars = ProblemVariables::new();
        let x: Vec<Variable> = vars.add_vector(variable().binary(), n);

        let objective = weighted_sum(&x, |i| problem.objective[i], &all);
        let mut model = vars.maximise(objective).using(microlp);

        for position in Position::ALL {
            let members = problem.members(position);
            if members.is_empty() {
                continue;
            }
            let count = weighted_sum(&x, |_| 1.0, &members);
            model = model.with(constraint::eq(count, rules.quotas.get(position) as f64));
        }

        let spend = weighted_sum(&x, |i| problem.prices[i] as f64, &all);
        model = model.with(constraint::leq(spend, rules.budget as f64));

        for team_id in problem.teams() {
            let members = problem.team_members(team_id);
            if members.len() <= rules.max_per_team as usize {
                continue;
            }
            let count = weighted_sum(&x, |_| 1.0, &members);
            model = model.with(constraint::leq(count, rules.max_per_team as f64));
        }

        if let Some(floor) = &problem.objective_floor {
            let kept = weighted_sum(
                &x,
                |i| floor.coefficients.get(i).copied().unwrap_or(0.0),
                &all,
            );
            model = model.with(constraint::geq(kept, floor.minimum));
        }

        match model.solve() {
            Ok(solution) => {
                let selected: Vec<usize> = x
                    .iter()
                    .enumerate()
                    .filter(|(_, var)| solution.value(**var) > 0.5)
                    .map(|(i, _)| i)
                    .collect();
                trace!("milp selected {} of {} players", selected.len(), n);
                Ok(selected)
            }
            Err(ResolutionError::Infeasible) => Err(SolveError::Infeasible),
            Err(e) => Err(SolveError::Backend(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "microlp"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Quotas, SquadRules, TieBreak};
    use crate::optimizer::problem::ObjectiveFloor;

    fn one_each(budget: u32, max_per_team: u32) -> SquadRules {
        SquadRules {
            budget,
            max_per_team,
            tie_break: TieBreak::Solver,
            quotas: Quotas {
                goalkeepers: 1,
                defenders: 1,
                midfielders: 1,
                forwards: 1,
            },
        }
    }

    // Index: 0 a GK, 1 b GK, 2 c DEF, 3 d DEF, 4 e MID, 5 f MID, 6 g FWD, 7 h FWD
    fn problem(rules: SquadRules, team_ids: Vec<u32>) -> SquadProblem {
        SquadProblem {
            objective: vec![5.0, 3.0, 6.0, 2.0, 9.0, 3.0, 10.0, 5.0],
            prices: vec![50, 40, 50, 45, 90, 60, 100, 70],
            positions: vec![
                Position::Goalkeeper,
                Position::Goalkeeper,
                Position::Defender,
                Position::Defender,
                Position::Midfielder,
                Position::Midfielder,
                Position::Forward,
                Position::Forward,
            ],
            team_ids,
            rules,
            objective_floor: None,
        }
    }

    fn distinct_teams() -> Vec<u32> {
        (1..=8).collect()
    }

    #[test]
    fn picks_best_per_position_when_unconstrained() {
        let p = problem(one_each(1000, 3), distinct_teams());
        assert_eq!(MilpSolver.solve(&p).unwrap(), vec![0, 2, 4, 6]);
    }

    #[test]
    fn budget_forces_cheapest_loss() {
        // 290 at the unconstrained optimum; the cheapest way to save 40 is
        // b for a plus h for g (score loss 7).
        let p = problem(one_each(250, 3), distinct_teams());
        let selected = MilpSolver.solve(&p).unwrap();
        assert_eq!(selected, vec![1, 2, 4, 7]);
        assert_eq!(p.objective_of(&selected), 23.0);
    }

    #[test]
    fn team_cap_limits_shared_club() {
        let mut teams = distinct_teams();
        teams[2] = teams[0];
        let p = problem(one_each(1000, 1), teams);
        assert_eq!(MilpSolver.solve(&p).unwrap(), vec![1, 2, 4, 6]);
    }

    #[test]
    fn budget_below_cheapest_squad_is_infeasible() {
        let p = problem(one_each(214, 3), distinct_teams());
        assert_eq!(MilpSolver.solve(&p), Err(SolveError::Infeasible));
    }

    #[test]
    fn missing_position_is_infeasible() {
        let mut p = problem(one_each(1000, 3), distinct_teams());
        p.positions[6] = Position::Midfielder;
        p.positions[7] = Position::Midfielder;
        assert_eq!(MilpSolver.solve(&p), Err(SolveError::Infeasible));
    }

    #[test]
    fn zero_objective_still_returns_full_squad() {
        let mut p = problem(one_each(1000, 3), distinct_teams());
        p.objective = vec![0.0; 8];
        assert_eq!(MilpSolver.solve(&p).unwrap().len(), 4);
    }

    #[test]
    fn objective_floor_with_price_objective_minimises_spend() {
        let mut p = problem(one_each(1000, 3), distinct_teams());
        // Both goalkeepers now score 5; b is cheaper.
        p.objective[1] = 5.0;
        let scores = p.objective.clone();
        let cheapest = p
            .with_objective(p.prices.iter().map(|&c| -(c as f64)).collect())
            .with_floor(ObjectiveFloor {
                coefficients: scores,
                minimum: 30.0 - 1e-6,
            });
        assert_eq!(MilpSolver.solve(&cheapest).unwrap(), vec![1, 2, 4, 6]);
    }
}
