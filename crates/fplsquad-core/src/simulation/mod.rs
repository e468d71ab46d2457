// Monte Carlo robustness layer.
//
// Each trial perturbs every player's score with Gaussian noise scaled by the
// player's volatility and re-optimizes. The final squad is the optimum of a
// last solve whose objective is each player's selection frequency.

pub mod tally;
pub mod volatility;
pub mod workers;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::optimizer::{SelectionError, Squad, SquadOptimizer, SquadSolver};
use crate::pool::{PlayerPool, Position};

pub use tally::{SelectionTally, TrialSummary};
pub use volatility::{effective_volatilities, min_positive_volatility, volatility_floor};
pub use workers::WorkerPool;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("trial count must be at least 1")]
    NoTrials,

    #[error("no squad could be formed ({infeasible_trials} of {trials} trials infeasible)")]
    NoSquad {
        trials: usize,
        infeasible_trials: usize,
    },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One player of the robust squad with the numbers behind the pick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobustPick {
    pub player_id: u32,
    pub name: String,
    pub position: Position,
    pub team_id: u32,
    pub price: u32,
    pub base_score: f64,
    /// Noise scale actually used (after the floor was applied).
    pub volatility: f64,
    pub selection_probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RobustSelection {
    /// Optimum of the frequency-objective pass.
    pub squad: Squad,
    /// Selected players, by position then descending selection probability.
    pub picks: Vec<RobustPick>,
    /// `tally / trials` for every pool player, in pool order.
    pub selection_probability: Vec<f64>,
    pub tally: SelectionTally,
    pub trials: usize,
    pub infeasible_trials: usize,
    pub seed: u64,
}

impl RobustSelection {
    pub fn mean_selection_probability(&self) -> f64 {
        if self.picks.is_empty() {
            return 0.0;
        }
        self.picks.iter().map(|p| p.selection_probability).sum::<f64>() / self.picks.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Perturbed scores for one trial. The RNG for trial `t` is seeded with
/// `seed + t`, so any trial can be replayed on its own.
pub fn perturbed_scores(base: &[f64], volatilities: &[f64], seed: u64, trial: usize) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(trial as u64));
    base.iter()
        .zip(volatilities)
        .map(|(&score, &sd)| {
            let z: f64 = rng.sample(StandardNormal);
            score + sd * z
        })
        .collect()
}

fn run_trial<S: SquadSolver>(
    pool: &PlayerPool,
    optimizer: &SquadOptimizer<S>,
    base: &[f64],
    volatilities: &[f64],
    seed: u64,
    trial: usize,
) -> Result<TrialSummary, SelectionError> {
    let scores = perturbed_scores(base, volatilities, seed, trial);
    let mut summary = TrialSummary::default();
    match optimizer.select(pool, &scores) {
        Ok(squad) => {
            debug!(
                "trial {}: objective {:.3}, price {}",
                trial, squad.total_objective, squad.total_price
            );
            summary.tally.record(&squad);
            summary.succeeded = 1;
        }
        Err(SelectionError::Infeasible) => {
            debug!("trial {}: infeasible", trial);
            summary.infeasible = 1;
        }
        Err(e) => return Err(e),
    }
    Ok(summary)
}

/// Run all trials and return the accumulated tally.
///
/// The parallel path merges per-thread tallies with a sum-reduction; with a
/// fixed seed it produces exactly the same tally as the sequential path.
pub fn run_trials<S: SquadSolver>(
    pool: &PlayerPool,
    optimizer: &SquadOptimizer<S>,
    config: &SimulationConfig,
    seed: u64,
) -> Result<TrialSummary, SimulationError> {
    let base = pool.base_scores();
    let volatilities = effective_volatilities(pool, config);

    let summary = if config.parallel {
        WorkerPool::with_workers(config.workers).install(|| {
            (0..config.trials)
                .into_par_iter()
                .map(|t| run_trial(pool, optimizer, &base, &volatilities, seed, t))
                .try_reduce(TrialSummary::default, |a, b| Ok(a.merge(b)))
        })??
    } else {
        let mut acc = TrialSummary::default();
        for t in 0..config.trials {
            acc = acc.merge(run_trial(pool, optimizer, &base, &volatilities, seed, t)?);
        }
        acc
    };
    Ok(summary)
}

/// Robust squad selection over `config.trials` perturbed optimizations.
///
/// Infeasible trials are skipped. If no trial produced a squad, or the
/// final frequency pass is infeasible, returns `SimulationError::NoSquad`.
pub fn run_robust_selection<S: SquadSolver>(
    pool: &PlayerPool,
    optimizer: &SquadOptimizer<S>,
    config: &SimulationConfig,
) -> Result<RobustSelection, SimulationError> {
    if config.trials == 0 {
        return Err(SimulationError::NoTrials);
    }
    let seed = config.seed.unwrap_or_else(rand::random);
    info!(
        "Running {} trials over {} players (seed {}, {})",
        config.trials,
        pool.len(),
        seed,
        if config.parallel { "parallel" } else { "sequential" }
    );

    let summary = run_trials(pool, optimizer, config, seed)?;
    let trials = config.trials;
    info!(
        "Trials done: {} feasible, {} infeasible, {} distinct players selected",
        summary.succeeded,
        summary.infeasible,
        summary.tally.distinct_players()
    );

    let no_squad = SimulationError::NoSquad {
        trials,
        infeasible_trials: summary.infeasible,
    };
    if summary.succeeded == 0 {
        return Err(no_squad);
    }

    let frequencies = summary.tally.frequencies(pool, trials);
    let squad = match optimizer.select(pool, &frequencies) {
        Ok(squad) => squad,
        Err(SelectionError::Infeasible) => return Err(no_squad),
        Err(e) => return Err(e.into()),
    };

    let volatilities = effective_volatilities(pool, config);
    let mut picks: Vec<RobustPick> = squad
        .indices
        .iter()
        .filter_map(|&i| pool.get(i).map(|p| (i, p)))
        .map(|(i, p)| RobustPick {
            player_id: p.id,
            name: p.name.clone(),
            position: p.position,
            team_id: p.team_id,
            price: p.price,
            base_score: p.score,
            volatility: volatilities[i],
            selection_probability: frequencies[i],
        })
        .collect();
    picks.sort_by(|a, b| {
        a.position
            .sort_order()
            .cmp(&b.position.sort_order())
            .then(b.selection_probability.total_cmp(&a.selection_probability))
            .then(b.base_score.total_cmp(&a.base_score))
    });

    info!(
        "Robust squad: price {}, frequency objective {:.3}",
        squad.total_price, squad.total_objective
    );

    Ok(RobustSelection {
        squad,
        picks,
        selection_probability: frequencies,
        tally: summary.tally,
        trials,
        infeasible_trials: summary.infeasible,
        seed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Quotas, SquadRules, TieBreak};
    use crate::pool::Player;

    fn rules() -> SquadRules {
        SquadRules {
            budget: 400,
            max_per_team: 2,
            tie_break: TieBreak::Solver,
            quotas: Quotas {
                goalkeepers: 1,
                defenders: 1,
                midfielders: 1,
                forwards: 1,
            },
        }
    }

    fn player(id: u32, position: Position, score: f64, volatility: Option<f64>) -> Player {
        Player {
            id,
            name: format!("P{id}"),
            position,
            price: 50,
            team_id: id,
            team_name: None,
            score,
            volatility,
        }
    }

    fn pool() -> PlayerPool {
        PlayerPool::new(vec![
            player(1, Position::Goalkeeper, 20.0, None),
            player(2, Position::Goalkeeper, 5.0, Some(1.0)),
            player(3, Position::Defender, 30.0, Some(2.0)),
            player(4, Position::Defender, 29.5, Some(2.0)),
            player(5, Position::Midfielder, 40.0, None),
            player(6, Position::Midfielder, 10.0, None),
            player(7, Position::Forward, 50.0, Some(0.5)),
            player(8, Position::Forward, 15.0, None),
        ])
        .unwrap()
    }

    fn config(trials: usize, parallel: bool) -> SimulationConfig {
        SimulationConfig {
            trials,
            seed: Some(7),
            parallel,
            workers: 2,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn perturbation_is_reproducible_per_trial() {
        let base = vec![1.0, 2.0, 3.0];
        let vols = vec![0.5, 0.5, 0.5];
        assert_eq!(
            perturbed_scores(&base, &vols, 42, 3),
            perturbed_scores(&base, &vols, 42, 3)
        );
        assert_ne!(
            perturbed_scores(&base, &vols, 42, 3),
            perturbed_scores(&base, &vols, 42, 4)
        );
    }

    #[test]
    fn zero_volatility_leaves_scores_unchanged() {
        let base = vec![1.0, -2.0];
        assert_eq!(perturbed_scores(&base, &[0.0, 0.0], 1, 0), base);
    }

    #[test]
    fn clear_favourites_always_selected() {
        let optimizer = SquadOptimizer::new(rules());
        let result = run_robust_selection(&pool(), &optimizer, &config(20, false)).unwrap();
        assert_eq!(result.trials, 20);
        assert_eq!(result.infeasible_trials, 0);
        for id in [1, 5, 7] {
            assert_eq!(result.tally.count(id), 20);
            assert!(result.squad.contains(id));
        }
        // The two defenders are close; together they fill every trial.
        assert_eq!(result.tally.count(3) + result.tally.count(4), 20);
        assert_eq!(result.picks.len(), 4);
        assert_eq!(result.picks[0].position, Position::Goalkeeper);
    }

    #[test]
    fn probabilities_are_tally_over_trials() {
        let optimizer = SquadOptimizer::new(rules());
        let result = run_robust_selection(&pool(), &optimizer, &config(16, false)).unwrap();
        let pool = pool();
        for (i, p) in pool.players().iter().enumerate() {
            let prob = result.selection_probability[i];
            assert!((0.0..=1.0).contains(&prob));
            assert_eq!(prob, result.tally.count(p.id) as f64 / 16.0);
        }
        for pick in &result.picks {
            assert!(pick.volatility > 0.0);
        }
    }

    #[test]
    fn sequential_and_parallel_tallies_match() {
        let optimizer = SquadOptimizer::new(rules());
        let seq = run_robust_selection(&pool(), &optimizer, &config(24, false)).unwrap();
        let par = run_robust_selection(&pool(), &optimizer, &config(24, true)).unwrap();
        assert_eq!(seq.tally, par.tally);
        assert_eq!(seq.squad.player_ids, par.squad.player_ids);
    }

    #[test]
    fn zero_trials_rejected() {
        let optimizer = SquadOptimizer::new(rules());
        assert_eq!(
            run_robust_selection(&pool(), &optimizer, &config(0, false)).unwrap_err(),
            SimulationError::NoTrials
        );
    }

    #[test]
    fn infeasible_pool_reports_no_squad() {
        let optimizer = SquadOptimizer::new(rules());
        let no_forwards = pool().excluding(&[7, 8]);
        let err = run_robust_selection(&no_forwards, &optimizer, &config(5, false)).unwrap_err();
        assert_eq!(
            err,
            SimulationError::NoSquad {
                trials: 5,
                infeasible_trials: 5
            }
        );
    }

    #[test]
    fn missing_seed_is_drawn_and_reported() {
        let optimizer = SquadOptimizer::new(rules());
        let mut cfg = config(2, false);
        cfg.seed = None;
        let first = run_robust_selection(&pool(), &optimizer, &cfg).unwrap();
        cfg.seed = Some(first.seed);
        let replay = run_robust_selection(&pool(), &optimizer, &cfg).unwrap();
        assert_eq!(first.tally, replay.tally);
    }
}
