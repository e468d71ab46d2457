// Recommendation report: the selected squad, lineup and simulation
// statistics in a form the CLI can print as text or JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

use crate::config::SquadRules;
use crate::lineup::Lineup;
use crate::optimizer::Squad;
use crate::pool::{PlayerPool, Position};
use crate::simulation::RobustSelection;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub trials: usize,
    pub infeasible_trials: usize,
    pub seed: u64,
    pub mean_selection_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedPlayer {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub team_id: u32,
    pub team_name: Option<String>,
    pub price: u32,
    pub score: f64,
    pub volatility: Option<f64>,
    pub selection_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub generated_at: DateTime<Utc>,
    pub simulation: Option<SimulationSummary>,
    /// By position, then descending selection probability (or score).
    pub players: Vec<RecommendedPlayer>,
    pub total_price: u32,
    pub budget: u32,
    pub total_score: f64,
    pub lineup: Option<Lineup>,
}

/// Budget units are tenths of a million: 55 → "£5.5m".
pub fn format_price(price: u32) -> String {
    format!("£{:.1}m", price as f64 / 10.0)
}

impl Recommendation {
    /// Report for a single-shot squad.
    pub fn from_squad(
        pool: &PlayerPool,
        squad: &Squad,
        rules: &SquadRules,
        lineup: Option<Lineup>,
    ) -> Self {
        let mut players: Vec<RecommendedPlayer> = squad
            .players(pool)
            .map(|p| RecommendedPlayer {
                id: p.id,
                name: p.name.clone(),
                position: p.position,
                team_id: p.team_id,
                team_name: p.team_name.clone(),
                price: p.price,
                score: p.score,
                volatility: p.volatility,
                selection_probability: None,
            })
            .collect();
        players.sort_by(|a, b| {
            a.position
                .sort_order()
                .cmp(&b.position.sort_order())
                .then(b.score.total_cmp(&a.score))
        });
        Recommendation {
            generated_at: Utc::now(),
            simulation: None,
            players,
            total_price: squad.total_price,
            budget: rules.budget,
            total_score: squad.total_score(pool),
            lineup,
        }
    }

    /// Report for a Monte Carlo selection. Volatility is the noise scale
    /// used in the trials.
    pub fn from_robust(
        pool: &PlayerPool,
        selection: &RobustSelection,
        rules: &SquadRules,
        lineup: Option<Lineup>,
    ) -> Self {
        let players = selection
            .picks
            .iter()
            .map(|pick| RecommendedPlayer {
                id: pick.player_id,
                name: pick.name.clone(),
                position: pick.position,
                team_id: pick.team_id,
                team_name: pool.by_id(pick.player_id).and_then(|p| p.team_name.clone()),
                price: pick.price,
                score: pick.base_score,
                volatility: Some(pick.volatility),
                selection_probability: Some(pick.selection_probability),
            })
            .collect();
        Recommendation {
            generated_at: Utc::now(),
            simulation: Some(SimulationSummary {
                trials: selection.trials,
                infeasible_trials: selection.infeasible_trials,
                seed: selection.seed,
                mean_selection_probability: selection.mean_selection_probability(),
            }),
            players,
            total_price: selection.squad.total_price,
            budget: rules.budget,
            total_score: selection.squad.total_score(pool),
            lineup,
        }
    }

    pub fn remaining_budget(&self) -> i64 {
        self.budget as i64 - self.total_price as i64
    }

    fn player(&self, id: u32) -> Option<&RecommendedPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_line(&self, p: &RecommendedPlayer) -> String {
        let mut line = format!(
            "{:<4} {:<24} {:<14} {:>7}  score {:>5.1}",
            p.position.short_label(),
            p.name,
            p.team_name.clone().unwrap_or_else(|| format!("team {}", p.team_id)),
            format_price(p.price),
            p.score
        );
        if let Some(vol) = p.volatility {
            let _ = write!(line, "  vol {:>4.1}", vol);
        }
        if let Some(prob) = p.selection_probability {
            let _ = write!(line, "  picked {:>5.1}%", prob * 100.0);
        }
        if let Some(lineup) = &self.lineup {
            if lineup.captain == p.id {
                line.push_str("  (C)");
            } else if lineup.vice_captain == p.id {
                line.push_str("  (VC)");
            }
        }
        line
    }

    /// Plain-text rendering for the terminal.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Squad recommendation ({})",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        );
        if let Some(sim) = &self.simulation {
            let _ = writeln!(
                out,
                "Monte Carlo: {} trials ({} infeasible), seed {}, mean selection {:.1}%",
                sim.trials,
                sim.infeasible_trials,
                sim.seed,
                sim.mean_selection_probability * 100.0
            );
        }
        let _ = writeln!(
            out,
            "Total {} of {} ({} left), base score {:.1}",
            format_price(self.total_price),
            format_price(self.budget),
            format_price(self.remaining_budget().max(0) as u32),
            self.total_score
        );

        match &self.lineup {
            Some(lineup) => {
                let _ = writeln!(out, "\nStarting XI ({})", lineup.formation);
                for id in &lineup.starters {
                    if let Some(p) = self.player(*id) {
                        let _ = writeln!(out, "  {}", self.player_line(p));
                    }
                }
                let _ = writeln!(out, "\nBench");
                for (n, id) in lineup.bench.iter().enumerate() {
                    if let Some(p) = self.player(*id) {
                        let _ = writeln!(out, "  {}. {}", n + 1, self.player_line(p));
                    }
                }
            }
            None => {
                let _ = writeln!(out);
                for p in &self.players {
                    let _ = writeln!(out, "  {}", self.player_line(p));
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
