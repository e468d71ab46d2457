// Starting lineup, bench order and captaincy for a selected squad.

use serde::Serialize;
use std::cmp::Ordering;

use crate::config::LineupConfig;
use crate::optimizer::Squad;
use crate::pool::{Player, PlayerPool, Position};

/// Player ids split into starters and bench.
///
/// Starters are ordered by position then descending score. The bench is
/// ordered by descending score with the reserve goalkeeper(s) last.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineup {
    pub starters: Vec<u32>,
    pub bench: Vec<u32>,
    pub captain: u32,
    pub vice_captain: u32,
    /// Outfield shape, e.g. "4-4-2".
    pub formation: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LineupError {
    #[error("squad has {available} {position}s, lineup needs {needed}")]
    NotEnoughPlayers {
        position: Position,
        needed: usize,
        available: usize,
    },

    #[error("squad can only field {available} starters, lineup needs {needed}")]
    NotEnoughStarters { needed: usize, available: usize },
}

/// Higher score first, lower id on ties.
fn by_score_desc(a: &&Player, b: &&Player) -> Ordering {
    b.score.total_cmp(&a.score).then(a.id.cmp(&b.id))
}

/// Pick a starting lineup from `squad` by base score.
///
/// One goalkeeper starts. Each outfield position gets its configured minimum
/// of highest-scoring players, then the best remaining outfield players fill
/// the other places. Captain and vice captain are the two highest-scoring
/// starters.
pub fn suggest_lineup(
    pool: &PlayerPool,
    squad: &Squad,
    config: &LineupConfig,
) -> Result<Lineup, LineupError> {
    let mut players: Vec<&Player> = squad.players(pool).collect();
    players.sort_by(by_score_desc);

    let minimums = [
        (Position::Goalkeeper, 1),
        (Position::Defender, config.min_defenders),
        (Position::Midfielder, config.min_midfielders),
        (Position::Forward, config.min_forwards),
    ];

    let mut starters: Vec<&Player> = Vec::with_capacity(config.starters);
    for (position, needed) in minimums {
        let group: Vec<&Player> = players
            .iter()
            .copied()
            .filter(|p| p.position == position)
            .collect();
        if group.len() < needed {
            return Err(LineupError::NotEnoughPlayers {
                position,
                needed,
                available: group.len(),
            });
        }
        starters.extend(group.into_iter().take(needed));
    }

    let flex: Vec<&Player> = players
        .iter()
        .copied()
        .filter(|p| p.position != Position::Goalkeeper)
        .filter(|p| !starters.iter().any(|s| s.id == p.id))
        .collect();
    let open = config.starters.saturating_sub(starters.len());
    if flex.len() < open {
        return Err(LineupError::NotEnoughStarters {
            needed: config.starters,
            available: starters.len() + flex.len(),
        });
    }
    starters.extend(flex.into_iter().take(open));

    let mut bench: Vec<&Player> = players
        .iter()
        .copied()
        .filter(|p| !starters.iter().any(|s| s.id == p.id))
        .collect();
    bench.sort_by(|a, b| {
        (a.position == Position::Goalkeeper)
            .cmp(&(b.position == Position::Goalkeeper))
            .then(by_score_desc(a, b))
    });

    let mut by_score = starters.clone();
    by_score.sort_by(by_score_desc);
    let captain = by_score.first().map(|p| p.id);
    let vice_captain = by_score.get(1).map(|p| p.id);
    let (captain, vice_captain) = match (captain, vice_captain) {
        (Some(c), Some(v)) => (c, v),
        _ => {
            return Err(LineupError::NotEnoughStarters {
                needed: 2,
                available: starters.len(),
            })
        }
    };

    starters.sort_by(|a, b| {
        a.position
            .sort_order()
            .cmp(&b.position.sort_order())
            .then(by_score_desc(a, b))
    });

    let count = |pos: Position| starters.iter().filter(|p| p.position == pos).count();
    let formation = format!(
        "{}-{}-{}",
        count(Position::Defender),
        count(Position::Midfielder),
        count(Position::Forward)
    );

    Ok(Lineup {
        starters: starters.iter().map(|p| p.id).collect(),
        bench: bench.iter().map(|p| p.id).collect(),
        captain,
        vice_captain,
        formation,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // 2 GK, 5 DEF, 5 MID, 3 FWD; score encodes the intended ranking.
    fn squad_pool() -> (PlayerPool, Squad) {
        let rows: [(u32, Position, f64); 15] = [
            (1, Position::Goalkeeper, 4.0),
            (2, Position::Goalkeeper, 3.5),
            (3, Position::Defender, 5.0),
            (4, Position::Defender, 4.8),
            (5, Position::Defender, 4.6),
            (6, Position::Defender, 2.0),
            (7, Position::Defender, 1.0),
            (8, Position::Midfielder, 9.0),
            (9, Position::Midfielder, 7.5),
            (10, Position::Midfielder, 6.0),
            (11, Position::Midfielder, 5.5),
            (12, Position::Midfielder, 1.5),
            (13, Position::Forward, 8.0),
            (14, Position::Forward, 3.0),
            (15, Position::Forward, 2.5),
        ];
        let players: Vec<Player> = rows
            .iter()
            .map(|&(id, position, score)| Player {
                id,
                name: format!("P{id}"),
                position,
                price: 50,
                team_id: id,
                team_name: None,
                score,
                volatility: None,
            })
            .collect();
        let pool = PlayerPool::new(players).unwrap();
        let scores = pool.base_scores();
        let squad = Squad::from_indices(&pool, (0..15).collect(), &scores);
        (pool, squad)
    }

    #[test]
    fn default_lineup_fills_by_score() {
        let (pool, squad) = squad_pool();
        let lineup = suggest_lineup(&pool, &squad, &LineupConfig::default()).unwrap();
        assert_eq!(lineup.starters.len(), 11);
        // Minimums 1/3/2/1, then flex: MID 10, MID 11, FWD 14, FWD 15 all
        // outscore DEF 6.
        assert_eq!(lineup.starters, vec![1, 3, 4, 5, 8, 9, 10, 11, 13, 14, 15]);
        assert_eq!(lineup.formation, "3-4-3");
        assert_eq!(lineup.bench, vec![6, 12, 7, 2]);
        assert_eq!(lineup.captain, 8);
        assert_eq!(lineup.vice_captain, 13);
    }

    #[test]
    fn reserve_keeper_never_starts() {
        let (pool, squad) = squad_pool();
        let lineup = suggest_lineup(&pool, &squad, &LineupConfig::default()).unwrap();
        assert!(!lineup.starters.contains(&2));
        assert_eq!(lineup.bench.last(), Some(&2));
    }

    #[test]
    fn minimums_override_score() {
        let (pool, squad) = squad_pool();
        let config = LineupConfig {
            min_defenders: 5,
            ..LineupConfig::default()
        };
        let lineup = suggest_lineup(&pool, &squad, &config).unwrap();
        assert!(lineup.starters.contains(&7));
        assert_eq!(lineup.formation, "5-4-1");
    }

    #[test]
    fn too_few_players_for_minimum() {
        let (pool, _) = squad_pool();
        let scores = pool.base_scores();
        // No forwards in this partial squad.
        let squad = Squad::from_indices(&pool, (0..12).collect(), &scores);
        let err = suggest_lineup(&pool, &squad, &LineupConfig::default()).unwrap_err();
        assert_eq!(
            err,
            LineupError::NotEnoughPlayers {
                position: Position::Forward,
                needed: 1,
                available: 0
            }
        );
    }

    #[test]
    fn too_few_outfielders_for_starting_size() {
        let (pool, _) = squad_pool();
        let scores = pool.base_scores();
        let squad = Squad::from_indices(&pool, vec![0, 1, 2, 3, 4, 7, 8, 12], &scores);
        let err = suggest_lineup(&pool, &squad, &LineupConfig::default()).unwrap_err();
        assert_eq!(
            err,
            LineupError::NotEnoughStarters {
                needed: 11,
                available: 7
            }
        );
    }
}
