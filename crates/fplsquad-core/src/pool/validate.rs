// Input validation: turns loosely-typed upstream records into a clean
// `PlayerPool`, excluding malformed rows and sanitizing numeric columns.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{Player, PlayerPool, Position};

/// A player row as supplied by an upstream collaborator, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRecord {
    pub id: u32,
    pub name: String,
    pub position: Option<String>,
    pub price: Option<f64>,
    pub team_id: u32,
    pub team_name: Option<String>,
    pub score: Option<f64>,
    pub volatility: Option<f64>,
    /// Availability flag. When present, only "a" (available) rows are kept.
    pub status: Option<String>,
}

/// Problems found while building the pool. Rows with an exclusion issue are
/// dropped; the others are sanitized in place.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoolIssue {
    #[error("player {id}: missing position")]
    MissingPosition { id: u32 },

    #[error("player {id}: unrecognized position '{label}'")]
    UnknownPosition { id: u32, label: String },

    #[error("player {id}: invalid price {raw:?}")]
    InvalidPrice { id: u32, raw: Option<f64> },

    #[error("player {id}: duplicate id, keeping the first occurrence")]
    DuplicateId { id: u32 },

    #[error("player {id}: not available (status '{status}')")]
    Unavailable { id: u32, status: String },

    #[error("player {id}: missing or non-finite score, using 0")]
    ScoreDefaulted { id: u32 },

    #[error("player {id}: invalid volatility {value}, treating as missing")]
    VolatilityDiscarded { id: u32, value: f64 },
}

impl PoolIssue {
    /// Whether the issue removed the player from the pool.
    pub fn excludes_player(&self) -> bool {
        matches!(
            self,
            PoolIssue::MissingPosition { .. }
                | PoolIssue::UnknownPosition { .. }
                | PoolIssue::InvalidPrice { .. }
                | PoolIssue::DuplicateId { .. }
                | PoolIssue::Unavailable { .. }
        )
    }
}

/// The validated pool plus everything that had to be dropped or fixed.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub pool: PlayerPool,
    pub issues: Vec<PoolIssue>,
}

impl ValidationReport {
    pub fn excluded_count(&self) -> usize {
        self.issues.iter().filter(|i| i.excludes_player()).count()
    }
}

/// Validate upstream records and build the pool.
///
/// - missing/unrecognized position, missing/negative/non-finite price,
///   unavailable status and repeated ids exclude the row;
/// - fractional prices are truncated to integer budget units;
/// - missing or non-finite scores become 0;
/// - negative or non-finite volatility is treated as missing.
pub fn build_pool(records: Vec<PlayerRecord>) -> ValidationReport {
    let mut issues = Vec::new();
    let mut seen = HashSet::with_capacity(records.len());
    let mut players = Vec::with_capacity(records.len());

    for record in records {
        let id = record.id;

        if let Some(status) = record.status.as_deref().map(str::trim) {
            if !status.is_empty() && !status.eq_ignore_ascii_case("a") {
                issues.push(PoolIssue::Unavailable {
                    id,
                    status: status.to_string(),
                });
                continue;
            }
        }

        let position = match record.position.as_deref().map(str::trim) {
            None | Some("") => {
                issues.push(PoolIssue::MissingPosition { id });
                continue;
            }
            Some(label) => match Position::from_label(label) {
                Some(p) => p,
                None => {
                    issues.push(PoolIssue::UnknownPosition {
                        id,
                        label: label.to_string(),
                    });
                    continue;
                }
            },
        };

        let price = match record.price {
            Some(raw) if raw.is_finite() && raw >= 0.0 && raw <= u32::MAX as f64 => raw.trunc() as u32,
            raw => {
                issues.push(PoolIssue::InvalidPrice { id, raw });
                continue;
            }
        };

        if !seen.insert(id) {
            issues.push(PoolIssue::DuplicateId { id });
            continue;
        }

        let score = match record.score {
            Some(s) if s.is_finite() => s,
            _ => {
                issues.push(PoolIssue::ScoreDefaulted { id });
                0.0
            }
        };

        let volatility = match record.volatility {
            Some(v) if v.is_finite() && v >= 0.0 => Some(v),
            Some(v) => {
                issues.push(PoolIssue::VolatilityDiscarded { id, value: v });
                None
            }
            None => None,
        };

        players.push(Player {
            id,
            name: record.name.trim().to_string(),
            position,
            price,
            team_id: record.team_id,
            team_name: record
                .team_name
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            score,
            volatility,
        });
    }

    for issue in &issues {
        if issue.excludes_player() {
            warn!("excluding from pool: {}", issue);
        } else {
            debug!("sanitized: {}", issue);
        }
    }

    let pool = PlayerPool {
        index_by_id: players
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect(),
        players,
    };

    ValidationReport { pool, issues }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, position: &str, price: f64, score: f64) -> PlayerRecord {
        PlayerRecord {
            id,
            name: format!("Player {id}"),
            position: Some(position.to_string()),
            price: Some(price),
            team_id: 1,
            team_name: Some("Arsenal".into()),
            score: Some(score),
            volatility: Some(1.5),
            status: None,
        }
    }

    #[test]
    fn clean_records_pass_through() {
        let report = build_pool(vec![
            record(1, "Goalkeeper", 45.0, 3.2),
            record(2, "DEF", 50.0, 4.1),
        ]);
        assert!(report.issues.is_empty());
        assert_eq!(report.pool.len(), 2);
        let p = report.pool.by_id(2).unwrap();
        assert_eq!(p.position, Position::Defender);
        assert_eq!(p.price, 50);
        assert_eq!(p.volatility, Some(1.5));
        assert_eq!(p.team_name.as_deref(), Some("Arsenal"));
    }

    #[test]
    fn missing_and_unknown_positions_excluded() {
        let mut missing = record(1, "", 45.0, 3.0);
        missing.position = None;
        let report = build_pool(vec![
            missing,
            record(2, "Manager", 50.0, 3.0),
            record(3, "  ", 50.0, 3.0),
            record(4, "MID", 60.0, 5.0),
        ]);
        assert_eq!(report.pool.len(), 1);
        assert_eq!(report.excluded_count(), 3);
        assert!(report.issues.contains(&PoolIssue::MissingPosition { id: 1 }));
        assert!(report.issues.contains(&PoolIssue::UnknownPosition {
            id: 2,
            label: "Manager".into()
        }));
        assert!(report.issues.contains(&PoolIssue::MissingPosition { id: 3 }));
    }

    #[test]
    fn invalid_prices_excluded_and_fractional_truncated() {
        let mut no_price = record(1, "FWD", 0.0, 1.0);
        no_price.price = None;
        let report = build_pool(vec![
            no_price,
            record(2, "FWD", f64::NAN, 1.0),
            record(3, "FWD", -5.0, 1.0),
            record(4, "FWD", 75.9, 1.0),
        ]);
        assert_eq!(report.pool.len(), 1);
        assert_eq!(report.pool.by_id(4).unwrap().price, 75);
        assert_eq!(report.excluded_count(), 3);
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let report = build_pool(vec![
            record(7, "MID", 60.0, 5.0),
            record(7, "FWD", 80.0, 9.0),
        ]);
        assert_eq!(report.pool.len(), 1);
        assert_eq!(report.pool.by_id(7).unwrap().position, Position::Midfielder);
        assert_eq!(report.issues, vec![PoolIssue::DuplicateId { id: 7 }]);
    }

    #[test]
    fn non_finite_scores_default_to_zero() {
        let mut missing = record(2, "DEF", 45.0, 0.0);
        missing.score = None;
        let report = build_pool(vec![
            record(1, "DEF", 45.0, f64::INFINITY),
            missing,
            record(3, "DEF", 45.0, f64::NAN),
        ]);
        assert_eq!(report.pool.len(), 3);
        assert_eq!(report.excluded_count(), 0);
        assert!(report.pool.base_scores().iter().all(|s| *s == 0.0));
        assert_eq!(report.issues.len(), 3);
    }

    #[test]
    fn invalid_volatility_treated_as_missing() {
        let mut negative = record(1, "GK", 45.0, 2.0);
        negative.volatility = Some(-1.0);
        let mut nan = record(2, "GK", 45.0, 2.0);
        nan.volatility = Some(f64::NAN);
        let report = build_pool(vec![negative, nan]);
        assert_eq!(report.pool.len(), 2);
        assert!(report.pool.players().iter().all(|p| p.volatility.is_none()));
        assert_eq!(report.excluded_count(), 0);
    }

    #[test]
    fn unavailable_players_excluded_when_status_present() {
        let mut injured = record(1, "MID", 60.0, 5.0);
        injured.status = Some("i".into());
        let mut available = record(2, "MID", 60.0, 5.0);
        available.status = Some("a".into());
        let mut blank = record(3, "MID", 60.0, 5.0);
        blank.status = Some(String::new());
        let report = build_pool(vec![injured, available, blank]);
        assert_eq!(report.pool.len(), 2);
        assert!(report.pool.by_id(1).is_none());
        assert_eq!(
            report.issues,
            vec![PoolIssue::Unavailable {
                id: 1,
                status: "i".into()
            }]
        );
    }
}
