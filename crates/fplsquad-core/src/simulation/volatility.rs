// Volatility preprocessing: every player gets a strictly positive noise
// scale before perturbation.

use crate::config::SimulationConfig;
use crate::pool::PlayerPool;

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Smallest strictly positive, finite volatility in the pool.
pub fn min_positive_volatility(pool: &PlayerPool) -> Option<f64> {
    pool.players()
        .iter()
        .filter_map(|p| p.volatility)
        .filter(|v| is_positive(*v))
        .min_by(f64::total_cmp)
}

/// Replacement for zero or missing volatility:
/// `min positive × volatility_floor_factor`, or `fallback_volatility` when no
/// player has positive volatility.
pub fn volatility_floor(pool: &PlayerPool, config: &SimulationConfig) -> f64 {
    match min_positive_volatility(pool) {
        Some(min) => min * config.volatility_floor_factor,
        None => config.fallback_volatility,
    }
}

/// Per-player noise standard deviation, in pool order. All values are > 0.
pub fn effective_volatilities(pool: &PlayerPool, config: &SimulationConfig) -> Vec<f64> {
    let floor = volatility_floor(pool, config);
    pool.players()
        .iter()
        .map(|p| match p.volatility {
            Some(v) if is_positive(v) => v,
            _ => floor,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Player, Position};

    fn pool(vols: &[Option<f64>]) -> PlayerPool {
        PlayerPool::new(
            vols.iter()
                .enumerate()
                .map(|(i, &volatility)| Player {
                    id: i as u32 + 1,
                    name: format!("P{i}"),
                    position: Position::Midfielder,
                    price: 50,
                    team_id: 1,
                    team_name: None,
                    score: 1.0,
                    volatility,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn floor_is_half_the_minimum_positive() {
        let p = pool(&[Some(2.0), Some(0.8), None, Some(0.0)]);
        let config = SimulationConfig::default();
        assert_eq!(min_positive_volatility(&p), Some(0.8));
        assert_eq!(volatility_floor(&p, &config), 0.4);
        assert_eq!(effective_volatilities(&p, &config), vec![2.0, 0.8, 0.4, 0.4]);
    }

    #[test]
    fn fallback_when_nobody_has_positive_volatility() {
        let p = pool(&[None, Some(0.0), Some(f64::NAN)]);
        let config = SimulationConfig::default();
        assert_eq!(min_positive_volatility(&p), None);
        assert_eq!(effective_volatilities(&p, &config), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn tunable_factor_and_fallback() {
        let config = SimulationConfig {
            volatility_floor_factor: 0.25,
            fallback_volatility: 1.5,
            ..SimulationConfig::default()
        };
        assert_eq!(volatility_floor(&pool(&[Some(4.0), None]), &config), 1.0);
        assert_eq!(volatility_floor(&pool(&[None]), &config), 1.5);
    }

    #[test]
    fn every_effective_volatility_is_positive() {
        let p = pool(&[Some(3.0), None, Some(0.0), Some(f64::INFINITY), Some(0.1)]);
        let vols = effective_volatilities(&p, &SimulationConfig::default());
        assert!(vols.iter().all(|v| v.is_finite() && *v > 0.0));
        assert_eq!(vols[3], 0.05);
    }
}
