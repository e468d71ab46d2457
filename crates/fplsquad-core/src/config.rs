// Configuration loading and parsing (squad.toml).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::pool::Position;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub rules: SquadRules,
    pub simulation: SimulationConfig,
    pub lineup: LineupConfig,
    pub data: DataPaths,
}

/// Raw deserialization target for the entire squad.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SquadFile {
    rules: SquadRules,
    #[serde(default)]
    simulation: SimulationConfig,
    #[serde(default)]
    lineup: LineupConfig,
    #[serde(default)]
    data: DataPaths,
}

// ---------------------------------------------------------------------------
// [rules]
// ---------------------------------------------------------------------------

/// How the optimizer chooses between squads that share the best objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Whatever optimum the solver backend reports first.
    #[default]
    Solver,
    /// Second solve that keeps the optimum and minimises total price.
    ///
    /// The optimum is held within a relative tolerance of
    /// `1e-6 * max(1, |best|)`, so a squad whose objective is below the best
    /// by less than that may be chosen when it is cheaper.
    LowestPrice,
}

/// Required number of players per position in a squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotas {
    #[serde(rename = "GK")]
    pub goalkeepers: u32,
    #[serde(rename = "DEF")]
    pub defenders: u32,
    #[serde(rename = "MID")]
    pub midfielders: u32,
    #[serde(rename = "FWD")]
    pub forwards: u32,
}

impl Quotas {
    pub fn get(&self, position: Position) -> u32 {
        match position {
            Position::Goalkeeper => self.goalkeepers,
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Forward => self.forwards,
        }
    }

    /// Sum of the four quotas, or `None` if it does not fit in a `u32`.
    pub fn checked_total(&self) -> Option<u32> {
        self.goalkeepers
            .checked_add(self.defenders)?
            .checked_add(self.midfielders)?
            .checked_add(self.forwards)
    }

    /// Saturates at `u32::MAX`; `validate` rejects quotas that overflow.
    pub fn total(&self) -> u32 {
        self.checked_total().unwrap_or(u32::MAX)
    }
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            goalkeepers: 2,
            defenders: 5,
            midfielders: 5,
            forwards: 3,
        }
    }
}

/// Hard constraints every squad must satisfy.
///
/// Prices and `budget` share the same integer unit (tenths of a currency
/// unit in the FPL convention, so the default 1000 is 100.0m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadRules {
    pub budget: u32,
    pub max_per_team: u32,
    #[serde(default)]
    pub tie_break: TieBreak,
    pub quotas: Quotas,
}

impl SquadRules {
    /// Number of players in a complete squad (sum of the position quotas).
    pub fn squad_size(&self) -> u32 {
        self.quotas.total()
    }
}

impl Default for SquadRules {
    fn default() -> Self {
        Self {
            budget: 1000,
            max_per_team: 3,
            tie_break: TieBreak::Solver,
            quotas: Quotas::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// [simulation]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of perturbed optimizations to run.
    pub trials: usize,
    /// Base seed. When absent a random seed is drawn (and logged).
    pub seed: Option<u64>,
    /// Missing or zero volatility becomes `min positive volatility * factor`.
    pub volatility_floor_factor: f64,
    /// Floor used when no player in the pool has positive volatility.
    pub fallback_volatility: f64,
    pub parallel: bool,
    /// Worker threads for the parallel path. 0 means the Rayon default.
    pub workers: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: 100,
            seed: None,
            volatility_floor_factor: 0.5,
            fallback_volatility: 0.5,
            parallel: false,
            workers: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// [lineup]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineupConfig {
    pub starters: usize,
    pub min_defenders: usize,
    pub min_midfielders: usize,
    pub min_forwards: usize,
}

impl Default for LineupConfig {
    fn default() -> Self {
        Self {
            starters: 11,
            min_defenders: 3,
            min_midfielders: 2,
            min_forwards: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// [data]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub pool: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            pool: "data/players.csv".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// File name of the squad config, under both `defaults/` and `config/`.
pub const SQUAD_FILE: &str = "squad.toml";

/// Load and validate configuration from `config/squad.toml` relative to the
/// given `base_dir`.
///
/// This does not auto-copy defaults; call `ensure_config_file()` first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let squad_path = base_dir.join("config").join(SQUAD_FILE);
    let config = parse_squad_file(&squad_path)?;
    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/squad.toml` to `config/squad.toml` when the latter is
/// missing. Returns the path written, or `None` if a config already exists.
///
/// The defaults are parsed and validated first, so a broken defaults file
/// never becomes the user's config.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let target = config_dir.join(SQUAD_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(SQUAD_FILE);
    if !source.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{SQUAD_FILE} and no defaults/{SQUAD_FILE} in {}",
                base_dir.display()
            ),
        });
    }
    validate(&parse_squad_file(&source)?)?;

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create {}: {e}", config_dir.display()),
    })?;

    // create_new so a config written concurrently is never clobbered.
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            let content = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read {}: {e}", source.display()),
            })?;
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

fn parse_squad_file(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let file: SquadFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Config {
        rules: file.rules,
        simulation: file.simulation,
        lineup: file.lineup,
        data: file.data,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let rules = &config.rules;
    if rules.budget == 0 {
        return Err(invalid("rules.budget", "must be greater than 0"));
    }
    if rules.max_per_team == 0 {
        return Err(invalid("rules.max_per_team", "must be greater than 0"));
    }

    let quota_fields: &[(&str, u32)] = &[
        ("rules.quotas.GK", rules.quotas.goalkeepers),
        ("rules.quotas.DEF", rules.quotas.defenders),
        ("rules.quotas.MID", rules.quotas.midfielders),
        ("rules.quotas.FWD", rules.quotas.forwards),
    ];
    for (name, val) in quota_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }
    if rules.quotas.checked_total().is_none() {
        return Err(invalid("rules.quotas", "sum of quotas overflows"));
    }

    let sim = &config.simulation;
    if sim.trials == 0 {
        return Err(invalid("simulation.trials", "must be > 0"));
    }
    let factor = sim.volatility_floor_factor;
    if !(factor > 0.0 && factor <= 1.0) {
        return Err(invalid(
            "simulation.volatility_floor_factor",
            format!("must be in (0.0, 1.0], got {factor}"),
        ));
    }
    let fallback = sim.fallback_volatility;
    if !(fallback.is_finite() && fallback > 0.0) {
        return Err(invalid(
            "simulation.fallback_volatility",
            format!("must be > 0, got {fallback}"),
        ));
    }

    let lineup = &config.lineup;
    let squad_size = rules.squad_size() as usize;
    if lineup.starters < 2 || lineup.starters > squad_size {
        return Err(invalid(
            "lineup.starters",
            format!("must be between 2 and the squad size ({squad_size}), got {}", lineup.starters),
        ));
    }
    let minimums = lineup.min_defenders + lineup.min_midfielders + lineup.min_forwards;
    if minimums > lineup.starters - 1 {
        return Err(invalid(
            "lineup",
            format!(
                "outfield minimums ({minimums}) exceed the {} outfield starting places",
                lineup.starters - 1
            ),
        ));
    }
    let lineup_fields: &[(&str, usize, u32)] = &[
        ("lineup.min_defenders", lineup.min_defenders, rules.quotas.defenders),
        ("lineup.min_midfielders", lineup.min_midfielders, rules.quotas.midfielders),
        ("lineup.min_forwards", lineup.min_forwards, rules.quotas.forwards),
    ];
    for (name, min, quota) in lineup_fields {
        if *min > *quota as usize {
            return Err(invalid(name, format!("{min} exceeds the squad quota of {quota}")));
        }
    }
    let outfield = squad_size - rules.quotas.goalkeepers as usize;
    if lineup.starters - 1 > outfield {
        return Err(invalid(
            "lineup.starters",
            format!("needs {} outfield starters but the squad has {outfield}", lineup.starters - 1),
        ));
    }

    if config.data.pool.trim().is_empty() {
        return Err(invalid("data.pool", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
