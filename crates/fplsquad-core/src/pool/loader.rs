// Player pool CSV loading.
//
// Accepts the canonical column names (id, name, position, price, team_id,
// team_name, score, volatility, status) plus the FPL API / legacy
// spreadsheet aliases listed on `RawPlayerRow`.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use super::validate::{build_pool, PlayerRecord, ValidationReport};
use super::PoolError;

// ---------------------------------------------------------------------------
// Raw CSV row
// ---------------------------------------------------------------------------

/// Raw CSV row. Numeric columns that fail to parse come through as `None`
/// and are dealt with by validation rather than dropping the whole row.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    id: u32,
    #[serde(alias = "full_name", alias = "web_name", default)]
    name: String,
    #[serde(alias = "Posicion", alias = "element_type", default)]
    position: Option<String>,
    #[serde(
        alias = "Precio",
        alias = "now_cost",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    price: Option<f64>,
    #[serde(alias = "team")]
    team_id: u32,
    #[serde(default)]
    team_name: Option<String>,
    #[serde(
        alias = "xP",
        alias = "performance_score",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    score: Option<f64>,
    #[serde(alias = "volatilidad", default, deserialize_with = "csv::invalid_option")]
    volatility: Option<f64>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawPlayerRow> for PlayerRecord {
    fn from(raw: RawPlayerRow) -> Self {
        PlayerRecord {
            id: raw.id,
            name: raw.name,
            position: raw.position,
            price: raw.price,
            team_id: raw.team_id,
            team_name: raw.team_name,
            score: raw.score,
            volatility: raw.volatility,
            status: raw.status,
        }
    }
}

// ---------------------------------------------------------------------------
// Reader-based loader (private, enables testing without temp files)
// ---------------------------------------------------------------------------

fn load_records_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => records.push(PlayerRecord::from(raw)),
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load unvalidated player records from a CSV file.
pub fn load_records(path: &Path) -> Result<Vec<PlayerRecord>, PoolError> {
    let file = std::fs::File::open(path).map_err(|e| PoolError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_records_from_reader(file).map_err(|e| PoolError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Load and validate a player pool from a CSV file.
///
/// Fails if the file cannot be read or if no player survives validation.
pub fn load_pool(path: &Path) -> Result<ValidationReport, PoolError> {
    let records = load_records(path)?;
    let total = records.len();
    let report = build_pool(records);
    if report.pool.is_empty() {
        return Err(PoolError::Validation(format!(
            "no valid players in {} ({} rows read)",
            path.display(),
            total
        )));
    }
    info!(
        "Loaded {} players from {} ({} excluded)",
        report.pool.len(),
        path.display(),
        report.excluded_count()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
