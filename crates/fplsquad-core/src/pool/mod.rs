// Player pool: positions, players, and the immutable pool snapshot the
// optimizer and simulation work from.

pub mod loader;
pub mod validate;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use loader::{load_pool, load_records};
pub use validate::{build_pool, PlayerRecord, PoolIssue, ValidationReport};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Squad positions. Every pool player has exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Parse a position label.
    ///
    /// Accepts full names ("Goalkeeper"), FPL short codes ("GK"/"GKP",
    /// "DEF", "MID", "FWD") and the numeric FPL `element_type` (1-4).
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GOALKEEPER" | "GK" | "GKP" | "G" | "1" => Some(Position::Goalkeeper),
            "DEFENDER" | "DEF" | "D" | "2" => Some(Position::Defender),
            "MIDFIELDER" | "MID" | "M" | "3" => Some(Position::Midfielder),
            "FORWARD" | "FWD" | "F" | "4" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
        }
    }

    /// Deterministic ordering index for squad display (GK first).
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One validated row of the player pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub position: Position,
    /// Price in integer budget units.
    pub price: u32,
    pub team_id: u32,
    #[serde(default)]
    pub team_name: Option<String>,
    /// Base objective value (expected points or a composite performance score).
    pub score: f64,
    /// Standard deviation of the player's historical per-match score.
    #[serde(default)]
    pub volatility: Option<f64>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("duplicate player id {0} in pool")]
    DuplicateId(u32),

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// PlayerPool
// ---------------------------------------------------------------------------

/// Immutable snapshot of the players eligible for selection.
///
/// Player ids are unique. Indices into `players()` are the positions the
/// optimizer reports; they stay valid for the lifetime of the pool.
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    players: Vec<Player>,
    index_by_id: HashMap<u32, usize>,
}

impl PlayerPool {
    /// Build a pool, rejecting duplicate ids.
    pub fn new(players: Vec<Player>) -> Result<Self, PoolError> {
        let mut index_by_id = HashMap::with_capacity(players.len());
        for (idx, player) in players.iter().enumerate() {
            if index_by_id.insert(player.id, idx).is_some() {
                return Err(PoolError::DuplicateId(player.id));
            }
        }
        Ok(Self {
            players,
            index_by_id,
        })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    pub fn by_id(&self, id: u32) -> Option<&Player> {
        self.index_of(id).map(|idx| &self.players[idx])
    }

    /// Base scores in pool order.
    pub fn base_scores(&self) -> Vec<f64> {
        self.players.iter().map(|p| p.score).collect()
    }

    /// A new pool without the given player ids (unknown ids are ignored).
    pub fn excluding(&self, ids: &[u32]) -> PlayerPool {
        let players: Vec<Player> = self
            .players
            .iter()
            .filter(|p| !ids.contains(&p.id))
            .cloned()
            .collect();
        let index_by_id = players
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.id, idx))
            .collect();
        PlayerPool {
            players,
            index_by_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
