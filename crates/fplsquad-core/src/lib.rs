// Library crate for fplsquad.
// Re-exports all modules so integration tests can access them.

pub mod config;
pub mod lineup;
pub mod optimizer;
pub mod pool;
pub mod report;
pub mod simulation;
