//! Concrete collaborators behind the tool traits
//!
//! Thin adapters over external services plus an in-memory graph store used
//! when no external graph backend is configured.

pub mod adzuna;
pub mod memory;
pub mod sheets;

pub use adzuna::AdzunaClient;
pub use memory::{GraphStore, RecordingSearchService};
pub use sheets::SheetsApiClient;
