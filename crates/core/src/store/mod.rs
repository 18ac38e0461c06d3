//! Squad persistence and the shared squad list.

mod repository;
mod storage;

pub use repository::SquadRepository;
pub use storage::{JsonFileStorage, MemoryStorage, SquadStorage, DEFAULT_DATA_DIR, DEFAULT_SQUADS_FILE};
