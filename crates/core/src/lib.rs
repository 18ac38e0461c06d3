#![warn(clippy::all, missing_docs)]

//! Core domain logic for the X-Squad squad builder.
//!
//! This crate hosts the card catalog, the point cost rules, the squad
//! model with its validation rules, and the repository that persists
//! squads and notifies interested frontends about changes.

pub mod catalog;
pub mod config;
pub mod cost;
pub mod error;
pub mod events;
pub mod manifest;
pub mod models;
pub mod squad;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{Catalog, CatalogLoader};
pub use self::config::AppConfig;
pub use cost::{CostBreakdown, CostEngine};
pub use error::{PersistenceError, RecordKind, SquadError, SquadResult};
pub use events::{EventBus, SquadEvent, Subscription};
pub use manifest::CatalogManifest;
pub use models::{Faction, Pilot, Ship, SlotKind, Upgrade};
pub use squad::{HyperspaceChange, HyperspacePolicy, Member, Squad, UpgradeHandle};
pub use store::{JsonFileStorage, MemoryStorage, SquadRepository, SquadStorage};
