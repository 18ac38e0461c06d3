//! Read-only card catalog.

/// Directory-backed catalog loading.
pub mod loader;

use std::collections::HashMap;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::{RecordKind, SquadError, SquadResult},
    manifest::CatalogManifest,
    models::{Faction, Pilot, Ship, SlotKind, Upgrade},
};

pub use loader::CatalogLoader;

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+$").expect("invalid card id regex"));
static STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid card name regex"));

/// Returns true when `id` is a well-formed XWS identifier, i.e. exactly what
/// [`canonical_id`] produces for some name.
pub fn is_valid_id(id: &str) -> bool {
    ID_RE.is_match(id)
}

/// Derive the XWS identifier for a card or faction name (`"R2-D2"` → `"r2d2"`).
pub fn canonical_id(name: &str) -> String {
    STRIP_RE.replace_all(&name.to_lowercase(), "").into_owned()
}

/// Immutable lookup service over ships, pilots and upgrades.
///
/// Records keep the order they were added in, which is the order listings
/// are returned in.
#[derive(Debug, Default)]
pub struct Catalog {
    manifest: CatalogManifest,
    ships: Vec<Ship>,
    pilots: Vec<Pilot>,
    upgrades: Vec<Upgrade>,
    ship_index: HashMap<String, usize>,
    pilot_index: HashMap<String, usize>,
    upgrade_index: HashMap<String, usize>,
}

impl Catalog {
    /// Start building a catalog in memory.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Version metadata the catalog was loaded with.
    pub fn manifest(&self) -> &CatalogManifest {
        &self.manifest
    }

    /// All ships.
    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    /// All pilots.
    pub fn pilots(&self) -> &[Pilot] {
        &self.pilots
    }

    /// All upgrades.
    pub fn upgrades(&self) -> &[Upgrade] {
        &self.upgrades
    }

    /// Ships flown by `faction`.
    pub fn ships_for_faction(&self, faction: Faction) -> Vec<&Ship> {
        self.ships
            .iter()
            .filter(|ship| ship.faction == faction)
            .collect()
    }

    /// Pilots flying the given ship.
    pub fn pilots_for_ship(&self, ship_id: &str) -> SquadResult<Vec<&Pilot>> {
        let ship = self.ship(ship_id)?;
        Ok(self
            .pilots
            .iter()
            .filter(|pilot| pilot.ship == ship.id)
            .collect())
    }

    /// Pilots of a faction, optionally restricted to hyperspace-legal ones.
    pub fn pilots_for_faction(&self, faction: Faction, hyperspace_only: bool) -> Vec<&Pilot> {
        self.pilots
            .iter()
            .filter(|pilot| pilot.faction == faction)
            .filter(|pilot| !hyperspace_only || pilot.hyperspace)
            .collect()
    }

    /// Upgrades occupying the given slot kind.
    pub fn upgrades_for_slot(&self, slot: SlotKind) -> Vec<&Upgrade> {
        self.upgrades
            .iter()
            .filter(|upgrade| upgrade.slot == slot)
            .collect()
    }

    /// Look up a ship by identifier.
    pub fn ship(&self, id: &str) -> SquadResult<&Ship> {
        self.ship_index
            .get(id)
            .map(|&index| &self.ships[index])
            .ok_or_else(|| SquadError::not_found(RecordKind::Ship, id))
    }

    /// Look up a pilot by identifier.
    pub fn pilot(&self, id: &str) -> SquadResult<&Pilot> {
        self.pilot_index
            .get(id)
            .map(|&index| &self.pilots[index])
            .ok_or_else(|| SquadError::not_found(RecordKind::Pilot, id))
    }

    /// Look up an upgrade by identifier.
    pub fn upgrade(&self, id: &str) -> SquadResult<&Upgrade> {
        self.upgrade_index
            .get(id)
            .map(|&index| &self.upgrades[index])
            .ok_or_else(|| SquadError::not_found(RecordKind::Upgrade, id))
    }
}

/// Collects reference records and checks them before freezing a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    manifest: CatalogManifest,
    ships: Vec<Ship>,
    pilots: Vec<Pilot>,
    upgrades: Vec<Upgrade>,
}

impl CatalogBuilder {
    /// Attach version metadata.
    pub fn manifest(mut self, manifest: CatalogManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Add a ship.
    pub fn ship(mut self, ship: Ship) -> Self {
        self.ships.push(ship);
        self
    }

    /// Add a pilot.
    pub fn pilot(mut self, pilot: Pilot) -> Self {
        self.pilots.push(pilot);
        self
    }

    /// Add an upgrade.
    pub fn upgrade(mut self, upgrade: Upgrade) -> Self {
        self.upgrades.push(upgrade);
        self
    }

    pub(crate) fn push_ship(&mut self, ship: Ship) {
        self.ships.push(ship);
    }

    pub(crate) fn push_pilot(&mut self, pilot: Pilot) {
        self.pilots.push(pilot);
    }

    pub(crate) fn push_upgrade(&mut self, upgrade: Upgrade) {
        self.upgrades.push(upgrade);
    }

    /// Validate identifiers and references and freeze the catalog.
    pub fn build(self) -> Result<Catalog> {
        let ship_index = index_records("ship", self.ships.iter().map(|ship| ship.id.as_str()))?;
        let pilot_index =
            index_records("pilot", self.pilots.iter().map(|pilot| pilot.id.as_str()))?;
        let upgrade_index = index_records(
            "upgrade",
            self.upgrades.iter().map(|upgrade| upgrade.id.as_str()),
        )?;

        for pilot in &self.pilots {
            let Some(&index) = ship_index.get(&pilot.ship) else {
                bail!("pilot '{}' references unknown ship '{}'", pilot.id, pilot.ship);
            };
            let ship = &self.ships[index];
            if ship.faction != pilot.faction {
                bail!(
                    "pilot '{}' ({}) flies ship '{}' of {}",
                    pilot.id,
                    pilot.faction,
                    ship.id,
                    ship.faction
                );
            }
        }

        Ok(Catalog {
            manifest: self.manifest,
            ships: self.ships,
            pilots: self.pilots,
            upgrades: self.upgrades,
            ship_index,
            pilot_index,
            upgrade_index,
        })
    }
}

fn index_records<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, usize>> {
    let mut index = HashMap::new();
    for (position, id) in ids.enumerate() {
        if !is_valid_id(id) {
            bail!("invalid {kind} id '{id}'");
        }
        if index.insert(id.to_string(), position).is_some() {
            bail!("duplicate {kind} id '{id}'");
        }
    }
    Ok(index)
}
