use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Faction;

/// Runtime handle of one equipped upgrade.
///
/// Handles are minted when an upgrade is equipped or loaded and are not part
/// of the stored document, so they never take part in structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpgradeHandle(Uuid);

impl UpgradeHandle {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying identifier.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for UpgradeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Upgrade card equipped on a member.
#[derive(Debug, Clone)]
pub struct EquippedUpgrade {
    handle: UpgradeHandle,
    upgrade: String,
}

impl EquippedUpgrade {
    pub(crate) fn new(upgrade: impl Into<String>) -> Self {
        Self {
            handle: UpgradeHandle::new(),
            upgrade: upgrade.into(),
        }
    }

    /// Handle used to address this copy.
    pub fn handle(&self) -> UpgradeHandle {
        self.handle
    }

    /// Catalog identifier of the upgrade card.
    pub fn upgrade(&self) -> &str {
        &self.upgrade
    }
}

impl PartialEq for EquippedUpgrade {
    fn eq(&self, other: &Self) -> bool {
        self.upgrade == other.upgrade
    }
}

impl Eq for EquippedUpgrade {}

/// One pilot flown on one ship, with its upgrades in equip order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    id: Uuid,
    #[serde(rename = "shipID")]
    ship: String,
    #[serde(rename = "pilotID")]
    pilot: String,
    #[serde(default, with = "upgrade_ids")]
    upgrades: Vec<EquippedUpgrade>,
}

impl Member {
    pub(crate) fn new(id: Uuid, ship: impl Into<String>, pilot: impl Into<String>) -> Self {
        Self {
            id,
            ship: ship.into(),
            pilot: pilot.into(),
            upgrades: Vec::new(),
        }
    }

    /// Stable member identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Catalog identifier of the ship.
    pub fn ship(&self) -> &str {
        &self.ship
    }

    /// Catalog identifier of the pilot.
    pub fn pilot(&self) -> &str {
        &self.pilot
    }

    /// Equipped upgrades in equip order.
    pub fn upgrades(&self) -> &[EquippedUpgrade] {
        &self.upgrades
    }

    /// Find an equipped upgrade by handle.
    pub fn upgrade(&self, handle: UpgradeHandle) -> Option<&EquippedUpgrade> {
        self.upgrades
            .iter()
            .find(|equipped| equipped.handle == handle)
    }

    /// Number of copies of `upgrade_id` equipped on this member.
    pub fn count_of(&self, upgrade_id: &str) -> usize {
        self.upgrades
            .iter()
            .filter(|equipped| equipped.upgrade == upgrade_id)
            .count()
    }

    pub(crate) fn upgrades_mut(&mut self) -> &mut Vec<EquippedUpgrade> {
        &mut self.upgrades
    }

    fn duplicate(&self, id: Uuid) -> Self {
        Self {
            id,
            ship: self.ship.clone(),
            pilot: self.pilot.clone(),
            upgrades: self
                .upgrades
                .iter()
                .map(|equipped| EquippedUpgrade::new(equipped.upgrade.clone()))
                .collect(),
        }
    }
}

/// Named collection of members under one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Squad {
    id: Uuid,
    faction: Faction,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_hyperspace_only: bool,
    #[serde(default)]
    obstacles: Vec<String>,
    #[serde(default)]
    vendor: Option<Value>,
    #[serde(default)]
    members: Vec<Member>,
}

impl Squad {
    /// Create an empty squad for `faction`.
    pub fn new(faction: Faction, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            faction,
            name: name.into(),
            description: String::new(),
            is_hyperspace_only: false,
            obstacles: Vec::new(),
            vendor: None,
            members: Vec::new(),
        }
    }

    /// Stable squad identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Faction every member belongs to.
    pub fn faction(&self) -> Faction {
        self.faction
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the squad is restricted to hyperspace-legal cards.
    pub fn is_hyperspace_only(&self) -> bool {
        self.is_hyperspace_only
    }

    /// Selected obstacle identifiers.
    pub fn obstacles(&self) -> &[String] {
        &self.obstacles
    }

    /// Builder/vendor payload the squad was imported with.
    pub fn vendor(&self) -> Option<&Value> {
        self.vendor.as_ref()
    }

    /// Members in display order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Find a member by identifier.
    pub fn member(&self, id: Uuid) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Update name and description.
    pub fn rename(&mut self, name: impl Into<String>, description: impl Into<String>) {
        self.name = name.into();
        self.description = description.into();
    }

    /// Replace the obstacle selection.
    pub fn set_obstacles(&mut self, obstacles: Vec<String>) {
        self.obstacles = obstacles;
    }

    /// Replace the vendor payload; `null` clears it.
    pub fn set_vendor(&mut self, vendor: Option<Value>) {
        self.vendor = vendor.filter(|value| !value.is_null());
    }

    /// Deep copy with fresh squad, member and upgrade identifiers.
    pub fn duplicate(&self) -> Squad {
        Squad {
            id: Uuid::new_v4(),
            members: self
                .members
                .iter()
                .map(|member| member.duplicate(Uuid::new_v4()))
                .collect(),
            ..self.clone()
        }
    }

    pub(crate) fn member_index(&self, id: Uuid) -> Option<usize> {
        self.members.iter().position(|member| member.id == id)
    }

    pub(crate) fn members_mut(&mut self) -> &mut Vec<Member> {
        &mut self.members
    }

    pub(crate) fn set_hyperspace_flag(&mut self, value: bool) {
        self.is_hyperspace_only = value;
    }

    pub(crate) fn fresh_member_id(&self) -> Uuid {
        loop {
            let id = Uuid::new_v4();
            if self.member_index(id).is_none() {
                return id;
            }
        }
    }
}

mod upgrade_ids {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::EquippedUpgrade;

    pub fn serialize<S>(upgrades: &[EquippedUpgrade], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(upgrades.iter().map(EquippedUpgrade::upgrade))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<EquippedUpgrade>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ids = Vec::<String>::deserialize(deserializer)?;
        Ok(ids.into_iter().map(EquippedUpgrade::new).collect())
    }
}
