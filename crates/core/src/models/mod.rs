//! Card reference records shared by the catalog, cost rules and squads.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Playable factions, keyed by their XWS identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Rebel Alliance.
    RebelAlliance,
    /// Galactic Empire.
    GalacticEmpire,
    /// Scum and Villainy.
    ScumAndVillainy,
    /// Resistance.
    Resistance,
    /// First Order.
    FirstOrder,
    /// Galactic Republic.
    GalacticRepublic,
    /// Separatist Alliance.
    SeparatistAlliance,
}

impl Faction {
    /// Every faction in display order.
    pub const ALL: [Faction; 7] = [
        Faction::RebelAlliance,
        Faction::GalacticEmpire,
        Faction::ScumAndVillainy,
        Faction::Resistance,
        Faction::FirstOrder,
        Faction::GalacticRepublic,
        Faction::SeparatistAlliance,
    ];

    /// XWS identifier used in catalog and squad documents.
    pub fn xws(&self) -> &'static str {
        match self {
            Faction::RebelAlliance => "rebelalliance",
            Faction::GalacticEmpire => "galacticempire",
            Faction::ScumAndVillainy => "scumandvillainy",
            Faction::Resistance => "resistance",
            Faction::FirstOrder => "firstorder",
            Faction::GalacticRepublic => "galacticrepublic",
            Faction::SeparatistAlliance => "separatistalliance",
        }
    }

    /// Human readable faction name.
    pub fn name(&self) -> &'static str {
        match self {
            Faction::RebelAlliance => "Rebel Alliance",
            Faction::GalacticEmpire => "Galactic Empire",
            Faction::ScumAndVillainy => "Scum and Villainy",
            Faction::Resistance => "Resistance",
            Faction::FirstOrder => "First Order",
            Faction::GalacticRepublic => "Galactic Republic",
            Faction::SeparatistAlliance => "Separatist Alliance",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Faction {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let needle = crate::catalog::canonical_id(input);
        Faction::ALL
            .into_iter()
            .find(|faction| faction.xws() == needle)
            .ok_or_else(|| format!("unknown faction '{input}'"))
    }
}

/// Upgrade slot kinds printed on ship and pilot cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SlotKind {
    Astromech,
    Cannon,
    Cargo,
    Command,
    Configuration,
    Crew,
    Device,
    Force,
    Gunner,
    Hardpoint,
    Illicit,
    Missile,
    Modification,
    Sensor,
    TacticalRelay,
    Talent,
    Team,
    Tech,
    Title,
    Torpedo,
    Turret,
}

impl SlotKind {
    /// Every slot kind, in declaration order.
    pub const ALL: [SlotKind; 21] = [
        SlotKind::Astromech,
        SlotKind::Cannon,
        SlotKind::Cargo,
        SlotKind::Command,
        SlotKind::Configuration,
        SlotKind::Crew,
        SlotKind::Device,
        SlotKind::Force,
        SlotKind::Gunner,
        SlotKind::Hardpoint,
        SlotKind::Illicit,
        SlotKind::Missile,
        SlotKind::Modification,
        SlotKind::Sensor,
        SlotKind::TacticalRelay,
        SlotKind::Talent,
        SlotKind::Team,
        SlotKind::Tech,
        SlotKind::Title,
        SlotKind::Torpedo,
        SlotKind::Turret,
    ];
}

impl FromStr for SlotKind {
    type Err = String;

    /// Accepts the data file name (`"tacticalrelay"`) or the printed label
    /// (`"Force Power"`), ignoring case and punctuation.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let needle = crate::catalog::canonical_id(input);
        SlotKind::ALL
            .into_iter()
            .find(|kind| {
                crate::catalog::canonical_id(&format!("{kind:?}")) == needle
                    || crate::catalog::canonical_id(&kind.to_string()) == needle
            })
            .ok_or_else(|| format!("unknown slot '{input}'"))
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlotKind::Astromech => "Astromech",
            SlotKind::Cannon => "Cannon",
            SlotKind::Cargo => "Cargo",
            SlotKind::Command => "Command",
            SlotKind::Configuration => "Configuration",
            SlotKind::Crew => "Crew",
            SlotKind::Device => "Device",
            SlotKind::Force => "Force Power",
            SlotKind::Gunner => "Gunner",
            SlotKind::Hardpoint => "Hardpoint",
            SlotKind::Illicit => "Illicit",
            SlotKind::Missile => "Missile",
            SlotKind::Modification => "Modification",
            SlotKind::Sensor => "Sensor",
            SlotKind::TacticalRelay => "Tactical Relay",
            SlotKind::Talent => "Talent",
            SlotKind::Team => "Team",
            SlotKind::Tech => "Tech",
            SlotKind::Title => "Title",
            SlotKind::Torpedo => "Torpedo",
            SlotKind::Turret => "Turret",
        };
        f.pad(label)
    }
}

/// Base size of a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ShipSize {
    Small,
    Medium,
    Large,
    Huge,
}

/// Card orientation; only meaningful to frontends laying out card images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Printed chassis values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ShipStats {
    #[serde(default)]
    pub attack: i32,
    #[serde(default)]
    pub agility: i32,
    #[serde(default)]
    pub hull: i32,
    #[serde(default)]
    pub shields: i32,
}

/// Adjustment a pilot or upgrade makes to the slots available on a ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "slot", rename_all = "lowercase")]
pub enum SlotModifier {
    /// Adds a slot of the given kind.
    Add(SlotKind),
    /// Removes an open slot of the given kind.
    Remove(SlotKind),
}

/// Ship chassis as flown by one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    /// XWS identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Faction this chassis entry belongs to.
    pub faction: Faction,
    /// Base size.
    pub size: ShipSize,
    /// Card orientation for display.
    #[serde(default)]
    pub orientation: Orientation,
    /// Printed chassis values.
    #[serde(default)]
    pub stats: ShipStats,
    /// Upgrade bar in printed order.
    #[serde(default)]
    pub slots: Vec<SlotKind>,
}

/// Pilot card bound to one ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    /// XWS identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Identifier of the ship this pilot flies.
    pub ship: String,
    /// Faction of the pilot.
    pub faction: Faction,
    /// Pilot initiative.
    #[serde(default)]
    pub initiative: i32,
    /// Base point cost.
    pub cost: i32,
    /// Copies allowed per squad; `0` means unlimited.
    #[serde(default)]
    pub limited: u8,
    /// Whether the pilot is legal in hyperspace-only squads.
    #[serde(default)]
    pub hyperspace: bool,
    /// Slots the pilot adds to or removes from the ship's bar.
    #[serde(default)]
    pub slot_modifiers: Vec<SlotModifier>,
}

/// Chassis value a variable cost can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum Stat {
    Attack,
    Agility,
    Hull,
    Shields,
    Initiative,
}

/// What a per-equipped cost rule counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeTarget {
    /// Copies of the named upgrade.
    Upgrade(String),
    /// Upgrades occupying the given slot kind.
    Slot(SlotKind),
}

/// Rule used by upgrades whose cost depends on the host member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum CostRule {
    /// Cost chosen by the ship's base size; huge ships fall back to the large value.
    BySize {
        small: i32,
        medium: i32,
        large: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        huge: Option<i32>,
    },
    /// Cost indexed by a stat value, clamped to the last entry.
    ByStat { stat: Stat, values: Vec<i32> },
    /// `base + per * n` where `n` counts the other equipped upgrades matching `target`.
    PerEquipped {
        target: UpgradeTarget,
        #[serde(default)]
        base: i32,
        per: i32,
    },
}

/// Printed or computed upgrade cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpgradeCost {
    /// Fixed value.
    Flat(i32),
    /// Value computed from the host member.
    Variable(CostRule),
}

/// Upgrade card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    /// XWS identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Slot kind the upgrade occupies.
    pub slot: SlotKind,
    /// Point cost.
    pub cost: UpgradeCost,
    /// Only one copy may be equipped on a single member.
    #[serde(default)]
    pub unique_per_ship: bool,
    /// Copies allowed per squad; `0` means unlimited.
    #[serde(default)]
    pub limited: u8,
    /// Whether the upgrade is legal in hyperspace-only squads.
    #[serde(default)]
    pub hyperspace: bool,
    /// Faction restriction, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction: Option<Faction>,
    /// Slots granted or consumed once equipped.
    #[serde(default)]
    pub slot_modifiers: Vec<SlotModifier>,
}

impl Upgrade {
    /// Printed cost for flat-cost upgrades.
    pub fn flat_cost(&self) -> Option<i32> {
        match self.cost {
            UpgradeCost::Flat(value) => Some(value),
            UpgradeCost::Variable(_) => None,
        }
    }
}
