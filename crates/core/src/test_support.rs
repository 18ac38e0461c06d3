//! Catalog fixtures shared by unit tests.

use crate::{
    catalog::Catalog,
    models::{
        CostRule, Faction, Orientation, Pilot, Ship, ShipSize, ShipStats, SlotKind, SlotModifier,
        Stat, Upgrade, UpgradeCost, UpgradeTarget,
    },
};

pub fn ship(id: &str, faction: Faction, size: ShipSize) -> Ship {
    Ship {
        id: id.to_string(),
        name: id.to_string(),
        faction,
        size,
        orientation: Orientation::Portrait,
        stats: ShipStats::default(),
        slots: Vec::new(),
    }
}

fn ship_with(
    id: &str,
    faction: Faction,
    size: ShipSize,
    stats: [i32; 4],
    slots: &[SlotKind],
) -> Ship {
    Ship {
        stats: ShipStats {
            attack: stats[0],
            agility: stats[1],
            hull: stats[2],
            shields: stats[3],
        },
        slots: slots.to_vec(),
        ..ship(id, faction, size)
    }
}

pub fn pilot(id: &str, ship: &str, faction: Faction, initiative: i32, cost: i32) -> Pilot {
    Pilot {
        id: id.to_string(),
        name: id.to_string(),
        ship: ship.to_string(),
        faction,
        initiative,
        cost,
        limited: 0,
        hyperspace: true,
        slot_modifiers: Vec::new(),
    }
}

pub fn upgrade(id: &str, slot: SlotKind, cost: i32) -> Upgrade {
    Upgrade {
        id: id.to_string(),
        name: id.to_string(),
        slot,
        cost: UpgradeCost::Flat(cost),
        unique_per_ship: false,
        limited: 0,
        hyperspace: true,
        faction: None,
        slot_modifiers: Vec::new(),
    }
}

/// Small slice of the Rebel and Imperial card pool.
pub fn sample_catalog() -> Catalog {
    use Faction::{GalacticEmpire as Empire, RebelAlliance as Rebel};
    use SlotKind::*;

    Catalog::builder()
        .ship(ship_with(
            "t65xwing",
            Rebel,
            ShipSize::Small,
            [3, 2, 4, 2],
            &[Talent, Torpedo, Astromech, Modification, Configuration],
        ))
        .ship(ship_with(
            "tielnfighter",
            Empire,
            ShipSize::Small,
            [2, 3, 3, 0],
            &[Talent, Modification],
        ))
        .ship(ship_with(
            "rz1awing",
            Rebel,
            ShipSize::Small,
            [2, 3, 2, 1],
            &[Talent, Missile, Configuration],
        ))
        .ship(ship_with(
            "vt49decimator",
            Empire,
            ShipSize::Large,
            [3, 0, 12, 4],
            &[Torpedo, Crew, Crew, Gunner, Device, Modification, Title],
        ))
        .pilot(Pilot {
            limited: 1,
            slot_modifiers: vec![SlotModifier::Add(Force)],
            ..pilot("lukeskywalker", "t65xwing", Rebel, 5, 62)
        })
        .pilot(Pilot {
            hyperspace: false,
            ..pilot("bluesquadronescort", "t65xwing", Rebel, 2, 41)
        })
        .pilot(pilot("greensquadronpilot", "rz1awing", Rebel, 3, 20))
        .pilot(Pilot {
            hyperspace: false,
            slot_modifiers: vec![SlotModifier::Remove(Talent)],
            ..pilot("phoenixsquadronpilot", "rz1awing", Rebel, 1, 17)
        })
        .pilot(pilot("academypilot", "tielnfighter", Empire, 1, 23))
        .pilot(Pilot {
            limited: 1,
            ..pilot("captainoicunn", "vt49decimator", Empire, 3, 84)
        })
        .upgrade(upgrade("marksmanship", Talent, 1))
        .upgrade(Upgrade {
            cost: UpgradeCost::Variable(CostRule::BySize {
                small: 3,
                medium: 2,
                large: 1,
                huge: None,
            }),
            ..upgrade("elusive", Talent, 0)
        })
        .upgrade(upgrade("protontorpedoes", Torpedo, 12))
        .upgrade(Upgrade {
            limited: 1,
            faction: Some(Rebel),
            ..upgrade("r2d2", Astromech, 8)
        })
        .upgrade(upgrade("r2astromech", Astromech, 6))
        .upgrade(Upgrade {
            cost: UpgradeCost::Variable(CostRule::ByStat {
                stat: Stat::Agility,
                values: vec![2, 3, 5, 7],
            }),
            ..upgrade("hullupgrade", Modification, 0)
        })
        .upgrade(Upgrade {
            hyperspace: false,
            cost: UpgradeCost::Variable(CostRule::ByStat {
                stat: Stat::Agility,
                values: vec![3, 4, 6, 8],
            }),
            ..upgrade("shieldupgrade", Modification, 0)
        })
        .upgrade(Upgrade {
            cost: UpgradeCost::Variable(CostRule::PerEquipped {
                target: UpgradeTarget::Slot(Torpedo),
                base: 1,
                per: 2,
            }),
            ..upgrade("munitionsfailsafe", Modification, 0)
        })
        .upgrade(Upgrade {
            unique_per_ship: true,
            ..upgrade("clustermissiles", Missile, 4)
        })
        .upgrade(Upgrade {
            hyperspace: false,
            ..upgrade("homingmissiles", Missile, 3)
        })
        .upgrade(Upgrade {
            slot_modifiers: vec![SlotModifier::Remove(Missile)],
            ..upgrade("barragerockets", Missile, 6)
        })
        .upgrade(Upgrade {
            slot_modifiers: vec![SlotModifier::Add(Cannon)],
            ..upgrade("vectoredcannonsrz1", Configuration, 0)
        })
        .upgrade(upgrade("ioncannon", Cannon, 5))
        .upgrade(Upgrade {
            faction: Some(Rebel),
            ..upgrade("leiaorgana", Crew, 8)
        })
        .upgrade(Upgrade {
            faction: Some(Empire),
            ..upgrade("admiralsloane", Crew, 10)
        })
        .build()
        .expect("sample catalog should be consistent")
}
