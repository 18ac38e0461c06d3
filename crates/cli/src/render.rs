//! Plain-text listings printed by the subcommands.

use std::fmt::Write;

use anyhow::Result;
use xsquad_core::{
    models::UpgradeCost, Catalog, CostEngine, Pilot, Ship, SlotKind, Squad, Upgrade,
};

pub fn ships(ships: &[&Ship]) -> Result<String> {
    let mut out = String::new();
    for ship in ships {
        let slots: Vec<String> = ship.slots.iter().map(SlotKind::to_string).collect();
        writeln!(
            out,
            "{:<20} {:<28} {:<20} {}",
            ship.id,
            ship.name,
            ship.faction,
            slots.join(", ")
        )?;
    }
    Ok(out)
}

pub fn pilots(pilots: &[&Pilot]) -> Result<String> {
    let mut out = String::new();
    for pilot in pilots {
        writeln!(
            out,
            "{:<28} {:<28} i{} {:>3} pts{}",
            pilot.id,
            pilot.name,
            pilot.initiative,
            pilot.cost,
            if pilot.hyperspace { "  hyperspace" } else { "" }
        )?;
    }
    Ok(out)
}

pub fn upgrades(upgrades: &[&Upgrade]) -> Result<String> {
    let mut out = String::new();
    for upgrade in upgrades {
        let cost = match upgrade.cost {
            UpgradeCost::Flat(cost) => cost.to_string(),
            UpgradeCost::Variable(_) => "var".to_string(),
        };
        writeln!(
            out,
            "{:<28} {:<28} {:<14} {:>3}",
            upgrade.id, upgrade.name, upgrade.slot, cost
        )?;
    }
    Ok(out)
}

pub fn squad_list(catalog: &Catalog, squads: &[Squad]) -> Result<String> {
    let mut out = String::new();
    if squads.is_empty() {
        writeln!(out, "No squads stored.")?;
    }
    for squad in squads {
        let cost = squad
            .point_cost(catalog)
            .map(|cost| cost.to_string())
            .unwrap_or_else(|_| "?".to_string());
        writeln!(
            out,
            "{}  {:<24} {:<22} {:>3} pts  {} ships",
            short_id(&squad.id().to_string()),
            squad.name(),
            squad.faction(),
            cost,
            squad.members().len()
        )?;
    }
    Ok(out)
}

pub fn squad(catalog: &Catalog, squad: &Squad) -> Result<String> {
    let engine = CostEngine::new(catalog);
    let mut out = String::new();
    writeln!(
        out,
        "{} [{}] {} pts{}",
        squad.name(),
        squad.faction(),
        engine.squad_cost(squad)?,
        if squad.is_hyperspace_only() {
            " (hyperspace)"
        } else {
            ""
        }
    )?;
    writeln!(out, "id {}", squad.id())?;
    if !squad.description().is_empty() {
        writeln!(out, "{}", squad.description())?;
    }
    if !squad.obstacles().is_empty() {
        writeln!(out, "obstacles: {}", squad.obstacles().join(", "))?;
    }

    for (position, member) in squad.members().iter().enumerate() {
        let pilot = catalog.pilot(member.pilot())?;
        let ship = catalog.ship(member.ship())?;
        let breakdown = engine.member_breakdown(member)?;
        let layout = squad.slot_layout(catalog, member.id())?;
        writeln!(
            out,
            "{:>2}. {} ({}) {} pts  [{}]",
            position + 1,
            pilot.name,
            ship.name,
            breakdown.total()?,
            short_id(&member.id().to_string())
        )?;
        for (handle, cost) in &breakdown.upgrades {
            let Some(equipped) = member.upgrade(*handle) else {
                continue;
            };
            let upgrade = catalog.upgrade(equipped.upgrade())?;
            let note = if layout.rejected().contains(handle) {
                "  (no slot)"
            } else {
                ""
            };
            writeln!(out, "      {:<28} {:>3}{note}", upgrade.name, cost)?;
        }
        let open: Vec<String> = layout
            .slots()
            .iter()
            .filter(|slot| slot.occupant.is_none())
            .map(|slot| slot.kind.to_string())
            .collect();
        if !open.is_empty() {
            writeln!(out, "      open: {}", open.join(", "))?;
        }
    }
    Ok(out)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
