//! Point cost rules.
//!
//! Costs are always derived from the current squad state and never cached.
//! The engine does not check legality: a member carrying more upgrades than
//! it has slots for is still summed as it stands.

use uuid::Uuid;

use crate::{
    catalog::Catalog,
    error::{SquadError, SquadResult},
    models::{CostRule, Pilot, Ship, ShipSize, Stat, Upgrade, UpgradeCost, UpgradeTarget},
    squad::{Member, Squad, UpgradeHandle},
};

/// Per-line cost of a member as shown on a squad listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostBreakdown {
    /// Member the breakdown belongs to.
    pub member: Uuid,
    /// Pilot base cost.
    pub pilot: i32,
    /// Resolved cost of every equipped upgrade, in equip order.
    pub upgrades: Vec<(UpgradeHandle, i32)>,
}

impl CostBreakdown {
    /// Pilot cost plus all upgrade costs.
    pub fn total(&self) -> SquadResult<i32> {
        self.upgrades
            .iter()
            .try_fold(self.pilot, |total, &(_, cost)| add_points(total, cost))
    }
}

/// Resolves point costs against a catalog.
#[derive(Debug, Clone, Copy)]
pub struct CostEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> CostEngine<'a> {
    /// Create an engine reading card data from `catalog`.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Total cost of a squad.
    pub fn squad_cost(&self, squad: &Squad) -> SquadResult<i32> {
        squad
            .members()
            .iter()
            .try_fold(0, |total, member| add_points(total, self.member_cost(member)?))
    }

    /// Pilot cost plus the resolved cost of each equipped upgrade.
    pub fn member_cost(&self, member: &Member) -> SquadResult<i32> {
        self.member_breakdown(member)?.total()
    }

    /// Line-by-line cost of a member.
    pub fn member_breakdown(&self, member: &Member) -> SquadResult<CostBreakdown> {
        let ship = self.catalog.ship(member.ship())?;
        let pilot = self.catalog.pilot(member.pilot())?;
        let equipped = member
            .upgrades()
            .iter()
            .map(|equipped| self.catalog.upgrade(equipped.upgrade()))
            .collect::<SquadResult<Vec<_>>>()?;

        let host = Host {
            ship,
            pilot,
            equipped: &equipped,
        };
        let upgrades = member
            .upgrades()
            .iter()
            .zip(&equipped)
            .enumerate()
            .map(|(position, (copy, upgrade))| {
                Ok((copy.handle(), resolve(upgrade, &host, Some(position))?))
            })
            .collect::<SquadResult<Vec<_>>>()?;

        Ok(CostBreakdown {
            member: member.id(),
            pilot: pilot.cost,
            upgrades,
        })
    }

    /// Cost of `upgrade` on a member, whether or not it is already equipped
    /// there. An equipped copy is not counted against itself.
    pub fn upgrade_cost(&self, upgrade: &Upgrade, member: &Member) -> SquadResult<i32> {
        let ship = self.catalog.ship(member.ship())?;
        let pilot = self.catalog.pilot(member.pilot())?;
        let equipped = member
            .upgrades()
            .iter()
            .map(|equipped| self.catalog.upgrade(equipped.upgrade()))
            .collect::<SquadResult<Vec<_>>>()?;
        let own = equipped
            .iter()
            .position(|candidate| candidate.id == upgrade.id);

        let host = Host {
            ship,
            pilot,
            equipped: &equipped,
        };
        resolve(upgrade, &host, own)
    }

    /// Cost of `upgrade` on a bare ship flown by `pilot`, as shown on a card
    /// viewed from the pilot's upgrade picker.
    pub fn upgrade_cost_for_pilot(&self, upgrade: &Upgrade, pilot: &Pilot) -> SquadResult<i32> {
        let ship = self.catalog.ship(&pilot.ship)?;
        let host = Host {
            ship,
            pilot,
            equipped: &[],
        };
        resolve(upgrade, &host, None)
    }
}

impl Squad {
    /// Total point cost, recomputed from the catalog.
    pub fn point_cost(&self, catalog: &Catalog) -> SquadResult<i32> {
        CostEngine::new(catalog).squad_cost(self)
    }
}

struct Host<'h> {
    ship: &'h Ship,
    pilot: &'h Pilot,
    equipped: &'h [&'h Upgrade],
}

fn add_points(total: i32, cost: i32) -> SquadResult<i32> {
    total.checked_add(cost).ok_or_else(overflow)
}

fn overflow() -> SquadError {
    SquadError::IllegalState("point cost is out of range".to_string())
}

fn resolve(upgrade: &Upgrade, host: &Host<'_>, own: Option<usize>) -> SquadResult<i32> {
    let rule = match &upgrade.cost {
        UpgradeCost::Flat(value) => return Ok(*value),
        UpgradeCost::Variable(rule) => rule,
    };

    let cost = match rule {
        CostRule::BySize {
            small,
            medium,
            large,
            huge,
        } => match host.ship.size {
            ShipSize::Small => *small,
            ShipSize::Medium => *medium,
            ShipSize::Large => *large,
            ShipSize::Huge => huge.unwrap_or(*large),
        },
        CostRule::ByStat { stat, values } => {
            let value = match stat {
                Stat::Attack => host.ship.stats.attack,
                Stat::Agility => host.ship.stats.agility,
                Stat::Hull => host.ship.stats.hull,
                Stat::Shields => host.ship.stats.shields,
                Stat::Initiative => host.pilot.initiative,
            };
            let index = usize::try_from(value.max(0)).unwrap_or(0);
            values
                .get(index)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(0)
        }
        CostRule::PerEquipped { target, base, per } => {
            let matching = host
                .equipped
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != own)
                .filter(|(_, other)| match target {
                    UpgradeTarget::Upgrade(id) => other.id == *id,
                    UpgradeTarget::Slot(kind) => other.slot == *kind,
                })
                .count();
            i32::try_from(matching)
                .ok()
                .and_then(|matching| per.checked_mul(matching))
                .and_then(|extra| base.checked_add(extra))
                .ok_or_else(overflow)?
        }
    };
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Faction, SlotKind},
        test_support::{pilot, sample_catalog, ship, upgrade},
    };

    fn squad_with(catalog: &Catalog, ship: &str, pilot: &str, upgrades: &[&str]) -> (Squad, Uuid) {
        let faction = catalog.pilot(pilot).unwrap().faction;
        let mut squad = Squad::new(faction, "Costs");
        let member = squad.add_member(catalog, ship, pilot).unwrap();
        for upgrade in upgrades {
            squad.add_upgrade(catalog, member.id(), upgrade).unwrap();
        }
        (squad, member.id())
    }

    #[test]
    fn flat_costs_add_to_pilot_cost() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);
        let (squad, _) = squad_with(
            &catalog,
            "t65xwing",
            "lukeskywalker",
            &["protontorpedoes", "r2d2", "marksmanship"],
        );
        assert_eq!(engine.member_cost(&squad.members()[0]).unwrap(), 62 + 12 + 8 + 1);
    }

    #[test]
    fn stat_and_size_rules_read_the_host() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);

        // X-wing agility 2, TIE agility 3.
        let (xwing, _) = squad_with(&catalog, "t65xwing", "lukeskywalker", &["hullupgrade"]);
        let (tie, _) = squad_with(&catalog, "tielnfighter", "academypilot", &["hullupgrade"]);
        assert_eq!(engine.member_cost(&xwing.members()[0]).unwrap(), 62 + 5);
        assert_eq!(engine.member_cost(&tie.members()[0]).unwrap(), 23 + 7);

        let elusive = catalog.upgrade("elusive").unwrap();
        let awing_pilot = catalog.pilot("greensquadronpilot").unwrap();
        let decimator_pilot = catalog.pilot("captainoicunn").unwrap();
        assert_eq!(engine.upgrade_cost_for_pilot(elusive, awing_pilot).unwrap(), 3);
        assert_eq!(
            engine
                .upgrade_cost_for_pilot(elusive, decimator_pilot)
                .unwrap(),
            1
        );
    }

    #[test]
    fn stat_lookup_clamps_to_last_value() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);
        let rule = Upgrade {
            cost: UpgradeCost::Variable(CostRule::ByStat {
                stat: Stat::Initiative,
                values: vec![1, 2, 3],
            }),
            ..upgrade("predator", SlotKind::Talent, 0)
        };
        let luke = catalog.pilot("lukeskywalker").unwrap();
        let escort = catalog.pilot("bluesquadronescort").unwrap();
        assert_eq!(engine.upgrade_cost_for_pilot(&rule, luke).unwrap(), 3);
        assert_eq!(engine.upgrade_cost_for_pilot(&rule, escort).unwrap(), 3);

        let empty = Upgrade {
            cost: UpgradeCost::Variable(CostRule::ByStat {
                stat: Stat::Hull,
                values: Vec::new(),
            }),
            ..upgrade("nothing", SlotKind::Talent, 0)
        };
        assert_eq!(engine.upgrade_cost_for_pilot(&empty, luke).unwrap(), 0);
    }

    #[test]
    fn per_equipped_rule_is_order_independent() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);

        let (alone, _) = squad_with(&catalog, "t65xwing", "lukeskywalker", &["munitionsfailsafe"]);
        assert_eq!(engine.member_cost(&alone.members()[0]).unwrap(), 62 + 1);

        let (first, _) = squad_with(
            &catalog,
            "t65xwing",
            "lukeskywalker",
            &["munitionsfailsafe", "protontorpedoes"],
        );
        let (last, _) = squad_with(
            &catalog,
            "t65xwing",
            "lukeskywalker",
            &["protontorpedoes", "munitionsfailsafe"],
        );
        let expected = 62 + 12 + 3;
        assert_eq!(engine.member_cost(&first.members()[0]).unwrap(), expected);
        assert_eq!(engine.member_cost(&last.members()[0]).unwrap(), expected);

        let failsafe = catalog.upgrade("munitionsfailsafe").unwrap();
        let member = &last.members()[0];
        assert_eq!(engine.upgrade_cost(failsafe, member).unwrap(), 3);
        assert_eq!(engine.upgrade_cost(failsafe, member).unwrap(), 3);
    }

    #[test]
    fn per_equipped_excludes_itself_when_counting_copies() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);
        let rule = Upgrade {
            cost: UpgradeCost::Variable(CostRule::PerEquipped {
                target: UpgradeTarget::Upgrade("admiralsloane".to_string()),
                base: 2,
                per: 1,
            }),
            ..upgrade("admiralsloane", SlotKind::Crew, 0)
        };
        let (squad, _) = squad_with(
            &catalog,
            "vt49decimator",
            "captainoicunn",
            &["admiralsloane"],
        );
        assert_eq!(engine.upgrade_cost(&rule, &squad.members()[0]).unwrap(), 2);
    }

    #[test]
    fn squad_cost_sums_members_and_breakdown_matches() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);
        let mut squad = Squad::new(Faction::RebelAlliance, "Mixed");
        let luke = squad
            .add_member(&catalog, "t65xwing", "lukeskywalker")
            .unwrap();
        let green = squad
            .add_member(&catalog, "rz1awing", "greensquadronpilot")
            .unwrap();
        squad
            .add_upgrade(&catalog, luke.id(), "hullupgrade")
            .unwrap();
        squad
            .add_upgrade(&catalog, green.id(), "elusive")
            .unwrap();

        let members: i32 = squad
            .members()
            .iter()
            .map(|member| engine.member_cost(member).unwrap())
            .sum();
        assert_eq!(engine.squad_cost(&squad).unwrap(), members);
        assert_eq!(squad.point_cost(&catalog).unwrap(), 62 + 5 + 20 + 3);

        let breakdown = engine.member_breakdown(&squad.members()[1]).unwrap();
        assert_eq!(breakdown.member, green.id());
        assert_eq!(breakdown.pilot, 20);
        assert_eq!(breakdown.upgrades.len(), 1);
        assert_eq!(breakdown.total().unwrap(), 23);
    }

    #[test]
    fn size_rule_covers_medium_and_huge_bases() {
        let catalog = Catalog::builder()
            .ship(ship("arc170starfighter", Faction::RebelAlliance, ShipSize::Medium))
            .ship(ship("gr75mediumtransport", Faction::RebelAlliance, ShipSize::Huge))
            .pilot(pilot("norrawexley", "arc170starfighter", Faction::RebelAlliance, 5, 45))
            .pilot(pilot("echobaseevacuees", "gr75mediumtransport", Faction::RebelAlliance, 0, 50))
            .build()
            .unwrap();
        let engine = CostEngine::new(&catalog);
        let medium = catalog.pilot("norrawexley").unwrap();
        let huge = catalog.pilot("echobaseevacuees").unwrap();

        let by_size = |huge: Option<i32>| Upgrade {
            cost: UpgradeCost::Variable(CostRule::BySize {
                small: 4,
                medium: 3,
                large: 2,
                huge,
            }),
            ..upgrade("elusive", SlotKind::Talent, 0)
        };
        assert_eq!(engine.upgrade_cost_for_pilot(&by_size(None), medium).unwrap(), 3);
        assert_eq!(engine.upgrade_cost_for_pilot(&by_size(None), huge).unwrap(), 2);
        assert_eq!(engine.upgrade_cost_for_pilot(&by_size(Some(9)), huge).unwrap(), 9);
    }

    #[test]
    fn out_of_range_costs_are_errors() {
        let catalog = sample_catalog();
        let engine = CostEngine::new(&catalog);
        let (squad, _) = squad_with(&catalog, "t65xwing", "lukeskywalker", &["protontorpedoes"]);
        let per_torpedo = Upgrade {
            cost: UpgradeCost::Variable(CostRule::PerEquipped {
                target: UpgradeTarget::Slot(SlotKind::Torpedo),
                base: 1,
                per: i32::MAX,
            }),
            ..upgrade("munitionsfailsafe", SlotKind::Modification, 0)
        };
        assert!(matches!(
            engine.upgrade_cost(&per_torpedo, &squad.members()[0]),
            Err(SquadError::IllegalState(_))
        ));

        let breakdown = CostBreakdown {
            member: squad.members()[0].id(),
            pilot: i32::MAX,
            upgrades: vec![(UpgradeHandle::new(), 1)],
        };
        assert!(matches!(breakdown.total(), Err(SquadError::IllegalState(_))));
    }

    #[test]
    fn empty_squad_costs_nothing() {
        let catalog = sample_catalog();
        let squad = Squad::new(Faction::GalacticEmpire, "Empty");
        assert_eq!(CostEngine::new(&catalog).squad_cost(&squad).unwrap(), 0);
    }
}
