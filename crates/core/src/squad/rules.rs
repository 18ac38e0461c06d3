use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    error::{RecordKind, SquadError, SquadResult},
    models::Upgrade,
};

use super::{
    model::{EquippedUpgrade, Member, Squad, UpgradeHandle},
    slots::SlotLayout,
};

/// What to do with illegal content when a squad becomes hyperspace-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HyperspacePolicy {
    /// Refuse the toggle while illegal pilots or upgrades are present.
    #[default]
    Reject,
    /// Remove illegal pilots and upgrades, then set the flag.
    Strip,
}

/// Content removed while enabling hyperspace-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperspaceChange {
    /// Members whose pilot is not hyperspace legal.
    pub removed_members: Vec<Member>,
    /// Upgrades removed from the remaining members, keyed by member id.
    pub removed_upgrades: Vec<(Uuid, EquippedUpgrade)>,
}

impl HyperspaceChange {
    /// True when nothing had to be removed.
    pub fn is_empty(&self) -> bool {
        self.removed_members.is_empty() && self.removed_upgrades.is_empty()
    }
}

impl Squad {
    /// Add a member flying `pilot_id` on `ship_id` with no upgrades.
    pub fn add_member(
        &mut self,
        catalog: &Catalog,
        ship_id: &str,
        pilot_id: &str,
    ) -> SquadResult<Member> {
        let ship = catalog.ship(ship_id)?;
        let pilot = catalog.pilot(pilot_id)?;
        if pilot.ship != ship.id {
            return Err(SquadError::PilotShipMismatch {
                pilot: pilot.id.clone(),
                ship: ship.id.clone(),
            });
        }
        if pilot.faction != self.faction() {
            return Err(SquadError::FactionMismatch {
                card: pilot.name.clone(),
                expected: self.faction(),
                found: pilot.faction,
            });
        }
        if self.is_hyperspace_only() && !pilot.hyperspace {
            return Err(SquadError::HyperspaceIllegal {
                card: pilot.name.clone(),
            });
        }
        if pilot.limited > 0 && self.pilot_count(&pilot.id) >= usize::from(pilot.limited) {
            return Err(SquadError::DuplicateRestricted {
                card: pilot.name.clone(),
            });
        }

        let member = Member::new(self.fresh_member_id(), &ship.id, &pilot.id);
        self.members_mut().push(member.clone());
        debug_assert!(self.holds_member_once(member.id()));
        debug_assert!(!self.is_hyperspace_only() || hyperspace_legal(catalog, &member));
        debug!(squad = %self.id(), member = %member.id(), pilot = %pilot.id, "Member added");
        Ok(member)
    }

    /// Remove a member together with its upgrades.
    pub fn remove_member(&mut self, member_id: Uuid) -> SquadResult<Member> {
        let index = self.require_member(member_id)?;
        let member = self.members_mut().remove(index);
        debug_assert!(self.member_index(member_id).is_none());
        debug!(squad = %self.id(), member = %member_id, "Member removed");
        Ok(member)
    }

    /// Equip `upgrade_id` on a member, returning the handle of the new copy.
    pub fn add_upgrade(
        &mut self,
        catalog: &Catalog,
        member_id: Uuid,
        upgrade_id: &str,
    ) -> SquadResult<UpgradeHandle> {
        let index = self.require_member(member_id)?;
        let upgrade = catalog.upgrade(upgrade_id)?;
        let equipped = EquippedUpgrade::new(&upgrade.id);
        let handle = equipped.handle();
        self.check_upgrade(catalog, &self.members()[index], upgrade, handle)?;

        self.members_mut()[index].upgrades_mut().push(equipped);
        debug_assert!(self.occupies_slot(catalog, member_id, handle));
        debug!(squad = %self.id(), member = %member_id, upgrade = %upgrade.id, "Upgrade equipped");
        Ok(handle)
    }

    /// Unequip an upgrade.
    ///
    /// Returns the removed upgrade followed by any upgrades that lost their
    /// slot with it (a cannon sitting in a slot granted by a configuration,
    /// for instance).
    pub fn remove_upgrade(
        &mut self,
        catalog: &Catalog,
        member_id: Uuid,
        handle: UpgradeHandle,
    ) -> SquadResult<Vec<EquippedUpgrade>> {
        let index = self.require_member(member_id)?;
        let mut updated = self.members()[index].clone();
        let position = updated
            .upgrades()
            .iter()
            .position(|equipped| equipped.handle() == handle)
            .ok_or_else(|| SquadError::not_found(RecordKind::EquippedUpgrade, handle))?;

        let mut removed = vec![updated.upgrades_mut().remove(position)];
        removed.extend(strip_rejected(catalog, &mut updated)?);
        self.members_mut()[index] = updated;
        debug_assert!(self.members()[index].upgrade(handle).is_none());
        debug_assert!(self.fits_slots(catalog, member_id));

        debug!(
            squad = %self.id(),
            member = %member_id,
            removed = removed.len(),
            "Upgrade removed"
        );
        Ok(removed)
    }

    /// Turn the hyperspace-only restriction on or off.
    ///
    /// Turning it off always succeeds. Turning it on while illegal content is
    /// present fails with [`SquadError::IllegalState`] under
    /// [`HyperspacePolicy::Reject`]; under [`HyperspacePolicy::Strip`] the
    /// illegal members are removed first, then illegal upgrades (and anything
    /// that lost its slot with them), in squad order.
    pub fn set_hyperspace_only(
        &mut self,
        catalog: &Catalog,
        enabled: bool,
        policy: HyperspacePolicy,
    ) -> SquadResult<HyperspaceChange> {
        if !enabled || self.is_hyperspace_only() {
            self.set_hyperspace_flag(enabled);
            return Ok(HyperspaceChange::default());
        }

        let mut change = HyperspaceChange::default();
        let mut illegal_upgrades = 0;
        let mut kept = Vec::with_capacity(self.members().len());
        for member in self.members() {
            if catalog.pilot(member.pilot())?.hyperspace {
                kept.push(member.clone());
            } else {
                change.removed_members.push(member.clone());
            }
        }

        for member in &mut kept {
            let member_id = member.id();
            let mut legal = Vec::with_capacity(member.upgrades().len());
            for equipped in member.upgrades() {
                if catalog.upgrade(equipped.upgrade())?.hyperspace {
                    legal.push(equipped.clone());
                } else {
                    illegal_upgrades += 1;
                    change.removed_upgrades.push((member_id, equipped.clone()));
                }
            }
            *member.upgrades_mut() = legal;
            for dropped in strip_rejected(catalog, member)? {
                change.removed_upgrades.push((member_id, dropped));
            }
        }

        if !change.is_empty() && policy == HyperspacePolicy::Reject {
            return Err(SquadError::IllegalState(format!(
                "{} pilot(s) and {} upgrade(s) are not hyperspace legal",
                change.removed_members.len(),
                illegal_upgrades
            )));
        }

        if !change.is_empty() {
            info!(
                squad = %self.id(),
                members = change.removed_members.len(),
                upgrades = change.removed_upgrades.len(),
                "Stripped content that is not hyperspace legal"
            );
        }
        *self.members_mut() = kept;
        self.set_hyperspace_flag(true);
        debug_assert!(self.members().iter().all(|member| {
            hyperspace_legal(catalog, member) && self.fits_slots(catalog, member.id())
        }));
        Ok(change)
    }

    /// Derived slot layout of a member.
    pub fn slot_layout(&self, catalog: &Catalog, member_id: Uuid) -> SquadResult<SlotLayout> {
        let index = self.require_member(member_id)?;
        SlotLayout::for_member(catalog, &self.members()[index])
    }

    /// Catalog upgrades that could be equipped on the member right now.
    pub fn eligible_upgrades<'c>(
        &self,
        catalog: &'c Catalog,
        member_id: Uuid,
    ) -> SquadResult<Vec<&'c Upgrade>> {
        let index = self.require_member(member_id)?;
        let member = &self.members()[index];
        Ok(catalog
            .upgrades()
            .iter()
            .filter(|upgrade| {
                self.check_upgrade(catalog, member, upgrade, UpgradeHandle::new())
                    .is_ok()
            })
            .collect())
    }

    /// Check every squad invariant against the catalog.
    ///
    /// Squads built through the mutation API always pass; this is meant for
    /// documents loaded from storage, which may predate a catalog update.
    pub fn validate(&self, catalog: &Catalog) -> SquadResult<()> {
        let mut seen = HashSet::new();
        for member in self.members() {
            if !seen.insert(member.id()) {
                return Err(SquadError::IllegalState(format!(
                    "member id {} appears more than once",
                    member.id()
                )));
            }

            let ship = catalog.ship(member.ship())?;
            let pilot = catalog.pilot(member.pilot())?;
            if pilot.ship != ship.id {
                return Err(SquadError::PilotShipMismatch {
                    pilot: pilot.id.clone(),
                    ship: ship.id.clone(),
                });
            }
            if pilot.faction != self.faction() {
                return Err(SquadError::FactionMismatch {
                    card: pilot.name.clone(),
                    expected: self.faction(),
                    found: pilot.faction,
                });
            }
            if self.is_hyperspace_only() && !pilot.hyperspace {
                return Err(SquadError::HyperspaceIllegal {
                    card: pilot.name.clone(),
                });
            }
            if pilot.limited > 0 && self.pilot_count(&pilot.id) > usize::from(pilot.limited) {
                return Err(SquadError::DuplicateRestricted {
                    card: pilot.name.clone(),
                });
            }

            for equipped in member.upgrades() {
                let upgrade = catalog.upgrade(equipped.upgrade())?;
                if let Some(faction) = upgrade.faction.filter(|&f| f != self.faction()) {
                    return Err(SquadError::FactionMismatch {
                        card: upgrade.name.clone(),
                        expected: self.faction(),
                        found: faction,
                    });
                }
                if self.is_hyperspace_only() && !upgrade.hyperspace {
                    return Err(SquadError::HyperspaceIllegal {
                        card: upgrade.name.clone(),
                    });
                }
                let over_ship = upgrade.unique_per_ship && member.count_of(&upgrade.id) > 1;
                let over_squad = upgrade.limited > 0
                    && self.upgrade_count(&upgrade.id) > usize::from(upgrade.limited);
                if over_ship || over_squad {
                    return Err(SquadError::DuplicateRestricted {
                        card: upgrade.name.clone(),
                    });
                }
            }

            let layout = SlotLayout::for_member(catalog, member)?;
            if let Some(&handle) = layout.rejected().first() {
                let id = member
                    .upgrade(handle)
                    .map(EquippedUpgrade::upgrade)
                    .unwrap_or_default();
                return Err(SquadError::SlotUnavailable {
                    slot: catalog.upgrade(id)?.slot,
                });
            }
        }
        Ok(())
    }

    fn check_upgrade(
        &self,
        catalog: &Catalog,
        member: &Member,
        upgrade: &Upgrade,
        handle: UpgradeHandle,
    ) -> SquadResult<()> {
        if let Some(faction) = upgrade.faction.filter(|&f| f != self.faction()) {
            return Err(SquadError::FactionMismatch {
                card: upgrade.name.clone(),
                expected: self.faction(),
                found: faction,
            });
        }
        if self.is_hyperspace_only() && !upgrade.hyperspace {
            return Err(SquadError::HyperspaceIllegal {
                card: upgrade.name.clone(),
            });
        }
        let on_ship = upgrade.unique_per_ship && member.count_of(&upgrade.id) > 0;
        let in_squad = upgrade.limited > 0
            && self.upgrade_count(&upgrade.id) >= usize::from(upgrade.limited);
        if on_ship || in_squad {
            return Err(SquadError::DuplicateRestricted {
                card: upgrade.name.clone(),
            });
        }

        let mut layout = SlotLayout::for_member(catalog, member)?;
        if !layout.place(upgrade, handle) {
            return Err(SquadError::SlotUnavailable { slot: upgrade.slot });
        }
        Ok(())
    }

    // Post-mutation checks. Each looks only at what the mutation touched, so
    // stale documents loaded from storage do not trip them.

    fn holds_member_once(&self, member_id: Uuid) -> bool {
        self.members()
            .iter()
            .filter(|member| member.id() == member_id)
            .count()
            == 1
    }

    fn occupies_slot(&self, catalog: &Catalog, member_id: Uuid, handle: UpgradeHandle) -> bool {
        self.slot_layout(catalog, member_id)
            .map(|layout| layout.slot_of(handle).is_some())
            .unwrap_or(false)
    }

    fn fits_slots(&self, catalog: &Catalog, member_id: Uuid) -> bool {
        self.slot_layout(catalog, member_id)
            .map(|layout| layout.rejected().is_empty())
            .unwrap_or(false)
    }

    fn require_member(&self, member_id: Uuid) -> SquadResult<usize> {
        self.member_index(member_id)
            .ok_or_else(|| SquadError::not_found(RecordKind::Member, member_id))
    }

    fn pilot_count(&self, pilot_id: &str) -> usize {
        self.members()
            .iter()
            .filter(|member| member.pilot() == pilot_id)
            .count()
    }

    fn upgrade_count(&self, upgrade_id: &str) -> usize {
        self.members()
            .iter()
            .map(|member| member.count_of(upgrade_id))
            .sum()
    }
}

fn hyperspace_legal(catalog: &Catalog, member: &Member) -> bool {
    let pilot = catalog
        .pilot(member.pilot())
        .map(|pilot| pilot.hyperspace)
        .unwrap_or(false);
    pilot
        && member.upgrades().iter().all(|equipped| {
            catalog
                .upgrade(equipped.upgrade())
                .map(|upgrade| upgrade.hyperspace)
                .unwrap_or(false)
        })
}

/// Drop the upgrades of `member` that no longer fit its slot layout.
fn strip_rejected(catalog: &Catalog, member: &mut Member) -> SquadResult<Vec<EquippedUpgrade>> {
    let layout = SlotLayout::for_member(catalog, member)?;
    if layout.rejected().is_empty() {
        return Ok(Vec::new());
    }
    let (dropped, kept): (Vec<_>, Vec<_>) = member
        .upgrades_mut()
        .drain(..)
        .partition(|equipped| layout.rejected().contains(&equipped.handle()));
    *member.upgrades_mut() = kept;
    Ok(dropped)
}
