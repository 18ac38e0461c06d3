//! Slot layout of a member.
//!
//! The layout is derived on demand rather than stored. Starting from the
//! ship's printed upgrade bar, the pilot's slot modifiers are applied, then
//! every equipped upgrade is placed in equip order: it takes the
//! earliest-declared open slot of its kind, after which its own modifiers
//! add slots (appended at the end) or remove the last open slot of a kind.
//! An upgrade that cannot be placed is reported as rejected and does not
//! affect later placements.

use crate::{
    catalog::Catalog,
    error::SquadResult,
    models::{Pilot, Ship, SlotKind, SlotModifier, Upgrade},
};

use super::{Member, UpgradeHandle};

/// Where a slot instance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// Printed on the ship card.
    Ship,
    /// Granted by the pilot card.
    Pilot,
    /// Granted by an equipped upgrade.
    Upgrade(UpgradeHandle),
}

/// One slot instance and its occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// Slot kind.
    pub kind: SlotKind,
    /// Card that provides the slot.
    pub source: SlotSource,
    /// Upgrade occupying the slot, if any.
    pub occupant: Option<UpgradeHandle>,
}

/// Derived slot instances of a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotLayout {
    slots: Vec<Slot>,
    rejected: Vec<UpgradeHandle>,
}

impl SlotLayout {
    /// Compute the layout of `member` against the catalog.
    pub fn for_member(catalog: &Catalog, member: &Member) -> SquadResult<Self> {
        let ship = catalog.ship(member.ship())?;
        let pilot = catalog.pilot(member.pilot())?;
        let mut layout = Self::base(ship, pilot);
        for equipped in member.upgrades() {
            let upgrade = catalog.upgrade(equipped.upgrade())?;
            if !layout.place(upgrade, equipped.handle()) {
                layout.rejected.push(equipped.handle());
            }
        }
        Ok(layout)
    }

    fn base(ship: &Ship, pilot: &Pilot) -> Self {
        let mut slots: Vec<Slot> = ship
            .slots
            .iter()
            .map(|&kind| Slot {
                kind,
                source: SlotSource::Ship,
                occupant: None,
            })
            .collect();
        for modifier in &pilot.slot_modifiers {
            match *modifier {
                SlotModifier::Add(kind) => slots.push(Slot {
                    kind,
                    source: SlotSource::Pilot,
                    occupant: None,
                }),
                SlotModifier::Remove(kind) => {
                    if let Some(position) = last_open(&slots, kind) {
                        slots.remove(position);
                    }
                }
            }
        }
        Self {
            slots,
            rejected: Vec::new(),
        }
    }

    /// Place `upgrade` if it fits, returning whether it did. The layout is
    /// left untouched when it does not.
    pub(crate) fn place(&mut self, upgrade: &Upgrade, handle: UpgradeHandle) -> bool {
        let Some(position) = self
            .slots
            .iter()
            .position(|slot| slot.kind == upgrade.slot && slot.occupant.is_none())
        else {
            return false;
        };

        let mut next = self.slots.clone();
        next[position].occupant = Some(handle);
        for modifier in &upgrade.slot_modifiers {
            match *modifier {
                SlotModifier::Add(kind) => next.push(Slot {
                    kind,
                    source: SlotSource::Upgrade(handle),
                    occupant: None,
                }),
                SlotModifier::Remove(kind) => match last_open(&next, kind) {
                    Some(open) => {
                        next.remove(open);
                    }
                    None => return false,
                },
            }
        }
        self.slots = next;
        true
    }

    /// Slot instances in declaration order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Equipped upgrades that no longer fit.
    pub fn rejected(&self) -> &[UpgradeHandle] {
        &self.rejected
    }

    /// Number of open slots of `kind`.
    pub fn open(&self, kind: SlotKind) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.kind == kind && slot.occupant.is_none())
            .count()
    }

    /// Slot held by the given upgrade.
    pub fn slot_of(&self, handle: UpgradeHandle) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.occupant == Some(handle))
    }
}

fn last_open(slots: &[Slot], kind: SlotKind) -> Option<usize> {
    slots
        .iter()
        .rposition(|slot| slot.kind == kind && slot.occupant.is_none())
}
