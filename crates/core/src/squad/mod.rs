//! Squad entity graph and the rules guarding its mutation.

mod model;
mod rules;
pub mod slots;

pub use model::{EquippedUpgrade, Member, Squad, UpgradeHandle};
pub use rules::{HyperspaceChange, HyperspacePolicy};
pub use slots::{Slot, SlotLayout, SlotSource};
