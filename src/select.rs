// CLASSIFICATION: COMMUNITY
// Filename: select.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Pure slot-selection logic: comparator, picker and mark-used mutator.

use std::cmp::Ordering;

use log::warn;

use fsboot_wire::{BootConfig, SlotId, SlotInfo, TRIES_UNLIMITED};

/// Rank two slots; `Less` means `a` boots ahead of `b`.
///
/// Ranking criteria in order: `force` wins outright, then higher priority,
/// then proven slots over unproven ones, then higher `tries_remaining` so
/// equal siblings alternate rather than starve.
pub fn compare(a: &SlotInfo, b: &SlotInfo) -> Ordering {
    b.force
        .cmp(&a.force)
        .then(b.priority.cmp(&a.priority))
        .then(b.successful_boot.cmp(&a.successful_boot))
        .then(b.tries_remaining.cmp(&a.tries_remaining))
}

/// Best bootable slot, or `None` when every slot is unbootable or exhausted.
///
/// Slots with `priority == 0` or `tries_remaining == 0` are filtered before
/// ranking, so even a forced slot is excluded once unbootable. Full ties
/// break toward the lowest index.
pub fn best_bootable_slot(config: &BootConfig) -> Option<SlotId> {
    let mut best: Option<SlotId> = None;
    for id in SlotId::ALL {
        let slot = config.slot(id);
        if !slot.is_bootable() {
            continue;
        }
        match best {
            Some(current) if compare(slot, config.slot(current)) != Ordering::Less => {}
            _ => best = Some(id),
        }
    }
    best
}

/// Slot to boot next.
///
/// Falls back to the previously chosen slot when nothing qualifies: the
/// degraded mode entered once every slot is exhausted, on the theory that the
/// last choice is the least bad one left.
pub fn pick_slot(config: &BootConfig) -> SlotId {
    match best_bootable_slot(config) {
        Some(id) => id,
        None => {
            warn!(
                "no bootable slot found, attempting last chosen slot {}",
                config.chosen
            );
            config.chosen
        }
    }
}

/// Record a boot attempt against `id`: remember the choice, clear its force
/// flag and burn one try unless the countdown is exhausted or disabled.
pub fn mark_slot(config: &mut BootConfig, id: SlotId) {
    config.chosen = id;
    let slot = config.slot_mut(id);
    slot.force = false;
    if slot.tries_remaining != 0 && slot.tries_remaining != TRIES_UNLIMITED {
        slot.tries_remaining -= 1;
    }
}
