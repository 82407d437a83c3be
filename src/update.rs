// CLASSIFICATION: COMMUNITY
// Filename: update.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Image-update transaction: demote the target, flash it, promote on success.
//!
//! The demotion is persisted before a single image byte is written, so an
//! interruption mid-flash leaves the target at `priority=0, tries=1` (one
//! trial boot at the bottom of the ranking) instead of falsely promoted.
//! Promotion to priority 9 happens only after the formatter reports success.

use log::{info, warn};

use fsboot_wire::SlotId;

use crate::context::FsbContext;
use crate::flash::{FlashError, FlashPartition};
use crate::select;

/// Priority tier for a slot pushed aside while its sibling updates.
pub const PRIORITY_DEMOTED: u8 = 8;

/// Priority tier for a freshly verified image, above everything but force.
pub const PRIORITY_VERIFIED: u8 = 9;

/// Errors produced by the update transaction.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The caller supplied a zero-length image.
    #[error("update image is empty")]
    EmptyImage,
    /// The image does not fit the destination slot.
    #[error("image of {image} bytes exceeds slot {slot} capacity of {capacity} bytes")]
    ImageTooLarge {
        /// Image length in bytes.
        image: usize,
        /// Destination slot.
        slot: SlotId,
        /// Formatter-reported slot capacity.
        capacity: u64,
    },
    /// The image length is not a multiple of the device write alignment.
    #[error("image of {image} bytes is not aligned to {alignment}-byte writes")]
    ImageMisaligned {
        /// Image length in bytes.
        image: usize,
        /// Formatter-reported write alignment.
        alignment: u64,
    },
    /// Persisting the transaction state failed.
    #[error("failed to persist bootconfig: {0}")]
    Persist(#[from] FlashError),
    /// The external formatter reported failure; propagated verbatim.
    #[error("formatter failed for slot {slot}: {source}")]
    Formatter {
        /// Destination slot.
        slot: SlotId,
        /// Formatter error.
        #[source]
        source: std::io::Error,
    },
}

/// Opaque "write image to target slot" collaborator.
///
/// The real implementation wraps the NAND/UBI formatting tool; the update
/// transaction only consumes its geometry and its success/failure result.
pub trait ImageFormatter {
    /// Usable capacity of one OS slot, in bytes.
    fn slot_capacity(&self, slot: SlotId) -> u64;

    /// Required image length alignment, in bytes.
    fn write_alignment(&self) -> u64;

    /// Write the image into the slot.
    fn format(&mut self, slot: SlotId, image: &[u8]) -> std::io::Result<()>;
}

/// Run the whole update transaction and return the promoted slot.
pub fn apply_update<P, F>(
    ctx: &mut FsbContext<P>,
    formatter: &mut F,
    image: &[u8],
) -> Result<SlotId, UpdateError>
where
    P: FlashPartition,
    F: ImageFormatter,
{
    let target = update_target(ctx);
    check_capacity(formatter, target, image)?;

    info!("updating slot {target}, demoting it for the trial boot");
    mark_update_begin(ctx, target)?;

    if let Err(source) = formatter.format(target, image) {
        warn!("formatter failed for slot {target}: {source}");
        return Err(UpdateError::Formatter { slot: target, source });
    }

    mark_update_end(ctx, target)?;
    info!("slot {target} flashed and promoted to priority {PRIORITY_VERIFIED}");
    Ok(target)
}

/// The OS copy the update overwrites: whichever one would not boot next.
pub fn update_target<P: FlashPartition>(ctx: &FsbContext<P>) -> SlotId {
    if select::pick_slot(ctx.working()) == SlotId::OsCopyB {
        SlotId::OsCopyA
    } else {
        SlotId::OsCopyB
    }
}

fn sibling(target: SlotId) -> SlotId {
    if target == SlotId::OsCopyB {
        SlotId::OsCopyA
    } else {
        SlotId::OsCopyB
    }
}

fn check_capacity<F: ImageFormatter>(
    formatter: &F,
    target: SlotId,
    image: &[u8],
) -> Result<(), UpdateError> {
    if image.is_empty() {
        return Err(UpdateError::EmptyImage);
    }
    let capacity = formatter.slot_capacity(target);
    if image.len() as u64 > capacity {
        return Err(UpdateError::ImageTooLarge {
            image: image.len(),
            slot: target,
            capacity,
        });
    }
    let alignment = formatter.write_alignment();
    if alignment > 1 && image.len() as u64 % alignment != 0 {
        return Err(UpdateError::ImageMisaligned {
            image: image.len(),
            alignment,
        });
    }
    Ok(())
}

/// Persist the pre-flash demotion: recovery and the sibling drop out of the
/// verified tier, the target gets exactly one trial boot at priority 0.
fn mark_update_begin<P: FlashPartition>(
    ctx: &mut FsbContext<P>,
    target: SlotId,
) -> Result<(), UpdateError> {
    let sibling = sibling(target);
    let config = ctx.working_mut();

    let recovery = config.slot_mut(SlotId::Recovery);
    recovery.force = false;
    if recovery.priority >= PRIORITY_VERIFIED {
        recovery.priority = PRIORITY_DEMOTED;
    }

    let other = config.slot_mut(sibling);
    other.force = false;
    if other.priority >= PRIORITY_VERIFIED {
        other.priority = PRIORITY_DEMOTED;
    }

    let slot = config.slot_mut(target);
    slot.force = false;
    slot.priority = 0;
    slot.successful_boot = false;
    slot.tries_remaining = 1;

    ctx.save()?;
    Ok(())
}

/// Persist the post-flash promotion of the verified target.
fn mark_update_end<P: FlashPartition>(
    ctx: &mut FsbContext<P>,
    target: SlotId,
) -> Result<(), UpdateError> {
    ctx.working_mut().slot_mut(target).priority = PRIORITY_VERIFIED;
    ctx.save()?;
    Ok(())
}
