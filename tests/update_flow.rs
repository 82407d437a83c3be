// CLASSIFICATION: COMMUNITY
// Filename: update_flow.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Image-update transaction behavior across formatter success and failure.

use fsboot::context::FsbContext;
use fsboot::flash::FileFlash;
use fsboot::select;
use fsboot::store::DualPartitionStore;
use fsboot::update::{self, ImageFormatter, UpdateError, PRIORITY_DEMOTED, PRIORITY_VERIFIED};
use fsboot::wire::{SlotId, RECORD_LEN};

struct MockFormatter {
    capacity: u64,
    alignment: u64,
    fail: bool,
    formatted: Vec<(SlotId, usize)>,
}

impl MockFormatter {
    fn new() -> Self {
        Self {
            capacity: 1024,
            alignment: 4,
            fail: false,
            formatted: Vec::new(),
        }
    }
}

impl ImageFormatter for MockFormatter {
    fn slot_capacity(&self, _slot: SlotId) -> u64 {
        self.capacity
    }

    fn write_alignment(&self) -> u64 {
        self.alignment
    }

    fn format(&mut self, slot: SlotId, image: &[u8]) -> std::io::Result<()> {
        self.formatted.push((slot, image.len()));
        if self.fail {
            return Err(std::io::Error::other("nand write failed"));
        }
        Ok(())
    }
}

fn context(dir: &tempfile::TempDir) -> FsbContext<FileFlash> {
    let size = (16 * RECORD_LEN) as u64;
    let primary =
        FileFlash::open("bootconfig-a", &dir.path().join("bootconfig-a.img"), size).unwrap();
    let secondary =
        FileFlash::open("bootconfig-b", &dir.path().join("bootconfig-b.img"), size).unwrap();
    FsbContext::load(DualPartitionStore::new(primary, secondary))
}

#[test]
fn successful_update_promotes_the_inactive_copy() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let mut formatter = MockFormatter::new();

    let slot = update::apply_update(&mut ctx, &mut formatter, &[0u8; 64]).unwrap();
    // os-a would boot next, so the update lands on os-b.
    assert_eq!(slot, SlotId::OsCopyB);
    assert_eq!(formatter.formatted, [(SlotId::OsCopyB, 64)]);

    let updated = ctx.active().slot(SlotId::OsCopyB);
    assert_eq!(updated.priority, PRIORITY_VERIFIED);
    assert_eq!(updated.tries_remaining, 1);
    assert!(!updated.successful_boot);
    assert_eq!(select::pick_slot(ctx.active()), SlotId::OsCopyB);
}

#[test]
fn failed_format_leaves_the_target_demoted() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let mut formatter = MockFormatter::new();
    formatter.fail = true;

    let err = update::apply_update(&mut ctx, &mut formatter, &[0u8; 64]).unwrap_err();
    assert!(matches!(
        err,
        UpdateError::Formatter {
            slot: SlotId::OsCopyB,
            ..
        }
    ));

    let target = ctx.active().slot(SlotId::OsCopyB);
    assert_eq!(target.priority, 0);
    assert_eq!(target.tries_remaining, 1);
    assert!(ctx.active().slot(SlotId::OsCopyA).priority <= PRIORITY_DEMOTED);
    // The untouched sibling boots, not the half-written target.
    assert_eq!(select::pick_slot(ctx.active()), SlotId::OsCopyA);
}

#[test]
fn interrupted_update_is_already_demoted_on_flash() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let mut formatter = MockFormatter::new();
    formatter.fail = true;
    let _ = update::apply_update(&mut ctx, &mut formatter, &[0u8; 64]);

    // A fresh load (as after power loss during the image write) must see the
    // demotion that was persisted before the formatter ran.
    let reloaded = context(&dir);
    assert_eq!(reloaded.active().slot(SlotId::OsCopyB).priority, 0);
    assert_eq!(reloaded.active().slot(SlotId::OsCopyB).tries_remaining, 1);
    assert_eq!(select::pick_slot(reloaded.active()), SlotId::OsCopyA);
}

#[test]
fn update_demotes_verified_tier_sibling_and_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    // A previous update left os-a verified; an operator raised recovery.
    ctx.working_mut().slot_mut(SlotId::OsCopyA).priority = PRIORITY_VERIFIED;
    ctx.working_mut().slot_mut(SlotId::Recovery).priority = PRIORITY_VERIFIED;
    ctx.working_mut().slot_mut(SlotId::Recovery).force = true;
    ctx.save().unwrap();

    let mut formatter = MockFormatter::new();
    let slot = update::apply_update(&mut ctx, &mut formatter, &[0u8; 64]).unwrap();
    assert_eq!(slot, SlotId::OsCopyB);

    assert_eq!(ctx.active().slot(SlotId::OsCopyA).priority, PRIORITY_DEMOTED);
    assert_eq!(ctx.active().slot(SlotId::Recovery).priority, PRIORITY_DEMOTED);
    assert!(!ctx.active().slot(SlotId::Recovery).force);
    assert_eq!(ctx.active().slot(SlotId::OsCopyB).priority, PRIORITY_VERIFIED);
}

#[test]
fn capacity_checks_run_before_any_flash_write() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let mut formatter = MockFormatter::new();

    assert!(matches!(
        update::apply_update(&mut ctx, &mut formatter, &[]),
        Err(UpdateError::EmptyImage)
    ));
    assert!(matches!(
        update::apply_update(&mut ctx, &mut formatter, &[0u8; 2048]),
        Err(UpdateError::ImageTooLarge { .. })
    ));
    assert!(matches!(
        update::apply_update(&mut ctx, &mut formatter, &[0u8; 10]),
        Err(UpdateError::ImageMisaligned { .. })
    ));
    assert!(formatter.formatted.is_empty());

    // Nothing may have been persisted by the rejected attempts.
    let raw = std::fs::read(dir.path().join("bootconfig-a.img")).unwrap();
    assert!(raw.iter().all(|&b| b == 0xff));
}

#[test]
fn trial_boot_of_a_bad_update_exhausts_it_for_good() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = context(&dir);
    let mut formatter = MockFormatter::new();
    update::apply_update(&mut ctx, &mut formatter, &[0u8; 64]).unwrap();

    // The trial boot of the fresh image burns its single try.
    let slot = select::pick_slot(ctx.active());
    assert_eq!(slot, SlotId::OsCopyB);
    select::mark_slot(ctx.working_mut(), slot);
    ctx.save().unwrap();

    // The image never reports success, so the selector falls back to the
    // proven sibling on the next boot.
    assert_eq!(ctx.active().slot(SlotId::OsCopyB).tries_remaining, 0);
    assert_eq!(select::pick_slot(ctx.active()), SlotId::OsCopyA);
}
