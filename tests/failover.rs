// CLASSIFICATION: COMMUNITY
// Filename: failover.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! End-to-end failover scenarios across simulated reboots.
//!
//! Each "reboot" reloads the context from the backing files, the way the
//! firmware and the OS-resident daemon each start from flash alone.

use fsboot::bootflow::{self, BootError, BootLauncher};
use fsboot::context::FsbContext;
use fsboot::flash::FileFlash;
use fsboot::select;
use fsboot::store::DualPartitionStore;
use fsboot::surface::ControlSurface;
use fsboot::wire::{SlotId, RECORD_LEN, TRIES_UNLIMITED};

const PARTITION_RECORDS: usize = 4;

fn reboot(dir: &tempfile::TempDir) -> FsbContext<FileFlash> {
    let size = (PARTITION_RECORDS * RECORD_LEN) as u64;
    let primary =
        FileFlash::open("bootconfig-a", &dir.path().join("bootconfig-a.img"), size).unwrap();
    let secondary =
        FileFlash::open("bootconfig-b", &dir.path().join("bootconfig-b.img"), size).unwrap();
    FsbContext::load(DualPartitionStore::new(primary, secondary))
}

struct FailingLauncher;

impl BootLauncher for FailingLauncher {
    fn launch(&mut self, slot: SlotId) -> Result<(), BootError> {
        Err(BootError::Launch {
            slot,
            source: std::io::Error::other("image hung"),
        })
    }
}

struct OkLauncher(Option<SlotId>);

impl BootLauncher for OkLauncher {
    fn launch(&mut self, slot: SlotId) -> Result<(), BootError> {
        self.0 = Some(slot);
        Ok(())
    }
}

#[test]
fn failing_image_is_abandoned_for_the_recovery_slot() {
    let dir = tempfile::tempdir().unwrap();

    // Operator enables recovery as the safety net behind both OS copies.
    {
        let ctx = reboot(&dir);
        let surface = ControlSurface::new(ctx);
        surface.write("recovery/priority", "1").unwrap();
        surface.write("commit", "1").unwrap();
    }

    // Ten tries are available across the two copies; fail them all, one
    // reboot at a time.
    for _ in 0..10 {
        let mut ctx = reboot(&dir);
        let picked = select::pick_slot(ctx.active());
        assert_ne!(picked, SlotId::Recovery);
        let _ = bootflow::run_boot(&mut ctx, &mut FailingLauncher);
    }

    // Both copies exhausted: only recovery remains bootable, and its
    // sentinel countdown never drains.
    let mut ctx = reboot(&dir);
    assert_eq!(ctx.active().slot(SlotId::OsCopyA).tries_remaining, 0);
    assert_eq!(ctx.active().slot(SlotId::OsCopyB).tries_remaining, 0);
    let mut launcher = OkLauncher(None);
    let slot = bootflow::run_boot(&mut ctx, &mut launcher).unwrap();
    assert_eq!(slot, SlotId::Recovery);
    assert_eq!(
        ctx.active().slot(SlotId::Recovery).tries_remaining,
        TRIES_UNLIMITED
    );
}

#[test]
fn all_slots_exhausted_degrades_to_the_last_chosen() {
    let dir = tempfile::tempdir().unwrap();

    // Recovery stays at priority 0; drain both OS copies.
    for _ in 0..10 {
        let mut ctx = reboot(&dir);
        let _ = bootflow::run_boot(&mut ctx, &mut FailingLauncher);
    }

    let mut ctx = reboot(&dir);
    let last_chosen = ctx.active().chosen;
    assert_eq!(select::best_bootable_slot(ctx.active()), None);
    let mut launcher = OkLauncher(None);
    let slot = bootflow::run_boot(&mut ctx, &mut launcher).unwrap();
    assert_eq!(slot, last_chosen);
}

#[test]
fn forced_slot_boots_next_and_the_force_clears() {
    let dir = tempfile::tempdir().unwrap();

    {
        let ctx = reboot(&dir);
        let surface = ControlSurface::new(ctx);
        surface.write("os-b/force", "1").unwrap();
        surface.write("commit", "1").unwrap();
    }

    let mut ctx = reboot(&dir);
    let mut launcher = OkLauncher(None);
    let slot = bootflow::run_boot(&mut ctx, &mut launcher).unwrap();
    assert_eq!(slot, SlotId::OsCopyB);

    // The force flag is one-shot.
    let ctx = reboot(&dir);
    assert!(!ctx.active().slot(SlotId::OsCopyB).force);
}

#[test]
fn successful_boot_report_sticks_across_reboots() {
    let dir = tempfile::tempdir().unwrap();

    let mut ctx = reboot(&dir);
    let mut launcher = OkLauncher(None);
    let slot = bootflow::run_boot(&mut ctx, &mut launcher).unwrap();
    assert_eq!(slot, SlotId::OsCopyA);

    // The booted OS reports success through the control surface, as the
    // health-check service does on the device.
    {
        let ctx = reboot(&dir);
        let surface = ControlSurface::new(ctx);
        surface.write("os-a/successful_boot", "1").unwrap();
        surface.write("os-a/tries_remaining", "5").unwrap();
        surface.write("commit", "1").unwrap();
    }

    // A proven slot outranks its unproven equal-priority sibling even after
    // many more boot cycles than the partitions hold records.
    for _ in 0..(PARTITION_RECORDS * 3) {
        let mut ctx = reboot(&dir);
        let mut launcher = OkLauncher(None);
        let slot = bootflow::run_boot(&mut ctx, &mut launcher).unwrap();
        assert_eq!(slot, SlotId::OsCopyA);
        let surface = ControlSurface::new(reboot(&dir));
        surface.write("os-a/tries_remaining", "5").unwrap();
        surface.write("commit", "1").unwrap();
    }
}
