// CLASSIFICATION: COMMUNITY
// Filename: context.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Owned failsafe-boot context: the active config plus a working copy.
//!
//! The context is created once per caller (boot sequence or control-surface
//! daemon), mutated field-by-field through the working copy, and persisted as
//! a brand-new log entry. The only durable state is on flash.

use log::{debug, info};

use fsboot_wire::{encode, BootConfig};

use crate::flash::{FlashError, FlashPartition};
use crate::store::DualPartitionStore;

/// Failsafe-boot context owning the redundant store.
pub struct FsbContext<P: FlashPartition> {
    store: DualPartitionStore<P>,
    active: BootConfig,
    new: BootConfig,
}

impl<P: FlashPartition> FsbContext<P> {
    /// Load the context from flash; the working copy starts equal to the
    /// active config.
    pub fn load(mut store: DualPartitionStore<P>) -> Self {
        let active = store.load();
        Self {
            store,
            active,
            new: active,
        }
    }

    /// The config last accepted as valid from flash (or the default).
    pub fn active(&self) -> &BootConfig {
        &self.active
    }

    /// The mutable working copy.
    pub fn working(&self) -> &BootConfig {
        &self.new
    }

    /// Mutably borrow the working copy.
    pub fn working_mut(&mut self) -> &mut BootConfig {
        &mut self.new
    }

    /// Discard working-copy edits by copying the active config over them.
    pub fn revert(&mut self) {
        self.new = self.active;
    }

    /// Persist the working copy as a new record on both partitions.
    ///
    /// A save whose encoded record equals the active one skips flash
    /// entirely; on success the working copy becomes the active config.
    pub fn save(&mut self) -> Result<(), FlashError> {
        let record = encode(&self.new);
        if record == encode(&self.active) {
            debug!("no changes to bootconfig, skipping save");
            return Ok(());
        }
        info!("saving new failsafe boot config");
        self.store.save(&record)?;
        self.active = self.new;
        Ok(())
    }
}
