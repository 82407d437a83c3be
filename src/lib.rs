// CLASSIFICATION: COMMUNITY
// Filename: lib.rs v0.4
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! fsboot: failsafe boot-slot selection and tracking.
//!
//! Selects which of three boot targets (two redundant OS copies and a
//! recovery image) boots next, and durably records the outcome of boot
//! attempts in a CRC-protected record log spread across two redundant NOR
//! partitions, so a failing image is abandoned for a working one across
//! arbitrary power loss.
//!
//! The same library backs both execution contexts: the synchronous boot-time
//! picker ([`bootflow`]) and the OS-resident control surface served by
//! `fsbootd` ([`surface`]). The on-flash record codec lives in the
//! [`fsboot_wire`](wire) crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bootflow;
pub mod config;
pub mod context;
pub mod flash;
pub mod formatter;
pub mod select;
pub mod store;
pub mod surface;
pub mod update;

pub use fsboot_wire as wire;

use flash::{FileFlash, FlashError};
use store::DualPartitionStore;

/// Open the configured pair of file-backed partitions as a redundant store.
pub fn open_store(
    config: &config::PartitionConfig,
) -> Result<DualPartitionStore<FileFlash>, FlashError> {
    let primary = FileFlash::open("bootconfig-a", &config.primary, config.size)?;
    let secondary = FileFlash::open("bootconfig-b", &config.secondary, config.size)?;
    Ok(DualPartitionStore::new(primary, secondary))
}
