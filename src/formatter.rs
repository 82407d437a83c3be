// CLASSIFICATION: COMMUNITY
// Filename: formatter.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Command-driven image formatter.
//!
//! The NAND/UBI formatting algorithm (bad-block handling, erase counters)
//! lives outside this crate; we spool the image to a temporary file and hand
//! it to the operator-configured tool as `<command> <slot-name> <image>`.

use std::io::Write;
use std::process::Command;

use log::{debug, info};

use fsboot_wire::SlotId;

use crate::config::UpdateConfig;
use crate::update::ImageFormatter;

/// Formatter that shells out to the configured formatting tool.
pub struct CommandFormatter {
    command: String,
    slot_capacity: u64,
    write_alignment: u64,
}

impl CommandFormatter {
    /// Build a formatter from the update section of the configuration.
    pub fn new(config: &UpdateConfig) -> Self {
        Self {
            command: config.formatter.clone(),
            slot_capacity: config.slot_capacity,
            write_alignment: config.write_alignment,
        }
    }
}

impl ImageFormatter for CommandFormatter {
    fn slot_capacity(&self, _slot: SlotId) -> u64 {
        self.slot_capacity
    }

    fn write_alignment(&self) -> u64 {
        self.write_alignment
    }

    fn format(&mut self, slot: SlotId, image: &[u8]) -> std::io::Result<()> {
        let mut spool = tempfile::NamedTempFile::new()?;
        spool.write_all(image)?;
        spool.flush()?;
        debug!(
            "spooled {} image bytes to {}",
            image.len(),
            spool.path().display()
        );

        info!("formatting slot {slot} with `{}`", self.command);
        let status = Command::new(&self.command)
            .arg(slot.as_str())
            .arg(spool.path())
            .status()?;
        if !status.success() {
            return Err(std::io::Error::other(format!(
                "formatter exited with {status}"
            )));
        }
        Ok(())
    }
}
