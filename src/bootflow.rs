// CLASSIFICATION: COMMUNITY
// Filename: bootflow.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Firmware-facing boot entry point: load, pick, mark, persist, launch.

use std::process::Command;

use log::{info, warn};

use fsboot_wire::SlotId;

use crate::config::BootCommands;
use crate::context::FsbContext;
use crate::flash::FlashPartition;
use crate::select;

/// Errors surfaced by the boot sequence.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// No launch command is configured for the picked slot.
    #[error("no boot command configured for slot {0}")]
    NoCommand(SlotId),
    /// Handing control to the boot target failed.
    #[error("failed to launch boot target {slot}: {source}")]
    Launch {
        /// The slot whose launch failed.
        slot: SlotId,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

/// Hands control to the chosen boot target.
pub trait BootLauncher {
    /// Launch the target backing `slot`. Only returns on failure or once the
    /// target itself exits.
    fn launch(&mut self, slot: SlotId) -> Result<(), BootError>;
}

/// Run one boot decision and hand control to the launcher.
///
/// The slot is picked from the active config and the attempt is marked on the
/// working copy, mirroring the firmware sequence. A persist failure here is
/// logged but never blocks the boot attempt: booting stale metadata beats not
/// booting.
pub fn run_boot<P, L>(ctx: &mut FsbContext<P>, launcher: &mut L) -> Result<SlotId, BootError>
where
    P: FlashPartition,
    L: BootLauncher,
{
    let slot = select::pick_slot(ctx.active());
    info!(
        "chosen slot: {slot}, attempts remaining: {}",
        ctx.active().slot(slot).tries_remaining
    );

    select::mark_slot(ctx.working_mut(), slot);
    if let Err(e) = ctx.save() {
        warn!("failed to persist boot attempt for {slot}: {e}");
    }

    launcher.launch(slot)?;
    Ok(slot)
}

/// Launcher that runs an operator-configured command per slot.
pub struct CommandLauncher {
    commands: BootCommands,
}

impl CommandLauncher {
    /// Build a launcher from the configured per-slot commands.
    pub fn new(commands: BootCommands) -> Self {
        Self { commands }
    }
}

impl BootLauncher for CommandLauncher {
    fn launch(&mut self, slot: SlotId) -> Result<(), BootError> {
        let command = self
            .commands
            .command_for(slot)
            .ok_or(BootError::NoCommand(slot))?;
        info!("launching {slot}: {command}");
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .map_err(|source| BootError::Launch { slot, source })?;
        if !status.success() {
            return Err(BootError::Launch {
                slot,
                source: std::io::Error::other(format!("boot command exited with {status}")),
            });
        }
        Ok(())
    }
}
