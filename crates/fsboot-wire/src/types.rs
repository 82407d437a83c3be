// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Define failsafe-boot slot and record types shared across components.
// Author: Lukas Bower

//! Failsafe-boot data model definitions shared across components.

use core::fmt;
use core::str::FromStr;

/// Magic constant identifying a boot-config record on flash.
pub const MAGIC: u32 = 0xBABA_B0E1;

/// Record format version written by this implementation.
pub const VERSION: u8 = 0x01;

/// Number of boot slots tracked by a record.
pub const NUM_SLOTS: usize = 3;

/// Sentinel `tries_remaining` value disabling the fallback countdown.
pub const TRIES_UNLIMITED: u8 = 15;

/// Upper bound on records considered in a single partition scan.
pub const MAX_RECORDS_PER_SCAN: usize = 4096;

/// One of the three fixed boot targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// First OS copy, record index 0.
    OsCopyA,
    /// Second OS copy, record index 1.
    OsCopyB,
    /// Recovery image, record index 2.
    Recovery,
}

impl SlotId {
    /// All slots in record-index order.
    pub const ALL: [SlotId; NUM_SLOTS] = [SlotId::OsCopyA, SlotId::OsCopyB, SlotId::Recovery];

    /// Map a raw record index to a slot.
    pub fn from_index(index: u8) -> Result<Self, RecordError> {
        match index {
            0 => Ok(SlotId::OsCopyA),
            1 => Ok(SlotId::OsCopyB),
            2 => Ok(SlotId::Recovery),
            other => Err(RecordError::InvalidSlotIndex(other)),
        }
    }

    /// Record index of this slot.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            SlotId::OsCopyA => 0,
            SlotId::OsCopyB => 1,
            SlotId::Recovery => 2,
        }
    }

    /// Stable name used in logs, the control-surface tree and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SlotId::OsCopyA => "os-a",
            SlotId::OsCopyB => "os-b",
            SlotId::Recovery => "recovery",
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SlotId {
    type Err = RecordError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "os-a" => Ok(SlotId::OsCopyA),
            "os-b" => Ok(SlotId::OsCopyB),
            "recovery" => Ok(SlotId::Recovery),
            _ => Err(RecordError::UnknownSlotName),
        }
    }
}

/// Per-slot boot metadata.
///
/// `priority` ranks slots for selection with 15 highest; 0 marks the slot
/// unbootable. `tries_remaining` counts permitted failed attempts; 0 marks the
/// slot failed and [`TRIES_UNLIMITED`] disables the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// Scheduling priority, 0-15.
    pub priority: u8,
    /// Remaining boot attempts, 0-15.
    pub tries_remaining: u8,
    /// Whether this slot has ever completed a boot.
    pub successful_boot: bool,
    /// Boot this slot next regardless of ranking; cleared on boot.
    pub force: bool,
}

impl SlotInfo {
    /// Whether the selector may consider this slot at all.
    #[must_use]
    pub fn is_bootable(&self) -> bool {
        self.priority != 0 && self.tries_remaining != 0
    }
}

/// The boot-config record, sans the magic and checksum owned by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Record format version; preserved across decode/encode, never validated.
    pub version: u8,
    /// Slot selected at the last save.
    pub chosen: SlotId,
    /// Slot metadata, indexed per [`SlotId::index`].
    pub slots: [SlotInfo; NUM_SLOTS],
}

impl BootConfig {
    /// Borrow the metadata for one slot.
    #[must_use]
    pub fn slot(&self, id: SlotId) -> &SlotInfo {
        &self.slots[id.index()]
    }

    /// Mutably borrow the metadata for one slot.
    pub fn slot_mut(&mut self, id: SlotId) -> &mut SlotInfo {
        &mut self.slots[id.index()]
    }
}

impl Default for BootConfig {
    /// The compiled-in factory configuration: both OS copies at priority 2
    /// with 5 tries, recovery unbootable until an operator raises it.
    fn default() -> Self {
        Self {
            version: VERSION,
            chosen: SlotId::OsCopyA,
            slots: [
                SlotInfo {
                    priority: 2,
                    tries_remaining: 5,
                    successful_boot: false,
                    force: false,
                },
                SlotInfo {
                    priority: 2,
                    tries_remaining: 5,
                    successful_boot: false,
                    force: false,
                },
                SlotInfo {
                    priority: 0,
                    tries_remaining: TRIES_UNLIMITED,
                    successful_boot: false,
                    force: false,
                },
            ],
        }
    }
}

/// Errors produced while decoding an on-flash record.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RecordError {
    /// Record was shorter than the fixed 16-byte layout.
    #[error("truncated record: {0} bytes")]
    Truncated(usize),
    /// Magic field did not match the protocol constant.
    #[error("bad magic 0x{0:08x}")]
    BadMagic(u32),
    /// Stored checksum disagreed with the recomputed one.
    #[error("bad checksum: stored 0x{stored:08x} computed 0x{computed:08x}")]
    BadChecksum {
        /// Checksum read from the record.
        stored: u32,
        /// Checksum recomputed over the record body.
        computed: u32,
    },
    /// Chosen-slot field was outside the three-slot range.
    #[error("invalid slot index {0}")]
    InvalidSlotIndex(u8),
    /// Slot name did not match any of the three fixed targets.
    #[error("unknown slot name")]
    UnknownSlotName,
}
