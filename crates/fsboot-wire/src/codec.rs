// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Encode and decode the fixed 16-byte failsafe-boot flash record.
// Author: Lukas Bower

//! Codec for the 16-byte boot-config record.
//!
//! The layout is byte-compatible with already-provisioned flash, so all slot
//! fields are packed with explicit masks and shifts rather than anything
//! layout-dependent.

use crate::types::{BootConfig, RecordError, SlotId, SlotInfo, MAGIC, NUM_SLOTS};

/// Size of one serialized record on flash.
pub const RECORD_LEN: usize = 16;

const CRC_OFFSET: usize = RECORD_LEN - 4;

/// CRC-32 (reflected polynomial 0xEDB88320) over `data`, seeded with `seed`
/// and with no final complement.
///
/// Deployed devices checksum records with the raw seeded CRC; `crc32fast`
/// applies the conventional pre/post complement, so both are undone here.
#[must_use]
pub fn crc32_seeded(seed: u32, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(!seed);
    hasher.update(data);
    !hasher.finalize()
}

/// Serialize a config into its on-flash representation, stamping the magic
/// and checksum.
#[must_use]
pub fn encode(config: &BootConfig) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];
    out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    out[4] = config.version;
    out[5] = config.chosen.index() as u8;
    for (i, slot) in config.slots.iter().enumerate() {
        let base = 6 + i * 2;
        out[base] = (slot.priority & 0x0f) | ((slot.tries_remaining & 0x0f) << 4);
        out[base + 1] = u8::from(slot.successful_boot) | (u8::from(slot.force) << 1);
    }
    let crc = crc32_seeded(MAGIC, &out[..CRC_OFFSET]);
    out[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
    out
}

/// Deserialize and validate an on-flash record.
///
/// A record is trusted only if its magic matches and its checksum recomputes;
/// anything else is indistinguishable from garbage and rejected.
pub fn decode(bytes: &[u8]) -> Result<BootConfig, RecordError> {
    if bytes.len() < RECORD_LEN {
        return Err(RecordError::Truncated(bytes.len()));
    }
    let magic = u32::from_le_bytes(bytes[0..4].try_into().expect("slice length checked"));
    if magic != MAGIC {
        return Err(RecordError::BadMagic(magic));
    }
    let stored = u32::from_le_bytes(
        bytes[CRC_OFFSET..RECORD_LEN]
            .try_into()
            .expect("slice length checked"),
    );
    let computed = crc32_seeded(MAGIC, &bytes[..CRC_OFFSET]);
    if stored != computed {
        return Err(RecordError::BadChecksum { stored, computed });
    }
    let chosen = SlotId::from_index(bytes[5])?;
    let mut slots = [SlotInfo {
        priority: 0,
        tries_remaining: 0,
        successful_boot: false,
        force: false,
    }; NUM_SLOTS];
    for (i, slot) in slots.iter_mut().enumerate() {
        let base = 6 + i * 2;
        slot.priority = bytes[base] & 0x0f;
        slot.tries_remaining = bytes[base] >> 4;
        slot.successful_boot = bytes[base + 1] & 0x01 != 0;
        slot.force = bytes[base + 1] & 0x02 != 0;
    }
    Ok(BootConfig {
        version: bytes[4],
        chosen,
        slots,
    })
}

/// Whether a raw record slot reads as erased NOR flash (all 0xFF).
#[must_use]
pub fn is_erased(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0xff)
}
