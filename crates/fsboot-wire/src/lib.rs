// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide the failsafe-boot on-flash record model and codec.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Failsafe-boot wire types and the 16-byte record codec.
//!
//! The record layout is fixed by already-provisioned devices and must never
//! change: `magic: u32 LE`, `version: u8`, `chosen: u8`, three 2-byte slot
//! descriptors, `crc32: u32 LE`.

mod codec;
mod fuzz;
mod types;

pub use codec::{crc32_seeded, decode, encode, is_erased, RECORD_LEN};
pub use fuzz::fuzz_decode;
pub use types::*;
