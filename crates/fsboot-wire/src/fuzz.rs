// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Provide a fuzz corpus harness for boot-config record decoding.
// Author: Lukas Bower

//! Fuzz corpus harness for record decoding.

use crate::codec::decode;

/// Exercise decoder paths on arbitrary corpus bytes.
pub fn fuzz_decode(bytes: &[u8]) {
    let _ = decode(bytes);
}
