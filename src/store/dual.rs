// CLASSIFICATION: COMMUNITY
// Filename: store/dual.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Redundant boot-config persistence across two partitions.
//!
//! Loads prefer the primary partition and fall back to the secondary, then to
//! the compiled-in default. Saves write the secondary first, then the
//! primary: if power is lost between the two writes, the primary still holds
//! the prior valid generation, so a later load sees stale data rather than
//! none at all.
//!
//! Known, deliberately unfixed tradeoff: after a crash exactly between the
//! two writes, the next load trusts the stale primary even though the
//! secondary already carries the newer generation; records carry no
//! cross-partition generation number to compare. See DESIGN.md.

use log::{error, info, warn};

use fsboot_wire::{BootConfig, RECORD_LEN};

use crate::flash::{FlashError, FlashPartition};
use crate::store::RecordStore;

/// Role of a partition within the redundant pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionRole {
    /// Preferred partition, read first, written last.
    Primary,
    /// Fallback partition, read second, written first.
    Secondary,
}

impl PartitionRole {
    /// Role name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionRole::Primary => "primary",
            PartitionRole::Secondary => "secondary",
        }
    }
}

/// Redundant pair of record logs.
pub struct DualPartitionStore<P: FlashPartition> {
    primary: RecordStore<P>,
    secondary: RecordStore<P>,
}

impl<P: FlashPartition> DualPartitionStore<P> {
    /// Build a store over the primary and secondary partitions.
    pub fn new(primary: P, secondary: P) -> Self {
        Self {
            primary: RecordStore::new(primary),
            secondary: RecordStore::new(secondary),
        }
    }

    /// Load the newest valid config, falling back across partitions and
    /// finally to the compiled-in default.
    ///
    /// Read errors and validation failures both count as "nothing there" for
    /// fallback purposes; with the default as the last resort, loading never
    /// fails.
    pub fn load(&mut self) -> BootConfig {
        if let Some(config) = self.load_one(PartitionRole::Primary) {
            return config;
        }
        if let Some(config) = self.load_one(PartitionRole::Secondary) {
            return config;
        }
        warn!("no valid bootconfig in either partition, using default");
        BootConfig::default()
    }

    /// Persist a record to both partitions, secondary first.
    ///
    /// The write order is load-bearing (see module docs); a secondary failure
    /// aborts the save before the primary is touched.
    pub fn save(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), FlashError> {
        self.secondary.append(record).inspect_err(|e| {
            error!("failed to save bootconfig to secondary partition: {e}");
        })?;
        self.primary.append(record).inspect_err(|e| {
            error!("failed to save bootconfig to primary partition: {e}");
        })?;
        Ok(())
    }

    fn load_one(&mut self, role: PartitionRole) -> Option<BootConfig> {
        let store = match role {
            PartitionRole::Primary => &mut self.primary,
            PartitionRole::Secondary => &mut self.secondary,
        };
        match store.load_latest() {
            Ok(Some(config)) => {
                info!("loaded bootconfig from {} partition", role.as_str());
                Some(config)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read {} partition: {e}", role.as_str());
                None
            }
        }
    }
}
