// CLASSIFICATION: COMMUNITY
// Filename: store/mod.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Append-only, wear-spreading log of boot-config records in one partition.
//!
//! Saves append a fresh record after the last valid one instead of rewriting
//! a fixed location; when the partition fills up, it is erased and indexing
//! restarts at 0. The authoritative record is always the highest-index one
//! that validates, so stale-but-valid predecessors earlier in the log are
//! harmless.

pub mod dual;

pub use dual::{DualPartitionStore, PartitionRole};

use log::{debug, error, warn};

use fsboot_wire::{decode, is_erased, BootConfig, MAX_RECORDS_PER_SCAN, RECORD_LEN};

use crate::flash::{FlashError, FlashPartition};

/// Record log over a single flash partition.
pub struct RecordStore<P: FlashPartition> {
    partition: P,
}

impl<P: FlashPartition> RecordStore<P> {
    /// Wrap a partition in a record log.
    pub fn new(partition: P) -> Self {
        Self { partition }
    }

    /// Partition name for logs.
    pub fn name(&self) -> &str {
        self.partition.name()
    }

    /// Number of record slots in the partition, capped at the scan bound.
    pub fn capacity(&self) -> usize {
        ((self.partition.len() as usize) / RECORD_LEN).min(MAX_RECORDS_PER_SCAN)
    }

    /// Read every record slot of the partition in index order.
    pub fn read_records(&mut self) -> Result<Vec<[u8; RECORD_LEN]>, FlashError> {
        let capacity = self.capacity();
        let mut raw = vec![0u8; capacity * RECORD_LEN];
        self.partition.read(0, &mut raw)?;
        Ok(raw
            .chunks_exact(RECORD_LEN)
            .map(|chunk| chunk.try_into().expect("chunk length fixed"))
            .collect())
    }

    /// Load the latest valid record, or `None` if the partition holds none.
    ///
    /// Validation failures are not distinguishable from blank flash here;
    /// the caller decides whether falling back is available.
    pub fn load_latest(&mut self) -> Result<Option<BootConfig>, FlashError> {
        let records = self.read_records()?;
        match find_last_valid(&records) {
            Some((index, config)) => {
                debug!(
                    "valid bootconfig found in {} partition, index {index}",
                    self.name()
                );
                Ok(Some(config))
            }
            None => {
                warn!("no valid bootconfig found in {} partition", self.name());
                Ok(None)
            }
        }
    }

    /// Append a record after the newest valid one, erasing and restarting at
    /// index 0 when no free slot remains.
    ///
    /// The erase+write pair is not atomic: power loss in between leaves this
    /// partition momentarily blank, which is why saves always land on the
    /// sibling partition first.
    pub fn append(&mut self, record: &[u8; RECORD_LEN]) -> Result<(), FlashError> {
        let records = self.read_records()?;
        let start = match find_last_valid(&records) {
            Some((index, _)) => index + 1,
            None => 0,
        };
        match find_free(&records, start) {
            Some(index) => {
                debug!(
                    "appending bootconfig to {} partition at index {index}",
                    self.name()
                );
                self.partition.write((index * RECORD_LEN) as u64, record)
            }
            None => {
                debug!("no free space left in {} partition, erasing", self.name());
                self.partition.erase().inspect_err(|e| {
                    error!("erase of {} partition failed: {e}", self.name());
                })?;
                self.partition.write(0, record)
            }
        }
    }
}

/// Scan backward for the newest record whose magic and checksum validate.
pub fn find_last_valid(records: &[[u8; RECORD_LEN]]) -> Option<(usize, BootConfig)> {
    records
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, raw)| decode(raw).ok().map(|config| (index, config)))
}

/// First erased record slot at or after `start`.
pub fn find_free(records: &[[u8; RECORD_LEN]], start: usize) -> Option<usize> {
    (start..records.len()).find(|&index| is_erased(&records[index]))
}
