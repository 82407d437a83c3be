// CLASSIFICATION: COMMUNITY
// Filename: surface.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! OS-resident control surface: a file-tree contract over the working copy.
//!
//! The tree mirrors the layout exposed on the device:
//!
//! ```text
//! os-a/{priority,tries_remaining,successful_boot,force}   read/write
//! os-b/...                                                read/write
//! recovery/...                                            read/write
//! chosen                                                  read-only
//! commit                                                  write-only, value 1
//! ```
//!
//! Field reads and writes address the working copy; `chosen` reflects the
//! active config; writing `1` to `commit` persists the working copy. Every
//! endpoint shares one context, so all access is serialized under a single
//! mutex; two writers must never interleave a read-modify-write.

use std::str::FromStr;
use std::sync::Mutex;

use log::debug;

use fsboot_wire::SlotId;

use crate::context::FsbContext;
use crate::flash::{FlashError, FlashPartition};

/// Errors returned to control-surface callers.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    /// The path names no entry in the tree.
    #[error("no such entry: {0}")]
    NoSuchEntry(String),
    /// The entry is write-only.
    #[error("{0} is not readable")]
    NotReadable(String),
    /// The entry is read-only.
    #[error("{0} is not writable")]
    NotWritable(String),
    /// The value did not parse as an unsigned integer.
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    /// The value parsed but exceeds the field's range.
    #[error("value {value} out of range for {field} (max {max})")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Highest accepted value.
        max: u64,
    },
    /// `commit` only accepts the literal value 1.
    #[error("commit rejects value {0}")]
    CommitRejected(u64),
    /// Persisting the working copy failed.
    #[error("commit failed: {0}")]
    Persist(#[from] FlashError),
}

/// Per-slot field addressed by the last path component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotField {
    Priority,
    TriesRemaining,
    SuccessfulBoot,
    Force,
}

impl SlotField {
    const ALL: [SlotField; 4] = [
        SlotField::Priority,
        SlotField::TriesRemaining,
        SlotField::SuccessfulBoot,
        SlotField::Force,
    ];

    fn as_str(self) -> &'static str {
        match self {
            SlotField::Priority => "priority",
            SlotField::TriesRemaining => "tries_remaining",
            SlotField::SuccessfulBoot => "successful_boot",
            SlotField::Force => "force",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    fn max(self) -> u64 {
        match self {
            SlotField::Priority | SlotField::TriesRemaining => 15,
            SlotField::SuccessfulBoot | SlotField::Force => 1,
        }
    }
}

/// Thread-safe control surface over one failsafe-boot context.
pub struct ControlSurface<P: FlashPartition> {
    ctx: Mutex<FsbContext<P>>,
}

impl<P: FlashPartition> ControlSurface<P> {
    /// Wrap a loaded context.
    pub fn new(ctx: FsbContext<P>) -> Self {
        Self { ctx: Mutex::new(ctx) }
    }

    /// Read one entry.
    pub fn read(&self, path: &str) -> Result<String, SurfaceError> {
        let ctx = self.ctx.lock().expect("surface mutex poisoned");
        match parse_path(path)? {
            Entry::Chosen => Ok(ctx.active().chosen.as_str().to_string()),
            Entry::Commit => Err(SurfaceError::NotReadable(path.to_string())),
            Entry::Root | Entry::Slot(_) => Err(SurfaceError::NotReadable(path.to_string())),
            Entry::Field(slot, field) => {
                let info = ctx.working().slot(slot);
                let value = match field {
                    SlotField::Priority => u64::from(info.priority),
                    SlotField::TriesRemaining => u64::from(info.tries_remaining),
                    SlotField::SuccessfulBoot => u64::from(info.successful_boot),
                    SlotField::Force => u64::from(info.force),
                };
                Ok(value.to_string())
            }
        }
    }

    /// Write one entry; values parse in decimal, `0x` hex or `0o` octal.
    pub fn write(&self, path: &str, value: &str) -> Result<(), SurfaceError> {
        let mut ctx = self.ctx.lock().expect("surface mutex poisoned");
        match parse_path(path)? {
            Entry::Chosen => Err(SurfaceError::NotWritable(path.to_string())),
            Entry::Root | Entry::Slot(_) => Err(SurfaceError::NotWritable(path.to_string())),
            Entry::Commit => {
                let parsed = parse_autobase(value)?;
                if parsed != 1 {
                    return Err(SurfaceError::CommitRejected(parsed));
                }
                debug!("commit requested, persisting working copy");
                ctx.save()?;
                Ok(())
            }
            Entry::Field(slot, field) => {
                let parsed = parse_autobase(value)?;
                if parsed > field.max() {
                    return Err(SurfaceError::OutOfRange {
                        field: field.as_str(),
                        value: parsed,
                        max: field.max(),
                    });
                }
                let info = ctx.working_mut().slot_mut(slot);
                match field {
                    SlotField::Priority => info.priority = parsed as u8,
                    SlotField::TriesRemaining => info.tries_remaining = parsed as u8,
                    SlotField::SuccessfulBoot => info.successful_boot = parsed != 0,
                    SlotField::Force => info.force = parsed != 0,
                }
                debug!("set {slot}/{} = {parsed}", field.as_str());
                Ok(())
            }
        }
    }

    /// List the children of a directory entry.
    pub fn list(&self, path: &str) -> Result<Vec<String>, SurfaceError> {
        match parse_path(path)? {
            Entry::Root => {
                let mut names: Vec<String> =
                    SlotId::ALL.iter().map(|s| s.as_str().to_string()).collect();
                names.push("chosen".to_string());
                names.push("commit".to_string());
                Ok(names)
            }
            Entry::Slot(_) => Ok(SlotField::ALL
                .iter()
                .map(|f| f.as_str().to_string())
                .collect()),
            _ => Err(SurfaceError::NoSuchEntry(path.to_string())),
        }
    }

    /// Run `op` against the locked context; used by callers that need more
    /// than one field access under a single critical section.
    pub fn with_context<R>(&self, op: impl FnOnce(&mut FsbContext<P>) -> R) -> R {
        let mut ctx = self.ctx.lock().expect("surface mutex poisoned");
        op(&mut ctx)
    }
}

enum Entry {
    Root,
    Chosen,
    Commit,
    Slot(SlotId),
    Field(SlotId, SlotField),
}

fn parse_path(path: &str) -> Result<Entry, SurfaceError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Entry::Root);
    }
    let mut parts = trimmed.split('/');
    let first = parts.next().expect("split yields at least one part");
    let second = parts.next();
    if parts.next().is_some() {
        return Err(SurfaceError::NoSuchEntry(path.to_string()));
    }
    match (first, second) {
        ("chosen", None) => Ok(Entry::Chosen),
        ("commit", None) => Ok(Entry::Commit),
        (slot, rest) => {
            let slot =
                SlotId::from_str(slot).map_err(|_| SurfaceError::NoSuchEntry(path.to_string()))?;
            match rest {
                None => Ok(Entry::Slot(slot)),
                Some(field) => SlotField::parse(field)
                    .map(|field| Entry::Field(slot, field))
                    .ok_or_else(|| SurfaceError::NoSuchEntry(path.to_string())),
            }
        }
    }
}

/// Parse an unsigned integer with base auto-detection: `0x` hex, `0o`
/// octal, decimal otherwise.
///
/// Unlike the C-style base-0 parser behind the historical surface, a bare
/// leading zero does not select octal: `"010"` reads as decimal 10. Octal
/// must be spelled with the explicit `0o` prefix.
fn parse_autobase(value: &str) -> Result<u64, SurfaceError> {
    let trimmed = value.trim();
    let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        u64::from_str_radix(oct, 8)
    } else {
        trimmed.parse()
    };
    parsed.map_err(|_| SurfaceError::InvalidNumber(value.to_string()))
}
