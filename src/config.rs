// CLASSIFICATION: COMMUNITY
// Filename: config.rs v0.3
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! Deployment configuration for the fsboot binaries.
//!
//! Loaded from `/etc/fsboot.toml`, overridable through `FSBOOT_CONFIG`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use fsboot_wire::SlotId;

/// Environment variable overriding the configuration path.
pub const CONFIG_ENV: &str = "FSBOOT_CONFIG";

/// Default configuration path on the device.
pub const CONFIG_PATH: &str = "/etc/fsboot.toml";

/// Top-level fsboot configuration.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FsbootConfig {
    /// Boot-config partition backing.
    #[serde(default)]
    pub partitions: PartitionConfig,
    /// Control-surface daemon settings.
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// Image-update formatter settings.
    #[serde(default)]
    pub update: UpdateConfig,
    /// Per-slot boot commands.
    #[serde(default)]
    pub boot: BootCommands,
}

/// Paths and geometry of the two boot-config partitions.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartitionConfig {
    /// Backing path for the primary partition.
    #[serde(default = "default_primary")]
    pub primary: PathBuf,
    /// Backing path for the secondary partition.
    #[serde(default = "default_secondary")]
    pub secondary: PathBuf,
    /// Partition size in bytes; must be a whole number of 16-byte records.
    #[serde(default = "default_partition_size")]
    pub size: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            size: default_partition_size(),
        }
    }
}

/// Control-surface daemon settings.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Unix socket the daemon listens on.
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
        }
    }
}

/// Image-update formatter command and geometry.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Formatting tool invoked as `<formatter> <slot-name> <image-path>`.
    #[serde(default = "default_formatter")]
    pub formatter: String,
    /// Usable bytes per OS slot.
    #[serde(default = "default_slot_capacity")]
    pub slot_capacity: u64,
    /// Required image length alignment in bytes.
    #[serde(default = "default_write_alignment")]
    pub write_alignment: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            formatter: default_formatter(),
            slot_capacity: default_slot_capacity(),
            write_alignment: default_write_alignment(),
        }
    }
}

/// Operator-configured launch command per slot.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BootCommands {
    /// Command booting OS copy A.
    #[serde(rename = "os-a")]
    pub os_a: Option<String>,
    /// Command booting OS copy B.
    #[serde(rename = "os-b")]
    pub os_b: Option<String>,
    /// Command booting the recovery image.
    pub recovery: Option<String>,
}

impl BootCommands {
    /// The launch command for one slot, if configured.
    pub fn command_for(&self, slot: SlotId) -> Option<&str> {
        match slot {
            SlotId::OsCopyA => self.os_a.as_deref(),
            SlotId::OsCopyB => self.os_b.as_deref(),
            SlotId::Recovery => self.recovery.as_deref(),
        }
    }
}

fn default_primary() -> PathBuf {
    PathBuf::from("/var/lib/fsboot/bootconfig-a.img")
}

fn default_secondary() -> PathBuf {
    PathBuf::from("/var/lib/fsboot/bootconfig-b.img")
}

fn default_partition_size() -> u64 {
    4096
}

fn default_socket() -> PathBuf {
    PathBuf::from("/run/fsbootd.sock")
}

fn default_formatter() -> String {
    "/usr/sbin/fsboot-format".to_string()
}

fn default_slot_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_write_alignment() -> u64 {
    2048
}

fn load_config_file(path: &Path) -> std::io::Result<FsbootConfig> {
    let data = std::fs::read_to_string(path)?;
    toml::from_str(&data).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Load the active configuration, falling back to defaults when no file is
/// present or readable.
pub fn load_active() -> FsbootConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_PATH.into());
    match load_config_file(Path::new(&path)) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("using default fsboot config: {e}");
            FsbootConfig::default()
        }
    }
}
