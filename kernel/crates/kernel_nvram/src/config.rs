//! Driver configuration.
//!
//! Every field has a default matching the stock driver; a TOML document only
//! needs to name what it overrides:
//!
//! ```toml
//! smap_type = 12
//! device_name = "nvram_blk_dev"
//! sector_size = 512
//! stripe_size = 4096
//! ```

use kernel_device::devfs::NodePermissions;
use kernel_physical_memory::SmapType;
use serde::Deserialize;

use crate::ConfigError;

pub const DEFAULT_SMAP_TYPE: u32 = SmapType::ARXCIS.0;
pub const DEFAULT_DEVICE_NAME: &str = "nvram_blk_dev";
pub const DEFAULT_WORKER_NAME: &str = "nvram_kern_worker";
pub const DEFAULT_SECTOR_SIZE: u32 = 512;
pub const DEFAULT_STRIPE_SIZE: u64 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NvramConfig {
    /// Memory map type of the region backing the device.
    pub smap_type: u32,
    /// Name of the device node; the storage-stack provider gets a `0` suffix.
    pub device_name: String,
    /// Name of the I/O worker thread.
    pub worker_name: String,
    pub sector_size: u32,
    pub stripe_size: u64,
    pub node_uid: u32,
    pub node_gid: u32,
    pub node_mode: u16,
}

impl Default for NvramConfig {
    fn default() -> Self {
        Self {
            smap_type: DEFAULT_SMAP_TYPE,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            sector_size: DEFAULT_SECTOR_SIZE,
            stripe_size: DEFAULT_STRIPE_SIZE,
            node_uid: NodePermissions::UID_ROOT,
            node_gid: NodePermissions::GID_OPERATOR,
            node_mode: 0o640,
        }
    }
}

impl NvramConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the document is malformed or describes an
    /// impossible geometry.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sector_size.is_power_of_two() {
            return Err(ConfigError::SectorSize(self.sector_size));
        }
        if self.stripe_size == 0 || self.stripe_size % u64::from(self.sector_size) != 0 {
            return Err(ConfigError::StripeSize {
                stripe_size: self.stripe_size,
                sector_size: self.sector_size,
            });
        }
        if self.device_name.is_empty() {
            return Err(ConfigError::EmptyName("device_name"));
        }
        if self.worker_name.is_empty() {
            return Err(ConfigError::EmptyName("worker_name"));
        }
        Ok(())
    }

    #[must_use]
    pub fn smap_type(&self) -> SmapType {
        SmapType(self.smap_type)
    }

    #[must_use]
    pub fn provider_name(&self) -> String {
        format!("{}0", self.device_name)
    }

    #[must_use]
    pub fn node_permissions(&self) -> NodePermissions {
        NodePermissions::new(self.node_uid, self.node_gid, self.node_mode)
    }
}
