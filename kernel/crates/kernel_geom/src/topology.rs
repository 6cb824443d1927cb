use std::collections::BTreeMap;
use std::sync::Arc;

use kernel_device::{DeviceError, RegisterDeviceError};
use log::{debug, info};
use spin::RwLock;

use crate::Bio;

/// A device at the bottom of the storage stack.
pub trait GeomProvider: Send + Sync {
    /// Accepts a request. The provider must eventually complete it with
    /// [`Bio::deliver`], on success or failure.
    fn start(&self, bio: Bio);

    /// Adjusts the read/write/exclusive access counts held on the provider.
    ///
    /// # Errors
    /// Returns an error if the access change is refused.
    fn access(&self, read: i32, write: i32, exclusive: i32) -> Result<(), DeviceError> {
        let _ = (read, write, exclusive);
        Ok(())
    }
}

/// Proof of a registered provider, needed to withdraw it again.
#[derive(Debug, Eq, PartialEq)]
#[must_use]
pub struct ProviderHandle {
    name: String,
}

impl ProviderHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Geometry of a registered provider.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ProviderInfo {
    pub sector_size: u32,
    pub media_size: u64,
}

pub trait GeomTopology: Send + Sync {
    /// Publishes a provider so consumers can send it requests.
    ///
    /// # Errors
    /// Returns an error if the name is taken or invalid.
    fn register_provider(
        &self,
        name: &str,
        sector_size: u32,
        media_size: u64,
        provider: Arc<dyn GeomProvider>,
    ) -> Result<ProviderHandle, RegisterDeviceError>;

    /// Removes a provider. Requests routed to the name afterwards fail with
    /// `error`.
    fn withdraw(&self, handle: ProviderHandle, error: DeviceError);
}

struct Entry {
    info: ProviderInfo,
    provider: Arc<dyn GeomProvider>,
}

/// In-memory storage stack: a flat namespace of providers.
#[derive(Default)]
pub struct Topology {
    providers: RwLock<BTreeMap<String, Entry>>,
    withered: RwLock<BTreeMap<String, DeviceError>>,
}

impl Topology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn info(&self, name: &str) -> Option<ProviderInfo> {
        self.providers.read().get(name).map(|entry| entry.info)
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<Arc<dyn GeomProvider>> {
        self.providers.read().get(name).map(|entry| entry.provider.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Routes `bio` to the provider called `name`. Requests for unknown or
    /// withdrawn providers complete immediately with an error.
    pub fn io_request(&self, name: &str, bio: Bio) {
        let provider = self.provider(name);
        match provider {
            Some(provider) => provider.start(bio),
            None => {
                let error = self
                    .withered
                    .read()
                    .get(name)
                    .copied()
                    .unwrap_or(DeviceError::NotConfigured);
                bio.deliver(Err(error));
            }
        }
    }
}

impl GeomTopology for Topology {
    fn register_provider(
        &self,
        name: &str,
        sector_size: u32,
        media_size: u64,
        provider: Arc<dyn GeomProvider>,
    ) -> Result<ProviderHandle, RegisterDeviceError> {
        if name.is_empty() || name.contains('/') {
            return Err(RegisterDeviceError::InvalidName(name.to_string()));
        }

        let mut providers = self.providers.write();
        if providers.contains_key(name) {
            return Err(RegisterDeviceError::AlreadyRegistered(name.to_string()));
        }
        providers.insert(
            name.to_string(),
            Entry {
                info: ProviderInfo {
                    sector_size,
                    media_size,
                },
                provider,
            },
        );
        self.withered.write().remove(name);
        info!("geom: provider {name} created, {media_size} bytes, sector size {sector_size}");

        Ok(ProviderHandle {
            name: name.to_string(),
        })
    }

    fn withdraw(&self, handle: ProviderHandle, error: DeviceError) {
        if self.providers.write().remove(&handle.name).is_some() {
            self.withered.write().insert(handle.name.clone(), error);
            debug!("geom: provider {} withered ({error})", handle.name);
        }
    }
}
