//! Device node registration.
//!
//! The [`DevFs`] trait is how a driver publishes a character special file;
//! [`NodeRegistry`] is an in-memory implementation of it.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::sync::Arc;

use log::debug;
use spin::RwLock;

use crate::{BlockDevice, RegisterDeviceError};

/// Ownership and mode bits of a device node.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct NodePermissions {
    pub uid: u32,
    pub gid: u32,
    pub mode: u16,
}

impl NodePermissions {
    pub const UID_ROOT: u32 = 0;
    pub const GID_WHEEL: u32 = 0;
    pub const GID_OPERATOR: u32 = 5;

    #[must_use]
    pub const fn new(uid: u32, gid: u32, mode: u16) -> Self {
        Self { uid, gid, mode }
    }
}

/// Proof of a registered node, needed to remove it again.
#[derive(Debug, Eq, PartialEq)]
#[must_use]
pub struct NodeHandle {
    name: String,
}

impl NodeHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub trait DevFs: Send + Sync {
    /// Publishes `device` under `/dev/<name>`.
    ///
    /// # Errors
    /// Returns an error if the name is taken or not a valid node name.
    fn register_node(
        &self,
        name: &str,
        perms: NodePermissions,
        device: Arc<dyn BlockDevice>,
    ) -> Result<NodeHandle, RegisterDeviceError>;

    fn unregister(&self, handle: NodeHandle);
}

struct Node {
    perms: NodePermissions,
    device: Arc<dyn BlockDevice>,
}

#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl NodeRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn BlockDevice>> {
        self.nodes.read().get(name).map(|node| node.device.clone())
    }

    #[must_use]
    pub fn permissions(&self, name: &str) -> Option<NodePermissions> {
        self.nodes.read().get(name).map(|node| node.perms)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}

fn valid_node_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('/')
        && !name.chars().any(char::is_whitespace)
        && name.split('/').all(|c| !c.is_empty() && c != "." && c != "..")
}

impl DevFs for NodeRegistry {
    fn register_node(
        &self,
        name: &str,
        perms: NodePermissions,
        device: Arc<dyn BlockDevice>,
    ) -> Result<NodeHandle, RegisterDeviceError> {
        if !valid_node_name(name) {
            return Err(RegisterDeviceError::InvalidName(name.to_string()));
        }

        let mut nodes = self.nodes.write();
        if nodes.contains_key(name) {
            return Err(RegisterDeviceError::AlreadyRegistered(name.to_string()));
        }
        nodes.insert(name.to_string(), Node { perms, device });
        debug!("devfs: created /dev/{name} mode {:o}", perms.mode);

        Ok(NodeHandle {
            name: name.to_string(),
        })
    }

    fn unregister(&self, handle: NodeHandle) {
        if self.nodes.write().remove(&handle.name).is_some() {
            debug!("devfs: removed /dev/{}", handle.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceError;

    struct Zero;

    impl BlockDevice for Zero {
        fn name(&self) -> &str {
            "zero"
        }

        fn sector_size(&self) -> u32 {
            512
        }

        fn media_size(&self) -> u64 {
            4096
        }

        fn stripe_size(&self) -> u64 {
            4096
        }

        fn read_at(&self, _offset: u64, buf: &mut [u8]) -> Result<usize, DeviceError> {
            buf.fill(0);
            Ok(buf.len())
        }

        fn write_at(&self, _offset: u64, _buf: &[u8]) -> Result<usize, DeviceError> {
            Err(DeviceError::NotSupported)
        }

        fn flush(&self) -> Result<(), DeviceError> {
            Ok(())
        }

        fn delete(&self, _offset: u64, _length: u64) -> Result<(), DeviceError> {
            Err(DeviceError::NotSupported)
        }
    }

    const PERMS: NodePermissions = NodePermissions::new(
        NodePermissions::UID_ROOT,
        NodePermissions::GID_OPERATOR,
        0o640,
    );

    #[test]
    fn test_register_and_lookup() {
        let registry = NodeRegistry::new();
        let handle = registry.register_node("zero", PERMS, Arc::new(Zero)).unwrap();
        assert_eq!(handle.name(), "zero");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.permissions("zero"), Some(PERMS));

        let device = registry.lookup("zero").unwrap();
        let mut buf = [0xffu8; 4];
        assert_eq!(device.read_at(0, &mut buf), Ok(4));
        assert_eq!(buf, [0; 4]);
    }

    #[test]
    fn test_duplicate_name() {
        let registry = NodeRegistry::new();
        let _handle = registry.register_node("zero", PERMS, Arc::new(Zero)).unwrap();
        assert_eq!(
            registry.register_node("zero", PERMS, Arc::new(Zero)),
            Err(RegisterDeviceError::AlreadyRegistered("zero".to_string()))
        );
    }

    #[test]
    fn test_invalid_names() {
        let registry = NodeRegistry::new();
        for name in ["", "/zero", "a b", "../zero", "a//b"] {
            assert_eq!(
                registry.register_node(name, PERMS, Arc::new(Zero)),
                Err(RegisterDeviceError::InvalidName(name.to_string()))
            );
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = NodeRegistry::new();
        let handle = registry.register_node("zero", PERMS, Arc::new(Zero)).unwrap();
        registry.unregister(handle);
        assert!(registry.lookup("zero").is_none());
        assert!(registry.register_node("zero", PERMS, Arc::new(Zero)).is_ok());
    }
}
