//! Block I/O requests and the layered storage stack they travel through.
//!
//! - [`bio`] - the request type and its completion handles
//! - [`queue`] - the FIFO that hands requests to a device's I/O worker
//! - [`topology`] - provider registration and request routing

pub mod bio;
pub mod queue;
pub mod topology;

pub use bio::{Bio, BioCmd, BioWaiter};
pub use queue::{BioQueue, QueueState, Take};
pub use topology::{GeomProvider, GeomTopology, ProviderHandle, ProviderInfo, Topology};
