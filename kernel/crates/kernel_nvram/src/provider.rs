//! The storage-stack frontend.
//!
//! Requests are validated here and handed to the I/O worker through the
//! [`BioQueue`]; nothing in this module touches the backing memory.

use std::sync::Arc;

use kernel_device::block::{check_aligned, check_range};
use kernel_device::{BlockDevice, DeviceError};
use kernel_geom::{Bio, BioCmd, BioQueue, GeomProvider};
use log::trace;

pub struct NvramProvider {
    name: String,
    sector_size: u32,
    stripe_size: u64,
    media_size: u64,
    queue: Arc<BioQueue>,
}

impl NvramProvider {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        sector_size: u32,
        stripe_size: u64,
        media_size: u64,
        queue: Arc<BioQueue>,
    ) -> Self {
        Self {
            name: name.into(),
            sector_size,
            stripe_size,
            media_size,
            queue,
        }
    }

    fn check(&self, bio: &Bio) -> Result<(), DeviceError> {
        match bio.cmd() {
            BioCmd::Read | BioCmd::Write => check_range(self.media_size, bio.offset(), bio.length()),
            BioCmd::Flush => Ok(()),
            BioCmd::Delete => check_aligned(self.sector_size, bio.offset(), bio.length()),
            BioCmd::GetAttr(_) => Err(DeviceError::NotSupported),
        }
    }

    /// Starts `bio` and blocks until it completes.
    fn submit(&self, bio: Bio) -> Bio {
        let (bio, waiter) = bio.with_waiter();
        self.start(bio);
        waiter.wait()
    }
}

impl GeomProvider for NvramProvider {
    fn start(&self, bio: Bio) {
        if let Err(e) = self.check(&bio) {
            trace!("{}: rejecting {:?}: {e}", self.name, bio);
            bio.deliver(Err(e));
            return;
        }

        if let Err(bio) = self.queue.enqueue(bio) {
            bio.deliver(Err(DeviceError::NotConfigured));
        }
    }
}

impl BlockDevice for NvramProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn media_size(&self) -> u64 {
        self.media_size
    }

    fn stripe_size(&self) -> u64 {
        self.stripe_size
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let bio = self.submit(Bio::read(offset, buf.len()));
        bio.result()?;
        let data = bio.into_data();
        buf.copy_from_slice(&data);
        Ok(data.len())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<usize, DeviceError> {
        let bio = self.submit(Bio::write(offset, buf.to_vec()));
        bio.result()?;
        Ok(buf.len())
    }

    fn flush(&self) -> Result<(), DeviceError> {
        self.submit(Bio::flush()).result()
    }

    fn delete(&self, offset: u64, length: u64) -> Result<(), DeviceError> {
        self.submit(Bio::delete(offset, length)).result()
    }
}
