use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use kernel_device::DeviceError;
use parking_lot::{Condvar, Mutex};

/// What a [`Bio`] asks the device to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BioCmd {
    Read,
    Write,
    Flush,
    Delete,
    /// Query a named provider attribute.
    GetAttr(String),
}

pub type BioDone = Box<dyn FnOnce(Bio) + Send>;

/// A block I/O request.
///
/// The data buffer travels with the request: a read hands back the filled
/// buffer on completion, a write carries the bytes to store. Completion
/// passes the whole request back through its done callback.
pub struct Bio {
    cmd: BioCmd,
    offset: u64,
    length: u64,
    data: Vec<u8>,
    completed: u64,
    resid: u64,
    error: Option<DeviceError>,
    done: Option<BioDone>,
}

impl Debug for Bio {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bio")
            .field("cmd", &self.cmd)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("completed", &self.completed)
            .field("resid", &self.resid)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl Bio {
    fn new(cmd: BioCmd, offset: u64, length: u64, data: Vec<u8>) -> Self {
        Self {
            cmd,
            offset,
            length,
            data,
            completed: 0,
            resid: length,
            error: None,
            done: None,
        }
    }

    #[must_use]
    pub fn read(offset: u64, length: usize) -> Self {
        Self::new(BioCmd::Read, offset, length as u64, vec![0; length])
    }

    #[must_use]
    pub fn write(offset: u64, data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        Self::new(BioCmd::Write, offset, length, data)
    }

    #[must_use]
    pub fn flush() -> Self {
        Self::new(BioCmd::Flush, 0, 0, Vec::new())
    }

    #[must_use]
    pub fn delete(offset: u64, length: u64) -> Self {
        Self::new(BioCmd::Delete, offset, length, Vec::new())
    }

    #[must_use]
    pub fn getattr(attribute: impl Into<String>) -> Self {
        Self::new(BioCmd::GetAttr(attribute.into()), 0, 0, Vec::new())
    }

    /// Sets the callback run on completion.
    #[must_use]
    pub fn on_done(mut self, done: impl FnOnce(Bio) + Send + 'static) -> Self {
        self.done = Some(Box::new(done));
        self
    }

    /// Replaces the done callback with one that hands the completed request
    /// to the returned waiter.
    #[must_use]
    pub fn with_waiter(self) -> (Self, BioWaiter) {
        let slot = Arc::new(Slot::default());
        let waiter = BioWaiter { slot: slot.clone() };
        let bio = self.on_done(move |bio| slot.fill(bio));
        (bio, waiter)
    }

    pub fn cmd(&self) -> &BioCmd {
        &self.cmd
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn resid(&self) -> u64 {
        self.resid
    }

    pub fn error(&self) -> Option<DeviceError> {
        self.error
    }

    /// # Errors
    /// Returns the error the request was completed with, if any.
    pub fn result(&self) -> Result<(), DeviceError> {
        self.error.map_or(Ok(()), Err)
    }

    /// Records how many bytes were transferred; the rest is residual.
    pub fn set_completed(&mut self, completed: u64) {
        self.completed = completed.min(self.length);
        self.resid = self.length - self.completed;
    }

    /// Completes the request with `result` and hands it to its owner.
    pub fn deliver(mut self, result: Result<(), DeviceError>) {
        self.error = result.err();
        if let Some(done) = self.done.take() {
            done(self);
        }
    }
}

#[derive(Default)]
struct Slot {
    bio: Mutex<Option<Bio>>,
    filled: Condvar,
}

impl Slot {
    fn fill(&self, bio: Bio) {
        *self.bio.lock() = Some(bio);
        self.filled.notify_all();
    }
}

/// Blocks until the associated [`Bio`] is delivered.
pub struct BioWaiter {
    slot: Arc<Slot>,
}

impl BioWaiter {
    #[must_use]
    pub fn wait(self) -> Bio {
        let mut guard = self.slot.bio.lock();
        loop {
            if let Some(bio) = guard.take() {
                return bio;
            }
            self.slot.filled.wait(&mut guard);
        }
    }

    /// Returns the delivered request without blocking, or the waiter again
    /// if it has not completed yet.
    ///
    /// # Errors
    /// Returns `self` if the request is still in flight.
    pub fn try_wait(self) -> Result<Bio, Self> {
        let bio = self.slot.bio.lock().take();
        bio.ok_or(self)
    }
}
