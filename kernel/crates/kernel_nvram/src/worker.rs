//! The I/O worker thread of the storage-stack provider.
//!
//! The worker owns the [`MappedWindow`] for the whole life of the device and
//! is the only code touching it, so window accesses need no lock. It hands
//! the window back when it is joined, which can only happen after the queue
//! has drained.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use kernel_device::DeviceError;
use kernel_geom::{Bio, BioCmd, BioQueue, Take};
use kernel_virtual_memory::MappedWindow;
use log::{debug, error, trace};

use crate::error::window_error;

pub struct BioWorker {
    queue: Arc<BioQueue>,
    handle: JoinHandle<MappedWindow>,
}

impl BioWorker {
    /// Starts a worker serving `queue` against `window`.
    ///
    /// # Errors
    /// Returns the spawn error if the thread could not be created; the
    /// window is unmapped in that case.
    pub fn spawn(name: &str, queue: Arc<BioQueue>, window: MappedWindow) -> io::Result<Self> {
        let handle = thread::Builder::new().name(name.to_string()).spawn({
            let queue = queue.clone();
            move || run(&queue, window)
        })?;
        debug!("{name}: started");

        Ok(Self { queue, handle })
    }

    #[must_use]
    pub fn queue(&self) -> &Arc<BioQueue> {
        &self.queue
    }

    /// Drains the queue, waits for the worker to finish and returns the
    /// window. Returns `None` if the worker died, in which case the window
    /// is already unmapped.
    #[must_use]
    pub fn stop(self) -> Option<MappedWindow> {
        self.queue.begin_drain();
        self.queue.await_drained();
        match self.handle.join() {
            Ok(window) => Some(window),
            Err(_) => {
                error!("nvram I/O worker panicked");
                None
            }
        }
    }
}

/// Marks the queue drained when the worker exits, however it exits, so the
/// owner blocked in `await_drained` is always released.
struct DrainOnExit<'a>(&'a BioQueue);

impl Drop for DrainOnExit<'_> {
    fn drop(&mut self) {
        self.0.finish_drain();
    }
}

fn run(queue: &BioQueue, mut window: MappedWindow) -> MappedWindow {
    let _drained = DrainOnExit(queue);

    loop {
        let mut bio = match queue.take_first_blocking() {
            Take::Bio(bio) => bio,
            Take::Shutdown => return window,
        };

        let result = dispatch(&mut window, &mut bio);
        trace!("{:?} done: {:?}", bio, result);
        bio.set_completed(bio.length());
        bio.deliver(result);
    }
}

fn dispatch(window: &mut MappedWindow, bio: &mut Bio) -> Result<(), DeviceError> {
    let offset = bio.offset();
    match bio.cmd().clone() {
        BioCmd::Read => window.read_at(offset, bio.data_mut()).map_err(window_error),
        BioCmd::Write => window.write_at(offset, bio.data()).map_err(window_error),
        // the memory is directly addressed, nothing is cached and nothing
        // needs to be discarded
        BioCmd::Flush | BioCmd::Delete => Ok(()),
        BioCmd::GetAttr(_) => Err(DeviceError::NotSupported),
    }
}
