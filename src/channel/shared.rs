//! Shared-region aggregation channel
//!
//! One [`Aggregate`] lives in an anonymous shared mapping next to a POSIX
//! semaphore created with `pshared = 1` and an initial value of 1. Workers
//! merge into the aggregate while holding the semaphore; the coordinator reads
//! it, also under the semaphore, after every worker has been reaped.
//!
//! ```text
//! ┌──────────────── MAP_SHARED ────────────────┐
//! │ sem_t lock (1 = unlocked) │ Aggregate total │
//! └────────────────────────────────────────────┘
//!        ▲ merge        ▲ merge        ▲ read after reap
//!     worker 0       worker N-1       coordinator
//! ```
//!
//! The semaphore is initialised and destroyed only by the process that
//! created the channel.

use super::{AggregationChannel, ChannelKind};
use crate::error::{PulseError, Result};
use crate::stats::Aggregate;
use crate::util::shm::SharedRegion;
use std::io;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr;

#[repr(C)]
struct SharedSlot {
    lock: libc::sem_t,
    total: Aggregate,
}

/// Mutex-guarded aggregate shared by every worker process
pub struct SharedRegionChannel {
    slot: SharedRegion<SharedSlot>,
}

impl SharedRegionChannel {
    /// Map the shared slot and initialise its lock to unlocked
    pub fn new() -> Result<Self> {
        let slot = SharedRegion::new(SharedSlot {
            // Safety: sem_t is plain bytes until sem_init below
            lock: unsafe { mem::zeroed() },
            total: Aggregate::new(),
        })?;

        let rc = unsafe { libc::sem_init(ptr::addr_of_mut!((*slot.as_ptr()).lock), 1, 1) };
        if rc != 0 {
            return Err(PulseError::setup_os("unable to initialise shared semaphore"));
        }

        Ok(Self { slot })
    }

    fn sem(&self) -> *mut libc::sem_t {
        unsafe { ptr::addr_of_mut!((*self.slot.as_ptr()).lock) }
    }

    /// Acquire the lock, retrying if interrupted by a signal
    fn lock(&self) -> Result<SlotGuard<'_>> {
        loop {
            if unsafe { libc::sem_wait(self.sem()) } == 0 {
                return Ok(SlotGuard { channel: self });
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(PulseError::Channel(format!("sem_wait failed: {}", err)));
            }
        }
    }

    /// Current shared totals, read under the lock
    pub fn snapshot(&self) -> Result<Aggregate> {
        Ok(*self.lock()?)
    }
}

impl AggregationChannel for SharedRegionChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::SharedRegion
    }

    fn submit_local(&mut self, worker_id: usize, local: &Aggregate) -> Result<()> {
        let mut total = self.lock()?;
        total.merge(local);
        tracing::debug!(worker = worker_id, count = local.count, "merged into shared region");
        Ok(())
    }

    fn collect_final(&mut self) -> Result<Aggregate> {
        self.snapshot()
    }
}

impl Drop for SharedRegionChannel {
    fn drop(&mut self) {
        if self.slot.is_owner() {
            unsafe { libc::sem_destroy(self.sem()) };
        }
    }
}

/// Exclusive access to the shared aggregate; releases the lock on drop
struct SlotGuard<'a> {
    channel: &'a SharedRegionChannel,
}

impl Deref for SlotGuard<'_> {
    type Target = Aggregate;

    fn deref(&self) -> &Aggregate {
        unsafe { &(*self.channel.slot.as_ptr()).total }
    }
}

impl DerefMut for SlotGuard<'_> {
    fn deref_mut(&mut self) -> &mut Aggregate {
        unsafe { &mut (*self.channel.slot.as_ptr()).total }
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        unsafe { libc::sem_post(self.channel.sem()) };
    }
}
