//! Anonymous shared memory
//!
//! [`SharedRegion`] maps a single value into a `MAP_SHARED | MAP_ANONYMOUS`
//! region. The mapping survives `fork`, so the parent and every child see the
//! same bytes. It is used for the group-abort flag and the shared-region
//! aggregate.
//!
//! Only types that are valid to access concurrently from several processes
//! belong here: atomics, or plain `#[repr(C)]` data guarded by a
//! process-shared lock living in the same region.

use crate::error::{PulseError, Result};
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// A value living in memory shared across forked processes
pub struct SharedRegion<T> {
    ptr: NonNull<T>,
    len: usize,
    owner_pid: u32,
    _marker: PhantomData<T>,
}

// Safety: the region is plain memory; cross-process synchronisation is the
// responsibility of `T` (atomics or an embedded lock).
unsafe impl<T: Send> Send for SharedRegion<T> {}
unsafe impl<T: Sync> Sync for SharedRegion<T> {}

impl<T> SharedRegion<T> {
    /// Map a fresh region and move `value` into it
    pub fn new(value: T) -> Result<Self> {
        let len = mem::size_of::<T>().max(1);

        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(PulseError::setup_os("unable to create shared mapping"));
        }

        let ptr = NonNull::new(addr as *mut T)
            .ok_or_else(|| PulseError::ChannelSetup("mmap returned null".to_string()))?;

        // Page-aligned, so any T with alignment <= page size fits
        unsafe { ptr.as_ptr().write(value) };

        Ok(Self {
            ptr,
            len,
            owner_pid: std::process::id(),
            _marker: PhantomData,
        })
    }

    /// Raw pointer to the shared value
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// True in the process that created the mapping
    pub fn is_owner(&self) -> bool {
        std::process::id() == self.owner_pid
    }
}

impl<T: Sync> Deref for SharedRegion<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        // The value itself is not dropped: other processes may still map it
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
        if result != 0 {
            tracing::warn!(
                error = %std::io::Error::last_os_error(),
                "munmap failed for shared region"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_region_holds_value() {
        let region = SharedRegion::new(AtomicU64::new(7)).unwrap();
        assert_eq!(region.load(Ordering::SeqCst), 7);
        region.fetch_add(3, Ordering::SeqCst);
        assert_eq!(region.load(Ordering::SeqCst), 10);
        assert!(region.is_owner());
    }

    #[test]
    fn test_region_visible_across_fork() {
        use nix::sys::wait::{waitpid, WaitStatus};
        use nix::unistd::{fork, ForkResult};

        let region = SharedRegion::new(AtomicU64::new(0)).unwrap();

        match unsafe { fork() }.unwrap() {
            ForkResult::Child => {
                region.store(42, Ordering::SeqCst);
                unsafe { libc::_exit(0) };
            }
            ForkResult::Parent { child } => {
                let status = waitpid(child, None).unwrap();
                assert_eq!(status, WaitStatus::Exited(child, 0));
                assert_eq!(region.load(Ordering::SeqCst), 42);
            }
        }
    }
}
