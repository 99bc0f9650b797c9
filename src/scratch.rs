//! The scratch-buffer arbiter: one sector-sized RAM buffer, time-shared by
//! every subsystem that needs sector-sized staging space. The owner tag is the
//! lock; there is no queue and no blocking, a denied caller retries on a later
//! pass of its own control loop.

use crate::error::Error;
use crate::sector::SECTOR_SIZE;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

#[cfg(feature = "defmt")]
use defmt::trace;

/// Subsystems other than the configuration store that stage sector-sized data
/// in the scratch buffer. Opaque to the arbiter beyond identity.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Borrower {
    PictureLoader,
    OtaMailbox,
    Sequencer,
}

/// Current holder of the scratch buffer. At most one logical consumer may
/// read or mutate the buffer at any instant.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Owner {
    /// Nobody holds the buffer; its content is meaningless.
    Free,
    /// The configuration store left a valid sector image behind. Reclaimable.
    ConfigCache,
    /// Open read session of the configuration store.
    ConfigRead,
    /// Open write session, no mutation yet.
    ConfigWrite,
    /// Open write session with a pending mutation.
    ConfigWriteDirty,
    /// One of the external borrowers.
    Other(Borrower),
}

/// The single scratch buffer plus its owner tag. Created once at boot and
/// never destroyed; there is no teardown on this target.
pub struct Scratch {
    buf: Vec<u8>,
    owner: Owner,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            buf: vec![0xFF; SECTOR_SIZE],
            owner: Owner::Free,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Fail-fast acquisition. Succeeds if the buffer is free or the request
    /// is compatible with the current owner:
    /// a cached config image may be re-opened for read or stolen by a
    /// borrower (it is reconstructible from flash), and an open read session
    /// may be upgraded to a write session.
    pub fn try_acquire(&mut self, want: Owner) -> Result<(), Error> {
        let granted = matches!(
            (self.owner, want),
            (Owner::Free, _)
                | (Owner::ConfigCache, Owner::ConfigRead)
                | (Owner::ConfigCache, Owner::Other(_))
                | (Owner::ConfigRead, Owner::ConfigRead)
                | (Owner::ConfigRead, Owner::ConfigWrite)
        );

        if !granted {
            #[cfg(feature = "defmt")]
            trace!("scratch: denied {} (held by {})", want, self.owner);
            return Err(Error::Busy);
        }

        self.owner = want;
        Ok(())
    }

    /// Unconditionally moves the tag. No reference counting: callers must not
    /// release a buffer they do not currently hold, that corrupts the shared
    /// protocol for everyone.
    pub fn release(&mut self, to: Owner) {
        #[cfg(feature = "defmt")]
        trace!("scratch: {} -> {}", self.owner, to);
        self.owner = to;
    }

    /// Checked-out access for the external borrowers. The guard dereferences
    /// to the buffer bytes and releases the tag to Free when dropped.
    pub fn borrow(&mut self, tag: Borrower) -> Result<ScratchGuard<'_>, Error> {
        self.try_acquire(Owner::Other(tag))?;
        Ok(ScratchGuard { scratch: self })
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped ownership of the scratch buffer for a [`Borrower`].
pub struct ScratchGuard<'a> {
    scratch: &'a mut Scratch,
}

impl Deref for ScratchGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.scratch.buf
    }
}

impl DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.scratch.buf
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        self.scratch.release(Owner::Free);
    }
}
