use thiserror::Error;

/// Errors that can occur while using the configuration store or the scratch
/// arbiter. The list is likely to stay as is but marked as non-exhaustive to
/// allow for future additions without breaking the API. Most callers only need
/// to handle Busy (retry on a later pass of their control loop) and
/// KeyNotFound; the remaining variants are static misuse or hardware faults.
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The scratch buffer is held by an incompatible owner. Recoverable by
    /// retrying later; never a sign of corruption.
    #[error("scratch buffer busy")]
    Busy,

    /// The internal error value reported by the flash primitives on
    /// erase, program or read. The current write attempt is abandoned and
    /// flash contents afterwards are unspecified.
    #[error("internal flash error")]
    FlashError,

    /// The sector read back after a commit did not hash to the same digest
    /// as the content that was programmed. Treated like a hardware failure:
    /// the pending write is dropped and the buffer falls back to Free.
    #[error("post-commit verification failed")]
    VerifyFailed,

    /// The configuration sector offset has to be aligned to the size of a
    /// flash erase sector.
    #[error("invalid sector offset")]
    InvalidSectorOffset,

    /// The flash erase-sector size does not match the scratch buffer size
    /// this store was built for.
    #[error("sector size mismatch")]
    SectorSizeMismatch,

    /// Key not found. Either no value has been written yet or the sector was
    /// reset after a magic mismatch. A normal, non-exceptional outcome.
    #[error("key not found")]
    KeyNotFound,

    /// A rendered key name may not contain '=' or a newline; either would
    /// corrupt the line format of the sector.
    #[error("key malformed")]
    KeyMalformed,

    /// A value may not contain a newline; it would be split into a bogus
    /// second entry on the next walk.
    #[error("value malformed")]
    ValueMalformed,

    /// The entry does not fit into the live region of the sector.
    #[error("sector full")]
    SectorFull,

    /// close_read was called without an open read session.
    #[error("not open for read")]
    NotOpenForRead,

    /// set/delete require an open write session.
    #[error("not open for write")]
    NotOpenForWrite,
}
