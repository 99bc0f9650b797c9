use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

/// The three flash primitives the store needs: read, erase, program. Each is
/// synchronous and atomic per call, never across calls. See README.md for an
/// example implementation backed by a plain byte buffer.
pub trait Platform: ReadNorFlash + NorFlash {}

impl<T: ReadNorFlash + NorFlash> Platform for T {}
