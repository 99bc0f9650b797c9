#![doc = include_str!("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

pub mod error;
mod flags;
mod get;
pub mod platform;
mod scratch;
mod sector;
mod set;

pub use error::Error;
pub use flags::Flag;
pub use get::Get;
pub use scratch::{Borrower, Owner, Scratch, ScratchGuard};
pub use sector::{Entry, SECTOR_SIZE};
pub use set::Set;

extern crate alloc;

use crate::platform::Platform;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt::Write as _;
use core::mem;
use sha1::{Digest, Sha1};

#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// A configuration key template: ASCII text with up to two `#` placeholder
/// slots that are filled with caller-supplied integers to form a concrete
/// entry name, so one template like `io.#.#.mode` yields a distinct key per
/// (io, pin) pair.
///
/// Usage: `KeyTemplate::new("io.#.#.mode")`
///
/// Tip: build templates in a const context to ensure the placeholder count
/// and the character set are checked at compile time:
///   `const IO_MODE: KeyTemplate = KeyTemplate::new("io.#.#.mode");`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyTemplate(&'static str);

impl KeyTemplate {
    pub const fn new(template: &'static str) -> Self {
        let bytes = template.as_bytes();
        let mut slots = 0;
        let mut i = 0;
        while i < bytes.len() {
            assert!(
                bytes[i] != b'=' && bytes[i] != b'\n',
                "key templates may not contain '=' or newlines"
            );
            if bytes[i] == b'#' {
                slots += 1;
            }
            i += 1;
        }
        assert!(slots <= 2, "key templates have at most two placeholder slots");
        Self(template)
    }

    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Renders the template, substituting placeholders left to right with the
    /// given integers in decimal. With no parameters the template is returned
    /// unchanged.
    pub fn render(&self, p1: Option<u32>, p2: Option<u32>) -> String {
        let mut out = String::with_capacity(self.0.len() + 16);
        let mut params = [p1, p2].into_iter().flatten();
        for ch in self.0.chars() {
            if ch == '#' {
                match params.next() {
                    Some(p) => out.push_str(&p.to_string()),
                    None => out.push(ch),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Sector occupancy, for the command-line front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorUsage {
    pub entries: usize,
    pub live_bytes: usize,
    pub free_bytes: usize,
}

/// The configuration store: a `name=value` text log in one flash erase
/// sector, staged through the shared scratch buffer.
///
/// There is exactly one instance per device, created at boot by
/// [`Config::new`]. There is no teardown; the service lives for the device
/// lifetime. All operations run to completion on the single execution
/// context, so mutual exclusion is the scratch buffer's owner tag alone.
pub struct Config<T: Platform> {
    flash: T,
    sector_offset: u32,
    scratch: Scratch,
    cursor: usize,
    pending: Vec<Entry>,
    flags: u32,
}

impl<T: Platform> Config<T> {
    /// Brings the store up: validates the sector geometry against the flash
    /// primitives, then primes the cached flag word with one read session.
    pub fn new(flash: T, sector_offset: u32) -> Result<Self, Error> {
        if T::ERASE_SIZE != SECTOR_SIZE {
            return Err(Error::SectorSizeMismatch);
        }
        if !(sector_offset as usize).is_multiple_of(SECTOR_SIZE) {
            return Err(Error::InvalidSectorOffset);
        }

        let mut config = Self {
            flash,
            sector_offset,
            scratch: Scratch::new(),
            cursor: 0,
            pending: Vec::new(),
            flags: 0,
        };

        config.open_read()?;
        while let Some(entry) = config.walk() {
            if entry.name == flags::FLAGS_KEY_NAME {
                if let Some(word) = sector::parse_number(&entry.value) {
                    config.flags = word as u32;
                }
            }
        }
        config.close_read()?;

        Ok(config)
    }

    /// The shared scratch buffer, for the other subsystems that borrow it.
    pub fn scratch_mut(&mut self) -> &mut Scratch {
        &mut self.scratch
    }

    /// Opens a read session. Reuses the cached sector image when one is
    /// present; only when the buffer comes up from `Free` is a full sector
    /// read from flash. A sector without the magic marker is discarded and
    /// reset to "magic plus nothing" instead of being trusted.
    pub fn open_read(&mut self) -> Result<(), Error> {
        let must_load = self.scratch.owner() == Owner::Free;
        self.scratch.try_acquire(Owner::ConfigRead)?;

        if must_load {
            if self
                .flash
                .read(self.sector_offset, self.scratch.bytes_mut())
                .is_err()
            {
                self.scratch.release(Owner::Free);
                return Err(Error::FlashError);
            }
            if !sector::has_magic(self.scratch.bytes()) {
                #[cfg(feature = "defmt")]
                warn!("config: magic mismatch, resetting sector image");
                #[cfg(feature = "debug-logs")]
                println!("  config: magic mismatch, resetting sector image");
                sector::reset(self.scratch.bytes_mut());
            }
        }

        self.cursor = sector::MAGIC.len();
        Ok(())
    }

    /// Ends a read session, leaving the sector image behind as cache.
    pub fn close_read(&mut self) -> Result<(), Error> {
        if self.scratch.owner() != Owner::ConfigRead {
            return Err(Error::NotOpenForRead);
        }
        self.scratch.release(Owner::ConfigCache);
        Ok(())
    }

    /// Opens a write session: an open-read upgraded to write ownership. The
    /// live entries are parsed out of the sector image; mutations operate on
    /// the parsed form and the byte layout is rebuilt at commit.
    pub fn open_write(&mut self) -> Result<(), Error> {
        self.open_read()?;
        self.scratch.try_acquire(Owner::ConfigWrite)?;
        self.pending = sector::parse(self.scratch.bytes());
        Ok(())
    }

    /// Discards the pending mutation without touching flash. A clean write
    /// session falls back to cache; a dirty one drops the buffer to `Free`.
    pub fn abort_write(&mut self) {
        match self.scratch.owner() {
            Owner::ConfigWrite => self.scratch.release(Owner::ConfigCache),
            Owner::ConfigWriteDirty => self.scratch.release(Owner::Free),
            _ => {}
        }
        self.pending.clear();
    }

    /// Closes a write session. A clean session is a successful no-op close;
    /// a dirty one runs the full commit: serialize, fill the tail with the
    /// filler byte, hash, erase, program, read back, compare hashes. On any
    /// failure the pending write is dropped and the buffer goes to `Free`.
    pub fn close_write(&mut self) -> Result<(), Error> {
        match self.scratch.owner() {
            Owner::ConfigWrite => {
                self.pending.clear();
                self.scratch.release(Owner::ConfigCache);
                Ok(())
            }
            Owner::ConfigWriteDirty => {
                let entries = mem::take(&mut self.pending);
                let result = self.commit(&entries);
                if result.is_ok() {
                    self.scratch.release(Owner::ConfigCache);
                } else {
                    self.scratch.release(Owner::Free);
                }
                result
            }
            _ => Err(Error::NotOpenForWrite),
        }
    }

    fn commit(&mut self, entries: &[Entry]) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        trace!("commit: {} entries", entries.len());
        #[cfg(feature = "debug-logs")]
        println!("  config: commit {} entries", entries.len());

        sector::serialize(entries, self.scratch.bytes_mut())?;
        let expected: [u8; 20] = Sha1::digest(self.scratch.bytes()).into();

        let from = self.sector_offset;
        let to = from + SECTOR_SIZE as u32;
        self.flash.erase(from, to).map_err(|_| Error::FlashError)?;
        self.flash
            .write(from, self.scratch.bytes())
            .map_err(|_| Error::FlashError)?;

        // Read back into the same buffer; there is only one on this device.
        self.flash
            .read(from, self.scratch.bytes_mut())
            .map_err(|_| Error::FlashError)?;
        let actual: [u8; 20] = Sha1::digest(self.scratch.bytes()).into();

        if expected != actual {
            #[cfg(feature = "defmt")]
            warn!("commit: readback digest mismatch");
            return Err(Error::VerifyFailed);
        }
        Ok(())
    }

    /// Splits the next entry off the sector image and advances the cursor.
    /// Returns `None` at the tail, on a malformed line, or when no read
    /// session is open.
    pub fn walk(&mut self) -> Option<Entry> {
        if self.scratch.owner() != Owner::ConfigRead {
            return None;
        }
        let (entry, next) = sector::walk(self.scratch.bytes(), self.cursor)?;
        self.cursor = next;
        Some(entry)
    }

    /// Looks up one entry by its rendered name. Runs a full read session;
    /// absence is reported as [`Error::KeyNotFound`], not a failure.
    pub fn get<V>(&mut self, key: &KeyTemplate, p1: Option<u32>, p2: Option<u32>) -> Result<V, Error>
    where
        Self: Get<V>,
    {
        Get::get(self, key, p1, p2)
    }

    /// Inserts or replaces one entry. Requires an open write session.
    pub fn set<V>(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: V,
    ) -> Result<(), Error>
    where
        Self: Set<V>,
    {
        Set::set(self, key, p1, p2, value)
    }

    pub(crate) fn get_raw(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
    ) -> Result<String, Error> {
        self.open_read()?;
        let name = key.render(p1, p2);

        let mut found = None;
        while let Some(entry) = self.walk() {
            if entry.name == name {
                found = Some(entry.value);
                break;
            }
        }

        self.close_read()?;
        found.ok_or(Error::KeyNotFound)
    }

    pub(crate) fn set_raw(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        value: &str,
    ) -> Result<(), Error> {
        if !matches!(
            self.scratch.owner(),
            Owner::ConfigWrite | Owner::ConfigWriteDirty
        ) {
            return Err(Error::NotOpenForWrite);
        }

        let name = key.render(p1, p2);
        if name.contains(['=', '\n']) {
            return Err(Error::KeyMalformed);
        }
        if value.contains('\n') {
            return Err(Error::ValueMalformed);
        }

        // Size check before mutating, so a failed set leaves the session as
        // it was: live region = magic + kept lines + new line + tail.
        let kept: usize = self
            .pending
            .iter()
            .filter(|e| e.name != name)
            .map(|e| e.name.len() + 1 + e.value.len() + 1)
            .sum();
        let live = sector::MAGIC.len() + kept + name.len() + 1 + value.len() + 1 + 1;
        if live > SECTOR_SIZE {
            return Err(Error::SectorFull);
        }

        // Insert always deletes existing matches first; a set key moves to
        // the end of the log.
        self.pending.retain(|e| e.name != name);
        self.pending.push(Entry {
            name,
            value: value.to_string(),
        });
        self.scratch.release(Owner::ConfigWriteDirty);
        Ok(())
    }

    /// Removes entries matching the rendered name, or every entry whose name
    /// starts with it when `wildcard` is set. Returns the number removed.
    pub fn delete(
        &mut self,
        key: &KeyTemplate,
        p1: Option<u32>,
        p2: Option<u32>,
        wildcard: bool,
    ) -> Result<usize, Error> {
        if !matches!(
            self.scratch.owner(),
            Owner::ConfigWrite | Owner::ConfigWriteDirty
        ) {
            return Err(Error::NotOpenForWrite);
        }

        let name = key.render(p1, p2);
        let before = self.pending.len();
        if wildcard {
            self.pending.retain(|e| !e.name.starts_with(name.as_str()));
        } else {
            self.pending.retain(|e| e.name != name);
        }

        let count = before - self.pending.len();
        if count > 0 {
            self.scratch.release(Owner::ConfigWriteDirty);
        }
        Ok(count)
    }

    /// Renders every live entry as `name=value`, one per line, appending the
    /// signed, unsigned and hex readings when the value parses as a number.
    pub fn dump(&mut self) -> Result<String, Error> {
        self.open_read()?;

        let mut out = String::new();
        while let Some(entry) = self.walk() {
            let _ = write!(out, "{}={}", entry.name, entry.value);
            if let Some(n) = sector::parse_number(&entry.value) {
                let _ = write!(out, "  ({} / {} / 0x{:x})", n as i32, n as u32, n as u32);
            }
            out.push('\n');
        }

        self.close_read()?;
        Ok(out)
    }

    /// Sector occupancy: live entry count, bytes up to the tail, bytes left.
    pub fn usage(&mut self) -> Result<SectorUsage, Error> {
        self.open_read()?;

        let mut entries = 0;
        while self.walk().is_some() {
            entries += 1;
        }
        let live_bytes = sector::find_tail(self.scratch.bytes()).min(SECTOR_SIZE);

        self.close_read()?;
        Ok(SectorUsage {
            entries,
            live_bytes,
            free_bytes: SECTOR_SIZE - live_bytes,
        })
    }
}
