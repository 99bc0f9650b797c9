//! The on-flash text-log format: a magic line, `name=value\n` entries, a
//! blank-line tail marker and filler out to the sector end. Everything here
//! operates on plain byte slices so it can run against the scratch buffer
//! without caring who owns it.

use crate::error::Error;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// One NOR flash erase sector. All writes within it must be preceded by an
/// erase of the whole block.
pub const SECTOR_SIZE: usize = 4096;

/// First bytes of a valid configuration sector. If flash does not yield this
/// marker on load, the sector image is reset rather than trusted.
pub(crate) const MAGIC: &[u8] = b"!flashcfg-v1\n";

/// Written over the dirty tail before hashing so the digest is reproducible
/// regardless of what the sector previously held. Matches the erased state of
/// NOR flash.
pub(crate) const FILLER: u8 = 0xFF;

/// Tail offset used when no blank-line separator exists inside the sector.
pub(crate) const TAIL_FALLBACK: usize = SECTOR_SIZE;

const _: () = assert!(MAGIC.len() + 1 < SECTOR_SIZE, "magic line and tail must fit");

/// One live configuration entry, `name=value` on flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub value: String,
}

/// Byte offset of the blank line terminating the live entries: the first
/// newline directly following another newline, at or after the end of the
/// magic line. Falls back to [`TAIL_FALLBACK`] when the separator is missing.
pub(crate) fn find_tail(buf: &[u8]) -> usize {
    let mut i = MAGIC.len();
    while i < buf.len() {
        if buf[i] == b'\n' && buf[i - 1] == b'\n' {
            return i;
        }
        i += 1;
    }
    TAIL_FALLBACK
}

/// Splits one `name=value\n` entry off the buffer at `cursor` and returns it
/// with the cursor advanced past the trailing newline. A blank line, a
/// missing delimiter before the sector end or a non-UTF-8 line all end the
/// iteration silently; they are not errors.
pub(crate) fn walk(buf: &[u8], cursor: usize) -> Option<(Entry, usize)> {
    if cursor >= buf.len() || buf[cursor] == b'\n' {
        return None;
    }

    let rest = &buf[cursor..];
    let nl = rest.iter().position(|&b| b == b'\n')?;
    let line = core::str::from_utf8(&rest[..nl]).ok()?;
    let (name, value) = line.split_once('=')?;

    let entry = Entry {
        name: name.to_string(),
        value: value.to_string(),
    };
    Some((entry, cursor + nl + 1))
}

/// Parses every live entry of a sector image, stopping at the tail or at the
/// first malformed line.
pub(crate) fn parse(buf: &[u8]) -> Vec<Entry> {
    let mut entries = Vec::new();
    let mut cursor = MAGIC.len();
    while let Some((entry, next)) = walk(buf, cursor) {
        entries.push(entry);
        cursor = next;
    }
    entries
}

/// Serializes entries back to the fixed byte layout: magic, one line per
/// entry, the blank-line tail, filler to the sector end. Fails with
/// [`Error::SectorFull`] when the live region does not fit.
pub(crate) fn serialize(entries: &[Entry], buf: &mut [u8]) -> Result<(), Error> {
    let live: usize = MAGIC.len()
        + entries
            .iter()
            .map(|e| e.name.len() + 1 + e.value.len() + 1)
            .sum::<usize>()
        + 1;
    if live > buf.len() {
        return Err(Error::SectorFull);
    }

    buf[..MAGIC.len()].copy_from_slice(MAGIC);
    let mut at = MAGIC.len();
    for entry in entries {
        buf[at..at + entry.name.len()].copy_from_slice(entry.name.as_bytes());
        at += entry.name.len();
        buf[at] = b'=';
        at += 1;
        buf[at..at + entry.value.len()].copy_from_slice(entry.value.as_bytes());
        at += entry.value.len();
        buf[at] = b'\n';
        at += 1;
    }
    buf[at] = b'\n';
    at += 1;
    buf[at..].fill(FILLER);

    Ok(())
}

/// Resets a sector image to "magic plus nothing". Used when flash does not
/// yield the magic marker on load.
pub(crate) fn reset(buf: &mut [u8]) {
    buf[..MAGIC.len()].copy_from_slice(MAGIC);
    buf[MAGIC.len()] = b'\n';
    buf[MAGIC.len() + 1..].fill(FILLER);
}

pub(crate) fn has_magic(buf: &[u8]) -> bool {
    buf.len() >= MAGIC.len() && &buf[..MAGIC.len()] == MAGIC
}

/// The one numeric text parser of the firmware: decimal, or hex with a `0x`
/// prefix, with an optional leading minus. Used by the typed get/set layer
/// and by dump.
pub(crate) fn parse_number(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };

    Some(if negative { -magnitude } else { magnitude })
}
