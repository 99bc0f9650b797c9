//! The persisted 32-bit flag word: one reserved entry in the configuration
//! sector, mirrored in a cached integer so every subsystem can test a bit
//! without touching flash.

use crate::error::Error;
use crate::platform::Platform;
use crate::{Config, KeyTemplate};

/// Reserved entry name holding the flag bitmask as decimal text.
pub(crate) const FLAGS_KEY_NAME: &str = "sys.flags";

pub(crate) const FLAGS_KEY: KeyTemplate = KeyTemplate::new(FLAGS_KEY_NAME);

/// The named flag bits. Bit positions are part of the on-flash contract and
/// must never be reordered; append only.
#[derive(strum::FromRepr, strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// Route log output to the on-device display.
    LogToDisplay = 0,
    /// Route log output to the primary UART.
    LogToUart = 1,
    /// Prefer the low-power CPU mode between scheduler passes.
    LowPowerCpu = 2,
    /// Treat an empty UDP payload as an end-of-stream terminator.
    UdpEmptyTerminates = 3,
    /// Configure the network interface over DHCP instead of static entries.
    DhcpEnabled = 4,
    /// Accept telnet connections on the command-line front end.
    TelnetEnabled = 5,
    /// Arm the hardware watchdog at boot.
    WatchdogEnabled = 6,
    /// Emit the full boot report instead of the one-line banner.
    VerboseBoot = 7,
    /// Invert the display polarity.
    InvertDisplay = 8,
    /// Start the automation sequencer automatically after boot.
    AutoRunSequencer = 9,
    /// Poll the OTA mailbox for firmware updates.
    OtaEnabled = 10,
    /// Show the splash picture while booting.
    SplashOnBoot = 11,
    /// Synchronize the clock over NTP when the network is up.
    NtpSync = 12,
    /// Restore the last shown picture after a power cycle.
    PersistLastPicture = 13,
    /// Echo received characters on the UART console.
    UartEcho = 14,
    /// Reject command lines with trailing garbage instead of ignoring it.
    StrictParser = 15,
    /// Blink the status LED as a liveness heartbeat.
    LedHeartbeat = 16,
    /// Halt on the error screen instead of rebooting on a fatal error.
    HoldOnError = 17,
    /// Boot into factory test mode.
    FactoryMode = 18,
}

impl Flag {
    pub const fn mask(self) -> u32 {
        1 << self as u8
    }
}

impl<T: Platform> Config<T> {
    /// Tests a flag bit against the cached word. Never touches flash.
    pub fn flag_get(&self, flag: Flag) -> bool {
        self.flags & flag.mask() != 0
    }

    /// Updates the cached word, then persists it through a full
    /// open-write/set/close-write cycle. On failure the cache keeps the new
    /// value while flash keeps the old one; the two stay out of sync until
    /// the next successful write of the flags entry.
    pub fn flag_set(&mut self, flag: Flag, value: bool) -> Result<(), Error> {
        if value {
            self.flags |= flag.mask();
        } else {
            self.flags &= !flag.mask();
        }
        let word = self.flags;

        self.open_write()?;
        if let Err(e) = self.set(&FLAGS_KEY, None, None, word) {
            self.abort_write();
            return Err(e);
        }
        self.close_write()
    }

    /// The cached flag word as a whole.
    pub fn flag_word(&self) -> u32 {
        self.flags
    }
}
