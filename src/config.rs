/// Factory default I2C address of the TFMini-Plus.
pub const DEFAULT_ADDRESS: u8 = 0x10;

/// Default time the device needs between a command and its reply.
pub const DEFAULT_SETTLE_MS: u32 = 500;

/// Driver configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Device address used by the calls that take no explicit address.
    pub address: u8,
    /// Delay between writing a command and reading its reply, in milliseconds.
    pub settle_ms: u32,
}

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `address` - The default 7-bit device address.
    /// * `settle_ms` - The post-command settling delay in milliseconds.
    #[must_use]
    pub fn new(address: u8, settle_ms: u32) -> Config {
        Config { address, settle_ms }
    }

    /// Sets the default device address.
    #[must_use]
    pub fn address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Sets the post-command settling delay.
    #[must_use]
    pub fn settle_ms(mut self, settle_ms: u32) -> Self {
        self.settle_ms = settle_ms;
        self
    }
}

impl Default for Config {
    /// Address `0x10` and a 500 ms settling delay.
    fn default() -> Config {
        Config {
            address: DEFAULT_ADDRESS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Pulse timing of the bus recovery sequence, in microseconds.
///
/// The defaults give a 100 kHz clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryTiming {
    /// Number of clock pulses; the last one doubles as a NACK.
    pub pulses: u8,
    /// Clock high time and clock low time of each pulse.
    pub pulse_us: u32,
    /// Data low time before the clock rises for the stop condition.
    pub stop_setup_us: u32,
    /// Clock high time before data rises, and data high time after.
    pub stop_hold_us: u32,
}

impl RecoveryTiming {
    /// Sets the number of clock pulses.
    #[must_use]
    pub fn pulses(mut self, pulses: u8) -> Self {
        self.pulses = pulses;
        self
    }

    /// Sets the pulse half-period.
    #[must_use]
    pub fn pulse_us(mut self, pulse_us: u32) -> Self {
        self.pulse_us = pulse_us;
        self
    }
}

impl Default for RecoveryTiming {
    fn default() -> Self {
        Self {
            pulses: 10,
            pulse_us: 5,
            stop_setup_us: 5,
            stop_hold_us: 2,
        }
    }
}
