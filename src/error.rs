use crate::frame::Measurement;

/// Outcome code of the most recent driver operation.
///
/// The numeric values match the status codes the TFMini-Plus host libraries
/// have always reported, so they can be logged or sent upstream as a byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    /// No error, measurement usable
    #[default]
    Ready = 0,
    /// Serial read timed out (UART transport only)
    SerialTimeout = 1,
    /// No frame header found (UART transport only)
    HeaderNotFound = 2,
    /// Frame checksum does not match its content
    Checksum = 3,
    /// Device did not answer in time
    DeviceTimeout = 4,
    /// Device reported success for a system command
    Pass = 5,
    /// Device reported failure for a reset or save command
    Fail = 6,
    /// Reading from the bus failed or came up short
    I2cRead = 7,
    /// Writing to the bus failed
    I2cWrite = 8,
    /// The device accepted fewer bytes than the frame holds
    I2cLength = 9,
    /// Signal strength at or below 100
    WeakSignal = 10,
    /// Signal strength saturated
    StrongSignal = 11,
    /// Ambient light saturated
    AmbientFlood = 12,
}

impl Status {
    /// Returns `true` for [`Status::Ready`].
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Status::Ready
    }

    /// Short human readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Status::Ready => "READY",
            Status::SerialTimeout => "SERIAL",
            Status::HeaderNotFound => "HEADER",
            Status::Checksum => "CHECKSUM",
            Status::DeviceTimeout => "TIMEOUT",
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::I2cRead => "I2C-READ",
            Status::I2cWrite => "I2C-WRITE",
            Status::I2cLength => "I2C-LENGTH",
            Status::WeakSignal => "Signal weak",
            Status::StrongSignal => "Signal saturation",
            Status::AmbientFlood => "Ambient light saturation",
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status as u8
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Protocol-level failure, independent of the bus implementation.
///
/// Produced by the frame codec; the driver lifts it into [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Checksum byte differs from the sum of the preceding bytes
    Checksum {
        /// Checksum computed over the received bytes
        expected: u8,
        /// Checksum byte carried by the frame
        received: u8,
    },
    /// Device answered a reset or save command with its failure flag set
    DeviceFail,
    /// Frame decoded correctly but carries an abnormal-value code
    Abnormal(Measurement),
    /// Raw command code is not part of the supported command set
    UnsupportedCommand(u32),
    /// Parameter or buffer does not fit the command
    InvalidArgument,
}

impl FrameError {
    /// Status code matching this failure, or `None` for caller errors that
    /// were rejected before anything reached the bus.
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match self {
            FrameError::Checksum { .. } => Some(Status::Checksum),
            FrameError::DeviceFail => Some(Status::Fail),
            FrameError::Abnormal(measurement) => Some(measurement.status()),
            FrameError::UnsupportedCommand(_) | FrameError::InvalidArgument => None,
        }
    }
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Error type for TFMini-Plus driver operations.
///
/// Transport failures keep the bus error that caused them. Protocol failures
/// mirror [`FrameError`].
///
/// # Examples
///
/// ```rust,no_run
/// use tfmini_plus_i2c::{Error, TfMiniPlus};
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
/// let mut lidar = TfMiniPlus::new(i2c, delay);
///
/// match lidar.get_data() {
///     Ok(m) => println!("{} cm", m.distance),
///     Err(Error::Abnormal(m)) => println!("unusable reading {:?}: {}", m, m.status()),
///     Err(e) => println!("exchange failed: {:?}", e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// Reading the reply or data frame from the bus failed
    I2cRead(E),
    /// Writing the command frame to the bus failed
    I2cWrite(E),
    /// The device stopped accepting bytes part-way through the command frame
    I2cLength(E),
    /// Checksum byte differs from the sum of the preceding bytes
    Checksum {
        /// Checksum computed over the received bytes
        expected: u8,
        /// Checksum byte carried by the frame
        received: u8,
    },
    /// Device answered a reset or save command with its failure flag set
    DeviceFail,
    /// Measurement decoded correctly but is not usable; the values are kept
    Abnormal(Measurement),
    /// Raw command code is not part of the supported command set
    UnsupportedCommand(u32),
    /// Parameter value does not fit the command
    InvalidArgument,
}

impl<E: core::fmt::Debug> Error<E> {
    /// Status code matching this error, or `None` for caller errors that
    /// were rejected before anything reached the bus.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::I2cRead(_) => Some(Status::I2cRead),
            Error::I2cWrite(_) => Some(Status::I2cWrite),
            Error::I2cLength(_) => Some(Status::I2cLength),
            _ => self.frame_error().and_then(|error| error.status()),
        }
    }

    /// The protocol failure behind this error, `None` for bus errors.
    pub fn frame_error(&self) -> Option<FrameError> {
        match *self {
            Error::I2cRead(_) | Error::I2cWrite(_) | Error::I2cLength(_) => None,
            Error::Checksum { expected, received } => {
                Some(FrameError::Checksum { expected, received })
            }
            Error::DeviceFail => Some(FrameError::DeviceFail),
            Error::Abnormal(measurement) => Some(FrameError::Abnormal(measurement)),
            Error::UnsupportedCommand(code) => Some(FrameError::UnsupportedCommand(code)),
            Error::InvalidArgument => Some(FrameError::InvalidArgument),
        }
    }

    /// The decoded measurement, if the frame itself was sound.
    pub fn measurement(&self) -> Option<Measurement> {
        match self {
            Error::Abnormal(measurement) => Some(*measurement),
            _ => None,
        }
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<FrameError> for Error<E> {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Checksum { expected, received } => Error::Checksum { expected, received },
            FrameError::DeviceFail => Error::DeviceFail,
            FrameError::Abnormal(measurement) => Error::Abnormal(measurement),
            FrameError::UnsupportedCommand(code) => Error::UnsupportedCommand(code),
            FrameError::InvalidArgument => Error::InvalidArgument,
        }
    }
}
