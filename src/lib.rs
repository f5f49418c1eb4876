//! # TFMini-Plus I2C LiDAR Driver
//!
//! This crate provides a `no_std` driver for the Benewake TFMini-Plus range
//! sensor on its I2C interface. It builds the device's command frames,
//! verifies the additive checksum of every reply and data frame, decodes
//! distance, signal strength and chip temperature, and classifies the
//! abnormal-value codes the sensor reports. A bit-banged bus recovery
//! routine is included for freeing a hung bus.
//!
//! The driver is blocking by default; enable the `async` feature to build it
//! on `embedded-hal-async` instead.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use tfmini_plus_i2c::TfMiniPlus;
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let mut lidar = TfMiniPlus::new(i2c, delay);
//!
//! match lidar.get_data() {
//!     Ok(m) => println!("{} cm, flux {}, {} °C", m.distance, m.flux, m.temperature),
//!     Err(e) => println!("no usable measurement: {:?} ({:?})", e, lidar.status()),
//! }
//! ```
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

pub mod command;
mod config;
mod error;
pub mod frame;
pub mod recovery;

pub use command::{BaudRate, Command, CommandDescriptor, FrameRate};
pub use config::*;
pub use error::*;
pub use frame::{FirmwareVersion, Measurement, Reply};
pub use recovery::{BoardBuses, BusId, BusPins, BusRecovery, FlexPin, PinError};

use embedded_hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};
#[cfg(not(feature = "async"))]
use embedded_hal::{delay::DelayNs, i2c::I2c};
#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

use crate::fmt::Hex;
use crate::frame::{DATA_FRAME_LEN, MAX_REPLY_LEN};

/// TFMini-Plus LiDAR driver on I2C.
///
/// Generic over the I2C bus and the delay used for the post-command settling
/// time. Each call addresses one device, so a single driver can serve several
/// sensors on the same bus through the `*_at` methods.
///
/// The driver keeps the [`Status`] of the last operation and the last
/// firmware version read. It is not meant to be shared between threads;
/// wrap it in a mutex if needed.
pub struct TfMiniPlus<I2C, D> {
    /// I2C interface for communication with the sensor
    i2c: I2C,
    /// Delay implementation for the settling time
    delay: D,
    /// Default address and timing
    config: Config,
    /// Outcome of the last operation
    status: Status,
    /// Last firmware version read from a device
    version: Option<FirmwareVersion>,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D> TfMiniPlus<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug + embedded_hal::i2c::Error,
    D: DelayNs,
{
    /// Creates a new driver with the default configuration.
    ///
    /// # Default Configuration
    ///
    /// - **I2C Address**: 0x10
    /// - **Settling delay**: 500 ms between a command and its reply
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tfmini_plus_i2c::TfMiniPlus;
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let mut lidar = TfMiniPlus::new(i2c, delay);
    /// ```
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_config(i2c, delay, Config::default())
    }

    /// Creates a new driver with the given configuration.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tfmini_plus_i2c::{Config, TfMiniPlus};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let config = Config::default().address(0x22).settle_ms(100);
    /// let mut lidar = TfMiniPlus::with_config(i2c, delay, config);
    /// ```
    pub fn with_config(i2c: I2C, delay: D, config: Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            status: Status::Ready,
            version: None,
        }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Outcome of the most recent operation.
    ///
    /// Reset to [`Status::Ready`] when an operation starts and set at most
    /// once before it returns.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The firmware version from the last successful version read.
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.version
    }

    /// Releases the I2C bus and delay, e.g. to run a [`BusRecovery`].
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Reads one measurement from the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`get_data_at`](Self::get_data_at).
    pub async fn get_data(&mut self) -> Result<Measurement, Error<E>> {
        self.get_data_at(self.config.address).await
    }

    /// Reads one measurement from the device at `address`.
    ///
    /// Selects the centimeter data format, then reads and decodes the
    /// 9-byte data frame.
    ///
    /// # Returns
    ///
    /// * `Ok(Measurement)` - Distance in cm, signal strength and temperature in °C
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cWrite(E))` / `Err(Error::I2cLength(E))` - If the format command could not be sent
    /// * `Err(Error::I2cRead(E))` - If the data frame could not be read completely
    /// * `Err(Error::Checksum { .. })` - If the data frame is corrupt
    /// * `Err(Error::Abnormal(m))` - If the reading is weak, saturated or flooded;
    ///   `m` still holds the decoded values
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tfmini_plus_i2c::{Error, Status, TfMiniPlus};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut lidar = TfMiniPlus::new(i2c, delay);
    ///
    /// match lidar.get_data_at(0x11) {
    ///     Ok(m) => println!("Distance: {} cm", m.distance),
    ///     Err(Error::Abnormal(m)) if lidar.status() == Status::WeakSignal => {
    ///         println!("Weak signal, flux {}", m.flux)
    ///     }
    ///     Err(e) => println!("Read failed: {}", e),
    /// }
    /// ```
    pub async fn get_data_at(&mut self, address: u8) -> Result<Measurement, Error<E>> {
        self.status = Status::Ready;
        let result = self.read_measurement(address).await;
        self.settle_status(result)
    }

    /// Reads only the distance from the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`get_data_at`](Self::get_data_at).
    pub async fn get_distance(&mut self) -> Result<i16, Error<E>> {
        self.get_distance_at(self.config.address).await
    }

    /// Reads only the distance, in centimeters, from the device at `address`.
    ///
    /// # Errors
    ///
    /// See [`get_data_at`](Self::get_data_at).
    pub async fn get_distance_at(&mut self, address: u8) -> Result<i16, Error<E>> {
        Ok(self.get_data_at(address).await?.distance)
    }

    /// Sends `command` to the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn send_command(&mut self, command: Command) -> Result<Reply, Error<E>> {
        self.send_command_at(command, self.config.address).await
    }

    /// Sends `command` to the device at `address` and interprets its reply.
    ///
    /// Commands with a reply wait `config.settle_ms` before reading it. The
    /// reply to [`Command::SetI2cAddress`] is read from the new address.
    ///
    /// # Returns
    ///
    /// * `Ok(Reply::None)` - Command has no reply and was written cleanly
    /// * `Ok(Reply::Echo)` - Device echoed the command
    /// * `Ok(Reply::Version(v))` - Firmware version, also kept for [`firmware_version`](Self::firmware_version)
    /// * `Ok(Reply::Pass)` - Reset or save command succeeded
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If the command parameter is out of range
    /// * `Err(Error::I2cLength(E))` - If the device stopped accepting the frame
    /// * `Err(Error::I2cWrite(E))` - If writing the frame failed
    /// * `Err(Error::I2cRead(E))` - If reading the reply failed
    /// * `Err(Error::Checksum { .. })` - If the reply is corrupt
    /// * `Err(Error::DeviceFail)` - If the device reports a failed reset or save
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tfmini_plus_i2c::{Command, FrameRate, TfMiniPlus};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut lidar = TfMiniPlus::new(i2c, delay);
    ///
    /// lidar.send_command_at(Command::SetFrameRate(FrameRate::Hz20), 0x10).unwrap();
    /// lidar.send_command_at(Command::SaveSettings, 0x10).unwrap();
    /// ```
    pub async fn send_command_at(
        &mut self,
        command: Command,
        address: u8,
    ) -> Result<Reply, Error<E>> {
        self.status = Status::Ready;
        let result = self.exchange(command, address).await;
        self.settle_status(result)
    }

    /// Sends a command given as a packed vendor code plus a 32-bit parameter.
    ///
    /// # Errors
    ///
    /// * `Err(Error::UnsupportedCommand(code))` - If `code` is not a supported command
    /// * `Err(Error::InvalidArgument)` - If `param` does not fit the command
    /// * Any error of [`send_command_at`](Self::send_command_at)
    pub async fn send_raw_command(
        &mut self,
        code: u32,
        param: u32,
        address: u8,
    ) -> Result<Reply, Error<E>> {
        self.status = Status::Ready;
        let result = match Command::from_code(code, param) {
            Ok(command) => self.exchange(command, address).await,
            Err(e) => Err(e.into()),
        };
        self.settle_status(result)
    }

    /// Reads the firmware version of the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn read_firmware_version(&mut self) -> Result<FirmwareVersion, Error<E>> {
        match self.send_command(Command::GetFirmwareVersion).await? {
            Reply::Version(version) => Ok(version),
            _ => unreachable!("firmware version request always decodes to a version"),
        }
    }

    /// Sets the measurement rate of the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn set_frame_rate(&mut self, rate: FrameRate) -> Result<(), Error<E>> {
        self.send_command(Command::SetFrameRate(rate)).await?;
        Ok(())
    }

    /// Moves the device at the configured address to `address` and makes it
    /// the new configured address.
    ///
    /// The change is volatile until [`save_settings`](Self::save_settings).
    /// The configured address follows as soon as the command is written, so
    /// a failed reply read still leaves the driver pointing at `address`.
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidArgument)` - If `address` is not a 7-bit address
    /// * Any error of [`send_command_at`](Self::send_command_at)
    pub async fn set_i2c_address(&mut self, address: u8) -> Result<(), Error<E>> {
        let result = self.send_command(Command::SetI2cAddress(address)).await;
        // the device only stays put if the frame never landed
        if !matches!(
            result,
            Err(Error::InvalidArgument | Error::I2cWrite(_) | Error::I2cLength(_))
        ) {
            self.config.address = address;
        }
        result.map(|_| ())
    }

    /// Restarts the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::SoftReset).await?;
        Ok(())
    }

    /// Restores factory settings on the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn hard_reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::HardReset).await?;
        Ok(())
    }

    /// Persists the settings of the device at the configured address.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn save_settings(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::SaveSettings).await?;
        Ok(())
    }

    /// Triggers one measurement on the device at the configured address.
    ///
    /// Only meaningful with a frame rate of 0.
    ///
    /// # Errors
    ///
    /// See [`send_command_at`](Self::send_command_at).
    pub async fn trigger_detection(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::TriggerDetection).await?;
        Ok(())
    }

    // One command/reply exchange. Leaves `status` alone.
    async fn exchange(&mut self, command: Command, address: u8) -> Result<Reply, Error<E>> {
        let request = command.encode()?;
        let reply_len = usize::from(command.descriptor().reply_len);

        debug!("Sending {:?} to {}: {:?}", command, address, Hex(request.as_bytes()));
        self.i2c
            .write(address, request.as_bytes())
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data) => Error::I2cLength(e),
                _ => Error::I2cWrite(e),
            })?;

        if reply_len == 0 {
            return Ok(Reply::None);
        }
        self.delay.delay_ms(self.config.settle_ms).await;

        // the new address is live as soon as the command lands
        let reply_address = match command {
            Command::SetI2cAddress(new_address) => new_address,
            _ => address,
        };

        let mut buffer = [0u8; MAX_REPLY_LEN];
        let reply = &mut buffer[..reply_len];
        self.i2c
            .read(reply_address, reply)
            .await
            .map_err(Error::I2cRead)?;
        debug!("Reply from {}: {:?}", reply_address, Hex(reply));

        let decoded = frame::decode_reply(&command, reply)?;
        if let Reply::Version(version) = decoded {
            info!("Firmware version {}.{}.{}", version.major, version.minor, version.revision);
            self.version = Some(version);
        }
        Ok(decoded)
    }

    async fn read_measurement(&mut self, address: u8) -> Result<Measurement, Error<E>> {
        self.exchange(Command::I2cFormatCm, address).await?;

        let mut data = [0u8; DATA_FRAME_LEN];
        self.i2c
            .read(address, &mut data)
            .await
            .map_err(Error::I2cRead)?;
        debug!("Data frame from {}: {:?}", address, Hex(&data));

        Ok(frame::decode_data_frame(&data)?)
    }

    fn settle_status<T>(&mut self, result: Result<T, Error<E>>) -> Result<T, Error<E>> {
        if let Err(error) = &result {
            if let Some(status) = error.status() {
                self.status = status;
            }
        }
        result
    }
}
