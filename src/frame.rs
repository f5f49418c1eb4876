//! Inbound frame decoding: data frames, command replies and the additive checksum.

use crate::command::Command;
use crate::error::{FrameError, Status};
use crate::fmt::Hex;

/// Size of the data frame returned after an I2C format command.
pub const DATA_FRAME_LEN: usize = 9;

/// Longest command reply the device sends.
pub const MAX_REPLY_LEN: usize = 8;

/// Header byte pair leading every data frame (not validated).
pub const DATA_FRAME_HEADER: [u8; 2] = [0x59, 0x59];

const DISTANCE_WEAK: i16 = -1;
const FLUX_SATURATED: i16 = -1;
const DISTANCE_FLOOD: i16 = -4;

/// 8-bit additive checksum: sum of `bytes` modulo 256.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Checks that the last byte of `frame` is the checksum of the others.
///
/// # Errors
///
/// * `FrameError::InvalidArgument` - If `frame` is empty
/// * `FrameError::Checksum` - If the checksum byte does not match
pub fn verify_checksum(frame: &[u8]) -> Result<(), FrameError> {
    let Some((&received, body)) = frame.split_last() else {
        return Err(FrameError::InvalidArgument);
    };
    let expected = checksum(body);
    if expected == received {
        Ok(())
    } else {
        error!(
            "Checksum mismatch: calculated {}, received {}, frame {:?}",
            expected,
            received,
            Hex(frame)
        );
        Err(FrameError::Checksum { expected, received })
    }
}

/// Converts the raw temperature code of a data frame to degrees Celsius.
#[must_use]
pub fn temperature_from_raw(raw: i16) -> i16 {
    (raw >> 3) - 256
}

/// One decoded distance measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// Distance to target in centimeters, or an abnormal-value code
    pub distance: i16,
    /// Strength of the returned signal in arbitrary units, `-1` when saturated
    pub flux: i16,
    /// Chip temperature in degrees Celsius
    pub temperature: i16,
}

impl Measurement {
    /// Classifies the abnormal-value codes of this measurement.
    ///
    /// Distance `-1` wins over flux `-1`, which wins over distance `-4`.
    #[must_use]
    pub fn status(&self) -> Status {
        if self.distance == DISTANCE_WEAK {
            Status::WeakSignal
        } else if self.flux == FLUX_SATURATED {
            Status::StrongSignal
        } else if self.distance == DISTANCE_FLOOD {
            Status::AmbientFlood
        } else {
            Status::Ready
        }
    }

    /// Returns `true` if the measurement carries no abnormal-value code.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.status().is_ready()
    }
}

/// Decodes a 9-byte data frame.
///
/// Layout: two header bytes, then little-endian distance, flux and raw
/// temperature, then the checksum over the first eight bytes.
///
/// # Errors
///
/// * `FrameError::Checksum` - If the frame is corrupt; nothing is decoded
/// * `FrameError::Abnormal` - If the frame is sound but the measurement
///   carries a weak, strong or flood code
pub fn decode_data_frame(frame: &[u8; DATA_FRAME_LEN]) -> Result<Measurement, FrameError> {
    verify_checksum(frame)?;

    let field = |offset: usize| i16::from_le_bytes([frame[offset], frame[offset + 1]]);
    let measurement = Measurement {
        distance: field(2),
        flux: field(4),
        temperature: temperature_from_raw(field(6)),
    };

    match measurement.status() {
        Status::Ready => Ok(measurement),
        status => {
            warn!(
                "Abnormal measurement ({}): distance {}, flux {}, temperature {}",
                status.label(),
                measurement.distance,
                measurement.flux,
                measurement.temperature
            );
            Err(FrameError::Abnormal(measurement))
        }
    }
}

/// Firmware version reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Revision
    pub revision: u8,
}

impl From<FirmwareVersion> for [u8; 3] {
    fn from(version: FirmwareVersion) -> Self {
        [version.major, version.minor, version.revision]
    }
}

impl core::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// Interpreted reply to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Reply {
    /// Command has no reply
    None,
    /// Device echoed the command
    Echo,
    /// Firmware version reply
    Version(FirmwareVersion),
    /// Reset or save command reported success
    Pass,
}

/// Decodes the reply to `command`.
///
/// `reply` must hold exactly the reply length of the command.
///
/// # Errors
///
/// * `FrameError::InvalidArgument` - If `reply` has the wrong length
/// * `FrameError::Checksum` - If the reply is corrupt
/// * `FrameError::DeviceFail` - If a reset or save command reports failure
pub fn decode_reply(command: &Command, reply: &[u8]) -> Result<Reply, FrameError> {
    let expected_len = usize::from(command.descriptor().reply_len);
    if reply.len() != expected_len {
        error!(
            "Reply length {} does not match {} for {:?}",
            reply.len(),
            expected_len,
            command
        );
        return Err(FrameError::InvalidArgument);
    }
    if expected_len == 0 {
        return Ok(Reply::None);
    }

    verify_checksum(reply)?;

    match command {
        // version bytes arrive lowest component first
        Command::GetFirmwareVersion => Ok(Reply::Version(FirmwareVersion {
            major: reply[5],
            minor: reply[4],
            revision: reply[3],
        })),
        Command::SoftReset | Command::HardReset | Command::SaveSettings => {
            if reply[3] == 0 {
                Ok(Reply::Pass)
            } else {
                error!("Device reported failure for {:?}: {:?}", command, Hex(reply));
                Err(FrameError::DeviceFail)
            }
        }
        _ => Ok(Reply::Echo),
    }
}
