//! Outbound command frames.
//!
//! Every command is described by a [`CommandDescriptor`]: its opcode, the
//! total frame length, the reply length and the width of its parameter. A
//! frame is laid out as
//!
//! ```text
//! 0x5A | length | opcode | parameter (0, 1, 2 or 4 bytes, LE) | checksum
//! ```

use crate::error::FrameError;
use crate::fmt::Hex;
use crate::frame::checksum;

/// Header byte leading every command frame.
pub const COMMAND_HEADER: u8 = 0x5A;

/// Longest command frame.
pub const MAX_COMMAND_LEN: usize = 8;

/// Highest valid 7-bit I2C address.
pub const MAX_I2C_ADDRESS: u8 = 0x7F;

/// Static layout of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandDescriptor {
    /// Command identifier
    pub opcode: u8,
    /// Total frame length: header, length, opcode, parameter and checksum
    pub command_len: u8,
    /// Number of reply bytes the device sends back, 0 for none
    pub reply_len: u8,
    /// Number of parameter bytes following the opcode
    pub param_width: u8,
}

impl CommandDescriptor {
    const fn new(opcode: u8, param_width: u8, reply_len: u8) -> Self {
        Self {
            opcode,
            command_len: 4 + param_width,
            reply_len,
            param_width,
        }
    }
}

/// Measurement rate of the device in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameRate {
    /// Measure only on trigger
    Hz0,
    /// 1 Hz
    Hz1,
    /// 2 Hz
    Hz2,
    /// 5 Hz
    Hz5,
    /// 10 Hz
    Hz10,
    /// 20 Hz
    Hz20,
    /// 25 Hz
    Hz25,
    /// 50 Hz
    Hz50,
    /// 100 Hz, the factory default
    Hz100,
    /// 125 Hz
    Hz125,
    /// 200 Hz
    Hz200,
    /// 250 Hz
    Hz250,
    /// 500 Hz
    Hz500,
    /// 1000 Hz
    Hz1000,
    /// Any other rate
    Custom(u16),
}

impl From<FrameRate> for u16 {
    fn from(rate: FrameRate) -> Self {
        match rate {
            FrameRate::Hz0 => 0,
            FrameRate::Hz1 => 1,
            FrameRate::Hz2 => 2,
            FrameRate::Hz5 => 5,
            FrameRate::Hz10 => 10,
            FrameRate::Hz20 => 20,
            FrameRate::Hz25 => 25,
            FrameRate::Hz50 => 50,
            FrameRate::Hz100 => 100,
            FrameRate::Hz125 => 125,
            FrameRate::Hz200 => 200,
            FrameRate::Hz250 => 250,
            FrameRate::Hz500 => 500,
            FrameRate::Hz1000 => 1000,
            FrameRate::Custom(value) => value,
        }
    }
}

impl From<u16> for FrameRate {
    fn from(value: u16) -> Self {
        match value {
            0 => FrameRate::Hz0,
            1 => FrameRate::Hz1,
            2 => FrameRate::Hz2,
            5 => FrameRate::Hz5,
            10 => FrameRate::Hz10,
            20 => FrameRate::Hz20,
            25 => FrameRate::Hz25,
            50 => FrameRate::Hz50,
            100 => FrameRate::Hz100,
            125 => FrameRate::Hz125,
            200 => FrameRate::Hz200,
            250 => FrameRate::Hz250,
            500 => FrameRate::Hz500,
            1000 => FrameRate::Hz1000,
            _ => FrameRate::Custom(value),
        }
    }
}

/// UART baud rate the device switches to in serial mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    /// 9600 baud
    B9600,
    /// 14400 baud
    B14400,
    /// 19200 baud
    B19200,
    /// 56000 baud
    B56000,
    /// 115200 baud, the factory default
    B115200,
    /// 460800 baud
    B460800,
    /// 921600 baud
    B921600,
    /// Any other rate
    Custom(u32),
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> Self {
        match rate {
            BaudRate::B9600 => 9_600,
            BaudRate::B14400 => 14_400,
            BaudRate::B19200 => 19_200,
            BaudRate::B56000 => 56_000,
            BaudRate::B115200 => 115_200,
            BaudRate::B460800 => 460_800,
            BaudRate::B921600 => 921_600,
            BaudRate::Custom(value) => value,
        }
    }
}

impl From<u32> for BaudRate {
    fn from(value: u32) -> Self {
        match value {
            9_600 => BaudRate::B9600,
            14_400 => BaudRate::B14400,
            19_200 => BaudRate::B19200,
            56_000 => BaudRate::B56000,
            115_200 => BaudRate::B115200,
            460_800 => BaudRate::B460800,
            921_600 => BaudRate::B921600,
            _ => BaudRate::Custom(value),
        }
    }
}

/// A device command together with its parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Switch the device to its UART interface (no reply)
    SetSerialMode,
    /// Switch the device to its I2C interface (no reply)
    SetI2cMode,
    /// Read the 3-byte firmware version
    GetFirmwareVersion,
    /// Set the measurement rate
    SetFrameRate(FrameRate),
    /// Select the standard 9-byte centimeter output format
    StandardFormatCm,
    /// Set the UART baud rate
    SetBaudRate(BaudRate),
    /// Enable data output
    EnableOutput,
    /// Disable data output
    DisableOutput,
    /// Change the device's I2C address; takes effect immediately
    SetI2cAddress(u8),
    /// Reset the device (pass/fail reply)
    SoftReset,
    /// Restore factory settings (pass/fail reply)
    HardReset,
    /// Persist the current settings (pass/fail reply)
    SaveSettings,
    /// Prepare a centimeter data frame for the next I2C read (no reply)
    I2cFormatCm,
    /// Trigger one measurement when the frame rate is 0 (no reply)
    TriggerDetection,
}

impl Command {
    /// Layout of this command.
    #[must_use]
    pub fn descriptor(&self) -> CommandDescriptor {
        match self {
            Command::SetSerialMode | Command::SetI2cMode => CommandDescriptor::new(0x0A, 1, 0),
            Command::GetFirmwareVersion => CommandDescriptor::new(0x01, 0, 7),
            Command::SetFrameRate(_) => CommandDescriptor::new(0x03, 2, 6),
            Command::StandardFormatCm => CommandDescriptor::new(0x05, 1, 5),
            Command::SetBaudRate(_) => CommandDescriptor::new(0x06, 4, 8),
            Command::EnableOutput | Command::DisableOutput => CommandDescriptor::new(0x07, 1, 5),
            Command::SetI2cAddress(_) => CommandDescriptor::new(0x0B, 1, 5),
            Command::SoftReset => CommandDescriptor::new(0x02, 0, 5),
            Command::HardReset => CommandDescriptor::new(0x10, 0, 5),
            Command::SaveSettings => CommandDescriptor::new(0x11, 0, 5),
            Command::I2cFormatCm => CommandDescriptor::new(0x00, 1, 0),
            Command::TriggerDetection => CommandDescriptor::new(0x04, 0, 0),
        }
    }

    /// Parameter value placed after the opcode.
    #[must_use]
    pub fn parameter(&self) -> u32 {
        match self {
            Command::SetI2cMode
            | Command::StandardFormatCm
            | Command::EnableOutput
            | Command::I2cFormatCm => 1,
            Command::SetFrameRate(rate) => u32::from(u16::from(*rate)),
            Command::SetBaudRate(rate) => u32::from(*rate),
            Command::SetI2cAddress(address) => u32::from(*address),
            _ => 0,
        }
    }

    /// Packed 32-bit command code used by the vendor documentation.
    ///
    /// Bytes, least significant first: reply length, command length,
    /// opcode, inline parameter.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn code(&self) -> u32 {
        let descriptor = self.descriptor();
        let inline = match self {
            Command::SetFrameRate(_) | Command::SetBaudRate(_) => 0,
            Command::SetI2cAddress(_) => 0x10,
            _ => self.parameter() as u8,
        };
        u32::from_le_bytes([
            descriptor.reply_len,
            descriptor.command_len,
            descriptor.opcode,
            inline,
        ])
    }

    /// Builds a command from a packed vendor code and a 32-bit parameter.
    ///
    /// Commands without a separate parameter ignore `param`.
    ///
    /// # Errors
    ///
    /// * `FrameError::UnsupportedCommand` - If `code` is not a supported command
    /// * `FrameError::InvalidArgument` - If `param` does not fit the command
    pub fn from_code(code: u32, param: u32) -> Result<Self, FrameError> {
        let command = match code {
            0x000A_0500 => Command::SetSerialMode,
            0x010A_0500 => Command::SetI2cMode,
            0x0001_0407 => Command::GetFirmwareVersion,
            0x0003_0606 => {
                let rate = u16::try_from(param).map_err(|_| {
                    error!("Frame rate {} out of range", param);
                    FrameError::InvalidArgument
                })?;
                Command::SetFrameRate(FrameRate::from(rate))
            }
            0x0105_0505 => Command::StandardFormatCm,
            0x0006_0808 => Command::SetBaudRate(BaudRate::from(param)),
            0x0107_0505 => Command::EnableOutput,
            0x0007_0505 => Command::DisableOutput,
            0x100B_0505 => {
                let address = u8::try_from(param).map_err(|_| {
                    error!("I2C address {} out of range", param);
                    FrameError::InvalidArgument
                })?;
                Command::SetI2cAddress(address)
            }
            0x0002_0405 => Command::SoftReset,
            0x0010_0405 => Command::HardReset,
            0x0011_0405 => Command::SaveSettings,
            0x0100_0500 => Command::I2cFormatCm,
            0x0004_0400 => Command::TriggerDetection,
            _ => {
                error!("Unsupported command code {}", code);
                return Err(FrameError::UnsupportedCommand(code));
            }
        };
        Ok(command)
    }

    /// Encodes this command into a frame with its checksum appended.
    ///
    /// # Errors
    ///
    /// * `FrameError::InvalidArgument` - If an I2C address is not a 7-bit address
    pub fn encode(&self) -> Result<CommandFrame, FrameError> {
        if let Command::SetI2cAddress(address) = self {
            if *address > MAX_I2C_ADDRESS {
                error!("Invalid I2C address: {}", address);
                return Err(FrameError::InvalidArgument);
            }
        }

        let descriptor = self.descriptor();
        let len = usize::from(descriptor.command_len);
        let width = usize::from(descriptor.param_width);

        let mut bytes = [0u8; MAX_COMMAND_LEN];
        bytes[0] = COMMAND_HEADER;
        bytes[1] = descriptor.command_len;
        bytes[2] = descriptor.opcode;
        bytes[3..3 + width].copy_from_slice(&self.parameter().to_le_bytes()[..width]);
        bytes[len - 1] = checksum(&bytes[..len - 1]);

        let frame = CommandFrame { bytes, len };
        debug!("Encoded {:?}: {:?}", self, Hex(frame.as_bytes()));
        Ok(frame)
    }
}

/// An encoded command frame, immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; MAX_COMMAND_LEN],
    len: usize,
}

impl CommandFrame {
    /// The frame bytes, checksum included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Command; 14] = [
        Command::SetSerialMode,
        Command::SetI2cMode,
        Command::GetFirmwareVersion,
        Command::SetFrameRate(FrameRate::Hz250),
        Command::StandardFormatCm,
        Command::SetBaudRate(BaudRate::B921600),
        Command::EnableOutput,
        Command::DisableOutput,
        Command::SetI2cAddress(0x11),
        Command::SoftReset,
        Command::HardReset,
        Command::SaveSettings,
        Command::I2cFormatCm,
        Command::TriggerDetection,
    ];

    #[test]
    fn frames_carry_length_opcode_and_checksum() {
        for command in ALL {
            let descriptor = command.descriptor();
            let frame = command.encode().unwrap();
            let bytes = frame.as_bytes();
            assert_eq!(bytes.len(), usize::from(descriptor.command_len));
            assert_eq!(bytes.len(), 4 + usize::from(descriptor.param_width));
            assert_eq!(bytes[0], COMMAND_HEADER);
            assert_eq!(bytes[1], descriptor.command_len);
            assert_eq!(bytes[2], descriptor.opcode);
            let (&last, body) = bytes.split_last().unwrap();
            assert_eq!(last, checksum(body), "{command:?}");
        }
    }

    #[test]
    fn known_frames() {
        assert_eq!(
            Command::I2cFormatCm.encode().unwrap().as_bytes(),
            &[0x5A, 0x05, 0x00, 0x01, 0x60]
        );
        assert_eq!(
            Command::GetFirmwareVersion.encode().unwrap().as_bytes(),
            &[0x5A, 0x04, 0x01, 0x5F]
        );
        assert_eq!(
            Command::SetFrameRate(FrameRate::Hz250).encode().unwrap().as_bytes(),
            &[0x5A, 0x06, 0x03, 0xFA, 0x00, 0x5D]
        );
        assert_eq!(
            Command::SetBaudRate(BaudRate::B115200)
                .encode()
                .unwrap()
                .as_bytes(),
            &[0x5A, 0x08, 0x06, 0x00, 0xC2, 0x01, 0x00, 0x2B]
        );
        assert_eq!(
            Command::SetI2cAddress(0x20).encode().unwrap().as_bytes(),
            &[0x5A, 0x05, 0x0B, 0x20, 0x8A]
        );
    }

    #[test]
    fn packed_codes_round_trip() {
        for command in ALL {
            let parsed = Command::from_code(command.code(), command.parameter()).unwrap();
            assert_eq!(parsed, command);
        }
        assert_eq!(Command::SetI2cMode.code(), 0x010A_0500);
        assert_eq!(Command::SetI2cAddress(0x42).code(), 0x100B_0505);
        assert_eq!(Command::SetFrameRate(FrameRate::Hz5).code(), 0x0003_0606);
    }

    #[test]
    fn unsupported_codes_are_rejected() {
        // millimeter formats
        assert_eq!(
            Command::from_code(0x0605_0505, 0),
            Err(FrameError::UnsupportedCommand(0x0605_0505))
        );
        assert_eq!(
            Command::from_code(0x0600_0500, 0),
            Err(FrameError::UnsupportedCommand(0x0600_0500))
        );
        assert_eq!(
            Command::from_code(0xDEAD_BEEF, 0),
            Err(FrameError::UnsupportedCommand(0xDEAD_BEEF))
        );
    }

    #[test]
    fn oversized_parameters_are_rejected() {
        assert_eq!(
            Command::from_code(0x0003_0606, 0x1_0000),
            Err(FrameError::InvalidArgument)
        );
        assert_eq!(
            Command::from_code(0x100B_0505, 0x100),
            Err(FrameError::InvalidArgument)
        );
        assert_eq!(
            Command::SetI2cAddress(0x80).encode(),
            Err(FrameError::InvalidArgument)
        );
    }

    #[test]
    fn presets_map_to_raw_values() {
        assert_eq!(FrameRate::from(5), FrameRate::Hz5);
        assert_eq!(FrameRate::from(7), FrameRate::Custom(7));
        assert_eq!(u16::from(FrameRate::Hz1000), 0x03E8);
        assert_eq!(u32::from(BaudRate::B460800), 0x07_0800);
        assert_eq!(BaudRate::from(0x0E_1000), BaudRate::B921600);
    }
}
