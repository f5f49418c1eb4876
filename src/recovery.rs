//! Bit-banged I2C bus recovery.
//!
//! A device that stops mid-transfer can hold SDA low and leave the bus hung.
//! The recovery takes both lines away from the I2C peripheral, clocks out the
//! bits the device is still waiting for plus a NACK, sends a STOP and hands
//! the lines back. It cannot tell whether the bus came back; retry a normal
//! operation afterwards.
//!
//! Recovery drives the same lines as the I2C peripheral. Never run it while a
//! transfer is in flight.

use embedded_hal::digital::OutputPin;

#[cfg(not(feature = "async"))]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "async")]
use embedded_hal_async::delay::DelayNs;

use crate::config::RecoveryTiming;

/// A GPIO whose direction can be switched at runtime.
///
/// Recovery drives the lines as outputs and leaves them as inputs so the I2C
/// peripheral can take them over again.
pub trait FlexPin: OutputPin {
    /// Switches the pin to push-pull or open-drain output.
    ///
    /// # Errors
    ///
    /// Returns the pin's error if the mode cannot be changed.
    fn set_as_output(&mut self) -> Result<(), Self::Error>;

    /// Releases the pin to a passive input.
    ///
    /// # Errors
    ///
    /// Returns the pin's error if the mode cannot be changed.
    fn set_as_input(&mut self) -> Result<(), Self::Error>;
}

/// Pin failure during recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError<DataE, ClockE> {
    /// Driving the data line failed
    Data(DataE),
    /// Driving the clock line failed
    Clock(ClockE),
}

/// Identifies one of the board's I2C buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    /// The default bus
    Primary,
    /// The second bus, on boards that have one
    Secondary,
}

/// Data and clock line of one bus.
#[derive(Debug)]
pub struct BusPins<SDA, SCL> {
    /// Data line
    pub sda: SDA,
    /// Clock line
    pub scl: SCL,
}

/// The I2C buses a board provides.
#[derive(Debug)]
pub struct BoardBuses<SDA, SCL> {
    /// Pins of the default bus
    pub primary: BusPins<SDA, SCL>,
    /// Pins of the second bus, if the board has one
    pub secondary: Option<BusPins<SDA, SCL>>,
}

/// Runs the recovery sequence with a configurable pulse timing.
pub struct BusRecovery<D> {
    delay: D,
    timing: RecoveryTiming,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<D> BusRecovery<D>
where
    D: DelayNs,
{
    /// Creates a recovery with the default 100 kHz timing.
    pub fn new(delay: D) -> Self {
        Self::with_timing(delay, RecoveryTiming::default())
    }

    /// Creates a recovery with a custom timing.
    pub fn with_timing(delay: D, timing: RecoveryTiming) -> Self {
        Self { delay, timing }
    }

    /// Returns the delay implementation.
    pub fn release(self) -> D {
        self.delay
    }

    /// Frees a hung bus on `sda`/`scl`, then calls `reinit` so the caller
    /// can set the I2C peripheral up again.
    ///
    /// Sequence: data high, `timing.pulses` clock pulses, STOP (data rises
    /// while clock is high), both lines released to inputs. The lines are
    /// released even when driving them failed.
    ///
    /// # Errors
    ///
    /// * `Err(PinError::Data(_))` or `Err(PinError::Clock(_))` - The first
    ///   pin failure; `reinit` is not called
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let mut recovery = BusRecovery::new(delay);
    /// recovery.recover_bus(&mut sda, &mut scl, || i2c = I2c::new(peripherals.I2C0, ..))?;
    /// ```
    pub async fn recover_bus<SDA, SCL>(
        &mut self,
        sda: &mut SDA,
        scl: &mut SCL,
        reinit: impl FnOnce(),
    ) -> Result<(), PinError<SDA::Error, SCL::Error>>
    where
        SDA: FlexPin,
        SCL: FlexPin,
    {
        let driven = self.clock_out(sda, scl).await;
        if driven.is_err() {
            warn!("I2C bus recovery failed, releasing lines");
        }

        let sda_released = sda.set_as_input().map_err(PinError::Data);
        let scl_released = scl.set_as_input().map_err(PinError::Clock);
        driven.and(sda_released).and(scl_released)?;

        reinit();
        Ok(())
    }

    // Pulses and STOP. May leave the lines driven; the caller releases them.
    async fn clock_out<SDA, SCL>(
        &mut self,
        sda: &mut SDA,
        scl: &mut SCL,
    ) -> Result<(), PinError<SDA::Error, SCL::Error>>
    where
        SDA: FlexPin,
        SCL: FlexPin,
    {
        let timing = self.timing;

        // data stays high through the pulses
        sda.set_as_output().map_err(PinError::Data)?;
        sda.set_high().map_err(PinError::Data)?;
        scl.set_as_output().map_err(PinError::Clock)?;

        for _ in 0..timing.pulses {
            scl.set_high().map_err(PinError::Clock)?;
            self.delay.delay_us(timing.pulse_us).await;
            scl.set_low().map_err(PinError::Clock)?;
            self.delay.delay_us(timing.pulse_us).await;
        }

        // STOP: data low to high while clock is high
        sda.set_low().map_err(PinError::Data)?;
        self.delay.delay_us(timing.stop_setup_us).await;
        scl.set_high().map_err(PinError::Clock)?;
        self.delay.delay_us(timing.stop_hold_us).await;
        sda.set_high().map_err(PinError::Data)?;
        self.delay.delay_us(timing.stop_hold_us).await;
        Ok(())
    }

    /// Recovers the board's default bus and, if present, its second bus.
    ///
    /// `reinit` is called once per recovered bus with its [`BusId`].
    ///
    /// # Errors
    ///
    /// * `Err(PinError::Data(_))` or `Err(PinError::Clock(_))` - If a pin
    ///   could not be driven; later buses are left untouched
    pub async fn recover_default_buses<SDA, SCL>(
        &mut self,
        board: &mut BoardBuses<SDA, SCL>,
        mut reinit: impl FnMut(BusId),
    ) -> Result<(), PinError<SDA::Error, SCL::Error>>
    where
        SDA: FlexPin,
        SCL: FlexPin,
    {
        info!("Recovering default I2C bus");
        let BusPins { sda, scl } = &mut board.primary;
        self.recover_bus(sda, scl, || reinit(BusId::Primary))
            .await?;

        if let Some(BusPins { sda, scl }) = board.secondary.as_mut() {
            info!("Recovering second I2C bus");
            self.recover_bus(sda, scl, || reinit(BusId::Secondary))
                .await?;
        }
        info!("I2C bus recovery done");
        Ok(())
    }
}
