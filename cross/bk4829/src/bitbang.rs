//! BK4829 bit-banged 3-wire bus (SCN/CS, SCL/CLK, SDA/SDIO).
//!
//! Wire protocol:
//! - write: `SCN↓, write_u8(reg), write_u16(data), SCN↑`
//! - read:  `SCN↓, write_u8(reg|0x80), read_u16(), SCN↑`
//! - SDA is bidirectional; it is switched to input only for the 16-bit
//!   response phase of a read.
//!
//! Every transaction runs inside a [`Selected`] guard. Chip select is asserted
//! when the guard is created and released when it is dropped, so an error on
//! any pin still leaves the bus idle for the next transaction.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Read flag OR'ed into the address byte.
const READ_FLAG: u8 = 0x80;

/// A bidirectional GPIO line (used for SDA/SDIO).
///
/// The chip uses a single data pin for both directions. During reads the host
/// must switch the pin to input (enabling the input buffer if the MCU needs
/// that) and restore output mode afterwards.
pub trait BidiPin: OutputPin + InputPin {
    /// Switch the pin to input mode.
    fn set_to_input(&mut self);
    /// Switch the pin back to output mode.
    fn set_to_output(&mut self);
}

/// Errors returned by the bit-bang bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<ScnE, SclE, SdaE> {
    /// Error driving SCN/CS.
    Scn(ScnE),
    /// Error driving SCL/CLK.
    Scl(SclE),
    /// Error driving/reading SDA/SDIO.
    Sda(SdaE),
}

/// Register transport used by the access layer.
///
/// Implementations must complete each call as one whole transaction; the
/// driver never interleaves two.
pub trait Bk4829Bus {
    type Error;

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), Self::Error>;
    fn read_reg(&mut self, reg: u8) -> Result<u16, Self::Error>;
}

impl<B: Bk4829Bus + ?Sized> Bk4829Bus for &mut B {
    type Error = B::Error;

    #[inline]
    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), Self::Error> {
        (**self).write_reg(reg, value)
    }

    #[inline]
    fn read_reg(&mut self, reg: u8) -> Result<u16, Self::Error> {
        (**self).read_reg(reg)
    }
}

type BusError<SCN, SCL, SDA> = Error<
    <SCN as embedded_hal::digital::ErrorType>::Error,
    <SCL as embedded_hal::digital::ErrorType>::Error,
    <SDA as embedded_hal::digital::ErrorType>::Error,
>;

/// Bit-banged bus implementation.
///
/// `SCN` and `SCL` are push-pull outputs, `SDA` must be bidirectional.
pub struct Bk4829BitBang<SCN, SCL, SDA, D> {
    scn: SCN,
    scl: SCL,
    sda: SDA,
    delay: D,
    /// Half-bit period in microseconds.
    t_us: u32,
}

impl<SCN, SCL, SDA, D> Bk4829BitBang<SCN, SCL, SDA, D>
where
    SCN: OutputPin,
    SCL: OutputPin,
    SDA: BidiPin,
    D: DelayNs,
{
    /// Create a new bus instance with a 1µs half-bit period.
    ///
    /// Lines are left idle: SCN=1, SCL=1, SDA=1 with SDA as output.
    pub fn new(
        mut scn: SCN,
        mut scl: SCL,
        mut sda: SDA,
        delay: D,
    ) -> Result<Self, BusError<SCN, SCL, SDA>> {
        scn.set_high().map_err(Error::Scn)?;
        scl.set_high().map_err(Error::Scl)?;
        sda.set_to_output();
        sda.set_high().map_err(Error::Sda)?;

        Ok(Self {
            scn,
            scl,
            sda,
            delay,
            t_us: 1,
        })
    }

    /// Set the half-bit period in microseconds (never below 1µs).
    #[inline]
    pub fn set_timing_us(&mut self, t_us: u32) {
        self.t_us = t_us.max(1);
    }

    /// Destroy the bus and return the owned peripherals.
    #[inline]
    pub fn free(self) -> (SCN, SCL, SDA, D) {
        (self.scn, self.scl, self.sda, self.delay)
    }

    #[inline(always)]
    fn dly(&mut self) {
        self.delay.delay_us(self.t_us);
    }

    /// Start a transaction: park SCN high and SCL low, then assert SCN.
    fn select(&mut self) -> Result<Selected<'_, SCN, SCL, SDA, D>, BusError<SCN, SCL, SDA>> {
        self.scn.set_high().map_err(Error::Scn)?;
        self.scl.set_low().map_err(Error::Scl)?;
        self.dly();
        self.scn.set_low().map_err(Error::Scn)?;

        Ok(Selected {
            bus: self,
            released: false,
        })
    }

    /// Return SCL and SDA to the idle level after SCN has been released.
    fn idle(&mut self) -> Result<(), BusError<SCN, SCL, SDA>> {
        self.dly();
        self.scl.set_high().map_err(Error::Scl)?;
        self.sda.set_to_output();
        self.sda.set_high().map_err(Error::Sda)
    }

    fn read_reg_raw(&mut self, reg: u8) -> Result<u16, BusError<SCN, SCL, SDA>> {
        let mut tx = self.select()?;
        tx.write_u8(reg | READ_FLAG)?;
        let value = tx.read_u16()?;
        tx.release()?;

        self.idle()?;
        Ok(value)
    }

    fn write_reg_raw(&mut self, reg: u8, data: u16) -> Result<(), BusError<SCN, SCL, SDA>> {
        let mut tx = self.select()?;
        tx.write_u8(reg)?;
        tx.bus.dly();
        tx.write_u16(data)?;
        tx.bus.dly();
        tx.release()?;

        self.idle()
    }
}

impl<SCN, SCL, SDA, D> Bk4829Bus for Bk4829BitBang<SCN, SCL, SDA, D>
where
    SCN: OutputPin,
    SCL: OutputPin,
    SDA: BidiPin,
    D: DelayNs,
{
    type Error = BusError<SCN, SCL, SDA>;

    #[inline]
    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), Self::Error> {
        self.write_reg_raw(reg, value)
    }

    #[inline]
    fn read_reg(&mut self, reg: u8) -> Result<u16, Self::Error> {
        self.read_reg_raw(reg)
    }
}

/// An in-flight transaction. Holds the bus exclusively while SCN is low.
struct Selected<'a, SCN, SCL, SDA, D>
where
    SCN: OutputPin,
    SCL: OutputPin,
    SDA: BidiPin,
    D: DelayNs,
{
    bus: &'a mut Bk4829BitBang<SCN, SCL, SDA, D>,
    released: bool,
}

impl<SCN, SCL, SDA, D> Selected<'_, SCN, SCL, SDA, D>
where
    SCN: OutputPin,
    SCL: OutputPin,
    SDA: BidiPin,
    D: DelayNs,
{
    fn write_u8(&mut self, data: u8) -> Result<(), BusError<SCN, SCL, SDA>> {
        let bus = &mut *self.bus;
        bus.sda.set_to_output();
        bus.scl.set_low().map_err(Error::Scl)?;

        let mut data = data;
        for _ in 0..8 {
            if (data & 0x80) == 0 {
                bus.sda.set_low().map_err(Error::Sda)?;
            } else {
                bus.sda.set_high().map_err(Error::Sda)?;
            }

            bus.dly();
            bus.scl.set_high().map_err(Error::Scl)?;
            bus.dly();

            data <<= 1;
            bus.scl.set_low().map_err(Error::Scl)?;
            bus.dly();
        }

        Ok(())
    }

    fn write_u16(&mut self, data: u16) -> Result<(), BusError<SCN, SCL, SDA>> {
        let bus = &mut *self.bus;
        bus.sda.set_to_output();
        bus.scl.set_low().map_err(Error::Scl)?;

        let mut data = data;
        for _ in 0..16 {
            if (data & 0x8000) == 0 {
                bus.sda.set_low().map_err(Error::Sda)?;
            } else {
                bus.sda.set_high().map_err(Error::Sda)?;
            }

            bus.dly();
            bus.scl.set_high().map_err(Error::Scl)?;

            data <<= 1;

            bus.dly();
            bus.scl.set_low().map_err(Error::Scl)?;
            bus.dly();
        }

        Ok(())
    }

    fn read_u16(&mut self) -> Result<u16, BusError<SCN, SCL, SDA>> {
        let bus = &mut *self.bus;
        bus.sda.set_to_input();
        bus.dly();

        let mut value: u16 = 0;
        for _ in 0..16 {
            value <<= 1;
            let bit = bus.sda.is_high();
            if bit.map_err(|e| {
                bus.sda.set_to_output();
                Error::Sda(e)
            })? {
                value |= 1;
            }

            bus.scl.set_high().map_err(Error::Scl)?;
            bus.dly();
            bus.scl.set_low().map_err(Error::Scl)?;
            bus.dly();
        }

        bus.sda.set_to_output();
        Ok(value)
    }

    /// Release SCN, reporting a pin error instead of swallowing it.
    fn release(mut self) -> Result<(), BusError<SCN, SCL, SDA>> {
        self.released = true;
        self.bus.scn.set_high().map_err(Error::Scn)
    }
}

impl<SCN, SCL, SDA, D> Drop for Selected<'_, SCN, SCL, SDA, D>
where
    SCN: OutputPin,
    SCL: OutputPin,
    SDA: BidiPin,
    D: DelayNs,
{
    fn drop(&mut self) {
        if !self.released {
            self.bus.sda.set_to_output();
            let _ = self.bus.scn.set_high();
        }
    }
}
