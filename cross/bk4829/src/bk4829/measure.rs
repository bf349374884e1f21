//! Live signal readouts and frequency scan.
//!
//! Every readout is a fresh register read.

use crate::bitbang::Bk4829Bus;
use crate::regmap;

use super::driver::Bk4829Driver;
use super::regs::Register;

/// Frequency scan integration time (REG_32[15:14]).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum FreqScanTime {
    Ms200 = 0,
    Ms400 = 1,
    Ms800 = 2,
    Ms1600 = 3,
}

const FREQ_SCAN_ON: u16 = 0x0245;
const FREQ_SCAN_OFF: u16 = 0x0244;
const FREQ_SCAN_TIME_SHIFT: u16 = 14;

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    /// Raw RSSI, 0.5 dB per step.
    pub fn rssi(&mut self) -> Result<u16, BUS::Error> {
        Ok(self.bk.read_register(Register::Reg67)? & 0x01FF)
    }

    pub fn rssi_dbm(&mut self) -> Result<i16, BUS::Error> {
        Ok((self.rssi()? / 2) as i16 - 160)
    }

    pub fn noise(&mut self) -> Result<u8, BUS::Error> {
        Ok((self.bk.read_register(Register::Reg65)? & 0x7F) as u8)
    }

    pub fn glitch(&mut self) -> Result<u8, BUS::Error> {
        Ok(self.bk.read_register(Register::Reg63)? as u8)
    }

    pub fn snr(&mut self) -> Result<u8, BUS::Error> {
        Ok(self.bk.read_register(Register::Reg61)? as u8)
    }

    pub fn voice_amplitude(&mut self) -> Result<u16, BUS::Error> {
        self.bk.read_register(Register::Reg64)
    }

    pub fn vox_amplitude(&mut self) -> Result<u16, BUS::Error> {
        Ok(self.bk.read_register(Register::Reg64)? & 0x7FFF)
    }

    pub fn af_tx_rx(&mut self) -> Result<u8, BUS::Error> {
        Ok((self.bk.read_register(Register::Reg6F)? & 0x3F) as u8)
    }

    pub fn signal_power(&mut self) -> Result<u8, BUS::Error> {
        let r: regmap::Reg7E = self.bk.read_reg_n()?;
        Ok(r.signal_power())
    }

    pub fn lna_peak_rssi(&mut self) -> Result<u8, BUS::Error> {
        Ok(self.bk.read_register(Register::Reg62)? as u8)
    }

    pub fn agc_rssi(&mut self) -> Result<u8, BUS::Error> {
        Ok((self.bk.read_register(Register::Reg62)? >> 8) as u8)
    }

    /// Signed AFC offset, scaled by 10/3.
    pub fn afc_value(&mut self) -> Result<i16, BUS::Error> {
        let raw = self.bk.read_register(Register::Reg6D)? as i16;
        Ok((i32::from(raw) * 10 / 3) as i16)
    }

    // --- Frequency scan -----------------------------------------------------

    pub fn enable_frequency_scan(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg32, FREQ_SCAN_ON)
    }

    pub fn enable_frequency_scan_ex(&mut self, time: FreqScanTime) -> Result<(), BUS::Error> {
        self.bk.write_register(
            Register::Reg32,
            FREQ_SCAN_ON | ((time as u16) << FREQ_SCAN_TIME_SHIFT),
        )
    }

    /// `hz` is a 13-bit scan window; wider values are masked.
    pub fn enable_frequency_scan_ex2(
        &mut self,
        time: FreqScanTime,
        hz: u16,
    ) -> Result<(), BUS::Error> {
        if hz > 0x1FFF {
            warn!("scan window {} masked to 13 bits", hz);
        }
        self.bk.write_register(
            Register::Reg32,
            ((time as u16) << FREQ_SCAN_TIME_SHIFT) | ((hz & 0x1FFF) << 1) | 1,
        )
    }

    pub fn disable_frequency_scan(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg32, FREQ_SCAN_OFF)
    }

    pub fn stop_scan(&mut self) -> Result<(), BUS::Error> {
        self.disable_frequency_scan()?;
        self.idle()
    }

    /// Detected frequency, or `None` while the scan is still running.
    pub fn frequency_scan_result(&mut self) -> Result<Option<u32>, BUS::Error> {
        let high: regmap::Reg0D = self.bk.read_reg_n()?;
        if high.scan_busy() {
            return Ok(None);
        }
        let low = self.bk.read_register(Register::Reg0E)?;
        Ok(Some((u32::from(high.scan_hi()) << 16) | u32::from(low)))
    }
}
