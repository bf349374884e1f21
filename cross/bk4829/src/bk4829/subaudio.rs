//! CTCSS / CDCSS encode, decode and tail elimination.

use core::num::NonZeroU32;

use crate::bitbang::Bk4829Bus;
use crate::regmap;

use super::driver::Bk4829Driver;
use super::regs::{
    Register, REG_07_MODE_CTC1, REG_07_MODE_CTC2, REG_51_1050HZ_DETECTION,
    REG_51_1050HZ_NO_DETECTION, REG_51_AUTO_CDCSS_BW_ENABLE, REG_51_AUTO_CTCSS_BW_ENABLE,
    REG_51_CDCSS_23_BIT, REG_51_ENABLE_CXCSS, REG_51_GPIO6_PIN2_NORMAL, REG_51_MODE_CDCSS,
    REG_51_MODE_CTCSS, REG_51_SHIFT_CXCSS_TX_GAIN1, REG_51_TX_CDCSS_NEGATIVE,
    REG_51_TX_CDCSS_POSITIVE,
};

/// Transmit sub-audio selection.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ToneCode {
    None,
    /// Tone frequency in 0.1 Hz.
    Ctcss(u32),
    /// 23-bit Golay code word.
    Cdcss { code: u32, negative: bool },
}

/// Outcome of a receive-side CxCSS search.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CssScanResult {
    NotFound,
    /// Detected tone in 0.1 Hz.
    Ctcss(u16),
    Cdcss(u32),
}

/// CTCSS control word that needs 1050 Hz detection (262.5 Hz / 4).
const CTCSS_1050HZ_WORD: u32 = 2625;

const CXCSS_TX_GAIN_CDCSS: u16 = 51;
const CXCSS_TX_GAIN_CTCSS: u16 = 74;

/// Tone generator setting used while sending a CDCSS word.
const CDCSS_TONE_WORD: u16 = 2775;

/// Tone generator frequency word, REG_07[12:0].
const TONE_WORD_MASK: u32 = 0x1FFF;

fn tone_word(word: u64) -> u16 {
    if word > u64::from(TONE_WORD_MASK) {
        warn!("tone word {} masked to 13 bits", word);
    }
    (word & u64::from(TONE_WORD_MASK)) as u16
}

/// Scan result still in progress / nothing latched.
const SCAN_PENDING: u16 = 0x8000;

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    pub fn set_tx_tone(&mut self, tone: ToneCode) -> Result<(), BUS::Error> {
        debug!("tx tone {:?}", tone);
        match tone {
            ToneCode::None => self.exit_sub_au(),
            ToneCode::Ctcss(tenths) => self.set_ctcss_frequency(tenths),
            ToneCode::Cdcss { code, negative } => self.write_cdcss(code, negative),
        }
    }

    /// Program a CDCSS code word with positive polarity.
    pub fn set_cdcss_code_word(&mut self, code: u32) -> Result<(), BUS::Error> {
        self.write_cdcss(code, false)
    }

    fn write_cdcss(&mut self, code: u32, negative: bool) -> Result<(), BUS::Error> {
        let polarity = if negative {
            REG_51_TX_CDCSS_NEGATIVE
        } else {
            REG_51_TX_CDCSS_POSITIVE
        };
        self.bk.write_register(
            Register::Reg51,
            REG_51_ENABLE_CXCSS
                | REG_51_GPIO6_PIN2_NORMAL
                | polarity
                | REG_51_MODE_CDCSS
                | REG_51_CDCSS_23_BIT
                | REG_51_1050HZ_NO_DETECTION
                | REG_51_AUTO_CDCSS_BW_ENABLE
                | REG_51_AUTO_CTCSS_BW_ENABLE
                | (CXCSS_TX_GAIN_CDCSS << REG_51_SHIFT_CXCSS_TX_GAIN1),
        )?;
        self.bk
            .write_register(Register::Reg07, REG_07_MODE_CTC1 | CDCSS_TONE_WORD)?;

        // low half first, high half carries the latch bit
        self.bk
            .write_register(Register::Reg08, (code & 0x0FFF) as u16)?;
        self.bk
            .write_register(Register::Reg08, 0x8000 | ((code >> 12) & 0x0FFF) as u16)
    }

    /// `tenths` is the tone frequency in 0.1 Hz.
    pub fn set_ctcss_frequency(&mut self, tenths: u32) -> Result<(), BUS::Error> {
        let detection = if tenths == CTCSS_1050HZ_WORD {
            REG_51_1050HZ_DETECTION
        } else {
            REG_51_1050HZ_NO_DETECTION
        };
        self.bk.write_register(
            Register::Reg51,
            REG_51_ENABLE_CXCSS
                | REG_51_MODE_CTCSS
                | detection
                | (CXCSS_TX_GAIN_CTCSS << REG_51_SHIFT_CXCSS_TX_GAIN1),
        )?;
        let word = tone_word(u64::from(tenths) * 2065 / 1000);
        self.bk
            .write_register(Register::Reg07, REG_07_MODE_CTC1 | word)
    }

    /// Receive-side tail tone detector. `tenths` is in 0.1 Hz.
    pub fn set_tail_detection(&mut self, tenths: NonZeroU32) -> Result<(), BUS::Error> {
        let f = tenths.get();
        let word = tone_word(u64::from((253_910 + f / 2) / f));
        self.bk
            .write_register(Register::Reg07, REG_07_MODE_CTC2 | word)
    }

    pub fn exit_sub_au(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg51, 0)
    }

    /// Tail elimination: 0 is the 134.4 Hz tail, 1..=3 phase shifts of
    /// 120/180/240 degrees, 4 the 55 Hz tone. Anything else does nothing.
    pub fn gen_tail(&mut self, kind: u8) -> Result<(), BUS::Error> {
        match kind {
            0 => self.bk.write_register(Register::Reg52, 0x828F),
            1 => self.bk.write_register(Register::Reg52, 0xA28F),
            2 => self.bk.write_register(Register::Reg52, 0xC28F),
            3 => self.bk.write_register(Register::Reg52, 0xE28F),
            4 => self.bk.write_register(Register::Reg07, 0x046F),
            _ => {
                warn!("tail {} unknown", kind);
                Ok(())
            }
        }
    }

    pub fn enable_cdcss(&mut self) -> Result<(), BUS::Error> {
        self.gen_tail(0)?;
        self.bk.write_register(Register::Reg51, 0x804A)
    }

    pub fn enable_ctcss(&mut self) -> Result<(), BUS::Error> {
        self.gen_tail(4)?;
        self.bk.write_register(Register::Reg51, 0x904A)
    }

    /// CDCSS is checked first; its result register pair wins over CTCSS.
    pub fn css_scan_result(&mut self) -> Result<CssScanResult, BUS::Error> {
        let high = self.bk.read_register(Register::Reg69)?;
        if high & SCAN_PENDING == 0 {
            let low = self.bk.read_register(Register::Reg6A)?;
            let code = (u32::from(high & 0x0FFF) << 12) | u32::from(low & 0x0FFF);
            return Ok(CssScanResult::Cdcss(code));
        }

        let low = self.bk.read_register(Register::Reg68)?;
        if low & SCAN_PENDING == 0 {
            let tenths = u32::from(low & 0x1FFF) * 4843 / 10000;
            return Ok(CssScanResult::Ctcss(tenths as u16));
        }

        Ok(CssScanResult::NotFound)
    }

    pub fn cdcss_code_type(&mut self) -> Result<u8, BUS::Error> {
        let r: regmap::Reg0C = self.bk.read_reg_n()?;
        Ok(r.cdcss_code_type())
    }

    pub fn ctc_type(&mut self) -> Result<u8, BUS::Error> {
        let r: regmap::Reg0C = self.bk.read_reg_n()?;
        Ok(r.ctc_type())
    }
}
