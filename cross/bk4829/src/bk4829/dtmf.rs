//! DTMF, tone generator sequences and FSK housekeeping.

use embedded_hal::delay::DelayNs;

use crate::bitbang::Bk4829Bus;
use crate::regmap;

use super::driver::Bk4829Driver;
use super::modulation::AfType;
use super::regs::{
    Register, REG_24_ENABLE, REG_24_SELECT_DTMF, REG_24_SHIFT_MAX_SYMBOLS,
    REG_24_SHIFT_THRESHOLD, REG_24_SHIFT_UNKNOWN_15, REG_24_SHIFT_UNKNOWN_6,
    REG_30_ENABLE_AF_DAC, REG_30_ENABLE_DISC_MODE, REG_30_ENABLE_TX_DSP, REG_30_TX_ON,
    REG_70_ENABLE_TONE1, REG_70_ENABLE_TONE2, REG_70_SHIFT_TONE1_TUNING_GAIN,
    REG_70_SHIFT_TONE2_TUNING_GAIN,
};
use super::tables;

/// Hold and gap times for [`Bk4829Driver::play_dtmf_string`], in ms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DtmfTiming {
    /// Hold the first symbol for `first_persist_ms` instead of its usual time.
    pub delay_first: bool,
    pub first_persist_ms: u16,
    /// Hold time for `*` and `#`.
    pub hash_persist_ms: u16,
    pub code_persist_ms: u16,
    /// Muted gap after every symbol.
    pub code_interval_ms: u16,
}

impl Default for DtmfTiming {
    fn default() -> Self {
        Self {
            delay_first: false,
            first_persist_ms: 100,
            hash_persist_ms: 100,
            code_persist_ms: 100,
            code_interval_ms: 100,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RogerMode {
    Off,
    /// Two short beeps.
    Tiny,
}

/// (Hz, ms) pairs, `(0, 0)` terminated. Hz 0 is a silent gap.
pub const ROGER_TINY: [(u16, u16); 4] = [(1250, 20), (0, 10), (1500, 20), (0, 0)];

const DTMF_DETECT_THRESHOLD: u16 = 24;
const DTMF_MAX_SYMBOLS: u16 = 14;
const DTMF_TONE_GAIN: u16 = 83;

const DTMF_TONE_GAINS: u16 = REG_70_ENABLE_TONE1
    | (DTMF_TONE_GAIN << REG_70_SHIFT_TONE1_TUNING_GAIN)
    | REG_70_ENABLE_TONE2
    | (DTMF_TONE_GAIN << REG_70_SHIFT_TONE2_TUNING_GAIN);

const TX_TONE_GAIN: u16 = 56;

const FSK_CLEAR_FIFO: u16 = (1 << 15) | (1 << 14);
const FSK_RX_ENABLE: u16 = 1 << 12;
const FSK_TX_ENABLE: u16 = 1 << 11;

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    /// Hz to tone generator word.
    #[inline]
    pub fn scale_freq(freq_hz: u16) -> u16 {
        ((u64::from(freq_hz) * 1_353_245 + (1 << 16)) >> 17) as u16
    }

    pub fn set_tone_frequency(&mut self, freq_hz: u16) -> Result<(), BUS::Error> {
        self.bk
            .write_register(Register::Reg71, Self::scale_freq(freq_hz))
    }

    pub fn set_tone2_frequency(&mut self, freq_hz: u16) -> Result<(), BUS::Error> {
        self.bk
            .write_register(Register::Reg72, Self::scale_freq(freq_hz))
    }

    // --- DTMF ---------------------------------------------------------------

    pub fn enable_dtmf(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg21, 0x06D8)?;
        self.bk.write_register(
            Register::Reg24,
            (1u16 << REG_24_SHIFT_UNKNOWN_15)
                | (DTMF_DETECT_THRESHOLD << REG_24_SHIFT_THRESHOLD)
                | (1u16 << REG_24_SHIFT_UNKNOWN_6)
                | REG_24_ENABLE
                | REG_24_SELECT_DTMF
                | (DTMF_MAX_SYMBOLS << REG_24_SHIFT_MAX_SYMBOLS),
        )
    }

    pub fn disable_dtmf(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg24, 0)
    }

    /// Load the tone pair for `symbol`. Unknown symbols touch nothing.
    pub fn play_dtmf(&mut self, symbol: char) -> Result<(), BUS::Error> {
        let Some((tone1, tone2)) = tables::dtmf_tones(symbol) else {
            warn!("no DTMF tones for {:?}", symbol);
            return Ok(());
        };
        self.bk.write_register(Register::Reg71, tone1)?;
        self.bk.write_register(Register::Reg72, tone2)
    }

    /// Send `code` symbol by symbol, unmuting for the hold time of each.
    pub fn play_dtmf_string(
        &mut self,
        code: &str,
        timing: &DtmfTiming,
        delay: &mut impl DelayNs,
    ) -> Result<(), BUS::Error> {
        for (i, symbol) in code.chars().enumerate() {
            self.play_dtmf(symbol)?;
            self.exit_tx_mute()?;

            let hold = if timing.delay_first && i == 0 {
                timing.first_persist_ms
            } else if matches!(symbol, '*' | '#') {
                timing.hash_persist_ms
            } else {
                timing.code_persist_ms
            };
            delay.delay_ms(u32::from(hold));

            self.enter_tx_mute()?;
            delay.delay_ms(u32::from(timing.code_interval_ms));
        }
        Ok(())
    }

    /// Key up and send a single symbol.
    pub fn play_dtmf_ex(
        &mut self,
        local_loopback: bool,
        symbol: char,
        delay: &mut impl DelayNs,
    ) -> Result<(), BUS::Error> {
        self.enable_dtmf()?;
        self.enter_tx_mute()?;
        self.set_af(if local_loopback { AfType::Beep } else { AfType::Mute })?;
        self.bk.write_register(Register::Reg70, DTMF_TONE_GAINS)?;
        self.enable_tx_link()?;
        delay.delay_ms(50);
        self.play_dtmf(symbol)?;
        self.exit_tx_mute()
    }

    /// Key up for DTMF. TX stays muted until the first symbol.
    pub fn enter_dtmf_tx(&mut self, local_loopback: bool) -> Result<(), BUS::Error> {
        self.enable_dtmf()?;
        self.enter_tx_mute()?;
        self.set_af(if local_loopback { AfType::Beep } else { AfType::Mute })?;
        self.bk.write_register(Register::Reg70, DTMF_TONE_GAINS)?;
        self.enable_tx_link()
    }

    /// Tones off, back to plain TX. With `keep_muted` TX mute stays on.
    pub fn exit_dtmf_tx(&mut self, keep_muted: bool) -> Result<(), BUS::Error> {
        self.enter_tx_mute()?;
        self.set_af(AfType::Mute)?;
        self.bk.write_register(Register::Reg70, 0)?;
        self.disable_dtmf()?;
        self.bk.write_register(Register::MODE_CONTROL, REG_30_TX_ON)?;
        if !keep_muted {
            self.exit_tx_mute()?;
        }
        Ok(())
    }

    /// Last DTMF / 5-tone code received.
    pub fn dtmf_5tone_code(&mut self) -> Result<u8, BUS::Error> {
        let r: regmap::Reg0B = self.bk.read_reg_n()?;
        Ok(r.dtmf_5tone_code())
    }

    // --- Tones --------------------------------------------------------------

    /// Local beep through the speaker path, TX DSP only.
    pub fn play_tone(&mut self, freq_hz: u16, tuning_gain_switch: bool) -> Result<(), BUS::Error> {
        self.enter_tx_mute()?;
        self.set_af(AfType::Beep)?;

        let gain: u16 = if tuning_gain_switch { 28 } else { 96 };
        self.bk.write_register(
            Register::Reg70,
            REG_70_ENABLE_TONE1 | (gain << REG_70_SHIFT_TONE1_TUNING_GAIN),
        )?;

        self.idle()?;
        self.bk.write_register(
            Register::MODE_CONTROL,
            REG_30_ENABLE_AF_DAC | REG_30_ENABLE_DISC_MODE | REG_30_ENABLE_TX_DSP,
        )?;
        self.set_tone_frequency(freq_hz)
    }

    /// Key up and send a tone over the air.
    pub fn transmit_tone(&mut self, freq_hz: u16) -> Result<(), BUS::Error> {
        self.enter_tx_mute()?;
        self.bk.write_register(
            Register::Reg70,
            REG_70_ENABLE_TONE1 | (TX_TONE_GAIN << REG_70_SHIFT_TONE1_TUNING_GAIN),
        )?;
        self.set_tone_frequency(freq_hz)?;
        self.set_af(AfType::Mute)?;
        self.enable_tx_link()?;
        self.exit_tx_mute()
    }

    /// Play (Hz, ms) pairs up to a `(0, 0)` entry or the end of the slice.
    ///
    /// The first entry keys up through [`Self::transmit_tone`], the rest only
    /// retune. A tone with zero duration is left running and ends the sequence
    /// without re-muting.
    pub fn play_sequence(
        &mut self,
        sequence: &[(u16, u16)],
        delay: &mut impl DelayNs,
    ) -> Result<(), BUS::Error> {
        for (i, &(note, duration)) in sequence.iter().enumerate() {
            if note == 0 && duration == 0 {
                break;
            }

            if i == 0 {
                self.transmit_tone(note)?;
            } else {
                self.set_tone_frequency(note)?;
                self.exit_tx_mute()?;
            }

            if note != 0 && duration == 0 {
                return Ok(());
            }

            delay.delay_ms(u32::from(duration));
        }
        self.enter_tx_mute()
    }

    pub fn play_roger(&mut self, mode: RogerMode, delay: &mut impl DelayNs) -> Result<(), BUS::Error> {
        match mode {
            RogerMode::Off => Ok(()),
            RogerMode::Tiny => self.play_sequence(&ROGER_TINY, delay),
        }
    }

    // --- FSK ----------------------------------------------------------------

    pub fn reset_fsk(&mut self, delay: &mut impl DelayNs) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg3F, 0)?;
        self.bk.write_register(Register::Reg59, 0x0068)?;
        delay.delay_ms(30);
        self.idle()
    }

    pub fn fsk_clear_fifo(&mut self) -> Result<(), BUS::Error> {
        self.bk
            .update_register(Register::Reg59, |v| v | FSK_CLEAR_FIFO)
    }

    pub fn fsk_enable_rx(&mut self) -> Result<(), BUS::Error> {
        self.bk
            .update_register(Register::Reg59, |v| v | FSK_RX_ENABLE)
    }

    pub fn fsk_enable_tx(&mut self) -> Result<(), BUS::Error> {
        self.bk
            .update_register(Register::Reg59, |v| v | FSK_TX_ENABLE)
    }
}
