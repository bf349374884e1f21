//! TX/RX sequencing and power states.
//!
//! Each transition is a fixed recipe of register writes. The order inside a
//! recipe matters to the chip and is kept as is.

use crate::bitbang::Bk4829Bus;
use crate::regmap;

use super::driver::{Bk4829Driver, TxRxState};
use super::modulation::{AfType, ModulationType};
use super::regs::{
    Register, REG_30_ENABLE_AF_DAC, REG_30_ENABLE_DISC_MODE, REG_30_ENABLE_TX_DSP, REG_30_RX_ON,
    REG_30_TX_LINK, REG_30_TX_ON,
};

/// Frequency (Hz) at which the PA switches to its high-band gain.
pub const PA_GAIN_BOUND: u32 = 280_000_000;

const TX_MUTE_ON: u16 = 0xBB20;
const TX_MUTE_OFF: u16 = 0x3B20;

const BIAS_RX: u16 = 0x9D1F;
const BIAS_SLEEP: u16 = 0x1D00;

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    pub fn enter_tx_mute(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg50, TX_MUTE_ON)
    }

    pub fn exit_tx_mute(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg50, TX_MUTE_OFF)
    }

    /// Everything off in REG_30.
    pub fn idle(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::MODE_CONTROL, 0)?;
        self.phase = TxRxState::Idle;
        Ok(())
    }

    pub fn sleep(&mut self) -> Result<(), BUS::Error> {
        self.idle()?;
        self.bk.write_register(Register::Reg37, BIAS_SLEEP)
    }

    /// PA off, RX bias, then RX DSP and link on.
    pub fn rx_turn_on(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg36, 0)?;
        self.bk.write_register(Register::Reg37, BIAS_RX)?;
        self.bk.write_register(Register::MODE_CONTROL, REG_30_ENABLE_AF_DAC)?;
        self.bk.write_register(Register::MODE_CONTROL, REG_30_RX_ON)?;
        self.phase = TxRxState::Receiving;
        Ok(())
    }

    /// TX DSP, link and PA gain on, RX off.
    pub fn enable_tx_link(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::MODE_CONTROL, REG_30_TX_LINK)?;
        self.phase = TxRxState::Transmitting;
        Ok(())
    }

    /// PA on with the beep path.
    pub fn tx_on_beep(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg37, BIAS_RX)?;
        self.bk.write_register(Register::Reg52, 0x028F)?;
        self.idle()?;
        self.bk.write_register(Register::MODE_CONTROL, REG_30_TX_ON)?;
        self.phase = TxRxState::Transmitting;
        Ok(())
    }

    /// Leave bypass, release TX mute, then key up.
    pub fn prepare_transmit(&mut self) -> Result<(), BUS::Error> {
        debug!("prepare transmit");
        self.exit_bypass()?;
        self.exit_tx_mute()?;
        self.tx_on_beep()
    }

    pub fn turns_off_tones_turns_on_rx(&mut self) -> Result<(), BUS::Error> {
        self.bk.write_register(Register::Reg70, 0)?;
        self.set_af(AfType::Mute)?;
        self.exit_tx_mute()?;
        self.idle()?;
        self.bk.write_register(Register::MODE_CONTROL, REG_30_RX_ON)?;
        self.phase = TxRxState::Receiving;
        Ok(())
    }

    pub fn enable_af_dac_disc_mode_tx_dsp(&mut self) -> Result<(), BUS::Error> {
        self.idle()?;
        self.bk.write_register(
            Register::MODE_CONTROL,
            REG_30_ENABLE_AF_DAC | REG_30_ENABLE_DISC_MODE | REG_30_ENABLE_TX_DSP,
        )
    }

    pub fn setup_power_amplifier(&mut self, bias: u8, freq_hz: u32) -> Result<(), BUS::Error> {
        let (gain1, gain2) = if freq_hz < PA_GAIN_BOUND { (1, 0) } else { (4, 2) };
        self.bk.write_reg_n(
            regmap::Reg36::new()
                .with_pa_bias(bias)
                .with_pa_enable(true)
                .with_pa_gain1(gain1)
                .with_pa_gain2(gain2),
        )
    }

    /// Phase as last commanded. Bypass wins over the REG_30 phase.
    pub fn tx_rx_state(&self) -> TxRxState {
        if self.soft.last_modulation == Some(ModulationType::Bypass) {
            TxRxState::Bypass
        } else {
            self.phase
        }
    }

    pub fn set_state(&mut self, state: TxRxState) -> Result<(), BUS::Error> {
        debug!("state {:?} -> {:?}", self.tx_rx_state(), state);
        match state {
            TxRxState::Idle => self.idle(),
            TxRxState::Receiving => self.rx_turn_on(),
            TxRxState::Transmitting => self.prepare_transmit(),
            TxRxState::Bypass => self.set_modulation(ModulationType::Bypass),
        }
    }
}
