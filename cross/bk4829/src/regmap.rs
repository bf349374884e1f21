use bitfield_struct::bitfield;

use bk4829_reg_macros::address;

// Field layouts follow the BK4819V3 register description where the BK4829
// is compatible. Some fields are undocumented but are written by working
// firmware, so they are kept as raw values.

/// Implemented by each BK4829 register struct to provide the register address.
///
/// `#[address(0x..)]` auto-implements this for the annotated struct.
pub trait RegisterAddress {
    const ADDRESS: u8;

    #[inline]
    fn get_address() -> u8
    where
        Self: Sized,
    {
        Self::ADDRESS
    }
}

/// Marker trait for BK4829 register value types.
///
/// For bitfield structs this is satisfied by the generated `From<u16>` / `Into<u16>`.
pub trait Bk4829Register:
    RegisterAddress + Copy + From<u16> + Into<u16> + core::fmt::Debug + Default
{
    #[inline]
    fn serialize(self) -> u16 {
        self.into()
    }

    #[inline]
    fn deserialize(data: u16) -> Self {
        Self::from(data)
    }
}

impl<T> Bk4829Register for T where
    T: RegisterAddress + Copy + From<u16> + Into<u16> + core::fmt::Debug + Default
{
}

/// REG_00: soft reset.
#[address(0x00)]
#[bitfield(u16)]
pub struct Reg00 {
    #[bits(15)]
    pub undocumented: u16,
    /// 1=Reset; 0=Normal.
    pub soft_reset: bool,
}

/// REG_09: DTMF/SelCall symbol coefficient for detection.
#[address(0x09)]
#[bitfield(u16)]
pub struct Reg09 {
    #[bits(8)]
    pub coefficient: u8,
    #[bits(4)]
    pub undocumented: u8,
    #[bits(4)]
    pub symbol_number: u8,
}

/// REG_0B: DTMF/5Tone received code (read-only).
#[address(0x0B)]
#[bitfield(u16)]
pub struct Reg0B {
    #[bits(8)]
    pub undocumented_0: u8,
    /// DTMF/5Tone code received.
    #[bits(4)]
    pub dtmf_5tone_code: u8,
    #[bits(4)]
    pub undocumented_1: u8,
}

/// REG_0C: CTCSS/CDCSS/VoX/squelch/IRQ indicators (read-only).
#[address(0x0C)]
#[bitfield(u16)]
pub struct Reg0C {
    /// Interrupt request pending. Stays set while the crystal settles.
    pub irq: bool,
    /// Squelch result output. 1=Link; 0=Loss.
    pub squelch: bool,
    pub vox: bool,
    #[bits(7)]
    pub undocumented: u8,
    /// CTC1/CTC2 received.
    #[bits(2)]
    pub ctc_type: u8,
    /// CTCSS phase shift received.
    #[bits(2)]
    pub ctcss_phase_shift: u8,
    /// CDCSS positive/negative code received.
    #[bits(2)]
    pub cdcss_code_type: u8,
}

/// REG_0D: frequency scan indicator + high bits (read-only).
#[address(0x0D)]
#[bitfield(u16)]
pub struct Reg0D {
    #[bits(11)]
    pub scan_hi: u16,
    #[bits(4)]
    pub undocumented: u8,
    /// 1=Busy; 0=Finished.
    pub scan_busy: bool,
}

/// REG_36: power amplifier bias and gain.
#[address(0x36)]
#[bitfield(u16)]
pub struct Reg36 {
    #[bits(3)]
    pub pa_gain2: u8,
    #[bits(3)]
    pub pa_gain1: u8,
    pub undocumented: bool,
    pub pa_enable: bool,
    /// PA output bias, 0..=255.
    #[bits(8)]
    pub pa_bias: u8,
}

/// REG_43: RF/AF filter bandwidth.
#[address(0x43)]
#[bitfield(u16)]
pub struct Reg43 {
    #[bits(2)]
    pub undocumented_0: u8,
    pub gain_after_fm: bool,
    /// Always set by working firmware.
    pub undocumented_3: bool,
    #[bits(2)]
    pub bw_mode: u8,
    #[bits(3)]
    pub af_bw: u8,
    /// RF filter bandwidth when the signal is weak.
    #[bits(3)]
    pub rf_bw_weak: u8,
    #[bits(3)]
    pub rf_bw: u8,
    pub undocumented_15: bool,
}

/// REG_47: AF output selection.
#[address(0x47)]
#[bitfield(u16)]
pub struct Reg47 {
    pub aftx_filter_bypass_all: bool,
    #[bits(7)]
    pub undocumented_0: u8,
    #[bits(4)]
    pub af_output_selection: u8,
    pub undocumented_1: bool,
    pub af_out_invert: bool,
    #[bits(2)]
    pub undocumented_2: u8,
}

/// REG_48: AF RX gain.
#[address(0x48)]
#[bitfield(u16)]
pub struct Reg48 {
    /// AF DAC gain (after gain-1 and gain-2), about 2dB/step.
    #[bits(4)]
    pub af_dac_gain: u8,
    /// AF RX gain-2: -26dB..5.5dB, 0.5dB/step.
    #[bits(6)]
    pub afrx_gain2: u8,
    /// AF RX gain-1: 0, -6, -12, -18dB.
    #[bits(2)]
    pub afrx_gain1: u8,
    #[bits(4)]
    pub undocumented: u8,
}

/// REG_4E: squelch delays and glitch open threshold.
#[address(0x4E)]
#[bitfield(u16)]
pub struct Reg4E {
    #[bits(8)]
    pub glitch_open: u8,
    pub undocumented_0: bool,
    #[bits(2)]
    pub close_delay: u8,
    #[bits(3)]
    pub open_delay: u8,
    /// Always set by working firmware.
    pub undocumented_14: bool,
    pub undocumented_15: bool,
}

/// REG_7E: AGC fix mode/index, signal power and DC filter bandwidths.
#[address(0x7E)]
#[bitfield(u16)]
pub struct Reg7E {
    #[bits(3)]
    pub dc_filter_bw_rx: u8,
    #[bits(3)]
    pub dc_filter_bw_tx: u8,
    /// Detected signal power (read-only).
    #[bits(6)]
    pub signal_power: u8,
    /// AGC fix index, two's complement 3-bit.
    #[bits(3)]
    pub agc_fix_index: u8,
    /// 1=fix (AGC off); 0=auto.
    pub agc_fix_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_come_from_attribute() {
        assert_eq!(Reg00::ADDRESS, 0x00);
        assert_eq!(<Reg4E as RegisterAddress>::get_address(), 0x4E);
        assert_eq!(Reg7E::get_address(), 0x7E);
    }

    #[test]
    fn audio_gain_layout_matches_raw_value() {
        let r = Reg48::new()
            .with_af_dac_gain(8)
            .with_afrx_gain2(58)
            .with_afrx_gain1(0)
            .with_undocumented(11);
        assert_eq!(r.serialize(), 0xB3A8);
    }

    #[test]
    fn squelch_delay_layout() {
        let r = Reg4E::new()
            .with_undocumented_14(true)
            .with_open_delay(7)
            .with_close_delay(3)
            .with_glitch_open(39);
        assert_eq!(u16::from(r), (1 << 14) | (7 << 11) | (3 << 9) | 39);
    }

    #[test]
    fn status_fields_decode() {
        let s = Reg0C::deserialize(0b11_01_10_0000000_0_1_0);
        assert!(s.squelch());
        assert!(!s.irq());
        assert_eq!(s.ctc_type(), 0b10);
        assert_eq!(s.ctcss_phase_shift(), 0b01);
        assert_eq!(s.cdcss_code_type(), 0b11);
    }

    #[test]
    fn pa_layout() {
        let r = Reg36::new()
            .with_pa_bias(0x5A)
            .with_pa_enable(true)
            .with_pa_gain1(0b100)
            .with_pa_gain2(0b010);
        assert_eq!(u16::from(r), 0x5AA2);
    }
}
