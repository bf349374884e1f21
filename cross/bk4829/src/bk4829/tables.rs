//! Calibration tables. Values are load-bearing and must stay bit-exact.

/// One fixed-gain step: raw REG_13 value and approximate attenuation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Gain {
    pub reg_value: u16,
    pub attenuation_db: u8,
}

const fn g(reg_value: u16, attenuation_db: u8) -> Gain {
    Gain {
        reg_value,
        attenuation_db,
    }
}

/// Index 0 is automatic gain, 1..=31 are increasing fixed attenuation.
pub const AUTO_GAIN_INDEX: u8 = 0;

pub const GAIN_TABLE: [Gain; 32] = [
    g(0x3ff, 0), // auto
    g(0x3ff, 0),
    g(0x3f7, 3),
    g(0x3ef, 6),
    g(0x3e7, 8),
    g(0x3e6, 11),
    g(0x3e5, 14),
    g(0x3e4, 17),
    g(0x3d3, 20),
    g(0x3b3, 22),
    g(0x3c3, 25),
    g(0x3b2, 28),
    g(0x3c2, 31),
    g(0x3b1, 34),
    g(0x3f0, 36),
    g(0x3e8, 39),
    g(0x390, 42),
    g(0x3a0, 45),
    g(0x368, 48),
    g(0x360, 50),
    g(0x348, 53),
    g(0x2a0, 56),
    g(0x301, 59),
    g(0x20a, 62),
    g(0x248, 64),
    g(0x10a, 67),
    g(0x201, 70),
    g(0x109, 73),
    g(0x200, 76),
    g(0x1, 78),
    g(0x100, 81),
    g(0x0, 84),
];

/// AGC reference and thresholds written to REG_49.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AgcConfig {
    pub lo: u8,
    pub low: u8,
    pub high: u8,
}

impl AgcConfig {
    pub const DEFAULT: AgcConfig = AgcConfig {
        lo: 0,
        low: 56,
        high: 84,
    };

    /// Faster attack preset. Not applied by `set_agc`; kept until verified on hardware.
    pub const FAST: AgcConfig = AgcConfig {
        lo: 0,
        low: 20,
        high: 50,
    };

    #[inline]
    pub const fn reg49(&self) -> u16 {
        ((self.lo as u16) << 14) | ((self.high as u16) << 7) | self.low as u16
    }
}

/// REG_77 hysteresis byte for squelch type 0..=3.
pub const SQUELCH_TYPE_VALUES: [u8; 4] = [0x88, 0xAA, 0xCC, 0xFF];

/// DTMF detector coefficients, written to REG_09 as `(index << 12) | coeff`.
pub const DTMF_COEFFS: [u8; 16] = [
    111, 107, 103, 98, 80, 71, 58, 44, 65, 55, 37, 23, 228, 203, 181, 159,
];

/// DTMF symbol to (REG_71, REG_72) tone generator words.
pub const DTMF_TONES: [(char, u16, u16); 16] = [
    ('0', 0x25F3, 0x35E1),
    ('1', 0x1C1C, 0x30C2),
    ('2', 0x1C1C, 0x35E1),
    ('3', 0x1C1C, 0x3B91),
    ('4', 0x1F0E, 0x30C2),
    ('5', 0x1F0E, 0x35E1),
    ('6', 0x1F0E, 0x3B91),
    ('7', 0x225C, 0x30C2),
    ('8', 0x225C, 0x35E1),
    ('9', 0x225C, 0x3B91),
    ('A', 0x1C1C, 0x41DC),
    ('B', 0x1F0E, 0x41DC),
    ('C', 0x225C, 0x41DC),
    ('D', 0x25F3, 0x41DC),
    ('*', 0x25F3, 0x30C2),
    ('#', 0x25F3, 0x3B91),
];

pub fn dtmf_tones(symbol: char) -> Option<(u16, u16)> {
    DTMF_TONES
        .iter()
        .find(|(c, _, _)| *c == symbol)
        .map(|&(_, t1, t2)| (t1, t2))
}

// Filter bandwidth, indexed by `9 - bw`.
const BW_RF: [u8; 10] = [7, 5, 4, 3, 2, 1, 3, 1, 1, 0];
const BW_AF: [u8; 10] = [4, 5, 6, 7, 0, 0, 3, 0, 2, 1];
const BW_BS: [u8; 10] = [2, 2, 2, 2, 2, 2, 0, 0, 1, 1];

/// Packed REG_43 value for bandwidth ordinal 0..=9 (0 = narrowest).
pub fn filter_bandwidth_word(bw: u8) -> Option<u16> {
    if bw > 9 {
        return None;
    }
    let i = usize::from(9 - bw);
    let rf = BW_RF[i] as u16;
    Some((rf << 12) | (rf << 9) | ((BW_AF[i] as u16) << 6) | ((BW_BS[i] as u16) << 4) | (1 << 3))
}

// Attenuation contributed by each AGC stage, indexed by the raw stage field.
const LNA_SHORT_DB: [u8; 4] = [19, 16, 11, 0];
const LNA_DB: [u8; 8] = [24, 19, 14, 9, 6, 4, 2, 0];
const MIXER_DB: [u8; 4] = [8, 6, 3, 0];
const PGA_DB: [u8; 8] = [33, 27, 21, 15, 9, 6, 3, 0];

/// Total attenuation of one AGC gain-step register (REG_10..REG_14).
pub fn stage_attenuation_db(v: u16) -> u8 {
    LNA_SHORT_DB[usize::from((v >> 8) & 3)]
        + LNA_DB[usize::from((v >> 5) & 7)]
        + MIXER_DB[usize::from((v >> 3) & 3)]
        + PGA_DB[usize::from(v & 7)]
}
