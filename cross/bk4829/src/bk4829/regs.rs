//! BK4829 register map and bitfield helpers.

/// BK4829 register address.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Reg00 = 0x00,
    Reg02 = 0x02,
    Reg07 = 0x07,
    Reg08 = 0x08,
    Reg09 = 0x09,
    Reg0B = 0x0B,
    Reg0C = 0x0C,
    Reg0D = 0x0D,
    Reg0E = 0x0E,
    Reg10 = 0x10,
    Reg11 = 0x11,
    Reg12 = 0x12,
    Reg13 = 0x13,
    Reg14 = 0x14,
    Reg19 = 0x19,
    Reg1E = 0x1E,
    Reg1F = 0x1F,
    Reg21 = 0x21,
    Reg24 = 0x24,
    Reg2A = 0x2A,
    Reg2B = 0x2B,
    Reg2F = 0x2F,
    Reg30 = 0x30,
    Reg31 = 0x31,
    Reg32 = 0x32,
    Reg33 = 0x33,
    Reg36 = 0x36,
    Reg37 = 0x37,
    Reg38 = 0x38,
    Reg39 = 0x39,
    Reg3C = 0x3C,
    Reg3D = 0x3D,
    Reg3E = 0x3E,
    Reg3F = 0x3F,
    Reg40 = 0x40,
    Reg42 = 0x42,
    Reg43 = 0x43,
    Reg46 = 0x46,
    Reg47 = 0x47,
    Reg48 = 0x48,
    Reg49 = 0x49,
    Reg4D = 0x4D,
    Reg4E = 0x4E,
    Reg4F = 0x4F,
    Reg50 = 0x50,
    Reg51 = 0x51,
    Reg52 = 0x52,
    Reg59 = 0x59,
    Reg61 = 0x61,
    Reg62 = 0x62,
    Reg63 = 0x63,
    Reg64 = 0x64,
    Reg65 = 0x65,
    Reg67 = 0x67,
    Reg68 = 0x68,
    Reg69 = 0x69,
    Reg6A = 0x6A,
    Reg6D = 0x6D,
    Reg6F = 0x6F,
    Reg70 = 0x70,
    Reg71 = 0x71,
    Reg72 = 0x72,
    Reg73 = 0x73,
    Reg74 = 0x74,
    Reg77 = 0x77,
    Reg78 = 0x78,
    Reg79 = 0x79,
    Reg7A = 0x7A,
    Reg7B = 0x7B,
    Reg7D = 0x7D,
    Reg7E = 0x7E,
}

impl Register {
    /// Operating phase register (RX/TX link, DSP, PLL, PA gain enables).
    pub const MODE_CONTROL: Register = Register::Reg30;

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A named bitfield inside a BK4829 register.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegisterSpec {
    pub name: &'static str,
    pub num: Register,
    pub offset: u8,
    pub width: u8,
}

impl RegisterSpec {
    /// Panics at compile time when used in a `const` and the field does not fit 16 bits.
    pub const fn new(name: &'static str, num: Register, offset: u8, width: u8) -> Self {
        assert!(width >= 1, "bitfield must be at least one bit wide");
        assert!(
            offset as u16 + width as u16 <= 16,
            "bitfield exceeds 16-bit register"
        );
        Self {
            name,
            num,
            offset,
            width,
        }
    }

    /// Unshifted mask covering `width` bits.
    #[inline]
    pub const fn mask(&self) -> u16 {
        if self.width >= 16 {
            0xFFFF
        } else {
            (1u16 << self.width) - 1
        }
    }

    /// Extract this field from a full register value.
    #[inline]
    pub const fn extract(&self, reg: u16) -> u16 {
        (reg >> self.offset) & self.mask()
    }

    /// Replace this field in `reg`. Bits of `value` beyond `width` are dropped.
    #[inline]
    pub const fn insert(&self, reg: u16, value: u16) -> u16 {
        (reg & !(self.mask() << self.offset)) | ((value & self.mask()) << self.offset)
    }
}

pub const AFC_DISABLE: RegisterSpec = RegisterSpec::new("AFC Disable", Register::Reg73, 4, 1);
pub const AF_OUT_SELECT: RegisterSpec =
    RegisterSpec::new("AF Output Select", Register::Reg47, 8, 4);
pub const RF_FILT_BW: RegisterSpec = RegisterSpec::new("RF Filter BW", Register::Reg43, 12, 3);
pub const RF_FILT_BW_WEAK: RegisterSpec =
    RegisterSpec::new("RF Filter BW Weak", Register::Reg43, 9, 3);
pub const BW_MODE: RegisterSpec = RegisterSpec::new("BW Mode", Register::Reg43, 4, 2);
pub const IF_FREQ: RegisterSpec = RegisterSpec::new("IF Frequency", Register::Reg3D, 0, 16);
pub const SQUELCH_TYPE: RegisterSpec = RegisterSpec::new("Squelch Type", Register::Reg77, 8, 8);
pub const XTAL_MODE: RegisterSpec = RegisterSpec::new("Xtal Mode", Register::Reg3C, 6, 2);

/// GPIO output pins of REG_33. Bit is `0x40 >> pin`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPin {
    Gpio0Pin28RxEnable = 0,
    Gpio1Pin29PaEnable = 1,
    Gpio3Pin31UhfLna = 3,
    Gpio4Pin32VhfLna = 4,
    Gpio5Pin1Red = 5,
    Gpio6Pin2Green = 6,
}

impl GpioPin {
    #[inline]
    pub const fn bit(self) -> u16 {
        0x40u16 >> (self as u8)
    }
}

// --- REG_07 ---

pub const REG_07_SHIFT_FREQUENCY_MODE: u16 = 13;

pub const REG_07_MODE_CTC1: u16 = 0u16 << REG_07_SHIFT_FREQUENCY_MODE;
pub const REG_07_MODE_CTC2: u16 = 1u16 << REG_07_SHIFT_FREQUENCY_MODE;

// --- REG_24 ---

pub const REG_24_SHIFT_UNKNOWN_15: u16 = 15;
pub const REG_24_SHIFT_THRESHOLD: u16 = 7;
pub const REG_24_SHIFT_UNKNOWN_6: u16 = 6;
pub const REG_24_SHIFT_MAX_SYMBOLS: u16 = 0;

pub const REG_24_ENABLE: u16 = 1u16 << 5;
pub const REG_24_SELECT_DTMF: u16 = 1u16 << 4;

// --- REG_30 ---

pub const REG_30_ENABLE_VCO_CALIB: u16 = 1u16 << 15;
pub const REG_30_ENABLE_UNKNOWN: u16 = 1u16 << 14;
pub const REG_30_ENABLE_RX_LINK: u16 = 0xFu16 << 10;
pub const REG_30_ENABLE_AF_DAC: u16 = 1u16 << 9;
pub const REG_30_ENABLE_DISC_MODE: u16 = 1u16 << 8;
pub const REG_30_ENABLE_PLL_VCO: u16 = 0xFu16 << 4;
pub const REG_30_ENABLE_PA_GAIN: u16 = 1u16 << 3;
pub const REG_30_ENABLE_MIC_ADC: u16 = 1u16 << 2;
pub const REG_30_ENABLE_TX_DSP: u16 = 1u16 << 1;
pub const REG_30_ENABLE_RX_DSP: u16 = 1u16 << 0;

/// Receive: VCO calibration, RX link, AF DAC, DISC, PLL/VCO, RX DSP.
pub const REG_30_RX_ON: u16 = REG_30_ENABLE_VCO_CALIB
    | REG_30_ENABLE_RX_LINK
    | REG_30_ENABLE_AF_DAC
    | REG_30_ENABLE_DISC_MODE
    | REG_30_ENABLE_PLL_VCO
    | REG_30_ENABLE_RX_DSP;

/// Transmit link: RX link and RX DSP off, PA gain and TX DSP on.
pub const REG_30_TX_LINK: u16 = REG_30_ENABLE_VCO_CALIB
    | REG_30_ENABLE_UNKNOWN
    | REG_30_ENABLE_AF_DAC
    | REG_30_ENABLE_DISC_MODE
    | REG_30_ENABLE_PLL_VCO
    | REG_30_ENABLE_PA_GAIN
    | REG_30_ENABLE_TX_DSP;

/// Transmit with the microphone ADC enabled, AF DAC off.
pub const REG_30_TX_ON: u16 = REG_30_ENABLE_VCO_CALIB
    | REG_30_ENABLE_UNKNOWN
    | REG_30_ENABLE_DISC_MODE
    | REG_30_ENABLE_PLL_VCO
    | REG_30_ENABLE_PA_GAIN
    | REG_30_ENABLE_MIC_ADC
    | REG_30_ENABLE_TX_DSP;

// --- REG_51 ---

pub const REG_51_ENABLE_CXCSS: u16 = 1u16 << 15;
pub const REG_51_GPIO6_PIN2_NORMAL: u16 = 0;
pub const REG_51_TX_CDCSS_NEGATIVE: u16 = 1u16 << 13;
pub const REG_51_TX_CDCSS_POSITIVE: u16 = 0;
pub const REG_51_MODE_CTCSS: u16 = 1u16 << 12;
pub const REG_51_MODE_CDCSS: u16 = 0;
pub const REG_51_CDCSS_23_BIT: u16 = 0;
pub const REG_51_1050HZ_DETECTION: u16 = 1u16 << 10;
pub const REG_51_1050HZ_NO_DETECTION: u16 = 0;
pub const REG_51_AUTO_CDCSS_BW_ENABLE: u16 = 0;
pub const REG_51_AUTO_CTCSS_BW_ENABLE: u16 = 0;
pub const REG_51_SHIFT_CXCSS_TX_GAIN1: u16 = 0;

// --- REG_70 ---

pub const REG_70_SHIFT_TONE1_TUNING_GAIN: u16 = 8;
pub const REG_70_SHIFT_TONE2_TUNING_GAIN: u16 = 0;

pub const REG_70_ENABLE_TONE1: u16 = 1u16 << 15;
pub const REG_70_ENABLE_TONE2: u16 = 1u16 << 7;
