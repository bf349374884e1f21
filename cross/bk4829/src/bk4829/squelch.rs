//! Hardware squelch and VOX.

use crate::bitbang::Bk4829Bus;
use crate::regmap;

use super::driver::Bk4829Driver;
use super::regs::{Register, SQUELCH_TYPE};
use super::tables::SQUELCH_TYPE_VALUES;

/// Squelch open/close thresholds.
///
/// Noise and glitch thresholds are 7-bit on the chip; values outside 0..=127
/// are clamped when applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SquelchThresholds {
    pub open_rssi: u8,
    pub close_rssi: u8,
    pub open_noise: i16,
    pub close_noise: i16,
    pub open_glitch: i16,
    pub close_glitch: i16,
}

pub const SQUELCH_MAX_LEVEL: u8 = 10;

const THRESHOLD_MAX: i16 = 127;

/// Linear map of `v` in 0..=10 onto `lo..=hi`, rounded half away from zero,
/// so both endpoints are hit exactly on rising and falling ranges.
fn convert_domain(v: i32, lo: i32, hi: i32) -> i32 {
    let max = i32::from(SQUELCH_MAX_LEVEL);
    let span = v * (hi - lo);
    let half = if span < 0 { -max / 2 } else { max / 2 };
    (span + half) / max + lo
}

impl SquelchThresholds {
    /// Thresholds for a normalized squelch level.
    ///
    /// Level 0 keeps the squelch open. 1..=10 tighten linearly; larger levels
    /// are treated as 10.
    pub fn for_level(level: u8) -> Self {
        if level == 0 {
            return Self {
                open_rssi: 0,
                close_rssi: 0,
                open_noise: 255,
                close_noise: 255,
                open_glitch: 255,
                close_glitch: 255,
            };
        }
        let level = i32::from(level.min(SQUELCH_MAX_LEVEL));

        let open_rssi = convert_domain(level, 60, 180);
        let open_noise = convert_domain(level, 64, 12);

        Self {
            open_rssi: open_rssi as u8,
            close_rssi: (open_rssi - 4) as u8,
            open_noise: open_noise as i16,
            close_noise: (open_noise + 4) as i16,
            open_glitch: open_noise as i16,
            close_glitch: (open_noise + 3) as i16,
        }
    }
}

fn clamp_threshold(name: &str, v: i16) -> u16 {
    let c = v.clamp(0, THRESHOLD_MAX);
    if c != v {
        warn!("squelch {} {} clamped to {}", name, v, c);
    }
    c as u16
}

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    /// Apply thresholds and delays as one four-register recipe.
    ///
    /// `open_delay` is 3 bits, `close_delay` 2 bits.
    pub fn setup_squelch(
        &mut self,
        th: SquelchThresholds,
        open_delay: u8,
        close_delay: u8,
    ) -> Result<(), BUS::Error> {
        let close_glitch = clamp_threshold("glitch close", th.close_glitch);
        let open_glitch = clamp_threshold("glitch open", th.open_glitch);
        let open_noise = clamp_threshold("noise open", th.open_noise);
        let close_noise = clamp_threshold("noise close", th.close_noise);

        if open_delay > 7 || close_delay > 3 {
            warn!("squelch delays {}/{} masked", open_delay, close_delay);
        }

        self.bk
            .write_register(Register::Reg4D, 0xA000 | close_glitch)?;
        self.bk.write_reg_n(
            regmap::Reg4E::new()
                .with_undocumented_14(true)
                .with_open_delay(open_delay & 0b111)
                .with_close_delay(close_delay & 0b11)
                .with_glitch_open(open_glitch as u8),
        )?;
        self.bk
            .write_register(Register::Reg4F, (close_noise << 8) | open_noise)?;
        self.bk.write_register(
            Register::Reg78,
            (u16::from(th.open_rssi) << 8) | u16::from(th.close_rssi),
        )
    }

    /// Squelch from a normalized level 0..=10.
    pub fn squelch(&mut self, level: u8, open_delay: u8, close_delay: u8) -> Result<(), BUS::Error> {
        if level > SQUELCH_MAX_LEVEL {
            warn!("squelch level {} clamped", level);
        }
        self.setup_squelch(SquelchThresholds::for_level(level), open_delay, close_delay)
    }

    /// Hysteresis preset 0..=3. Larger values are ignored.
    pub fn set_squelch_type(&mut self, kind: u8) -> Result<(), BUS::Error> {
        let Some(&v) = SQUELCH_TYPE_VALUES.get(usize::from(kind)) else {
            warn!("squelch type {} out of range", kind);
            return Ok(());
        };
        self.bk.write_bitfield(SQUELCH_TYPE, u16::from(v))
    }

    pub fn is_squelch_open(&mut self) -> Result<bool, BUS::Error> {
        let s: regmap::Reg0C = self.bk.read_reg_n()?;
        Ok(s.squelch())
    }

    // --- VOX ----------------------------------------------------------------

    /// Thresholds are 11-bit.
    pub fn enable_vox(&mut self, enable_th: u16, disable_th: u16) -> Result<(), BUS::Error> {
        let reg31 = self.bk.read_register(Register::Reg31)?;
        self.bk
            .write_register(Register::Reg46, 0xA000 | (enable_th & 0x07FF))?;
        self.bk
            .write_register(Register::Reg79, 0x1800 | (disable_th & 0x07FF))?;
        // 640ms release delay
        self.bk.write_register(Register::Reg7A, 0x289A)?;
        self.bk.write_register(Register::Reg31, reg31 | 4)
    }

    pub fn disable_vox(&mut self) -> Result<(), BUS::Error> {
        self.bk.update_register(Register::Reg31, |v| v & !4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{driver, RegisterFileBus};

    #[test]
    fn level_five() {
        let th = SquelchThresholds::for_level(5);
        assert_eq!(
            th,
            SquelchThresholds {
                open_rssi: 120,
                close_rssi: 116,
                open_noise: 38,
                close_noise: 42,
                open_glitch: 38,
                close_glitch: 41,
            }
        );
    }

    #[test]
    fn level_bounds() {
        let open = SquelchThresholds::for_level(0);
        assert_eq!((open.open_rssi, open.close_rssi), (0, 0));
        assert_eq!(open.open_noise, 255);

        let tight = SquelchThresholds::for_level(10);
        assert_eq!(tight.open_rssi, 180);
        assert_eq!(tight.open_noise, 12);
        assert_eq!(tight.close_noise, 16);
        assert_eq!(tight.open_glitch, 12);

        let loose = SquelchThresholds::for_level(1);
        assert_eq!(loose.open_rssi, 72);
        // 64 - 5.2
        assert_eq!(loose.open_noise, 59);
        assert_eq!(SquelchThresholds::for_level(42), tight);
    }

    #[test]
    fn four_writes_in_order() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        drv.squelch(5, 2, 1).unwrap();
        assert_eq!(
            bus.writes(),
            vec![
                (0x4D, 0xA000 | 41),
                (0x4E, (1 << 14) | (2 << 11) | (1 << 9) | 38),
                (0x4F, (42 << 8) | 38),
                (0x78, (120 << 8) | 116),
            ]
        );
    }

    #[test]
    fn thresholds_clamp_to_seven_bits() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        let th = SquelchThresholds {
            open_rssi: 80,
            close_rssi: 70,
            open_noise: -5,
            close_noise: 10,
            open_glitch: 20,
            close_glitch: 200,
        };
        drv.setup_squelch(th, 0, 0).unwrap();
        assert_eq!(bus.value(0x4D), 0xA000 | 127);
        assert_eq!(bus.value(0x4F), 10 << 8);
    }

    #[test]
    fn level_zero_is_fully_open() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        drv.squelch(0, 0, 0).unwrap();
        assert_eq!(bus.value(0x4D), 0xA000 | 127);
        assert_eq!(bus.value(0x4F), (127 << 8) | 127);
        assert_eq!(bus.value(0x78), 0);
    }

    #[test]
    fn delays_are_masked() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        drv.squelch(5, 0xFF, 0xFF).unwrap();
        let r = regmap::Reg4E::from(bus.value(0x4E));
        assert_eq!(r.open_delay(), 7);
        assert_eq!(r.close_delay(), 3);
        assert!(!r.undocumented_15());
    }

    #[test]
    fn squelch_type() {
        let bus = RegisterFileBus::new();
        bus.preset(0x77, 0x00F3);
        let mut drv = driver(&bus);

        drv.set_squelch_type(1).unwrap();
        assert_eq!(bus.value(0x77), 0xAAF3);

        bus.clear_log();
        drv.set_squelch_type(4).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn squelch_status_bit() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        bus.preset(0x0C, 0b10);
        assert!(drv.is_squelch_open().unwrap());
        bus.preset(0x0C, 0b01);
        assert!(!drv.is_squelch_open().unwrap());
    }

    #[test]
    fn vox() {
        let bus = RegisterFileBus::new();
        bus.preset(0x31, 0x0001);
        let mut drv = driver(&bus);

        drv.enable_vox(0x0FFF, 0x0010).unwrap();
        assert_eq!(bus.value(0x46), 0xA7FF);
        assert_eq!(bus.value(0x79), 0x1810);
        assert_eq!(bus.value(0x7A), 0x289A);
        assert_eq!(bus.value(0x31), 0x0005);

        drv.disable_vox().unwrap();
        assert_eq!(bus.value(0x31), 0x0001);
    }
}
