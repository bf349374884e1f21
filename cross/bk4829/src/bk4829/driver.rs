use embedded_hal::delay::DelayNs;

use crate::bitbang::Bk4829Bus;
use crate::regmap::{self, Bk4829Register};

use super::access::Bk4829;
use super::modulation::ModulationType;
use super::regs::{GpioPin, Register, REG_30_ENABLE_VCO_CALIB};
use super::tables::{AUTO_GAIN_INDEX, DTMF_COEFFS};

/// Frequency (Hz) below which the VHF LNA path is selected.
pub const VHF_UHF_BOUND: u32 = 24_000_000;

/// Upper bound on 1ms polls while waiting for the crystal to settle.
const XTAL_SETTLE_MAX_POLLS: u32 = 100;

/// Power-on value of the GPIO output word (REG_33).
const GPIO_OUT_RESET: u16 = 0x9000;

/// LNA filter bank, driven by two GPIO mux bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FilterBand {
    Vhf,
    Uhf,
}

impl FilterBand {
    #[inline]
    pub fn for_frequency(freq_hz: u32) -> Self {
        if freq_hz < VHF_UHF_BOUND {
            FilterBand::Vhf
        } else {
            FilterBand::Uhf
        }
    }
}

/// Last values commanded to the chip, used to skip redundant writes.
///
/// `None` means unknown: the next command always reaches the chip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftState {
    pub selected_filter: Option<FilterBand>,
    /// Last frequency `tune_to` completed, synthesizer retriggered.
    pub last_frequency: Option<u32>,
    /// REG_39:REG_38 as last written by `set_frequency`.
    pub written_frequency: Option<u32>,
    pub last_modulation: Option<ModulationType>,
    /// Mirror of REG_33. Always written whole.
    pub gpio_out: u16,
}

impl SoftState {
    pub const fn new() -> Self {
        Self {
            selected_filter: None,
            last_frequency: None,
            written_frequency: None,
            last_modulation: None,
            gpio_out: GPIO_OUT_RESET,
        }
    }
}

impl Default for SoftState {
    fn default() -> Self {
        Self::new()
    }
}

/// Operating phase as last commanded through the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxRxState {
    Idle,
    Receiving,
    Transmitting,
    Bypass,
}

/// High-level driver for one BK4829.
///
/// Owns the register access layer plus the soft state that mirrors what has
/// been written to the chip. One instance per physical chip.
pub struct Bk4829Driver<BUS> {
    pub(super) bk: Bk4829<BUS>,
    pub(super) soft: SoftState,
    pub(super) phase: TxRxState,
    initialized: bool,
}

impl<BUS> Bk4829Driver<BUS>
where
    BUS: Bk4829Bus,
{
    pub const fn new(bk: Bk4829<BUS>) -> Self {
        Self {
            bk,
            soft: SoftState::new(),
            phase: TxRxState::Idle,
            initialized: false,
        }
    }

    #[inline]
    pub fn free(self) -> Bk4829<BUS> {
        self.bk
    }

    #[inline]
    pub fn bk(&self) -> &Bk4829<BUS> {
        &self.bk
    }

    #[inline]
    pub fn soft_state(&self) -> &SoftState {
        &self.soft
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn read_register_n<R: Bk4829Register>(&mut self) -> Result<R, BUS::Error> {
        self.bk.read_reg_n::<R>()
    }

    pub fn write_register_n<R: Bk4829Register>(&mut self, reg: R) -> Result<(), BUS::Error> {
        self.bk.write_reg_n(reg)
    }

    /// Full power-on sequence. Does nothing if already initialized.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), BUS::Error> {
        if self.initialized {
            debug!("bk4829 already initialized");
            return Ok(());
        }
        info!("bk4829 init");

        self.soft_reset()?;
        self.bk.write_register(Register::Reg37, 0x9D1F)?;

        self.soft.gpio_out = GPIO_OUT_RESET;
        self.bk.write_register(Register::Reg33, self.soft.gpio_out)?;

        self.setup_power_amplifier(0, 0)?;

        self.bk.write_register(Register::Reg1E, 0x4C58)?;
        // VCO, PLL
        self.bk.write_register(Register::Reg1F, 0x5454)?;

        self.set_agc(AUTO_GAIN_INDEX)?;

        // interrupts off
        self.bk.write_register(Register::Reg3F, 0)?;
        // band selection threshold
        self.bk.write_register(Register::Reg3E, 0xA037)?;

        for (i, &c) in DTMF_COEFFS.iter().enumerate() {
            self.bk.write_reg_n(
                regmap::Reg09::new()
                    .with_coefficient(c)
                    .with_symbol_number(i as u8),
            )?;
        }

        self.bk.write_reg_n(
            regmap::Reg48::new()
                .with_af_dac_gain(8)
                .with_afrx_gain2(58)
                .with_afrx_gain1(0)
                .with_undocumented(11),
        )?;

        self.wait_for_crystal(delay)?;

        // MIC PGA, MIC sensitivity, 3kHz TX response
        self.bk.write_register(Register::Reg19, 0x1041)?;
        self.bk.write_register(Register::Reg7D, 0xE94F)?;
        self.bk.write_register(Register::Reg74, 0xAF1F)?;

        self.toggle_gpio_out(GpioPin::Gpio0Pin28RxEnable, true)?;
        self.disable_dtmf()?;

        // FM deviation
        self.bk
            .update_register(Register::Reg40, |v| (v & !0x7FF) | 1450 | (1 << 12))?;

        self.idle()?;

        self.initialized = true;
        info!("bk4829 ready");
        Ok(())
    }

    /// Pulse the soft reset bit. Every register returns to its reset value,
    /// so the mode/control shadow and the soft state are dropped as well.
    pub fn soft_reset(&mut self) -> Result<(), BUS::Error> {
        self.soft = SoftState::new();
        self.phase = TxRxState::Idle;
        self.bk.invalidate_cache();
        self.bk.write_reg_n(regmap::Reg00::new().with_soft_reset(true))?;
        self.bk.write_reg_n(regmap::Reg00::new())
    }

    fn wait_for_crystal(&mut self, delay: &mut impl DelayNs) -> Result<(), BUS::Error> {
        for _ in 0..XTAL_SETTLE_MAX_POLLS {
            let status: regmap::Reg0C = self.bk.read_reg_n()?;
            if !status.irq() {
                return Ok(());
            }
            self.bk.write_register(Register::Reg02, 0)?;
            delay.delay_ms(1);
        }
        warn!(
            "crystal not settled after {} ms, continuing",
            XTAL_SETTLE_MAX_POLLS
        );
        Ok(())
    }

    // --- GPIO / filter bank -------------------------------------------------

    /// Set or clear one GPIO output bit and write the whole word.
    pub fn toggle_gpio_out(&mut self, pin: GpioPin, on: bool) -> Result<(), BUS::Error> {
        if on {
            self.soft.gpio_out |= pin.bit();
        } else {
            self.soft.gpio_out &= !pin.bit();
        }
        if matches!(pin, GpioPin::Gpio3Pin31UhfLna | GpioPin::Gpio4Pin32VhfLna) {
            self.soft.selected_filter = None;
        }
        self.bk.write_register(Register::Reg33, self.soft.gpio_out)
    }

    /// Drive both LNA mux bits for `band`. Skipped if `band` is already selected.
    pub fn select_filter_band(&mut self, band: FilterBand) -> Result<(), BUS::Error> {
        if self.soft.selected_filter == Some(band) {
            trace!("filter {:?} already selected", band);
            return Ok(());
        }
        self.soft.selected_filter = Some(band);

        let vhf = GpioPin::Gpio4Pin32VhfLna.bit();
        let uhf = GpioPin::Gpio3Pin31UhfLna.bit();
        let mut out = self.soft.gpio_out & !(vhf | uhf);
        match band {
            FilterBand::Vhf => out |= vhf,
            FilterBand::Uhf => out |= uhf,
        }
        self.soft.gpio_out = out;

        self.bk.write_register(Register::Reg33, out)
    }

    #[inline]
    pub fn select_filter(&mut self, freq_hz: u32) -> Result<(), BUS::Error> {
        self.select_filter_band(FilterBand::for_frequency(freq_hz))
    }

    // --- Frequency ----------------------------------------------------------

    /// Write the synthesizer frequency, skipping halves that did not change.
    pub fn set_frequency(&mut self, freq_hz: u32) -> Result<(), BUS::Error> {
        let low = freq_hz as u16;
        let high = (freq_hz >> 16) as u16;
        let prev = self.soft.written_frequency;

        if prev.map_or(true, |p| p as u16 != low) {
            self.bk.write_register(Register::Reg38, low)?;
        }
        if prev.map_or(true, |p| (p >> 16) as u16 != high) {
            self.bk.write_register(Register::Reg39, high)?;
        }
        self.soft.written_frequency = Some(freq_hz);
        Ok(())
    }

    pub fn frequency(&mut self) -> Result<u32, BUS::Error> {
        let high = self.bk.read_register(Register::Reg39)? as u32;
        let low = self.bk.read_register(Register::Reg38)? as u32;
        Ok((high << 16) | low)
    }

    /// Tune and retrigger the synthesizer.
    ///
    /// With `precise` the VCO is recalibrated; otherwise REG_30 is briefly
    /// written without the calibration bit. REG_30 is then restored.
    pub fn tune_to(&mut self, freq_hz: u32, precise: bool) -> Result<(), BUS::Error> {
        if self.soft.last_frequency == Some(freq_hz) {
            trace!("already tuned to {}", freq_hz);
            return Ok(());
        }
        self.set_frequency(freq_hz)?;

        let reg = self.bk.read_register(Register::MODE_CONTROL)?;
        if precise {
            self.bk.write_register(Register::MODE_CONTROL, 0x0200)?;
        } else {
            self.bk
                .write_register(Register::MODE_CONTROL, reg & !REG_30_ENABLE_VCO_CALIB)?;
        }
        self.bk.write_register(Register::MODE_CONTROL, reg)?;
        self.soft.last_frequency = Some(freq_hz);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{driver, BusOp, RegisterFileBus};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    #[test]
    fn init_sequence() {
        let bus = RegisterFileBus::new();
        bus.preset(0x40, 0xFFFF);
        let mut drv = driver(&bus);

        drv.init(&mut NoopDelay::new()).unwrap();

        let w = bus.writes();
        assert_eq!(&w[..4], &[(0x00, 0x8000), (0x00, 0x0000), (0x37, 0x9D1F), (0x33, 0x9000)]);
        assert_eq!(w[4], (0x36, 0x0088));
        assert_eq!(&w[5..7], &[(0x1E, 0x4C58), (0x1F, 0x5454)]);

        let coeffs = bus.writes_to(0x09);
        assert_eq!(coeffs.len(), 16);
        assert_eq!(coeffs[0], 111);
        assert_eq!(coeffs[15], (15 << 12) | 159);

        assert_eq!(bus.writes_to(0x48), vec![0xB3A8]);
        assert_eq!(bus.writes_to(0x33), vec![0x9000, 0x9040]);
        assert_eq!(bus.writes_to(0x24), vec![0]);
        assert_eq!(bus.value(0x40), (0xFFFF & !0x7FF) | 1450 | (1 << 12));
        assert_eq!(w.last(), Some(&(0x30, 0)));
        assert_eq!(drv.bk().cached_mode_control(), Some(0));
        assert!(drv.is_initialized());
    }

    #[test]
    fn init_is_idempotent() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.init(&mut NoopDelay::new()).unwrap();
        bus.clear_log();

        drv.init(&mut NoopDelay::new()).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn crystal_wait_polls_until_settled() {
        let bus = RegisterFileBus::new();
        bus.queue_reads(0x0C, &[1, 1, 0]);
        let mut drv = driver(&bus);

        drv.init(&mut NoopDelay::new()).unwrap();
        assert_eq!(bus.writes_to(0x02), vec![0, 0]);
    }

    #[test]
    fn crystal_wait_is_bounded() {
        let bus = RegisterFileBus::new();
        bus.preset(0x0C, 1);
        let mut drv = driver(&bus);

        drv.init(&mut NoopDelay::new()).unwrap();
        assert_eq!(bus.writes_to(0x02).len(), XTAL_SETTLE_MAX_POLLS as usize);
        assert!(drv.is_initialized());
    }

    #[test]
    fn soft_reset_drops_mode_control_cache() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.idle().unwrap();
        assert_eq!(drv.bk().cached_mode_control(), Some(0));

        drv.soft_reset().unwrap();
        assert_eq!(drv.bk().cached_mode_control(), None);
    }

    #[test]
    fn tune_writes_only_changed_halves() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.idle().unwrap();
        bus.clear_log();

        drv.tune_to(0x1A95_0000, false).unwrap();
        assert_eq!(
            bus.writes(),
            vec![(0x38, 0x0000), (0x39, 0x1A95), (0x30, 0), (0x30, 0)]
        );

        bus.clear_log();
        drv.tune_to(0x1A95_1234, true).unwrap();
        assert_eq!(bus.writes(), vec![(0x38, 0x1234), (0x30, 0x0200), (0x30, 0)]);

        bus.clear_log();
        drv.tune_to(0x1A95_1234, true).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn tune_restores_mode_control_without_reading_it() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.rx_turn_on().unwrap();
        bus.clear_log();

        drv.tune_to(145_500_000, false).unwrap();
        let w = bus.writes_to(0x30);
        assert_eq!(w, vec![0xBFF1 & !REG_30_ENABLE_VCO_CALIB, 0xBFF1]);
        assert!(!bus.ops().contains(&BusOp::Read(0x30)));
    }

    #[test]
    fn soft_reset_forgets_soft_state() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.idle().unwrap();
        drv.select_filter_band(FilterBand::Uhf).unwrap();
        drv.tune_to(145_500_000, false).unwrap();
        drv.set_modulation(ModulationType::Am).unwrap();

        drv.soft_reset().unwrap();
        assert_eq!(drv.soft_state(), &SoftState::new());
        assert_eq!(drv.tx_rx_state(), TxRxState::Idle);

        bus.clear_log();
        drv.select_filter_band(FilterBand::Uhf).unwrap();
        assert_eq!(bus.writes_to(0x33), vec![0x9008]);

        drv.tune_to(145_500_000, false).unwrap();
        assert_eq!(bus.writes_to(0x38).len(), 1);
        assert_eq!(bus.writes_to(0x39).len(), 1);
        assert_eq!(bus.writes_to(0x30).len(), 2);

        drv.set_modulation(ModulationType::Am).unwrap();
        assert!(!bus.writes_to(0x47).is_empty());
    }

    #[test]
    fn tune_after_set_frequency_still_retriggers() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.idle().unwrap();
        drv.set_frequency(145_500_000).unwrap();
        bus.clear_log();

        drv.tune_to(145_500_000, true).unwrap();
        // halves already written, only the synthesizer retrigger remains
        assert_eq!(bus.writes(), vec![(0x30, 0x0200), (0x30, 0)]);
        assert_eq!(drv.soft_state().last_frequency, Some(145_500_000));
    }

    #[test]
    fn filter_band_writes_both_bits() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        drv.select_filter(145_000_000).unwrap();
        // same band, skipped
        drv.select_filter(430_000_000).unwrap();
        drv.select_filter(14_000_000).unwrap();
        assert_eq!(bus.writes_to(0x33), vec![0x9008, 0x9004]);
    }

    #[test]
    fn filter_band_skips_repeat() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);

        drv.select_filter_band(FilterBand::Uhf).unwrap();
        drv.select_filter_band(FilterBand::Uhf).unwrap();
        assert_eq!(bus.writes_to(0x33).len(), 1);

        // Touching an LNA bit directly forgets the selected band.
        drv.toggle_gpio_out(GpioPin::Gpio3Pin31UhfLna, false).unwrap();
        drv.select_filter_band(FilterBand::Uhf).unwrap();
        assert_eq!(bus.writes_to(0x33), vec![0x9008, 0x9000, 0x9008]);
    }

    #[test]
    fn gpio_merges_into_cached_word() {
        let bus = RegisterFileBus::new();
        bus.preset(0x33, 0xFFFF);
        let mut drv = driver(&bus);

        drv.toggle_gpio_out(GpioPin::Gpio6Pin2Green, true).unwrap();
        drv.toggle_gpio_out(GpioPin::Gpio5Pin1Red, true).unwrap();
        drv.toggle_gpio_out(GpioPin::Gpio6Pin2Green, false).unwrap();
        assert_eq!(bus.writes_to(0x33), vec![0x9001, 0x9003, 0x9002]);
        assert_eq!(bus.reads(), 0);
    }

    #[test]
    fn frequency_readback() {
        let bus = RegisterFileBus::new();
        let mut drv = driver(&bus);
        drv.set_frequency(446_006_250).unwrap();
        assert_eq!(drv.frequency().unwrap(), 446_006_250);
    }
}
