//! Register access layer.
//!
//! All register traffic goes through [`Bk4829`]. REG_30 (mode/control) is
//! shadowed: writes update the shadow before reaching the bus, reads are
//! served from the shadow once it holds a value. The shadow is only valid as
//! long as nothing else writes REG_30, so the bus is owned here and never
//! handed out mutably.

use crate::bitbang::Bk4829Bus;
use crate::regmap::Bk4829Register;

use super::regs::{Register, RegisterSpec};

pub struct Bk4829<BUS> {
    bus: BUS,
    mode_control: Option<u16>,
}

impl<BUS> Bk4829<BUS>
where
    BUS: Bk4829Bus,
{
    /// Wrap a bus. The mode/control shadow starts empty.
    pub const fn new(bus: BUS) -> Self {
        Self {
            bus,
            mode_control: None,
        }
    }

    #[inline]
    pub fn free(self) -> BUS {
        self.bus
    }

    #[inline]
    pub fn bus(&self) -> &BUS {
        &self.bus
    }

    /// Current REG_30 shadow, if any.
    #[inline]
    pub fn cached_mode_control(&self) -> Option<u16> {
        self.mode_control
    }

    /// Forget the REG_30 shadow so the next read goes to the chip.
    #[inline]
    pub fn invalidate_cache(&mut self) {
        self.mode_control = None;
    }

    fn read_addr(&mut self, addr: u8) -> Result<u16, BUS::Error> {
        if addr == Register::MODE_CONTROL.as_u8() {
            if let Some(v) = self.mode_control {
                return Ok(v);
            }
        }
        self.bus.read_reg(addr)
    }

    fn write_addr(&mut self, addr: u8, value: u16) -> Result<(), BUS::Error> {
        if addr == Register::MODE_CONTROL.as_u8() {
            self.mode_control = Some(value);
        }
        self.bus.write_reg(addr, value)
    }

    #[inline]
    pub fn read_register(&mut self, reg: Register) -> Result<u16, BUS::Error> {
        self.read_addr(reg.as_u8())
    }

    #[inline]
    pub fn write_register(&mut self, reg: Register, value: u16) -> Result<(), BUS::Error> {
        self.write_addr(reg.as_u8(), value)
    }

    /// Read-modify-write of a whole register.
    pub fn update_register(
        &mut self,
        reg: Register,
        f: impl FnOnce(u16) -> u16,
    ) -> Result<(), BUS::Error> {
        let v = self.read_register(reg)?;
        self.write_register(reg, f(v))
    }

    pub fn read_reg_n<R: Bk4829Register>(&mut self) -> Result<R, BUS::Error> {
        Ok(R::deserialize(self.read_addr(R::ADDRESS)?))
    }

    pub fn write_reg_n<R: Bk4829Register>(&mut self, reg: R) -> Result<(), BUS::Error> {
        self.write_addr(R::ADDRESS, reg.serialize())
    }

    pub fn read_bitfield(&mut self, spec: RegisterSpec) -> Result<u16, BUS::Error> {
        Ok(spec.extract(self.read_register(spec.num)?))
    }

    /// Clear the field, OR in `value` (masked to the field width), write back.
    pub fn write_bitfield(&mut self, spec: RegisterSpec, value: u16) -> Result<(), BUS::Error> {
        if value & !spec.mask() != 0 {
            warn!("{} value {} masked to {} bits", spec.name, value, spec.width);
        }
        self.update_register(spec.num, |reg| spec.insert(reg, value))
    }
}
