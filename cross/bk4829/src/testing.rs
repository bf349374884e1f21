//! Test doubles for the register bus.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::vec::Vec;

use crate::bitbang::Bk4829Bus;
use crate::bk4829::{Bk4829, Bk4829Driver};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BusOp {
    Read(u8),
    Write(u8, u16),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BusFault;

#[derive(Default)]
struct State {
    regs: HashMap<u8, u16>,
    queued: HashMap<u8, VecDeque<u16>>,
    ops: Vec<BusOp>,
    fail_writes: bool,
}

/// A register file behind the `Bk4829Bus` seam.
///
/// Writes store the value and are logged in order. Reads return a queued value
/// for that address if one is pending, otherwise the stored value (0 if never
/// written). Clones share the same state, so a test keeps one handle while the
/// driver owns the other.
#[derive(Clone, Default)]
pub struct RegisterFileBus {
    state: Rc<RefCell<State>>,
}

impl RegisterFileBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register value without logging a transaction.
    pub fn preset(&self, reg: u8, value: u16) {
        self.state.borrow_mut().regs.insert(reg, value);
    }

    /// Values returned by the next reads of `reg`, before falling back to the file.
    pub fn queue_reads(&self, reg: u8, values: &[u16]) {
        self.state
            .borrow_mut()
            .queued
            .entry(reg)
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn value(&self, reg: u8) -> u16 {
        self.state.borrow().regs.get(&reg).copied().unwrap_or(0)
    }

    pub fn ops(&self) -> Vec<BusOp> {
        self.state.borrow().ops.clone()
    }

    /// Writes in issue order.
    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.state
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match *op {
                BusOp::Write(r, v) => Some((r, v)),
                BusOp::Read(_) => None,
            })
            .collect()
    }

    pub fn writes_to(&self, reg: u8) -> Vec<u16> {
        self.writes()
            .into_iter()
            .filter(|(r, _)| *r == reg)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.state
            .borrow()
            .ops
            .iter()
            .filter(|op| matches!(op, BusOp::Read(_)))
            .count()
    }

    pub fn transactions(&self) -> usize {
        self.state.borrow().ops.len()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().ops.clear();
    }
}

impl Bk4829Bus for RegisterFileBus {
    type Error = BusFault;

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), Self::Error> {
        let mut s = self.state.borrow_mut();
        if s.fail_writes {
            return Err(BusFault);
        }
        s.ops.push(BusOp::Write(reg, value));
        s.regs.insert(reg, value);
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16, Self::Error> {
        let mut s = self.state.borrow_mut();
        s.ops.push(BusOp::Read(reg));
        if let Some(v) = s.queued.get_mut(&reg).and_then(|q| q.pop_front()) {
            return Ok(v);
        }
        Ok(s.regs.get(&reg).copied().unwrap_or(0))
    }
}

/// Driver over a shared handle to `bus`.
pub fn driver(bus: &RegisterFileBus) -> Bk4829Driver<RegisterFileBus> {
    Bk4829Driver::new(Bk4829::new(bus.clone()))
}
