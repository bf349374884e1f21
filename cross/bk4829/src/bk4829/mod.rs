//! BK4829 driver.
//!
//! [`Bk4829`] is the register access layer: plain and bitfield register
//! access plus the REG_30 shadow. [`Bk4829Driver`] sits on top and owns the
//! soft state; its operations are split by subsystem across the modules below,
//! each adding an `impl` block.

mod access;
mod driver;
mod dtmf;
mod measure;
mod modulation;
pub mod regs;
mod sequencer;
mod squelch;
mod subaudio;
pub mod tables;

pub use access::Bk4829;
pub use driver::{Bk4829Driver, FilterBand, SoftState, TxRxState, VHF_UHF_BOUND};
pub use dtmf::{DtmfTiming, RogerMode, ROGER_TINY};
pub use measure::FreqScanTime;
pub use modulation::{AfType, ModulationType, XtalMode};
pub use regs::{GpioPin, Register, RegisterSpec};
pub use sequencer::PA_GAIN_BOUND;
pub use squelch::{SquelchThresholds, SQUELCH_MAX_LEVEL};
pub use subaudio::{CssScanResult, ToneCode};
pub use tables::{AgcConfig, Gain, GAIN_TABLE};
