//! Register-level driver for the Beken BK4829 (BK4819 family) RF transceiver.
//!
//! The chip is reached over a bit-banged 3-wire bus ([`bitbang`]). On top of
//! that sit typed register layouts ([`regmap`]) and the driver itself
//! ([`bk4829`]), which turns radio operations (tune, modulation, squelch,
//! tones, TX/RX) into ordered register write recipes.
#![cfg_attr(not(test), no_std)]

// must come first, the logging macros are textually scoped
pub(crate) mod fmt;

pub mod bitbang;
pub mod bk4829;
pub mod regmap;

#[cfg(test)]
mod testing;

pub use bitbang::{BidiPin, Bk4829BitBang, Bk4829Bus};
pub use bk4829::{Bk4829, Bk4829Driver};
