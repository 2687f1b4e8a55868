//! Bit-banged VGA output.
//!
//! A single hardware timer generates horizontal sync and interrupts once per
//! scanline. The interrupt handler ([`vstate`]) counts lines and drives
//! vertical sync; everything else happens in thread mode, where the
//! [`pacer`] races the beam, toggling three color pins directly for each
//! visible line and then spinning until the hardware moves on to the next one.
//!
//! There is no framebuffer and no DMA. Picture content comes from a
//! [`content::Content`] implementation that is asked, column by column, what
//! to put on the pins.
//!
//! The timing core is architecture-independent so it can be exercised on the
//! host through the [`sim`] module. The STM32F407 binding (`driver`) is only
//! compiled for bare metal.

#![cfg_attr(not(test), no_std)]

pub mod content;
pub mod hw;
pub mod pacer;
pub mod priority;
pub mod sim;
pub mod timing;
pub mod util;
pub mod vstate;

pub use crate::content::Rgb;
pub use crate::timing::{Pacing, Timing, TimingError};

cfg_if::cfg_if! {
    if #[cfg(target_os = "none")] {
        // re-export driver bits
        mod driver;
        pub use driver::*;
    }
}
