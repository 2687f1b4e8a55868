//! Interrupt handler for the per-line pulse.

use super::pins::{HsyncTimer, VsyncPin};
use super::{HSYNC, LINE};
use crate::priority::Isr;
use crate::util::measurement;
use crate::vstate;

/// Horizontal pulse ISR: call this from `TIM4`.
///
/// The driver doesn't work unless this is wired up. In the simplest case, that
/// means your application needs to include code like the following:
///
/// ```ignore
/// use stm32f4::stm32f407::interrupt;
///
/// #[interrupt]
/// fn TIM4() {
///     bbvga::tim4_hsync_isr()
/// }
/// ```
///
/// # Panics
///
/// If it runs before `configure_timing` has handed it the hardware.
pub fn tim4_hsync_isr() {
    measurement::sig_a_set();

    {
        let hw = HSYNC.acquire();
        // Safety: we are the hsync interrupt.
        let isr = unsafe { Isr::new() };
        vstate::advance(
            &mut HsyncTimer(&hw.tim4),
            &mut VsyncPin(&hw.gpiob),
            &hw.timing,
            &LINE,
            &isr,
        );
    }

    measurement::sig_a_clear();
}
