//! The hardware traits, implemented on STM32F407 peripherals.

use stm32f4::stm32f407 as device;

use crate::content::Rgb;
use crate::hw::{ColorOut, ScanlineTimer, SyncPin};

/// GPIOB pin carrying vertical sync.
pub const VSYNC_PIN: u32 = 7;
/// GPIOE pin carrying red; green and blue are on the next two pins up.
pub const RED_PIN: u32 = 8;

/// TIM4, viewed from its update interrupt.
pub struct HsyncTimer<'a>(pub &'a device::TIM4);

impl<'a> ScanlineTimer for HsyncTimer<'a> {
    fn rebase(&mut self) {
        // The counter reloads in hardware at the update event that got us
        // here, so the baseline is already exact.
    }

    fn acknowledge(&mut self) {
        // SR flags are write-zero-to-clear, so this clears all of them. UIF
        // is the only one we use.
        self.0.sr.write(|w| w.uif().clear_bit());
    }
}

/// PB7.
pub struct VsyncPin<'a>(pub &'a device::GPIOB);

impl<'a> SyncPin for VsyncPin<'a> {
    fn set_high(&mut self) {
        // Safety: BSRR writes are atomic and only touch the bits set.
        self.0.bsrr.write(|w| unsafe { w.bits(1 << VSYNC_PIN) })
    }

    fn set_low(&mut self) {
        self.0.bsrr.write(|w| unsafe { w.bits(1 << (VSYNC_PIN + 16)) })
    }
}

/// PE8 (red), PE9 (green), PE10 (blue).
pub struct ColorPins<'a>(pub &'a device::GPIOE);

impl<'a> ColorOut for ColorPins<'a> {
    #[inline(always)]
    fn drive(&mut self, color: Rgb) {
        // Safety: as above. This is the only store in the column loop.
        self.0.bsrr.write(|w| unsafe { w.bits(color.bsrr(RED_PIN)) })
    }
}
