//! Scrolling checkerboard at 800x600.

#![no_std]
#![no_main]

#[cfg(feature = "panic-halt")]
extern crate panic_halt;
#[cfg(feature = "panic-itm")]
extern crate panic_itm;

use stm32f4::stm32f407::interrupt;

use bbvga::content::Checkerboard;
use bbvga::timing::SVGA_800_600;
use bbvga::{Pacing, Rgb};

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut board = Checkerboard::new(8, Rgb::WHITE, Rgb::BLUE);

    // A few blank clocks up front keep the left edge clear of the back porch.
    let pacing = Pacing::new(48).with_lead_in(4);

    bbvga::take_hardware()
        .configure_timing(&SVGA_800_600)
        .unwrap()
        .scan_out(pacing, &mut board)
}

/// Wires up the TIM4 handler expected by the driver.
#[interrupt]
fn TIM4() {
    bbvga::tim4_hsync_isr()
}
