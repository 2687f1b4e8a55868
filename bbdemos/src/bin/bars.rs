//! Red, green and blue bars down the left of the screen, sixteen column
//! clocks each, at 640x480.

#![no_std]
#![no_main]

#[cfg(feature = "panic-halt")]
extern crate panic_halt;
#[cfg(feature = "panic-itm")]
extern crate panic_itm;

use stm32f4::stm32f407::interrupt;

use bbvga::content::ChannelBars;
use bbvga::timing::VGA_640_480;
use bbvga::Pacing;

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut bars = ChannelBars::CLASSIC;

    bbvga::take_hardware()
        .configure_timing(&VGA_640_480)
        .unwrap()
        .scan_out(Pacing::new(bars.columns()), &mut bars)
}

/// Wires up the TIM4 handler expected by the driver.
#[interrupt]
fn TIM4() {
    bbvga::tim4_hsync_isr()
}
