//! Eight-bar test card at 640x480, reporting its set-up over ITM.

#![no_std]
#![no_main]

#[cfg(feature = "panic-halt")]
extern crate panic_halt;
#[cfg(feature = "panic-itm")]
extern crate panic_itm;

use cortex_m::iprintln;
use stm32f4::stm32f407 as device;
use stm32f4::stm32f407::interrupt;

use bbvga::content::ColorBars;
use bbvga::timing::{self, VGA_640_480};
use bbvga::Pacing;

/// Column clocks across the visible line. Eight bars of eight.
const COLUMNS: usize = 64;

#[cortex_m_rt::entry]
fn main() -> ! {
    let mut cp = cortex_m::peripheral::Peripherals::take().unwrap();
    let p = device::Peripherals::take().unwrap();
    let stim = &mut cp.ITM.stim[0];

    let t = &VGA_640_480;
    iprintln!(
        stim,
        "line {} ticks, sync {} ticks, {} of {} lines visible",
        timing::ticks(t.line_ns, bbvga::TIMER_CLOCK_HZ),
        timing::ticks(t.sync_ns, bbvga::TIMER_CLOCK_HZ),
        t.video_lines(),
        t.frame_lines,
    );

    let vga = bbvga::init(cp.NVIC, p.FLASH, &p.DBG, p.RCC, p.GPIOB, p.GPIOE, p.TIM4);
    let vga = match vga.configure_timing(t) {
        Ok(vga) => vga,
        Err(e) => {
            iprintln!(stim, "timing rejected: {:?}", e);
            loop {}
        }
    };

    iprintln!(stim, "sync running, starting scan-out");
    vga.scan_out(Pacing::new(COLUMNS), &mut ColorBars { columns: COLUMNS })
}

/// Wires up the TIM4 handler expected by the driver.
#[interrupt]
fn TIM4() {
    bbvga::tim4_hsync_isr()
}
