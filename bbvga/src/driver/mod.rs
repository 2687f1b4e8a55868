//! STM32F407 binding.
//!
//! TIM4 runs free at the line rate, generating horizontal sync on PB6 (its
//! channel 1 output) and raising its update interrupt at the end of each sync
//! pulse. The interrupt handler drives vertical sync on PB7. The three color
//! signals are PE8 (red), PE9 (green) and PE10 (blue).
//!
//! Everything runs from the reset clock, the 16 MHz internal oscillator.

mod isr;
mod pins;

pub use self::isr::tim4_hsync_isr;

use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::peripheral as cm;
use stm32f4::stm32f407 as device;

use crate::content::Content;
use crate::hw::{ColorOut, SyncPin};
use crate::pacer::Pacer;
use crate::priority::Thread;
use crate::timing::{self, Pacing, Polarity, Timing, TimingError};
use crate::util::armv7m::{clear_pending_irq, disable_irq, enable_irq};
use crate::util::loan::IsrLoan;
use crate::util::measurement;
use crate::vstate::{self, LineCounter};

use self::pins::{ColorPins, VsyncPin};

/// Frequency of TIM4's input clock: HSI, undivided.
pub const TIMER_CLOCK_HZ: u32 = 16_000_000;

// TIM4 register values that the svd doesn't give us names for.
const CR1_URS: u32 = 1 << 2;
const CR1_ARPE: u32 = 1 << 7;
/// OC1M = PWM mode 2 (output active once the count passes CCR1), with
/// preload.
const CCMR1_OC1_PWM2: u32 = (0b111 << 4) | (1 << 3);

/// Driver handle.
///
/// Get one from [`init`] or [`take_hardware`]; only one ever exists. The type
/// parameter tracks how far set-up has progressed:
///
/// - `Vga<Idle>` has hardware but isn't generating anything.
///   [`configure_timing`] consumes it and returns a `Vga<Sync>`.
/// - `Vga<Sync>` is generating sync. [`scan_out`] turns it into a picture.
///
/// [`init`]: fn.init.html
/// [`take_hardware`]: fn.take_hardware.html
/// [`configure_timing`]: #method.configure_timing
/// [`scan_out`]: #method.scan_out
pub struct Vga<S> {
    nvic: cm::NVIC,
    rcc: device::RCC,
    gpioe: device::GPIOE,

    mode_state: S,
}

/// Driver mode after initialization, before [`configure_timing`].
///
/// [`configure_timing`]: struct.Vga.html#method.configure_timing
pub struct Idle {
    tim4: device::TIM4,
    gpiob: device::GPIOB,
}

/// Driver mode once sync is running.
pub struct Sync {
    timing: Timing,
}

/// Hardware lent to the hsync ISR.
struct HsyncHw {
    tim4: device::TIM4,
    gpiob: device::GPIOB,
    timing: Timing,
}

static HSYNC: IsrLoan<HsyncHw> = IsrLoan::new();

/// Current scanline, counting from the top of vertical blanking. Written by
/// the ISR, read by everyone else.
static LINE: LineCounter = LineCounter::new();

/// Set once a driver instance exists. There's no teardown, so there can only
/// ever be one.
static DRIVER_INIT_FLAG: AtomicBool = AtomicBool::new(false);

/// Operations valid in any driver state.
impl<S> Vga<S> {
    /// Disables video output by floating the color pins with pulldowns.
    pub fn video_off(&self) {
        self.gpioe.pupdr.modify(|_, w| {
            w.pupdr8()
                .pull_down()
                .pupdr9()
                .pull_down()
                .pupdr10()
                .pull_down()
        });
        self.gpioe.moder.modify(|_, w| {
            w.moder8().input().moder9().input().moder10().input()
        });
    }

    /// Enables video output, starting from black.
    ///
    /// This isn't synchronized to anything. Pins go live wherever the beam
    /// happens to be.
    pub fn video_on(&self) {
        ColorPins(&self.gpioe).blank();
        self.gpioe.pupdr.modify(|_, w| {
            w.pupdr8()
                .floating()
                .pupdr9()
                .floating()
                .pupdr10()
                .floating()
        });
        // Edges are what we're selling here.
        self.gpioe.ospeedr.modify(|_, w| {
            w.ospeedr8()
                .very_high_speed()
                .ospeedr9()
                .very_high_speed()
                .ospeedr10()
                .very_high_speed()
        });
        self.gpioe.moder.modify(|_, w| {
            w.moder8().output().moder9().output().moder10().output()
        });
    }
}

impl Vga<Idle> {
    /// Starts generating sync with `timing`.
    ///
    /// Programs TIM4 for the line period and sync width, sets vertical sync to
    /// its idle level with the line counter at zero, hands the timer and sync
    /// port to the interrupt handler, and lets it go.
    ///
    /// Fails without touching anything if `timing` doesn't hold together.
    pub fn configure_timing(
        mut self,
        timing: &Timing,
    ) -> Result<Vga<Sync>, TimingError> {
        timing.check()?;
        let line_ticks = timing::ticks(timing.line_ns, TIMER_CLOCK_HZ);
        let sync_ticks = timing::ticks(timing.sync_ns, TIMER_CLOCK_HZ);
        if sync_ticks == 0 || sync_ticks >= line_ticks {
            return Err(TimingError::BadSyncWidth);
        }

        disable_irq(&mut self.nvic, device::Interrupt::TIM4);
        self.rcc.apb1rstr.modify(|_, w| w.tim4rst().set_bit());
        cortex_m::asm::dsb();
        clear_pending_irq(device::Interrupt::TIM4);
        self.rcc.apb1rstr.modify(|_, w| w.tim4rst().clear_bit());
        cortex_m::asm::dsb();

        let Idle { tim4, gpiob } = self.mode_state;

        // Count CPU clocks.
        tim4.psc.write(|w| unsafe { w.bits(0) });
        tim4.arr.write(|w| w.arr().bits(line_ticks - 1));
        // Sync occupies the end of the period, so the update event (and our
        // interrupt) lands on its trailing edge.
        tim4.ccr1.write(|w| w.ccr1().bits(line_ticks - sync_ticks));
        tim4.ccmr1_output.write(|w| unsafe { w.bits(CCMR1_OC1_PWM2) });
        tim4.ccer.write(|w| {
            w.cc1e()
                .set_bit()
                .cc1p()
                .bit(timing.hsync_polarity == Polarity::Negative)
        });
        // Only overflow raises the interrupt, not the UG below.
        tim4.cr1.write(|w| unsafe { w.bits(CR1_URS | CR1_ARPE) });
        tim4.egr.write(|w| w.ug().set_bit());
        tim4.sr.write(|w| w.uif().clear_bit());
        tim4.dier.write(|w| w.uie().set_bit());

        VsyncPin(&gpiob).set_level(vstate::initial_sync_level(timing));
        LINE.reset();
        sync_on(&gpiob);

        let hw = HsyncHw {
            tim4,
            gpiob,
            timing: *timing,
        };
        if HSYNC.donate(hw).is_err() {
            panic!("hsync hardware already donated");
        }

        // The ISR can't run yet, so this borrow can't collide with it.
        match HSYNC.borrow() {
            Ok(hw) => hw.tim4.cr1.modify(|_, w| w.cen().set_bit()),
            Err(_) => panic!("hsync hardware went missing"),
        }
        enable_irq(&mut self.nvic, device::Interrupt::TIM4);

        Ok(Vga {
            nvic: self.nvic,
            rcc: self.rcc,
            gpioe: self.gpioe,
            mode_state: Sync { timing: *timing },
        })
    }
}

impl Vga<Sync> {
    /// Scanline currently being generated.
    pub fn line(&self) -> usize {
        LINE.current()
    }

    /// The timing sync is being generated with.
    pub fn timing(&self) -> &Timing {
        &self.mode_state.timing
    }

    /// Turns on the color outputs and races the beam forever, asking `content`
    /// for each column of each visible line.
    ///
    /// # Panics
    ///
    /// If called from an interrupt handler.
    pub fn scan_out<C>(self, pacing: Pacing, content: &mut C) -> !
    where
        C: Content + ?Sized,
    {
        let thread = match Thread::new_checked() {
            Some(t) => t,
            None => panic!("scan_out from interrupt"),
        };
        self.video_on();
        Pacer::new(&self.mode_state.timing, &LINE, ColorPins(&self.gpioe), pacing)
            .run(content, &thread)
    }
}

/// Initializes the driver using the given hardware.
///
/// ```ignore
/// let mut cp = cortex_m::peripheral::Peripherals::take().unwrap();
/// let p = stm32f4::stm32f407::Peripherals::take().unwrap();
///
/// let vga = bbvga::init(
///     cp.NVIC,
///     p.FLASH,
///     &p.DBG,
///     p.RCC,
///     p.GPIOB,
///     p.GPIOE,
///     p.TIM4,
/// );
/// ```
///
/// The driver comes back [`Idle`], with outputs off. Use this rather than
/// [`take_hardware`] to keep the peripherals the driver doesn't need.
///
/// # Panics
///
/// If called twice.
///
/// [`Idle`]: struct.Idle.html
/// [`take_hardware`]: fn.take_hardware.html
pub fn init(
    mut nvic: cm::NVIC,
    flash: device::FLASH,
    dbg: &device::DBG,
    rcc: device::RCC,
    gpiob: device::GPIOB,
    gpioe: device::GPIOE,
    tim4: device::TIM4,
) -> Vga<Idle> {
    let previous_instance = DRIVER_INIT_FLAG.swap(true, Ordering::SeqCst);
    assert_eq!(previous_instance, false);

    // Safety: interrupts that could touch RCC or GPIOC aren't running yet.
    unsafe { measurement::init() }

    disable_irq(&mut nvic, device::Interrupt::TIM4);

    rcc.ahb1enr
        .modify(|_, w| w.gpioben().set_bit().gpioeen().set_bit());
    rcc.apb1enr.modify(|_, w| w.tim4en().set_bit());
    cortex_m::asm::dsb();

    // Safety: our interrupt is disabled, so changing its priority can't race.
    unsafe {
        nvic.set_priority(device::Interrupt::TIM4, 0x00);
    }

    // Flash wait states show up as jitter in the column loop.
    flash.acr.modify(|_, w| {
        w.dcen().set_bit().icen().set_bit().prften().set_bit()
    });

    // Freeze the line rate when the debugger halts us.
    dbg.dbgmcu_apb1_fz
        .modify(|_, w| w.dbg_tim4_stop().set_bit());

    let vga = Vga {
        nvic,
        rcc,
        gpioe,
        mode_state: Idle { tim4, gpiob },
    };
    sync_off(&vga.mode_state.gpiob);
    vga.video_off();
    vga
}

/// Starts up the driver, taking all the hardware.
///
/// Shorthand for [`init`] when video is the only thing you're doing.
///
/// [`init`]: fn.init.html
pub fn take_hardware() -> Vga<Idle> {
    let cp = cortex_m::peripheral::Peripherals::take().unwrap();
    let p = device::Peripherals::take().unwrap();

    init(cp.NVIC, p.FLASH, &p.DBG, p.RCC, p.GPIOB, p.GPIOE, p.TIM4)
}

/// Parks both sync outputs as pulled-down inputs.
fn sync_off(gpiob: &device::GPIOB) {
    gpiob
        .moder
        .modify(|_, w| w.moder6().input().moder7().input());
    gpiob
        .pupdr
        .modify(|_, w| w.pupdr6().pull_down().pupdr7().pull_down());
}

/// PB6 to TIM4_CH1 (AF2), PB7 to a plain output.
fn sync_on(gpiob: &device::GPIOB) {
    gpiob
        .ospeedr
        .modify(|_, w| w.ospeedr6().high_speed().ospeedr7().high_speed());
    gpiob
        .pupdr
        .modify(|_, w| w.pupdr6().floating().pupdr7().floating());
    gpiob.afrl.modify(|_, w| w.afrl6().af2());
    gpiob
        .moder
        .modify(|_, w| w.moder6().alternate().moder7().output());
}
