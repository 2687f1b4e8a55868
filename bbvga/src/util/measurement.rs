//! Timing waveforms on spare GPIOs, compiled out unless the `measurement`
//! feature is set.
//!
//! This is a debug facility and ignores hardware ownership entirely. If your
//! application uses C8-C10 for something else, don't turn it on.
//!
//! Signals map to pins as follows:
//!
//! - A: C8, high while the hsync interrupt handler runs.
//! - B: C9, high while the pacer is writing a line.
//! - C: C10, high while the pacer waits out the end of a line.
//!
//! On the host the signals always compile to nothing.

/// Pin number of signal A on port C; B and C follow it.
#[cfg(all(target_os = "none", feature = "measurement"))]
const FIRST_PIN: u32 = 8;

/// Powers on GPIOC and makes C8-C10 push-pull outputs. Does nothing without
/// the `measurement` feature.
///
/// # Safety
///
/// This read-modify-writes RCC and GPIOC registers. Call it before enabling
/// any interrupt that touches either, e.g. early in `main`.
pub unsafe fn init() {
    #[cfg(all(target_os = "none", feature = "measurement"))]
    {
        use stm32f4::stm32f407 as device;
        let rcc = &*device::RCC::ptr();
        let gpioc = &*device::GPIOC::ptr();

        rcc.ahb1enr.modify(|_, w| w.gpiocen().set_bit());

        // Two bits per pin in each of these.
        let mask = 0b11_11_11 << (FIRST_PIN * 2);
        let output = 0b01_01_01 << (FIRST_PIN * 2);
        gpioc.pupdr.modify(|r, w| w.bits(r.bits() & !mask));
        gpioc.ospeedr.modify(|r, w| w.bits(r.bits() | mask));
        gpioc.moder.modify(|r, w| w.bits((r.bits() & !mask) | output));
    }
}

#[cfg(all(target_os = "none", feature = "measurement"))]
fn write_bsrr(bits: u32) {
    use stm32f4::stm32f407 as device;
    // Safety: BSRR writes are atomic, and only touch the pins named.
    unsafe { (*device::GPIOC::ptr()).bsrr.write(|w| w.bits(bits)) }
}

macro_rules! signal {
    ($set:ident, $set_doc:expr, $clear:ident, $clear_doc:expr, $offset:expr) => {
        #[doc = $set_doc]
        #[inline(always)]
        pub fn $set() {
            #[cfg(all(target_os = "none", feature = "measurement"))]
            write_bsrr(1 << (FIRST_PIN + $offset));
        }

        #[doc = $clear_doc]
        #[inline(always)]
        pub fn $clear() {
            #[cfg(all(target_os = "none", feature = "measurement"))]
            write_bsrr(1 << (FIRST_PIN + $offset + 16));
        }
    };
}

signal!(sig_a_set, "Raises signal A.", sig_a_clear, "Lowers signal A.", 0);
signal!(sig_b_set, "Raises signal B.", sig_b_clear, "Lowers signal B.", 1);
signal!(sig_c_set, "Raises signal C.", sig_c_clear, "Lowers signal C.", 2);
