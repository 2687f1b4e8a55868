//! Type-level representation of execution contexts.
//!
//! The scanline counter has exactly one writer (the hsync interrupt) and one
//! reader (the pacer in thread mode). Rather than trusting callers to respect
//! that, the operations that belong to each side demand a zero-sized token for
//! it. Tokens can only be minted inside this crate, at the points where we
//! actually know which context we're in: the ISR entry point, the driver's
//! scan-out loop, and the simulator.

use core::marker::PhantomData;

// Marker type used to cause things to stop being Sync/Send.
type NotSyncOrSend = PhantomData<*mut ()>;

/// The hsync interrupt. Holding one of these is permission to advance the
/// vertical state machine.
#[derive(Copy, Clone)]
pub struct Isr(NotSyncOrSend);

/// Thread mode execution occurs outside any interrupt handler. This is where
/// the pacer runs.
#[derive(Copy, Clone)]
pub struct Thread(NotSyncOrSend);

impl Isr {
    /// # Safety
    ///
    /// Only call this from the hsync interrupt handler, or from a simulation
    /// that models it. Two live writers would corrupt the line count.
    pub(crate) unsafe fn new() -> Self {
        Isr(PhantomData)
    }
}

impl Thread {
    pub(crate) unsafe fn new() -> Self {
        Thread(PhantomData)
    }
}

#[cfg(target_os = "none")]
impl Thread {
    /// Returns a `Thread` token only if called from thread priority.
    pub fn new_checked() -> Option<Self> {
        // Safety: reads of the ICSR are safe.
        let icsr = unsafe { &(*cortex_m::peripheral::SCB::ptr()).icsr }.read();
        // VECTACTIVE is zero in thread mode.
        if icsr & 0x1FF == 0 {
            Some(unsafe { Self::new() })
        } else {
            None
        }
    }
}
