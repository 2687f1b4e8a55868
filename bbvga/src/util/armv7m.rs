//! NVIC operations that take effect before they return.
//!
//! `cortex_m`'s NVIC calls only *request* a change: the write can still be in
//! flight when the next instruction runs. Following the ARM barrier
//! programming guide, we follow each one with a DMB and an ISB, so that by the
//! time these functions return, a disabled interrupt can no longer preempt us
//! and an enabled, pending one has already had its chance to run.

use cortex_m::interrupt::Nr;
use cortex_m::peripheral::NVIC;

fn settle() {
    cortex_m::asm::dmb();
    cortex_m::asm::isb();
}

pub fn enable_irq(nvic: &mut NVIC, irq: impl Nr) {
    nvic.enable(irq);
    settle();
}

pub fn disable_irq(nvic: &mut NVIC, irq: impl Nr) {
    nvic.disable(irq);
    settle();
}

/// Drops a pending request for `irq`. Hardware that is still raising the
/// request will pend it again.
pub fn clear_pending_irq(irq: impl Nr) {
    NVIC::unpend(irq);
    settle();
}
