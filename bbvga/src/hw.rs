//! The small slice of hardware the timing core needs.
//!
//! Peripheral setup (clocks, pin muxing, the pulse generator's period and
//! width, interrupt vectors) is the driver's business. The core only touches
//! hardware through these traits, at the two places it has to: the interrupt
//! handler, and the pacer's column loop.
//!
//! Every method here is expected to be a handful of instructions with no
//! waiting. Implementations are called from interrupt context or from inside
//! a per-column loop where a stray microsecond shows up on screen.

use crate::content::Rgb;

/// The per-line pulse generator, as seen from its interrupt handler.
pub trait ScanlineTimer {
    /// Re-establishes the counter baseline at a pulse boundary (halt, zero,
    /// restart) so that drift can't accumulate across lines.
    ///
    /// Generators that reload their counter in hardware at the event that
    /// raised the interrupt have nothing to do here.
    fn rebase(&mut self);

    /// Clears the event flag that raised the interrupt, so it doesn't
    /// immediately re-occur.
    fn acknowledge(&mut self);
}

/// A single digital output, used for vertical sync.
pub trait SyncPin {
    fn set_high(&mut self);
    fn set_low(&mut self);

    /// Drives the pin to `high`.
    fn set_level(&mut self, high: bool) {
        if high {
            self.set_high()
        } else {
            self.set_low()
        }
    }
}

/// The three color outputs.
pub trait ColorOut {
    /// Drives all three channels at once. Each call is one column clock.
    fn drive(&mut self, color: Rgb);

    /// Turns all three channels off.
    fn blank(&mut self) {
        self.drive(Rgb::BLACK)
    }
}

impl<T: ColorOut + ?Sized> ColorOut for &mut T {
    fn drive(&mut self, color: Rgb) {
        (**self).drive(color)
    }

    fn blank(&mut self) {
        (**self).blank()
    }
}
