//! Definition of display timing and modes.

use crate::vstate::{self, VPhase};

/// Defines the timing parameters for a video mode.
///
/// The horizontal and vertical timing information are each expressed
/// differently, so that each can be consumed efficiently by the
/// implementation. Horizontal parameters are in nanoseconds, because that's
/// what the pulse generator gets programmed with; vertical parameters are in
/// scanlines, because that's what the interrupt handler counts.
///
/// Within a line, the pulse event marks the end of the horizontal sync pulse.
/// From there the line runs back porch, visible video, front porch, and then
/// the next sync pulse.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// Total length of a scanline, including blanking. This is the period of
    /// the horizontal pulse generator.
    pub line_ns: u32,
    /// Length of horizontal sync pulse.
    pub sync_ns: u32,
    /// Time between end of sync and start of video (the "back porch").
    pub back_porch_ns: u32,
    /// Length of the visible part of the line. The pacer's work for one line
    /// has to fit in here.
    pub video_ns: u32,
    /// Polarity of horizontal sync pulse.
    pub hsync_polarity: Polarity,

    /// Scanline number of onset of vertical sync pulse, numbered from the
    /// line after the frame wraps.
    pub vsync_start_line: usize,
    /// Scanline number of end of vertical sync pulse, which is also the start
    /// of the vertical back porch.
    pub vsync_end_line: usize,
    /// Scanline number of the first line of active video.
    pub video_start_line: usize,
    /// Scanline number of the first line *after* active video, which starts
    /// the vertical front porch.
    pub video_end_line: usize,
    /// Total number of lines per frame. The line counter wraps back to zero
    /// when it would reach this value.
    pub frame_lines: usize,
    /// Polarity of the vertical sync pulse.
    pub vsync_polarity: Polarity,
}

/// Reasons a `Timing` can't be used.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimingError {
    /// The vertical thresholds aren't in sync, back porch, video, front porch
    /// order, or one of the sync or video phases is empty.
    LinesOutOfOrder,
    /// A vertical threshold lies past the end of the frame.
    LineOutsideFrame,
    /// The horizontal sync pulse is empty or fills the entire line.
    BadSyncWidth,
    /// Sync, back porch and video don't fit in the line period.
    HorizontalOverflow,
}

impl Timing {
    /// Checks that the thresholds partition the frame and the horizontal
    /// intervals fit within the line.
    pub fn check(&self) -> Result<(), TimingError> {
        if !(self.vsync_start_line < self.vsync_end_line
            && self.vsync_end_line <= self.video_start_line
            && self.video_start_line < self.video_end_line)
        {
            return Err(TimingError::LinesOutOfOrder);
        }
        if self.video_end_line > self.frame_lines {
            return Err(TimingError::LineOutsideFrame);
        }
        if self.sync_ns == 0 || self.sync_ns >= self.line_ns {
            return Err(TimingError::BadSyncWidth);
        }
        let used = u64::from(self.sync_ns)
            + u64::from(self.back_porch_ns)
            + u64::from(self.video_ns);
        if used > u64::from(self.line_ns) {
            return Err(TimingError::HorizontalOverflow);
        }
        Ok(())
    }

    /// Vertical phase of `line` under this timing.
    pub fn phase(&self, line: usize) -> VPhase {
        vstate::phase(self, line)
    }

    /// Number of visible lines per frame.
    pub fn video_lines(&self) -> usize {
        self.video_end_line - self.video_start_line
    }

    /// Length of the horizontal front porch, i.e. whatever is left of the line
    /// after sync, back porch and video.
    pub fn front_porch_ns(&self) -> u32 {
        self.line_ns
            .saturating_sub(self.sync_ns)
            .saturating_sub(self.back_porch_ns)
            .saturating_sub(self.video_ns)
    }
}

/// Converts a duration in nanoseconds into cycles of a clock running at
/// `clock_hz`, rounding to nearest.
pub fn ticks(ns: u32, clock_hz: u32) -> u32 {
    let t = (u64::from(ns) * u64::from(clock_hz) + 500_000_000) / 1_000_000_000;
    t as u32
}

/// Polarity of a sync pulse, and, by implication, the idle state of the sync
/// signal.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Polarity {
    Positive = 0, // note: value assignments for cheaper timer configuration
    Negative = 1,
}

impl Polarity {
    /// Level of the sync output while the pulse is asserted.
    pub fn asserted_high(self) -> bool {
        self == Polarity::Positive
    }
}

/// How the pacer spends the visible part of each line.
///
/// Each column is one write to the color pins, so the width of a column is
/// set by how fast the CPU can loop, not by any clock. Tune `columns` until a
/// line fits within the horizontal video time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pacing {
    /// Blank column clocks emitted before the first visible column, to push
    /// the picture right, out of the back porch.
    pub lead_in: usize,
    /// Visible columns per line.
    pub columns: usize,
}

impl Pacing {
    pub const fn new(columns: usize) -> Self {
        Pacing {
            lead_in: 0,
            columns,
        }
    }

    pub const fn with_lead_in(self, lead_in: usize) -> Self {
        Pacing { lead_in, ..self }
    }
}

/// 640x480-ish at 59Hz: a 32us line and a 528-line frame, negative sync.
///
/// This is slightly slower than the 525-line industry mode, but sits well
/// within what monitors lock onto, and the round line period makes the
/// pulse generator trivial to program. Sync is asserted for lines 1 and 2,
/// active video runs from line 34 through 513.
pub static VGA_640_480: Timing = Timing {
    line_ns: 32_000,
    sync_ns: 4_000,
    back_porch_ns: 1_900,
    video_ns: 25_400,
    hsync_polarity: Polarity::Negative,

    vsync_start_line: 1,
    vsync_end_line: 3,
    video_start_line: 34,
    video_end_line: 34 + 480,
    frame_lines: 528,
    vsync_polarity: Polarity::Negative,
};

/// Industry standard 800x600 60Hz timing.
pub static SVGA_800_600: Timing = Timing {
    line_ns: 26_400,
    sync_ns: 3_200,
    back_porch_ns: 2_200,
    video_ns: 20_000,
    hsync_polarity: Polarity::Positive,

    vsync_start_line: 1,
    vsync_end_line: 1 + 4,
    video_start_line: 1 + 4 + 23,
    video_end_line: 1 + 4 + 23 + 600,
    frame_lines: 1 + 4 + 23 + 600,
    vsync_polarity: Polarity::Positive,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert_eq!(VGA_640_480.check(), Ok(()));
        assert_eq!(SVGA_800_600.check(), Ok(()));
        assert_eq!(VGA_640_480.video_lines(), 480);
        assert_eq!(SVGA_800_600.video_lines(), 600);
        assert_eq!(VGA_640_480.phase(34), VPhase::Active);
        assert_eq!(SVGA_800_600.phase(0), VPhase::FrontPorch);
    }

    #[test]
    fn unordered_lines_rejected() {
        let t = Timing {
            vsync_end_line: 40,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Err(TimingError::LinesOutOfOrder));

        let t = Timing {
            video_end_line: 34,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Err(TimingError::LinesOutOfOrder));
    }

    #[test]
    fn video_past_frame_rejected() {
        let t = Timing {
            frame_lines: 500,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Err(TimingError::LineOutsideFrame));
    }

    #[test]
    fn horizontal_budget_enforced() {
        let t = Timing {
            video_ns: 27_000,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Err(TimingError::HorizontalOverflow));

        let t = Timing {
            sync_ns: 0,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Err(TimingError::BadSyncWidth));
    }

    #[test]
    fn front_porch_is_remainder() {
        assert_eq!(VGA_640_480.front_porch_ns(), 700);
        assert_eq!(SVGA_800_600.front_porch_ns(), 1_000);
    }

    #[test]
    fn tick_conversion() {
        assert_eq!(ticks(32_000, 16_000_000), 512);
        assert_eq!(ticks(4_000, 16_000_000), 64);
        // 26.4us at 16MHz is 422.4 ticks, rounds down.
        assert_eq!(ticks(26_400, 16_000_000), 422);
        // 1.9us at 16MHz is 30.4.
        assert_eq!(ticks(1_900, 16_000_000), 30);
        assert_eq!(ticks(0, 16_000_000), 0);
    }

    #[test]
    fn polarity_levels() {
        assert!(Polarity::Positive.asserted_high());
        assert!(!Polarity::Negative.asserted_high());
    }
}
