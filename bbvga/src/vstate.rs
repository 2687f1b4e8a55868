//! Vertical timing, maintained from the hsync interrupt.
//!
//! The pulse generator interrupts once per scanline. On each interrupt we
//! advance the line counter and, on the two lines where the vertical sync
//! pulse begins and ends, drive the vsync pin. That's all. In particular the
//! handler never draws, never waits, and never calls out to application code:
//! it preempts the pacer, and anything it spends comes straight out of the
//! pacer's budget for the line.
//!
//! The vertical phase (sync, porches, active video) is never stored. It is
//! recomputed from the line number wherever it's needed, so there is exactly
//! one piece of mutable state to keep consistent.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::hw::{ScanlineTimer, SyncPin};
use crate::priority::Isr;
use crate::timing::Timing;

/// The current scanline number, counting from the top of the vertical
/// blanking interval.
///
/// There is one writer, the hsync interrupt, and any number of readers. No
/// ordering is needed beyond atomicity: the only thing readers ever do is
/// wait for the value to change, and a change that becomes visible a few
/// cycles late is indistinguishable from a slightly later interrupt.
#[derive(Debug)]
pub struct LineCounter(AtomicUsize);

impl LineCounter {
    pub const fn new() -> Self {
        LineCounter(AtomicUsize::new(0))
    }

    /// Reads the line currently being scanned.
    pub fn current(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    /// Records that the hardware has moved on to `line`. Only the interrupt
    /// handler may do this.
    pub fn store(&self, line: usize, _: &Isr) {
        self.0.store(line, Ordering::Relaxed)
    }

    /// Returns the counter to the top of the frame. Only valid while the
    /// interrupt that advances the counter is disabled.
    pub(crate) fn reset(&self) {
        self.0.store(0, Ordering::Relaxed)
    }
}

/// Vertical phase of a scanline.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum VPhase {
    /// Vertical sync pulse is asserted.
    Sync,
    /// Between the end of sync and the first visible line.
    BackPorch,
    /// Visible lines. The pacer only draws here.
    Active,
    /// Between the last visible line and the onset of sync, including the
    /// lines at the top of the count before sync begins.
    FrontPorch,
}

impl VPhase {
    /// Does scanout occur in this phase?
    pub fn is_displayed(self) -> bool {
        self == VPhase::Active
    }
}

/// Determines the vertical phase of `line`.
///
/// The thresholds in `timing` split `0..frame_lines` into four contiguous
/// ranges; the front porch wraps around the end of the frame.
pub fn phase(timing: &Timing, line: usize) -> VPhase {
    if line < timing.vsync_start_line {
        VPhase::FrontPorch
    } else if line < timing.vsync_end_line {
        VPhase::Sync
    } else if line < timing.video_start_line {
        VPhase::BackPorch
    } else if line < timing.video_end_line {
        VPhase::Active
    } else {
        VPhase::FrontPorch
    }
}

/// Level of the vsync pin (`true` for high) while scanning `line`.
pub fn sync_level(timing: &Timing, line: usize) -> bool {
    let asserted = phase(timing, line) == VPhase::Sync;
    asserted == timing.vsync_polarity.asserted_high()
}

/// Level to establish on the vsync pin before the pulse generator starts, when
/// the line counter is at zero.
pub fn initial_sync_level(timing: &Timing) -> bool {
    sync_level(timing, 0)
}

/// Line that follows `line`, wrapping to zero at the end of the frame.
///
/// Anything at or beyond the end of the frame wraps too, so a corrupt count
/// recovers within one line.
pub fn next_line(timing: &Timing, line: usize) -> usize {
    let next = line + 1;
    if next >= timing.frame_lines {
        0
    } else {
        next
    }
}

/// Edges produced on the vsync pin by a call to [`advance`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SyncEdge {
    /// Vertical sync pulse began.
    Onset,
    /// Vertical sync pulse ended.
    Release,
}

/// Handles one pulse of the horizontal generator.
///
/// Re-bases and acknowledges the timer, then moves `lines` on to the next
/// scanline, driving `vsync` if that line begins or ends the sync pulse.
/// Returns the edge produced, if any.
///
/// Sync levels are written outright rather than toggled, and only the two
/// threshold lines cause a write. A spurious extra call therefore skips one
/// line and nothing worse; the next frame wrap puts everything back.
pub fn advance<T, P>(
    timer: &mut T,
    vsync: &mut P,
    timing: &Timing,
    lines: &LineCounter,
    isr: &Isr,
) -> Option<SyncEdge>
where
    T: ScanlineTimer + ?Sized,
    P: SyncPin + ?Sized,
{
    timer.rebase();
    timer.acknowledge();

    let next = next_line(timing, lines.current());
    let asserted_high = timing.vsync_polarity.asserted_high();
    let edge = if next == timing.vsync_start_line {
        vsync.set_level(asserted_high);
        Some(SyncEdge::Onset)
    } else if next == timing.vsync_end_line {
        vsync.set_level(!asserted_high);
        Some(SyncEdge::Release)
    } else {
        None
    };

    lines.store(next, isr);
    edge
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{Polarity, SVGA_800_600, VGA_640_480};

    #[derive(Default)]
    struct Timer {
        log: Vec<&'static str>,
    }

    impl ScanlineTimer for Timer {
        fn rebase(&mut self) {
            self.log.push("rebase")
        }
        fn acknowledge(&mut self) {
            self.log.push("ack")
        }
    }

    struct Pin {
        high: bool,
        falls: usize,
        rises: usize,
        writes: usize,
    }

    impl Pin {
        fn new(high: bool) -> Self {
            Pin {
                high,
                falls: 0,
                rises: 0,
                writes: 0,
            }
        }
    }

    impl SyncPin for Pin {
        fn set_high(&mut self) {
            if !self.high {
                self.rises += 1;
            }
            self.high = true;
            self.writes += 1;
        }
        fn set_low(&mut self) {
            if self.high {
                self.falls += 1;
            }
            self.high = false;
            self.writes += 1;
        }
    }

    fn isr() -> Isr {
        unsafe { Isr::new() }
    }

    #[test]
    fn phases_partition_frame() {
        for timing in &[VGA_640_480, SVGA_800_600] {
            let mut counts = [0; 4];
            let mut transitions = 0;
            let mut prev = phase(timing, timing.frame_lines - 1);
            for line in 0..timing.frame_lines {
                let p = phase(timing, line);
                let slot = match p {
                    VPhase::Sync => 0,
                    VPhase::BackPorch => 1,
                    VPhase::Active => 2,
                    VPhase::FrontPorch => 3,
                };
                counts[slot] += 1;
                if p != prev {
                    transitions += 1;
                }
                prev = p;
            }
            assert_eq!(counts.iter().sum::<usize>(), timing.frame_lines);
            assert_eq!(counts[0], timing.vsync_end_line - timing.vsync_start_line);
            assert_eq!(counts[2], timing.video_lines());
            // Each phase is one contiguous run around the circle.
            assert_eq!(transitions, 4);
        }
    }

    #[test]
    fn reference_phases() {
        let t = &VGA_640_480;
        assert_eq!(phase(t, 0), VPhase::FrontPorch);
        assert_eq!(phase(t, 1), VPhase::Sync);
        assert_eq!(phase(t, 2), VPhase::Sync);
        assert_eq!(phase(t, 3), VPhase::BackPorch);
        assert_eq!(phase(t, 33), VPhase::BackPorch);
        assert_eq!(phase(t, 34), VPhase::Active);
        assert_eq!(phase(t, 513), VPhase::Active);
        assert_eq!(phase(t, 514), VPhase::FrontPorch);
        assert_eq!(phase(t, 527), VPhase::FrontPorch);
        assert!(phase(t, 100).is_displayed());
        assert!(!phase(t, 10).is_displayed());
    }

    #[test]
    fn sync_low_only_during_pulse() {
        let t = &VGA_640_480;
        for line in 0..t.frame_lines {
            let in_pulse = line >= t.vsync_start_line && line < t.vsync_end_line;
            assert_eq!(sync_level(t, line), !in_pulse, "line {}", line);
        }
        assert!(initial_sync_level(t));
        // Positive polarity inverts.
        assert!(sync_level(&SVGA_800_600, 2));
        assert!(!initial_sync_level(&SVGA_800_600));
    }

    #[test]
    fn one_pulse_per_line_with_wrap() {
        let t = &VGA_640_480;
        let lines = LineCounter::new();
        let mut timer = Timer::default();
        let mut pin = Pin::new(initial_sync_level(t));
        let isr = isr();

        let mut returns_to_zero = 0;
        for pulse in 1..=2 * t.frame_lines {
            let before = lines.current();
            advance(&mut timer, &mut pin, t, &lines, &isr);
            let after = lines.current();
            if before == t.frame_lines - 1 {
                assert_eq!(after, 0);
            } else {
                assert_eq!(after, before + 1);
            }
            assert!(after < t.frame_lines);
            if after == 0 {
                returns_to_zero += 1;
                assert_eq!(pulse % t.frame_lines, 0);
            }
        }
        assert_eq!(returns_to_zero, 2);
    }

    #[test]
    fn pin_tracks_line_for_full_frame() {
        let t = &VGA_640_480;
        let lines = LineCounter::new();
        let mut timer = Timer::default();
        let mut pin = Pin::new(initial_sync_level(t));
        let isr = isr();

        let mut onsets = 0;
        let mut releases = 0;
        for _ in 0..t.frame_lines {
            match advance(&mut timer, &mut pin, t, &lines, &isr) {
                Some(SyncEdge::Onset) => onsets += 1,
                Some(SyncEdge::Release) => releases += 1,
                None => (),
            }
            assert_eq!(pin.high, sync_level(t, lines.current()));
        }
        assert_eq!(lines.current(), 0);
        assert_eq!((onsets, releases), (1, 1));
        assert_eq!((pin.falls, pin.rises), (1, 1));
        // Sync is only written at the two thresholds.
        assert_eq!(pin.writes, 2);
    }

    #[test]
    fn timer_rebased_then_acknowledged_every_pulse() {
        let t = &VGA_640_480;
        let lines = LineCounter::new();
        let mut timer = Timer::default();
        let mut pin = Pin::new(true);
        let isr = isr();

        for _ in 0..3 {
            advance(&mut timer, &mut pin, t, &lines, &isr);
        }
        assert_eq!(
            timer.log,
            ["rebase", "ack", "rebase", "ack", "rebase", "ack"]
        );
    }

    #[test]
    fn spurious_pulse_costs_one_line() {
        let t = &VGA_640_480;
        let lines = LineCounter::new();
        let mut timer = Timer::default();
        let mut pin = Pin::new(initial_sync_level(t));
        let isr = isr();

        // Fire twice for line 1: we land on line 2, still in sync.
        advance(&mut timer, &mut pin, t, &lines, &isr);
        advance(&mut timer, &mut pin, t, &lines, &isr);
        assert_eq!(lines.current(), 2);
        assert!(!pin.high);

        // The rest of the frame proceeds normally, one line short.
        for _ in 2..t.frame_lines {
            advance(&mut timer, &mut pin, t, &lines, &isr);
            assert_eq!(pin.high, sync_level(t, lines.current()));
        }
        assert_eq!(lines.current(), 0);
        assert_eq!((pin.falls, pin.rises), (1, 1));
    }

    #[test]
    fn corrupt_count_recovers() {
        let t = &VGA_640_480;
        let lines = LineCounter::new();
        let isr = isr();
        lines.store(10_000, &isr);
        advance(&mut Timer::default(), &mut Pin::new(true), t, &lines, &isr);
        assert_eq!(lines.current(), 0);
    }

    #[test]
    fn sync_at_line_zero_is_entered_by_wrap() {
        let t = Timing {
            vsync_start_line: 0,
            vsync_end_line: 2,
            video_start_line: 10,
            video_end_line: 20,
            frame_lines: 25,
            vsync_polarity: Polarity::Positive,
            ..VGA_640_480
        };
        assert_eq!(t.check(), Ok(()));

        let lines = LineCounter::new();
        let mut timer = Timer::default();
        let mut pin = Pin::new(initial_sync_level(&t));
        assert!(pin.high);
        let isr = isr();

        for _ in 0..2 * t.frame_lines {
            advance(&mut timer, &mut pin, &t, &lines, &isr);
            assert_eq!(pin.high, sync_level(&t, lines.current()));
        }
        assert_eq!((pin.rises, pin.falls), (2, 2));
    }
}
