//! The active-line pixel pacer.
//!
//! This is the thread-mode half of the driver. It watches the line counter
//! maintained by the hsync interrupt and, for each visible line, writes the
//! color pins once per column as fast as it can go, blanks them, and then
//! spins until the interrupt says the line is over. The speed of the column
//! loop *is* the pixel clock.
//!
//! Nothing here yields. Scheduler latency, or even a `wfi`, would land in the
//! middle of a scanline, so waiting is always a busy poll of the line counter.
//! Polls can be given an upper bound ([`SpinLimit`]) so that simulations and
//! tests notice a stuck counter instead of hanging; the driver never sets one.
//!
//! If drawing a line takes longer than the line does, the counter will have
//! already moved by the time we check it, the wait falls straight through, and
//! the next line simply starts late. That shows up on screen as a short or
//! ragged line and is tallied in the [`FrameReport`], but it isn't an error.

use crate::content::Content;
use crate::hw::ColorOut;
use crate::priority::Thread;
use crate::timing::{Pacing, Timing};
use crate::util::measurement;
use crate::vstate::{self, LineCounter};

/// Anything the pacer can poll for the current scanline.
pub trait LineSource {
    fn current_line(&self) -> usize;
}

impl LineSource for LineCounter {
    fn current_line(&self) -> usize {
        self.current()
    }
}

/// Upper bound on a busy-wait.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SpinLimit {
    /// Spin until the condition holds, however long that takes.
    Forever,
    /// Give up after this many polls that didn't satisfy the condition.
    Polls(u32),
}

/// A bounded spin ran out of polls.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Stalled {
    /// The line the counter was stuck on.
    pub line: usize,
    /// Polls spent before giving up.
    pub polls: u32,
}

/// Busy-waits until the line counter no longer reads `marker`.
///
/// Returns the number of polls that still saw `marker`. Zero means the line
/// had already ended when we got here, i.e. the caller overran it.
pub fn wait_for_line_change<L>(
    lines: &L,
    marker: usize,
    limit: SpinLimit,
) -> Result<u32, Stalled>
where
    L: LineSource + ?Sized,
{
    spin(lines, limit, |line| line != marker)
}

/// Busy-waits until the line counter reads exactly `target`.
///
/// Returns the number of polls that saw some other line.
pub fn wait_for_line<L>(
    lines: &L,
    target: usize,
    limit: SpinLimit,
) -> Result<u32, Stalled>
where
    L: LineSource + ?Sized,
{
    spin(lines, limit, |line| line == target)
}

fn spin<L>(
    lines: &L,
    limit: SpinLimit,
    done: impl Fn(usize) -> bool,
) -> Result<u32, Stalled>
where
    L: LineSource + ?Sized,
{
    let mut polls = 0u32;
    loop {
        let line = lines.current_line();
        if done(line) {
            return Ok(polls);
        }
        polls = polls.saturating_add(1);
        if let SpinLimit::Polls(max) = limit {
            if polls >= max {
                return Err(Stalled { line, polls });
            }
        }
    }
}

/// What happened during one frame.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameReport {
    /// Frame number, counting from zero when the pacer was created.
    pub frame: usize,
    /// Visible lines emitted.
    pub lines_drawn: usize,
    /// Lines whose drawing used up the entire line period, leaving nothing to
    /// wait for.
    pub late_lines: usize,
    /// The frame was cut short because drawing fell so far behind that the
    /// counter had left active video.
    pub truncated: bool,
}

/// Drives the color outputs in step with the line counter.
pub struct Pacer<'a, L: ?Sized, O> {
    timing: &'a Timing,
    lines: &'a L,
    out: O,
    pacing: Pacing,
    limit: SpinLimit,
    frame: usize,
}

impl<'a, L, O> Pacer<'a, L, O>
where
    L: LineSource + ?Sized,
    O: ColorOut,
{
    pub fn new(timing: &'a Timing, lines: &'a L, out: O, pacing: Pacing) -> Self {
        Pacer {
            timing,
            lines,
            out,
            pacing,
            limit: SpinLimit::Forever,
            frame: 0,
        }
    }

    /// Bounds every wait the pacer performs. Useful in simulation, where a
    /// counter that never moves should fail a test rather than hang it.
    pub fn with_spin_limit(self, limit: SpinLimit) -> Self {
        Pacer { limit, ..self }
    }

    /// Number of the next frame to be emitted.
    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn into_output(self) -> O {
        self.out
    }

    /// Emits one frame.
    ///
    /// Waits for the first line of active video, then emits exactly
    /// `video_lines()` lines, waiting out each one before starting the next.
    /// Once they're done, gives `content` its end-of-frame call and returns.
    ///
    /// If called partway through active video, this waits for the *next*
    /// frame; it never starts mid-picture.
    pub fn run_frame<C>(
        &mut self,
        content: &mut C,
        _: &Thread,
    ) -> Result<FrameReport, Stalled>
    where
        C: Content + ?Sized,
    {
        let timing = self.timing;
        let lines = self.lines;
        let pacing = self.pacing;
        let limit = self.limit;

        wait_for_line(lines, timing.video_start_line, limit)?;

        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        {
            // However we leave this block, don't leave color on the pins
            // going into blanking.
            let mut out = scopeguard::guard(&mut self.out, |out| out.blank());

            for row in 0..timing.video_lines() {
                let marker = lines.current_line();
                if !vstate::phase(timing, marker).is_displayed() {
                    report.truncated = true;
                    break;
                }

                measurement::sig_b_set();
                scan_line(&mut **out, content, row, pacing);
                measurement::sig_b_clear();

                measurement::sig_c_set();
                let waited = wait_for_line_change(lines, marker, limit)?;
                measurement::sig_c_clear();

                report.lines_drawn += 1;
                if waited == 0 {
                    report.late_lines += 1;
                }
            }
        }

        content.end_frame(self.frame);
        self.frame = self.frame.wrapping_add(1);
        Ok(report)
    }

    /// Emits frames forever.
    pub fn run<C>(mut self, content: &mut C, thread: &Thread) -> !
    where
        C: Content + ?Sized,
    {
        loop {
            // With no spin limit there's no way to stall, and a late or short
            // frame needs no handling beyond starting the next one.
            let _ = self.run_frame(content, thread);
        }
    }
}

/// Emits one line's worth of columns, finishing with the outputs blank.
fn scan_line<O, C>(out: &mut O, content: &mut C, row: usize, pacing: Pacing)
where
    O: ColorOut + ?Sized,
    C: Content + ?Sized,
{
    content.start_line(row);
    for _ in 0..pacing.lead_in {
        out.blank();
    }
    for column in 0..pacing.columns {
        out.drive(content.pixel(row, column));
    }
    out.blank();
}
