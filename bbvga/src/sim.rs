//! A deterministic stand-in for the hardware, for running the timing core on
//! the host.
//!
//! Time is counted in ticks. Every write to the color outputs and every poll of
//! the line counter costs one tick, which is a fair model of the real thing:
//! the pacer's column loop and its end-of-line spin are exactly what burn
//! cycles on the microcontroller. Every `ticks_per_line` ticks the simulated
//! pulse generator fires, and the *real* interrupt-side state machine
//! ([`vstate::advance`]) runs against simulated timer and sync pins.
//!
//! Along the way the simulator keeps score of the things that would be visible
//! on a monitor: sync edges, color written outside active video, and color
//! left lit when a line ends.
//!
//! Everything is interior-mutable behind shared references, so the pacer can
//! hold the simulator as its line source and its color output at once, just
//! as it holds a static counter and a GPIO port on hardware.

use core::cell::Cell;

use crate::content::Rgb;
use crate::hw::{ColorOut, ScanlineTimer, SyncPin};
use crate::pacer::LineSource;
use crate::priority::{Isr, Thread};
use crate::timing::Timing;
use crate::vstate::{self, LineCounter, SyncEdge};

/// Simulated pulse generator, sync pin and color pins.
pub struct Sim<'t> {
    timing: &'t Timing,
    lines: LineCounter,
    ticks_per_line: Cell<u32>,
    ticks: Cell<u32>,

    pulses: Cell<usize>,
    rebases: Cell<usize>,
    acks: Cell<usize>,

    vsync_high: Cell<bool>,
    onsets: Cell<usize>,
    releases: Cell<usize>,

    color: Cell<Rgb>,
    drives: Cell<usize>,
    stray_writes: Cell<usize>,
    bleeds: Cell<usize>,
}

impl<'t> Sim<'t> {
    /// Creates a simulator sitting at the top of line zero, with vsync at its
    /// initial level and the color outputs dark.
    ///
    /// `ticks_per_line` of zero is treated as one.
    pub fn new(timing: &'t Timing, ticks_per_line: u32) -> Self {
        Sim {
            timing,
            lines: LineCounter::new(),
            ticks_per_line: Cell::new(ticks_per_line.max(1)),
            ticks: Cell::new(0),
            pulses: Cell::new(0),
            rebases: Cell::new(0),
            acks: Cell::new(0),
            vsync_high: Cell::new(vstate::initial_sync_level(timing)),
            onsets: Cell::new(0),
            releases: Cell::new(0),
            color: Cell::new(Rgb::BLACK),
            drives: Cell::new(0),
            stray_writes: Cell::new(0),
            bleeds: Cell::new(0),
        }
    }

    pub fn set_ticks_per_line(&self, ticks: u32) {
        self.ticks_per_line.set(ticks.max(1))
    }

    /// Lets one tick pass, firing the pulse generator if a line has elapsed.
    pub fn tick(&self) {
        let t = self.ticks.get() + 1;
        if t >= self.ticks_per_line.get() {
            self.ticks.set(0);
            self.pulse();
        } else {
            self.ticks.set(t);
        }
    }

    /// Lets time pass until the generator has fired `n` times in total.
    pub fn run_until_pulses(&self, n: usize) {
        while self.pulses.get() < n {
            self.tick()
        }
    }

    /// Fires the hsync interrupt immediately, without disturbing the tick
    /// count. Calling this directly models a spurious interrupt.
    pub fn pulse(&self) -> Option<SyncEdge> {
        if !self.color.get().is_black() {
            bump(&self.bleeds);
        }

        // Safety: the simulator stands in for the interrupt here, and it
        // is the only thing that advances its own counter.
        let isr = unsafe { Isr::new() };
        let edge = vstate::advance(
            &mut SimTimer(self),
            &mut SimSync(self),
            self.timing,
            &self.lines,
            &isr,
        );
        match edge {
            Some(SyncEdge::Onset) => bump(&self.onsets),
            Some(SyncEdge::Release) => bump(&self.releases),
            None => (),
        }
        bump(&self.pulses);
        edge
    }

    /// Reads the current line without letting time pass.
    pub fn line(&self) -> usize {
        self.lines.current()
    }

    /// Color outputs wired to this simulator.
    pub fn colors(&self) -> SimColors<'_, 't> {
        SimColors(self)
    }

    /// The simulation plays the part of thread mode, too.
    pub fn thread(&self) -> Thread {
        // Safety: there is no interrupt context in a simulation other than
        // the one `pulse` models synchronously.
        unsafe { Thread::new() }
    }

    /// Number of times the generator has fired.
    pub fn pulses(&self) -> usize {
        self.pulses.get()
    }

    pub fn rebases(&self) -> usize {
        self.rebases.get()
    }

    pub fn acks(&self) -> usize {
        self.acks.get()
    }

    pub fn vsync_high(&self) -> bool {
        self.vsync_high.get()
    }

    /// Vertical sync pulses begun.
    pub fn onsets(&self) -> usize {
        self.onsets.get()
    }

    /// Vertical sync pulses ended.
    pub fn releases(&self) -> usize {
        self.releases.get()
    }

    /// Color currently on the pins.
    pub fn color(&self) -> Rgb {
        self.color.get()
    }

    /// Total writes to the color pins.
    pub fn drives(&self) -> usize {
        self.drives.get()
    }

    /// Writes of a lit color while the current line was outside active video.
    pub fn stray_writes(&self) -> usize {
        self.stray_writes.get()
    }

    /// Pulses that fired while a color was lit, smearing it through
    /// horizontal blanking.
    pub fn bleeds(&self) -> usize {
        self.bleeds.get()
    }
}

impl<'t> LineSource for Sim<'t> {
    fn current_line(&self) -> usize {
        self.tick();
        self.lines.current()
    }
}

/// The simulator's color outputs.
pub struct SimColors<'s, 't>(&'s Sim<'t>);

impl<'s, 't> ColorOut for SimColors<'s, 't> {
    fn drive(&mut self, color: Rgb) {
        let sim = self.0;
        if !color.is_black() && !vstate::phase(sim.timing, sim.line()).is_displayed() {
            bump(&sim.stray_writes);
        }
        sim.color.set(color);
        bump(&sim.drives);
        sim.tick();
    }
}

struct SimTimer<'s, 't>(&'s Sim<'t>);

impl<'s, 't> ScanlineTimer for SimTimer<'s, 't> {
    fn rebase(&mut self) {
        // Our generator can't drift; just note that we were asked.
        bump(&self.0.rebases)
    }

    fn acknowledge(&mut self) {
        bump(&self.0.acks)
    }
}

struct SimSync<'s, 't>(&'s Sim<'t>);

impl<'s, 't> SyncPin for SimSync<'s, 't> {
    fn set_high(&mut self) {
        self.0.vsync_high.set(true)
    }

    fn set_low(&mut self) {
        self.0.vsync_high.set(false)
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::VGA_640_480;

    #[test]
    fn pulses_every_line_period() {
        let sim = Sim::new(&VGA_640_480, 10);
        for _ in 0..9 {
            sim.tick();
        }
        assert_eq!(sim.pulses(), 0);
        sim.tick();
        assert_eq!(sim.pulses(), 1);
        assert_eq!(sim.line(), 1);

        sim.set_ticks_per_line(3);
        for _ in 0..6 {
            sim.tick();
        }
        assert_eq!(sim.line(), 3);
    }

    #[test]
    fn polling_costs_time() {
        let sim = Sim::new(&VGA_640_480, 4);
        let seen: Vec<usize> = (0..8).map(|_| sim.current_line()).collect();
        assert_eq!(seen, [0, 0, 0, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn two_frames_of_pulses() {
        let t = &VGA_640_480;
        let sim = Sim::new(t, 1);
        let mut zeros = 0;
        for _ in 0..2 * t.frame_lines {
            sim.tick();
            assert_eq!(sim.vsync_high(), vstate::sync_level(t, sim.line()));
            if sim.line() == 0 {
                zeros += 1;
            }
        }
        assert_eq!(zeros, 2);
        assert_eq!(sim.onsets(), 2);
        assert_eq!(sim.releases(), 2);
        assert_eq!(sim.rebases(), 2 * t.frame_lines);
        assert_eq!(sim.acks(), 2 * t.frame_lines);
    }

    #[test]
    fn vsync_low_exactly_during_pulse_lines() {
        let t = &VGA_640_480;
        let sim = Sim::new(t, 1);
        assert!(sim.vsync_high());
        let mut low_lines = vec![];
        for _ in 0..t.frame_lines {
            sim.tick();
            if !sim.vsync_high() {
                low_lines.push(sim.line());
            }
        }
        assert_eq!(low_lines, [1, 2]);
    }

    #[test]
    fn spurious_pulse_skips_a_line() {
        let sim = Sim::new(&VGA_640_480, 100);
        sim.run_until_pulses(10);
        assert_eq!(sim.line(), 10);
        sim.pulse();
        assert_eq!(sim.line(), 11);
        // The regular cadence carries on from where it was.
        sim.run_until_pulses(12);
        assert_eq!(sim.line(), 12);
    }

    #[test]
    fn lit_color_is_scored() {
        let sim = Sim::new(&VGA_640_480, 3);
        let mut colors = sim.colors();
        // Line 0 is front porch.
        colors.drive(Rgb::RED);
        assert_eq!(sim.stray_writes(), 1);
        colors.drive(Rgb::RED);
        assert_eq!(sim.bleeds(), 0);
        // This write's tick ends the line with red still showing.
        colors.drive(Rgb::RED);
        assert_eq!(sim.bleeds(), 1);
        assert_eq!(sim.stray_writes(), 3);

        colors.drive(Rgb::BLACK);
        assert_eq!(sim.drives(), 4);
        assert!(sim.color().is_black());
        assert_eq!(sim.stray_writes(), 3);
    }
}
