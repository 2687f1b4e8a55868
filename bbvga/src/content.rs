//! What to put on the color pins.
//!
//! The pacer owns *when* each column is emitted; a `Content` decides *what*.
//! Implementations are called once per column from inside the pacer's timed
//! loop, so they must be cheap: no allocation, no waiting, and ideally nothing
//! that doesn't inline to a few compares.

/// A color, as three binary channels packed into the low bits of a byte:
/// `0b0000_0BGR`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Rgb(u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0b000);
    pub const RED: Rgb = Rgb(0b001);
    pub const GREEN: Rgb = Rgb(0b010);
    pub const YELLOW: Rgb = Rgb(0b011);
    pub const BLUE: Rgb = Rgb(0b100);
    pub const MAGENTA: Rgb = Rgb(0b101);
    pub const CYAN: Rgb = Rgb(0b110);
    pub const WHITE: Rgb = Rgb(0b111);

    pub const fn new(red: bool, green: bool, blue: bool) -> Self {
        Rgb((red as u8) | (green as u8) << 1 | (blue as u8) << 2)
    }

    /// Constructs a color from its packed `0bBGR` representation. Bits above
    /// the bottom three are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Rgb(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn red(self) -> bool {
        self.0 & 0b001 != 0
    }

    pub fn green(self) -> bool {
        self.0 & 0b010 != 0
    }

    pub fn blue(self) -> bool {
        self.0 & 0b100 != 0
    }

    pub fn is_black(self) -> bool {
        self.0 == 0
    }

    /// Produces a GPIO bit set/reset word that drives three consecutive pins,
    /// starting with red at `first_pin`, to this color in a single store.
    ///
    /// Lit channels land in the low (set) half-word, dark channels in the high
    /// (reset) half-word, so stale color from the previous column is always
    /// cleared by the same write.
    pub fn bsrr(self, first_pin: u32) -> u32 {
        let lit = u32::from(self.0) << first_pin;
        let dark = u32::from(!self.0 & 0b111) << first_pin;
        lit | (dark << 16)
    }
}

/// A source of picture content for the pacer.
pub trait Content {
    /// Called before the first column of each visible line. `row` counts from
    /// zero at the top of active video.
    fn start_line(&mut self, _row: usize) {}

    /// Returns the color for one column of the current line.
    fn pixel(&mut self, row: usize, column: usize) -> Rgb;

    /// Called once the last visible line of frame number `frame` has been
    /// emitted. This runs during vertical blanking, which is the only time
    /// thread code has to spare; it still has to be done before the next
    /// frame's first visible line.
    fn end_frame(&mut self, _frame: usize) {}
}

impl<C: Content + ?Sized> Content for &mut C {
    fn start_line(&mut self, row: usize) {
        (**self).start_line(row)
    }

    fn pixel(&mut self, row: usize, column: usize) -> Rgb {
        (**self).pixel(row, column)
    }

    fn end_frame(&mut self, frame: usize) {
        (**self).end_frame(frame)
    }
}

/// Runs of pure red, then green, then blue, each a fixed number of column
/// clocks long, identical on every line.
///
/// This is the simplest thing that exercises all three channels and the
/// transitions between them, and is what you want on screen while tuning
/// `Pacing`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelBars {
    /// Column clocks spent on red, green, and blue respectively.
    pub pulses: [usize; 3],
}

impl ChannelBars {
    /// Sixteen column clocks per channel.
    pub const CLASSIC: ChannelBars = ChannelBars { pulses: [16, 16, 16] };

    /// Number of columns needed to show all three bars.
    pub fn columns(&self) -> usize {
        self.pulses.iter().sum()
    }
}

impl Content for ChannelBars {
    fn pixel(&mut self, _row: usize, column: usize) -> Rgb {
        let [r, g, b] = self.pulses;
        if column < r {
            Rgb::RED
        } else if column < r + g {
            Rgb::GREEN
        } else if column < r + g + b {
            Rgb::BLUE
        } else {
            Rgb::BLACK
        }
    }
}

/// Eight vertical bars of equal width, in the usual test-card order: white,
/// yellow, cyan, green, magenta, red, blue, black.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ColorBars {
    pub columns: usize,
}

const BAR_ORDER: [Rgb; 8] = [
    Rgb::WHITE,
    Rgb::YELLOW,
    Rgb::CYAN,
    Rgb::GREEN,
    Rgb::MAGENTA,
    Rgb::RED,
    Rgb::BLUE,
    Rgb::BLACK,
];

impl Content for ColorBars {
    fn pixel(&mut self, _row: usize, column: usize) -> Rgb {
        if column >= self.columns {
            return Rgb::BLACK;
        }
        BAR_ORDER[column * BAR_ORDER.len() / self.columns]
    }
}

/// A two-color checkerboard that scrolls left by one column every frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checkerboard {
    cell: usize,
    offset: usize,
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Checkerboard {
    /// Creates a checkerboard of square cells `cell` columns/lines on a side.
    /// A `cell` of zero is treated as one.
    pub fn new(cell: usize, fg: Rgb, bg: Rgb) -> Self {
        Checkerboard {
            cell: cell.max(1),
            offset: 0,
            fg,
            bg,
        }
    }

    /// Current horizontal scroll, in columns.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Content for Checkerboard {
    fn pixel(&mut self, row: usize, column: usize) -> Rgb {
        let parity = ((column + self.offset) / self.cell) ^ (row / self.cell);
        if parity & 1 == 0 {
            self.fg
        } else {
            self.bg
        }
    }

    fn end_frame(&mut self, _frame: usize) {
        // Wrap at a full period of the pattern so the offset never overflows.
        self.offset = (self.offset + 1) % (self.cell * 2);
    }
}
