use std::ops::Not;

pub mod driver;

pub use driver::{ConfigError, InitError, Polarity, RegisterConfig, RegisterDriver, Warning};

/// Identifier of a single digital line (a GPIO number on real hardware).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line(u8);

impl Line {
    pub const fn new(number: u8) -> Self {
        Self(number)
    }

    pub const fn number(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    /// Bit value of this level (`High` = 1).
    #[inline]
    pub const fn bit(self) -> u8 {
        self.is_high() as u8
    }
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

/// Trait for configuring and driving digital lines.
///
/// Abstracts over ESP32 GPIO and the simulated shift register,
/// giving `RegisterDriver` a uniform view of its pins.
pub trait Gpio {
    /// Error type for line operations.
    type Error: std::fmt::Debug + std::fmt::Display;

    /// Configure `line` as a push-pull output.
    fn configure_output(&mut self, line: Line) -> Result<(), Self::Error>;

    /// Configure `line` as an input.
    fn configure_input(&mut self, line: Line) -> Result<(), Self::Error>;

    /// Drive an output line to `level`.
    fn write(&mut self, line: Line, level: Level) -> Result<(), Self::Error>;

    /// Sample the current level of an input line.
    fn read(&mut self, line: Line) -> Result<Level, Self::Error>;
}

impl<G: Gpio + ?Sized> Gpio for &mut G {
    type Error = G::Error;

    fn configure_output(&mut self, line: Line) -> Result<(), Self::Error> {
        (**self).configure_output(line)
    }

    fn configure_input(&mut self, line: Line) -> Result<(), Self::Error> {
        (**self).configure_input(line)
    }

    fn write(&mut self, line: Line, level: Level) -> Result<(), Self::Error> {
        (**self).write(line, level)
    }

    fn read(&mut self, line: Line) -> Result<Level, Self::Error> {
        (**self).read(line)
    }
}

/// Trait for a monotonic microsecond time source.
///
/// Waits are blocking polls: nothing else runs on the calling
/// core until the deadline has passed.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary, fixed origin.
    fn now_micros(&mut self) -> u64;

    /// Block until the clock reads strictly later than `deadline`.
    fn block_until(&mut self, deadline: u64) {
        while self.now_micros() <= deadline {
            std::hint::spin_loop();
        }
    }

    /// Block for strictly more than `interval` microseconds.
    fn wait_micros(&mut self, interval: u64) {
        let start = self.now_micros();
        self.block_until(start.saturating_add(interval));
    }
}

#[cfg(target_os = "espidf")]
pub mod esp32;

#[cfg(not(target_os = "espidf"))]
pub mod mock;
