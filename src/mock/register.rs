use std::collections::HashMap;

use crate::{Gpio, Level, Line};

/// Lines the simulated chip is wired to.
///
/// Defaults use the SN54HC165 package pin numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPins {
    /// SH/LD, or `None` when an external controller drives it.
    pub shift_load: Option<Line>,
    pub clock: Line,
    pub serial_out: Line,
    pub serial_out_complement: Line,
}

impl Default for SimPins {
    fn default() -> Self {
        Self {
            shift_load: Some(Line::new(1)),
            clock: Line::new(2),
            serial_out: Line::new(9),
            serial_out_complement: Line::new(7),
        }
    }
}

/// Direction a host line has been configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Input,
    Output,
}

/// Error types for the simulated register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("{0} is not wired to the shift register")]
    Unwired(Line),
    #[error("{0} is a register output and cannot be driven")]
    Contention(Line),
    #[error("{0} written before being configured as an output")]
    NotOutput(Line),
    #[error("{0} read before being configured as an input")]
    NotInput(Line),
}

/// Behavioural model of an SN54HC165 parallel-in/serial-out register.
///
/// - SH/LD low copies the parallel inputs A..H into the register.
/// - A rising CLK edge with SH/LD high shifts towards QH, taking SER in at A.
///   With recirculation on, SER is tied to QH and eight edges rotate the
///   register back to where it started.
/// - QH shows stored bit H (bit 7); QH̄ shows its inverse.
#[derive(Debug, Clone)]
pub struct SimulatedRegister {
    pins: SimPins,
    modes: HashMap<Line, LineMode>,
    parallel_inputs: u8,
    serial_input: Level,
    recirculate: bool,
    stored: u8,
    shift_load_level: Level,
    clock_level: Level,
    rising_edges: usize,
    loads: usize,
}

impl Default for SimulatedRegister {
    fn default() -> Self {
        Self::new(SimPins::default())
    }
}

impl SimulatedRegister {
    /// Create a chip with all inputs low and SH/LD pulled high.
    pub fn new(pins: SimPins) -> Self {
        Self {
            pins,
            modes: HashMap::new(),
            parallel_inputs: 0,
            serial_input: Level::Low,
            recirculate: false,
            stored: 0,
            shift_load_level: Level::High,
            clock_level: Level::Low,
            rising_edges: 0,
            loads: 0,
        }
    }

    #[inline]
    pub fn pins(&self) -> SimPins {
        self.pins
    }

    /// Present `value` on inputs A..H (H = bit 7).
    ///
    /// While SH/LD is held low the register follows the inputs.
    pub fn set_parallel_inputs(&mut self, value: u8) {
        self.parallel_inputs = value;
        if self.shift_load_level == Level::Low {
            self.stored = value;
        }
    }

    #[inline]
    pub fn parallel_inputs(&self) -> u8 {
        self.parallel_inputs
    }

    /// Level shifted in at stage A on every clock.
    pub fn set_serial_input(&mut self, level: Level) {
        self.serial_input = level;
    }

    /// Tie SER to QH.
    pub fn set_recirculate(&mut self, on: bool) {
        self.recirculate = on;
    }

    /// Latch the parallel inputs as an external SH/LD controller would.
    pub fn external_load(&mut self) {
        self.stored = self.parallel_inputs;
        self.loads += 1;
    }

    /// Current register contents.
    #[inline]
    pub fn stored(&self) -> u8 {
        self.stored
    }

    #[inline]
    pub fn shift_load_level(&self) -> Level {
        self.shift_load_level
    }

    #[inline]
    pub fn clock_level(&self) -> Level {
        self.clock_level
    }

    /// Rising edges seen on CLK so far.
    #[inline]
    pub fn rising_edges(&self) -> usize {
        self.rising_edges
    }

    /// Parallel loads performed so far.
    #[inline]
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Direction `line` was configured for, if any.
    pub fn mode(&self, line: Line) -> Option<LineMode> {
        self.modes.get(&line).copied()
    }

    fn is_chip_output(&self, line: Line) -> bool {
        line == self.pins.serial_out || line == self.pins.serial_out_complement
    }

    fn is_wired(&self, line: Line) -> bool {
        self.is_chip_output(line) || line == self.pins.clock || Some(line) == self.pins.shift_load
    }

    fn serial_out(&self) -> Level {
        Level::from(self.stored & 0x80 != 0)
    }

    fn drive_shift_load(&mut self, level: Level) {
        if level == Level::Low && self.shift_load_level == Level::High {
            self.loads += 1;
        }
        self.shift_load_level = level;
        if level == Level::Low {
            self.stored = self.parallel_inputs;
        }
    }

    fn drive_clock(&mut self, level: Level) {
        let rising = self.clock_level == Level::Low && level == Level::High;
        self.clock_level = level;
        if rising {
            self.rising_edges += 1;
            if self.shift_load_level == Level::High {
                let incoming = if self.recirculate {
                    self.serial_out()
                } else {
                    self.serial_input
                };
                self.stored = (self.stored << 1) | incoming.bit();
            }
        }
    }
}

impl Gpio for SimulatedRegister {
    type Error = SimError;

    fn configure_output(&mut self, line: Line) -> Result<(), Self::Error> {
        if !self.is_wired(line) {
            return Err(SimError::Unwired(line));
        }
        if self.is_chip_output(line) {
            return Err(SimError::Contention(line));
        }
        self.modes.insert(line, LineMode::Output);
        Ok(())
    }

    fn configure_input(&mut self, line: Line) -> Result<(), Self::Error> {
        if !self.is_wired(line) {
            return Err(SimError::Unwired(line));
        }
        self.modes.insert(line, LineMode::Input);
        Ok(())
    }

    fn write(&mut self, line: Line, level: Level) -> Result<(), Self::Error> {
        if self.mode(line) != Some(LineMode::Output) {
            return Err(SimError::NotOutput(line));
        }
        if line == self.pins.clock {
            self.drive_clock(level);
        } else {
            self.drive_shift_load(level);
        }
        Ok(())
    }

    fn read(&mut self, line: Line) -> Result<Level, Self::Error> {
        if self.mode(line) != Some(LineMode::Input) {
            return Err(SimError::NotInput(line));
        }
        let level = if line == self.pins.serial_out {
            self.serial_out()
        } else if line == self.pins.serial_out_complement {
            !self.serial_out()
        } else if line == self.pins.clock {
            self.clock_level
        } else {
            self.shift_load_level
        };
        Ok(level)
    }
}
