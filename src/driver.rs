use crate::{Gpio, Level, Line, MonotonicClock};

/// Clock frequency used when none is configured.
pub const DEFAULT_CLOCK_FREQUENCY_HZ: u32 = 1_000;

/// Minimum time SH/LD is held low to latch the parallel inputs, and the
/// settle time after it returns high.
const LOAD_PULSE_MICROS: u64 = 2;

/// Which serial output of the register is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Polarity {
    /// QH: carries the stored bit as-is.
    #[default]
    True,
    /// QH̄: carries the inverse of the stored bit.
    Complement,
}

/// Wiring that leaves the driver without any valid operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("clock line must be configured")]
    MissingClock,
    #[error("a serial output line (QH or QH complement) must be configured")]
    MissingDataLine,
    #[error("clock frequency must be non-zero")]
    InvalidFrequency,
}

/// Error types for [`RegisterConfig::initialize`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InitError<E> {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("GPIO setup failed: {0}")]
    Gpio(E),
}

/// Recoverable conditions reported through `log::warn!`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    /// No SH/LD line; something else must latch the parallel inputs.
    ExternalLoad,
    /// Both serial outputs wired without a polarity preference.
    DefaultPolarity,
    /// `load_data` called without an SH/LD line.
    LoadUnavailable,
    /// `read_byte` called without an SH/LD line; the load request is ignored.
    LoadFirstIgnored,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Warning::ExternalLoad => {
                "shift/load line not configured, parallel load must be driven externally"
            }
            Warning::DefaultPolarity => {
                "both serial outputs configured without a polarity preference, using QH"
            }
            Warning::LoadUnavailable => {
                "cannot load data because shift/load line is not configured"
            }
            Warning::LoadFirstIgnored => {
                "load switch ignored because shift/load line is not configured, reading latched data"
            }
        };
        f.write_str(message)
    }
}

fn report(warning: Warning) {
    log::warn!("{warning}");
}

/// Pin roles and timing for one SN54HC165, set before initialization.
///
/// Setters only record values. Every check happens in
/// [`initialize`](Self::initialize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterConfig {
    shift_load: Option<Line>,
    clock: Option<Line>,
    serial_out: Option<Line>,
    serial_out_complement: Option<Line>,
    polarity: Option<Polarity>,
    clock_frequency_hz: u32,
}

impl Default for RegisterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of validating a [`RegisterConfig`].
struct Resolved {
    clock: Line,
    data: Line,
    polarity: Polarity,
    defaulted: bool,
    half_period_micros: u64,
}

impl RegisterConfig {
    pub const fn new() -> Self {
        Self {
            shift_load: None,
            clock: None,
            serial_out: None,
            serial_out_complement: None,
            polarity: None,
            clock_frequency_hz: DEFAULT_CLOCK_FREQUENCY_HZ,
        }
    }

    /// SH/LD (pin 1): low loads the parallel inputs, high shifts.
    pub fn set_shift_load_line(&mut self, line: Line) -> &mut Self {
        self.shift_load = Some(line);
        self
    }

    /// CLK (pin 2).
    pub fn set_clock_line(&mut self, line: Line) -> &mut Self {
        self.clock = Some(line);
        self
    }

    /// QH (pin 9).
    pub fn set_serial_out_line(&mut self, line: Line) -> &mut Self {
        self.serial_out = Some(line);
        self
    }

    /// QH̄ (pin 7).
    pub fn set_serial_out_complement_line(&mut self, line: Line) -> &mut Self {
        self.serial_out_complement = Some(line);
        self
    }

    /// Which output to sample when both QH and QH̄ are wired.
    pub fn set_polarity(&mut self, polarity: Polarity) -> &mut Self {
        self.polarity = Some(polarity);
        self
    }

    pub fn set_clock_frequency(&mut self, hz: u32) -> &mut Self {
        self.clock_frequency_hz = hz;
        self
    }

    #[inline]
    pub fn clock_frequency(&self) -> u32 {
        self.clock_frequency_hz
    }

    /// Busy-wait interval between clock edges, `round(1e6 / hz)` microseconds.
    pub fn half_period_micros(&self) -> Result<u64, ConfigError> {
        let hz = u64::from(self.clock_frequency_hz);
        if hz == 0 {
            return Err(ConfigError::InvalidFrequency);
        }
        Ok((1_000_000 + hz / 2) / hz)
    }

    fn resolve(&self) -> Result<Resolved, ConfigError> {
        let clock = self.clock.ok_or(ConfigError::MissingClock)?;
        let half_period_micros = self.half_period_micros()?;

        let (data, polarity, defaulted) =
            match (self.serial_out, self.serial_out_complement, self.polarity) {
                (None, None, _) => return Err(ConfigError::MissingDataLine),
                (Some(qh), None, _) => (qh, Polarity::True, false),
                (None, Some(qh_bar), _) => (qh_bar, Polarity::Complement, false),
                (Some(qh), Some(_), None) => (qh, Polarity::True, true),
                (Some(qh), Some(_), Some(Polarity::True)) => (qh, Polarity::True, false),
                (Some(_), Some(qh_bar), Some(Polarity::Complement)) => {
                    (qh_bar, Polarity::Complement, false)
                }
            };

        Ok(Resolved {
            clock,
            data,
            polarity,
            defaulted,
            half_period_micros,
        })
    }

    /// Validate the wiring and put every line into its idle state.
    ///
    /// Diagnostics follow the setup order: a missing SH/LD line is warned
    /// about before a missing clock or data line fails. Nothing is touched
    /// on the GPIO side unless the configuration is complete. Lines are then
    /// set up in order: SH/LD driven high, CLK driven low, and the resolved
    /// serial output configured as input.
    pub fn initialize<G, C>(
        &self,
        mut gpio: G,
        clock: C,
    ) -> Result<RegisterDriver<G, C>, InitError<G::Error>>
    where
        G: Gpio,
        C: MonotonicClock,
    {
        if self.shift_load.is_none() {
            report(Warning::ExternalLoad);
        }
        let resolved = self
            .resolve()
            .inspect_err(|err| {
                log::error!("shift register initialization failed: {err}")
            })?;

        if let Some(line) = self.shift_load {
            gpio.configure_output(line).map_err(InitError::Gpio)?;
            gpio.write(line, Level::High).map_err(InitError::Gpio)?;
        }

        gpio.configure_output(resolved.clock).map_err(InitError::Gpio)?;
        gpio.write(resolved.clock, Level::Low).map_err(InitError::Gpio)?;

        if resolved.defaulted {
            report(Warning::DefaultPolarity);
        }
        gpio.configure_input(resolved.data).map_err(InitError::Gpio)?;

        log::debug!(
            "shift register ready: clock {} at {} Hz ({} us half period), sampling {} ({:?})",
            resolved.clock,
            self.clock_frequency_hz,
            resolved.half_period_micros,
            resolved.data,
            resolved.polarity,
        );

        Ok(RegisterDriver {
            gpio,
            clock,
            shift_load: self.shift_load,
            clock_line: resolved.clock,
            data_line: resolved.data,
            polarity: resolved.polarity,
            half_period_micros: resolved.half_period_micros,
            clock_level: Level::Low,
        })
    }
}

/// Initialized SN54HC165 driver.
///
/// Reads are blocking: one byte costs 16 busy-waited half periods plus the
/// optional load pulse. Not meant to be shared between execution contexts.
#[derive(Debug)]
pub struct RegisterDriver<G, C> {
    gpio: G,
    clock: C,
    shift_load: Option<Line>,
    clock_line: Line,
    data_line: Line,
    polarity: Polarity,
    half_period_micros: u64,
    clock_level: Level,
}

impl<G: Gpio, C: MonotonicClock> RegisterDriver<G, C> {
    /// Latch the parallel inputs into the register.
    ///
    /// Without an SH/LD line this only emits a warning.
    pub fn load_data(&mut self) -> Result<(), G::Error> {
        match self.shift_load {
            Some(line) => self.pulse_load(line),
            None => {
                report(Warning::LoadUnavailable);
                Ok(())
            }
        }
    }

    fn pulse_load(&mut self, line: Line) -> Result<(), G::Error> {
        self.gpio.write(line, Level::Low)?;
        self.clock.wait_micros(LOAD_PULSE_MICROS);
        self.gpio.write(line, Level::High)?;
        self.clock.wait_micros(LOAD_PULSE_MICROS);
        Ok(())
    }

    /// One full clock pulse: wait, flip, wait, flip back.
    ///
    /// Starting from low this is one rising edge (one shift) followed by
    /// one falling edge, and the line ends where it started.
    pub fn toggle_clock(&mut self) -> Result<(), G::Error> {
        for _ in 0..2 {
            self.clock.wait_micros(self.half_period_micros);
            self.clock_level = !self.clock_level;
            self.gpio.write(self.clock_line, self.clock_level)?;
        }
        Ok(())
    }

    /// Read one byte, most significant bit (input H) first.
    ///
    /// With `load_first` the parallel inputs are latched before shifting;
    /// otherwise whatever the register currently holds is shifted out.
    /// Without an SH/LD line `load_first` has no effect and every read warns.
    pub fn read_byte(&mut self, load_first: bool) -> Result<u8, G::Error> {
        match self.shift_load {
            Some(line) if load_first => self.pulse_load(line)?,
            Some(_) => {}
            None => report(Warning::LoadFirstIgnored),
        }
        self.shift_in()
    }

    fn shift_in(&mut self) -> Result<u8, G::Error> {
        // The first bit is already on the output; no edge needed.
        let mut value = self.sample()?;
        for _ in 1..8 {
            self.toggle_clock()?;
            value = (value << 1) | self.sample()?;
        }

        // Leave the clock idle low so the next load-and-shift starts clean.
        self.toggle_clock()?;
        self.clock_level = Level::Low;
        self.gpio.write(self.clock_line, Level::Low)?;

        Ok(value)
    }

    fn sample(&mut self) -> Result<u8, G::Error> {
        let level = self.gpio.read(self.data_line)?;
        Ok(match self.polarity {
            Polarity::True => level.bit(),
            Polarity::Complement => (!level).bit(),
        })
    }
}

impl<G, C> RegisterDriver<G, C> {
    /// Serial output resolved at initialization.
    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Whether this driver owns the SH/LD line.
    #[inline]
    pub fn can_load(&self) -> bool {
        self.shift_load.is_some()
    }

    #[inline]
    pub fn half_period_micros(&self) -> u64 {
        self.half_period_micros
    }

    /// Level the driver last wrote to the clock line.
    #[inline]
    pub fn clock_level(&self) -> Level {
        self.clock_level
    }

    #[inline]
    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    #[inline]
    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Give back the GPIO and clock, e.g. to initialize a new configuration.
    pub fn release(self) -> (G, C) {
        (self.gpio, self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{SimClock, SimPins, SimulatedRegister};
    use test_case::test_case;

    fn full_config(pins: &SimPins) -> RegisterConfig {
        let mut config = RegisterConfig::new();
        config
            .set_shift_load_line(pins.shift_load.expect("pins wire SH/LD"))
            .set_clock_line(pins.clock)
            .set_serial_out_line(pins.serial_out);
        config
    }

    #[test_case(1_000, 1_000; "default")]
    #[test_case(500_000, 2; "500 kHz")]
    #[test_case(3, 333_333; "rounds down")]
    #[test_case(6, 166_667; "rounds up")]
    #[test_case(4_000_000, 0; "faster than a microsecond")]
    fn half_period_is_rounded(hz: u32, expected: u64) {
        let mut config = RegisterConfig::new();
        config.set_clock_frequency(hz);
        assert_eq!(config.half_period_micros(), Ok(expected));
    }

    #[test]
    fn default_frequency_is_one_kilohertz() {
        assert_eq!(RegisterConfig::default().clock_frequency(), 1_000);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let pins = SimPins::default();
        let mut config = full_config(&pins);
        config.set_clock_frequency(0);

        let result = config.initialize(SimulatedRegister::new(pins), SimClock::new());
        assert_eq!(
            result.err(),
            Some(InitError::Config(ConfigError::InvalidFrequency))
        );
    }

    #[test]
    fn missing_clock_wins_over_missing_data() {
        let config = RegisterConfig::new();
        let result = config.initialize(SimulatedRegister::default(), SimClock::new());
        assert_eq!(
            result.err(),
            Some(InitError::Config(ConfigError::MissingClock))
        );
    }

    #[test]
    fn failed_initialization_leaves_lines_untouched() {
        let pins = SimPins::default();
        let mut config = RegisterConfig::new();
        config
            .set_shift_load_line(pins.shift_load.expect("pins wire SH/LD"))
            .set_clock_line(pins.clock);

        let mut sim = SimulatedRegister::new(pins);
        let result = config.initialize(&mut sim, SimClock::new());

        assert_eq!(
            result.err(),
            Some(InitError::Config(ConfigError::MissingDataLine))
        );
        assert_eq!(sim.mode(pins.clock), None);
        assert_eq!(sim.shift_load_level(), Level::High);
    }

    #[test]
    fn initialize_sets_idle_levels() {
        let pins = SimPins::default();
        let driver = full_config(&pins)
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");

        let sim = driver.gpio();
        assert_eq!(sim.shift_load_level(), Level::High);
        assert_eq!(sim.clock_level(), Level::Low);
        assert!(driver.can_load());
        assert_eq!(driver.polarity(), Polarity::True);
    }

    #[test]
    fn gpio_failure_is_reported() {
        let pins = SimPins::default();
        let mut config = full_config(&pins);
        // QH is a chip output; driving it would short the register.
        config.set_clock_line(pins.serial_out);

        let result = config.initialize(SimulatedRegister::new(pins), SimClock::new());
        assert!(matches!(result, Err(InitError::Gpio(_))));
    }

    #[test_case(None, Polarity::True; "no preference")]
    #[test_case(Some(Polarity::True), Polarity::True; "true preferred")]
    #[test_case(Some(Polarity::Complement), Polarity::Complement; "complement preferred")]
    fn both_outputs_resolve_by_preference(preference: Option<Polarity>, expected: Polarity) {
        let pins = SimPins::default();
        let mut config = full_config(&pins);
        config.set_serial_out_complement_line(pins.serial_out_complement);
        if let Some(polarity) = preference {
            config.set_polarity(polarity);
        }

        let driver = config
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");
        assert_eq!(driver.polarity(), expected);
    }

    #[test]
    fn preference_ignored_when_only_one_output_is_wired() {
        let pins = SimPins::default();
        let mut config = full_config(&pins);
        config.set_polarity(Polarity::Complement);

        let driver = config
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");
        assert_eq!(driver.polarity(), Polarity::True);
    }

    #[test]
    fn toggle_clock_produces_one_rising_edge() {
        let pins = SimPins::default();
        let mut driver = full_config(&pins)
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");

        driver.toggle_clock().unwrap();

        assert_eq!(driver.gpio().rising_edges(), 1);
        assert_eq!(driver.gpio().clock_level(), Level::Low);
        assert_eq!(driver.clock_level(), Level::Low);
    }

    #[test]
    fn read_byte_clocks_eight_times() {
        let pins = SimPins::default();
        let mut driver = full_config(&pins)
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");

        driver.read_byte(true).unwrap();

        assert_eq!(driver.gpio().rising_edges(), 8);
        assert_eq!(driver.gpio().loads(), 1);
        assert_eq!(driver.gpio().clock_level(), Level::Low);
    }

    #[test]
    fn load_data_pulses_shift_load() {
        let pins = SimPins::default();
        let mut driver = full_config(&pins)
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");

        driver.gpio_mut().set_parallel_inputs(0x5A);
        driver.load_data().unwrap();

        assert_eq!(driver.gpio().stored(), 0x5A);
        assert_eq!(driver.gpio().shift_load_level(), Level::High);
        // low hold plus settle, each strictly longer than the pulse time
        assert!(driver.clock().now() >= 2 * (LOAD_PULSE_MICROS + 1));
    }

    #[test]
    fn release_returns_collaborators() {
        let pins = SimPins::default();
        let driver = full_config(&pins)
            .initialize(SimulatedRegister::new(pins), SimClock::new())
            .expect("complete configuration");

        let (sim, _clock) = driver.release();
        assert_eq!(sim.mode(pins.clock), Some(crate::mock::LineMode::Output));
    }

    #[test]
    fn warnings_have_messages() {
        for warning in [
            Warning::ExternalLoad,
            Warning::DefaultPolarity,
            Warning::LoadUnavailable,
            Warning::LoadFirstIgnored,
        ] {
            assert!(!warning.to_string().is_empty());
        }
    }
}
