use std::collections::HashMap;

use esp_idf_svc::hal::gpio::{self, AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_svc::sys::EspError;

use crate::{Gpio, Level, Line};

/// Error types for ESP32 GPIO operations
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    #[error("{0} is not configured for this direction")]
    WrongDirection(Line),
    #[error("GPIO driver error: {0}")]
    Esp(#[from] EspError),
}

enum PinSlot {
    Output(PinDriver<'static, AnyOutputPin, Output>),
    Input(PinDriver<'static, AnyInputPin, Input>),
}

/// ESP32 GPIO addressed by pin number.
///
/// Each line is claimed the first time it is configured. The caller must
/// not hand the same pins to any other driver.
pub struct Esp32Gpio {
    pins: HashMap<Line, PinSlot>,
}

impl std::fmt::Debug for Esp32Gpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut lines: Vec<_> = self.pins.keys().collect();
        lines.sort();
        f.debug_struct("Esp32Gpio").field("lines", &lines).finish()
    }
}

impl Esp32Gpio {
    /// # Safety
    ///
    /// Every line later passed to this GPIO must be a valid, otherwise
    /// unused pin of the running chip.
    pub unsafe fn new() -> Self {
        Self {
            pins: HashMap::new(),
        }
    }
}

impl Gpio for Esp32Gpio {
    type Error = GpioError;

    fn configure_output(&mut self, line: Line) -> Result<(), Self::Error> {
        // Dropping any previous driver resets the pin before it is reclaimed.
        self.pins.remove(&line);
        // SAFETY: guaranteed by the contract of `Esp32Gpio::new`.
        let pin = unsafe { AnyOutputPin::new(i32::from(line.number())) };
        self.pins.insert(line, PinSlot::Output(PinDriver::output(pin)?));
        Ok(())
    }

    fn configure_input(&mut self, line: Line) -> Result<(), Self::Error> {
        self.pins.remove(&line);
        // SAFETY: guaranteed by the contract of `Esp32Gpio::new`.
        let pin = unsafe { AnyInputPin::new(i32::from(line.number())) };
        self.pins.insert(line, PinSlot::Input(PinDriver::input(pin)?));
        Ok(())
    }

    fn write(&mut self, line: Line, level: Level) -> Result<(), Self::Error> {
        match self.pins.get_mut(&line) {
            Some(PinSlot::Output(driver)) => Ok(driver.set_level(to_esp(level))?),
            _ => Err(GpioError::WrongDirection(line)),
        }
    }

    fn read(&mut self, line: Line) -> Result<Level, Self::Error> {
        match self.pins.get(&line) {
            Some(PinSlot::Input(driver)) => Ok(Level::from(driver.is_high())),
            _ => Err(GpioError::WrongDirection(line)),
        }
    }
}

fn to_esp(level: Level) -> gpio::Level {
    match level {
        Level::Low => gpio::Level::Low,
        Level::High => gpio::Level::High,
    }
}
