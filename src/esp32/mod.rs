mod clock;
mod gpio;

pub use clock::Esp32Clock;
pub use gpio::{Esp32Gpio, GpioError};
