mod clock;
mod register;

pub use clock::{SimClock, StdClock};
pub use register::{LineMode, SimError, SimPins, SimulatedRegister};
