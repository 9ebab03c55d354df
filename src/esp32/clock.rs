use esp_idf_svc::sys::esp_timer_get_time;

use crate::MonotonicClock;

/// Microsecond clock backed by the ESP high-resolution timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    pub const fn new() -> Self {
        Self
    }
}

impl MonotonicClock for Esp32Clock {
    fn now_micros(&mut self) -> u64 {
        // SAFETY: esp_timer is started by ESP-IDF before `main` runs.
        let now = unsafe { esp_timer_get_time() };
        u64::try_from(now).unwrap_or(0)
    }
}
