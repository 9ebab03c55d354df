use sn54hc165::{Line, RegisterConfig};

/// SH/LD on GPIO4, CLK on GPIO5 and QH on GPIO18, shared by both targets.
fn register_config() -> RegisterConfig {
    let mut config = RegisterConfig::new();
    config
        .set_shift_load_line(Line::new(4))
        .set_clock_line(Line::new(5))
        .set_serial_out_line(Line::new(18))
        .set_clock_frequency(500_000);
    config
}

#[cfg(target_os = "espidf")]
fn main() {
    use esp_idf_svc::hal::delay::FreeRtos;
    use sn54hc165::esp32::{Esp32Clock, Esp32Gpio};

    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("SN54HC165 reader - ESP32");

    // SAFETY: GPIO 4, 5 and 18 are general-purpose pins not used by flash,
    // PSRAM or the console UART, and nothing else in this binary claims them.
    let gpio = unsafe { Esp32Gpio::new() };
    let mut register = match register_config().initialize(gpio, Esp32Clock::new()) {
        Ok(register) => register,
        Err(err) => {
            log::error!("cannot start without a working shift register: {err}");
            loop {
                FreeRtos::delay_ms(1000);
            }
        }
    };

    loop {
        match register.read_byte(true) {
            Ok(value) => log::info!("inputs: {value:#010b}"),
            Err(err) => log::error!("read failed: {err}"),
        }
        FreeRtos::delay_ms(1000);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    use sn54hc165::mock::{SimulatedRegister, StdClock};

    let config = register_config();
    let sim = SimulatedRegister::new(board_pins());
    let mut register = match config.initialize(sim, StdClock::new()) {
        Ok(register) => register,
        Err(err) => {
            eprintln!("cannot start without a working shift register: {err}");
            std::process::exit(1);
        }
    };

    for value in [0b1011_0010, 0x00, 0xFF, 0x5A] {
        register.gpio_mut().set_parallel_inputs(value);
        match register.read_byte(true) {
            Ok(read) => println!("inputs {value:#010b} -> read {read:#010b}"),
            Err(err) => eprintln!("read failed: {err}"),
        }
    }
}

/// Simulated chip wired the same way as the ESP32 board.
#[cfg(not(target_os = "espidf"))]
fn board_pins() -> sn54hc165::mock::SimPins {
    sn54hc165::mock::SimPins {
        shift_load: Some(Line::new(4)),
        clock: Line::new(5),
        serial_out: Line::new(18),
        serial_out_complement: Line::new(19),
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use sn54hc165::mock::{SimClock, SimulatedRegister};

    #[test]
    fn board_lines_avoid_console_and_flash_pins() {
        let pins = board_pins();
        // UART0 TX/RX and the SPI flash bus (GPIO6-11) on classic ESP32.
        let reserved = [1, 3, 6, 7, 8, 9, 10, 11];

        for line in [pins.shift_load.unwrap(), pins.clock, pins.serial_out] {
            assert!(
                !reserved.contains(&line.number()),
                "{line} is reserved on ESP32"
            );
        }
    }

    #[test]
    fn board_config_initializes() {
        let mut register = register_config()
            .initialize(SimulatedRegister::new(board_pins()), SimClock::new())
            .expect("board wiring matches config");

        register.gpio_mut().set_parallel_inputs(0xB2);
        assert_eq!(register.read_byte(true), Ok(0xB2));
    }
}
