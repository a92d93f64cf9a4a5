//! Build-time runtime configuration.

use crate::timer::BOOT_INTERVAL;

pub const GREETING: &[u8] = b"Hello UART\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Ticks between arming the timer and the interrupt.
    pub timer_interval: u64,
    pub greeting: &'static [u8],
    /// Run the SPI loopback check before waiting for the interrupt.
    pub spi_self_test: bool,
    /// Left untouched (bootloader value) when `None`.
    pub uart_divider: Option<u32>,
    pub spi_divider: Option<u32>,
}

impl Config {
    pub const DEFAULT: Config = Config {
        timer_interval: BOOT_INTERVAL,
        greeting: GREETING,
        spi_self_test: cfg!(feature = "spi-selftest"),
        uart_divider: None,
        spi_divider: None,
    };

    pub const fn without_self_test(self) -> Self {
        Config {
            spi_self_test: false,
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}
