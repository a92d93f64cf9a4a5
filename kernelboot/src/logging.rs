//! Level-filtered diagnostics on the serial port.
//!
//! The UART is also the data path the test bench watches, so the default
//! threshold is WARN: a healthy boot prints nothing but the greeting and
//! the echoed bytes. Build with the `verbose` feature to see DEBUG and up.

use core::sync::atomic::{AtomicU8, Ordering};

use kernelboot_lib::mmio::Mmio;
use kernelboot_lib::uart::Uart;
use soc::LogLevel;

const DEFAULT_LEVEL: LogLevel = if cfg!(feature = "verbose") {
    LogLevel::Debug
} else {
    LogLevel::Warn
};

/// Global log level filter. Messages below this level are suppressed.
static LOG_LEVEL: AtomicU8 = AtomicU8::new(DEFAULT_LEVEL as u8);

pub fn get_log_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn should_log(level: LogLevel) -> bool {
    level >= get_log_level()
}

/// Serial writer for log lines.
pub fn sink() -> Uart<Mmio> {
    // SAFETY: the UART registers are always mapped on this SoC.
    Uart::new(unsafe { Mmio::new() })
}

#[macro_export]
macro_rules! klog {
    ($level:expr, $($arg:tt)*) => {{
        let level: soc::LogLevel = $level;
        if $crate::logging::should_log(level) {
            use core::fmt::Write;
            let mut uart = $crate::logging::sink();
            let _ = uart.write_str(level.tag());
            let _ = write!(uart, $($arg)*);
            let _ = uart.write_str("\n");
        }
    }};
}

#[macro_export]
macro_rules! ktrace {
    ($($arg:tt)*) => {
        $crate::klog!(soc::LogLevel::Trace, $($arg)*)
    };
}

#[macro_export]
macro_rules! kdebug {
    ($($arg:tt)*) => {
        $crate::klog!(soc::LogLevel::Debug, $($arg)*)
    };
}

#[macro_export]
macro_rules! kinfo {
    ($($arg:tt)*) => {
        $crate::klog!(soc::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! kwarn {
    ($($arg:tt)*) => {
        $crate::klog!(soc::LogLevel::Warn, $($arg)*)
    };
}

#[macro_export]
macro_rules! kerror {
    ($($arg:tt)*) => {
        $crate::klog!(soc::LogLevel::Error, $($arg)*)
    };
}
