#![no_std]

//! Fixed memory map and register bit layouts of the target SoC.

pub mod map {
    pub const IO_BASE: usize = 0x1000_0000;

    pub const UART_THR: usize = IO_BASE; // transmit holding (write)
    pub const UART_RBR: usize = IO_BASE; // receive buffer (read)
    pub const UART_LSR: usize = IO_BASE + 0x05; // line status
    pub const UART_DIV: usize = IO_BASE + 0x10; // baud divisor

    pub const SPI_CTRL: usize = 0x1050_0000;
    pub const SPI_DATA: usize = 0x1050_0004;
    pub const SPI_DIV: usize = IO_BASE + 0x50_0010;

    pub const MTIMECMP: usize = 0x1100_4000;
    pub const MTIME: usize = 0x1100_bff8;
}

pub mod lsr {
    pub const DR: u8 = 1 << 0; // data ready
    pub const THRE: u8 = 1 << 5; // TX holding register empty
    pub const TEMT: u8 = 1 << 6; // transmitter empty
}

pub mod spi {
    pub const CTRL_BUSY: u32 = 1 << 31;
    pub const CS_ASSERT: u32 = 1;
    pub const CS_DEASSERT: u32 = 0;
}

/// Machine-mode CSR bits this runtime touches.
pub mod csr {
    pub const MSTATUS_MIE: u32 = 1 << 3;
    pub const MSTATUS_MPIE: u32 = 1 << 7;
    pub const MIE_MTIE: u32 = 1 << 7;
    pub const MIP_MTIP: u32 = 1 << 7;
}

/// Exit status handed back to the startup stub.
pub mod exit {
    pub const SELF_TEST_MISMATCH: i32 = 1;
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    pub const fn tag(self) -> &'static str {
        match self {
            LogLevel::Trace => "[TRACE] ",
            LogLevel::Debug => "[DEBUG] ",
            LogLevel::Info => "[INFO]  ",
            LogLevel::Warn => "[WARN]  ",
            LogLevel::Error => "[ERROR] ",
        }
    }
}

// The two layouts the hardware test bench depends on.
const _: () = assert!(map::UART_LSR - map::UART_THR == 5);
const _: () = assert!(map::SPI_DATA - map::SPI_CTRL == 4);
