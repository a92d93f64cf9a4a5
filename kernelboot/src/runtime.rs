//! Main control flow: bring-up, SPI self-test, wait for the timer, echo.

use core::convert::Infallible;
use core::fmt;

use crate::config::Config;
use crate::csr::ControlStatus;
use crate::flag::IrqFlag;
use crate::mmio::Bus;
use crate::relax::Relax;
use crate::spi::Spi;
use crate::timer::Timer;
use crate::uart::Uart;

/// (sent, expected) pairs for the loopback fixture on the SPI bus.
/// The third response is the fixture's documented value, not `0xBE >> 1`.
pub const SELF_TEST_VECTORS: [(u8, u8); 4] = [
    (0xDE, 0xDE >> 1),
    (0xAD, 0xAD >> 1),
    (0xBE, 0xDF),
    (0xAF, 0xAF >> 1),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SelfTestError {
    Mismatch {
        index: usize,
        sent: u8,
        expected: u8,
        received: u8,
    },
}

impl SelfTestError {
    pub const fn exit_code(&self) -> i32 {
        soc::exit::SELF_TEST_MISMATCH
    }
}

impl fmt::Display for SelfTestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTestError::Mismatch {
                index,
                sent,
                expected,
                received,
            } => write!(
                f,
                "spi self-test #{index}: sent {sent:#04x}, expected {expected:#04x}, got {received:#04x}"
            ),
        }
    }
}

/// `'A'..='Z'` to lowercase by adding 32; every other byte passes through.
#[inline]
pub const fn fold_case(byte: u8) -> u8 {
    if byte.is_ascii_uppercase() {
        byte + 32
    } else {
        byte
    }
}

pub struct Runtime<'f, B, C, R> {
    uart: Uart<B, R>,
    spi: Spi<B, R>,
    timer: Timer<B, C>,
    flag: &'f IrqFlag,
    relax: R,
    config: Config,
}

impl<'f, B, C, R> Runtime<'f, B, C, R>
where
    B: Bus + Clone,
    C: ControlStatus,
    R: Relax + Clone,
{
    pub fn new(bus: B, csr: C, relax: R, flag: &'f IrqFlag, config: Config) -> Self {
        Runtime {
            uart: Uart::with_relax(bus.clone(), relax.clone()),
            spi: Spi::with_relax(bus.clone(), relax.clone()),
            timer: Timer::new(bus, csr),
            flag,
            relax,
            config,
        }
    }

    pub fn timer(&self) -> &Timer<B, C> {
        &self.timer
    }

    /// Install the vector, enable the timer source, arm it and open the
    /// global interrupt gate. From here on the main flow can be preempted.
    pub fn bring_up(&mut self, trap_vector: usize) {
        self.timer.install_vector(trap_vector);
        if let Some(div) = self.config.uart_divider {
            self.uart.set_divider(div);
        }
        if let Some(div) = self.config.spi_divider {
            self.spi.set_divider(div);
        }
        self.timer.enable_source();
        self.timer.arm(self.config.timer_interval);
        self.timer.enable_global();
    }

    /// Chip-select stays asserted when a response mismatches.
    pub fn self_test(&mut self) -> Result<(), SelfTestError> {
        self.spi.set_chip_select(true);
        for (index, &(sent, expected)) in SELF_TEST_VECTORS.iter().enumerate() {
            let received = self.spi.transfer(sent);
            if received != expected {
                return Err(SelfTestError::Mismatch {
                    index,
                    sent,
                    expected,
                    received,
                });
            }
        }
        self.spi.set_chip_select(false);
        Ok(())
    }

    /// Spin on the completion flag. Returns the number of clear polls.
    pub fn wait_for_timer(&mut self) -> usize {
        self.flag.wait(&mut self.relax)
    }

    pub fn greet(&mut self) {
        self.uart.put_bytes(self.config.greeting);
    }

    pub fn echo_once(&mut self) -> u8 {
        let folded = fold_case(self.uart.get_char());
        self.uart.put_char(folded);
        folded
    }

    /// Everything up to the echo loop.
    pub fn start(&mut self, trap_vector: usize) -> Result<(), SelfTestError> {
        self.bring_up(trap_vector);
        if self.config.spi_self_test {
            self.self_test()?;
        }
        self.wait_for_timer();
        self.greet();
        Ok(())
    }

    pub fn run(mut self, trap_vector: usize) -> Result<Infallible, SelfTestError> {
        self.start(trap_vector)?;
        loop {
            self.echo_once();
        }
    }
}
