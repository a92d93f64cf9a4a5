//! Deterministic software model of the SoC.
//!
//! Time only moves when a busy-wait calls its [`Relax`] hook: every call to
//! [`Ticker::relax`] advances `mtime` by one tick, progresses the UART and
//! SPI controllers, and, if the timer is due and both enables are set,
//! preempts the main flow by running the trap handler over the model's hart
//! register file exactly like hardware would (entry, vector, `mret`).
//!
//! The SPI fixture mirrors the hardware test bench: a one-bit delay line
//! that is cleared when chip-select is asserted. It answers each byte with
//! the byte shifted right by one, carrying in the low bit of the byte
//! before it.

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};
use soc::csr::{MIE_MTIE, MSTATUS_MIE, MSTATUS_MPIE};
use soc::lsr::{DR, TEMT, THRE};
use soc::map::{
    MTIME, MTIMECMP, SPI_CTRL, SPI_DATA, SPI_DIV, UART_DIV, UART_LSR, UART_RBR, UART_THR,
};
use soc::spi::CTRL_BUSY;

use crate::config::Config;
use crate::csr::ControlStatus;
use crate::flag::IrqFlag;
use crate::mmio::Bus;
use crate::relax::Relax;
use crate::runtime::Runtime;
use crate::trap::{self, GPR_COUNT};

pub const RX_CAPACITY: usize = 64;
pub const TX_CAPACITY: usize = 256;
pub const SPI_LOG_CAPACITY: usize = 32;

/// Where the model pretends the trap vector lives.
pub const SIM_TRAP_VECTOR: usize = 0x8000_0100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpiFixture {
    /// Test bench behaviour: one-bit delay line across the burst.
    DelayLine,
    /// Each byte shifted right by one, no carry between bytes.
    Shift,
}

pub struct SimSoc {
    // CLINT
    mtime: Cell<u64>,
    mtimecmp: Cell<u64>,
    // CSRs
    mstatus: Cell<u32>,
    mie: Cell<u32>,
    mtvec: Cell<usize>,
    // UART
    rx: RefCell<Deque<u8, RX_CAPACITY>>,
    tx: RefCell<Vec<u8, TX_CAPACITY>>,
    tx_busy: Cell<u32>,
    tx_latency: u32,
    uart_div: Cell<u32>,
    // SPI
    spi_fixture: SpiFixture,
    spi_ctrl: Cell<u32>,
    spi_data: Cell<u32>,
    spi_pending: Cell<u8>,
    spi_busy: Cell<u32>,
    spi_latency: u32,
    spi_carry: Cell<u8>,
    spi_div: Cell<u32>,
    spi_sent: RefCell<Vec<u8, SPI_LOG_CAPACITY>>,
    // Hart
    regs: RefCell<[u32; GPR_COUNT]>,
    flag: IrqFlag,
    traps: Cell<u32>,
    ticks: Cell<u64>,
}

impl SimSoc {
    pub fn new() -> Self {
        Self::with_fixture(SpiFixture::DelayLine)
    }

    pub fn with_fixture(spi_fixture: SpiFixture) -> Self {
        SimSoc {
            mtime: Cell::new(0),
            mtimecmp: Cell::new(u64::MAX),
            mstatus: Cell::new(0),
            mie: Cell::new(0),
            mtvec: Cell::new(0),
            rx: RefCell::new(Deque::new()),
            tx: RefCell::new(Vec::new()),
            tx_busy: Cell::new(0),
            tx_latency: 2,
            uart_div: Cell::new(0),
            spi_fixture,
            spi_ctrl: Cell::new(0),
            spi_data: Cell::new(0),
            spi_pending: Cell::new(0),
            spi_busy: Cell::new(0),
            spi_latency: 2,
            spi_carry: Cell::new(0),
            spi_div: Cell::new(0),
            spi_sent: RefCell::new(Vec::new()),
            regs: RefCell::new([0; GPR_COUNT]),
            flag: IrqFlag::new(),
            traps: Cell::new(0),
            ticks: Cell::new(0),
        }
    }

    pub fn flag(&self) -> &IrqFlag {
        &self.flag
    }

    pub fn ticker(&self) -> Ticker<'_> {
        Ticker { soc: self }
    }

    /// A runtime wired to this model, polling through [`Ticker`].
    pub fn runtime(&self, config: Config) -> Runtime<'_, &SimSoc, &SimSoc, Ticker<'_>> {
        Runtime::new(self, self, self.ticker(), &self.flag, config)
    }

    /// One tick of simulated time.
    pub fn tick(&self) {
        self.ticks.set(self.ticks.get() + 1);
        self.mtime.set(self.mtime.get().wrapping_add(1));

        if self.tx_busy.get() > 0 {
            self.tx_busy.set(self.tx_busy.get() - 1);
        }

        if self.spi_busy.get() > 0 {
            self.spi_busy.set(self.spi_busy.get() - 1);
            if self.spi_busy.get() == 0 {
                self.spi_data.set(self.spi_pending.get() as u32);
                self.spi_ctrl.set(self.spi_ctrl.get() & !CTRL_BUSY);
            }
        }

        self.check_interrupt();
    }

    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn timer_pending(&self) -> bool {
        self.mtime.get() >= self.mtimecmp.get()
    }

    fn check_interrupt(&self) {
        let enabled = self.mie.get() & MIE_MTIE != 0 && self.mstatus.get() & MSTATUS_MIE != 0;
        if enabled && self.timer_pending() {
            self.take_trap();
        }
    }

    fn take_trap(&self) {
        assert_ne!(self.mtvec.get(), 0, "timer trap taken with no vector installed");

        // Entry: MPIE <- MIE, MIE <- 0.
        let ms = self.mstatus.get();
        let ms = if ms & MSTATUS_MIE != 0 {
            ms | MSTATUS_MPIE
        } else {
            ms & !MSTATUS_MPIE
        };
        self.mstatus.set(ms & !MSTATUS_MIE);

        trap::handle(&mut self.regs.borrow_mut(), self, &self.flag);

        // mret: MIE <- MPIE, MPIE <- 1.
        let ms = self.mstatus.get();
        let ms = if ms & MSTATUS_MPIE != 0 {
            ms | MSTATUS_MIE
        } else {
            ms & !MSTATUS_MIE
        };
        self.mstatus.set(ms | MSTATUS_MPIE);

        self.traps.set(self.traps.get() + 1);
    }

    pub fn traps_taken(&self) -> u32 {
        self.traps.get()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.get()
    }

    pub fn mtime(&self) -> u64 {
        self.mtime.get()
    }

    pub fn mtimecmp(&self) -> u64 {
        self.mtimecmp.get()
    }

    pub fn mtvec(&self) -> usize {
        self.mtvec.get()
    }

    pub fn regs(&self) -> [u32; GPR_COUNT] {
        *self.regs.borrow()
    }

    /// Register state of the interrupted context. x0 stays zero.
    pub fn set_regs(&self, mut regs: [u32; GPR_COUNT]) {
        regs[0] = 0;
        *self.regs.borrow_mut() = regs;
    }

    /// Queue bytes on the UART receive line. Returns how many fit.
    pub fn push_rx(&self, bytes: &[u8]) -> usize {
        let mut rx = self.rx.borrow_mut();
        bytes.iter().take_while(|&&b| rx.push_back(b).is_ok()).count()
    }

    pub fn uart_output(&self) -> Vec<u8, TX_CAPACITY> {
        self.tx.borrow().clone()
    }

    pub fn uart_divider(&self) -> u32 {
        self.uart_div.get()
    }

    pub fn spi_divider(&self) -> u32 {
        self.spi_div.get()
    }

    pub fn spi_chip_selected(&self) -> bool {
        self.spi_ctrl.get() & !CTRL_BUSY != 0
    }

    pub fn spi_sent(&self) -> Vec<u8, SPI_LOG_CAPACITY> {
        self.spi_sent.borrow().clone()
    }

    fn spi_respond(&self, tx: u8) -> u8 {
        match self.spi_fixture {
            SpiFixture::DelayLine => {
                let rx = (self.spi_carry.get() << 7) | (tx >> 1);
                self.spi_carry.set(tx & 1);
                rx
            }
            SpiFixture::Shift => tx >> 1,
        }
    }

    fn lsr(&self) -> u8 {
        let mut v = 0;
        if self.tx_busy.get() == 0 {
            v |= THRE | TEMT;
        }
        if !self.rx.borrow().is_empty() {
            v |= DR;
        }
        v
    }
}

impl Default for SimSoc {
    fn default() -> Self {
        Self::new()
    }
}

fn set_lo(word: u64, lo: u32) -> u64 {
    (word & !0xffff_ffff) | lo as u64
}

fn set_hi(word: u64, hi: u32) -> u64 {
    (word & 0xffff_ffff) | ((hi as u64) << 32)
}

impl Bus for SimSoc {
    fn read8(&self, addr: usize) -> u8 {
        match addr {
            UART_LSR => self.lsr(),
            UART_RBR => self.rx.borrow_mut().pop_front().unwrap_or(0),
            _ => panic!("sim: unmapped read8 at {addr:#x}"),
        }
    }

    fn write8(&self, addr: usize, value: u8) {
        match addr {
            UART_THR => {
                assert_eq!(self.tx_busy.get(), 0, "sim: THR written while transmitter busy");
                // A full capture buffer drops bytes; tests stay well below it.
                let _ = self.tx.borrow_mut().push(value);
                self.tx_busy.set(self.tx_latency);
            }
            _ => panic!("sim: unmapped write8 at {addr:#x}"),
        }
    }

    fn read32(&self, addr: usize) -> u32 {
        match addr {
            SPI_CTRL => self.spi_ctrl.get(),
            SPI_DATA => self.spi_data.get(),
            SPI_DIV => self.spi_div.get(),
            UART_DIV => self.uart_div.get(),
            MTIME => self.mtime.get() as u32,
            a if a == MTIME + 4 => (self.mtime.get() >> 32) as u32,
            MTIMECMP => self.mtimecmp.get() as u32,
            a if a == MTIMECMP + 4 => (self.mtimecmp.get() >> 32) as u32,
            _ => panic!("sim: unmapped read32 at {addr:#x}"),
        }
    }

    fn write32(&self, addr: usize, value: u32) {
        match addr {
            SPI_CTRL => {
                let was = self.spi_ctrl.get() & !CTRL_BUSY;
                if was == 0 && value != 0 {
                    self.spi_carry.set(0);
                }
                let busy = self.spi_ctrl.get() & CTRL_BUSY;
                self.spi_ctrl.set((value & !CTRL_BUSY) | busy);
            }
            SPI_DATA => {
                assert_eq!(self.spi_busy.get(), 0, "sim: SPI data written while busy");
                let tx = value as u8;
                let _ = self.spi_sent.borrow_mut().push(tx);
                self.spi_pending.set(self.spi_respond(tx));
                self.spi_busy.set(self.spi_latency);
                self.spi_ctrl.set(self.spi_ctrl.get() | CTRL_BUSY);
            }
            SPI_DIV => self.spi_div.set(value),
            UART_DIV => self.uart_div.set(value),
            MTIME => self.mtime.set(set_lo(self.mtime.get(), value)),
            a if a == MTIME + 4 => self.mtime.set(set_hi(self.mtime.get(), value)),
            MTIMECMP => self.mtimecmp.set(set_lo(self.mtimecmp.get(), value)),
            a if a == MTIMECMP + 4 => self.mtimecmp.set(set_hi(self.mtimecmp.get(), value)),
            _ => panic!("sim: unmapped write32 at {addr:#x}"),
        }
    }
}

impl ControlStatus for SimSoc {
    fn mstatus(&self) -> u32 {
        self.mstatus.get()
    }
    fn mstatus_set(&self, mask: u32) {
        self.mstatus.set(self.mstatus.get() | mask);
    }
    fn mstatus_clear(&self, mask: u32) {
        self.mstatus.set(self.mstatus.get() & !mask);
    }
    fn mstatus_read_clear(&self, mask: u32) -> u32 {
        let prev = self.mstatus.get();
        self.mstatus.set(prev & !mask);
        prev
    }
    fn mie(&self) -> u32 {
        self.mie.get()
    }
    fn write_mie(&self, value: u32) {
        self.mie.set(value);
    }
    fn write_mtvec(&self, addr: usize) {
        self.mtvec.set(addr);
    }
}

/// Spin hook that advances the model by one tick.
#[derive(Clone, Copy)]
pub struct Ticker<'a> {
    soc: &'a SimSoc,
}

impl Relax for Ticker<'_> {
    fn relax(&mut self) {
        self.soc.tick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{SelfTestError, SELF_TEST_VECTORS};
    use crate::spi::Spi;
    use crate::timer::TimerState;
    use crate::uart::Uart;

    fn main_flow_regs() -> [u32; GPR_COUNT] {
        let mut regs = [0u32; GPR_COUNT];
        for (i, r) in regs.iter_mut().enumerate().skip(1) {
            *r = 0x5a5a_0000 | (i as u32 * 0x0101);
        }
        regs[trap::SP] = 0x8000_8000;
        regs
    }

    #[test]
    fn test_spi_fixture_vectors() {
        let soc = SimSoc::new();
        let mut spi = Spi::with_relax(&soc, soc.ticker());
        spi.set_chip_select(true);
        assert_eq!(spi.transfer(0xDE), 0x6F);
        assert_eq!(spi.transfer(0xAD), 0x56);
        assert_eq!(spi.transfer(0xBE), 0xDF);
        assert_eq!(spi.transfer(0xAF), 0x57);
        spi.set_chip_select(false);
        assert!(!soc.spi_chip_selected());
        assert_eq!(&soc.spi_sent()[..], &[0xDE, 0xAD, 0xBE, 0xAF]);
    }

    #[test]
    fn test_spi_chip_select_resets_fixture() {
        let soc = SimSoc::new();
        let mut spi = Spi::with_relax(&soc, soc.ticker());
        spi.set_chip_select(true);
        spi.transfer(0x01);
        spi.set_chip_select(false);
        spi.set_chip_select(true);
        assert_eq!(spi.transfer(0xDE), 0x6F);
    }

    #[test]
    fn test_uart_greeting_on_the_wire() {
        let soc = SimSoc::new();
        let mut uart = Uart::with_relax(&soc, soc.ticker());
        for &b in b"Hello UART\n" {
            uart.put_char(b);
        }
        assert_eq!(&soc.uart_output()[..], b"Hello UART\n");
    }

    #[test]
    fn test_uart_get_char_drains_in_order() {
        let soc = SimSoc::new();
        assert_eq!(soc.push_rx(b"xyz"), 3);
        let mut uart = Uart::with_relax(&soc, soc.ticker());
        assert_eq!(uart.get_char(), b'x');
        assert_eq!(uart.get_char(), b'y');
        assert_eq!(uart.get_char(), b'z');
        assert!(!uart.rx_ready());
    }

    #[test]
    fn test_end_to_end_timer_fires_and_registers_survive() {
        let soc = SimSoc::new();
        let regs = main_flow_regs();
        soc.set_regs(regs);

        let mut rt = soc.runtime(Config::DEFAULT.without_self_test());
        rt.bring_up(SIM_TRAP_VECTOR);
        assert_eq!(soc.mtvec(), SIM_TRAP_VECTOR);
        assert_eq!(soc.mtimecmp(), 2);
        assert_eq!(rt.timer().state(soc.flag()), TimerState::ArmedAndEnabled);
        assert!(!soc.flag().is_set());

        let polls = rt.wait_for_timer();
        assert_eq!(polls, 2);
        assert!(soc.mtime() >= 2);
        assert!(soc.flag().is_set());
        assert_eq!(soc.traps_taken(), 1);
        assert_eq!(soc.regs(), regs);
        assert_eq!(rt.timer().state(soc.flag()), TimerState::Fired);
    }

    #[test]
    fn test_trap_does_not_refire() {
        let soc = SimSoc::new();
        let mut rt = soc.runtime(Config::DEFAULT.without_self_test());
        rt.bring_up(SIM_TRAP_VECTOR);
        rt.wait_for_timer();
        soc.advance(1000);
        assert!(soc.timer_pending());
        assert_eq!(soc.traps_taken(), 1);
        assert_eq!(soc.mstatus() & MSTATUS_MIE, 0);
        assert!(soc.flag().is_set());
    }

    #[test]
    fn test_no_trap_before_global_enable() {
        let soc = SimSoc::new();
        soc.write_mie(MIE_MTIE);
        soc.write_mtvec(SIM_TRAP_VECTOR);
        soc.write64(MTIMECMP, 1);
        soc.advance(10);
        assert!(soc.timer_pending());
        assert_eq!(soc.traps_taken(), 0);
        assert!(!soc.flag().is_set());
    }

    #[test]
    fn test_full_boot_with_self_test() {
        let soc = SimSoc::new();
        let regs = main_flow_regs();
        soc.set_regs(regs);

        let mut cfg = Config::DEFAULT;
        cfg.spi_self_test = true;
        let mut rt = soc.runtime(cfg);

        assert_eq!(rt.start(SIM_TRAP_VECTOR), Ok(()));
        assert_eq!(&soc.uart_output()[..], b"Hello UART\n");
        let sent: std::vec::Vec<u8> = SELF_TEST_VECTORS.iter().map(|v| v.0).collect();
        assert_eq!(&soc.spi_sent()[..], &sent[..]);
        assert!(!soc.spi_chip_selected());
        assert_eq!(soc.traps_taken(), 1);
        assert_eq!(soc.regs(), regs);
    }

    #[test]
    fn test_self_test_mismatch_stops_boot() {
        let soc = SimSoc::with_fixture(SpiFixture::Shift);
        let mut cfg = Config::DEFAULT;
        cfg.spi_self_test = true;
        let mut rt = soc.runtime(cfg);

        let err = rt.start(SIM_TRAP_VECTOR).unwrap_err();
        assert_eq!(
            err,
            SelfTestError::Mismatch {
                index: 2,
                sent: 0xBE,
                expected: 0xDF,
                received: 0x5F,
            }
        );
        assert_eq!(err.exit_code(), 1);
        assert!(soc.spi_chip_selected());
        assert!(soc.uart_output().is_empty());
        assert_eq!(&soc.spi_sent()[..], &[0xDE, 0xAD, 0xBE]);
    }

    #[test]
    fn test_echo_folds_case() {
        let soc = SimSoc::new();
        let mut rt = soc.runtime(Config::DEFAULT.without_self_test());
        rt.start(SIM_TRAP_VECTOR).unwrap();

        soc.push_rx(b"QA");
        assert_eq!(rt.echo_once(), b'q');
        assert_eq!(rt.echo_once(), b'a');
        soc.push_rx(b"z1[");
        for _ in 0..3 {
            rt.echo_once();
        }
        assert_eq!(&soc.uart_output()[..], b"Hello UART\nqaz1[");
    }

    #[test]
    fn test_echo_blocks_until_byte_arrives() {
        let soc = SimSoc::new();
        let mut rt = soc.runtime(Config::DEFAULT.without_self_test());
        rt.start(SIM_TRAP_VECTOR).unwrap();
        let before = soc.ticks();

        // Nothing queued: the line delivers a byte after five ticks.
        let line = &soc;
        let mut n = 0;
        let mut uart = Uart::with_relax(line, move || {
            line.tick();
            n += 1;
            if n == 5 {
                line.push_rx(b"M");
            }
        });
        assert_eq!(uart.get_char(), b'M');
        assert!(soc.ticks() - before >= 5);
    }

    #[test]
    fn test_dividers_written_when_configured() {
        let soc = SimSoc::new();
        let mut cfg = Config::DEFAULT.without_self_test();
        cfg.uart_divider = Some(217);
        cfg.spi_divider = Some(8);
        let mut rt = soc.runtime(cfg);
        rt.bring_up(SIM_TRAP_VECTOR);
        assert_eq!(soc.uart_divider(), 217);
        assert_eq!(soc.spi_divider(), 8);
    }
}
