use core::fmt;

use soc::lsr::{DR, TEMT, THRE};
use soc::map::{UART_DIV, UART_LSR, UART_RBR, UART_THR};

use crate::mmio::Bus;
use crate::relax::{spin_until, Relax, SpinLoop};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Polled 16550-style UART. No buffering, no error bits.
pub struct Uart<B, R = SpinLoop> {
    bus: B,
    relax: R,
}

impl<B: Bus> Uart<B> {
    pub const fn new(bus: B) -> Self {
        Uart {
            bus,
            relax: SpinLoop,
        }
    }
}

impl<B: Bus, R: Relax> Uart<B, R> {
    pub const fn with_relax(bus: B, relax: R) -> Self {
        Uart { bus, relax }
    }

    #[inline(always)]
    fn lsr(&self) -> u8 {
        self.bus.read8(UART_LSR)
    }

    /// Wait for THR empty and transmitter idle, then send one byte.
    pub fn put_char(&mut self, byte: u8) {
        let bus = &self.bus;
        spin_until(&mut self.relax, || {
            bus.read8(UART_LSR) & (THRE | TEMT) == (THRE | TEMT)
        });
        self.bus.write8(UART_THR, byte);
    }

    /// Wait for data ready, then take one byte.
    pub fn get_char(&mut self) -> u8 {
        let bus = &self.bus;
        spin_until(&mut self.relax, || bus.read8(UART_LSR) & DR != 0);
        self.bus.read8(UART_RBR)
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_char(b);
        }
    }

    pub fn put_hex_byte(&mut self, byte: u8) {
        self.put_char(HEX_DIGITS[(byte >> 4) as usize]);
        self.put_char(HEX_DIGITS[(byte & 0xF) as usize]);
    }

    /// Each byte as two hex digits followed by a space.
    pub fn put_hex(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_hex_byte(b);
            self.put_char(b' ');
        }
    }

    pub fn set_divider(&mut self, div: u32) {
        self.bus.write32(UART_DIV, div);
    }

    pub fn rx_ready(&self) -> bool {
        self.lsr() & DR != 0
    }
}

impl<B: Bus, R: Relax> fmt::Write for Uart<B, R> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            match b {
                b'\n' => {
                    self.put_char(b'\r');
                    self.put_char(b'\n');
                }
                byte => self.put_char(byte),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// LSR reports TX ready only after `tx_busy` polls; RX bytes come from a queue.
    #[derive(Default)]
    struct Line {
        tx_busy: Cell<u32>,
        lsr_reads: Cell<u32>,
        rx: RefCell<VecDeque<u8>>,
        wire: RefCell<Vec<u8>>,
        div: Cell<u32>,
    }

    impl Bus for Line {
        fn read8(&self, addr: usize) -> u8 {
            match addr {
                UART_LSR => {
                    self.lsr_reads.set(self.lsr_reads.get() + 1);
                    let mut v = 0;
                    if self.tx_busy.get() == 0 {
                        v |= THRE | TEMT;
                    } else {
                        self.tx_busy.set(self.tx_busy.get() - 1);
                    }
                    if !self.rx.borrow().is_empty() {
                        v |= DR;
                    }
                    v
                }
                UART_RBR => self.rx.borrow_mut().pop_front().unwrap_or(0),
                _ => panic!("unexpected read8 at {addr:#x}"),
            }
        }
        fn write8(&self, addr: usize, value: u8) {
            assert_eq!(addr, UART_THR);
            self.wire.borrow_mut().push(value);
        }
        fn read32(&self, addr: usize) -> u32 {
            panic!("unexpected read32 at {addr:#x}")
        }
        fn write32(&self, addr: usize, value: u32) {
            assert_eq!(addr, UART_DIV);
            self.div.set(value);
        }
    }

    #[test]
    fn test_put_char_order_preserved() {
        let line = Line::default();
        let mut uart = Uart::new(&line);
        for &b in b"Hello UART\n" {
            uart.put_char(b);
        }
        assert_eq!(&line.wire.borrow()[..], b"Hello UART\n");
    }

    #[test]
    fn test_put_char_waits_for_both_bits() {
        struct HalfReady {
            polls: Cell<u32>,
            sent: Cell<Option<u8>>,
        }
        impl Bus for HalfReady {
            fn read8(&self, _addr: usize) -> u8 {
                let n = self.polls.get() + 1;
                self.polls.set(n);
                // THRE alone for the first polls, TEMT joins on the fourth.
                if n < 4 { THRE } else { THRE | TEMT }
            }
            fn write8(&self, _addr: usize, value: u8) {
                assert_eq!(self.polls.get(), 4, "wrote before transmitter idle");
                self.sent.set(Some(value));
            }
            fn read32(&self, _: usize) -> u32 { 0 }
            fn write32(&self, _: usize, _: u32) {}
        }

        let bus = HalfReady { polls: Cell::new(0), sent: Cell::new(None) };
        let mut spins = 0;
        let mut uart = Uart::with_relax(&bus, || spins += 1);
        uart.put_char(b'x');
        drop(uart);
        assert_eq!(bus.sent.get(), Some(b'x'));
        assert_eq!(spins, 3);
    }

    #[test]
    fn test_put_char_spins_while_busy() {
        let line = Line::default();
        line.tx_busy.set(3);
        let mut spins = 0;
        let mut uart = Uart::with_relax(&line, || spins += 1);
        uart.put_char(b'A');
        drop(uart);
        assert_eq!(spins, 3);
        assert_eq!(&line.wire.borrow()[..], b"A");
    }

    #[test]
    fn test_get_char_waits_for_data_ready() {
        let line = Line::default();
        let mut spins = 0;
        {
            let mut uart = Uart::with_relax(&line, || {
                spins += 1;
                if spins == 2 {
                    line.rx.borrow_mut().push_back(b'Q');
                }
            });
            assert_eq!(uart.get_char(), b'Q');
        }
        assert_eq!(spins, 2);
    }

    #[test]
    fn test_rx_ready() {
        let line = Line::default();
        let uart = Uart::new(&line);
        assert!(!uart.rx_ready());
        line.rx.borrow_mut().push_back(1);
        assert!(uart.rx_ready());
    }

    #[test]
    fn test_put_hex() {
        let line = Line::default();
        let mut uart = Uart::new(&line);
        uart.put_hex_byte(0x0F);
        uart.put_hex(&[0xDE, 0xAD]);
        assert_eq!(&line.wire.borrow()[..], b"0FDE AD ");
    }

    #[test]
    fn test_fmt_write_translates_newline() {
        let line = Line::default();
        let mut uart = Uart::new(&line);
        write!(uart, "ok\n").unwrap();
        assert_eq!(&line.wire.borrow()[..], b"ok\r\n");
    }

    #[test]
    fn test_set_divider() {
        let line = Line::default();
        let mut uart = Uart::new(&line);
        uart.set_divider(217);
        assert_eq!(line.div.get(), 217);
    }
}
