// kernelboot/src/timer.rs
use soc::csr::{MIE_MTIE, MSTATUS_MIE};
use soc::map::{MTIME, MTIMECMP};

use crate::csr::ControlStatus;
use crate::flag::IrqFlag;
use crate::mmio::Bus;

/// Fixed one-shot interval used at boot, in `mtime` ticks.
pub const BOOT_INTERVAL: u64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    InterruptsDisabled,
    ArmedAndEnabled,
    Fired,
}

/// CLINT machine timer plus the interrupt enables that gate it.
pub struct Timer<B, C> {
    bus: B,
    csr: C,
    armed: bool,
}

impl<B: Bus, C: ControlStatus> Timer<B, C> {
    pub const fn new(bus: B, csr: C) -> Self {
        Timer {
            bus,
            csr,
            armed: false,
        }
    }

    pub fn now(&self) -> u64 {
        self.bus.read64(MTIME)
    }

    /// One-shot relative deadline. Counter wraparound is not handled.
    pub fn arm(&mut self, interval: u64) -> u64 {
        let deadline = self.now().wrapping_add(interval);
        self.bus.write64(MTIMECMP, deadline);
        self.armed = true;
        deadline
    }

    /// Set MTIE, leaving the other `mie` bits alone.
    pub fn enable_source(&mut self) {
        let mie = self.csr.mie();
        self.csr.write_mie(mie | MIE_MTIE);
    }

    pub fn enable_global(&mut self) {
        self.csr.mstatus_set(MSTATUS_MIE);
    }

    pub fn disable_global(&mut self) {
        self.csr.mstatus_clear(MSTATUS_MIE);
    }

    pub fn install_vector(&mut self, entry: usize) {
        self.csr.write_mtvec(entry);
    }

    pub fn state(&self, flag: &IrqFlag) -> TimerState {
        if flag.is_set() {
            return TimerState::Fired;
        }
        let source = self.csr.mie() & MIE_MTIE != 0;
        let global = self.csr.mstatus() & MSTATUS_MIE != 0;
        if self.armed && source && global {
            TimerState::ArmedAndEnabled
        } else {
            TimerState::InterruptsDisabled
        }
    }
}
