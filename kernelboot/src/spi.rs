use soc::map::{SPI_CTRL, SPI_DATA, SPI_DIV};
use soc::spi::{CS_ASSERT, CS_DEASSERT, CTRL_BUSY};

use crate::mmio::Bus;
use crate::relax::{spin_until, Relax, SpinLoop};

/// Polled SPI controller with a single in-flight transfer slot.
///
/// Chip-select is driven by the caller and is active-high on this SoC.
pub struct Spi<B, R = SpinLoop> {
    bus: B,
    relax: R,
}

impl<B: Bus> Spi<B> {
    pub const fn new(bus: B) -> Self {
        Spi {
            bus,
            relax: SpinLoop,
        }
    }
}

impl<B: Bus, R: Relax> Spi<B, R> {
    pub const fn with_relax(bus: B, relax: R) -> Self {
        Spi { bus, relax }
    }

    pub fn set_chip_select(&mut self, asserted: bool) {
        let v = if asserted { CS_ASSERT } else { CS_DEASSERT };
        self.bus.write32(SPI_CTRL, v);
    }

    pub fn set_divider(&mut self, div: u32) {
        self.bus.write32(SPI_DIV, div);
    }

    #[inline(always)]
    fn wait_idle(&mut self) {
        let bus = &self.bus;
        spin_until(&mut self.relax, || bus.read32(SPI_CTRL) & CTRL_BUSY == 0);
    }

    /// Full-duplex exchange of one byte.
    pub fn transfer(&mut self, tx: u8) -> u8 {
        self.wait_idle();
        self.bus.write32(SPI_DATA, tx as u32);
        self.wait_idle();
        self.bus.read32(SPI_DATA) as u8
    }
}
