//! Volatile access to memory-mapped device registers.
//!
//! Drivers are written against [`Bus`] so they run unchanged on the SoC
//! ([`Mmio`]) and against the host-side model in `sim`.

use core::ptr;

pub trait Bus {
    fn read8(&self, addr: usize) -> u8;
    fn write8(&self, addr: usize, value: u8);
    fn read32(&self, addr: usize) -> u32;
    fn write32(&self, addr: usize, value: u32);

    /// 64-bit registers on RV32 are two word accesses, low word first.
    fn read64(&self, addr: usize) -> u64 {
        let lo = self.read32(addr) as u64;
        let hi = self.read32(addr + 4) as u64;
        (hi << 32) | lo
    }

    fn write64(&self, addr: usize, value: u64) {
        self.write32(addr, value as u32);
        self.write32(addr + 4, (value >> 32) as u32);
    }
}

impl<T: Bus + ?Sized> Bus for &T {
    #[inline(always)]
    fn read8(&self, addr: usize) -> u8 {
        (**self).read8(addr)
    }
    #[inline(always)]
    fn write8(&self, addr: usize, value: u8) {
        (**self).write8(addr, value)
    }
    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        (**self).read32(addr)
    }
    #[inline(always)]
    fn write32(&self, addr: usize, value: u32) {
        (**self).write32(addr, value)
    }
    fn read64(&self, addr: usize) -> u64 {
        (**self).read64(addr)
    }
    fn write64(&self, addr: usize, value: u64) {
        (**self).write64(addr, value)
    }
}

/// The physical address space of the running hart.
#[derive(Clone, Copy, Debug)]
pub struct Mmio {
    _priv: (),
}

impl Mmio {
    /// # Safety
    /// Every address later passed to the returned bus must be a device
    /// register (or RAM) that is mapped on the running SoC.
    pub const unsafe fn new() -> Self {
        Mmio { _priv: () }
    }
}

impl Bus for Mmio {
    #[inline(always)]
    fn read8(&self, addr: usize) -> u8 {
        // SAFETY: upheld by the caller of `Mmio::new`.
        unsafe { ptr::read_volatile(addr as *const u8) }
    }

    #[inline(always)]
    fn write8(&self, addr: usize, value: u8) {
        unsafe { ptr::write_volatile(addr as *mut u8, value) }
    }

    #[inline(always)]
    fn read32(&self, addr: usize) -> u32 {
        unsafe { ptr::read_volatile(addr as *const u32) }
    }

    #[inline(always)]
    fn write32(&self, addr: usize, value: u32) {
        unsafe { ptr::write_volatile(addr as *mut u32, value) }
    }
}
