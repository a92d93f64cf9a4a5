//! Machine-mode control/status registers used by the timer and trap paths.

pub trait ControlStatus {
    fn mstatus(&self) -> u32;
    /// `csrs mstatus, mask`
    fn mstatus_set(&self, mask: u32);
    /// `csrc mstatus, mask`
    fn mstatus_clear(&self, mask: u32);
    /// `csrrc rd, mstatus, mask`: clears `mask`, returns the previous value.
    fn mstatus_read_clear(&self, mask: u32) -> u32;

    fn mie(&self) -> u32;
    fn write_mie(&self, value: u32);

    /// Install a direct-mode trap vector.
    fn write_mtvec(&self, addr: usize);
}

impl<T: ControlStatus + ?Sized> ControlStatus for &T {
    fn mstatus(&self) -> u32 {
        (**self).mstatus()
    }
    fn mstatus_set(&self, mask: u32) {
        (**self).mstatus_set(mask)
    }
    fn mstatus_clear(&self, mask: u32) {
        (**self).mstatus_clear(mask)
    }
    fn mstatus_read_clear(&self, mask: u32) -> u32 {
        (**self).mstatus_read_clear(mask)
    }
    fn mie(&self) -> u32 {
        (**self).mie()
    }
    fn write_mie(&self, value: u32) {
        (**self).write_mie(value)
    }
    fn write_mtvec(&self, addr: usize) {
        (**self).write_mtvec(addr)
    }
}

#[cfg(target_arch = "riscv32")]
pub use machine::MachineCsr;

#[cfg(target_arch = "riscv32")]
mod machine {
    use core::arch::asm;
    use riscv::register::{mie, mstatus};

    /// CSRs of the running hart.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MachineCsr;

    impl super::ControlStatus for MachineCsr {
        #[inline(always)]
        fn mstatus(&self) -> u32 {
            mstatus::read().bits() as u32
        }

        #[inline(always)]
        fn mstatus_set(&self, mask: u32) {
            unsafe { asm!("csrs mstatus, {0}", in(reg) mask) }
        }

        #[inline(always)]
        fn mstatus_clear(&self, mask: u32) {
            unsafe { asm!("csrc mstatus, {0}", in(reg) mask) }
        }

        #[inline(always)]
        fn mstatus_read_clear(&self, mask: u32) -> u32 {
            let prev: u32;
            unsafe { asm!("csrrc {0}, mstatus, {1}", out(reg) prev, in(reg) mask) }
            prev
        }

        #[inline(always)]
        fn mie(&self) -> u32 {
            mie::read().bits() as u32
        }

        #[inline(always)]
        fn write_mie(&self, value: u32) {
            unsafe { asm!("csrw mie, {0}", in(reg) value) }
        }

        /// Direct mode: MODE bits are zero, so the entry must be 4-byte aligned.
        fn write_mtvec(&self, addr: usize) {
            debug_assert_eq!(addr & 0b11, 0);
            unsafe { asm!("csrw mtvec, {0}", in(reg) addr) }
        }
    }
}
