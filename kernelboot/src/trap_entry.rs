// kernelboot/src/trap_entry.rs
use core::arch::global_asm;

// Same text the library checks in `trap::TRAP_VECTOR_ASM`.
global_asm!(include_str!("trap_vector.S"));

extern "C" {
    pub fn __trap_entry();
}
