use core::arch::global_asm;

// Reset stub: stack, .bss, Rust, then park with the exit status in a0.
global_asm!(
    r#"
    .section .text.entry
    .globl _start
_start:
    la   sp, _stack_top
    andi sp, sp, -16

    /* Zero .bss */
    la   t0, __bss_start
    la   t1, __bss_end
1:
    bgeu t0, t1, 2f
    sw   zero, 0(t0)
    addi t0, t0, 4
    j    1b
2:
    call rust_start

    /* rust_start only returns on a failed self-test; a0 = status */
3:  wfi
    j    3b
"#
);
