// kernelboot/src/trap.rs
//! Machine-timer trap: register frame layout and the handler body.
//!
//! The raw vector in the firmware binary reserves a [`RegisterFrame`] on the
//! interrupted stack, stores x1..x31 into it, calls [`service`], reloads
//! x31..x1 and executes `mret`. [`handle`] replays that exact sequence over
//! an explicit register file so it can be checked off-target.

use soc::csr::{MSTATUS_MIE, MSTATUS_MPIE};

use crate::csr::ControlStatus;
use crate::flag::IrqFlag;

/// Source of the raw vector linked into the firmware (`__trap_entry`).
pub const TRAP_VECTOR_ASM: &str = include_str!("trap_vector.S");

pub const GPR_COUNT: usize = 32;
pub const FRAME_BYTES: usize = GPR_COUNT * 4;

// ABI register numbers.
pub const RA: usize = 1;
pub const SP: usize = 2;
pub const T0: usize = 5;
pub const A0: usize = 10;

/// Slot `i` holds `x{i}`. Slot 0 is never loaded back (x0 is hardwired).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterFrame {
    pub x: [u32; GPR_COUNT],
}

const _: () = assert!(core::mem::size_of::<RegisterFrame>() == FRAME_BYTES);
const _: () = assert!(FRAME_BYTES % 16 == 0);

impl RegisterFrame {
    pub const fn zeroed() -> Self {
        RegisterFrame { x: [0; GPR_COUNT] }
    }

    /// Store x1..x31 in ascending order.
    pub fn save(regs: &[u32; GPR_COUNT]) -> Self {
        let mut frame = Self::zeroed();
        for i in 1..GPR_COUNT {
            frame.x[i] = regs[i];
        }
        frame
    }

    /// Reload x31..x1 in descending order. x0 is left as is.
    pub fn restore(&self, regs: &mut [u32; GPR_COUNT]) {
        for i in (1..GPR_COUNT).rev() {
            regs[i] = self.x[i];
        }
    }

    pub const fn offset_of(reg: usize) -> usize {
        reg * 4
    }
}

/// Acknowledge the timer and publish completion.
///
/// `csrrc` drops MPIE so the closing `mret` leaves MIE clear and the still
/// pending MTIP cannot refire; MIE itself is cleared next. Returns the
/// `mstatus` value read by `csrrc` (it lands in t0 on hardware).
pub fn service<C: ControlStatus>(csr: &C, flag: &IrqFlag) -> u32 {
    let prev = csr.mstatus_read_clear(MSTATUS_MPIE);
    csr.mstatus_clear(MSTATUS_MIE);
    flag.publish();
    prev
}

/// Whole handler over an explicit register file: save, run the body
/// (which scribbles on the scratch registers the way the real vector does),
/// restore.
pub fn handle<C: ControlStatus>(regs: &mut [u32; GPR_COUNT], csr: &C, flag: &IrqFlag) {
    let saved_sp = regs[SP];
    let frame_base = saved_sp.wrapping_sub(FRAME_BYTES as u32);
    regs[SP] = frame_base;

    let mut frame = RegisterFrame::save(regs);
    frame.x[SP] = saved_sp;

    // Body: `mv a0, sp; call rust_trap`, with `csrrc` writing t0.
    regs[A0] = frame_base;
    regs[RA] = 0;
    regs[T0] = service(csr, flag);

    frame.restore(regs);
    // sp comes back by releasing the frame, not by a load.
    regs[SP] = frame_base.wrapping_add(FRAME_BYTES as u32);
}
