//! Interrupt-completion flag shared between the trap handler and the main flow.
//!
//! One writer (the trap handler, exactly once) and one reader (the main
//! flow, spinning). It cannot be cleared once set.
//!
//! `Release` on the store pairs with `Acquire` on the load: nothing the main
//! flow does after observing the flag may be hoisted above the observation.
//! On a single RV32 hart both lower to a plain `sw`/`lw` plus a `fence`.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::relax::{spin_until, Relax};

#[derive(Debug)]
pub struct IrqFlag(AtomicBool);

impl IrqFlag {
    pub const fn new() -> Self {
        IrqFlag(AtomicBool::new(false))
    }

    /// Called only from the trap handler.
    #[inline(always)]
    pub fn publish(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Spin until the trap handler has published. Returns the number of
    /// polls that observed the flag clear.
    pub fn wait<R: Relax>(&self, relax: &mut R) -> usize {
        let mut polls = 0;
        spin_until(relax, || {
            if self.is_set() {
                true
            } else {
                polls += 1;
                false
            }
        });
        polls
    }
}

impl Default for IrqFlag {
    fn default() -> Self {
        Self::new()
    }
}
