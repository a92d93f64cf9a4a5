//! The hook every busy-wait calls once per poll iteration.

pub trait Relax {
    fn relax(&mut self);
}

/// Hardware default: a plain spin hint.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpinLoop;

impl Relax for SpinLoop {
    #[inline(always)]
    fn relax(&mut self) {
        core::hint::spin_loop();
    }
}

impl<F: FnMut()> Relax for F {
    #[inline(always)]
    fn relax(&mut self) {
        self()
    }
}

/// Spin until `ready` returns true. No timeout.
#[inline(always)]
pub fn spin_until<R: Relax>(relax: &mut R, mut ready: impl FnMut() -> bool) {
    while !ready() {
        relax.relax();
    }
}
