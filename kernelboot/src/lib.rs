//! kernelboot library - the runtime's drivers and control flow.
//!
//! Everything here is written against the [`mmio::Bus`], [`csr::ControlStatus`]
//! and [`relax::Relax`] seams, so the firmware binary runs it on the SoC while
//! tests run it on the host against the model in [`sim`].

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod csr;
pub mod flag;
pub mod mmio;
pub mod relax;
pub mod runtime;
pub mod spi;
pub mod timer;
pub mod trap;
pub mod uart;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::Config;
pub use flag::IrqFlag;
pub use runtime::{fold_case, Runtime, SelfTestError};
