#![no_std]
#![no_main]

#[macro_use]
mod logging;
mod entry;
mod trap_entry;

use core::convert::Infallible;

use kernelboot_lib::csr::MachineCsr;
use kernelboot_lib::mmio::Mmio;
use kernelboot_lib::relax::SpinLoop;
use kernelboot_lib::trap::{self, RegisterFrame};
use kernelboot_lib::{Config, IrqFlag, Runtime, SelfTestError};

/// Set once by the timer trap, polled by `rust_start`.
static IRQ_FLAG: IrqFlag = IrqFlag::new();

fn boot() -> Result<Infallible, SelfTestError> {
    let config = Config::DEFAULT;
    kinfo!(
        "kernelboot: timer in {} ticks, spi self-test {}",
        config.timer_interval,
        if config.spi_self_test { "on" } else { "off" }
    );

    // SAFETY: every register the runtime touches is part of the SoC map.
    let bus = unsafe { Mmio::new() };
    let rt = Runtime::new(bus, MachineCsr, SpinLoop, &IRQ_FLAG, config);
    let vector = trap_entry::__trap_entry as usize;
    kdebug!("mtvec <- {:#010x}, mtime {}", vector, rt.timer().now());
    rt.run(vector)
}

#[no_mangle]
extern "C" fn rust_start() -> i32 {
    match boot() {
        Ok(never) => match never {},
        Err(e) => {
            kerror!("{}", e);
            e.exit_code()
        }
    }
}

/// Called from `__trap_entry` with every GPR already on the stack.
#[no_mangle]
extern "C" fn rust_trap(_frame: &mut RegisterFrame) {
    trap::service(&MachineCsr, &IRQ_FLAG);
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::fmt::Write;
    let mut uart = logging::sink();
    let _ = writeln!(uart, "\n*** PANIC ***");
    if let Some(loc) = info.location() {
        let _ = writeln!(uart, "at {}:{}:{}", loc.file(), loc.line(), loc.column());
    }
    let _ = writeln!(uart, "{}", info.message());

    loop {
        unsafe { riscv::asm::wfi(); }
    }
}
