// kernelboot/build.rs
use std::path::PathBuf;

fn main() {
    let target = std::env::var("TARGET").unwrap_or_default();

    println!("cargo:rerun-if-env-changed=KERNELBOOT_LD");

    // Only link with a script for the riscv firmware, not for host tests
    if target.contains("riscv") {
        let script = match std::env::var_os("KERNELBOOT_LD") {
            Some(path) => PathBuf::from(path),
            None => {
                let dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into());
                PathBuf::from(dir).join("memory.ld")
            }
        };
        println!("cargo:rerun-if-changed={}", script.display());

        println!("cargo:rustc-link-arg-bins=-T{}", script.display());
        println!("cargo:rustc-link-arg-bins=-Map=kernelboot.map");
    }
}
