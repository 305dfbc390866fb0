//! Build script for eg-bridge
//!
//! Links the native emulator library when the `ffi` feature is enabled.

fn main() {
    println!("cargo:rerun-if-env-changed=EMERALD_EMU_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_FFI").is_none() {
        return;
    }

    if let Some(dir) = std::env::var_os("EMERALD_EMU_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    } else {
        println!("cargo:warning=EMERALD_EMU_LIB_DIR not set, relying on the default linker search path");
    }
    println!("cargo:rustc-link-lib=dylib=pokemon_emu_lib");
}
