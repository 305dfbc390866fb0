//! Rust FFI bindings for the native emulator library (`libpokemon_emu_lib`).
//!
//! Provides extern fn declarations and a safe `FfiEmulator` wrapper
//! implementing `EmulatorHost`. Only built with the `ffi` feature; the
//! library is located through `EMERALD_EMU_LIB_DIR` at build time.

use std::ffi::CString;

use eg_core::Buttons;
use eg_core::observation::OBS_LEN;
use libc::{c_char, c_void};

use crate::host::EmulatorHost;

// ============================================================================
// FFI Function Declarations
// ============================================================================

unsafe extern "C" {
    pub fn emu_init(rom_path: *const c_char) -> *mut c_void;
    pub fn emu_step(handle: *mut c_void, buttons: u8);
    pub fn emu_get_screen(handle: *mut c_void, buffer: *mut u8);
    pub fn emu_reset(handle: *mut c_void);
    pub fn emu_cleanup(handle: *mut c_void);
    pub fn emu_read_memory(handle: *mut c_void, addr: u32) -> u8;
    pub fn emu_write_memory(handle: *mut c_void, addr: u32, value: u8);
    pub fn emu_get_frame_count(handle: *mut c_void) -> u32;
}

// ============================================================================
// Safe Rust Wrapper
// ============================================================================

/// Safe wrapper around one native emulator instance
pub struct FfiEmulator {
    handle: *mut c_void,
}

// The handle is owned by exactly one wrapper and only used through `&mut self`.
unsafe impl Send for FfiEmulator {}

impl FfiEmulator {
    pub fn new() -> Self {
        Self {
            handle: std::ptr::null_mut(),
        }
    }

    pub fn is_initialised(&self) -> bool {
        !self.handle.is_null()
    }
}

impl Default for FfiEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorHost for FfiEmulator {
    fn init(&mut self, rom_path: &str) -> Result<(), String> {
        if self.is_initialised() {
            return Ok(());
        }
        let rom_c = CString::new(rom_path).map_err(|e| format!("Invalid ROM path: {}", e))?;
        let handle = unsafe { emu_init(rom_c.as_ptr()) };
        if handle.is_null() {
            return Err(format!("Failed to initialise emulator with {}", rom_path));
        }
        self.handle = handle;
        Ok(())
    }

    fn reset(&mut self) {
        if self.is_initialised() {
            unsafe { emu_reset(self.handle) };
        }
    }

    fn step(&mut self, buttons: Buttons) {
        if self.is_initialised() {
            unsafe { emu_step(self.handle, buttons.bits()) };
        }
    }

    fn get_screen(&mut self, out: &mut [u8]) {
        if !self.is_initialised() || out.len() < OBS_LEN {
            out.fill(0);
            return;
        }
        unsafe { emu_get_screen(self.handle, out.as_mut_ptr()) };
    }

    fn read_byte(&mut self, addr: u32) -> u8 {
        if !self.is_initialised() {
            return 0;
        }
        unsafe { emu_read_memory(self.handle, addr) }
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        if self.is_initialised() {
            unsafe { emu_write_memory(self.handle, addr, value) };
        }
    }

    fn frame_count(&self) -> u32 {
        if !self.is_initialised() {
            return 0;
        }
        unsafe { emu_get_frame_count(self.handle) }
    }

    fn cleanup(&mut self) {
        if self.is_initialised() {
            unsafe { emu_cleanup(self.handle) };
            self.handle = std::ptr::null_mut();
        }
    }
}

impl Drop for FfiEmulator {
    fn drop(&mut self) {
        self.cleanup();
    }
}
