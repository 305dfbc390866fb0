//! In-process emulator capability set
//!
//! Mirrors the emulator library's C API (`emu_init`, `emu_step`,
//! `emu_get_screen`, `emu_reset`, `emu_read_memory`, `emu_write_memory`,
//! `emu_cleanup`). Implemented by `ffi::FfiEmulator` for the real library and
//! by `stub::StubEmulator` for tests and the stub bridge worker.

use eg_core::Buttons;

pub trait EmulatorHost: Send {
    /// Load the ROM and power on
    fn init(&mut self, rom_path: &str) -> Result<(), String>;

    /// Restart the game from power-on
    fn reset(&mut self);

    /// Run one frame with `buttons` held
    fn step(&mut self, buttons: Buttons);

    /// Copy the current 240x160 RGB888 screen into `out` (`OBS_LEN` bytes)
    fn get_screen(&mut self, out: &mut [u8]);

    fn read_byte(&mut self, addr: u32) -> u8;

    fn write_byte(&mut self, addr: u32, value: u8);

    /// Frames run since power-on
    fn frame_count(&self) -> u32;

    /// Free the emulator. Must tolerate being called twice.
    fn cleanup(&mut self);
}
