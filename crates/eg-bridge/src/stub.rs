//! Stub emulator host
//!
//! A deterministic stand-in for the emulator library: sparse RAM that reads
//! back what was written, a frame counter, and a screen filled with a shade
//! derived from the frame number. It runs no game code. Tests poke RAM to
//! stage game-state changes, and the stub bridge worker serves it over TCP.

use std::collections::HashMap;

use eg_core::Buttons;

use crate::host::EmulatorHost;

#[derive(Debug, Default)]
pub struct StubEmulator {
    ram: HashMap<u32, u8>,
    frame: u32,
    initialised: bool,
    init_error: Option<String>,
    last_buttons: Buttons,
    resets: u32,
    cleanups: u32,
}

impl StubEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stub whose `init` always fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            init_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Screen fill value after `frame` frames
    pub fn shade(frame: u32) -> u8 {
        (frame % 256) as u8
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    pub fn last_buttons(&self) -> Buttons {
        self.last_buttons
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn cleanups(&self) -> u32 {
        self.cleanups
    }
}

impl EmulatorHost for StubEmulator {
    fn init(&mut self, rom_path: &str) -> Result<(), String> {
        if let Some(reason) = &self.init_error {
            return Err(reason.clone());
        }
        tracing::debug!(rom = rom_path, "stub emulator powered on");
        self.ram.clear();
        self.frame = 0;
        self.initialised = true;
        Ok(())
    }

    fn reset(&mut self) {
        self.ram.clear();
        self.frame = 0;
        self.last_buttons = Buttons::empty();
        self.resets += 1;
    }

    fn step(&mut self, buttons: Buttons) {
        self.last_buttons = buttons;
        self.frame = self.frame.wrapping_add(1);
    }

    fn get_screen(&mut self, out: &mut [u8]) {
        out.fill(Self::shade(self.frame));
    }

    fn read_byte(&mut self, addr: u32) -> u8 {
        self.ram.get(&addr).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: u32, value: u8) {
        self.ram.insert(addr, value);
    }

    fn frame_count(&self) -> u32 {
        self.frame
    }

    fn cleanup(&mut self) {
        if self.initialised {
            self.initialised = false;
            self.cleanups += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_and_frames() {
        let mut emu = StubEmulator::new();
        emu.init("emerald.gba").unwrap();
        emu.write_byte(0x0202_420C, 0x03);
        emu.step(Buttons::START);
        emu.step(Buttons::empty());

        assert_eq!(emu.read_byte(0x0202_420C), 0x03);
        assert_eq!(emu.read_byte(0x0202_420D), 0);
        assert_eq!(emu.frame_count(), 2);

        let mut screen = [0xFFu8; 12];
        emu.get_screen(&mut screen);
        assert!(screen.iter().all(|&p| p == StubEmulator::shade(2)));

        emu.reset();
        assert_eq!(emu.read_byte(0x0202_420C), 0);
        assert_eq!(emu.frame_count(), 0);
    }

    #[test]
    fn test_cleanup_twice() {
        let mut emu = StubEmulator::new();
        emu.init("emerald.gba").unwrap();
        emu.cleanup();
        emu.cleanup();
        assert_eq!(emu.cleanups(), 1);
    }
}
