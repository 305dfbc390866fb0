//! Bridge transports
//!
//! The episode controller only talks to a `BridgeTransport`. Two are provided:
//!
//! - `line::LineTransport`: JSON lines over TCP to an external bridge process
//! - `in_process::InProcessTransport`: direct calls into an `EmulatorHost`

pub mod in_process;
pub mod line;

pub use in_process::InProcessTransport;
pub use line::LineTransport;

use eg_core::MemoryBus;

use crate::error::{BridgeError, Result};
use crate::protocol::{Command, Response};

/// Lifecycle of the single connection a transport owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Never opened
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Closed by the caller or lost to a transport error; never reopened
    Closed,
}

/// Blocking request/response channel to an emulator
pub trait BridgeTransport: Send {
    /// Send one command and wait for its reply. Connects on first use.
    fn send(&mut self, command: &Command) -> Result<Response>;

    /// Read one byte of emulator memory
    fn read_byte(&mut self, addr: u32) -> Result<u8>;

    /// Write one byte of emulator memory
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()>;

    /// Release the connection. Never fails and may be called any number of times.
    fn close(&mut self);

    fn state(&self) -> ConnectionState;
}

impl<T: BridgeTransport + ?Sized> BridgeTransport for Box<T> {
    fn send(&mut self, command: &Command) -> Result<Response> {
        (**self).send(command)
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        (**self).write_byte(addr, value)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn state(&self) -> ConnectionState {
        (**self).state()
    }
}

/// Memory view over a transport, for snapshot extraction
pub struct TransportBus<'a, T: BridgeTransport + ?Sized>(pub &'a mut T);

impl<T: BridgeTransport + ?Sized> MemoryBus for TransportBus<'_, T> {
    type Error = BridgeError;

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        self.0.read_byte(addr)
    }
}
