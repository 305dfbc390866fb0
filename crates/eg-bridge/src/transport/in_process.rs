//! Transport calling an emulator living in this process

use eg_core::observation::{OBS_LEN, ObsPayload};
use eg_core::Buttons;
use serde_json::{Map, Value};

use super::{BridgeTransport, ConnectionState};
use crate::error::{BridgeError, Result};
use crate::host::EmulatorHost;
use crate::protocol::{Command, Response};

/// Drives an `EmulatorHost` directly, answering commands as a bridge would
///
/// The host is initialised with the ROM on first use and cleaned up on `close()`.
pub struct InProcessTransport<H: EmulatorHost> {
    host: H,
    rom_path: String,
    state: ConnectionState,
    /// Set between `init` and the first command; a reset right after power-on is skipped
    fresh: bool,
    screen: Vec<u8>,
}

impl<H: EmulatorHost> InProcessTransport<H> {
    pub fn new(host: H, rom_path: impl Into<String>) -> Self {
        Self {
            host,
            rom_path: rom_path.into(),
            state: ConnectionState::Disconnected,
            fresh: false,
            screen: vec![0; OBS_LEN],
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn ensure_init(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Closed => Err(BridgeError::Closed),
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                self.state = ConnectionState::Connecting;
                if let Err(reason) = self.host.init(&self.rom_path) {
                    self.state = ConnectionState::Disconnected;
                    return Err(BridgeError::Host(reason));
                }
                tracing::info!(rom = %self.rom_path, "emulator initialised");
                self.state = ConnectionState::Connected;
                self.fresh = true;
                Ok(())
            }
        }
    }

    fn screen_response(&mut self) -> Response {
        self.host.get_screen(&mut self.screen);
        let mut info = Map::new();
        info.insert(
            "frame_count".to_string(),
            Value::from(self.host.frame_count()),
        );
        Response {
            info,
            ..Response::with_obs(ObsPayload::Raw(self.screen.clone()))
        }
    }
}

impl<H: EmulatorHost> BridgeTransport for InProcessTransport<H> {
    fn send(&mut self, command: &Command) -> Result<Response> {
        self.ensure_init()?;
        let fresh = std::mem::take(&mut self.fresh);

        match command {
            Command::Reset => {
                if !fresh {
                    self.host.reset();
                }
                Ok(self.screen_response())
            }
            Command::Step { buttons } => {
                self.host.step(Buttons::from_buttons(buttons.iter().copied()));
                Ok(self.screen_response())
            }
            Command::ReadMemory { addr } => Ok(Response::with_value(self.host.read_byte(*addr))),
            Command::WriteMemory { addr, value } => {
                self.host.write_byte(*addr, *value);
                Ok(Response::default())
            }
        }
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        self.ensure_init()?;
        Ok(self.host.read_byte(addr))
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.ensure_init()?;
        self.host.write_byte(addr, value);
        Ok(())
    }

    fn close(&mut self) {
        if self.state == ConnectionState::Connected {
            tracing::info!(rom = %self.rom_path, "releasing emulator");
            self.host.cleanup();
            self.state = ConnectionState::Closed;
        }
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl<H: EmulatorHost> Drop for InProcessTransport<H> {
    fn drop(&mut self) {
        self.close();
    }
}
