//! Emerald gym bridge
//!
//! Connects an RL policy loop to a Pokemon Emerald emulator:
//!
//! - `protocol`: the line-delimited JSON request/response messages
//! - `transport`: the `BridgeTransport` seam, with a TCP line transport and an in-process one
//! - `host`: the emulator capability set driven by the in-process transport
//! - `env`: the episode controller (`reset` / `step` / `close`)
//! - `stub`: a deterministic emulator stand-in
//! - `worker`: the bridge side of the protocol, used by `eg-bridge-worker`

pub mod config;
pub mod env;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod host;
pub mod protocol;
pub mod stub;
pub mod transport;
pub mod worker;

pub use config::EnvConfig;
pub use env::{EmeraldEnv, EnvState, StepInfo, StepResult};
pub use error::{BridgeError, Result};
pub use host::EmulatorHost;
pub use protocol::{Command, Response};
pub use transport::{BridgeTransport, ConnectionState, InProcessTransport, LineTransport};
