//! Bridge worker
//!
//! Serves the line protocol over TCP so `EmeraldEnv::from_config` has
//! something to talk to. Each client gets a fresh emulator: the stub one by
//! default, or the native library with `--native` (requires the `ffi` feature).

use std::net::TcpListener;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use eg_bridge::stub::StubEmulator;
use eg_bridge::transport::{BridgeTransport, InProcessTransport};
use eg_bridge::worker;

#[derive(Parser, Debug)]
#[command(name = "eg-bridge-worker", about = "Serve the Emerald bridge protocol over TCP")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9999")]
    bind: String,

    /// ROM passed to the emulator on init
    #[arg(long, default_value = "pokeemerald.gba")]
    rom: String,

    /// Use the native emulator library instead of the stub
    #[arg(long)]
    native: bool,

    /// Exit after serving one client
    #[arg(long)]
    once: bool,
}

fn backend(args: &Args) -> Result<Box<dyn BridgeTransport>> {
    if args.native {
        #[cfg(feature = "ffi")]
        {
            return Ok(Box::new(InProcessTransport::new(
                eg_bridge::ffi::FfiEmulator::new(),
                args.rom.clone(),
            )));
        }
        #[cfg(not(feature = "ffi"))]
        anyhow::bail!("--native needs eg-bridge built with the `ffi` feature");
    }
    Ok(Box::new(InProcessTransport::new(
        StubEmulator::new(),
        args.rom.clone(),
    )))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let listener =
        TcpListener::bind(&args.bind).with_context(|| format!("Failed to bind {}", args.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "bridge worker listening");

    for stream in listener.incoming() {
        let stream = stream.context("Failed to accept client")?;
        let mut backend = backend(&args)?;
        if let Err(e) = worker::serve(stream, &mut backend) {
            tracing::warn!("client session ended with error: {e}");
        }
        backend.close();
        if args.once {
            break;
        }
    }

    Ok(())
}
