//! Bridge-side protocol loop
//!
//! Serves the line protocol on one stream, answering every request line with
//! exactly one response line produced by a local transport. Used by the
//! `eg-bridge-worker` binary and by integration tests.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;

use serde_json::{Map, Value};

use crate::protocol::{Command, Response};
use crate::transport::BridgeTransport;

fn error_response(message: String) -> Response {
    let mut info = Map::new();
    info.insert("error".to_string(), Value::String(message));
    Response {
        info,
        ..Response::default()
    }
}

/// Answer one request line
pub fn handle_line<T: BridgeTransport + ?Sized>(backend: &mut T, line: &str) -> Response {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => return error_response(format!("Invalid command: {}", e)),
    };

    match backend.send(&command) {
        Ok(response) => response,
        Err(e) => error_response(e.to_string()),
    }
}

/// Serve requests from `stream` until the client hangs up
pub fn serve<T: BridgeTransport + ?Sized>(stream: TcpStream, backend: &mut T) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    tracing::info!(%peer, "client connected");

    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    let mut requests = 0u64;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(backend, &line);
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        requests += 1;
    }

    tracing::info!(%peer, requests, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEmulator;
    use crate::transport::InProcessTransport;

    #[test]
    fn test_handle_line() {
        let mut backend = InProcessTransport::new(StubEmulator::new(), "emerald.gba");

        let resp = handle_line(&mut backend, r#"{"cmd":"reset"}"#);
        assert!(resp.obs.is_some());
        assert!(!resp.info.contains_key("error"));

        let resp = handle_line(&mut backend, r#"{"cmd":"write_memory","addr":100,"value":9}"#);
        assert!(resp.obs.is_none());
        let resp = handle_line(&mut backend, r#"{"cmd":"read_memory","addr":100}"#);
        assert_eq!(resp.value, Some(9));
    }

    #[test]
    fn test_bad_command_still_answers() {
        let mut backend = InProcessTransport::new(StubEmulator::new(), "emerald.gba");
        let resp = handle_line(&mut backend, r#"{"cmd":"jump"}"#);
        let error = resp.info["error"].as_str().unwrap();
        assert!(error.starts_with("Invalid command"), "{error}");
    }
}
