//! JSON-lines transport over TCP

use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::{BridgeTransport, ConnectionState};
use crate::error::{BridgeError, Result};
use crate::protocol::{Command, Response};

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct LineConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl LineConnection {
    fn open(addr: &str, timeout: Duration) -> std::io::Result<Self> {
        let mut last_err = None;
        for sock_addr in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&sock_addr, timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(Self {
                        reader: BufReader::new(stream.try_clone()?),
                        writer: BufWriter::new(stream),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err
            .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "no address resolved")))
    }

    /// Write one request line and block for one reply line
    fn round_trip(&mut self, line: &str) -> Result<Response> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(peer_error)?;

        let mut reply = String::new();
        self.reader.read_line(&mut reply).map_err(peer_error)?;
        // EOF before the newline means the peer went away mid-reply
        if !reply.ends_with('\n') {
            return Err(BridgeError::PeerClosed);
        }

        Ok(serde_json::from_str(reply.trim_end())?)
    }

    fn shutdown(self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

fn peer_error(err: std::io::Error) -> BridgeError {
    match err.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::UnexpectedEof => BridgeError::PeerClosed,
        _ => BridgeError::Io(err),
    }
}

/// Transport to a bridge process speaking the line protocol
///
/// The connection is opened lazily by the first request and kept for the
/// lifetime of the transport. Once it is lost or closed it stays closed.
pub struct LineTransport {
    addr: String,
    connect_timeout: Duration,
    state: ConnectionState,
    conn: Option<LineConnection>,
}

impl LineTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_timeout(addr, CONNECT_TIMEOUT)
    }

    pub fn with_timeout(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            state: ConnectionState::Disconnected,
            conn: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn connection(&mut self) -> Result<&mut LineConnection> {
        match self.state {
            ConnectionState::Closed => return Err(BridgeError::Closed),
            ConnectionState::Connected => {}
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                self.state = ConnectionState::Connecting;
                match LineConnection::open(&self.addr, self.connect_timeout) {
                    Ok(conn) => {
                        tracing::info!(addr = %self.addr, "connected to bridge");
                        self.conn = Some(conn);
                        self.state = ConnectionState::Connected;
                    }
                    Err(source) => {
                        self.state = ConnectionState::Disconnected;
                        return Err(BridgeError::ConnectFailed {
                            addr: self.addr.clone(),
                            source,
                        });
                    }
                }
            }
        }
        self.conn.as_mut().ok_or(BridgeError::Closed)
    }

    fn drop_connection(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.shutdown();
        }
        self.state = ConnectionState::Closed;
    }
}

impl BridgeTransport for LineTransport {
    fn send(&mut self, command: &Command) -> Result<Response> {
        let line = serde_json::to_string(command)?;
        tracing::trace!(%line, "-> bridge");

        let result = self.connection()?.round_trip(&line);
        if let Err(err) = &result {
            if err.is_terminal() {
                tracing::warn!(addr = %self.addr, cmd = command.name(), "lost bridge connection: {err}");
                self.drop_connection();
            }
        }
        result
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let command = Command::ReadMemory { addr };
        self.send(&command)?
            .value
            .ok_or_else(|| BridgeError::UnexpectedResponse {
                command: command.name(),
                reason: format!("no value for address {addr:#010X}"),
            })
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.send(&Command::WriteMemory { addr, value }).map(|_| ())
    }

    fn close(&mut self) {
        if self.conn.is_some() {
            tracing::info!(addr = %self.addr, "closing bridge connection");
            self.drop_connection();
        }
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    /// One-connection bridge answering each request line with `reply(line)`.
    /// `None` hangs up instead of answering.
    fn fake_bridge<F>(reply: F) -> (String, thread::JoinHandle<Vec<String>>)
    where
        F: Fn(&str) -> Option<String> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut writer = stream;
            let mut seen = Vec::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                let answer = reply(&line);
                seen.push(line);
                match answer {
                    // an unterminated reply is followed by a hang-up
                    Some(text) => {
                        if writer.write_all(text.as_bytes()).is_err() || !text.ends_with('\n') {
                            break;
                        }
                    }
                    None => break,
                }
            }
            seen
        });
        (addr, handle)
    }

    #[test]
    fn test_request_reply() {
        let (addr, bridge) = fake_bridge(|_| Some("{\"reward\":1.0}\n".to_string()));
        let mut transport = LineTransport::new(addr);
        assert_eq!(transport.state(), ConnectionState::Disconnected);

        let resp = transport.send(&Command::Reset).unwrap();
        assert_eq!(resp.reward, 1.0);
        assert_eq!(transport.state(), ConnectionState::Connected);

        transport.close();
        assert_eq!(transport.state(), ConnectionState::Closed);
        assert_eq!(bridge.join().unwrap(), vec![r#"{"cmd":"reset"}"#]);
    }

    #[test]
    fn test_connection_is_reused() {
        let (addr, bridge) = fake_bridge(|_| Some("{}\n".to_string()));
        let mut transport = LineTransport::new(addr);
        for _ in 0..3 {
            transport.send(&Command::Reset).unwrap();
        }
        drop(transport);
        // a single accepted connection saw all three requests
        assert_eq!(bridge.join().unwrap().len(), 3);
    }

    #[test]
    fn test_peer_closed_is_terminal() {
        let (addr, bridge) = fake_bridge(|_| None);
        let mut transport = LineTransport::new(addr);

        let err = transport.send(&Command::Reset).unwrap_err();
        assert!(matches!(err, BridgeError::PeerClosed), "{err}");
        assert_eq!(transport.state(), ConnectionState::Closed);

        let err = transport.send(&Command::Reset).unwrap_err();
        assert!(matches!(err, BridgeError::Closed), "{err}");
        bridge.join().unwrap();
    }

    #[test]
    fn test_partial_line_is_peer_closed() {
        let (addr, bridge) = fake_bridge(|_| Some("{\"obs\":null".to_string()));
        let mut transport = LineTransport::new(addr);

        let err = transport.send(&Command::Reset).unwrap_err();
        assert!(matches!(err, BridgeError::PeerClosed), "{err}");
        assert_eq!(transport.state(), ConnectionState::Closed);
        assert_eq!(bridge.join().unwrap().len(), 1);
    }

    #[test]
    fn test_unparseable_reply_keeps_connection() {
        let (addr, bridge) = fake_bridge(|line| {
            if line.contains("reset") {
                Some("not json\n".to_string())
            } else {
                Some("{\"value\":7}\n".to_string())
            }
        });
        let mut transport = LineTransport::new(addr);

        let err = transport.send(&Command::Reset).unwrap_err();
        assert!(matches!(err, BridgeError::Protocol(_)), "{err}");
        assert_eq!(transport.state(), ConnectionState::Connected);

        assert_eq!(transport.read_byte(0x0203_6DFD).unwrap(), 7);
        transport.close();
        bridge.join().unwrap();
    }

    #[test]
    fn test_read_byte_needs_value() {
        let (addr, bridge) = fake_bridge(|_| Some("{}\n".to_string()));
        let mut transport = LineTransport::new(addr);
        let err = transport.read_byte(0x0202_420C).unwrap_err();
        assert!(
            matches!(err, BridgeError::UnexpectedResponse { command: "read_memory", .. }),
            "{err}"
        );
        transport.close();
        bridge.join().unwrap();
    }

    #[test]
    fn test_connect_failure() {
        // grab a free port and release it so nothing is listening there
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let mut transport = LineTransport::with_timeout(addr, Duration::from_millis(500));
        let err = transport.send(&Command::Reset).unwrap_err();
        assert!(matches!(err, BridgeError::ConnectFailed { .. }), "{err}");
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transport = LineTransport::new("127.0.0.1:1");
        transport.close();
        transport.close();
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }
}
