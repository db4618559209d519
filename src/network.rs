//! TCP transport for TN3270 sessions
//!
//! Opens the socket, drives telnet option negotiation to completion
//! before any 3270 data is exchanged, and then sends and receives raw
//! bytes. Record framing and unframing live in [`crate::telnet`]; the
//! 3270 data stream itself is handled by [`crate::protocol`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::error::{TN3270Error, TN3270Result};
use crate::telnet::{frame_record, TelnetNegotiator};

/// Read timeout applied while option negotiation runs
const NEGOTIATION_READ_TIMEOUT: Duration = Duration::from_secs(2);
/// Overall deadline for negotiation to complete
const NEGOTIATION_DEADLINE: Duration = Duration::from_secs(15);
/// Upper bound on negotiation exchanges with a chatty host
const MAX_NEGOTIATION_ROUNDS: usize = 32;

/// A negotiated telnet connection carrying 3270 records
///
/// Clones share the underlying socket, so a reader thread can block in
/// [`read_chunk`](Self::read_chunk) while another thread sends records.
#[derive(Clone)]
pub struct TelnetConnection {
    stream: Arc<TcpStream>,
}

impl TelnetConnection {
    /// Connect to the host and complete telnet negotiation
    ///
    /// The negotiator must be fresh. On return it has agreed BINARY and
    /// END-OF-RECORD in both directions and answered TERMINAL-TYPE, and
    /// the socket is back in blocking mode. Any 3270 data the host sent
    /// along with its final negotiation commands is already queued in
    /// the negotiator.
    pub fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
        negotiator: &mut TelnetNegotiator,
    ) -> TN3270Result<Self> {
        let address = resolve(host, port)?;
        info!("connecting to {host}:{port}");
        let stream = TcpStream::connect_timeout(&address, timeout)?;
        negotiate(&stream, host, port, negotiator)?;
        info!("telnet negotiation with {host}:{port} complete");
        stream.set_read_timeout(None)?;
        stream.set_write_timeout(None)?;
        Ok(Self {
            stream: Arc::new(stream),
        })
    }

    /// Frame a 3270 record and send it
    pub fn send_record(&self, record: &[u8]) -> TN3270Result<()> {
        trace!("sending {} data bytes", record.len());
        let framed = frame_record(record);
        let mut stream = self.stream.as_ref();
        stream.write_all(&framed)?;
        stream.flush()?;
        Ok(())
    }

    /// Send raw bytes without record framing
    ///
    /// Used for negotiation replies the telnet layer produces after the
    /// session is up.
    pub fn send_raw(&self, data: &[u8]) -> TN3270Result<()> {
        let mut stream = self.stream.as_ref();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    /// Blocking read of whatever the host has sent
    ///
    /// Returns the number of bytes read, zero at end of stream.
    pub fn read_chunk(&self, buffer: &mut [u8]) -> TN3270Result<usize> {
        let mut stream = self.stream.as_ref();
        Ok(stream.read(buffer)?)
    }

    /// Close both directions, unblocking any reader
    pub fn shutdown(&self) {
        if let Err(e) = self.stream.shutdown(Shutdown::Both) {
            debug!("socket shutdown: {e}");
        }
    }
}

fn resolve(host: &str, port: u16) -> TN3270Result<SocketAddr> {
    let mut addresses = (host, port).to_socket_addrs().map_err(|e| TN3270Error::Connection {
        reason: format!("failed to resolve {host}:{port}: {e}"),
    })?;
    addresses.next().ok_or_else(|| TN3270Error::Connection {
        reason: format!("no addresses resolved for {host}:{port}"),
    })
}

/// Exchange option commands until the negotiator is satisfied
fn negotiate(
    mut stream: &TcpStream,
    host: &str,
    port: u16,
    negotiator: &mut TelnetNegotiator,
) -> TN3270Result<()> {
    let fail = |reason: String| TN3270Error::Negotiation {
        host: host.to_string(),
        port,
        reason,
    };

    stream
        .set_read_timeout(Some(NEGOTIATION_READ_TIMEOUT))
        .map_err(|e| fail(e.to_string()))?;
    stream
        .set_write_timeout(Some(NEGOTIATION_READ_TIMEOUT))
        .map_err(|e| fail(e.to_string()))?;

    let initial = negotiator.generate_initial_negotiation();
    stream
        .write_all(&initial)
        .and_then(|_| stream.flush())
        .map_err(|e| fail(format!("failed to send option requests: {e}")))?;

    let deadline = Instant::now() + NEGOTIATION_DEADLINE;
    let mut buffer = [0u8; 1024];
    for round in 0..MAX_NEGOTIATION_ROUNDS {
        if negotiator.is_negotiation_complete() {
            debug!("negotiation complete after {round} rounds");
            return Ok(());
        }
        if negotiator.is_negotiation_failed() {
            return Err(fail("host refused a required telnet option".into()));
        }
        if Instant::now() >= deadline {
            break;
        }
        let count = match stream.read(&mut buffer) {
            Ok(0) => return Err(fail("connection closed during negotiation".into())),
            Ok(n) => n,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => return Err(fail(format!("connection lost during negotiation: {e}"))),
        };
        trace!("negotiation read of {count} bytes");
        let responses = negotiator.process_incoming_data(&buffer[..count]);
        if !responses.is_empty() {
            stream
                .write_all(&responses)
                .and_then(|_| stream.flush())
                .map_err(|e| fail(format!("failed to send option replies: {e}")))?;
        }
    }
    if negotiator.is_negotiation_complete() {
        return Ok(());
    }
    Err(fail("telnet negotiation did not complete".into()))
}
