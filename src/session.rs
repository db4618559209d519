//! Live TN3270 session management
//!
//! A [`Session`] owns the negotiated connection, a background reader
//! thread, and the shared terminal state. The reader applies each
//! inbound record to the screen under a mutex and signals a condition
//! variable whenever the state changes, which is what makes
//! [`wait_for_field`](Session::wait_for_field) and
//! [`wait_for_text`](Session::wait_for_text) cheap blocking waits
//! instead of busy polls.
//!
//! Input operations are refused while the keyboard is locked. Sending
//! an attention key locks the keyboard immediately rather than waiting
//! for the host's write to arrive, so back-to-back sends cannot race
//! the host's response.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::codes::AidKey;
use crate::config::SessionConfig;
use crate::display::{Display3270, ScreenSize};
use crate::ebcdic::ascii_to_ebcdic;
use crate::error::{TN3270Error, TN3270Result};
use crate::network::TelnetConnection;
use crate::protocol::ProtocolProcessor3270;
use crate::telnet::TelnetNegotiator;

/// Poll cap for text waits; the condition variable usually wakes sooner
const TEXT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a session as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// TCP connect and telnet negotiation in progress
    Connecting,
    /// Host has unlocked the keyboard, input may be sent
    Unlocked,
    /// Host is writing or has not yet unlocked the keyboard
    Locked,
    /// A caller is blocked waiting for the keyboard to unlock
    WaitingForUnlock,
    /// The connection is gone
    Disconnected,
}

/// Terminal state shared between the caller and the reader thread
struct SessionState {
    display: Display3270,
    processor: ProtocolProcessor3270,
    connection_state: ConnectionState,
}

struct SessionInner {
    state: Mutex<SessionState>,
    readiness: Condvar,
}

/// An established TN3270 session
pub struct Session {
    inner: Arc<SessionInner>,
    connection: TelnetConnection,
    size: ScreenSize,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Connect and negotiate, then start the reader thread
    ///
    /// The session starts with the keyboard locked; the host's first
    /// write normally unlocks it. Records that arrived together with
    /// the final negotiation commands are applied before the reader
    /// starts, so an eager host's greeting screen is never lost.
    pub fn connect(config: &SessionConfig) -> TN3270Result<Self> {
        let size = config.terminal_model;
        let mut negotiator = TelnetNegotiator::new(size.terminal_type());
        let connection = TelnetConnection::connect(
            &config.host,
            config.port,
            Duration::from_secs(config.connect_timeout_secs),
            &mut negotiator,
        )?;

        let inner = Arc::new(SessionInner {
            state: Mutex::new(SessionState {
                display: Display3270::with_size(size),
                processor: ProtocolProcessor3270::new(),
                connection_state: ConnectionState::Locked,
            }),
            readiness: Condvar::new(),
        });

        let mut session = Session {
            inner,
            connection,
            size,
            reader: None,
        };
        session.spawn_reader(negotiator);
        info!("session with {}:{} established", config.host, config.port);
        Ok(session)
    }

    fn spawn_reader(&mut self, negotiator: TelnetNegotiator) {
        let inner = Arc::clone(&self.inner);
        let connection = self.connection.clone();
        self.reader = Some(thread::spawn(move || {
            reader_loop(inner, connection, negotiator);
        }));
    }

    /// Dimensions of the terminal this session emulates
    pub fn screen_size(&self) -> ScreenSize {
        self.size
    }

    /// Current lifecycle state
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().unwrap().connection_state
    }

    /// The session still has a live connection
    pub fn is_connected(&self) -> bool {
        self.connection_state() != ConnectionState::Disconnected
    }

    /// Block until the host unlocks the keyboard
    ///
    /// Returns immediately if the keyboard is already unlocked. On
    /// timeout the previous state is restored and a
    /// [`TN3270Error::Timeout`] is returned.
    pub fn wait_for_field(&self, timeout: Duration) -> TN3270Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();
        loop {
            match state.connection_state {
                ConnectionState::Unlocked => return Ok(()),
                ConnectionState::Disconnected => return Err(TN3270Error::SessionClosed),
                ConnectionState::Locked | ConnectionState::Connecting => {
                    state.connection_state = ConnectionState::WaitingForUnlock;
                }
                ConnectionState::WaitingForUnlock => {}
            }
            let now = Instant::now();
            if now >= deadline {
                if state.connection_state == ConnectionState::WaitingForUnlock {
                    state.connection_state = ConnectionState::Locked;
                }
                return Err(TN3270Error::Timeout {
                    operation: "keyboard unlock".to_string(),
                    seconds: timeout.as_secs(),
                });
            }
            let (guard, _) = self
                .inner
                .readiness
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
    }

    /// Block until `text` appears anywhere on the screen
    pub fn wait_for_text(&self, text: &str, timeout: Duration) -> TN3270Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();
        loop {
            if state.connection_state == ConnectionState::Disconnected {
                return Err(TN3270Error::SessionClosed);
            }
            if state.display.get_text().contains(text) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(TN3270Error::Timeout {
                    operation: format!("text {text:?} to appear"),
                    seconds: timeout.as_secs(),
                });
            }
            let wait = (deadline - now).min(TEXT_POLL_INTERVAL);
            let (guard, _) = self.inner.readiness.wait_timeout(state, wait).unwrap();
            state = guard;
        }
    }

    /// Send the Enter key with all modified fields
    pub fn enter(&self) -> TN3270Result<()> {
        self.send_attention(AidKey::Enter)
    }

    /// Send program function key `n` (1 through 24)
    pub fn pf(&self, n: u8) -> TN3270Result<()> {
        let key = AidKey::pf(n).ok_or_else(|| {
            TN3270Error::invalid_input(format!("PF{n} is not a valid function key"))
        })?;
        self.send_attention(key)
    }

    /// Send program attention key `n` (1 through 3)
    pub fn pa(&self, n: u8) -> TN3270Result<()> {
        let key = AidKey::pa(n).ok_or_else(|| {
            TN3270Error::invalid_input(format!("PA{n} is not a valid attention key"))
        })?;
        self.send_attention(key)
    }

    /// Clear the screen locally and send the Clear attention key
    pub fn clear(&self) -> TN3270Result<()> {
        self.send_attention(AidKey::Clear)
    }

    fn send_attention(&self, aid: AidKey) -> TN3270Result<()> {
        let unit = {
            let mut state = self.inner.state.lock().unwrap();
            match state.connection_state {
                ConnectionState::Disconnected => return Err(TN3270Error::SessionClosed),
                ConnectionState::Unlocked => {}
                _ => return Err(TN3270Error::KeyboardLocked),
            }
            let unit = {
                let SessionState {
                    display, processor, ..
                } = &mut *state;
                if aid == AidKey::Clear {
                    display.clear();
                }
                let unit = processor.create_read_modified_response(display, aid);
                display.lock_keyboard();
                unit
            };
            // Lock optimistically so a second send cannot race the host
            state.connection_state = ConnectionState::Locked;
            unit
        };
        debug!("sending {aid:?}");
        self.connection.send_record(&unit)
    }

    /// Type text at the cursor
    ///
    /// On a formatted screen the cursor must sit in an unprotected
    /// field with room for the whole text; nothing is written when it
    /// does not fit. On an unformatted screen any position accepts
    /// input and capacity runs to the end of the buffer.
    pub fn type_text(&self, text: &str) -> TN3270Result<()> {
        let mut state = self.lock_for_input()?;
        let display = &mut state.display;
        let cursor = display.cursor_address();
        let typed = text.chars().count();
        let remaining = if display.field_manager().is_formatted() {
            let field = display
                .field_manager()
                .find_field_at(cursor)
                .cloned()
                .ok_or_else(|| TN3270Error::invalid_input("no input field at the cursor"))?;
            if field.is_protected() {
                return Err(TN3270Error::invalid_input("cursor is in a protected field"));
            }
            let offset = field
                .content_offset(cursor, display.buffer_size())
                .ok_or_else(|| {
                    TN3270Error::invalid_input("cursor is not inside an input field")
                })?;
            field.length.saturating_sub(offset)
        } else {
            display.buffer_size() - cursor as usize
        };
        if typed > remaining {
            return Err(TN3270Error::invalid_input(format!(
                "text of {typed} characters does not fit in the {remaining} remaining positions"
            )));
        }
        for ch in text.chars() {
            if !display.type_char(ascii_to_ebcdic(ch)) {
                return Err(TN3270Error::invalid_input(
                    "input rejected at a protected position",
                ));
            }
        }
        Ok(())
    }

    /// Move the cursor to the next unprotected field
    pub fn tab(&self) -> TN3270Result<()> {
        self.lock_for_input()?.display.tab_to_next_field();
        Ok(())
    }

    /// Move the cursor to the previous unprotected field
    pub fn backtab(&self) -> TN3270Result<()> {
        self.lock_for_input()?.display.backtab();
        Ok(())
    }

    /// Move the cursor to the first unprotected field on the screen
    pub fn home(&self) -> TN3270Result<()> {
        self.lock_for_input()?.display.home();
        Ok(())
    }

    /// Move the cursor to a buffer address
    pub fn move_to(&self, address: u16) -> TN3270Result<()> {
        let mut state = self.lock_for_input()?;
        if address as usize >= state.display.buffer_size() {
            return Err(TN3270Error::invalid_input(format!(
                "address {address} is outside the {} cell screen",
                state.display.buffer_size()
            )));
        }
        state.display.set_cursor(address);
        Ok(())
    }

    /// The screen rendered as text, one line per row
    pub fn screen_text(&self) -> TN3270Result<String> {
        let state = self.inner.state.lock().unwrap();
        if state.connection_state == ConnectionState::Disconnected {
            return Err(TN3270Error::SessionClosed);
        }
        Ok(state.display.get_text())
    }

    /// One rendered screen row, padded to the full width
    pub fn screen_row(&self, row: usize) -> TN3270Result<String> {
        let state = self.inner.state.lock().unwrap();
        if state.connection_state == ConnectionState::Disconnected {
            return Err(TN3270Error::SessionClosed);
        }
        state
            .display
            .get_row(row)
            .ok_or_else(|| TN3270Error::invalid_input(format!("row {row} is outside the screen")))
    }

    /// Current cursor position as (row, column), zero based
    pub fn cursor_position(&self) -> TN3270Result<(u16, u16)> {
        let state = self.inner.state.lock().unwrap();
        if state.connection_state == ConnectionState::Disconnected {
            return Err(TN3270Error::SessionClosed);
        }
        let (row, col) = state.display.cursor_position();
        Ok((row as u16, col as u16))
    }

    /// Close the connection and join the reader thread
    ///
    /// Safe to call more than once.
    pub fn disconnect(&mut self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if state.connection_state == ConnectionState::Disconnected && self.reader.is_none() {
                return;
            }
            state.connection_state = ConnectionState::Disconnected;
            self.inner.readiness.notify_all();
        }
        self.connection.shutdown();
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!("reader thread panicked");
            }
        }
        info!("session disconnected");
    }

    /// Take the state lock, refusing input unless the keyboard is open
    fn lock_for_input(&self) -> TN3270Result<std::sync::MutexGuard<'_, SessionState>> {
        let state = self.inner.state.lock().unwrap();
        match state.connection_state {
            ConnectionState::Disconnected => Err(TN3270Error::SessionClosed),
            ConnectionState::Unlocked => Ok(state),
            _ => Err(TN3270Error::KeyboardLocked),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Receive loop run by the background thread
///
/// Records already queued in the negotiator are applied before the
/// first read. The loop ends when the host closes the stream or the
/// socket is shut down locally.
fn reader_loop(
    inner: Arc<SessionInner>,
    connection: TelnetConnection,
    mut negotiator: TelnetNegotiator,
) {
    let mut buffer = [0u8; 4096];
    loop {
        while let Some(record) = negotiator.take_record() {
            apply_record(&inner, &connection, &record);
        }
        let count = match connection.read_chunk(&mut buffer) {
            Ok(0) => {
                info!("host closed the connection");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                debug!("session read ended: {e}");
                break;
            }
        };
        let replies = negotiator.process_incoming_data(&buffer[..count]);
        if !replies.is_empty() {
            if let Err(e) = connection.send_raw(&replies) {
                warn!("failed to answer mid-session negotiation: {e}");
                break;
            }
        }
    }
    let mut state = inner.state.lock().unwrap();
    state.connection_state = ConnectionState::Disconnected;
    inner.readiness.notify_all();
}

/// Apply one inbound record to the screen and answer host reads
fn apply_record(inner: &SessionInner, connection: &TelnetConnection, record: &[u8]) {
    if record.is_empty() {
        return;
    }
    let response = {
        let mut state = inner.state.lock().unwrap();
        let response = {
            let SessionState {
                display, processor, ..
            } = &mut *state;
            if let Err(e) = processor.process_data(record, display) {
                warn!("discarding unintelligible record: {e}");
            }
            processor.take_response(display)
        };
        if state.connection_state != ConnectionState::Disconnected {
            state.connection_state = if state.display.is_keyboard_locked() {
                match state.connection_state {
                    ConnectionState::WaitingForUnlock => ConnectionState::WaitingForUnlock,
                    _ => ConnectionState::Locked,
                }
            } else {
                ConnectionState::Unlocked
            };
        }
        inner.readiness.notify_all();
        response
    };
    if let Some(unit) = response {
        if let Err(e) = connection.send_record(&unit) {
            warn!("failed to answer host read: {e}");
        }
    }
}
