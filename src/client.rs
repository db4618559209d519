//! High level TN3270 client
//!
//! [`Client`] wraps a [`Session`] behind a screen-scraping interface:
//! connect, wait for the keyboard, read the screen, type, press a key,
//! wait for the next screen. Arguments are validated here so a bad
//! function key number or an oversized timeout is reported as
//! [`TN3270Error::InvalidInput`] instead of going out on the wire.
//!
//! ```no_run
//! use tn3270r::{Client, TN3270Result};
//!
//! fn main() -> TN3270Result<()> {
//!     let mut client = Client::new();
//!     client.connect("mvs.example.com", 23)?;
//!     client.wait_for_field(30)?;
//!     client.type_text("LOGON TSO001")?;
//!     client.enter()?;
//!     client.wait_for_text("READY", 30)?;
//!     println!("{}", client.screen_text()?);
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use log::info;

use crate::config::SessionConfig;
use crate::display::ScreenSize;
use crate::error::{TN3270Error, TN3270Result};
use crate::session::Session;

/// Upper bound accepted for any timeout argument, in seconds
const MAX_TIMEOUT_SECS: u64 = 300;

/// A TN3270 terminal client
///
/// Construction is cheap; nothing happens until
/// [`connect`](Self::connect) is called.
pub struct Client {
    config: SessionConfig,
    session: Option<Session>,
}

impl Client {
    /// Client with default configuration
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Client with an explicit configuration
    ///
    /// The host and port given to [`connect`](Self::connect) replace
    /// whatever the configuration carries.
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connect using the configured timeout
    pub fn connect(&mut self, host: &str, port: u16) -> TN3270Result<()> {
        let timeout = self.config.connect_timeout_secs;
        self.connect_with_timeout(host, port, timeout)
    }

    /// Connect with an explicit TCP connect timeout in seconds
    ///
    /// A zero timeout selects the default; anything over 300 seconds is
    /// rejected.
    pub fn connect_with_timeout(
        &mut self,
        host: &str,
        port: u16,
        timeout_secs: u64,
    ) -> TN3270Result<()> {
        if self.session.is_some() {
            return Err(TN3270Error::invalid_input(
                "already connected; disconnect first",
            ));
        }
        self.config.host = host.to_string();
        self.config.port = port;
        self.config.connect_timeout_secs = resolve_timeout(timeout_secs)?.as_secs();
        self.config.validate()?;
        self.session = Some(Session::connect(&self.config)?);
        Ok(())
    }

    /// Drop the connection if there is one
    ///
    /// Safe to call at any time.
    pub fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.disconnect();
            info!("client disconnected from {}:{}", self.config.host, self.config.port);
        }
    }

    /// A session exists and its connection is still live
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    /// Block until the host unlocks the keyboard
    pub fn wait_for_field(&self, timeout_secs: u64) -> TN3270Result<()> {
        let timeout = self.resolve_wait(timeout_secs)?;
        self.session()?.wait_for_field(timeout)
    }

    /// Block until `text` appears anywhere on the screen
    pub fn wait_for_text(&self, text: &str, timeout_secs: u64) -> TN3270Result<()> {
        let timeout = self.resolve_wait(timeout_secs)?;
        self.session()?.wait_for_text(text, timeout)
    }

    /// Wait for `text`, then return the full screen it appeared on
    pub fn wait_for_text_and_return(
        &self,
        text: &str,
        timeout_secs: u64,
    ) -> TN3270Result<String> {
        self.wait_for_text(text, timeout_secs)?;
        self.screen_text()
    }

    /// The screen rendered as text, one line per row
    pub fn screen_text(&self) -> TN3270Result<String> {
        self.session()?.screen_text()
    }

    /// Cursor position as one-based (row, column)
    pub fn cursor_position(&self) -> TN3270Result<(u16, u16)> {
        let (row, col) = self.session()?.cursor_position()?;
        Ok((row + 1, col + 1))
    }

    /// Type text at the cursor position
    pub fn type_text(&mut self, text: &str) -> TN3270Result<()> {
        if text.chars().any(|c| c.is_control()) {
            return Err(TN3270Error::invalid_input(
                "text must not contain control characters",
            ));
        }
        self.session()?.type_text(text)
    }

    /// Move to a one-based (row, column) position and type there
    pub fn type_text_at(&mut self, row: u16, col: u16, text: &str) -> TN3270Result<()> {
        self.move_to(row, col)?;
        self.type_text(text)
    }

    /// Move the cursor to a one-based (row, column) position
    pub fn move_to(&mut self, row: u16, col: u16) -> TN3270Result<()> {
        let size = self.screen_size()?;
        if row == 0 || row > size.rows() as u16 || col == 0 || col > size.cols() as u16 {
            return Err(TN3270Error::invalid_input(format!(
                "position ({row}, {col}) is outside the {}x{} screen",
                size.rows(),
                size.cols()
            )));
        }
        let address = (row - 1) * size.cols() as u16 + (col - 1);
        self.session()?.move_to(address)
    }

    /// Move the cursor to the next unprotected field
    pub fn tab(&mut self) -> TN3270Result<()> {
        self.session()?.tab()
    }

    /// Move the cursor to the previous unprotected field
    pub fn backtab(&mut self) -> TN3270Result<()> {
        self.session()?.backtab()
    }

    /// Move the cursor to the first unprotected field
    pub fn home(&mut self) -> TN3270Result<()> {
        self.session()?.home()
    }

    /// Press Enter
    pub fn enter(&mut self) -> TN3270Result<()> {
        self.session()?.enter()
    }

    /// Press Clear
    pub fn clear(&mut self) -> TN3270Result<()> {
        self.session()?.clear()
    }

    /// Press program function key `n` (1 through 24)
    ///
    /// The key number is checked before anything else, so an invalid
    /// number is reported even without a connection.
    pub fn pf(&mut self, n: u8) -> TN3270Result<()> {
        if !(1..=24).contains(&n) {
            return Err(TN3270Error::invalid_input(format!(
                "PF{n} is not a valid function key"
            )));
        }
        self.session()?.pf(n)
    }

    /// Press program attention key `n` (1 through 3)
    pub fn pa(&mut self, n: u8) -> TN3270Result<()> {
        if !(1..=3).contains(&n) {
            return Err(TN3270Error::invalid_input(format!(
                "PA{n} is not a valid attention key"
            )));
        }
        self.session()?.pa(n)
    }

    /// Type a command and press Enter, then wait for the next screen
    pub fn send_command(&mut self, text: &str, wait_secs: u64) -> TN3270Result<()> {
        self.type_text(text)?;
        self.enter()?;
        self.wait_for_field(wait_secs)
    }

    /// Press a function key and wait for the next screen
    pub fn send_pf(&mut self, n: u8, wait_secs: u64) -> TN3270Result<()> {
        self.pf(n)?;
        self.wait_for_field(wait_secs)
    }

    /// Save the current screen text to a file
    ///
    /// Parent directories are created. The path must not contain `..`
    /// components. On Unix the file is readable only by the owner,
    /// since captured screens routinely hold credentials.
    pub fn screenshot(&self, path: impl AsRef<Path>) -> TN3270Result<()> {
        let path = path.as_ref();
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(TN3270Error::invalid_input(
                "screenshot path must not contain parent directory components",
            ));
        }
        let text = self.screen_text()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        info!("screen saved to {}", path.display());
        Ok(())
    }

    /// The screen wrapped in a numbered frame, for logs and debugging
    pub fn print_screen(&self) -> TN3270Result<String> {
        let session = self.session()?;
        let size = session.screen_size();
        let border = format!("+--+{}+\n", "-".repeat(size.cols()));
        let mut out = String::with_capacity((size.rows() + 2) * (size.cols() + 5));
        out.push_str(&border);
        for row in 0..size.rows() {
            let text = session.screen_row(row)?;
            out.push_str(&format!("|{:2}|{}|\n", row + 1, text));
        }
        out.push_str(&border);
        Ok(out)
    }

    fn session(&self) -> TN3270Result<&Session> {
        self.session.as_ref().ok_or_else(|| TN3270Error::Connection {
            reason: "no active session".to_string(),
        })
    }

    fn screen_size(&self) -> TN3270Result<ScreenSize> {
        Ok(self.session()?.screen_size())
    }

    /// Resolve a caller-supplied wait timeout against the configuration
    fn resolve_wait(&self, timeout_secs: u64) -> TN3270Result<Duration> {
        if timeout_secs == 0 {
            return Ok(Duration::from_secs(self.config.wait_timeout_secs));
        }
        resolve_timeout(timeout_secs)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_timeout(timeout_secs: u64) -> TN3270Result<Duration> {
    if timeout_secs > MAX_TIMEOUT_SECS {
        return Err(TN3270Error::invalid_input(format!(
            "timeout of {timeout_secs}s exceeds the {MAX_TIMEOUT_SECS}s maximum"
        )));
    }
    let secs = if timeout_secs == 0 {
        crate::config::DEFAULT_CONNECT_TIMEOUT_SECS
    } else {
        timeout_secs
    };
    Ok(Duration::from_secs(secs))
}
