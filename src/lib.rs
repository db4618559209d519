//! TN3270R: an IBM 3270 terminal emulation client
//!
//! Connects to mainframe hosts over TN3270, decodes the 3270 data
//! stream into an addressable screen buffer with fields, and sends
//! keystrokes and attention keys back. Built for screen scraping and
//! scripted host interaction rather than interactive display.
//!
//! The layers, bottom up:
//!
//! - [`ebcdic`]: EBCDIC code page 037 translation
//! - [`codes`]: commands, orders, attention identifiers, attributes
//! - [`field`]: field attributes and the field table
//! - [`display`]: the screen buffer, cursor, and buffer addressing
//! - [`protocol`]: data stream decoding and response encoding
//! - [`telnet`]: option negotiation and record framing
//! - [`network`]: the TCP transport
//! - [`session`]: reader thread, shared state, and blocking waits
//! - [`client`]: the high level screen-scraping interface
//!
//! Most callers only need [`Client`]:
//!
//! ```no_run
//! use tn3270r::Client;
//!
//! let mut client = Client::new();
//! client.connect("mvs.example.com", 23)?;
//! client.wait_for_field(30)?;
//! # Ok::<(), tn3270r::TN3270Error>(())
//! ```

pub mod client;
pub mod codes;
pub mod config;
pub mod display;
pub mod ebcdic;
pub mod error;
pub mod field;
pub mod network;
pub mod protocol;
pub mod session;
pub mod telnet;

pub use client::Client;
pub use codes::AidKey;
pub use config::SessionConfig;
pub use display::{Display3270, ScreenSize};
pub use error::{TN3270Error, TN3270Result};
pub use protocol::ProtocolProcessor3270;
pub use session::{ConnectionState, Session};
