//! Telnet negotiation and record framing for TN3270
//!
//! TN3270 runs the 3270 data stream over a telnet connection in binary
//! mode. Three options must be agreed before any 3270 data flows:
//!
//! - TERMINAL-TYPE (24): the client names its terminal model
//! - BINARY (0): eight-bit transmission, both directions
//! - END-OF-RECORD (25): records are delimited with IAC EOR, both
//!   directions
//!
//! SUPPRESS-GO-AHEAD is accepted if the host asks for it. Everything
//! else is refused. Negotiation state is tracked per option and per
//! direction so that repeated requests are answered once and refusals
//! are detected early.
//!
//! The negotiator also performs the data-plane work of the telnet
//! layer: splitting the byte stream into records at IAC EOR marks and
//! collapsing doubled IAC bytes. Mid-session negotiation commands are
//! answered from the same state machine.

use std::collections::{HashMap, VecDeque};

use log::debug;

/// Telnet command bytes
pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;
pub const EOR_MARK: u8 = 239;

/// TERMINAL-TYPE subnegotiation verbs
const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

/// Telnet options relevant to TN3270
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelnetOption {
    Binary = 0,
    Echo = 1,
    SuppressGoAhead = 3,
    TerminalType = 24,
    EndOfRecord = 25,
}

impl TelnetOption {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Binary),
            1 => Some(Self::Echo),
            3 => Some(Self::SuppressGoAhead),
            24 => Some(Self::TerminalType),
            25 => Some(Self::EndOfRecord),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Per-direction negotiation state of one option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NegotiationState {
    /// Nothing sent or received yet
    Initial,
    /// We asked and await the peer's answer
    Requested,
    /// Both sides agreed
    Active,
    /// Refused by either side
    Inactive,
}

/// Telnet option state machine and record framer
pub struct TelnetNegotiator {
    /// Options we perform (our WILL, the host's DO)
    local_states: HashMap<TelnetOption, NegotiationState>,
    /// Options the host performs (the host's WILL, our DO)
    remote_states: HashMap<TelnetOption, NegotiationState>,
    terminal_type: String,
    input_buffer: Vec<u8>,
    output_buffer: Vec<u8>,
    record_buffer: Vec<u8>,
    completed_records: VecDeque<Vec<u8>>,
}

impl TelnetNegotiator {
    /// Options we agree to perform when the host asks
    const LOCAL_SUPPORTED: &'static [TelnetOption] = &[
        TelnetOption::Binary,
        TelnetOption::TerminalType,
        TelnetOption::EndOfRecord,
        TelnetOption::SuppressGoAhead,
    ];

    /// Options we agree to let the host perform
    const REMOTE_SUPPORTED: &'static [TelnetOption] = &[
        TelnetOption::Binary,
        TelnetOption::EndOfRecord,
        TelnetOption::SuppressGoAhead,
    ];

    /// Options that must be active on our side before 3270 data flows
    const LOCAL_REQUIRED: &'static [TelnetOption] = &[
        TelnetOption::Binary,
        TelnetOption::TerminalType,
        TelnetOption::EndOfRecord,
    ];

    /// Options that must be active on the host's side
    const REMOTE_REQUIRED: &'static [TelnetOption] =
        &[TelnetOption::Binary, TelnetOption::EndOfRecord];

    pub fn new(terminal_type: impl Into<String>) -> Self {
        Self {
            local_states: HashMap::new(),
            remote_states: HashMap::new(),
            terminal_type: terminal_type.into(),
            input_buffer: Vec::new(),
            output_buffer: Vec::new(),
            record_buffer: Vec::new(),
            completed_records: VecDeque::new(),
        }
    }

    /// The terminal type announced in TERMINAL-TYPE subnegotiation
    pub fn terminal_type(&self) -> &str {
        &self.terminal_type
    }

    /// Open the negotiation by offering and requesting the required options
    pub fn generate_initial_negotiation(&mut self) -> Vec<u8> {
        let mut commands = Vec::new();
        for &option in Self::LOCAL_REQUIRED {
            commands.extend_from_slice(&[IAC, WILL, option.to_u8()]);
            self.local_states.insert(option, NegotiationState::Requested);
        }
        for &option in Self::REMOTE_REQUIRED {
            commands.extend_from_slice(&[IAC, DO, option.to_u8()]);
            self.remote_states.insert(option, NegotiationState::Requested);
        }
        commands
    }

    /// Consume bytes from the wire
    ///
    /// Negotiation commands update the state machine, data bytes build
    /// records retrievable with [`take_record`](Self::take_record), and
    /// the returned bytes are the replies that must be written back to
    /// the host. Incomplete trailing sequences stay buffered for the
    /// next call.
    pub fn process_incoming_data(&mut self, data: &[u8]) -> Vec<u8> {
        self.input_buffer.extend_from_slice(data);
        self.output_buffer.clear();

        let mut pos = 0;
        while pos < self.input_buffer.len() {
            let byte = self.input_buffer[pos];
            if byte != IAC {
                self.record_buffer.push(byte);
                pos += 1;
                continue;
            }
            if pos + 1 >= self.input_buffer.len() {
                break;
            }
            match self.input_buffer[pos + 1] {
                IAC => {
                    // Doubled IAC is a literal 0xFF data byte
                    self.record_buffer.push(IAC);
                    pos += 2;
                }
                EOR_MARK => {
                    let record = std::mem::take(&mut self.record_buffer);
                    self.completed_records.push_back(record);
                    pos += 2;
                }
                command @ (DO | DONT | WILL | WONT) => {
                    if pos + 2 >= self.input_buffer.len() {
                        break;
                    }
                    let option = self.input_buffer[pos + 2];
                    self.handle_negotiation_command(command, option);
                    pos += 3;
                }
                SB => match self.find_subnegotiation_end(pos + 2) {
                    Some(end) => {
                        let sub = self.input_buffer[pos + 2..end].to_vec();
                        self.handle_subnegotiation(&sub);
                        pos = end + 2;
                    }
                    None => break,
                },
                other => {
                    debug!("ignoring telnet command 0x{other:02X}");
                    pos += 2;
                }
            }
        }
        self.input_buffer.drain(..pos);
        self.output_buffer.clone()
    }

    /// Next complete record extracted from the stream, if any
    pub fn take_record(&mut self) -> Option<Vec<u8>> {
        self.completed_records.pop_front()
    }

    /// All required options are active in both directions
    pub fn is_negotiation_complete(&self) -> bool {
        Self::LOCAL_REQUIRED.iter().all(|&o| self.is_local_active(o))
            && Self::REMOTE_REQUIRED.iter().all(|&o| self.is_remote_active(o))
    }

    /// A required option has been refused, so negotiation cannot succeed
    pub fn is_negotiation_failed(&self) -> bool {
        Self::LOCAL_REQUIRED
            .iter()
            .any(|o| self.local_states.get(o) == Some(&NegotiationState::Inactive))
            || Self::REMOTE_REQUIRED
                .iter()
                .any(|o| self.remote_states.get(o) == Some(&NegotiationState::Inactive))
    }

    pub fn is_local_active(&self, option: TelnetOption) -> bool {
        self.local_states.get(&option) == Some(&NegotiationState::Active)
    }

    pub fn is_remote_active(&self, option: TelnetOption) -> bool {
        self.remote_states.get(&option) == Some(&NegotiationState::Active)
    }

    fn local_state(&self, option: TelnetOption) -> NegotiationState {
        self.local_states
            .get(&option)
            .copied()
            .unwrap_or(NegotiationState::Initial)
    }

    fn remote_state(&self, option: TelnetOption) -> NegotiationState {
        self.remote_states
            .get(&option)
            .copied()
            .unwrap_or(NegotiationState::Initial)
    }

    fn handle_negotiation_command(&mut self, command: u8, option_byte: u8) {
        let Some(option) = TelnetOption::from_u8(option_byte) else {
            // Unrecognized option: refuse requests, ignore refusals
            match command {
                DO => self.send_command(WONT, option_byte),
                WILL => self.send_command(DONT, option_byte),
                _ => {}
            }
            return;
        };
        match command {
            DO => self.handle_do(option),
            DONT => self.handle_dont(option),
            WILL => self.handle_will(option),
            WONT => self.handle_wont(option),
            _ => {}
        }
    }

    fn handle_do(&mut self, option: TelnetOption) {
        match self.local_state(option) {
            // Answer to our WILL: no reply owed
            NegotiationState::Requested => {
                self.local_states.insert(option, NegotiationState::Active);
            }
            NegotiationState::Initial => {
                if Self::LOCAL_SUPPORTED.contains(&option) {
                    self.send_command(WILL, option.to_u8());
                    self.local_states.insert(option, NegotiationState::Active);
                } else {
                    self.send_command(WONT, option.to_u8());
                    self.local_states.insert(option, NegotiationState::Inactive);
                }
            }
            NegotiationState::Active => {}
            NegotiationState::Inactive => self.send_command(WONT, option.to_u8()),
        }
    }

    fn handle_dont(&mut self, option: TelnetOption) {
        match self.local_state(option) {
            // Refusal of our WILL: no reply owed
            NegotiationState::Requested | NegotiationState::Inactive => {}
            NegotiationState::Initial | NegotiationState::Active => {
                self.send_command(WONT, option.to_u8());
            }
        }
        self.local_states.insert(option, NegotiationState::Inactive);
    }

    fn handle_will(&mut self, option: TelnetOption) {
        match self.remote_state(option) {
            // Answer to our DO: no reply owed
            NegotiationState::Requested => {
                self.remote_states.insert(option, NegotiationState::Active);
            }
            NegotiationState::Initial => {
                if Self::REMOTE_SUPPORTED.contains(&option) {
                    self.send_command(DO, option.to_u8());
                    self.remote_states.insert(option, NegotiationState::Active);
                } else {
                    self.send_command(DONT, option.to_u8());
                    self.remote_states.insert(option, NegotiationState::Inactive);
                }
            }
            NegotiationState::Active => {}
            NegotiationState::Inactive => self.send_command(DONT, option.to_u8()),
        }
    }

    fn handle_wont(&mut self, option: TelnetOption) {
        match self.remote_state(option) {
            // Refusal of our DO: no reply owed
            NegotiationState::Requested | NegotiationState::Inactive => {}
            NegotiationState::Initial | NegotiationState::Active => {
                self.send_command(DONT, option.to_u8());
            }
        }
        self.remote_states.insert(option, NegotiationState::Inactive);
    }

    fn handle_subnegotiation(&mut self, data: &[u8]) {
        match data.first().and_then(|&b| TelnetOption::from_u8(b)) {
            Some(TelnetOption::TerminalType) if data.get(1) == Some(&TTYPE_SEND) => {
                self.send_terminal_type();
            }
            _ => debug!("ignoring subnegotiation {data:02X?}"),
        }
    }

    fn send_terminal_type(&mut self) {
        self.output_buffer
            .extend_from_slice(&[IAC, SB, TelnetOption::TerminalType.to_u8(), TTYPE_IS]);
        self.output_buffer
            .extend_from_slice(self.terminal_type.as_bytes());
        self.output_buffer.extend_from_slice(&[IAC, SE]);
    }

    fn send_command(&mut self, command: u8, option: u8) {
        self.output_buffer.extend_from_slice(&[IAC, command, option]);
    }

    fn find_subnegotiation_end(&self, mut pos: usize) -> Option<usize> {
        while pos + 1 < self.input_buffer.len() {
            if self.input_buffer[pos] == IAC {
                if self.input_buffer[pos + 1] == SE {
                    return Some(pos);
                }
                pos += 2;
            } else {
                pos += 1;
            }
        }
        None
    }
}

/// Frame an outbound record: double any IAC bytes and close with IAC EOR
pub fn frame_record(data: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(data.len() + 2);
    for &byte in data {
        framed.push(byte);
        if byte == IAC {
            framed.push(IAC);
        }
    }
    framed.push(IAC);
    framed.push(EOR_MARK);
    framed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiator() -> TelnetNegotiator {
        TelnetNegotiator::new("IBM-3278-2")
    }

    /// Drive both sides of a successful handshake from the host's view
    fn complete_handshake(negotiator: &mut TelnetNegotiator) {
        negotiator.generate_initial_negotiation();
        let responses = negotiator.process_incoming_data(&[
            IAC, DO, 24, // accepts our WILL TERMINAL-TYPE
            IAC, DO, 0, // accepts our WILL BINARY
            IAC, DO, 25, // accepts our WILL END-OF-RECORD
            IAC, WILL, 0, // accepts our DO BINARY
            IAC, WILL, 25, // accepts our DO END-OF-RECORD
        ]);
        assert!(responses.is_empty(), "confirmations owe no reply");
    }

    #[test]
    fn test_initial_negotiation_offers_and_requests() {
        let mut n = negotiator();
        let initial = n.generate_initial_negotiation();
        assert!(initial.windows(3).any(|w| w == [IAC, WILL, 0]));
        assert!(initial.windows(3).any(|w| w == [IAC, WILL, 24]));
        assert!(initial.windows(3).any(|w| w == [IAC, WILL, 25]));
        assert!(initial.windows(3).any(|w| w == [IAC, DO, 0]));
        assert!(initial.windows(3).any(|w| w == [IAC, DO, 25]));
    }

    #[test]
    fn test_handshake_completes() {
        let mut n = negotiator();
        assert!(!n.is_negotiation_complete());
        complete_handshake(&mut n);
        assert!(n.is_negotiation_complete());
        assert!(!n.is_negotiation_failed());
        assert!(n.is_local_active(TelnetOption::Binary));
        assert!(n.is_remote_active(TelnetOption::EndOfRecord));
    }

    #[test]
    fn test_host_initiated_negotiation() {
        // Host speaks first without waiting for our volley
        let mut n = negotiator();
        let responses = n.process_incoming_data(&[IAC, DO, 24]);
        assert_eq!(responses, vec![IAC, WILL, 24]);
        assert!(n.is_local_active(TelnetOption::TerminalType));

        let responses = n.process_incoming_data(&[IAC, WILL, 25]);
        assert_eq!(responses, vec![IAC, DO, 25]);
        assert!(n.is_remote_active(TelnetOption::EndOfRecord));
    }

    #[test]
    fn test_refused_required_option_fails_negotiation() {
        let mut n = negotiator();
        n.generate_initial_negotiation();
        n.process_incoming_data(&[IAC, DONT, 25]);
        assert!(n.is_negotiation_failed());
        assert!(!n.is_negotiation_complete());
    }

    #[test]
    fn test_unknown_option_refused() {
        let mut n = negotiator();
        let responses = n.process_incoming_data(&[IAC, DO, 39]);
        assert_eq!(responses, vec![IAC, WONT, 39]);
        let responses = n.process_incoming_data(&[IAC, WILL, 39]);
        assert_eq!(responses, vec![IAC, DONT, 39]);
    }

    #[test]
    fn test_echo_refused() {
        let mut n = negotiator();
        let responses = n.process_incoming_data(&[IAC, WILL, 1]);
        assert_eq!(responses, vec![IAC, DONT, 1]);
    }

    #[test]
    fn test_repeated_request_not_reanswered() {
        let mut n = negotiator();
        let first = n.process_incoming_data(&[IAC, DO, 0]);
        assert_eq!(first, vec![IAC, WILL, 0]);
        let second = n.process_incoming_data(&[IAC, DO, 0]);
        assert!(second.is_empty());
    }

    #[test]
    fn test_terminal_type_subnegotiation() {
        let mut n = negotiator();
        let responses = n.process_incoming_data(&[IAC, SB, 24, TTYPE_SEND, IAC, SE]);
        let mut expected = vec![IAC, SB, 24, TTYPE_IS];
        expected.extend_from_slice(b"IBM-3278-2");
        expected.extend_from_slice(&[IAC, SE]);
        assert_eq!(responses, expected);
    }

    #[test]
    fn test_terminal_type_for_model_5() {
        let mut n = TelnetNegotiator::new("IBM-3278-5");
        let responses = n.process_incoming_data(&[IAC, SB, 24, TTYPE_SEND, IAC, SE]);
        let text: Vec<u8> = responses[4..responses.len() - 2].to_vec();
        assert_eq!(text, b"IBM-3278-5");
    }

    #[test]
    fn test_record_extraction() {
        let mut n = negotiator();
        n.process_incoming_data(&[0x05, 0x42, 0xC1, IAC, EOR_MARK, 0x01]);
        assert_eq!(n.take_record(), Some(vec![0x05, 0x42, 0xC1]));
        assert_eq!(n.take_record(), None);

        // The trailing byte belongs to the next record
        n.process_incoming_data(&[0x42, IAC, EOR_MARK]);
        assert_eq!(n.take_record(), Some(vec![0x01, 0x42]));
    }

    #[test]
    fn test_doubled_iac_is_data() {
        let mut n = negotiator();
        n.process_incoming_data(&[0x01, IAC, IAC, 0x02, IAC, EOR_MARK]);
        assert_eq!(n.take_record(), Some(vec![0x01, 0xFF, 0x02]));
    }

    #[test]
    fn test_split_iac_across_reads() {
        let mut n = negotiator();
        n.process_incoming_data(&[0x01, IAC]);
        assert_eq!(n.take_record(), None);
        n.process_incoming_data(&[EOR_MARK]);
        assert_eq!(n.take_record(), Some(vec![0x01]));
    }

    #[test]
    fn test_negotiation_interleaved_with_data() {
        let mut n = negotiator();
        let responses = n.process_incoming_data(&[0x01, IAC, DO, 0, 0x02, IAC, EOR_MARK]);
        assert_eq!(responses, vec![IAC, WILL, 0]);
        assert_eq!(n.take_record(), Some(vec![0x01, 0x02]));
    }

    #[test]
    fn test_frame_record_escapes_iac() {
        assert_eq!(frame_record(&[0x01, 0x02]), vec![0x01, 0x02, IAC, EOR_MARK]);
        assert_eq!(
            frame_record(&[0x01, 0xFF, 0x02]),
            vec![0x01, IAC, IAC, 0x02, IAC, EOR_MARK]
        );
    }

    #[test]
    fn test_framed_record_round_trips() {
        let unit = vec![0x7D, 0x40, 0xFF, 0x11, 0x40, 0xD5];
        let mut n = negotiator();
        n.process_incoming_data(&frame_record(&unit));
        assert_eq!(n.take_record(), Some(unit));
    }
}
