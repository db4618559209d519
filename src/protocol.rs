//! 3270 data stream processing
//!
//! This module decodes inbound host records into the display buffer and
//! encodes the outbound records the terminal sends back.
//!
//! Inbound records carry one command. Write-class commands are followed
//! by a Write Control Character and a stream of orders and data. Read
//! commands and the Read Partition Query ask the terminal to transmit,
//! and the matching response is prepared here and collected by the
//! session through [`ProtocolProcessor3270::take_response`].
//!
//! The decoder is forgiving: unknown orders are skipped and logged,
//! and truncated operands end the record. A malformed record never
//! poisons the connection.

use log::{debug, warn};

use crate::codes::{
    is_format_control, AidKey, CommandCode, OrderCode, AID_STRUCTURED_FIELD, ORDER_GE, ORDER_SBA,
    ORDER_SF, QR_IMPLICIT_PARTITION, QR_SUMMARY, QR_USABLE_AREA, RP_QUERY, RP_QUERY_LIST,
    SFID_QUERY_REPLY, SFID_READ_PARTITION, WCC_ALARM, WCC_RESET_MDT, WCC_RESTORE, XA_3270,
    XA_BACKGROUND, XA_CHARSET, XA_FOREGROUND, XA_HIGHLIGHTING, XA_OUTLINING, XA_TRANSPARENCY,
    XA_VALIDATION,
};
use crate::display::{addressing, Display3270};
use crate::error::{TN3270Error, TN3270Result};
use crate::field::ExtendedAttributes;

/// Transmission the host asked for in the last record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRead {
    Buffer,
    Modified,
    ModifiedAll,
    QueryReply,
}

/// Decoder and encoder for the 3270 data stream
pub struct ProtocolProcessor3270 {
    pending_read: Option<PendingRead>,
}

impl ProtocolProcessor3270 {
    pub fn new() -> Self {
        Self { pending_read: None }
    }

    /// Decode one complete inbound record into the display
    ///
    /// Returns an error only for a record whose command byte is not a
    /// 3270 command. The caller logs it and carries on; the display is
    /// left unchanged in that case.
    pub fn process_data(&mut self, data: &[u8], display: &mut Display3270) -> TN3270Result<()> {
        let mut parser = DataStreamParser::new(data);
        if let Some(pending) = parser.parse(display)? {
            self.pending_read = Some(pending);
        }
        Ok(())
    }

    /// Collect the response owed to the host after the last record
    pub fn take_response(&mut self, display: &Display3270) -> Option<Vec<u8>> {
        let pending = self.pending_read.take()?;
        let response = match pending {
            PendingRead::Buffer => self.create_read_buffer_response(display, AidKey::NoAid),
            PendingRead::Modified | PendingRead::ModifiedAll => {
                self.create_read_modified_response(display, AidKey::NoAid)
            }
            PendingRead::QueryReply => self.create_query_reply(display),
        };
        Some(response)
    }

    /// Build the outbound record for an attention key
    ///
    /// Enter and the PF keys transmit the AID, the cursor address and
    /// every modified field as SBA plus content with nulls suppressed.
    /// On an unformatted screen there are no fields to frame, so the
    /// whole buffer follows the cursor address with nulls suppressed.
    /// Clear and the PA keys perform a short read: the AID alone.
    pub fn create_read_modified_response(&self, display: &Display3270, aid: AidKey) -> Vec<u8> {
        let mut response = vec![aid.to_u8()];
        if aid.is_short_read() {
            return response;
        }
        let (c1, c2) = addressing::encode_address(display.cursor_address());
        response.push(c1);
        response.push(c2);

        if !display.field_manager().is_formatted() {
            for cell in display.cells() {
                if cell.char_data != 0x00 {
                    response.push(cell.char_data);
                }
            }
            return response;
        }

        let size = display.buffer_size();
        for field in display.field_manager().modified_fields() {
            response.push(ORDER_SBA);
            let start = field.content_start(size);
            let (a1, a2) = addressing::encode_address(start);
            response.push(a1);
            response.push(a2);
            for offset in 0..field.length {
                let addr = ((start as usize + offset) % size) as u16;
                match display.read_char_at(addr) {
                    Some(0x00) | None => {}
                    Some(byte) => response.push(byte),
                }
            }
        }
        response
    }

    /// Build the full-buffer reply to a Read Buffer command
    ///
    /// Attribute positions are re-emitted as Start Field orders so the
    /// host can reconstruct the screen exactly.
    pub fn create_read_buffer_response(&self, display: &Display3270, aid: AidKey) -> Vec<u8> {
        let mut response = vec![aid.to_u8()];
        let (c1, c2) = addressing::encode_address(display.cursor_address());
        response.push(c1);
        response.push(c2);
        for cell in display.cells() {
            if cell.is_field_attr {
                response.push(ORDER_SF);
            }
            response.push(cell.char_data);
        }
        response
    }

    /// Build the Query Reply answering a Read Partition Query
    ///
    /// Reports the summary, usable area and implicit partition replies,
    /// which is the minimum a host needs to size the screen.
    pub fn create_query_reply(&self, display: &Display3270) -> Vec<u8> {
        let rows = display.rows() as u16;
        let cols = display.cols() as u16;
        let buffer_size = display.buffer_size() as u16;

        let mut response = vec![AID_STRUCTURED_FIELD];

        push_query_reply(
            &mut response,
            QR_SUMMARY,
            &[QR_SUMMARY, QR_USABLE_AREA, QR_IMPLICIT_PARTITION],
        );

        let mut usable_area = Vec::with_capacity(19);
        usable_area.push(0x01); // 12/14-bit addressing allowed
        usable_area.push(0x00);
        usable_area.extend_from_slice(&cols.to_be_bytes());
        usable_area.extend_from_slice(&rows.to_be_bytes());
        usable_area.push(0x01); // units: millimetres
        usable_area.extend_from_slice(&[0x00, 0x0A, 0x02, 0xE5]); // Xr
        usable_area.extend_from_slice(&[0x00, 0x02, 0x00, 0x6F]); // Yr
        usable_area.push(0x09); // cell width
        usable_area.push(0x0C); // cell height
        usable_area.extend_from_slice(&buffer_size.to_be_bytes());
        push_query_reply(&mut response, QR_USABLE_AREA, &usable_area);

        let mut implicit_partition = Vec::with_capacity(13);
        implicit_partition.extend_from_slice(&[0x00, 0x00]);
        implicit_partition.push(0x0B); // self-defining parameter length
        implicit_partition.push(0x01); // implicit partition sizes
        implicit_partition.push(0x00);
        implicit_partition.extend_from_slice(&cols.to_be_bytes());
        implicit_partition.extend_from_slice(&rows.to_be_bytes());
        implicit_partition.extend_from_slice(&cols.to_be_bytes());
        implicit_partition.extend_from_slice(&rows.to_be_bytes());
        push_query_reply(&mut response, QR_IMPLICIT_PARTITION, &implicit_partition);

        response
    }
}

impl Default for ProtocolProcessor3270 {
    fn default() -> Self {
        Self::new()
    }
}

fn push_query_reply(response: &mut Vec<u8>, code: u8, data: &[u8]) {
    let length = (data.len() + 4) as u16;
    response.extend_from_slice(&length.to_be_bytes());
    response.push(SFID_QUERY_REPLY);
    response.push(code);
    response.extend_from_slice(data);
}

/// Cursor over one inbound record
struct DataStreamParser<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataStreamParser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn parse(&mut self, display: &mut Display3270) -> TN3270Result<Option<PendingRead>> {
        let Some(&command_byte) = self.data.first() else {
            return Ok(None);
        };
        self.pos = 1;
        let command = CommandCode::from_u8(command_byte).ok_or_else(|| {
            TN3270Error::protocol(format!("unknown command code 0x{command_byte:02X}"))
        })?;

        match command {
            CommandCode::Write => {
                self.process_write(display, false);
                Ok(None)
            }
            CommandCode::EraseWrite | CommandCode::EraseWriteAlternate => {
                self.process_write(display, true);
                Ok(None)
            }
            CommandCode::ReadBuffer => Ok(Some(PendingRead::Buffer)),
            CommandCode::ReadModified => Ok(Some(PendingRead::Modified)),
            CommandCode::ReadModifiedAll => Ok(Some(PendingRead::ModifiedAll)),
            CommandCode::EraseAllUnprotected => {
                self.process_erase_all_unprotected(display);
                Ok(None)
            }
            CommandCode::WriteStructuredField => Ok(self.process_structured_fields(display)),
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn next_u16(&mut self) -> Option<u16> {
        let high = self.next_byte()?;
        let low = self.next_byte()?;
        Some(u16::from_be_bytes([high, low]))
    }

    fn read_address(&mut self) -> Option<u16> {
        let b1 = self.next_byte()?;
        let b2 = self.next_byte()?;
        Some(addressing::decode_address(b1, b2))
    }

    // Consume the rest of the record after a truncated operand.
    fn end_record(&mut self, what: &str) {
        debug!("truncated {what}, ending record at offset {}", self.pos);
        self.pos = self.data.len();
    }

    /// Write and Erase/Write: WCC first, then orders and data to the end
    /// of the record
    fn process_write(&mut self, display: &mut Display3270, erase: bool) {
        display.lock_keyboard();

        let Some(wcc) = self.next_byte() else {
            debug!("write command without WCC");
            return;
        };
        if erase {
            display.clear();
        }
        if wcc & WCC_RESET_MDT != 0 {
            display.reset_mdt();
        }
        if wcc & WCC_ALARM != 0 {
            display.set_alarm(true);
        }

        let mut insert_cursor: Option<u16> = None;
        while let Some(byte) = self.peek_byte() {
            if let Some(order) = OrderCode::from_u8(byte) {
                self.pos += 1;
                self.process_order(order, display, &mut insert_cursor);
            } else if byte >= 0x40 || is_format_control(byte) {
                display.write_char(byte);
                self.pos += 1;
            } else {
                warn!("skipping unknown order 0x{byte:02X}");
                self.pos += 1;
            }
        }

        display.rebuild_fields();
        if let Some(address) = insert_cursor {
            display.set_cursor(address);
        }
        if wcc & WCC_RESTORE != 0 {
            display.unlock_keyboard();
        }
    }

    fn process_order(
        &mut self,
        order: OrderCode,
        display: &mut Display3270,
        insert_cursor: &mut Option<u16>,
    ) {
        match order {
            OrderCode::StartField => {
                let Some(attr) = self.next_byte() else {
                    return self.end_record("SF attribute");
                };
                display.set_field_attribute(attr);
            }
            OrderCode::StartFieldExtended => self.process_start_field_extended(display),
            OrderCode::SetBufferAddress => {
                let Some(address) = self.read_address() else {
                    return self.end_record("SBA address");
                };
                display.set_cursor(self.clamp_address(address, display));
            }
            OrderCode::SetAttribute => {
                // Character attribute for following data; parsed and skipped
                if self.next_byte().is_none() || self.next_byte().is_none() {
                    self.end_record("SA pair");
                }
            }
            OrderCode::ModifyField => self.process_modify_field(),
            OrderCode::InsertCursor => {
                *insert_cursor = Some(display.cursor_address());
            }
            OrderCode::ProgramTab => {
                // Fields written earlier in this record must be visible
                display.rebuild_fields();
                display.tab_to_next_field();
            }
            OrderCode::RepeatToAddress => {
                let Some(address) = self.read_address() else {
                    return self.end_record("RA address");
                };
                let Some(mut ch) = self.next_byte() else {
                    return self.end_record("RA character");
                };
                if ch == ORDER_GE {
                    let Some(raw) = self.next_byte() else {
                        return self.end_record("RA graphic escape");
                    };
                    ch = raw;
                }
                display.repeat_to_address(ch, self.clamp_address(address, display));
            }
            OrderCode::EraseUnprotectedToAddress => {
                let Some(address) = self.read_address() else {
                    return self.end_record("EUA address");
                };
                display.rebuild_fields();
                display.erase_unprotected_to_address(self.clamp_address(address, display));
            }
            OrderCode::GraphicEscape => {
                let Some(raw) = self.next_byte() else {
                    return self.end_record("GE character");
                };
                display.write_char(raw);
            }
        }
    }

    fn clamp_address(&self, address: u16, display: &Display3270) -> u16 {
        let size = display.buffer_size();
        if (address as usize) < size {
            address
        } else {
            debug!("address {address} beyond buffer, wrapping");
            ((address as usize) % size) as u16
        }
    }

    fn process_start_field_extended(&mut self, display: &mut Display3270) {
        let Some(count) = self.next_byte() else {
            return self.end_record("SFE count");
        };
        let mut base_attr = 0x00;
        let mut extended = ExtendedAttributes::default();
        for _ in 0..count {
            let (Some(attr_type), Some(value)) = (self.next_byte(), self.next_byte()) else {
                return self.end_record("SFE pair");
            };
            match attr_type {
                XA_3270 => base_attr = value,
                XA_HIGHLIGHTING => extended.highlighting = Some(value),
                XA_FOREGROUND => extended.foreground_color = Some(value),
                XA_BACKGROUND => extended.background_color = Some(value),
                XA_CHARSET => extended.charset = Some(value),
                XA_VALIDATION => extended.validation = Some(value),
                XA_OUTLINING => extended.outlining = Some(value),
                XA_TRANSPARENCY => extended.transparency = Some(value),
                other => debug!("ignoring extended attribute type 0x{other:02X}"),
            }
        }
        display.set_field_attribute_extended(base_attr, extended);
    }

    fn process_modify_field(&mut self) {
        // Attribute pairs for the field at the current address; the
        // field model keeps the original attributes
        let Some(count) = self.next_byte() else {
            return self.end_record("MF count");
        };
        for _ in 0..count {
            if self.next_byte().is_none() || self.next_byte().is_none() {
                return self.end_record("MF pair");
            }
        }
    }

    fn process_erase_all_unprotected(&mut self, display: &mut Display3270) {
        display.clear_unprotected();
        display.unlock_keyboard();
    }

    /// Write Structured Field: length-prefixed partitions, of which only
    /// Read Partition Query is acted on
    fn process_structured_fields(&mut self, _display: &mut Display3270) -> Option<PendingRead> {
        let mut pending = None;
        while self.pos < self.data.len() {
            let Some(length) = self.next_u16() else {
                debug!("truncated structured field length");
                break;
            };
            // A zero length means the field extends to the end of the record
            let body_len = if length == 0 {
                self.data.len() - self.pos
            } else if (length as usize) < 3 {
                debug!("structured field length {length} too short");
                break;
            } else {
                length as usize - 2
            };
            if self.pos + body_len > self.data.len() {
                debug!("structured field overruns record");
                break;
            }
            let body = &self.data[self.pos..self.pos + body_len];
            self.pos += body_len;

            match body.first() {
                Some(&SFID_READ_PARTITION) => {
                    if body.len() >= 3 && matches!(body[2], RP_QUERY | RP_QUERY_LIST) {
                        pending = Some(PendingRead::QueryReply);
                    } else {
                        debug!("unsupported read partition operation");
                    }
                }
                Some(&other) => debug!("ignoring structured field id 0x{other:02X}"),
                None => {}
            }
        }
        pending
    }
}
