//! 3270 display buffer management
//!
//! This module implements the character buffer of a 3270 display station.
//! The buffer is a flat array of cells addressed row-major from zero. A
//! cell holds either display data (an EBCDIC byte) or a field attribute.
//! The field table is derived from the attribute cells and is rebuilt
//! after every inbound write, so buffer and table cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codes::ATTR_MDT;
use crate::ebcdic::ebcdic_to_ascii;
use crate::field::{ExtendedAttributes, FieldAttribute, FieldManager};

/// Screen dimensions for the 3278 terminal models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenSize {
    /// Model 2: 24 rows x 80 columns
    Model2,
    /// Model 3: 32 rows x 80 columns
    Model3,
    /// Model 4: 43 rows x 80 columns
    Model4,
    /// Model 5: 27 rows x 132 columns
    Model5,
}

impl ScreenSize {
    pub fn rows(&self) -> usize {
        match self {
            Self::Model2 => 24,
            Self::Model3 => 32,
            Self::Model4 => 43,
            Self::Model5 => 27,
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Self::Model2 => 80,
            Self::Model3 => 80,
            Self::Model4 => 80,
            Self::Model5 => 132,
        }
    }

    /// Total number of buffer positions
    pub fn buffer_size(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Terminal type string announced during telnet negotiation
    pub fn terminal_type(&self) -> &'static str {
        match self {
            Self::Model2 => "IBM-3278-2",
            Self::Model3 => "IBM-3278-3",
            Self::Model4 => "IBM-3278-4",
            Self::Model5 => "IBM-3278-5",
        }
    }

    /// Convert a buffer address to zero-based (row, column)
    pub fn address_to_coords(&self, address: u16) -> (usize, usize) {
        let cols = self.cols();
        (address as usize / cols, address as usize % cols)
    }

    /// Convert zero-based (row, column) to a buffer address
    pub fn coords_to_address(&self, row: usize, col: usize) -> u16 {
        (row * self.cols() + col) as u16
    }
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self::Model2
    }
}

/// A single buffer position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayCell {
    /// EBCDIC display byte, or the attribute byte when `is_field_attr` is set
    pub char_data: u8,
    /// True when this cell holds a field attribute instead of data
    pub is_field_attr: bool,
    /// Extended attributes attached by SFE, meaningful only on attribute cells
    pub extended: ExtendedAttributes,
}

/// The 3270 display buffer with cursor, field table and keyboard state
pub struct Display3270 {
    screen_size: ScreenSize,
    buffer: Vec<DisplayCell>,
    cursor_address: u16,
    fields: FieldManager,
    keyboard_locked: bool,
    alarm: bool,
}

impl Display3270 {
    /// Create a Model 2 (24x80) display
    pub fn new() -> Self {
        Self::with_size(ScreenSize::Model2)
    }

    /// Create a display with the given screen size
    ///
    /// The keyboard starts locked. The host unlocks it with the restore
    /// bit in the first write it sends.
    pub fn with_size(screen_size: ScreenSize) -> Self {
        let buffer_size = screen_size.buffer_size();
        Self {
            screen_size,
            buffer: vec![DisplayCell::default(); buffer_size],
            cursor_address: 0,
            fields: FieldManager::new(buffer_size),
            keyboard_locked: true,
            alarm: false,
        }
    }

    pub fn screen_size(&self) -> ScreenSize {
        self.screen_size
    }

    pub fn rows(&self) -> usize {
        self.screen_size.rows()
    }

    pub fn cols(&self) -> usize {
        self.screen_size.cols()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the entire buffer, the field table and home the cursor
    pub fn clear(&mut self) {
        for cell in &mut self.buffer {
            *cell = DisplayCell::default();
        }
        self.cursor_address = 0;
        self.fields.clear();
    }

    /// Set the cursor address, ignoring out-of-range values
    pub fn set_cursor(&mut self, address: u16) {
        if (address as usize) < self.buffer.len() {
            self.cursor_address = address;
        }
    }

    pub fn cursor_address(&self) -> u16 {
        self.cursor_address
    }

    /// Cursor position as zero-based (row, column)
    pub fn cursor_position(&self) -> (usize, usize) {
        self.screen_size.address_to_coords(self.cursor_address)
    }

    fn advance_cursor(&mut self) {
        self.cursor_address = ((self.cursor_address as usize + 1) % self.buffer.len()) as u16;
    }

    /// Store a data byte at the cursor and advance, wrapping at the end
    ///
    /// Writing data over an attribute position removes that attribute.
    /// This is the host write path and does not touch the MDT.
    pub fn write_char(&mut self, ch: u8) {
        let addr = self.cursor_address as usize;
        self.buffer[addr] = DisplayCell {
            char_data: ch,
            is_field_attr: false,
            extended: ExtendedAttributes::default(),
        };
        self.advance_cursor();
    }

    /// Store a data byte at a specific address without moving the cursor
    pub fn write_char_at(&mut self, address: u16, ch: u8) {
        if let Some(cell) = self.buffer.get_mut(address as usize) {
            *cell = DisplayCell {
                char_data: ch,
                is_field_attr: false,
                extended: ExtendedAttributes::default(),
            };
        }
    }

    /// Read the byte at a buffer address
    pub fn read_char_at(&self, address: u16) -> Option<u8> {
        self.buffer.get(address as usize).map(|cell| cell.char_data)
    }

    /// Check whether a buffer position holds a field attribute
    pub fn is_field_attr_at(&self, address: u16) -> bool {
        self.buffer
            .get(address as usize)
            .map(|cell| cell.is_field_attr)
            .unwrap_or(false)
    }

    /// Raw cell access for response encoding
    pub fn cells(&self) -> &[DisplayCell] {
        &self.buffer
    }

    /// Place a field attribute at the cursor and advance
    ///
    /// The field table is refreshed from the buffer afterwards by
    /// [`rebuild_fields`](Self::rebuild_fields).
    pub fn set_field_attribute(&mut self, attr: u8) {
        self.set_field_attribute_extended(attr, ExtendedAttributes::default());
    }

    /// Place a field attribute with extended attributes at the cursor
    pub fn set_field_attribute_extended(&mut self, attr: u8, extended: ExtendedAttributes) {
        let addr = self.cursor_address as usize;
        self.buffer[addr] = DisplayCell {
            char_data: attr,
            is_field_attr: true,
            extended,
        };
        self.advance_cursor();
    }

    /// Rebuild the field table from the attribute cells in the buffer
    pub fn rebuild_fields(&mut self) {
        let collected: Vec<FieldAttribute> = self
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_field_attr)
            .map(|(addr, cell)| {
                FieldAttribute::new_extended(addr as u16, cell.char_data, cell.extended)
            })
            .collect();
        self.fields.rebuild(collected, self.buffer.len());
    }

    /// Store a user-typed byte at the cursor
    ///
    /// Fails when the cursor sits on an attribute byte or in a
    /// protected field. On success in a formatted screen the containing
    /// field's MDT is set in both the attribute cell and the field
    /// table. An unformatted screen has no protection, so every
    /// position accepts input.
    pub fn type_char(&mut self, ch: u8) -> bool {
        let addr = self.cursor_address;
        if self.is_field_attr_at(addr) {
            return false;
        }
        if self.fields.is_formatted() {
            let field_addr = match self.fields.find_field_at(addr) {
                Some(field) if !field.is_protected() => field.address,
                _ => return false,
            };
            self.buffer[field_addr as usize].char_data |= ATTR_MDT;
            self.fields.set_modified_at(addr);
        }
        self.buffer[addr as usize] = DisplayCell {
            char_data: ch,
            is_field_attr: false,
            extended: ExtendedAttributes::default(),
        };
        self.advance_cursor();
        true
    }

    /// Blank every unprotected field and clear its MDT
    ///
    /// An unformatted screen has no protection anywhere, so the whole
    /// buffer is cleared. The cursor moves to the first unprotected
    /// field, or home.
    pub fn clear_unprotected(&mut self) {
        if !self.fields.is_formatted() {
            for cell in &mut self.buffer {
                *cell = DisplayCell::default();
            }
            self.cursor_address = 0;
            return;
        }
        let size = self.buffer.len();
        let spans: Vec<(u16, usize)> = self
            .fields
            .fields()
            .iter()
            .filter(|f| !f.is_protected())
            .map(|f| (f.content_start(size), f.length))
            .collect();
        for (start, length) in spans {
            for offset in 0..length {
                let addr = (start as usize + offset) % size;
                if !self.buffer[addr].is_field_attr {
                    self.buffer[addr].char_data = 0x00;
                }
            }
        }
        self.reset_mdt();
        self.cursor_address = self.fields.first_unprotected().unwrap_or(0);
    }

    /// Clear the MDT on every field, in the cells and in the table
    pub fn reset_mdt(&mut self) {
        for cell in &mut self.buffer {
            if cell.is_field_attr {
                cell.char_data &= !ATTR_MDT;
            }
        }
        self.fields.reset_mdt();
    }

    /// Move the cursor to the next unprotected field's first content cell
    pub fn tab_to_next_field(&mut self) {
        self.cursor_address = self.fields.unprotected_after(self.cursor_address).unwrap_or(0);
    }

    /// Move the cursor backwards through unprotected fields
    ///
    /// Inside a field but past its first content cell, the cursor moves
    /// to that cell. Otherwise it moves to the previous unprotected field.
    pub fn backtab(&mut self) {
        let addr = self.cursor_address;
        let size = self.buffer.len();
        if !self.is_field_attr_at(addr) {
            if let Some(field) = self.fields.find_field_at(addr) {
                if !field.is_protected() {
                    if let Some(offset) = field.content_offset(addr, size) {
                        if offset > 0 {
                            self.cursor_address = field.content_start(size);
                            return;
                        }
                    }
                }
            }
        }
        self.cursor_address = self.fields.unprotected_before(addr).unwrap_or(0);
    }

    /// Move the cursor to the first unprotected field on the screen
    pub fn home(&mut self) {
        self.cursor_address = self.fields.first_unprotected().unwrap_or(0);
    }

    /// Fill from the cursor up to (not including) the stop address
    ///
    /// Wraps past the end of the buffer. A stop address equal to the
    /// cursor fills the entire buffer. The cursor lands on the stop
    /// address. Attribute bytes in the path are overwritten.
    pub fn repeat_to_address(&mut self, ch: u8, stop: u16) {
        let size = self.buffer.len();
        let stop = stop as usize % size;
        let mut addr = self.cursor_address as usize;
        loop {
            self.buffer[addr] = DisplayCell {
                char_data: ch,
                is_field_attr: false,
                extended: ExtendedAttributes::default(),
            };
            addr = (addr + 1) % size;
            if addr == stop {
                break;
            }
        }
        self.cursor_address = stop as u16;
    }

    /// Blank unprotected cells from the cursor up to (not including) the
    /// stop address, wrapping past the end of the buffer
    ///
    /// Attribute bytes are preserved. On an unformatted screen every
    /// cell in the span is blanked.
    pub fn erase_unprotected_to_address(&mut self, stop: u16) {
        let size = self.buffer.len();
        let stop = stop as usize % size;
        let formatted = self.fields.is_formatted();
        let mut addr = self.cursor_address as usize;
        loop {
            if !self.buffer[addr].is_field_attr {
                let unprotected = if formatted {
                    self.fields
                        .find_field_at(addr as u16)
                        .map(|f| !f.is_protected())
                        .unwrap_or(false)
                } else {
                    true
                };
                if unprotected {
                    self.buffer[addr].char_data = 0x00;
                }
            }
            addr = (addr + 1) % size;
            if addr == stop {
                break;
            }
        }
        self.cursor_address = stop as u16;
    }

    pub fn lock_keyboard(&mut self) {
        self.keyboard_locked = true;
    }

    pub fn unlock_keyboard(&mut self) {
        self.keyboard_locked = false;
    }

    pub fn is_keyboard_locked(&self) -> bool {
        self.keyboard_locked
    }

    pub fn set_alarm(&mut self, alarm: bool) {
        self.alarm = alarm;
    }

    pub fn is_alarm(&self) -> bool {
        self.alarm
    }

    pub fn field_manager(&self) -> &FieldManager {
        &self.fields
    }

    pub fn field_manager_mut(&mut self) -> &mut FieldManager {
        &mut self.fields
    }

    /// Render one row as text
    ///
    /// Attribute cells and hidden field content render as spaces, as do
    /// nulls and other non-printable bytes.
    pub fn get_row(&self, row: usize) -> Option<String> {
        if row >= self.rows() {
            return None;
        }
        let cols = self.cols();
        let start = row * cols;
        let mut text = String::with_capacity(cols);
        for offset in 0..cols {
            let addr = (start + offset) as u16;
            text.push(self.render_cell(addr));
        }
        Some(text)
    }

    fn render_cell(&self, address: u16) -> char {
        let cell = &self.buffer[address as usize];
        if cell.is_field_attr {
            return ' ';
        }
        let hidden = self
            .fields
            .find_field_at(address)
            .map(|f| f.is_hidden())
            .unwrap_or(false);
        if hidden {
            return ' ';
        }
        let ch = ebcdic_to_ascii(cell.char_data);
        if ch.is_control() {
            ' '
        } else {
            ch
        }
    }

    /// Render the whole screen as text, one line per row
    ///
    /// Trailing blanks on each row are trimmed. Rendering never changes
    /// buffer state, so repeated calls return identical text.
    pub fn get_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows());
        for row in 0..self.rows() {
            // get_row is total over 0..rows
            let line = self.get_row(row).unwrap_or_default();
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }
}

impl Default for Display3270 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Display3270 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_text())
    }
}

/// 3270 buffer address encoding and decoding
///
/// Classic 12-bit addresses encode six bits per byte through a code
/// table that keeps every byte a valid EBCDIC graphic. 14-bit addresses
/// carry the value directly in the low six bits of the first byte and
/// all eight of the second, flagged by zeros in the top two bits.
pub mod addressing {
    /// Six-bit value to address byte, per the 3270 reference
    const ADDRESS_CODES: [u8; 64] = [
        0x40, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7,
        0xC8, 0xC9, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
        0x50, 0xD1, 0xD2, 0xD3, 0xD4, 0xD5, 0xD6, 0xD7,
        0xD8, 0xD9, 0x5A, 0x5B, 0x5C, 0x5D, 0x5E, 0x5F,
        0x60, 0x61, 0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7,
        0xE8, 0xE9, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F,
        0xF0, 0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7,
        0xF8, 0xF9, 0x7A, 0x7B, 0x7C, 0x7D, 0x7E, 0x7F,
    ];

    /// Encode a buffer address as two bytes
    ///
    /// Addresses above 0x0FFF do not fit twelve bits and use the 14-bit
    /// form instead.
    pub fn encode_address(address: u16) -> (u8, u8) {
        if address > 0x0FFF {
            (((address >> 8) & 0x3F) as u8, (address & 0xFF) as u8)
        } else {
            (
                ADDRESS_CODES[((address >> 6) & 0x3F) as usize],
                ADDRESS_CODES[(address & 0x3F) as usize],
            )
        }
    }

    /// Decode a two-byte buffer address
    ///
    /// The top two bits of the first byte distinguish the forms: zeros
    /// mean 14-bit, anything else means the 12-bit coded form. Every
    /// byte the 12-bit encoder emits has at least one of those bits set.
    pub fn decode_address(byte1: u8, byte2: u8) -> u16 {
        if byte1 & 0xC0 == 0 {
            (((byte1 & 0x3F) as u16) << 8) | byte2 as u16
        } else {
            (((byte1 & 0x3F) as u16) << 6) | (byte2 & 0x3F) as u16
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_known_encodings() {
            // Reference values from the 3270 address tables
            assert_eq!(encode_address(0), (0x40, 0x40));
            assert_eq!(encode_address(80), (0xC1, 0x50));
            assert_eq!(encode_address(1919), (0x5D, 0x7F));
        }

        #[test]
        fn test_twelve_bit_round_trip() {
            for address in [0u16, 1, 79, 80, 1599, 1919, 3563, 4095] {
                let (b1, b2) = encode_address(address);
                assert_ne!(b1 & 0xC0, 0, "12-bit first byte must flag itself");
                assert_eq!(decode_address(b1, b2), address);
            }
        }

        #[test]
        fn test_fourteen_bit_round_trip() {
            for address in [4096u16, 5000, 9999, 16383] {
                let (b1, b2) = encode_address(address);
                assert_eq!(b1 & 0xC0, 0);
                assert_eq!(decode_address(b1, b2), address);
            }
        }

        #[test]
        fn test_fourteen_bit_decode() {
            assert_eq!(decode_address(0x00, 0x00), 0);
            assert_eq!(decode_address(0x07, 0x80), 1920);
            assert_eq!(decode_address(0x3F, 0xFF), 16383);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{ATTR_PROTECTED, DISPLAY_HIDDEN};
    use crate::ebcdic::ascii_to_ebcdic_vec;

    fn write_text(display: &mut Display3270, text: &str) {
        for byte in ascii_to_ebcdic_vec(text) {
            display.write_char(byte);
        }
    }

    #[test]
    fn test_screen_sizes() {
        assert_eq!(ScreenSize::Model2.buffer_size(), 1920);
        assert_eq!(ScreenSize::Model3.buffer_size(), 2560);
        assert_eq!(ScreenSize::Model4.buffer_size(), 3440);
        assert_eq!(ScreenSize::Model5.buffer_size(), 3564);
        assert_eq!(ScreenSize::Model2.terminal_type(), "IBM-3278-2");
        assert_eq!(ScreenSize::Model5.terminal_type(), "IBM-3278-5");
    }

    #[test]
    fn test_coords_round_trip() {
        let size = ScreenSize::Model2;
        assert_eq!(size.coords_to_address(0, 0), 0);
        assert_eq!(size.coords_to_address(1, 0), 80);
        assert_eq!(size.address_to_coords(81), (1, 1));
        assert_eq!(size.address_to_coords(1919), (23, 79));
    }

    #[test]
    fn test_keyboard_starts_locked() {
        let display = Display3270::new();
        assert!(display.is_keyboard_locked());
    }

    #[test]
    fn test_write_advances_and_wraps() {
        let mut display = Display3270::new();
        display.set_cursor(1919);
        display.write_char(0xC1);
        assert_eq!(display.cursor_address(), 0);
        assert_eq!(display.read_char_at(1919), Some(0xC1));
    }

    #[test]
    fn test_write_over_attribute_removes_it() {
        let mut display = Display3270::new();
        display.set_field_attribute(ATTR_PROTECTED);
        display.rebuild_fields();
        assert!(display.is_field_attr_at(0));

        display.set_cursor(0);
        display.write_char(0xC1);
        display.rebuild_fields();
        assert!(!display.is_field_attr_at(0));
        assert!(display.field_manager().fields().is_empty());
    }

    #[test]
    fn test_type_char_sets_mdt_in_cell_and_table() {
        let mut display = Display3270::new();
        display.set_cursor(10);
        display.set_field_attribute(0x00);
        display.rebuild_fields();

        display.set_cursor(11);
        assert!(display.type_char(0xC1));
        assert_eq!(display.read_char_at(11), Some(0xC1));
        assert_eq!(display.read_char_at(10).unwrap() & ATTR_MDT, ATTR_MDT);
        assert_eq!(display.field_manager().modified_fields().len(), 1);
    }

    #[test]
    fn test_type_char_refuses_protected_field() {
        let mut display = Display3270::new();
        display.set_cursor(10);
        display.set_field_attribute(ATTR_PROTECTED);
        display.rebuild_fields();

        display.set_cursor(11);
        assert!(!display.type_char(0xC1));
        assert_eq!(display.read_char_at(11), Some(0x00));
    }

    #[test]
    fn test_type_char_on_unformatted_screen_writes_anywhere() {
        let mut display = Display3270::new();
        display.set_cursor(5);
        assert!(display.type_char(0xC1));
        assert!(display.type_char(0xC2));
        assert_eq!(display.read_char_at(5), Some(0xC1));
        assert_eq!(display.read_char_at(6), Some(0xC2));
        assert_eq!(display.cursor_address(), 7);
        assert!(display.field_manager().modified_fields().is_empty());
    }

    #[test]
    fn test_repeat_to_address_wraps_backwards() {
        let mut display = Display3270::new();
        display.set_cursor(1918);
        display.repeat_to_address(0x40, 2);
        assert_eq!(display.read_char_at(1918), Some(0x40));
        assert_eq!(display.read_char_at(1919), Some(0x40));
        assert_eq!(display.read_char_at(0), Some(0x40));
        assert_eq!(display.read_char_at(1), Some(0x40));
        assert_eq!(display.read_char_at(2), Some(0x00));
        assert_eq!(display.cursor_address(), 2);
    }

    #[test]
    fn test_repeat_to_same_address_fills_buffer() {
        let mut display = Display3270::new();
        display.set_cursor(100);
        display.repeat_to_address(0xC1, 100);
        assert_eq!(display.read_char_at(0), Some(0xC1));
        assert_eq!(display.read_char_at(1919), Some(0xC1));
    }

    #[test]
    fn test_erase_unprotected_to_address() {
        let mut display = Display3270::new();
        display.set_cursor(0);
        display.set_field_attribute(ATTR_PROTECTED);
        write_text(&mut display, "MENU");
        display.set_cursor(10);
        display.set_field_attribute(0x00);
        write_text(&mut display, "INPUT");
        display.rebuild_fields();

        display.set_cursor(0);
        display.erase_unprotected_to_address(100);
        // Protected content survives, unprotected is blanked
        assert_eq!(display.read_char_at(1), Some(ascii_to_ebcdic_vec("M")[0]));
        assert_eq!(display.read_char_at(11), Some(0x00));
        assert!(display.is_field_attr_at(10));
        assert_eq!(display.cursor_address(), 100);
    }

    #[test]
    fn test_clear_unprotected_resets_mdt_and_cursor() {
        let mut display = Display3270::new();
        display.set_cursor(0);
        display.set_field_attribute(ATTR_PROTECTED);
        display.set_cursor(10);
        display.set_field_attribute(0x00);
        display.rebuild_fields();

        display.set_cursor(11);
        display.type_char(0xC1);
        assert_eq!(display.field_manager().modified_fields().len(), 1);

        display.clear_unprotected();
        assert_eq!(display.read_char_at(11), Some(0x00));
        assert!(display.field_manager().modified_fields().is_empty());
        assert_eq!(display.cursor_address(), 11);
    }

    #[test]
    fn test_tab_and_backtab() {
        let mut display = Display3270::new();
        display.set_cursor(0);
        display.set_field_attribute(ATTR_PROTECTED);
        display.set_cursor(10);
        display.set_field_attribute(0x00);
        display.set_cursor(30);
        display.set_field_attribute(0x00);
        display.rebuild_fields();

        display.set_cursor(0);
        display.tab_to_next_field();
        assert_eq!(display.cursor_address(), 11);
        display.tab_to_next_field();
        assert_eq!(display.cursor_address(), 31);
        display.tab_to_next_field();
        assert_eq!(display.cursor_address(), 11);

        // Backtab from mid-field goes to the field start first
        display.set_cursor(35);
        display.backtab();
        assert_eq!(display.cursor_address(), 31);
        display.backtab();
        assert_eq!(display.cursor_address(), 11);
    }

    #[test]
    fn test_home() {
        let mut display = Display3270::new();
        display.set_cursor(100);
        display.set_field_attribute(0x00);
        display.rebuild_fields();
        display.set_cursor(500);
        display.home();
        assert_eq!(display.cursor_address(), 101);
    }

    #[test]
    fn test_hidden_field_renders_blank() {
        let mut display = Display3270::new();
        display.set_cursor(0);
        display.set_field_attribute(DISPLAY_HIDDEN);
        write_text(&mut display, "SECRET");
        display.rebuild_fields();

        let row = display.get_row(0).unwrap();
        assert!(!row.contains("SECRET"));
    }

    #[test]
    fn test_get_text_is_idempotent() {
        let mut display = Display3270::new();
        display.set_cursor(0);
        display.set_field_attribute(ATTR_PROTECTED);
        write_text(&mut display, "WELCOME TO TSO");
        display.rebuild_fields();

        let first = display.get_text();
        let second = display.get_text();
        assert_eq!(first, second);
        assert!(first.starts_with(" WELCOME TO TSO"));
        assert_eq!(first.lines().count(), 24);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut display = Display3270::new();
        display.set_cursor(5);
        display.set_field_attribute(0x00);
        write_text(&mut display, "DATA");
        display.rebuild_fields();

        display.clear();
        assert_eq!(display.cursor_address(), 0);
        assert_eq!(display.read_char_at(6), Some(0x00));
        assert!(display.field_manager().fields().is_empty());
    }
}
