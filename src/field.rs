//! 3270 field attribute handling
//!
//! A formatted 3270 screen is divided into fields. Each field starts at an
//! attribute byte in the buffer and runs up to (not including) the next
//! attribute byte, wrapping from the end of the buffer back to the start.
//! The attribute byte controls protection, numeric shift, display intensity
//! and carries the Modified Data Tag (MDT) that drives Read Modified.

use crate::codes::{
    ATTR_MDT, ATTR_NUMERIC, ATTR_PROTECTED, DISPLAY_HIDDEN, DISPLAY_INTENSIFIED,
};

/// Extended field attributes from the Start Field Extended (SFE) order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedAttributes {
    /// Extended highlighting (blink, reverse video, underscore)
    pub highlighting: Option<u8>,
    /// Foreground color
    pub foreground_color: Option<u8>,
    /// Background color
    pub background_color: Option<u8>,
    /// Character set selection
    pub charset: Option<u8>,
    /// Field validation (mandatory fill, mandatory entry, trigger)
    pub validation: Option<u8>,
    /// Field outlining
    pub outlining: Option<u8>,
    /// Background transparency
    pub transparency: Option<u8>,
}

impl ExtendedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_highlighting(mut self, value: u8) -> Self {
        self.highlighting = Some(value);
        self
    }

    pub fn with_foreground_color(mut self, value: u8) -> Self {
        self.foreground_color = Some(value);
        self
    }

    pub fn with_background_color(mut self, value: u8) -> Self {
        self.background_color = Some(value);
        self
    }

    pub fn with_validation(mut self, value: u8) -> Self {
        self.validation = Some(value);
        self
    }
}

/// A single field: attribute position, attribute byte and content geometry
///
/// `length` counts content cells only. The attribute byte itself occupies
/// one buffer position and is not part of the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAttribute {
    /// Buffer address of the attribute byte
    pub address: u16,
    /// Base 3270 attribute byte
    pub base_attr: u8,
    /// Extended attributes from SFE, if any
    pub extended: ExtendedAttributes,
    /// Number of content cells following the attribute byte
    pub length: usize,
}

impl FieldAttribute {
    /// Create a field from a Start Field order
    pub fn new(address: u16, base_attr: u8) -> Self {
        Self {
            address,
            base_attr,
            extended: ExtendedAttributes::default(),
            length: 0,
        }
    }

    /// Create a field from a Start Field Extended order
    pub fn new_extended(address: u16, base_attr: u8, extended: ExtendedAttributes) -> Self {
        Self {
            address,
            base_attr,
            extended,
            length: 0,
        }
    }

    /// Check if this field is protected from user input
    pub fn is_protected(&self) -> bool {
        self.base_attr & ATTR_PROTECTED != 0
    }

    /// Check if this field accepts only numeric input
    pub fn is_numeric(&self) -> bool {
        self.base_attr & ATTR_NUMERIC != 0
    }

    /// Check if this field displays intensified
    pub fn is_intensified(&self) -> bool {
        self.base_attr & DISPLAY_HIDDEN == DISPLAY_INTENSIFIED
    }

    /// Check if this field is non-display (passwords)
    pub fn is_hidden(&self) -> bool {
        self.base_attr & DISPLAY_HIDDEN == DISPLAY_HIDDEN
    }

    /// Check if the Modified Data Tag is set
    pub fn is_modified(&self) -> bool {
        self.base_attr & ATTR_MDT != 0
    }

    /// Set or clear the Modified Data Tag
    pub fn set_modified(&mut self, modified: bool) {
        if modified {
            self.base_attr |= ATTR_MDT;
        } else {
            self.base_attr &= !ATTR_MDT;
        }
    }

    /// Buffer address of the first content cell
    pub fn content_start(&self, buffer_size: usize) -> u16 {
        ((self.address as usize + 1) % buffer_size) as u16
    }

    /// Offset of `address` into this field's content, if it falls inside
    pub fn content_offset(&self, address: u16, buffer_size: usize) -> Option<usize> {
        let start = self.content_start(buffer_size) as usize;
        let offset = (address as usize + buffer_size - start) % buffer_size;
        if offset < self.length {
            Some(offset)
        } else {
            None
        }
    }
}

/// Table of fields on the current screen, kept sorted by attribute address
///
/// The table is rebuilt from the buffer after every inbound write, so it
/// always reflects the attribute bytes actually present in the cells.
#[derive(Debug, Clone)]
pub struct FieldManager {
    fields: Vec<FieldAttribute>,
    buffer_size: usize,
}

impl FieldManager {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            fields: Vec::new(),
            buffer_size,
        }
    }

    /// Remove all fields
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// All fields in buffer address order
    pub fn fields(&self) -> &[FieldAttribute] {
        &self.fields
    }

    /// A screen with no attribute bytes is unformatted
    pub fn is_formatted(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Replace the table with fields collected from the buffer and
    /// recompute every field's content length
    pub fn rebuild(&mut self, mut fields: Vec<FieldAttribute>, buffer_size: usize) {
        fields.sort_by_key(|f| f.address);
        fields.dedup_by_key(|f| f.address);
        self.fields = fields;
        self.buffer_size = buffer_size;
        self.compute_lengths();
    }

    // Each field runs from the cell after its attribute byte up to the next
    // attribute byte, wrapping past the buffer end. A lone field owns the
    // whole buffer minus its own attribute cell.
    fn compute_lengths(&mut self) {
        let count = self.fields.len();
        for i in 0..count {
            let start = self.fields[i].address as usize;
            let next = self.fields[(i + 1) % count].address as usize;
            let extent = (next + self.buffer_size - start) % self.buffer_size;
            self.fields[i].length = if extent == 0 {
                self.buffer_size - 1
            } else {
                extent - 1
            };
        }
    }

    /// Find the field containing the given buffer address
    ///
    /// Addresses before the first attribute byte wrap around and belong
    /// to the last field in the table.
    pub fn find_field_at(&self, address: u16) -> Option<&FieldAttribute> {
        if self.fields.is_empty() {
            return None;
        }
        self.fields
            .iter()
            .rev()
            .find(|f| f.address <= address)
            .or_else(|| self.fields.last())
    }

    /// Mutable variant of [`find_field_at`](Self::find_field_at)
    pub fn find_field_at_mut(&mut self, address: u16) -> Option<&mut FieldAttribute> {
        if self.fields.is_empty() {
            return None;
        }
        let index = self
            .fields
            .iter()
            .rposition(|f| f.address <= address)
            .unwrap_or(self.fields.len() - 1);
        self.fields.get_mut(index)
    }

    /// Content start of the first unprotected field after `address`,
    /// wrapping around the buffer
    pub fn unprotected_after(&self, address: u16) -> Option<u16> {
        let following = self
            .fields
            .iter()
            .filter(|f| f.address > address)
            .chain(self.fields.iter().filter(|f| f.address <= address));
        for field in following {
            if !field.is_protected() && field.length > 0 {
                return Some(field.content_start(self.buffer_size));
            }
        }
        None
    }

    /// Content start of the last unprotected field before `address`,
    /// wrapping around the buffer
    pub fn unprotected_before(&self, address: u16) -> Option<u16> {
        let preceding = self
            .fields
            .iter()
            .rev()
            .filter(|f| f.address < address)
            .chain(self.fields.iter().rev().filter(|f| f.address >= address));
        for field in preceding {
            if !field.is_protected() && field.length > 0 {
                return Some(field.content_start(self.buffer_size));
            }
        }
        None
    }

    /// Content start of the first unprotected field on the screen
    pub fn first_unprotected(&self) -> Option<u16> {
        self.fields
            .iter()
            .find(|f| !f.is_protected() && f.length > 0)
            .map(|f| f.content_start(self.buffer_size))
    }

    /// Fields whose Modified Data Tag is set, in address order
    pub fn modified_fields(&self) -> Vec<&FieldAttribute> {
        self.fields.iter().filter(|f| f.is_modified()).collect()
    }

    /// Clear the Modified Data Tag on every field
    pub fn reset_mdt(&mut self) {
        for field in &mut self.fields {
            field.set_modified(false);
        }
    }

    /// Set the Modified Data Tag on the field containing `address`
    pub fn set_modified_at(&mut self, address: u16) {
        if let Some(field) = self.find_field_at_mut(address) {
            field.set_modified(true);
        }
    }
}
