//! Data stream integration tests
//!
//! Feed realistic host writes through the decoder and check the screen
//! the caller sees, then encode input back and check the exact bytes a
//! host would receive.

use tn3270r::codes::{
    AidKey, ATTR_PROTECTED, CMD_ERASE_WRITE, CMD_WRITE, ORDER_IC, ORDER_RA, ORDER_SBA, ORDER_SF,
    WCC_RESTORE,
};
use tn3270r::display::{addressing, Display3270};
use tn3270r::ebcdic::ascii_to_ebcdic_vec;
use tn3270r::ProtocolProcessor3270;

fn sba(address: u16) -> Vec<u8> {
    let (b1, b2) = addressing::encode_address(address);
    vec![ORDER_SBA, b1, b2]
}

/// A logon screen: two labelled input fields and a trailing protected
/// field closing the second input
fn logon_screen() -> Vec<u8> {
    let mut unit = vec![CMD_ERASE_WRITE, WCC_RESTORE];
    unit.extend(sba(100));
    unit.extend([ORDER_SF, ATTR_PROTECTED]);
    unit.extend(ascii_to_ebcdic_vec("USERID:"));
    unit.extend(sba(110));
    unit.extend([ORDER_SF, 0x00]);
    unit.push(ORDER_IC);
    unit.extend(sba(140));
    unit.extend([ORDER_SF, ATTR_PROTECTED]);
    unit.extend(ascii_to_ebcdic_vec("PASSWORD:"));
    unit.extend(sba(150));
    unit.extend([ORDER_SF, 0x00]);
    unit.extend(sba(200));
    unit.extend([ORDER_SF, ATTR_PROTECTED]);
    unit
}

/// Decoding the logon screen produces readable text, an unlocked
/// keyboard, and the cursor parked in the first input field
#[test]
fn test_logon_screen_decodes() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();
    processor.process_data(&logon_screen(), &mut display).unwrap();

    let text = display.get_text();
    assert!(text.contains("USERID:"));
    assert!(text.contains("PASSWORD:"));
    assert!(!display.is_keyboard_locked());
    assert_eq!(display.cursor_address(), 111);
    assert_eq!(display.field_manager().fields().len(), 5);
}

/// Every cell belongs to exactly one field once the screen is formatted
#[test]
fn test_field_table_covers_the_buffer() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();
    processor.process_data(&logon_screen(), &mut display).unwrap();

    let covered: usize = display
        .field_manager()
        .fields()
        .iter()
        .map(|f| f.length + 1)
        .sum();
    assert_eq!(covered, display.buffer_size());
}

/// Typing into both fields and pressing Enter produces the reference
/// encoding: AID, cursor, then SBA plus content per modified field
#[test]
fn test_login_round_trip_bytes() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();
    processor.process_data(&logon_screen(), &mut display).unwrap();

    for byte in ascii_to_ebcdic_vec("USER") {
        assert!(display.type_char(byte));
    }
    display.tab_to_next_field();
    assert_eq!(display.cursor_address(), 151);
    for byte in ascii_to_ebcdic_vec("PASS") {
        assert!(display.type_char(byte));
    }

    let unit = processor.create_read_modified_response(&display, AidKey::Enter);
    assert_eq!(
        unit,
        vec![
            0x7D, // Enter
            0xC2, 0x5B, // cursor at 155
            ORDER_SBA, 0xC1, 0x6F, // field content at 111
            0xE4, 0xE2, 0xC5, 0xD9, // USER
            ORDER_SBA, 0xC2, 0xD7, // field content at 151
            0xD7, 0xC1, 0xE2, 0xE2, // PASS
        ]
    );
}

/// A second read of the screen returns the same text when no data
/// arrived in between
#[test]
fn test_screen_text_is_stable() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();
    processor.process_data(&logon_screen(), &mut display).unwrap();
    assert_eq!(display.get_text(), display.get_text());
}

/// An unknown order in the middle of a write degrades to a skip; the
/// data after it still lands on screen
#[test]
fn test_unknown_order_resynchronizes() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let mut unit = vec![CMD_WRITE, WCC_RESTORE];
    unit.extend(sba(0));
    unit.extend(ascii_to_ebcdic_vec("BEFORE"));
    unit.push(0x3A); // not an order, not format control
    unit.extend(sba(80));
    unit.extend(ascii_to_ebcdic_vec("AFTER"));
    processor.process_data(&unit, &mut display).unwrap();

    let text = display.get_text();
    assert!(text.contains("BEFORE"));
    assert!(text.contains("AFTER"));
    assert!(!display.is_keyboard_locked());
}

/// A write truncated inside an order operand keeps everything decoded
/// up to the truncation point
#[test]
fn test_truncated_operand_keeps_partial_screen() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let mut unit = vec![CMD_WRITE, WCC_RESTORE];
    unit.extend(sba(0));
    unit.extend(ascii_to_ebcdic_vec("KEPT"));
    unit.push(ORDER_SBA);
    unit.push(0x40); // second address byte missing
    processor.process_data(&unit, &mut display).unwrap();

    assert!(display.get_text().contains("KEPT"));
}

/// Consecutive writes accumulate; only erase writes reset the screen
#[test]
fn test_write_accumulates_erase_write_resets() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let mut first = vec![CMD_WRITE, WCC_RESTORE];
    first.extend(sba(0));
    first.extend(ascii_to_ebcdic_vec("FIRST"));
    processor.process_data(&first, &mut display).unwrap();

    let mut second = vec![CMD_WRITE, WCC_RESTORE];
    second.extend(sba(80));
    second.extend(ascii_to_ebcdic_vec("SECOND"));
    processor.process_data(&second, &mut display).unwrap();
    let text = display.get_text();
    assert!(text.contains("FIRST"));
    assert!(text.contains("SECOND"));

    let mut wipe = vec![CMD_ERASE_WRITE, WCC_RESTORE];
    wipe.extend(sba(160));
    wipe.extend(ascii_to_ebcdic_vec("ONLY"));
    processor.process_data(&wipe, &mut display).unwrap();
    let text = display.get_text();
    assert!(!text.contains("FIRST"));
    assert!(!text.contains("SECOND"));
    assert!(text.contains("ONLY"));
}

/// Repeat to Address fills the gap between two screen regions
#[test]
fn test_repeat_to_address_fill() {
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();

    let mut unit = vec![CMD_ERASE_WRITE, WCC_RESTORE];
    unit.extend(sba(0));
    let (b1, b2) = addressing::encode_address(80);
    unit.extend([ORDER_RA, b1, b2, ascii_to_ebcdic_vec("*")[0]]);
    processor.process_data(&unit, &mut display).unwrap();

    let first_row = display.get_row(0).unwrap();
    assert_eq!(first_row.trim_end(), "*".repeat(80));
    assert_eq!(display.get_row(1).unwrap().trim_end(), "");
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Twelve-bit addresses survive the encode/decode pair.
        #[test]
        fn twelve_bit_addresses_round_trip(address in 0u16..4096) {
            let (b1, b2) = addressing::encode_address(address);
            prop_assert_eq!(addressing::decode_address(b1, b2), address);
        }

        /// Fourteen-bit addresses survive the encode/decode pair.
        #[test]
        fn fourteen_bit_addresses_round_trip(address in 4096u16..16384) {
            let (b1, b2) = addressing::encode_address(address);
            prop_assert_eq!(addressing::decode_address(b1, b2), address);
        }

        /// Any byte soup fed to the decoder leaves the session usable:
        /// no panic, cursor in bounds, field table consistent.
        #[test]
        fn random_records_never_poison_the_display(bytes in proptest::collection::vec(any::<u8>(), 0..300)) {
            let mut processor = ProtocolProcessor3270::new();
            let mut display = Display3270::new();
            let _ = processor.process_data(&bytes, &mut display);
            prop_assert!((display.cursor_address() as usize) < display.buffer_size());
            for field in display.field_manager().fields() {
                prop_assert!((field.address as usize) < display.buffer_size());
            }
        }

        /// Attribute bytes scattered anywhere produce a field table in
        /// which every cell is owned by exactly one field.
        #[test]
        fn field_spans_partition_the_buffer(
            addresses in proptest::collection::btree_set(0u16..1920, 1..12)
        ) {
            let mut unit = vec![CMD_ERASE_WRITE, WCC_RESTORE];
            for &address in &addresses {
                unit.extend(sba(address));
                unit.extend([ORDER_SF, 0x00]);
            }
            let mut processor = ProtocolProcessor3270::new();
            let mut display = Display3270::new();
            processor.process_data(&unit, &mut display).unwrap();

            let covered: usize = display
                .field_manager()
                .fields()
                .iter()
                .map(|f| f.length + 1)
                .sum();
            prop_assert_eq!(covered, display.buffer_size());
        }
    }
}
