use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tn3270r::codes::{
    AidKey, ATTR_PROTECTED, CMD_ERASE_WRITE, ORDER_IC, ORDER_RA, ORDER_SBA, ORDER_SF, WCC_RESTORE,
};
use tn3270r::display::{addressing, Display3270};
use tn3270r::ProtocolProcessor3270;

/// A representative logon screen: a title row, four labelled input
/// fields, and a fill order, the shape a real host write takes.
fn build_logon_screen() -> Vec<u8> {
    let mut data = vec![CMD_ERASE_WRITE, WCC_RESTORE];
    let mut at = |address: u16, data: &mut Vec<u8>| {
        let (b1, b2) = addressing::encode_address(address);
        data.extend_from_slice(&[ORDER_SBA, b1, b2]);
    };

    at(0, &mut data);
    data.extend_from_slice(&[ORDER_SF, ATTR_PROTECTED]);
    // "SIMPLATFORM LOGON SCREEN" in EBCDIC
    for ch in "SIMPLATFORM LOGON SCREEN".chars() {
        data.push(tn3270r::ebcdic::ascii_to_ebcdic(ch));
    }

    for row in 0..4u16 {
        let label = 80 * (row + 5);
        at(label, &mut data);
        data.extend_from_slice(&[ORDER_SF, ATTR_PROTECTED]);
        for ch in "Userid  ===>".chars() {
            data.push(tn3270r::ebcdic::ascii_to_ebcdic(ch));
        }
        at(label + 14, &mut data);
        data.extend_from_slice(&[ORDER_SF, 0x00]);
        if row == 0 {
            data.extend_from_slice(&[ORDER_IC]);
        }
        at(label + 40, &mut data);
        data.extend_from_slice(&[ORDER_SF, ATTR_PROTECTED]);
    }

    // Fill the bottom row with dashes
    at(80 * 23, &mut data);
    let (b1, b2) = addressing::encode_address(0);
    data.extend_from_slice(&[ORDER_RA, b1, b2, 0x60]);
    data
}

fn bench_decode_write(c: &mut Criterion) {
    let screen = build_logon_screen();
    c.bench_function("decode_erase_write", |b| {
        b.iter(|| {
            let mut processor = ProtocolProcessor3270::new();
            let mut display = Display3270::new();
            processor
                .process_data(black_box(&screen), black_box(&mut display))
                .unwrap();
            black_box(display.get_text())
        })
    });
}

fn bench_encode_read_modified(c: &mut Criterion) {
    let screen = build_logon_screen();
    let mut processor = ProtocolProcessor3270::new();
    let mut display = Display3270::new();
    processor.process_data(&screen, &mut display).unwrap();
    for byte in [0xC9, 0xC2, 0xD4, 0xE4, 0xE2, 0xC5, 0xD9] {
        display.type_char(byte);
    }

    c.bench_function("encode_read_modified", |b| {
        b.iter(|| {
            black_box(processor.create_read_modified_response(
                black_box(&display),
                AidKey::Enter,
            ))
        })
    });
}

criterion_group!(benches, bench_decode_write, bench_encode_read_modified);
criterion_main!(benches);
