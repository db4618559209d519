//! EBCDIC to ASCII conversion for 3270 terminals
//!
//! IBM mainframes encode display data in EBCDIC code page 037 (US/Canada).
//! This module provides the translation in both directions. Characters
//! with no EBCDIC equivalent translate to the EBCDIC space (0x40).

use once_cell::sync::Lazy;

/// EBCDIC code page 037 to ASCII/Latin-1 translation table
pub const EBCDIC_CP037_TO_ASCII: [char; 256] = [
    // 0x00-0x0F: Control characters
    '\u{0000}', '\u{0001}', '\u{0002}', '\u{0003}', '\u{009C}', '\u{0009}', '\u{0086}', '\u{007F}',
    '\u{0097}', '\u{008D}', '\u{008E}', '\u{000B}', '\u{000C}', '\u{000D}', '\u{000E}', '\u{000F}',
    // 0x10-0x1F: Control characters
    '\u{0010}', '\u{0011}', '\u{0012}', '\u{0013}', '\u{009D}', '\u{0085}', '\u{0008}', '\u{0087}',
    '\u{0018}', '\u{0019}', '\u{0092}', '\u{008F}', '\u{001C}', '\u{001D}', '\u{001E}', '\u{001F}',
    // 0x20-0x2F: Control characters
    '\u{0080}', '\u{0081}', '\u{0082}', '\u{0083}', '\u{0084}', '\u{000A}', '\u{0017}', '\u{001B}',
    '\u{0088}', '\u{0089}', '\u{008A}', '\u{008B}', '\u{008C}', '\u{0005}', '\u{0006}', '\u{0007}',
    // 0x30-0x3F: Control characters
    '\u{0090}', '\u{0091}', '\u{0016}', '\u{0093}', '\u{0094}', '\u{0095}', '\u{0096}', '\u{0004}',
    '\u{0098}', '\u{0099}', '\u{009A}', '\u{009B}', '\u{0014}', '\u{0015}', '\u{009E}', '\u{001A}',
    // 0x40-0x4F: Space and special characters
    ' ', '\u{00A0}', 'â', 'ä', 'à', 'á', 'ã', 'å',
    'ç', 'ñ', '¢', '.', '<', '(', '+', '|',
    // 0x50-0x5F: Ampersand and special characters
    '&', 'é', 'ê', 'ë', 'è', 'í', 'î', 'ï',
    'ì', 'ß', '!', '$', '*', ')', ';', '¬',
    // 0x60-0x6F: Dash, slash and special characters
    '-', '/', 'Â', 'Ä', 'À', 'Á', 'Ã', 'Å',
    'Ç', 'Ñ', '¦', ',', '%', '_', '>', '?',
    // 0x70-0x7F: Accented uppercase and punctuation
    'ø', 'É', 'Ê', 'Ë', 'È', 'Í', 'Î', 'Ï',
    'Ì', '`', ':', '#', '@', '\'', '=', '"',
    // 0x80-0x8F: Lowercase a-i
    'Ø', 'a', 'b', 'c', 'd', 'e', 'f', 'g',
    'h', 'i', '«', '»', 'ð', 'ý', 'þ', '±',
    // 0x90-0x9F: Lowercase j-r
    '°', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
    'q', 'r', 'ª', 'º', 'æ', '¸', 'Æ', '¤',
    // 0xA0-0xAF: Lowercase s-z
    'µ', '~', 's', 't', 'u', 'v', 'w', 'x',
    'y', 'z', '¡', '¿', 'Ð', 'Ý', 'Þ', '®',
    // 0xB0-0xBF: Special characters
    '^', '£', '¥', '·', '©', '§', '¶', '¼',
    '½', '¾', '[', ']', '¯', '¨', '´', '×',
    // 0xC0-0xCF: Uppercase A-I
    '{', 'A', 'B', 'C', 'D', 'E', 'F', 'G',
    'H', 'I', '\u{00AD}', 'ô', 'ö', 'ò', 'ó', 'õ',
    // 0xD0-0xDF: Uppercase J-R
    '}', 'J', 'K', 'L', 'M', 'N', 'O', 'P',
    'Q', 'R', '¹', 'û', 'ü', 'ù', 'ú', 'ÿ',
    // 0xE0-0xEF: Uppercase S-Z
    '\\', '÷', 'S', 'T', 'U', 'V', 'W', 'X',
    'Y', 'Z', '²', 'Ô', 'Ö', 'Ò', 'Ó', 'Õ',
    // 0xF0-0xFF: Digits 0-9
    '0', '1', '2', '3', '4', '5', '6', '7',
    '8', '9', '³', 'Û', 'Ü', 'Ù', 'Ú', '\u{009F}',
];

// CP037 maps the 256 EBCDIC bytes onto 256 distinct Latin-1 code points,
// so the reverse table is the inversion of the forward table.
static ASCII_TO_EBCDIC_TABLE: Lazy<[u8; 256]> = Lazy::new(|| {
    let mut table = [0x40u8; 256];
    for (ebcdic, ch) in EBCDIC_CP037_TO_ASCII.iter().enumerate() {
        table[*ch as usize] = ebcdic as u8;
    }
    table
});

/// Convert an EBCDIC byte to its ASCII/Latin-1 character
///
/// # Arguments
/// * `byte` - The EBCDIC byte value to convert
///
/// # Returns
/// The corresponding character from code page 037
///
/// # Examples
/// ```
/// use tn3270r::ebcdic::ebcdic_to_ascii;
///
/// assert_eq!(ebcdic_to_ascii(0xC1), 'A');
/// assert_eq!(ebcdic_to_ascii(0xF0), '0');
/// assert_eq!(ebcdic_to_ascii(0x40), ' ');
/// ```
#[inline(always)]
pub fn ebcdic_to_ascii(byte: u8) -> char {
    EBCDIC_CP037_TO_ASCII[byte as usize]
}

/// Convert an ASCII/Latin-1 character to its EBCDIC byte
///
/// Characters outside code page 037 convert to the EBCDIC space (0x40).
///
/// # Arguments
/// * `ch` - The character to convert
///
/// # Returns
/// The corresponding EBCDIC byte
///
/// # Examples
/// ```
/// use tn3270r::ebcdic::ascii_to_ebcdic;
///
/// assert_eq!(ascii_to_ebcdic('A'), 0xC1);
/// assert_eq!(ascii_to_ebcdic('0'), 0xF0);
/// assert_eq!(ascii_to_ebcdic('☃'), 0x40);
/// ```
pub fn ascii_to_ebcdic(ch: char) -> u8 {
    let code = ch as u32;
    if code < 256 {
        ASCII_TO_EBCDIC_TABLE[code as usize]
    } else {
        0x40
    }
}

/// Convert a slice of EBCDIC bytes to an ASCII string
///
/// # Examples
/// ```
/// use tn3270r::ebcdic::ebcdic_to_ascii_string;
///
/// let bytes = [0xC8, 0x85, 0x93, 0x93, 0x96];
/// assert_eq!(ebcdic_to_ascii_string(&bytes), "Hello");
/// ```
pub fn ebcdic_to_ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| ebcdic_to_ascii(b)).collect()
}

/// Convert an ASCII string to a vector of EBCDIC bytes
///
/// # Examples
/// ```
/// use tn3270r::ebcdic::ascii_to_ebcdic_vec;
///
/// let bytes = ascii_to_ebcdic_vec("Hello");
/// assert_eq!(bytes, vec![0xC8, 0x85, 0x93, 0x93, 0x96]);
/// ```
pub fn ascii_to_ebcdic_vec(text: &str) -> Vec<u8> {
    text.chars().map(ascii_to_ebcdic).collect()
}
