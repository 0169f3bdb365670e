//! Base64 and URL query encodings

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::Engine;

use super::{ConvertError, Stage};

/// Standard alphabet that tolerates non-zero bits after the last full byte
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Encode raw bytes with the standard, padded base64 alphabet
pub fn base64_encode(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Decode standard base64 text. Line breaks in the input are ignored.
pub fn base64_decode(body: &[u8]) -> Result<String, ConvertError> {
    let text: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| *b != b'\r' && *b != b'\n')
        .collect();
    let decoded = STANDARD_LENIENT
        .decode(text)
        .map_err(|e| ConvertError::new(Stage::Base64Decode, e))?;
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Escape text for use inside a URL query.
///
/// Unreserved characters (`A-Z a-z 0-9 - _ . ~`) pass through, a space becomes `+`
/// and every other byte becomes `%XX`.
pub fn url_encode(body: &[u8]) -> String {
    // '%' itself is escaped to "%25", so any "%20" left is an encoded space
    urlencoding::encode_binary(body).replace("%20", "+")
}

/// Reverse [`url_encode`]: `+` becomes a space and `%XX` escapes are decoded
pub fn url_decode(body: &[u8]) -> Result<String, ConvertError> {
    let unplussed: Vec<u8> = body
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    check_escapes(&unplussed)?;
    let decoded = urlencoding::decode_binary(&unplussed);
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

/// Every '%' must be followed by two hex digits
fn check_escapes(input: &[u8]) -> Result<(), ConvertError> {
    let mut i = 0;
    while i < input.len() {
        if input[i] != b'%' {
            i += 1;
            continue;
        }
        let escape = &input[i..input.len().min(i + 3)];
        let valid = escape.len() == 3 && escape[1..].iter().all(u8::is_ascii_hexdigit);
        if !valid {
            return Err(ConvertError::new(
                Stage::UrlDecode,
                format!("invalid URL escape {:?}", String::from_utf8_lossy(escape)),
            ));
        }
        i += 3;
    }
    Ok(())
}
