//! Z85 encoding (ZeroMQ RFC 32)
//!
//! Keys are 32 raw bytes and 40 Z85 characters.

use emyz_core::{EmyzError, EmyzResult, KEY_BIN_LEN, KEY_Z85_LEN};

const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

const INVALID: u8 = 0xFF;

const DECODER: [u8; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Encode bytes; length must be a multiple of 4
pub fn encode(data: &[u8]) -> EmyzResult<String> {
    if data.len() % 4 != 0 {
        return Err(EmyzError::InvalidEncoding(format!(
            "z85 input length {} is not a multiple of 4",
            data.len()
        )));
    }

    Ok(encode_groups(data))
}

/// Encode a raw key into its 40-character form
pub fn encode_key(key: &[u8; KEY_BIN_LEN]) -> String {
    encode_groups(key)
}

/// Decode a 40-character key
pub fn decode_key(text: &str) -> EmyzResult<[u8; KEY_BIN_LEN]> {
    if text.len() != KEY_Z85_LEN {
        return Err(EmyzError::InvalidKey(format!(
            "expected {} characters, got {}",
            KEY_Z85_LEN,
            text.len()
        )));
    }
    let raw = decode(text).map_err(|e| EmyzError::InvalidKey(e.to_string()))?;
    raw.as_slice()
        .try_into()
        .map_err(|_| EmyzError::InvalidKey(format!("decoded to {} bytes", raw.len())))
}

fn encode_groups(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() / 4 * 5);
    for chunk in data.chunks_exact(4) {
        let mut value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.extend(digits.iter().map(|&d| d as char));
    }
    out
}

/// Decode a string; length must be a multiple of 5
pub fn decode(text: &str) -> EmyzResult<Vec<u8>> {
    let bytes = text.as_bytes();
    if bytes.len() % 5 != 0 {
        return Err(EmyzError::InvalidEncoding(format!(
            "z85 input length {} is not a multiple of 5",
            bytes.len()
        )));
    }

    let mut out = Vec::with_capacity(bytes.len() / 5 * 4);
    for chunk in bytes.chunks_exact(5) {
        let mut value: u64 = 0;
        for &c in chunk {
            let digit = DECODER[c as usize];
            if digit == INVALID {
                return Err(EmyzError::InvalidEncoding(format!(
                    "invalid z85 character {:?}",
                    c as char
                )));
            }
            value = value * 85 + digit as u64;
        }
        let value = u32::try_from(value)
            .map_err(|_| EmyzError::InvalidEncoding("z85 group overflows 32 bits".into()))?;
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_vector() {
        let raw = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];
        assert_eq!(encode(&raw).unwrap(), "HelloWorld");
        assert_eq!(decode("HelloWorld").unwrap(), raw);
    }

    #[test]
    fn test_key_lengths() {
        let encoded = encode(&[0u8; 32]).unwrap();
        assert_eq!(encoded.len(), 40);
        assert_eq!(decode(&encoded).unwrap(), vec![0u8; 32]);
    }

    #[test]
    fn test_key_helpers() {
        let key = [0xA5u8; KEY_BIN_LEN];
        let text = encode_key(&key);
        assert_eq!(decode_key(&text).unwrap(), key);
        assert!(matches!(decode_key("short"), Err(EmyzError::InvalidKey(_))));
        assert!(decode_key(&" ".repeat(KEY_Z85_LEN)).is_err());
    }

    #[test]
    fn test_bad_lengths() {
        assert!(encode(&[1, 2, 3]).is_err());
        assert!(decode("abcd").is_err());
    }

    #[test]
    fn test_bad_characters() {
        assert!(decode("Hello Wor").is_err());
        assert!(decode("abcd\"").is_err());
    }

    #[test]
    fn test_overflowing_group() {
        // "#####" is 85^5 - 1, above u32::MAX
        assert!(decode("#####").is_err());
    }

    proptest! {
        #[test]
        fn prop_roundtrip(words in proptest::collection::vec(any::<[u8; 4]>(), 0..16)) {
            let raw: Vec<u8> = words.concat();
            let text = encode(&raw).unwrap();
            prop_assert_eq!(text.len(), raw.len() / 4 * 5);
            prop_assert_eq!(decode(&text).unwrap(), raw);
        }
    }
}
