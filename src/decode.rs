//! Character decoding for fetched source blobs.
//!
//! Source files come from an uncontrolled publisher whose encoding can
//! drift, so decoding never fails: strict UTF-8 first, then Latin-1,
//! which accepts all byte values. Downstream stages always receive text.

pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    // Latin-1 maps every byte value, so the chain is total from here.
    encoding_rs::mem::decode_latin1(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_utf8_passes_through() {
        assert_eq!(decode_bytes("series_id,year\u{e9}".as_bytes()), "series_id,year\u{e9}");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        // 0xE9 is 'é' in Latin-1 but an invalid UTF-8 start byte here.
        let bytes = b"caf\xe9";
        assert_eq!(decode_bytes(bytes), "café");
    }

    #[test]
    fn never_fails_on_arbitrary_bytes() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = decode_bytes(&bytes);
        assert_eq!(text.chars().count(), 256);
    }
}
