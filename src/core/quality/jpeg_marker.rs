//! End-of-image marker check for JPEG payloads.

/// JPEG files end with the `FF D9` end-of-image marker. Its absence
/// usually means the file was truncated mid-transfer.
pub fn has_end_marker(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[bytes.len() - 2] == 0xFF && bytes[bytes.len() - 1] == 0xD9
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_present_marker() {
        assert!(has_end_marker(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9]));
    }

    #[test]
    fn detects_absent_marker() {
        assert!(!has_end_marker(&[0xFF, 0xD8, 0x00, 0x11, 0x22]));
    }

    #[test]
    fn handles_short_buffers() {
        assert!(!has_end_marker(&[0xFF]));
        assert!(!has_end_marker(&[]));
    }
}
