//! Minimal OSC 1.0 message encoding
//!
//! Only the single-int32 message shape the game's input endpoint accepts is
//! supported: address, `,i` type tag, big-endian argument.

/// Address of the "use right hand" button.
pub const USE_RIGHT_ADDRESS: &str = "/input/UseRight";

const INT_TYPE_TAG: &str = ",i";

/// Encode `address ,i value` into a datagram payload.
pub fn encode_int_message(address: &str, value: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(padded_len(address.len()) + padded_len(INT_TYPE_TAG.len()) + 4);
    write_padded_str(&mut buf, address);
    write_padded_str(&mut buf, INT_TYPE_TAG);
    buf.extend_from_slice(&value.to_be_bytes());
    buf
}

/// Append ASCII bytes then NUL-pad to the next 4-byte boundary.
///
/// A string whose length is already a multiple of four gets no padding.
fn write_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    let padding = (4 - s.len() % 4) % 4;
    buf.resize(buf.len() + padding, 0);
}

fn padded_len(len: usize) -> usize {
    len + (4 - len % 4) % 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_message_layout() {
        let msg = encode_int_message(USE_RIGHT_ADDRESS, 1);

        // "/input/UseRight" is 15 bytes -> one NUL, ",i" -> two NULs
        assert_eq!(msg.len(), 16 + 4 + 4);
        assert_eq!(&msg[..15], b"/input/UseRight");
        assert_eq!(msg[15], 0);
        assert_eq!(&msg[16..20], b",i\0\0");
        assert_eq!(&msg[msg.len() - 4..], &[0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_release_message_argument() {
        let msg = encode_int_message(USE_RIGHT_ADDRESS, 0);
        assert_eq!(&msg[msg.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_sections_are_four_byte_aligned() {
        for address in ["/a", "/abc", "/input/UseLeft", "/input/Jump"] {
            let msg = encode_int_message(address, -2);
            assert_eq!(msg.len() % 4, 0, "address {address}");
            let tag_start = padded_len(address.len());
            assert!(msg[address.len()..tag_start].iter().all(|&b| b == 0));
            assert_eq!(&msg[tag_start..tag_start + 4], b",i\0\0");
            assert_eq!(&msg[tag_start + 4..], &(-2i32).to_be_bytes());
        }
    }

    #[test]
    fn test_exact_multiple_of_four_is_not_padded() {
        // "/abc" is already 4 bytes long
        let msg = encode_int_message("/abc", 7);
        assert_eq!(&msg[..4], b"/abc");
        assert_eq!(&msg[4..6], b",i");
        assert_eq!(msg.len(), 12);
    }
}
