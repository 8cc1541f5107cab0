//! GTP-U v1 header encode/decode (3GPP TS 29.281).

/// Version 1, protocol type GTP, no optional fields set.
pub const FLAGS_V1_NO_OPTIONS: u8 = 0x30;
/// T-PDU message type.
pub const MSG_TYPE_TPDU: u8 = 0xFF;

const HEADER_LEN: usize = 8;
const OPTIONAL_BLOCK_LEN: usize = 4;

/// Writes an 8-byte GTP-U v1 T-PDU header into `out[..8]`.
///
/// `payload_len` is the number of bytes following the header; the caller is
/// responsible for placing that many payload bytes at `out[8..]`.
pub fn write_header(out: &mut [u8], teid: u32, payload_len: u16) {
    out[0] = FLAGS_V1_NO_OPTIONS;
    out[1] = MSG_TYPE_TPDU;
    out[2..4].copy_from_slice(&payload_len.to_be_bytes());
    out[4..8].copy_from_slice(&teid.to_be_bytes());
}

/// Encodes `payload` as a GTP-U v1 T-PDU into `out`, returning the total
/// number of bytes written (header + payload). `out` must be at least
/// `payload.len() + 8` bytes.
pub fn encode_tpdu(out: &mut [u8], teid: u32, payload: &[u8]) -> usize {
    let len = payload.len();
    write_header(out, teid, len as u16);
    out[HEADER_LEN..HEADER_LEN + len].copy_from_slice(payload);
    HEADER_LEN + len
}

/// A decoded GTP-U v1 T-PDU: the TEID carried in the header and the byte
/// range of `datagram` holding the inner IP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTpdu {
    pub teid: u32,
    pub payload_start: usize,
}

/// Decodes a received datagram as a GTP-U v1 T-PDU.
///
/// Returns `None` if the datagram is not a T-PDU (wrong version/protocol-type
/// bits, or message type isn't `0xFF`), if it's shorter than the header it
/// claims to have, or if the extension-header chain runs past the end of the
/// datagram. The caller is expected to drop silently on `None` (§4.1.3).
pub fn decode_tpdu(datagram: &[u8]) -> Option<DecodedTpdu> {
    if datagram.len() < HEADER_LEN {
        return None;
    }
    let flags = datagram[0];
    let msg_type = datagram[1];
    if flags & 0x30 != 0x30 || msg_type != MSG_TYPE_TPDU {
        return None;
    }
    let teid = u32::from_be_bytes(datagram[4..8].try_into().ok()?);

    let mut start = HEADER_LEN;
    // Any of E (bit2), S (bit1), PN (bit0) being set means the optional
    // 4-byte block (sequence number + N-PDU number + next-extension-type)
    // is present. The reference implementation's "+3" advance only happened
    // to be correct when an extension-header chain followed; with no chain
    // it left the payload offset one byte short. Advancing the full 4 bytes
    // up front avoids that off-by-one regardless of whether E is also set.
    let has_optional_block = flags & 0x07 != 0;
    if has_optional_block {
        if datagram.len() < start + OPTIONAL_BLOCK_LEN {
            return None;
        }
        let e_bit_set = flags & 0x04 != 0;
        start += OPTIONAL_BLOCK_LEN;

        if e_bit_set {
            // `start` now points at the first byte of the first extension
            // header, whose own first byte is its length (in 4-byte units);
            // its last byte is the type of the extension that follows.
            loop {
                if start >= datagram.len() {
                    return None;
                }
                let ext_len_words = datagram[start] as usize;
                if ext_len_words == 0 {
                    return None;
                }
                let ext_len = ext_len_words * 4;
                if start + ext_len > datagram.len() {
                    return None;
                }
                let next_type = datagram[start + ext_len - 1];
                start += ext_len;
                if next_type == 0x00 {
                    break;
                }
            }
        }
    }

    if start > datagram.len() {
        return None;
    }
    Some(DecodedTpdu { teid, payload_start: start })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_roundtrips_payload_and_teid() {
        for len in [1usize, 60, 1492] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
            let mut buf = vec![0u8; len + 8];
            let n = encode_tpdu(&mut buf, 0xAABBCCDD, &payload);
            assert_eq!(n, len + 8);
            let decoded = decode_tpdu(&buf[..n]).expect("valid tpdu");
            assert_eq!(decoded.teid, 0xAABBCCDD);
            assert_eq!(&buf[decoded.payload_start..n], payload.as_slice());
        }
    }

    #[test]
    fn decode_with_three_extension_headers() {
        // flags: version1|GTP|E -> 0x34, type T-PDU, length, teid
        let payload = vec![0xEE; 64];
        let mut datagram = vec![0x34, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10];
        // optional block: seq(2) + npdu(1) + next-ext-type(1) = 0x81
        datagram.extend_from_slice(&[0x00, 0x00, 0x00, 0x81]);
        // ext 1: len=1 word (4 bytes): [len][content..][next-type]
        datagram.extend_from_slice(&[0x01, 0x00, 0x00, 0x82]);
        // ext 2: len=2 words (8 bytes)
        datagram.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x83]);
        // ext 3: len=1 word (4 bytes), next-type 0x00 terminates
        datagram.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        datagram.extend_from_slice(&payload);

        let decoded = decode_tpdu(&datagram).expect("valid tpdu");
        assert_eq!(decoded.payload_start, 8 + 4 + 4 + 8 + 4);
        assert_eq!(&datagram[decoded.payload_start..], payload.as_slice());
    }

    #[test]
    fn decode_rejects_wrong_version_or_message_type() {
        let mut datagram = vec![0x20, 0xFF, 0, 0, 0, 0, 0, 0];
        assert!(decode_tpdu(&datagram).is_none());
        datagram[0] = 0x30;
        datagram[1] = 0xFE;
        assert!(decode_tpdu(&datagram).is_none());
    }

    #[test]
    fn decode_with_sequence_number_only() {
        let payload = vec![0x11; 64];
        let mut datagram = vec![0x32, 0xFF, 0x00, 0x40, 0x00, 0x00, 0x00, 0x10];
        datagram.extend_from_slice(&[0x00, 0x2A, 0x00, 0x00]);
        datagram.extend_from_slice(&payload);

        let decoded = decode_tpdu(&datagram).expect("valid tpdu");
        assert_eq!(decoded.payload_start, 12);
        assert_eq!(&datagram[decoded.payload_start..], payload.as_slice());
    }
}
