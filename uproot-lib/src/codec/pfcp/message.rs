//! PFCP message header encode/decode (3GPP TS 29.244 §7.2.2).

/// PFCP message type codes used by this endpoint.
pub mod message_type {
    pub const HEARTBEAT_REQUEST: u8 = 1;
    pub const HEARTBEAT_RESPONSE: u8 = 2;
    pub const ASSOCIATION_SETUP_REQUEST: u8 = 5;
    pub const ASSOCIATION_SETUP_RESPONSE: u8 = 6;
    pub const SESSION_ESTABLISHMENT_REQUEST: u8 = 50;
    pub const SESSION_ESTABLISHMENT_RESPONSE: u8 = 51;
}

const VERSION_1: u8 = 0b001_00000;
const FLAG_S: u8 = 0x01;
const HEADER_LEN_NO_SEID: usize = 8;
const HEADER_LEN_WITH_SEID: usize = 16;

/// A decoded PFCP message: header fields plus the raw IE body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PfcpMessage<'a> {
    pub message_type: u8,
    pub seid: Option<u64>,
    pub sequence: u32,
    pub body: &'a [u8],
}

/// Encodes a PFCP message with no SEID (Association Setup, Heartbeat).
pub fn encode_no_seid(message_type: u8, sequence: u32, body: &[u8]) -> Vec<u8> {
    encode(message_type, None, sequence, body)
}

/// Encodes a PFCP message carrying a SEID (Session Establishment and later).
pub fn encode_with_seid(message_type: u8, seid: u64, sequence: u32, body: &[u8]) -> Vec<u8> {
    encode(message_type, Some(seid), sequence, body)
}

fn encode(message_type: u8, seid: Option<u64>, sequence: u32, body: &[u8]) -> Vec<u8> {
    let header_len = if seid.is_some() { HEADER_LEN_WITH_SEID } else { HEADER_LEN_NO_SEID };
    let mut out = Vec::with_capacity(header_len + body.len());

    let flags = VERSION_1 | if seid.is_some() { FLAG_S } else { 0 };
    out.push(flags);
    out.push(message_type);

    // Message length excludes the first 4 octets (flags, type, length).
    let length = (header_len - 4 + body.len()) as u16;
    out.extend_from_slice(&length.to_be_bytes());

    if let Some(seid) = seid {
        out.extend_from_slice(&seid.to_be_bytes());
    }

    let seq_bytes = sequence.to_be_bytes();
    out.extend_from_slice(&seq_bytes[1..4]); // 3-byte sequence number
    out.push(0); // spare octet

    out.extend_from_slice(body);
    out
}

/// Decodes a PFCP message header and returns the header fields plus the
/// remaining bytes as the IE body.
///
/// Returns `None` if the datagram is too short for the header it declares,
/// the declared length is inconsistent with the buffer, or the version is
/// not 1.
pub fn decode(datagram: &[u8]) -> Option<PfcpMessage<'_>> {
    if datagram.len() < HEADER_LEN_NO_SEID {
        return None;
    }
    let flags = datagram[0];
    if flags & 0b111_00000 != VERSION_1 {
        return None;
    }
    let message_type = datagram[1];
    let declared_len = u16::from_be_bytes([datagram[2], datagram[3]]) as usize;
    let has_seid = flags & FLAG_S != 0;
    let header_len = if has_seid { HEADER_LEN_WITH_SEID } else { HEADER_LEN_NO_SEID };

    if datagram.len() < header_len || datagram.len() != 4 + declared_len {
        return None;
    }

    let mut offset = 4;
    let seid = if has_seid {
        let v = u64::from_be_bytes(datagram[offset..offset + 8].try_into().ok()?);
        offset += 8;
        Some(v)
    } else {
        None
    };

    let sequence = u32::from_be_bytes([0, datagram[offset], datagram[offset + 1], datagram[offset + 2]]);
    let body = &datagram[header_len..];

    Some(PfcpMessage { message_type, seid, sequence, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_roundtrips_without_seid() {
        let body = [1u8, 2, 3, 4];
        let wire = encode_no_seid(message_type::HEARTBEAT_REQUEST, 7, &body);
        let decoded = decode(&wire).expect("valid header");
        assert_eq!(decoded.message_type, message_type::HEARTBEAT_REQUEST);
        assert_eq!(decoded.seid, None);
        assert_eq!(decoded.sequence, 7);
        assert_eq!(decoded.body, &body);
    }

    #[test]
    fn encode_then_decode_roundtrips_with_seid() {
        let body = [9u8, 9, 9];
        let wire = encode_with_seid(message_type::SESSION_ESTABLISHMENT_REQUEST, 0, 1, &body);
        let decoded = decode(&wire).expect("valid header");
        assert_eq!(decoded.seid, Some(0));
        assert_eq!(decoded.sequence, 1);
        assert_eq!(decoded.body, &body);
    }

    #[test]
    fn decode_rejects_wrong_version_and_truncated_length() {
        let mut wire = encode_no_seid(message_type::HEARTBEAT_RESPONSE, 0, &[]);
        wire[0] = 0x00;
        assert!(decode(&wire).is_none());

        let mut wire = encode_no_seid(message_type::HEARTBEAT_RESPONSE, 0, &[1, 2, 3]);
        wire.truncate(wire.len() - 1);
        assert!(decode(&wire).is_none());
    }
}
