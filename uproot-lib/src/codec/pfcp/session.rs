//! Builders and response parsers for the three PFCP exchanges this endpoint
//! performs: association setup, session establishment, and heartbeat.

use std::net::Ipv4Addr;

use bytes::BytesMut;

use super::ie::{self, ie_type, interface};
use super::message::{self, message_type};

/// Rule IDs fixed by this endpoint, mirroring the single uplink/downlink
/// pair of PDR, FAR and QER every session installs.
pub mod rule_id {
    pub const UPLINK_PDR: u16 = 0;
    pub const DOWNLINK_PDR: u16 = 1;
    pub const UPLINK_FAR: u32 = 10;
    pub const DOWNLINK_FAR: u32 = 11;
    pub const UPLINK_QER: u32 = 20;
    pub const DOWNLINK_QER: u32 = 21;
}

const NETWORK_INSTANCE: &[u8] = b"internet";

/// The addresses and TEIDs needed to build a session establishment request.
/// `local_addr` is the address discovered for the PFCP/Node ID fields;
/// `teid_local`/`teid_remote` are the GTP-U TEIDs this endpoint expects to
/// receive/send, matching the TEIDs the GTP-U tunnel uses.
#[derive(Debug, Clone, Copy)]
pub struct SessionParams {
    pub local_addr: Ipv4Addr,
    pub ue_address: Ipv4Addr,
    pub upf_n3_ip: Ipv4Addr,
    pub gnb_ip: Ipv4Addr,
    pub teid_local: u32,
    pub teid_remote: u32,
}

/// Builds an Association Setup Request: Node ID, Recovery Timestamp, CP
/// Function Features (no optional features advertised).
pub fn build_association_setup_request(
    local_addr: Ipv4Addr,
    recovery_timestamp: u32,
    sequence: u32,
) -> Vec<u8> {
    let mut body = BytesMut::new();
    ie::put_ie(&mut body, ie_type::NODE_ID, &ie::node_id_ipv4(local_addr));
    ie::put_ie(
        &mut body,
        ie_type::RECOVERY_TIME_STAMP,
        &ie::recovery_time_stamp(recovery_timestamp),
    );
    ie::put_ie(&mut body, ie_type::CP_FUNCTION_FEATURES, &ie::CP_FUNCTION_FEATURES_NONE);

    message::encode_no_seid(message_type::ASSOCIATION_SETUP_REQUEST, sequence, &body)
}

/// Builds a Heartbeat Request carrying the process's Recovery Timestamp.
pub fn build_heartbeat_request(recovery_timestamp: u32, sequence: u32) -> Vec<u8> {
    let mut body = BytesMut::new();
    ie::put_ie(
        &mut body,
        ie_type::RECOVERY_TIME_STAMP,
        &ie::recovery_time_stamp(recovery_timestamp),
    );
    message::encode_no_seid(message_type::HEARTBEAT_REQUEST, sequence, &body)
}

/// Builds a Session Establishment Request for the single UE session this
/// endpoint manages: one uplink and one downlink PDR/FAR/QER.
pub fn build_session_establishment_request(params: &SessionParams, sequence: u32) -> Vec<u8> {
    let mut body = BytesMut::new();

    ie::put_ie(&mut body, ie_type::NODE_ID, &ie::node_id_ipv4(params.local_addr));
    ie::put_ie(&mut body, ie_type::F_SEID, &ie::fseid_ipv4(0, params.local_addr));

    ie::put_grouped_ie(&mut body, ie_type::CREATE_PDR, |pdr| {
        build_uplink_pdr(pdr, params);
    });
    ie::put_grouped_ie(&mut body, ie_type::CREATE_PDR, |pdr| {
        build_downlink_pdr(pdr, params);
    });
    ie::put_grouped_ie(&mut body, ie_type::CREATE_FAR, |far| {
        build_uplink_far(far);
    });
    ie::put_grouped_ie(&mut body, ie_type::CREATE_FAR, |far| {
        build_downlink_far(far, params);
    });
    ie::put_grouped_ie(&mut body, ie_type::CREATE_QER, |qer| {
        build_qer(qer, rule_id::UPLINK_QER);
    });
    ie::put_grouped_ie(&mut body, ie_type::CREATE_QER, |qer| {
        build_qer(qer, rule_id::DOWNLINK_QER);
    });

    ie::put_ie(&mut body, ie_type::PDN_TYPE, &ie::PDN_TYPE_IPV4);

    message::encode_with_seid(message_type::SESSION_ESTABLISHMENT_REQUEST, 0, sequence, &body)
}

fn build_uplink_pdr(out: &mut BytesMut, params: &SessionParams) {
    ie::put_ie(out, ie_type::PDR_ID, &ie::pdr_id(rule_id::UPLINK_PDR));
    ie::put_ie(out, ie_type::PRECEDENCE, &ie::precedence(u32::MAX));
    ie::put_grouped_ie(out, ie_type::PDI, |pdi| {
        ie::put_ie(pdi, ie_type::SOURCE_INTERFACE, &[interface::ACCESS]);
        ie::put_ie(pdi, ie_type::F_TEID, &ie::fteid_ipv4(params.teid_local, params.upf_n3_ip));
        ie::put_ie(pdi, ie_type::NETWORK_INSTANCE, NETWORK_INSTANCE);
        ie::put_ie(pdi, ie_type::UE_IP_ADDRESS, &ie::ue_ip_address_ipv4(params.ue_address));
    });
    ie::put_ie(out, ie_type::OUTER_HEADER_REMOVAL, &ie::OUTER_HEADER_REMOVAL_GTPU_UDP_IPV4);
    ie::put_ie(out, ie_type::FAR_ID, &ie::far_id(rule_id::UPLINK_FAR));
    ie::put_ie(out, ie_type::QER_ID, &ie::qer_id(rule_id::UPLINK_QER));
}

fn build_downlink_pdr(out: &mut BytesMut, params: &SessionParams) {
    ie::put_ie(out, ie_type::PDR_ID, &ie::pdr_id(rule_id::DOWNLINK_PDR));
    ie::put_ie(out, ie_type::PRECEDENCE, &ie::precedence(u32::MAX));
    ie::put_grouped_ie(out, ie_type::PDI, |pdi| {
        ie::put_ie(pdi, ie_type::SOURCE_INTERFACE, &[interface::CORE]);
        ie::put_ie(pdi, ie_type::NETWORK_INSTANCE, NETWORK_INSTANCE);
        ie::put_ie(pdi, ie_type::UE_IP_ADDRESS, &ie::ue_ip_address_ipv4(params.ue_address));
    });
    ie::put_ie(out, ie_type::FAR_ID, &ie::far_id(rule_id::DOWNLINK_FAR));
    ie::put_ie(out, ie_type::QER_ID, &ie::qer_id(rule_id::DOWNLINK_QER));
}

fn build_uplink_far(out: &mut BytesMut) {
    ie::put_ie(out, ie_type::FAR_ID, &ie::far_id(rule_id::UPLINK_FAR));
    ie::put_ie(out, ie_type::APPLY_ACTION, &ie::APPLY_ACTION_FORW);
    ie::put_grouped_ie(out, ie_type::FORWARDING_PARAMETERS, |fwd| {
        ie::put_ie(fwd, ie_type::DESTINATION_INTERFACE, &[interface::CORE]);
        ie::put_ie(fwd, ie_type::NETWORK_INSTANCE, NETWORK_INSTANCE);
    });
}

fn build_downlink_far(out: &mut BytesMut, params: &SessionParams) {
    ie::put_ie(out, ie_type::FAR_ID, &ie::far_id(rule_id::DOWNLINK_FAR));
    ie::put_ie(out, ie_type::APPLY_ACTION, &ie::APPLY_ACTION_FORW);
    ie::put_grouped_ie(out, ie_type::FORWARDING_PARAMETERS, |fwd| {
        ie::put_ie(fwd, ie_type::DESTINATION_INTERFACE, &[interface::ACCESS]);
        ie::put_ie(fwd, ie_type::NETWORK_INSTANCE, NETWORK_INSTANCE);
        ie::put_ie(
            fwd,
            ie_type::OUTER_HEADER_CREATION,
            &ie::outer_header_creation_gtpu_ipv4(params.teid_remote, params.gnb_ip),
        );
    });
}

fn build_qer(out: &mut BytesMut, qer_id: u32) {
    ie::put_ie(out, ie_type::QER_ID, &ie::qer_id(qer_id));
    ie::put_ie(out, ie_type::GATE_STATUS, &ie::GATE_STATUS_OPEN_BOTH);
    ie::put_ie(out, ie_type::QFI, &ie::qfi(1));
    ie::put_ie(out, ie_type::MBR, &ie::bitrate_pair(ie::BITRATE_MAX, ie::BITRATE_MAX));
    ie::put_ie(out, ie_type::GBR, &ie::bitrate_pair(ie::BITRATE_MAX, ie::BITRATE_MAX));
}

/// Extracts the Cause value from an Association/Session Establishment
/// Response body. Returns `None` if the Cause IE is absent or truncated.
pub fn parse_cause(body: &[u8]) -> Option<u8> {
    ie::IeCursor::find(body, ie_type::CAUSE)?.first().copied()
}

/// Extracts the Recovery Time Stamp from a Heartbeat Response body.
pub fn parse_recovery_time_stamp(body: &[u8]) -> Option<u32> {
    let value = ie::IeCursor::find(body, ie_type::RECOVERY_TIME_STAMP)?;
    Some(u32::from_be_bytes(value.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pfcp::message::decode;

    fn params() -> SessionParams {
        SessionParams {
            local_addr: Ipv4Addr::new(192, 168, 1, 10),
            ue_address: Ipv4Addr::new(10, 45, 0, 2),
            upf_n3_ip: Ipv4Addr::new(192, 168, 1, 20),
            gnb_ip: Ipv4Addr::new(192, 168, 1, 10),
            teid_local: 0x10,
            teid_remote: 0x01,
        }
    }

    #[test]
    fn association_setup_request_carries_node_id_and_recovery_timestamp() {
        let wire = build_association_setup_request(Ipv4Addr::new(1, 2, 3, 4), 1000, 1);
        let decoded = decode(&wire).expect("valid message");
        assert_eq!(decoded.message_type, message_type::ASSOCIATION_SETUP_REQUEST);
        assert_eq!(decoded.seid, None);

        let node_id = ie::IeCursor::find(decoded.body, ie_type::NODE_ID).expect("node id present");
        assert_eq!(node_id, &ie::node_id_ipv4(Ipv4Addr::new(1, 2, 3, 4)));
        let recovery =
            ie::IeCursor::find(decoded.body, ie_type::RECOVERY_TIME_STAMP).expect("recovery present");
        assert_eq!(recovery, &1000u32.to_be_bytes());
    }

    #[test]
    fn session_establishment_request_carries_seid_zero_and_six_rules() {
        let wire = build_session_establishment_request(&params(), 1);
        let decoded = decode(&wire).expect("valid message");
        assert_eq!(decoded.message_type, message_type::SESSION_ESTABLISHMENT_REQUEST);
        assert_eq!(decoded.seid, Some(0));

        let pdrs: Vec<_> =
            ie::IeCursor::new(decoded.body).filter(|ie| ie.ie_type == ie_type::CREATE_PDR).collect();
        assert_eq!(pdrs.len(), 2);
        let fars: Vec<_> =
            ie::IeCursor::new(decoded.body).filter(|ie| ie.ie_type == ie_type::CREATE_FAR).collect();
        assert_eq!(fars.len(), 2);
        let qers: Vec<_> =
            ie::IeCursor::new(decoded.body).filter(|ie| ie.ie_type == ie_type::CREATE_QER).collect();
        assert_eq!(qers.len(), 2);
    }

    #[test]
    fn uplink_pdr_carries_teid_local_and_upf_n3_ip() {
        let p = params();
        let wire = build_session_establishment_request(&p, 1);
        let decoded = decode(&wire).expect("valid message");
        let uplink_pdr = ie::IeCursor::new(decoded.body)
            .filter(|ie| ie.ie_type == ie_type::CREATE_PDR)
            .next()
            .expect("uplink pdr present")
            .value;
        let pdi = ie::IeCursor::find(uplink_pdr, ie_type::PDI).expect("pdi present");
        let fteid = ie::IeCursor::find(pdi, ie_type::F_TEID).expect("f-teid present");
        assert_eq!(fteid, &ie::fteid_ipv4(p.teid_local, p.upf_n3_ip));
    }

    #[test]
    fn parse_cause_reads_accepted_value() {
        let mut body = BytesMut::new();
        ie::put_ie(&mut body, ie_type::CAUSE, &ie::cause(ie::CAUSE_REQUEST_ACCEPTED));
        assert_eq!(parse_cause(&body), Some(ie::CAUSE_REQUEST_ACCEPTED));
    }

    #[test]
    fn parse_recovery_time_stamp_reads_value() {
        let mut body = BytesMut::new();
        ie::put_ie(&mut body, ie_type::RECOVERY_TIME_STAMP, &ie::recovery_time_stamp(42));
        assert_eq!(parse_recovery_time_stamp(&body), Some(42));
    }
}
