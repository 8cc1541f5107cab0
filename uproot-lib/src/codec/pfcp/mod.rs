//! PFCP (3GPP TS 29.244) wire codec: IE primitives, message headers, and the
//! specific request/response builders this endpoint uses.

pub mod ie;
pub mod message;
pub mod session;

pub use message::{decode, encode_no_seid, encode_with_seid, message_type, PfcpMessage};
pub use session::{
    build_association_setup_request, build_heartbeat_request, build_session_establishment_request,
    parse_cause, parse_recovery_time_stamp, rule_id, SessionParams,
};
