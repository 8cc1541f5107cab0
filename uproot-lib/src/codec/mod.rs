//! Wire codecs: GTP-U data-plane framing and PFCP control-plane messages.

pub mod gtpu;
pub mod pfcp;
