use thiserror::Error;

/// Errors that can occur while bringing up or running the tunnel.
#[derive(Error, Debug)]
pub enum UprootError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("PFCP transport error: {0}")]
    PfcpTransport(String),

    #[error("PFCP protocol error: {0}")]
    PfcpProtocol(String),

    #[error("TUN setup error: {0}")]
    TunSetup(String),

    #[error("datapath IO error: {0}")]
    DatapathIo(String),

    #[error("shutdown error: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, UprootError>;
