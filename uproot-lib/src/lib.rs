#![forbid(unsafe_code)]

pub mod capability;
pub mod codec;
pub mod config;
pub mod error;
pub mod gtpu;
pub mod orchestrator;
pub mod pfcp;
pub mod telemetry;

pub use capability::{BoxFuture, NetError, NetlinkOps, TunDevice};
pub use config::{load_from_path, Config};
pub use error::{Result, UprootError};
pub use gtpu::GtpuTunnel;
pub use orchestrator::run;
pub use pfcp::PfcpClient;
pub use telemetry::init_tracing;
