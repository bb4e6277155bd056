//! Infrastructure layer: message transports.

pub mod port;
pub mod ws_server;

pub use port::{port_pair, MessagePort, PortEnd, PortError};
pub use ws_server::run_guest_endpoint;
