//! Infrastructure layer: HTTP catalog client, route table, persisted
//! configuration, and the token store backing the host bridge.

pub mod auth;
pub mod config_client;
pub mod router;
pub mod storage;
