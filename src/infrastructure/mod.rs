pub mod backend_client;
pub mod client_storage;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
