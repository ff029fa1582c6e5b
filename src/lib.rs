// Echo Bench - Library root

pub mod bench;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
