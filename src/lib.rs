pub mod client;
pub mod config;
pub mod history;
pub mod logging;
pub mod server;
pub mod session;
