pub mod client;
pub mod poller;
pub mod testgen;
pub mod traits;
pub mod upload;
