pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod ingest;
pub mod poller;
pub mod status;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
