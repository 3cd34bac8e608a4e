pub mod assistant;
pub mod config;
pub mod decoder;
pub mod error;
pub mod http_client;
pub mod model;
pub mod provider;
pub mod providers;
pub mod request;
pub mod stream;
pub mod tasks;
pub mod telemetry;
